//! 优雅关闭处理
//!
//! 监听 Ctrl+C / SIGTERM，触发后 HTTP 服务停止接收新连接并等待进行中的请求完成，
//! 随后由 SupportAgent::shutdown 关闭检查点连接池。

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// 关闭原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C
    UserInitiated,
    /// SIGTERM 信号
    Signal,
}

/// 关闭信号管理器
#[derive(Clone, Debug, Default)]
pub struct ShutdownManager {
    /// 关闭信号 token
    shutdown_token: CancellationToken,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取关闭 token（用于取消正在进行的任务）
    pub fn token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// 触发关闭
    pub fn shutdown(&self, reason: ShutdownReason) {
        if !self.shutdown_token.is_cancelled() {
            tracing::info!(?reason, "initiating graceful shutdown");
        }
        self.shutdown_token.cancel();
    }

    /// 是否已触发关闭
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// 等待关闭信号（可直接交给 axum 的 with_graceful_shutdown）
    pub fn wait_for_shutdown(&self) -> impl Future<Output = ()> + Send + 'static {
        let token = self.shutdown_token.clone();
        async move { token.cancelled().await }
    }

    /// 安装系统信号处理器 (Ctrl+C, SIGTERM)
    pub fn install_signal_handlers(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                tracing::info!("Received Ctrl+C");
                manager.shutdown(ShutdownReason::UserInitiated);
            }
        });

        #[cfg(unix)]
        {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                    sigterm.recv().await;
                    tracing::info!("Received SIGTERM");
                    manager.shutdown(ShutdownReason::Signal);
                }
            });
        }
    }
}
