//! 可观测性：tracing 日志初始化

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 默认日志级别，可通过 RUST_LOG 覆盖
pub const DEFAULT_FILTER: &str = "info,tower_http=info,sqlx=warn";

/// 初始化全局 subscriber；重复调用时保留已有的 subscriber
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
