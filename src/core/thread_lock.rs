//! 会话级互斥：同一 thread_id 的 load → 运行循环 → save 串行执行
//!
//! 不同会话互不阻塞；会话空闲后锁条目自动回收。跨进程的并发写入由存储层的版本号冲突兜底。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// 按 thread_id 分配的异步锁表
#[derive(Debug, Clone, Default)]
pub struct ThreadLocks {
    locks: LockMap,
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 等待并持有该会话的锁；守卫释放时解锁
    pub async fn acquire(&self, thread_id: &str) -> ThreadGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(thread_id.to_string()).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        ThreadGuard {
            thread_id: thread_id.to_string(),
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }
    }

    /// 当前登记的会话数（持有或等待中）
    pub fn active_threads(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or_default()
    }
}

/// 会话锁守卫
pub struct ThreadGuard {
    thread_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockMap,
}

impl Drop for ThreadGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // 仅剩表内引用说明没有其他持有者或等待者
        if locks
            .get(&self.thread_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.thread_id);
        }
    }
}
