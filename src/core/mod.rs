//! 核心层：错误与 HTTP 映射、会话级互斥、组件构建、优雅关闭

pub mod builder;
pub mod error;
pub mod shutdown;
pub mod thread_lock;

pub use builder::{AgentBuilder, AgentComponents};
pub use error::AgentError;
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use thread_lock::{ThreadGuard, ThreadLocks};
