//! 认知层：Planner（模型步）与 Agent 主循环

pub mod loop_;
pub mod planner;

pub use loop_::{react_loop, LoopState, ReactResult, ReactSession, DEFAULT_MAX_STEPS};
pub use planner::{load_system_prompt, Planner, DEFAULT_SYSTEM_PROMPT};
