pub mod executor;
pub mod inventory;
pub mod refund;
pub mod registry;
pub mod schema;

pub use executor::ToolExecutor;
pub use inventory::{InventoryArgs, InventoryTool};
pub use refund::{RefundStatusArgs, RefundStatusTool};
pub use registry::{Tool, ToolError, ToolRegistry};
pub use schema::args_schema;

/// 客服工具集：退款状态 + 库存查询
pub fn support_tools() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(RefundStatusTool);
    registry.register(InventoryTool);
    registry
}
