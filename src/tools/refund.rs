//! 退款状态查询工具
//!
//! 无真实后端：任何交易号都返回「处理中，2-3 个工作日到账」，相同输入输出恒定。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::registry::parse_args;
use crate::tools::schema::args_schema;
use crate::tools::{Tool, ToolError};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RefundStatusArgs {
    /// The transaction id to look up
    pub transaction_id: String,
}

pub struct RefundStatusTool;

impl RefundStatusTool {
    pub fn lookup(args: &RefundStatusArgs) -> String {
        format!(
            "Refund for transaction {} is currently processing and will clear in 2-3 business days.",
            args.transaction_id
        )
    }
}

#[async_trait]
impl Tool for RefundStatusTool {
    fn name(&self) -> &str {
        "check_refund_status"
    }

    fn description(&self) -> &str {
        "Use this tool to check the refund status of a specific transaction."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<RefundStatusArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let args: RefundStatusArgs = parse_args(self.name(), args)?;
        Ok(Self::lookup(&args))
    }
}
