//! 库存查询工具
//!
//! 模拟库存：SKU 含 "PROD" 视为有货（45 件），否则缺货。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::registry::parse_args;
use crate::tools::schema::args_schema;
use crate::tools::{Tool, ToolError};

/// 有货时报告的库存数量
const IN_STOCK_UNITS: u32 = 45;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InventoryArgs {
    /// The product SKU to check
    pub product_sku: String,
}

pub struct InventoryTool;

impl InventoryTool {
    pub fn lookup(args: &InventoryArgs) -> String {
        let sku = &args.product_sku;
        if sku.contains("PROD") {
            format!("Product {sku} is in stock. We have {IN_STOCK_UNITS} units available.")
        } else {
            format!("Product {sku} is currently out of stock.")
        }
    }
}

#[async_trait]
impl Tool for InventoryTool {
    fn name(&self) -> &str {
        "check_inventory"
    }

    fn description(&self) -> &str {
        "Use this tool to check if a specific product SKU is currently in stock."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<InventoryArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let args: InventoryArgs = parse_args(self.name(), args)?;
        Ok(Self::lookup(&args))
    }
}
