//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），由 ToolRegistry 按名注册与查找，
//! ToolExecutor 在调用时加超时并统一转 AgentError。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::llm::ToolSpec;

/// 工具调用失败原因
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// 注册表中没有该名称
    #[error("unknown tool: {0}")]
    Unknown(String),

    /// 参数不符合工具的输入类型
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// 工具本身执行失败
    #[error("{0}")]
    Failed(String),
}

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（function calling 中的 function.name）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema（供 LLM 生成正确的参数格式）
    /// 默认返回空对象，表示无参数
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 执行工具
    async fn execute(&self, args: Value) -> Result<String, ToolError>;
}

/// 把 JSON 参数反序列化为工具的输入类型；失败时返回 InvalidArguments
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

/// 工具注册表：按名称存储 Arc<dyn Tool>，支持 register / get / execute / specs
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::Unknown(name.to_string()))?;
        tool.execute(args).await
    }

    /// 按名称排序，保证每次请求给模型的工具声明顺序一致
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// 生成提供给模型的工具声明
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tool_names()
            .into_iter()
            .filter_map(|name| {
                let tool = self.tools.get(&name)?;
                Some(ToolSpec {
                    description: tool.description().to_string(),
                    parameters: tool.parameters_schema(),
                    name,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{InventoryTool, RefundStatusTool};

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(RefundStatusTool);
        registry.register(InventoryTool);
        registry
    }

    #[tokio::test]
    async fn test_unknown_tool_is_explicit() {
        let err = registry()
            .execute("issue_refund", serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::Unknown("issue_refund".to_string()));
    }

    #[test]
    fn test_specs_are_sorted_and_typed() {
        let specs = registry().specs();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["check_inventory", "check_refund_status"]);
        assert_eq!(specs[0].parameters["type"], "object");
        assert!(specs[0].parameters["properties"].get("product_sku").is_some());
    }

    #[test]
    fn test_register_and_lookup() {
        assert!(ToolRegistry::new().is_empty());
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("check_inventory").is_some());
        assert!(registry.get("issue_refund").is_none());
    }
}
