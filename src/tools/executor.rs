//! 工具执行器
//!
//! 持有 ToolRegistry 与全局超时，execute(tool_name, args) 先校验名称，再在超时内调用 registry.execute，
//! 失败时转为 AgentError（UnknownTool / ToolArguments / ToolExecutionFailed / ToolTimeout）；
//! 每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::AgentError;
use crate::llm::ToolSpec;
use crate::tools::{ToolError, ToolRegistry};

/// 工具执行器：对每次调用施加超时，并将结果映射为 AgentError
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 执行指定工具；输出 JSON 审计日志
    pub async fn execute(&self, tool_name: &str, args: serde_json::Value) -> Result<String, AgentError> {
        if !self.registry.contains(tool_name) {
            tracing::warn!(tool = %tool_name, "model requested unregistered tool");
            return Err(AgentError::UnknownTool(tool_name.to_string()));
        }

        let start = Instant::now();
        let args_preview = args_preview(&args);
        let result = timeout(self.timeout, self.registry.execute(tool_name, args)).await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(ToolError::InvalidArguments { .. })) => (false, "invalid_arguments"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(ToolError::Unknown(name))) => Err(AgentError::UnknownTool(name)),
            Ok(Err(ToolError::InvalidArguments { tool, reason })) => {
                Err(AgentError::ToolArguments { tool, reason })
            }
            Ok(Err(ToolError::Failed(e))) => Err(AgentError::ToolExecutionFailed(e)),
            Err(_) => Err(AgentError::ToolTimeout(tool_name.to_string())),
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.registry.specs()
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{InventoryTool, Tool};
    use async_trait::async_trait;

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "sleeps"
        }

        async fn execute(&self, _args: serde_json::Value) -> Result<String, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }
    }

    fn executor(timeout_secs: u64) -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(InventoryTool);
        registry.register(SlowTool);
        ToolExecutor::new(registry, timeout_secs)
    }

    #[tokio::test]
    async fn test_execute_maps_errors() {
        let exec = executor(30);
        let out = exec
            .execute("check_inventory", serde_json::json!({"product_sku": "PROD-001"}))
            .await
            .unwrap();
        assert!(out.contains("45 units"));

        let err = exec.execute("delete_account", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownTool(ref n) if n == "delete_account"));

        let err = exec
            .execute("check_inventory", serde_json::json!({"sku": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolArguments { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_times_out() {
        let err = executor(1).execute("slow", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolTimeout(ref n) if n == "slow"));
    }

    #[test]
    fn test_args_preview_truncates() {
        let long = serde_json::json!({"text": "x".repeat(500)});
        assert!(args_preview(&long).ends_with("..."));
        assert_eq!(args_preview(&serde_json::json!({})), "{}");
    }
}
