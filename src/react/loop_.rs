//! Agent 主循环
//!
//! ModelStep -> (有 tool 请求) ToolStep -> ModelStep -> ... -> (无 tool 请求) Done。
//! 进入循环前读取会话最新检查点并追加用户消息；用户消息写入后以及每一步完成后都保存检查点，
//! 中途失败时最后一个完成的步骤仍然可恢复。工具步失败或步数耗尽时，未完成的工具请求以错误结果收尾后再保存。

use std::time::Duration;

use crate::core::AgentError;
use crate::memory::{CheckpointStore, Message, ToolRequest};
use crate::react::Planner;
use crate::tools::ToolExecutor;

/// 单次请求内的默认最大步数（模型步 + 工具步）
pub const DEFAULT_MAX_STEPS: usize = 25;

/// 循环状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    ModelStep,
    ToolStep,
    Done,
}

/// 循环执行结果：最终回复与当前对话历史
#[derive(Debug)]
pub struct ReactResult {
    pub response: String,
    pub messages: Vec<Message>,
    /// 最后写入的检查点版本
    pub version: i64,
    pub steps: usize,
}

/// 循环会话配置
pub struct ReactSession<'a> {
    pub planner: &'a Planner,
    pub executor: &'a ToolExecutor,
    pub store: &'a dyn CheckpointStore,
    pub max_steps: usize,
    /// 单次 load/save 的超时
    pub store_timeout: Duration,
}

impl<'a> ReactSession<'a> {
    pub fn new(planner: &'a Planner, executor: &'a ToolExecutor, store: &'a dyn CheckpointStore) -> Self {
        Self {
            planner,
            executor,
            store,
            max_steps: DEFAULT_MAX_STEPS,
            store_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    async fn load(&self, thread_id: &str) -> Result<(Vec<Message>, i64), AgentError> {
        let checkpoint = tokio::time::timeout(self.store_timeout, self.store.load(thread_id))
            .await
            .map_err(|_| AgentError::StoreTimeout(self.store_timeout.as_secs()))??;
        Ok(checkpoint
            .map(|cp| (cp.messages, cp.version))
            .unwrap_or_default())
    }

    async fn persist(&self, thread_id: &str, version: i64, messages: &[Message]) -> Result<i64, AgentError> {
        let checkpoint = tokio::time::timeout(self.store_timeout, self.store.save(thread_id, version, messages))
            .await
            .map_err(|_| AgentError::StoreTimeout(self.store_timeout.as_secs()))??;
        Ok(checkpoint.version)
    }

    /// 失败路径上的收尾写入：写入失败只记日志，调用方返回原始错误
    async fn persist_after_failure(&self, thread_id: &str, version: i64, messages: &[Message]) {
        if let Err(e) = self.persist(thread_id, version, messages).await {
            tracing::warn!(thread_id, error = %e, "failed to persist tool error results");
        }
    }
}

/// 最后一条 assistant 消息中的工具请求
fn pending_requests(messages: &[Message]) -> Vec<ToolRequest> {
    messages
        .last()
        .map(|m| m.tool_requests.clone())
        .unwrap_or_default()
}

/// 为未完成的工具请求补上错误结果，保证每个 tool_call 都有对应的 tool 消息，
/// 否则后续请求带着这段历史调用模型会被拒绝
fn answer_with_error(messages: &mut Vec<Message>, requests: &[ToolRequest], err: &AgentError) {
    for request in requests {
        messages.push(Message::tool_result(
            request.id.clone(),
            request.name.clone(),
            format!("Error: {err}"),
        ));
    }
}

/// 执行 Agent 循环
///
/// 读取检查点 -> 追加 user 消息 -> ModelStep / ToolStep 交替，直到模型回复不再请求工具
pub async fn react_loop(
    session: &ReactSession<'_>,
    thread_id: &str,
    user_input: &str,
) -> Result<ReactResult, AgentError> {
    let (mut messages, mut version) = session.load(thread_id).await?;
    tracing::debug!(thread_id, prior_messages = messages.len(), version, "loaded checkpoint");

    messages.push(Message::user(user_input));
    version = session.persist(thread_id, version, &messages).await?;

    let mut state = LoopState::ModelStep;
    let mut steps = 0usize;

    while state != LoopState::Done {
        if steps >= session.max_steps {
            tracing::warn!(thread_id, steps, "step limit reached");
            let err = AgentError::StepLimitExceeded(session.max_steps);
            if state == LoopState::ToolStep {
                let pending = pending_requests(&messages);
                answer_with_error(&mut messages, &pending, &err);
                session.persist_after_failure(thread_id, version, &messages).await;
            }
            return Err(err);
        }
        steps += 1;

        state = match state {
            LoopState::ModelStep => {
                let reply = session.planner.plan(&messages).await?;
                let next = if reply.has_tool_requests() {
                    LoopState::ToolStep
                } else {
                    LoopState::Done
                };
                tracing::debug!(thread_id, step = steps, tool_requests = reply.tool_requests.len(), "model step");
                messages.push(reply);
                next
            }
            LoopState::ToolStep => {
                let requests = pending_requests(&messages);
                for (i, request) in requests.iter().enumerate() {
                    match session
                        .executor
                        .execute(&request.name, request.arguments.clone())
                        .await
                    {
                        Ok(output) => messages.push(Message::tool_result(
                            request.id.clone(),
                            request.name.clone(),
                            output,
                        )),
                        Err(err) => {
                            answer_with_error(&mut messages, &requests[i..], &err);
                            session.persist_after_failure(thread_id, version, &messages).await;
                            return Err(err);
                        }
                    }
                }
                LoopState::ModelStep
            }
            LoopState::Done => LoopState::Done,
        };

        version = session.persist(thread_id, version, &messages).await?;
    }

    let response = messages
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default();

    Ok(ReactResult {
        response,
        messages,
        version,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::llm::MockLlmClient;
    use crate::memory::{MemoryCheckpointStore, Role, ToolRequest};
    use crate::tools::support_tools;

    fn parts(llm: MockLlmClient) -> (Arc<MockLlmClient>, Planner, ToolExecutor) {
        let llm = Arc::new(llm);
        let executor = ToolExecutor::new(support_tools(), 5);
        let planner = Planner::new(llm.clone(), "sys").with_tools(executor.specs());
        (llm, planner, executor)
    }

    #[tokio::test]
    async fn test_direct_reply_persists_user_and_reply() {
        let (_llm, planner, executor) = parts(MockLlmClient::new().reply("Hi there"));
        let store = MemoryCheckpointStore::new();
        let session = ReactSession::new(&planner, &executor, &store);

        let result = react_loop(&session, "t1", "hello").await.unwrap();
        assert_eq!(result.response, "Hi there");
        assert_eq!(result.steps, 1);

        let saved = store.load("t1").await.unwrap().unwrap();
        assert_eq!(saved.messages, vec![Message::user("hello"), Message::assistant("Hi there")]);
        assert_eq!(saved.version, result.version);
        assert!(saved.messages.iter().all(|m| m.role != Role::System));
    }

    #[tokio::test]
    async fn test_tool_round_trip_and_checkpoint_per_step() {
        let (llm, planner, executor) = parts(
            MockLlmClient::new()
                .tool_call("check_inventory", serde_json::json!({"product_sku": "PROD-001"}))
                .reply("It is in stock."),
        );
        let store = MemoryCheckpointStore::new();
        let session = ReactSession::new(&planner, &executor, &store);

        let result = react_loop(&session, "t1", "Is PROD-001 available?").await.unwrap();
        assert_eq!(result.response, "It is in stock.");
        assert_eq!(result.steps, 3);

        let roles: Vec<Role> = result.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
        let tool_msg = &result.messages[2];
        assert_eq!(tool_msg.tool_call_id.as_ref(), Some(&result.messages[1].tool_requests[0].id));
        assert!(tool_msg.content.contains("45 units"));

        // 用户消息 + 三个步骤各一个检查点
        assert_eq!(result.version, 4);
        assert_eq!(store.history("t1", 10).await.unwrap().len(), 4);

        // 第二次模型调用看到了工具结果
        let calls = llm.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].last().unwrap().role, Role::Tool);
    }

    #[tokio::test]
    async fn test_unknown_tool_surfaces_and_keeps_progress() {
        let (_llm, planner, executor) =
            parts(MockLlmClient::new().tool_call("issue_refund", serde_json::json!({"amount": 10})));
        let store = MemoryCheckpointStore::new();
        let session = ReactSession::new(&planner, &executor, &store);

        let err = react_loop(&session, "t1", "refund me").await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownTool(ref n) if n == "issue_refund"));

        let saved = store.load("t1").await.unwrap().unwrap();
        assert_eq!(saved.messages.len(), 3);
        assert!(saved.messages[1].has_tool_requests());
        assert_eq!(saved.messages[2].role, Role::Tool);
        assert_eq!(
            saved.messages[2].tool_call_id.as_ref(),
            Some(&saved.messages[1].tool_requests[0].id)
        );
        assert!(saved.messages[2].content.starts_with("Error: Unknown tool: issue_refund"));
    }

    /// 发给模型的历史里，每个 tool_call 都有对应的 tool 消息
    fn unanswered_tool_calls(messages: &[Message]) -> Vec<String> {
        messages
            .iter()
            .flat_map(|m| m.tool_requests.iter().map(|r| r.id.clone()))
            .filter(|id| {
                !messages
                    .iter()
                    .any(|m| m.role == Role::Tool && m.tool_call_id.as_ref() == Some(id))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_thread_usable_after_failed_tool_step() {
        let (llm, planner, executor) = parts(
            MockLlmClient::new()
                .tool_call("issue_refund", serde_json::json!({"amount": 10}))
                .reply("How else can I help?"),
        );
        let store = MemoryCheckpointStore::new();
        let session = ReactSession::new(&planner, &executor, &store);

        assert!(react_loop(&session, "t1", "refund").await.is_err());
        let second = react_loop(&session, "t1", "hello again").await.unwrap();
        assert_eq!(second.response, "How else can I help?");

        let calls = llm.calls();
        assert_eq!(calls.len(), 2);
        let roles: Vec<Role> = calls[1].iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::User]
        );
        assert!(unanswered_tool_calls(&calls[1]).is_empty());
    }

    #[tokio::test]
    async fn test_step_limit_closes_pending_tool_calls() {
        let (_llm, planner, executor) = parts(
            MockLlmClient::new().tool_call("check_inventory", serde_json::json!({"product_sku": "PROD-1"})),
        );
        let store = MemoryCheckpointStore::new();
        let session = ReactSession::new(&planner, &executor, &store).with_max_steps(1);

        let err = react_loop(&session, "t1", "stock?").await.unwrap_err();
        assert!(matches!(err, AgentError::StepLimitExceeded(1)));

        let saved = store.load("t1").await.unwrap().unwrap();
        assert_eq!(saved.messages.len(), 3);
        assert!(unanswered_tool_calls(&saved.messages).is_empty());
    }

    #[tokio::test]
    async fn test_multiple_tool_requests_in_one_step() {
        let (_llm, planner, executor) = parts(
            MockLlmClient::new()
                .tool_calls(vec![
                    ToolRequest::new(
                        "call_a",
                        "check_inventory",
                        serde_json::json!({"product_sku": "PROD-9"}),
                    ),
                    ToolRequest::new(
                        "call_b",
                        "check_refund_status",
                        serde_json::json!({"transaction_id": "TX-1"}),
                    ),
                ])
                .reply("Both checked."),
        );
        let store = MemoryCheckpointStore::new();
        let session = ReactSession::new(&planner, &executor, &store);

        let result = react_loop(&session, "t1", "stock and refund?").await.unwrap();
        assert_eq!(result.response, "Both checked.");
        assert_eq!(result.steps, 3);

        let tool_msgs: Vec<&Message> = result.messages.iter().filter(|m| m.role == Role::Tool).collect();
        assert_eq!(tool_msgs.len(), 2);
        assert_eq!(tool_msgs[0].tool_call_id.as_deref(), Some("call_a"));
        assert_eq!(tool_msgs[0].content, "Product PROD-9 is in stock. We have 45 units available.");
        assert_eq!(tool_msgs[1].tool_call_id.as_deref(), Some("call_b"));
        assert!(tool_msgs[1].content.contains("TX-1"));

        // 用户消息、模型步、工具步（两个结果合并一次写入）、模型步
        assert_eq!(result.version, 4);
    }

    #[tokio::test]
    async fn test_failure_mid_step_answers_remaining_requests() {
        let (_llm, planner, executor) = parts(MockLlmClient::new().tool_calls(vec![
            ToolRequest::new("call_a", "check_refund_status", serde_json::json!({"transaction_id": "TX-2"})),
            ToolRequest::new("call_b", "check_inventory", serde_json::json!({"sku": "wrong-field"})),
            ToolRequest::new("call_c", "check_inventory", serde_json::json!({"product_sku": "PROD-3"})),
        ]));
        let store = MemoryCheckpointStore::new();
        let session = ReactSession::new(&planner, &executor, &store);

        let err = react_loop(&session, "t1", "three things").await.unwrap_err();
        assert!(matches!(err, AgentError::ToolArguments { .. }));

        let saved = store.load("t1").await.unwrap().unwrap();
        let ids: Vec<&str> = saved
            .messages
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(ids, vec!["call_a", "call_b", "call_c"]);
        assert!(saved.messages[2].content.contains("TX-2"));
        assert!(saved.messages[3].content.starts_with("Error:"));
        assert!(saved.messages[4].content.starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_step_limit() {
        let mut llm = MockLlmClient::new();
        for _ in 0..10 {
            llm = llm.tool_call("check_refund_status", serde_json::json!({"transaction_id": "T"}));
        }
        let (_llm, planner, executor) = parts(llm);
        let store = MemoryCheckpointStore::new();
        let session = ReactSession::new(&planner, &executor, &store).with_max_steps(4);

        let err = react_loop(&session, "t1", "loop").await.unwrap_err();
        assert!(matches!(err, AgentError::StepLimitExceeded(4)));
    }

    #[tokio::test]
    async fn test_resumes_prior_history() {
        let (llm, planner, executor) = parts(MockLlmClient::new().reply("A1").reply("A2"));
        let store = MemoryCheckpointStore::new();
        let session = ReactSession::new(&planner, &executor, &store);

        react_loop(&session, "t1", "Q1").await.unwrap();
        let second = react_loop(&session, "t1", "Q2").await.unwrap();

        let contents: Vec<&str> = second.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Q1", "A1", "Q2", "A2"]);
        // 第二轮模型输入：system + 完整历史
        assert_eq!(llm.calls()[1].len(), 4);
    }
}
