//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url），默认 Groq；
//! 工具以 function calling 形式声明，回复中的 tool_calls 转为 ToolRequest。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolArgs, ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall,
    FunctionObjectArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, ToolSpec};
use crate::memory::{Message, Role, ToolRequest};

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容客户端：持有 Client、model 名与 temperature
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("GROQ_API_KEY").ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default();

        let config = match base_url {
            Some(url) => OpenAIConfig::new().with_api_base(url).with_api_key(api_key),
            None => OpenAIConfig::new().with_api_key(api_key),
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature: 0.0,
            usage: TokenUsage::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn to_openai_messages(
        &self,
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        messages
            .iter()
            .map(|m| {
                let msg: ChatCompletionRequestMessage = match m.role {
                    Role::System => ChatCompletionRequestSystemMessageArgs::default()
                        .content(m.content.clone())
                        .build()?
                        .into(),
                    Role::User => ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()?
                        .into(),
                    Role::Assistant => {
                        let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                        if !m.content.is_empty() {
                            args.content(m.content.clone());
                        }
                        if !m.tool_requests.is_empty() {
                            args.tool_calls(
                                m.tool_requests.iter().map(to_openai_tool_call).collect::<Vec<_>>(),
                            );
                        }
                        args.build()?.into()
                    }
                    Role::Tool => ChatCompletionRequestToolMessageArgs::default()
                        .content(m.content.clone())
                        .tool_call_id(m.tool_call_id.clone().unwrap_or_default())
                        .build()?
                        .into(),
                };
                Ok(msg)
            })
            .collect()
    }

    fn to_openai_tools(&self, tools: &[ToolSpec]) -> Result<Vec<ChatCompletionTool>, OpenAIError> {
        tools
            .iter()
            .map(|spec| {
                let function = FunctionObjectArgs::default()
                    .name(spec.name.clone())
                    .description(spec.description.clone())
                    .parameters(spec.parameters.clone())
                    .build()?;
                ChatCompletionToolArgs::default()
                    .r#type(ChatCompletionToolType::Function)
                    .function(function)
                    .build()
            })
            .collect()
    }
}

fn to_openai_tool_call(req: &ToolRequest) -> ChatCompletionMessageToolCall {
    ChatCompletionMessageToolCall {
        id: req.id.clone(),
        r#type: ChatCompletionToolType::Function,
        function: FunctionCall {
            name: req.name.clone(),
            arguments: req.arguments.to_string(),
        },
    }
}

/// 解析模型返回的 tool_call：arguments 为 JSON 字符串，空串视为空对象
fn from_openai_tool_call(call: ChatCompletionMessageToolCall) -> Result<ToolRequest, LlmError> {
    let raw = call.function.arguments.trim();
    let arguments = if raw.is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str(raw).map_err(|e| {
            LlmError::InvalidResponse(format!(
                "tool call {} has malformed arguments: {e}",
                call.function.name
            ))
        })?
    };
    Ok(ToolRequest::new(call.id, call.function.name, arguments))
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message, LlmError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .temperature(self.temperature)
            .messages(
                self.to_openai_messages(messages)
                    .map_err(|e| LlmError::InvalidRequest(e.to_string()))?,
            );
        if !tools.is_empty() {
            args.tools(
                self.to_openai_tools(tools)
                    .map_err(|e| LlmError::InvalidRequest(e.to_string()))?,
            );
        }
        let request = args
            .build()
            .map_err(|e| LlmError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::Provider(e.to_string()))?;

        // 提取 token 使用统计
        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
            tracing::debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "llm usage"
            );
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))?;

        let content = choice.message.content.unwrap_or_default();
        let tool_requests = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(from_openai_tool_call)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Message::assistant_with_tools(content, tool_requests))
    }
}
