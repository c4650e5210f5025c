//! 远程 API 后端（OpenAI 兼容）
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）。
//! system 提示词给出输出规则与计划 JSON Schema；历史按角色映射为 chat 消息：
//! 计划轨迹 / 叙述为 assistant，工具结果以 "Tool result: ..." 的 user 消息回灌。

use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::config::ApiLlmSection;
use crate::llm::{LlmBackend, LlmError, RawOutput};
use crate::memory::{Message, Role};
use crate::react::TASK_END_TOKEN;
use crate::tools::plan_schema_json;

/// 远程 API 后端：持有 Client、模型名与采样参数
pub struct RemoteBackend {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    has_key: bool,
}

fn api_err(e: OpenAIError) -> LlmError {
    LlmError::Api(e.to_string())
}

/// 规划用 system 提示词：输出规则 + 计划格式 Schema
pub fn system_prompt() -> String {
    format!(
        "You control a real Linux machine. Follow these rules exactly:\n\
         1. Start with a brief progress note.\n\
         2. Output one JSON tool command after your note.\n\
         3. Use one tool per response until the job is done.\n\
         4. When finished, append '{}' to your last note and output {{\"tool\": \"none\", \"args\": {{}}}}.\n\n\
         The tool command must match this JSON schema:\n{}",
        TASK_END_TOKEN,
        plan_schema_json()
    )
}

impl RemoteBackend {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: Option<String>,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        let has_key = api_key.is_some();
        let mut config = OpenAIConfig::new().with_api_key(api_key.unwrap_or_default());
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature,
            max_tokens,
            timeout,
            has_key,
        }
    }

    pub fn from_config(api: &ApiLlmSection, timeout: Duration) -> Self {
        Self::new(
            api.base_url.as_deref(),
            &api.model,
            api.resolved_api_key(),
            api.temperature,
            api.max_tokens,
            timeout,
        )
    }

    fn to_openai_messages(
        &self,
        system: &str,
        history: &[Message],
        prompt: &str,
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        let mut out = vec![ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.to_string())
                .build()
                .map_err(api_err)?,
        )];
        for m in history {
            let msg = match m.role {
                Role::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(api_err)?,
                ),
                Role::Assistant | Role::Plan => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(api_err)?,
                ),
                Role::Tool => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(format!("Tool result: {}", m.content))
                        .build()
                        .map_err(api_err)?,
                ),
            };
            out.push(msg);
        }
        out.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()
                .map_err(api_err)?,
        ));
        Ok(out)
    }

    async fn complete(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<String, LlmError> {
        if !self.has_key {
            return Err(LlmError::MissingCredentials);
        }
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(api_err)?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout.as_secs()))?
            .map_err(api_err)?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content)
    }
}

#[async_trait]
impl LlmBackend for RemoteBackend {
    fn name(&self) -> &str {
        "api"
    }

    async fn request(&self, prompt: &str, history: &[Message]) -> Result<RawOutput, LlmError> {
        tracing::debug!(model = %self.model, history = history.len(), "api backend request");
        let messages = self.to_openai_messages(&system_prompt(), history, prompt)?;
        let text = self.complete(messages).await?;
        tracing::debug!(output = %text, "api backend output");
        Ok(RawOutput::Text(text))
    }

    /// 直接问答（不带规划规则）
    async fn answer(&self, question: &str) -> Result<String, LlmError> {
        let messages = self.to_openai_messages("You are a helpful assistant.", &[], question)?;
        self.complete(messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(key: Option<&str>) -> RemoteBackend {
        RemoteBackend::new(
            Some("http://127.0.0.1:9"),
            "gpt-test",
            key.map(String::from),
            0.2,
            512,
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_history_role_mapping() {
        let history = vec![
            Message::user("open notes"),
            Message::plan(r#"{"tool":"run_command"}"#),
            Message::tool("ok"),
        ];
        let msgs = backend(Some("k"))
            .to_openai_messages("sys", &history, "next?")
            .unwrap();
        assert_eq!(msgs.len(), 5);
        assert!(matches!(msgs[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(msgs[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(msgs[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(msgs[3], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(msgs[4], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_system_prompt_mentions_marker() {
        let prompt = system_prompt();
        assert!(prompt.contains(TASK_END_TOKEN));
        assert!(prompt.contains("\"tool\""));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let err = backend(None).request("hi", &[]).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingCredentials));
    }
}
