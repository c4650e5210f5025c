//! 模型后端抽象
//!
//! 所有后端（本地进程 / 远程 API / Mock）实现 LlmBackend：给定提示词与对话历史，
//! 返回结构化映射或自由文本；失败以 LlmError 表达，由规划器决定是否换层重试。

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::memory::Message;

/// 后端原始输出
#[derive(Clone, Debug, PartialEq)]
pub enum RawOutput {
    /// 已是键值映射（如后端原生支持结构化输出）
    Structured(Map<String, Value>),
    /// 自由文本，需经规范化提取计划
    Text(String),
}

impl RawOutput {
    /// 原样文本形式（用于问答等不需要计划的场景）
    pub fn into_text(self) -> String {
        match self {
            RawOutput::Text(s) => s,
            RawOutput::Structured(map) => Value::Object(map).to_string(),
        }
    }
}

/// 后端错误
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("no API key configured")]
    MissingCredentials,

    #[error("backend returned no output")]
    EmptyResponse,
}

/// 模型后端 trait
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// 后端名称（日志用）
    fn name(&self) -> &str;

    /// 发送提示词（附带历史作为上下文）
    async fn request(&self, prompt: &str, history: &[Message]) -> Result<RawOutput, LlmError>;

    /// 直接回答问题；默认以问答提示词走 request
    async fn answer(&self, question: &str) -> Result<String, LlmError> {
        let prompt = format!(
            "Answer the following question concisely and factually.\nQuestion: {}",
            question
        );
        let text = self.request(&prompt, &[]).await?.into_text();
        Ok(text.trim().to_string())
    }
}
