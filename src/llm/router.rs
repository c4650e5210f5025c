//! 问答路由
//!
//! 根据问题难度选择后端：
//! - 简单问题（寒暄，或不超过 8 个词且不含推理类关键词）：本地模型
//! - 其他问题：远程 API（已配置且有凭证时），否则回落本地
//!
//! 失败时返回方括号包裹的错误说明，调用方总能拿到字符串。

use std::sync::Arc;

use crate::llm::LlmBackend;

/// 问题难度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Easy,
    Hard,
}

const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "how are you",
    "good morning",
    "good evening",
    "good night",
];

const HARD_KEYWORDS: &[&str] = &[
    "explain", "why", "how", "summarize", "analyze", "compare", "difference", "write", "code",
    "generate", "complex", "difficult",
];

/// 问题难度检测
pub fn classify_question(question: &str) -> QuestionKind {
    let q = question.trim().to_lowercase();
    if GREETINGS.contains(&q.as_str()) {
        return QuestionKind::Easy;
    }
    if q.split_whitespace().count() <= 8 && !HARD_KEYWORDS.iter().any(|k| q.contains(k)) {
        return QuestionKind::Easy;
    }
    QuestionKind::Hard
}

/// 问答器：持有本地后端与可选的远程后端
pub struct QuestionAnswerer {
    local: Arc<dyn LlmBackend>,
    remote: Option<Arc<dyn LlmBackend>>,
}

impl QuestionAnswerer {
    /// remote 仅在远程层已启用且有凭证时传入
    pub fn new(local: Arc<dyn LlmBackend>, remote: Option<Arc<dyn LlmBackend>>) -> Self {
        Self { local, remote }
    }

    pub async fn answer(&self, question: &str) -> String {
        let kind = classify_question(question);
        match (kind, &self.remote) {
            (QuestionKind::Hard, Some(remote)) => {
                tracing::info!(backend = remote.name(), "answering question via api");
                match remote.answer(question).await {
                    Ok(text) => text,
                    Err(e) => format!("[API error: {}]", e),
                }
            }
            _ => {
                tracing::info!(backend = self.local.name(), ?kind, "answering question locally");
                match self.local.answer(question).await {
                    Ok(text) => text,
                    Err(e) => format!("[Local LLM error: {}]", e),
                }
            }
        }
    }
}
