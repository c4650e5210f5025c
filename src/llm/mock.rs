//! Mock 后端（用于测试，无需模型）
//!
//! 按脚本依次返回预设输出；脚本耗尽后可选择重复最后一条或返回失败。
//! 同时记录调用次数与收到的提示词，便于断言规划器是否调用了后端。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmBackend, LlmError, RawOutput};
use crate::memory::Message;

/// 单条脚本输出
#[derive(Clone, Debug)]
pub enum MockReply {
    Output(RawOutput),
    Fail(String),
}

/// 脚本化后端
#[derive(Debug, Default)]
pub struct MockBackend {
    script: Mutex<VecDeque<MockReply>>,
    /// 脚本耗尽后重复最后一条
    repeat_last: bool,
    last: Mutex<Option<MockReply>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依次返回给定文本
    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backend = Self::new();
        for t in texts {
            backend.push(MockReply::Output(RawOutput::Text(t.into())));
        }
        backend
    }

    /// 每次调用都失败
    pub fn failing(reason: impl Into<String>) -> Self {
        let backend = Self::new().repeating();
        backend.push(MockReply::Fail(reason.into()));
        backend
    }

    /// 脚本耗尽后重复最后一条
    pub fn repeating(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    pub fn push(&self, reply: MockReply) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn next_reply(&self) -> Option<MockReply> {
        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match next {
            Some(reply) => {
                *last = Some(reply.clone());
                Some(reply)
            }
            None if self.repeat_last => last.clone(),
            None => None,
        }
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn request(&self, prompt: &str, _history: &[Message]) -> Result<RawOutput, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        match self.next_reply() {
            Some(MockReply::Output(out)) => Ok(out),
            Some(MockReply::Fail(reason)) => Err(LlmError::Transport(reason)),
            None => Err(LlmError::EmptyResponse),
        }
    }
}

/// 回显后端：取提示词中的用户请求，回显为 echo 工具调用（provider = "mock" 时使用，便于离线跑通循环）
#[derive(Debug, Default)]
pub struct EchoBackend;

#[async_trait]
impl LlmBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    async fn request(&self, prompt: &str, _history: &[Message]) -> Result<RawOutput, LlmError> {
        let request = prompt
            .lines()
            .find_map(|l| l.trim().strip_prefix("User request:"))
            .map(str::trim)
            .unwrap_or("(no input)");
        let mut args = serde_json::Map::new();
        args.insert(
            "text".to_string(),
            serde_json::Value::String(format!("Echo from Mock: {}", request)),
        );
        let mut plan = serde_json::Map::new();
        plan.insert("tool".to_string(), serde_json::Value::String("echo".to_string()));
        plan.insert("args".to_string(), serde_json::Value::Object(args));
        Ok(RawOutput::Structured(plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_order_and_exhaustion() {
        let mock = MockBackend::with_texts(["a", "b"]);
        assert_eq!(mock.request("p1", &[]).await.unwrap(), RawOutput::Text("a".into()));
        assert_eq!(mock.request("p2", &[]).await.unwrap(), RawOutput::Text("b".into()));
        assert!(matches!(mock.request("p3", &[]).await, Err(LlmError::EmptyResponse)));
        assert_eq!(mock.calls(), 3);
        assert_eq!(mock.prompts(), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_repeating_and_failing() {
        let mock = MockBackend::with_texts(["x"]).repeating();
        for _ in 0..3 {
            assert_eq!(mock.request("p", &[]).await.unwrap(), RawOutput::Text("x".into()));
        }
        let down = MockBackend::failing("offline");
        assert!(down.request("p", &[]).await.is_err());
        assert!(down.request("p", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_echo_backend_echoes_request_line() {
        let out = EchoBackend
            .request("Tools...\nUser request: open notes\n\nRules:", &[])
            .await
            .unwrap();
        match out {
            RawOutput::Structured(map) => {
                assert_eq!(map["tool"], "echo");
                assert_eq!(map["args"]["text"], "Echo from Mock: open notes");
            }
            other => panic!("unexpected output: {:?}", other),
        }
    }
}
