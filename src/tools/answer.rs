//! direct_answer：交给问答路由回答事实性问题

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::llm::QuestionAnswerer;
use crate::react::ToolKind;
use crate::tools::Tool;

pub struct DirectAnswerTool {
    answerer: Arc<QuestionAnswerer>,
}

impl DirectAnswerTool {
    pub fn new(answerer: Arc<QuestionAnswerer>) -> Self {
        Self { answerer }
    }
}

#[async_trait]
impl Tool for DirectAnswerTool {
    fn kind(&self) -> ToolKind {
        ToolKind::DirectAnswer
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<String, String> {
        let question = args.get("question").and_then(|v| v.as_str()).unwrap_or("");
        Ok(self.answerer.answer(question).await)
    }
}
