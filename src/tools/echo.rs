//! Echo 工具：原样返回文本（历史上模型用它给出最终回答）

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::react::ToolKind;
use crate::tools::Tool;

pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Echo
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<String, String> {
        let text = args.get("text").and_then(|v| v.as_str()).unwrap_or("");
        Ok(text.to_string())
    }
}
