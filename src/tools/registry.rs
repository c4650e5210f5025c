//! 工具注册表
//!
//! 所有工具实现 Tool trait（kind / execute），由 ToolRegistry 按 ToolKind 注册与查找，
//! ToolExecutor 在调用前校验参数、调用时加超时，并把结果统一成 ToolResult。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::react::ToolKind;

/// 工具 trait：标识与异步执行（args 为计划中的参数映射）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 对应计划中的 "tool" 字段
    fn kind(&self) -> ToolKind;

    /// 执行工具；Err 为人类可读的失败原因
    async fn execute(&self, args: &Map<String, Value>) -> Result<String, String>;
}

/// 工具注册表：按 ToolKind 存储 Arc<dyn Tool>
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.kind(), Arc::new(tool));
    }

    pub fn get(&self, kind: &ToolKind) -> Option<Arc<dyn Tool>> {
        self.tools.get(kind).cloned()
    }

    /// 已注册工具名（排序后）
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().map(|k| k.name().to_string()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::EchoTool;

    #[tokio::test]
    async fn test_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        assert_eq!(registry.tool_names(), vec!["echo".to_string()]);
        let tool = registry.get(&ToolKind::Echo).unwrap();
        let mut args = Map::new();
        args.insert("text".into(), Value::String("hi".into()));
        assert_eq!(tool.execute(&args).await.unwrap(), "hi");
        assert!(registry.get(&ToolKind::Click).is_none());
    }
}
