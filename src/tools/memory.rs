//! 记忆类工具：记事本追加、检索库查询

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::memory::MemoryStore;
use crate::react::ToolKind;
use crate::tools::Tool;

/// memory_notepad_add：追加一条笔记（同时进入检索库）
pub struct NotepadAddTool {
    store: Arc<MemoryStore>,
}

impl NotepadAddTool {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for NotepadAddTool {
    fn kind(&self) -> ToolKind {
        ToolKind::NotepadAdd
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<String, String> {
        let note = args.get("note").and_then(|v| v.as_str()).unwrap_or("");
        self.store.add_note(note).map_err(|e| e.to_string())?;
        Ok("Added to notepad memory.".to_string())
    }
}

/// memory_rag_query：按词重叠检索最相关的一条记录
pub struct RagQueryTool {
    store: Arc<MemoryStore>,
}

impl RagQueryTool {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RagQueryTool {
    fn kind(&self) -> ToolKind {
        ToolKind::RagQuery
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<String, String> {
        let query = args.get("query").and_then(|v| v.as_str()).unwrap_or("");
        Ok(self.store.rag_query(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{NO_RAG_MEMORY, NO_RELEVANT_MEMORY};
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_note_then_query() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::open(dir.path()).unwrap());
        let add = NotepadAddTool::new(store.clone());
        let query = RagQueryTool::new(store.clone());

        let q = json!({"query": "parking spot"}).as_object().cloned().unwrap();
        assert_eq!(query.execute(&q).await.unwrap(), NO_RAG_MEMORY);

        let n = json!({"note": "my parking spot is B12"}).as_object().cloned().unwrap();
        assert_eq!(add.execute(&n).await.unwrap(), "Added to notepad memory.");
        assert_eq!(query.execute(&q).await.unwrap(), "my parking spot is B12");

        let miss = json!({"query": "weather"}).as_object().cloned().unwrap();
        assert_eq!(query.execute(&miss).await.unwrap(), NO_RELEVANT_MEMORY);
        assert_eq!(store.notepad(), vec!["my parking spot is B12".to_string()]);
    }
}
