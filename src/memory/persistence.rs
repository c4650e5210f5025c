//! 会话记录持久化
//!
//! 每个会话一个 JSON 文件（chats/session_YYYYMMDD_HHMMSS.json），内容为完整的对话历史；
//! 支持新建 / 列出 / 加载 / 按序号删除，供 CLI 的会话管理菜单使用。

use std::path::{Path, PathBuf};

use crate::core::AgentError;
use crate::memory::ChatHistory;

/// 会话记录目录
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 生成新会话文件路径（同一秒内重复创建时追加序号，避免覆盖）
    pub fn new_session_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut path = self.dir.join(format!("session_{}.json", stamp));
        let mut n = 2;
        while path.exists() {
            path = self.dir.join(format!("session_{}_{}.json", stamp, n));
            n += 1;
        }
        path
    }

    /// 按文件名排序列出全部会话文件
    pub fn list(&self) -> Vec<PathBuf> {
        let pattern = self.dir.join("session_*.json");
        let mut sessions: Vec<PathBuf> = match glob::glob(&pattern.to_string_lossy()) {
            Ok(paths) => paths.filter_map(Result::ok).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "invalid session glob pattern");
                Vec::new()
            }
        };
        sessions.sort();
        sessions
    }

    /// 按 1 起始的序号取会话文件
    pub fn get(&self, index: usize) -> Result<PathBuf, AgentError> {
        index
            .checked_sub(1)
            .and_then(|i| self.list().into_iter().nth(i))
            .ok_or(AgentError::SessionNotFound(index))
    }

    pub fn load(&self, path: &Path) -> Result<ChatHistory, AgentError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// 写入会话记录；父目录不存在时自动创建
    pub fn save(&self, path: &Path, history: &ChatHistory) -> Result<(), AgentError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(history)?)?;
        Ok(())
    }

    /// 按 1 起始的序号删除会话文件，返回被删除的路径
    pub fn delete(&self, index: usize) -> Result<PathBuf, AgentError> {
        let path = self.get(index)?;
        std::fs::remove_file(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Message;
    use tempfile::TempDir;

    #[test]
    fn test_save_list_load_delete() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        let history = ChatHistory::from_messages(vec![Message::user("a"), Message::tool("b")]);

        store.save(&dir.path().join("session_20240101_000000.json"), &history).unwrap();
        store.save(&dir.path().join("session_20240102_000000.json"), &ChatHistory::new()).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let listed = store.list();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].ends_with("session_20240101_000000.json"));
        assert_eq!(store.load(&store.get(1).unwrap()).unwrap(), history);

        let removed = store.delete(2).unwrap();
        assert!(removed.ends_with("session_20240102_000000.json"));
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_out_of_range_index() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        assert!(matches!(store.get(0), Err(AgentError::SessionNotFound(0))));
        assert!(matches!(store.delete(3), Err(AgentError::SessionNotFound(3))));
    }

    #[test]
    fn test_new_session_path_does_not_clobber() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        let first = store.new_session_path();
        store.save(&first, &ChatHistory::new()).unwrap();
        let second = store.new_session_path();
        assert_ne!(first, second);
    }
}
