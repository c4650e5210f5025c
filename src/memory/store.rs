//! 持久记忆存储
//!
//! 以显式根目录构造，下辖：
//! - memory.json：最近一次请求与计划
//! - notepad.json：只追加的记事本
//! - rag.json：朴素检索库（[{"text": ...}]）
//! - chat_history.json：运行中的对话历史
//! - chats/：按时间戳命名的会话记录（见 persistence）
//!
//! 记事本与检索库每次写入都同步落盘；通用记忆由控制循环在每次请求结束时写入。

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::memory::long_term::{best_match, RagRecord};
use crate::memory::ChatHistory;
use crate::react::Plan;

/// 检索库为空时的返回
pub const NO_RAG_MEMORY: &str = "[No RAG memory yet]";
/// 检索库无任何重叠时的返回
pub const NO_RELEVANT_MEMORY: &str = "[No relevant memory found]";

const MEMORY_FILE: &str = "memory.json";
const NOTEPAD_FILE: &str = "notepad.json";
const RAG_FILE: &str = "rag.json";
const CHAT_HISTORY_FILE: &str = "chat_history.json";
const CHATS_DIR: &str = "chats";

/// 通用记忆记录：最近一次请求与其计划
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    #[serde(default)]
    pub last_request: Option<String>,
    #[serde(default)]
    pub last_plan: Option<Plan>,
}

/// 记忆存储：启动时加载一次，之后由控制循环与记忆类工具共享（Arc）
#[derive(Debug)]
pub struct MemoryStore {
    root: PathBuf,
    state: RwLock<MemoryState>,
    notepad: RwLock<Vec<String>>,
    rag: RwLock<Vec<RagRecord>>,
}

/// 损坏文件的备份位置：notepad.json -> notepad.json.corrupt
fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    path.with_file_name(name)
}

/// 读取 JSON 文件；不存在时返回默认值。
/// 内容损坏时先改名为 *.corrupt 再返回默认值，下次写入不会覆盖原内容。
fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(_) => return T::default(),
    };
    match serde_json::from_str(&data) {
        Ok(v) => v,
        Err(e) => {
            let backup = corrupt_path(path);
            match std::fs::rename(path, &backup) {
                Ok(()) => tracing::warn!(
                    path = %path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "corrupt memory file moved aside, starting empty"
                ),
                Err(re) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    rename_error = %re,
                    "corrupt memory file could not be moved aside, starting empty"
                ),
            }
            T::default()
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AgentError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

impl MemoryStore {
    /// 打开（必要时创建）根目录并加载全部记录
    pub fn open(root: impl AsRef<Path>) -> Result<Self, AgentError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join(CHATS_DIR))?;
        Ok(Self {
            state: RwLock::new(load_or_default(&root.join(MEMORY_FILE))),
            notepad: RwLock::new(load_or_default(&root.join(NOTEPAD_FILE))),
            rag: RwLock::new(load_or_default(&root.join(RAG_FILE))),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 会话记录目录
    pub fn chats_dir(&self) -> PathBuf {
        self.root.join(CHATS_DIR)
    }

    pub fn state(&self) -> MemoryState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// 更新最近请求/计划并落盘
    pub fn record_request(&self, request: &str, plan: Option<&Plan>) -> Result<(), AgentError> {
        let snapshot = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.last_request = Some(request.to_string());
            state.last_plan = plan.cloned();
            state.clone()
        };
        write_json(&self.root.join(MEMORY_FILE), &snapshot)
    }

    /// 记事本追加一条并立即落盘；同时写入检索库，便于之后 memory_rag_query 命中。
    /// 落盘失败时内存中的记录保持不变。
    pub fn add_note(&self, note: &str) -> Result<(), AgentError> {
        {
            let mut notepad = self.notepad.write().unwrap_or_else(|e| e.into_inner());
            let mut next = notepad.clone();
            next.push(note.to_string());
            write_json(&self.root.join(NOTEPAD_FILE), &next)?;
            *notepad = next;
        }
        self.add_to_rag(note)
    }

    pub fn notepad(&self) -> Vec<String> {
        self.notepad.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// 检索库追加一条并立即落盘
    pub fn add_to_rag(&self, text: &str) -> Result<(), AgentError> {
        let mut rag = self.rag.write().unwrap_or_else(|e| e.into_inner());
        let mut next = rag.clone();
        next.push(RagRecord::new(text));
        write_json(&self.root.join(RAG_FILE), &next)?;
        *rag = next;
        Ok(())
    }

    pub fn rag_records(&self) -> Vec<RagRecord> {
        self.rag.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// 词重叠检索：返回最佳匹配文本，或空库 / 无匹配的哨兵文本
    pub fn rag_query(&self, query: &str) -> String {
        let rag = self.rag.read().unwrap_or_else(|e| e.into_inner());
        if rag.is_empty() {
            return NO_RAG_MEMORY.to_string();
        }
        best_match(&rag, query)
            .map(str::to_string)
            .unwrap_or_else(|| NO_RELEVANT_MEMORY.to_string())
    }

    pub fn load_chat_history(&self) -> ChatHistory {
        load_or_default(&self.root.join(CHAT_HISTORY_FILE))
    }

    pub fn save_chat_history(&self, history: &ChatHistory) -> Result<(), AgentError> {
        write_json(&self.root.join(CHAT_HISTORY_FILE), history)
    }

    /// 删除全部缓存与会话记录，重建空的 chats/ 目录并清空内存中的记录
    pub fn clear_all(&self) -> Result<(), AgentError> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        std::fs::create_dir_all(self.chats_dir())?;
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = MemoryState::default();
        self.notepad.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.rag.write().unwrap_or_else(|e| e.into_inner()).clear();
        Ok(())
    }
}
