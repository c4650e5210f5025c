//! 记忆层：对话历史、持久记忆（通用记录 / 记事本 / 检索库）、会话记录

pub mod conversation;
pub mod long_term;
pub mod persistence;
pub mod store;

pub use conversation::{ChatHistory, Message, Role};
pub use long_term::RagRecord;
pub use persistence::SessionStore;
pub use store::{MemoryState, MemoryStore, NO_RAG_MEMORY, NO_RELEVANT_MEMORY};
