//! Agent 错误类型
//!
//! 只用于配置、持久化等边界；规划与工具执行的失败在各自边界内降级为文本，不会以错误形式到达控制循环。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误（配置、存储读写、会话索引等）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session not found: #{0}")]
    SessionNotFound(usize),

    #[error("Internal failure: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for AgentError {
    fn from(e: config::ConfigError) -> Self {
        AgentError::ConfigError(e.to_string())
    }
}
