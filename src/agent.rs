//! Agent 运行时
//!
//! 持有装配好的组件、当前会话的聊天历史与会话记录文件；
//! handle_request 对单条用户输入跑一轮控制循环并返回最终回复。
//! 通过 `&mut self` 驱动，保证同一时刻只有一个控制循环在运行。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::{AgentComponents, AgentError};
use crate::memory::{ChatHistory, MemoryStore, SessionStore};
use crate::react::{run_turn, ReactSession, TurnObserver};

pub struct Agent {
    components: AgentComponents,
    history: ChatHistory,
    session_path: PathBuf,
}

impl Agent {
    /// 以新会话启动
    pub fn new(components: AgentComponents) -> Self {
        let session_path = components.sessions.new_session_path();
        Self {
            components,
            history: ChatHistory::new(),
            session_path,
        }
    }

    /// 开始新会话：清空历史并分配新的会话记录文件
    pub fn new_session(&mut self) {
        self.history = ChatHistory::new();
        self.session_path = self.components.sessions.new_session_path();
        tracing::info!(path = %self.session_path.display(), "new session");
    }

    /// 恢复已有会话：之后的请求以其历史为上下文，并继续写入同一文件
    pub fn resume(&mut self, path: &Path) -> Result<(), AgentError> {
        self.history = self.components.sessions.load(path)?;
        self.session_path = path.to_path_buf();
        tracing::info!(path = %path.display(), entries = self.history.len(), "resumed session");
        Ok(())
    }

    /// 处理一个顶层请求（含全部跟进步骤）
    pub async fn handle_request(&mut self, request: &str, observer: &dyn TurnObserver) -> String {
        let c = &self.components;
        let session = ReactSession::new(
            &c.planner,
            &c.executor,
            &c.memory,
            &c.sessions,
            &self.session_path,
        )
        .with_observer(observer)
        .with_max_steps(c.config.app.max_steps);
        run_turn(&session, &mut self.history, request).await
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.components.memory
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.components.sessions
    }

    /// 删除全部缓存（记忆、记事本、检索库、会话记录）并开始新会话
    pub fn clear_all(&mut self) -> Result<(), AgentError> {
        self.components.memory.clear_all()?;
        self.new_session();
        Ok(())
    }

    pub fn max_steps(&self) -> usize {
        self.components.config.app.max_steps
    }

    /// 当前规划所用的后端层（用于界面提示）
    pub fn backend_label(&self) -> &'static str {
        if self.components.planner.has_secondary() {
            "remote API"
        } else {
            "local LLM"
        }
    }
}
