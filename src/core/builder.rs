//! Agent 构建器：从配置装配后端、问答路由、Planner、工具注册表与存储
//!
//! CLI 与测试共用同一套装配逻辑；测试通过 with_primary / with_secondary / with_cache_dir 注入替身。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::core::AgentError;
use crate::llm::{EchoBackend, LlmBackend, LocalBackend, QuestionAnswerer, RemoteBackend};
use crate::memory::{MemoryStore, SessionStore};
use crate::react::Planner;
use crate::tools::{
    AppendFileTool, ClickTool, DesktopDriver, DirectAnswerTool, EchoTool, MoveMouseTool,
    NotepadAddTool, RagQueryTool, ReadFileTool, ScreenOcrTool, SearchTool, ShellTool,
    ToolExecutor, ToolRegistry, TypeTextTool, WriteFileTool,
};

/// 本地层 provider 为该值时使用回显后端（无需本地模型即可试跑）
const MOCK_PROVIDER: &str = "mock";

/// Agent 构建器
pub struct AgentBuilder {
    config: AppConfig,
    primary: Option<Arc<dyn LlmBackend>>,
    /// Some(..) 表示显式覆盖远程层（包括显式关闭）
    secondary: Option<Option<Arc<dyn LlmBackend>>>,
    cache_dir: Option<PathBuf>,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            primary: None,
            secondary: None,
            cache_dir: None,
        }
    }

    /// 替换本地层后端
    pub fn with_primary(mut self, backend: Arc<dyn LlmBackend>) -> Self {
        self.primary = Some(backend);
        self
    }

    /// 替换远程层后端；None 表示不使用远程层
    pub fn with_secondary(mut self, backend: Option<Arc<dyn LlmBackend>>) -> Self {
        self.secondary = Some(backend);
        self
    }

    /// 覆盖配置中的缓存目录
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.config.llm.timeout_secs)
    }

    /// 本地层：ollama 子进程，或 provider = "mock" 时的回显后端
    pub fn build_primary(&self) -> Arc<dyn LlmBackend> {
        if let Some(backend) = &self.primary {
            return backend.clone();
        }
        let local = &self.config.llm.local;
        if local.provider == MOCK_PROVIDER {
            tracing::info!("using echo backend for the local tier");
            return Arc::new(EchoBackend);
        }
        tracing::info!(program = %local.program, model = %local.model, "local tier");
        Arc::new(LocalBackend::new(
            local.program.clone(),
            local.model.clone(),
            self.llm_timeout(),
        ))
    }

    /// 远程层：仅在启用且有凭证时存在
    pub fn build_secondary(&self) -> Option<Arc<dyn LlmBackend>> {
        if let Some(backend) = &self.secondary {
            return backend.clone();
        }
        let api = &self.config.llm.api;
        if !api.is_credentialed() {
            tracing::info!("remote tier disabled");
            return None;
        }
        tracing::info!(model = %api.model, "remote tier");
        Some(Arc::new(RemoteBackend::from_config(api, self.llm_timeout())))
    }

    /// 注册全部工具（none / inquiry 由执行器直接处理，不需要注册）
    pub fn build_tool_registry(
        &self,
        memory: &Arc<MemoryStore>,
        answerer: &Arc<QuestionAnswerer>,
    ) -> Result<ToolRegistry, AgentError> {
        let tools_cfg = &self.config.tools;
        let driver = DesktopDriver::new(&tools_cfg.desktop);
        let search = SearchTool::new(&tools_cfg.search)
            .map_err(|e| AgentError::Internal(format!("search tool: {}", e)))?;

        let mut tools = ToolRegistry::new();
        tools.register(ScreenOcrTool(driver.clone()));
        tools.register(MoveMouseTool(driver.clone()));
        tools.register(ClickTool(driver.clone()));
        tools.register(TypeTextTool(driver));
        tools.register(ReadFileTool);
        tools.register(WriteFileTool);
        tools.register(AppendFileTool);
        tools.register(search);
        tools.register(ShellTool::new(tools_cfg.command_timeout_secs));
        tools.register(NotepadAddTool::new(memory.clone()));
        tools.register(RagQueryTool::new(memory.clone()));
        tools.register(DirectAnswerTool::new(answerer.clone()));
        tools.register(EchoTool);
        Ok(tools)
    }

    /// 构建完整的 AgentComponents
    pub fn build_components(self) -> Result<AgentComponents, AgentError> {
        let cache_dir = self
            .cache_dir
            .clone()
            .unwrap_or_else(|| self.config.app.cache_dir.clone());
        let memory = Arc::new(MemoryStore::open(&cache_dir)?);
        let sessions = SessionStore::new(memory.chats_dir());

        let primary = self.build_primary();
        let secondary = self.build_secondary();
        let answerer = Arc::new(QuestionAnswerer::new(primary.clone(), secondary.clone()));
        let tools = self.build_tool_registry(&memory, &answerer)?;

        Ok(AgentComponents {
            planner: Planner::new(primary, secondary, answerer),
            executor: ToolExecutor::new(tools, self.config.tools.tool_timeout_secs),
            memory,
            sessions,
            config: self.config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// 预构建的 Agent 组件
pub struct AgentComponents {
    pub planner: Planner,
    pub executor: ToolExecutor,
    pub memory: Arc<MemoryStore>,
    pub sessions: SessionStore,
    pub config: AppConfig,
}

/// 便捷函数：加载配置并创建 AgentBuilder；配置加载失败时使用默认值
pub fn create_agent_builder(config_path: Option<PathBuf>) -> AgentBuilder {
    let config = crate::config::load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    AgentBuilder::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockBackend;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_has_no_remote_tier() {
        let mut config = AppConfig::default();
        config.llm.api.enabled = false;
        assert!(AgentBuilder::new(config).build_secondary().is_none());
    }

    #[tokio::test]
    async fn test_components_register_every_tool() {
        let dir = TempDir::new().unwrap();
        let components = AgentBuilder::new(AppConfig::default())
            .with_primary(Arc::new(MockBackend::new()))
            .with_secondary(None)
            .with_cache_dir(dir.path())
            .build_components()
            .unwrap();
        let names = components.executor.tool_names();
        for name in [
            "screen_ocr",
            "move_mouse",
            "click",
            "type_text",
            "read_file",
            "write_file",
            "append_file",
            "search_web",
            "run_command",
            "memory_notepad_add",
            "memory_rag_query",
            "direct_answer",
            "echo",
        ] {
            assert!(names.iter().any(|n| n == name), "missing {}", name);
        }
        assert!(components.memory.chats_dir().is_dir());
    }
}
