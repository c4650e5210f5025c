//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `COMMANDER__*` 覆盖（双下划线表示嵌套，如 `COMMANDER__LLM__API__ENABLED=true`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub tools: ToolsSection,
}

/// [app] 段：缓存目录（记忆、记事本、会话记录）与单次请求的跟进步数上限
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            cache_dir: default_cache_dir(),
            max_steps: default_max_steps(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_max_steps() -> usize {
    20
}

/// [llm] 段：两级后端（本地进程 / 远程 API）与统一超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 单次后端调用超时（秒），超时视为失败
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub local: LocalLlmSection,
    #[serde(default)]
    pub api: ApiLlmSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_llm_timeout(),
            local: LocalLlmSection::default(),
            api: ApiLlmSection::default(),
        }
    }
}

fn default_llm_timeout() -> u64 {
    60
}

/// [llm.local] 段：本地模型进程（ollama run <model>），provider = "mock" 时使用回显客户端
#[derive(Debug, Clone, Deserialize)]
pub struct LocalLlmSection {
    #[serde(default = "default_local_provider")]
    pub provider: String,
    #[serde(default = "default_local_program")]
    pub program: String,
    #[serde(default = "default_local_model")]
    pub model: String,
}

impl Default for LocalLlmSection {
    fn default() -> Self {
        Self {
            provider: default_local_provider(),
            program: default_local_program(),
            model: default_local_model(),
        }
    }
}

fn default_local_provider() -> String {
    "ollama".to_string()
}

fn default_local_program() -> String {
    "ollama".to_string()
}

fn default_local_model() -> String {
    "llama3.2:3b".to_string()
}

/// [llm.api] 段：OpenAI 兼容端点；enabled 且有 Key 时才作为第二级后端
#[derive(Debug, Clone, Deserialize)]
pub struct ApiLlmSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_api_model")]
    pub model: String,
    pub base_url: Option<String>,
    /// 未设置时读取环境变量 OPENAI_API_KEY
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ApiLlmSection {
    fn default() -> Self {
        Self {
            enabled: false,
            model: default_api_model(),
            base_url: None,
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl ApiLlmSection {
    /// 实际生效的 API Key：配置优先，其次环境变量；空串视为未配置
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// 是否可用作第二级后端（已启用且有凭证）
    pub fn is_credentialed(&self) -> bool {
        self.enabled && self.resolved_api_key().is_some()
    }
}

fn default_api_model() -> String {
    "gpt-4.1-2025-04-14".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    512
}

/// [tools] 段：工具超时、桌面驱动程序、网页搜索
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    /// run_command 自身的超时（秒）
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default)]
    pub desktop: DesktopSection,
    #[serde(default)]
    pub search: SearchSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            desktop: DesktopSection::default(),
            search: SearchSection::default(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    120
}

fn default_command_timeout_secs() -> u64 {
    60
}

/// [tools.desktop] 段：指针/键盘驱动、截图程序与 OCR 程序
#[derive(Debug, Clone, Deserialize)]
pub struct DesktopSection {
    #[serde(default = "default_input_program")]
    pub input_program: String,
    #[serde(default = "default_screenshot_program")]
    pub screenshot_program: String,
    #[serde(default = "default_ocr_program")]
    pub ocr_program: String,
}

impl Default for DesktopSection {
    fn default() -> Self {
        Self {
            input_program: default_input_program(),
            screenshot_program: default_screenshot_program(),
            ocr_program: default_ocr_program(),
        }
    }
}

fn default_input_program() -> String {
    "xdotool".to_string()
}

fn default_screenshot_program() -> String {
    "scrot".to_string()
}

fn default_ocr_program() -> String {
    "tesseract".to_string()
}

/// [tools.search] 段：搜索端点、超时与返回链接数
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSection {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            timeout_secs: default_search_timeout_secs(),
            max_results: default_max_results(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://html.duckduckgo.com/html/".to_string()
}

fn default_search_timeout_secs() -> u64 {
    15
}

fn default_max_results() -> usize {
    5
}

/// 从 config 目录加载配置，环境变量 COMMANDER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 COMMANDER__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("COMMANDER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.max_steps, 20);
        assert_eq!(cfg.llm.timeout_secs, 60);
        assert_eq!(cfg.llm.local.model, "llama3.2:3b");
        assert!(!cfg.llm.api.enabled);
        assert_eq!(cfg.tools.search.max_results, 5);
    }

    #[test]
    fn test_load_explicit_file_overrides_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[app]\ncache_dir = \"/tmp/commander-test\"\nmax_steps = 5\n\n[llm.local]\nprovider = \"mock\"\n",
        )
        .unwrap();
        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.app.max_steps, 5);
        assert_eq!(cfg.app.cache_dir, PathBuf::from("/tmp/commander-test"));
        assert_eq!(cfg.llm.local.provider, "mock");
        // 未出现的段落仍取默认值
        assert_eq!(cfg.llm.local.program, "ollama");
    }

    #[test]
    fn test_api_disabled_is_not_credentialed() {
        let api = ApiLlmSection {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert!(!api.is_credentialed());
        let api = ApiLlmSection {
            enabled: true,
            ..api
        };
        assert!(api.is_credentialed());
    }
}
