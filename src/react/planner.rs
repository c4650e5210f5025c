//! Planner：把用户请求变成一步计划
//!
//! 依次尝试（先命中者生效）：
//! 1. 记忆快捷方式："remember that/this ..." 直接生成 memory_notepad_add，不调用任何后端
//! 2. 简单问题快捷方式：以 ? 结尾且不含动作词，交给问答路由，返回 tool=none + 回答
//! 3. 模型规划：工具目录 + 历史 + 请求 + 输出规则，先本地层，失败且远程层可用时再试远程层
//!
//! 任何路径得到的计划都附上仅供显示的 ui_description；所有后端都失败时返回 tool=none + 错误文本。

use std::sync::Arc;

use crate::llm::{LlmBackend, LlmError, QuestionAnswerer};
use crate::memory::{Message, Role};
use crate::react::normalizer::{normalize, TASK_END_TOKEN};
use crate::react::{Plan, ToolKind, ToolResult};

/// 简单问题快捷方式的动作词（出现任意一个即不走快捷方式）
const ACTION_WORDS: &[&str] = &[
    "file", "screen", "mouse", "type", "command", "search", "web", "run", "move", "click", "read",
    "write", "append",
];

const PREVIEW_LEN: usize = 50;
const TYPED_PREVIEW_LEN: usize = 30;

/// 是否为记忆请求（"remember that ..." / "remember this ..."）
pub fn is_memorize_request(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.starts_with("remember that") || lower.starts_with("remember this")
}

/// 是否为可直接回答的简单问题
pub fn is_simple_question(text: &str) -> bool {
    let q = text.trim().to_lowercase();
    q.ends_with('?') && !ACTION_WORDS.iter().any(|w| q.contains(w))
}

/// 超过上限时截断为 (上限-3) 个字符加 "..."
fn truncate_preview(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max - 3).collect::<String>())
    } else {
        s.to_string()
    }
}

/// 界面用动作描述；无对应描述的工具返回 None
pub fn describe_plan(plan: &Plan) -> Option<String> {
    let arg = |key: &str| plan.arg_str(key).unwrap_or_default();
    let desc = match plan.tool {
        ToolKind::ReadFile => format!("📖 Reading file: {}", arg("path")),
        ToolKind::WriteFile => format!("✍️ Writing to file: {}", arg("path")),
        ToolKind::AppendFile => format!("✍️ Appending to file: {}", arg("path")),
        ToolKind::RunCommand => format!("🔧 Running command: {}", truncate_preview(&arg("cmd"), PREVIEW_LEN)),
        ToolKind::SearchWeb => format!("🔍 Searching web for: {}", truncate_preview(&arg("query"), PREVIEW_LEN)),
        ToolKind::ScreenOcr => "👀 Capturing screen text".to_string(),
        ToolKind::MoveMouse => {
            let coord = |key: &str| plan.arg_str(key).unwrap_or_else(|| "0".to_string());
            format!("🖱️ Moving mouse to ({}, {})", coord("x"), coord("y"))
        }
        ToolKind::Click => "🖱️ Clicking mouse".to_string(),
        ToolKind::TypeText => format!("⌨️ Typing: {}", truncate_preview(&arg("text"), TYPED_PREVIEW_LEN)),
        ToolKind::NotepadAdd => format!("📝 Adding note: {}", truncate_preview(&arg("note"), PREVIEW_LEN)),
        ToolKind::RagQuery => format!("🧠 Querying memory: {}", truncate_preview(&arg("query"), PREVIEW_LEN)),
        ToolKind::DirectAnswer => format!("💡 Answering: {}", truncate_preview(&arg("question"), PREVIEW_LEN)),
        _ => return None,
    };
    Some(desc)
}

/// 提示词中的工具目录（按分组）
pub fn tool_catalog() -> String {
    let mut out = String::from("AVAILABLE TOOLS:\n");
    let mut group = "";
    for entry in ToolKind::catalog() {
        if entry.group != group {
            group = entry.group;
            out.push_str(&format!("\n{}:\n", group));
        }
        out.push_str(&format!(
            "{{\"tool\": \"{}\", \"args\": {}}} - {}\n",
            entry.kind.name(),
            entry.args_example,
            entry.description
        ));
    }
    out
}

/// 规划提示词：工具目录 + 历史 + 请求 + 输出规则
pub fn build_prompt(request: &str, history: &[Message]) -> String {
    let mut history_context = String::new();
    let entries: Vec<&Message> = history
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .collect();
    if !entries.is_empty() {
        history_context.push_str("Previous conversation:\n");
        for m in entries {
            let speaker = match m.role {
                Role::User => "User",
                Role::Tool => "Tool",
                Role::Assistant | Role::Plan => "Assistant",
            };
            history_context.push_str(&format!("{}: {}\n", speaker, m.content.trim()));
        }
        history_context.push('\n');
    }

    format!(
        "You are a command-running agent on a real Linux machine. Follow the rules and use the tools provided.\n\n\
         {}\n\
         {}User request: {}\n\n\
         Rules:\n\
         1. Begin with a short progress sentence.\n\
         2. After that, output ONE JSON tool command.\n\
         3. Keep using tools step by step until the job is finished.\n\
         4. When everything is done, append '{}' to your last sentence and output {{\"tool\": \"none\", \"args\": {{}}}}.\n",
        tool_catalog(),
        history_context,
        request,
        TASK_END_TOKEN
    )
}

/// 跟进提示词：原始请求、刚执行的工具与其结果
pub fn followup_prompt(request: &str, last_plan: &Plan, last_result: &ToolResult) -> String {
    format!(
        "You are an autonomous AI agent. The user asked: '{}'.\n\
         You just executed the tool '{}' with result: {}\n\
         Treat this tool result as a new message in the conversation. \
         If the overall task is not yet complete, plan the next step as a single JSON object (tool+args). \
         When the task is fully done, provide your final summary, append '{}' and return a JSON with tool:'none' and empty args. \
         Remember: output exactly one JSON object besides your short note.",
        request,
        last_plan.tool,
        last_result,
        TASK_END_TOKEN
    )
}

/// Planner：持有两级后端与问答路由
pub struct Planner {
    primary: Arc<dyn LlmBackend>,
    secondary: Option<Arc<dyn LlmBackend>>,
    answerer: Arc<QuestionAnswerer>,
}

impl Planner {
    /// secondary 仅在远程层已启用且有凭证时传入
    pub fn new(
        primary: Arc<dyn LlmBackend>,
        secondary: Option<Arc<dyn LlmBackend>>,
        answerer: Arc<QuestionAnswerer>,
    ) -> Self {
        Self {
            primary,
            secondary,
            answerer,
        }
    }

    /// 是否配置了远程层
    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    pub async fn plan(&self, request: &str, history: &[Message]) -> Plan {
        let mut plan = self.plan_inner(request, history).await;
        plan.ui_description = describe_plan(&plan);
        plan
    }

    async fn plan_inner(&self, request: &str, history: &[Message]) -> Plan {
        if is_memorize_request(request) {
            tracing::info!("memorize shortcut");
            let mut plan = Plan::new(ToolKind::NotepadAdd).with_arg("note", request);
            plan.task_end = true;
            return plan;
        }

        if is_simple_question(request) {
            tracing::info!("simple question shortcut");
            let answer = self.answerer.answer(request).await;
            return Plan::none_with_message(answer);
        }

        let prompt = build_prompt(request, history);
        let primary_err = match self.primary.request(&prompt, history).await {
            Ok(raw) => return normalize(raw),
            Err(e) => e,
        };
        tracing::warn!(backend = self.primary.name(), error = %primary_err, "primary planner backend failed");

        let Some(secondary) = &self.secondary else {
            return Plan::none_with_message(format!("Planning failed: {}", primary_err));
        };
        match secondary.request(&prompt, history).await {
            Ok(raw) => normalize(raw),
            Err(e) => {
                tracing::warn!(backend = secondary.name(), error = %e, "secondary planner backend failed");
                Plan::none_with_message(format!(
                    "Planning failed: {}: {}; {}: {}",
                    self.primary.name(),
                    primary_err,
                    secondary.name(),
                    e
                ))
            }
        }
    }

    /// 跟进规划：直接使用远程层（未配置时用本地层），不走快捷方式
    pub async fn plan_followup(&self, prompt: &str, history: &[Message]) -> Plan {
        let backend = self.secondary.as_ref().unwrap_or(&self.primary);
        let mut plan = match backend.request(prompt, history).await {
            Ok(raw) => normalize(raw),
            Err(e) => {
                tracing::warn!(backend = backend.name(), error = %e, "follow-up planning failed");
                followup_failure(e)
            }
        };
        plan.ui_description = describe_plan(&plan);
        plan
    }
}

fn followup_failure(e: LlmError) -> Plan {
    Plan::none_with_message(format!("Planning failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockBackend;

    fn planner(primary: Arc<MockBackend>, secondary: Option<Arc<MockBackend>>) -> Planner {
        let answerer = Arc::new(QuestionAnswerer::new(primary.clone(), None));
        Planner::new(
            primary,
            secondary.map(|s| s as Arc<dyn LlmBackend>),
            answerer,
        )
    }

    #[test]
    fn test_is_memorize_request() {
        assert!(is_memorize_request("Remember that the meeting is at 3"));
        assert!(is_memorize_request("remember this: buy milk"));
        assert!(!is_memorize_request("please remember that"));
    }

    #[test]
    fn test_is_simple_question() {
        assert!(is_simple_question("what is 2+2?"));
        assert!(is_simple_question("  who wrote Dune?  "));
        assert!(!is_simple_question("can you read the file notes.txt?"));
        assert!(!is_simple_question("what is 2+2"));
        // 子串匹配："running" 含 "run"
        assert!(!is_simple_question("is the server running?"));
    }

    #[test]
    fn test_describe_plan_truncates() {
        let long = "x".repeat(60);
        let plan = Plan::new(ToolKind::RunCommand).with_arg("cmd", long.as_str());
        let desc = describe_plan(&plan).unwrap();
        assert_eq!(desc, format!("🔧 Running command: {}...", "x".repeat(47)));

        let plan = Plan::new(ToolKind::TypeText).with_arg("text", "y".repeat(31));
        assert_eq!(
            describe_plan(&plan).unwrap(),
            format!("⌨️ Typing: {}...", "y".repeat(27))
        );
        assert_eq!(describe_plan(&Plan::default()), None);
    }

    #[test]
    fn test_prompt_contents() {
        let history = vec![Message::user("hi"), Message::tool("")];
        let prompt = build_prompt("list files", &history);
        assert!(prompt.contains("AVAILABLE TOOLS:"));
        assert!(prompt.contains(r#"{"tool": "run_command", "args": {"cmd": "command"}} - Shell command"#));
        assert!(prompt.contains("Previous conversation:\nUser: hi\n"));
        assert!(prompt.contains("User request: list files"));
        assert!(prompt.contains(TASK_END_TOKEN));
    }

    #[tokio::test]
    async fn test_memorize_shortcut_skips_backend() {
        let primary = Arc::new(MockBackend::new());
        let p = planner(primary.clone(), None);
        let plan = p.plan("remember that my favorite color is blue", &[]).await;
        assert_eq!(plan.tool, ToolKind::NotepadAdd);
        assert_eq!(
            plan.arg_str("note").as_deref(),
            Some("remember that my favorite color is blue")
        );
        assert!(plan.task_end);
        assert!(plan.ui_description.is_some());
        assert_eq!(primary.calls(), 0);
    }

    #[tokio::test]
    async fn test_simple_question_shortcut() {
        let primary = Arc::new(MockBackend::with_texts(["4"]));
        let p = planner(primary.clone(), None);
        let plan = p.plan("what is 2+2?", &[]).await;
        assert_eq!(plan.tool, ToolKind::None);
        assert_eq!(plan.message.as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn test_falls_back_to_secondary() {
        let primary = Arc::new(MockBackend::failing("ollama down"));
        let secondary = Arc::new(MockBackend::with_texts([
            r#"Opening. {"tool": "run_command", "args": {"cmd": "ls"}}"#,
        ]));
        let p = planner(primary.clone(), Some(secondary.clone()));
        let plan = p.plan("list my files", &[]).await;
        assert_eq!(plan.tool, ToolKind::RunCommand);
        assert_eq!(plan.message.as_deref(), Some("Opening."));
        assert_eq!(plan.ui_description.as_deref(), Some("🔧 Running command: ls"));
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_tiers_down_yields_none_plan() {
        let primary = Arc::new(MockBackend::failing("ollama down"));
        let secondary = Arc::new(MockBackend::failing("api down"));
        let p = planner(primary, Some(secondary));
        let plan = p.plan("list my files", &[]).await;
        assert_eq!(plan.tool, ToolKind::None);
        let msg = plan.message.unwrap();
        assert!(msg.contains("ollama down"));
        assert!(msg.contains("api down"));
    }

    #[tokio::test]
    async fn test_followup_prefers_secondary() {
        let primary = Arc::new(MockBackend::new());
        let secondary = Arc::new(MockBackend::with_texts([r#"{"tool": "none", "args": {}}"#]));
        let p = planner(primary.clone(), Some(secondary.clone()));
        let plan = p.plan_followup("next?", &[]).await;
        assert_eq!(plan.tool, ToolKind::None);
        assert_eq!(primary.calls(), 0);
        assert_eq!(secondary.calls(), 1);

        let p = planner(primary.clone(), None);
        let plan = p.plan_followup("next?", &[]).await;
        assert_eq!(primary.calls(), 1);
        assert!(plan.message.unwrap().starts_with("Planning failed"));
    }
}
