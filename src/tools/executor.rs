//! 工具执行器
//!
//! 按计划中的工具标识分派（对 ToolKind 穷尽匹配）：先校验必需参数（缺失时返回 "Missing ..."），
//! 再在超时内调用注册的工具；失败、panic 或超时转为 "Error in tool execution: ..."。
//! 每次调用输出结构化审计日志（JSON）。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use serde_json::{Map, Value};
use tokio::time::timeout;

use crate::react::{Plan, ToolKind, ToolResult};
use crate::tools::ToolRegistry;

/// 未给出问题时的澄清请求
pub const GENERIC_CLARIFICATION: &str = "The AI is requesting clarification.";

/// 工具执行器：对每次调用施加超时，并将结果统一为 ToolResult
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

/// 参数存在且非 null
fn present(args: &Map<String, Value>, key: &str) -> bool {
    !matches!(args.get(key), None | Some(Value::Null))
}

/// 参数存在、非 null、且不是空字符串
fn non_empty(args: &Map<String, Value>, key: &str) -> bool {
    match args.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// 必需参数校验；返回缺失提示
pub fn missing_argument(plan: &Plan) -> Option<&'static str> {
    let args = &plan.args;
    match plan.tool {
        ToolKind::MoveMouse if !(present(args, "x") && present(args, "y")) => {
            Some("Missing x or y argument.")
        }
        ToolKind::ReadFile if !non_empty(args, "path") => Some("Missing file path."),
        ToolKind::WriteFile | ToolKind::AppendFile
            if !(present(args, "path") && present(args, "content")) =>
        {
            Some("Missing path or content.")
        }
        ToolKind::SearchWeb | ToolKind::RagQuery if !non_empty(args, "query") => {
            Some("Missing query.")
        }
        ToolKind::RunCommand if !non_empty(args, "cmd") => Some("Missing command."),
        ToolKind::NotepadAdd if !non_empty(args, "note") => Some("Missing note."),
        ToolKind::DirectAnswer if !non_empty(args, "question") => Some("Missing question."),
        _ => None,
    }
}

/// inquiry 的问题文本：question / inquiry / text 依次取第一个非空值
fn inquiry_text(args: &Map<String, Value>) -> String {
    ["question", "inquiry", "text"]
        .iter()
        .filter_map(|k| args.get(*k).and_then(|v| v.as_str()))
        .find(|s| !s.trim().is_empty())
        .unwrap_or(GENERIC_CLARIFICATION)
        .to_string()
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 执行一步计划；总是返回结果，失败以描述性文本表达
    pub async fn execute(&self, plan: &Plan, request: &str) -> ToolResult {
        if let Some(missing) = missing_argument(plan) {
            return ToolResult::text(missing);
        }
        match &plan.tool {
            ToolKind::None => ToolResult::text(""),
            ToolKind::Inquiry => ToolResult::Inquiry(inquiry_text(&plan.args)),
            ToolKind::Unknown(name) => ToolResult::text(format!("Unknown tool: {}", name)),
            ToolKind::ScreenOcr
            | ToolKind::MoveMouse
            | ToolKind::Click
            | ToolKind::TypeText
            | ToolKind::ReadFile
            | ToolKind::WriteFile
            | ToolKind::AppendFile
            | ToolKind::SearchWeb
            | ToolKind::RunCommand
            | ToolKind::NotepadAdd
            | ToolKind::RagQuery
            | ToolKind::DirectAnswer
            | ToolKind::Echo => ToolResult::Text(self.invoke(&plan.tool, &plan.args, request).await),
        }
    }

    /// 在超时内调用注册的工具；输出 JSON 审计日志
    async fn invoke(&self, kind: &ToolKind, args: &Map<String, Value>, request: &str) -> String {
        let Some(tool) = self.registry.get(kind) else {
            return format!("Unknown tool: {}", kind);
        };
        let start = Instant::now();
        let result = timeout(self.timeout, AssertUnwindSafe(tool.execute(args)).catch_unwind()).await;

        let (outcome, result): (&str, Result<String, String>) = match result {
            Ok(Ok(Ok(content))) => ("ok", Ok(content)),
            Ok(Ok(Err(e))) => ("error", Err(e)),
            Ok(Err(panic)) => {
                let reason = panic_message(panic.as_ref());
                tracing::error!(tool = kind.name(), reason = %reason, "tool panicked");
                ("panic", Err(reason))
            }
            Err(_) => (
                "timeout",
                Err(format!("{} timed out after {}s", kind, self.timeout.as_secs())),
            ),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": kind.name(),
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": preview(&Value::Object(args.clone()).to_string()),
            "request_preview": preview(request),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(content) => content,
            Err(e) => format!("Error in tool execution: {}", e),
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }
}

/// panic 负载中的文本
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn preview(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}
