//! 计划与工具结果类型
//!
//! Plan 是规划器与执行器之间的唯一契约：{tool, args, message?, task_end?, ui_description?}。
//! ToolKind 是封闭的工具枚举（未知名称保留在 Unknown 中，由执行器报告），
//! ToolResult 区分普通文本与需要用户澄清的 Inquiry。

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 工具标识
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolKind {
    ScreenOcr,
    MoveMouse,
    Click,
    TypeText,
    ReadFile,
    WriteFile,
    AppendFile,
    SearchWeb,
    RunCommand,
    NotepadAdd,
    RagQuery,
    DirectAnswer,
    Echo,
    Inquiry,
    None,
    /// 模型给出的未知工具名，执行时返回 "Unknown tool: ..."
    Unknown(String),
}

/// 工具目录中的一行：名称、参数示例、一句话说明、分组
pub struct CatalogEntry {
    pub kind: ToolKind,
    pub args_example: &'static str,
    pub description: &'static str,
    pub group: &'static str,
}

impl ToolKind {
    /// 全部已知工具（不含 Unknown）
    pub const ALL: [ToolKind; 15] = [
        ToolKind::ScreenOcr,
        ToolKind::MoveMouse,
        ToolKind::Click,
        ToolKind::TypeText,
        ToolKind::ReadFile,
        ToolKind::WriteFile,
        ToolKind::AppendFile,
        ToolKind::SearchWeb,
        ToolKind::RunCommand,
        ToolKind::NotepadAdd,
        ToolKind::RagQuery,
        ToolKind::DirectAnswer,
        ToolKind::Echo,
        ToolKind::Inquiry,
        ToolKind::None,
    ];

    pub fn name(&self) -> &str {
        match self {
            ToolKind::ScreenOcr => "screen_ocr",
            ToolKind::MoveMouse => "move_mouse",
            ToolKind::Click => "click",
            ToolKind::TypeText => "type_text",
            ToolKind::ReadFile => "read_file",
            ToolKind::WriteFile => "write_file",
            ToolKind::AppendFile => "append_file",
            ToolKind::SearchWeb => "search_web",
            ToolKind::RunCommand => "run_command",
            ToolKind::NotepadAdd => "memory_notepad_add",
            ToolKind::RagQuery => "memory_rag_query",
            ToolKind::DirectAnswer => "direct_answer",
            ToolKind::Echo => "echo",
            ToolKind::Inquiry => "inquiry",
            ToolKind::None => "none",
            ToolKind::Unknown(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .find(|k| k.name() == name)
            .cloned()
            .unwrap_or_else(|| ToolKind::Unknown(name.to_string()))
    }

    /// 终止类工具：执行后不再追问下一步（echo 为历史遗留的完成信号）
    pub fn is_terminal(&self) -> bool {
        matches!(self, ToolKind::None | ToolKind::Echo)
    }

    /// 提示词中的工具目录
    pub fn catalog() -> &'static [CatalogEntry] {
        CATALOG
    }
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry { kind: ToolKind::ScreenOcr, args_example: "{}", description: "Capture screen text", group: "Input/Output" },
    CatalogEntry { kind: ToolKind::MoveMouse, args_example: r#"{"x": 123, "y": 456}"#, description: "Move mouse", group: "Input/Output" },
    CatalogEntry { kind: ToolKind::Click, args_example: "{}", description: "Click mouse", group: "Input/Output" },
    CatalogEntry { kind: ToolKind::TypeText, args_example: r#"{"text": "text"}"#, description: "Type text", group: "Input/Output" },
    CatalogEntry { kind: ToolKind::ReadFile, args_example: r#"{"path": "/path"}"#, description: "Read file", group: "Files" },
    CatalogEntry { kind: ToolKind::WriteFile, args_example: r#"{"path": "/path", "content": "text"}"#, description: "Write file", group: "Files" },
    CatalogEntry { kind: ToolKind::AppendFile, args_example: r#"{"path": "/path", "content": "text"}"#, description: "Append to file", group: "Files" },
    CatalogEntry { kind: ToolKind::SearchWeb, args_example: r#"{"query": "terms"}"#, description: "Web search", group: "System & Web" },
    CatalogEntry { kind: ToolKind::RunCommand, args_example: r#"{"cmd": "command"}"#, description: "Shell command", group: "System & Web" },
    CatalogEntry { kind: ToolKind::NotepadAdd, args_example: r#"{"note": "text"}"#, description: "Add note", group: "Memory & Communication" },
    CatalogEntry { kind: ToolKind::RagQuery, args_example: r#"{"query": "text"}"#, description: "Query memory", group: "Memory & Communication" },
    CatalogEntry { kind: ToolKind::DirectAnswer, args_example: r#"{"question": "text"}"#, description: "Answer a factual question", group: "Memory & Communication" },
    CatalogEntry { kind: ToolKind::Echo, args_example: r#"{"text": "final answer"}"#, description: "Reply with text and finish", group: "Memory & Communication" },
    CatalogEntry { kind: ToolKind::Inquiry, args_example: r#"{"text": "question"}"#, description: "Ask user", group: "Memory & Communication" },
    CatalogEntry { kind: ToolKind::None, args_example: "{}", description: "No action needed", group: "Memory & Communication" },
];

impl From<String> for ToolKind {
    fn from(s: String) -> Self {
        ToolKind::from_name(&s)
    }
}

impl From<ToolKind> for String {
    fn from(k: ToolKind) -> Self {
        k.name().to_string()
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Default for ToolKind {
    fn default() -> Self {
        ToolKind::None
    }
}

/// 一步计划
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// 工具名，如 "run_command"；未给出时视为 "none"
    #[serde(default)]
    pub tool: ToolKind,
    /// 工具参数
    #[serde(default)]
    pub args: Map<String, Value>,
    /// 伴随计划的说明文字（进度叙述或最终回答）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 模型声明任务已完成
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub task_end: bool,
    /// 仅供界面显示的动作描述
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_description: Option<String>,
}

impl Plan {
    pub fn new(tool: ToolKind) -> Self {
        Self {
            tool,
            ..Default::default()
        }
    }

    /// 无动作计划，可附带说明文字
    pub fn none_with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }

    /// 取字符串参数（非字符串的标量会被转成字符串）
    pub fn arg_str(&self, key: &str) -> Option<String> {
        match self.args.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// 映射形式（与磁盘 / 历史中的格式一致）
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// 宽松地从映射构造：缺失或类型不符的字段取默认值
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let text = |key: &str| match map.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        let tool = match map.get("tool") {
            Some(Value::String(s)) if !s.trim().is_empty() => ToolKind::from_name(s.trim()),
            _ => ToolKind::None,
        };
        let args = match map.get("args") {
            Some(Value::Object(a)) => a.clone(),
            _ => Map::new(),
        };
        let task_end = match map.get("task_end") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };
        Self {
            tool,
            args,
            message: text("message"),
            task_end,
            ui_description: text("ui_description"),
        }
    }

    /// 历史中的计划轨迹文本
    pub fn trace(&self) -> String {
        Value::Object(self.to_map()).to_string()
    }
}

/// 工具调用结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolResult {
    Text(String),
    /// 需要用户澄清，附带问题文本
    Inquiry(String),
}

impl ToolResult {
    pub fn text(s: impl Into<String>) -> Self {
        ToolResult::Text(s.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            ToolResult::Text(s) | ToolResult::Inquiry(s) => s,
        }
    }

    pub fn is_inquiry(&self) -> bool {
        matches!(self, ToolResult::Inquiry(_))
    }
}

impl fmt::Display for ToolResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_names_round_trip() {
        for kind in ToolKind::ALL.iter() {
            assert_eq!(&ToolKind::from_name(kind.name()), kind);
        }
        assert_eq!(
            ToolKind::from_name("launch_rocket"),
            ToolKind::Unknown("launch_rocket".to_string())
        );
    }

    #[test]
    fn test_plan_serializes_tool_as_string() {
        let plan = Plan::new(ToolKind::NotepadAdd).with_arg("note", "x");
        let v = serde_json::to_value(&plan).unwrap();
        assert_eq!(v, json!({"tool": "memory_notepad_add", "args": {"note": "x"}}));
    }

    #[test]
    fn test_from_map_defaults() {
        let map = json!({"args": "oops", "task_end": true})
            .as_object()
            .cloned()
            .unwrap();
        let plan = Plan::from_map(&map);
        assert_eq!(plan.tool, ToolKind::None);
        assert!(plan.args.is_empty());
        assert!(plan.task_end);
    }

    #[test]
    fn test_map_form_is_stable() {
        let mut plan = Plan::new(ToolKind::WriteFile)
            .with_arg("path", "/tmp/x")
            .with_arg("content", "hi");
        plan.message = Some("Writing".into());
        plan.task_end = true;
        plan.ui_description = Some("write".into());
        assert_eq!(Plan::from_map(&plan.to_map()), plan);
    }

    #[test]
    fn test_arg_str_stringifies_numbers() {
        let plan = Plan::new(ToolKind::MoveMouse).with_arg("x", 10);
        assert_eq!(plan.arg_str("x").as_deref(), Some("10"));
        assert_eq!(plan.arg_str("y"), None);
    }
}
