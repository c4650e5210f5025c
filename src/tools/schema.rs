//! 计划格式 JSON Schema（schemars 自动生成）
//!
//! 拼入远程后端的 system prompt，减少模型输出格式错误。

use std::collections::HashMap;

use schemars::{schema_for, JsonSchema};

/// 计划格式：与规范化器解析的 `{"tool": "...", "args": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct PlanFormat {
    /// 工具名，如 run_command、write_file、memory_notepad_add、none
    pub tool: String,
    /// 工具参数，依工具不同而不同（path、content、cmd、query、text 等）
    pub args: HashMap<String, serde_json::Value>,
}

/// 返回计划格式的 JSON Schema 字符串
pub fn plan_schema_json() -> String {
    let schema = schema_for!(PlanFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
