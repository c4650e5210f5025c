//! 计划规范化：把后端的任意输出变成合法 Plan，永不失败
//!
//! 结构化输出直接透传（补全 tool/args 默认值）；文本输出依次：
//! 1. 识别并去掉结束标记 TASK_END（区分大小写）
//! 2. 取第一个 `{` 到最后一个 `}` 的片段，先严格 JSON，再宽松字面量（单引号、True/False/None）
//! 3. 片段之外的文字拼接后作为 message
//! 4. 全部失败时返回 tool=none，message 为原文

use serde_json::{Map, Value};

use crate::llm::RawOutput;
use crate::react::Plan;

/// 模型声明任务完成的标记
pub const TASK_END_TOKEN: &str = "TASK_END";

/// 规范化后端输出
pub fn normalize(raw: RawOutput) -> Plan {
    match raw {
        RawOutput::Structured(map) => Plan::from_map(&map),
        RawOutput::Text(text) => parse_plan_from_output(&text),
    }
}

/// 从自由文本中提取计划与伴随说明
pub fn parse_plan_from_output(output: &str) -> Plan {
    let task_end = output.contains(TASK_END_TOKEN);
    let text = if task_end {
        output.replace(TASK_END_TOKEN, "")
    } else {
        output.to_string()
    };
    let text = text.trim();

    let mut plan = match extract_embedded(text) {
        Some(plan) => plan,
        None => match parse_object(text) {
            Some(map) => Plan::from_map(&map),
            None => {
                tracing::debug!(output = %text, "no plan found in model output");
                if text.is_empty() {
                    Plan::default()
                } else {
                    Plan::none_with_message(text)
                }
            }
        },
    };
    if task_end {
        plan.task_end = true;
    }
    plan
}

/// 在 `{` … `}` 片段中找计划；片段外的文字（去掉代码块围栏）作为 message
fn extract_embedded(text: &str) -> Option<Plan> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    let map = parse_object(&text[start..=end])?;
    let mut plan = Plan::from_map(&map);

    let prose = format!("{}{}", &text[..start], &text[end + 1..]);
    let prose = prose.replace("```json", "").replace("```", "");
    let prose = prose.trim();
    if !prose.is_empty() {
        plan.message = Some(prose.to_string());
    }
    Some(plan)
}

/// 解析为 JSON 对象：先严格，再宽松
fn parse_object(s: &str) -> Option<Map<String, Value>> {
    let strict = serde_json::from_str::<Value>(s).ok();
    let value = strict.or_else(|| serde_json::from_str::<Value>(&relax_literal(s)).ok())?;
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// 将字面量风格的映射改写为 JSON：单引号字符串改为双引号，True/False/None 改为 true/false/null
fn relax_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                out.push('"');
                while let Some(c) = chars.next() {
                    out.push(c);
                    if c == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if c == '"' {
                        break;
                    }
                }
            }
            '\'' => {
                out.push('"');
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                if escaped == '\'' {
                                    out.push('\'');
                                } else {
                                    out.push('\\');
                                    out.push(escaped);
                                }
                            }
                        }
                        '"' => out.push_str("\\\""),
                        '\'' => break,
                        other => out.push(other),
                    }
                }
                out.push('"');
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    _ => word.as_str(),
                });
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::react::ToolKind;
    use serde_json::json;

    #[test]
    fn test_plain_text_becomes_none_plan() {
        let plan = parse_plan_from_output("  I could not figure out what to do.  ");
        assert_eq!(plan.tool, ToolKind::None);
        assert!(plan.args.is_empty());
        assert_eq!(plan.message.as_deref(), Some("I could not figure out what to do."));
        assert!(!plan.task_end);
    }

    #[test]
    fn test_embedded_directive_with_prose() {
        let plan = parse_plan_from_output(
            r#"Listing the directory now. {"tool": "run_command", "args": {"cmd": "ls"}}"#,
        );
        assert_eq!(plan.tool, ToolKind::RunCommand);
        assert_eq!(plan.arg_str("cmd").as_deref(), Some("ls"));
        assert_eq!(plan.message.as_deref(), Some("Listing the directory now."));
    }

    #[test]
    fn test_prose_before_and_after_is_joined() {
        let plan = parse_plan_from_output(r#"Step one: {"tool": "click", "args": {}} then wait"#);
        assert_eq!(plan.tool, ToolKind::Click);
        assert_eq!(plan.message.as_deref(), Some("Step one:  then wait"));
    }

    #[test]
    fn test_task_end_marker_is_stripped() {
        let plan = parse_plan_from_output(
            r#"All files written. TASK_END {"tool": "none", "args": {}}"#,
        );
        assert!(plan.task_end);
        assert_eq!(plan.tool, ToolKind::None);
        assert_eq!(plan.message.as_deref(), Some("All files written."));
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        let plan = parse_plan_from_output("task_end please");
        assert!(!plan.task_end);
        assert_eq!(plan.message.as_deref(), Some("task_end please"));
    }

    #[test]
    fn test_literal_style_mapping() {
        let plan = parse_plan_from_output(
            "{'tool': 'write_file', 'args': {'path': '/tmp/a.txt', 'content': 'say \"hi\"'}, 'task_end': True}",
        );
        assert_eq!(plan.tool, ToolKind::WriteFile);
        assert_eq!(plan.arg_str("content").as_deref(), Some("say \"hi\""));
        assert!(plan.task_end);
    }

    #[test]
    fn test_code_fence_is_not_prose() {
        let plan = parse_plan_from_output("```json\n{\"tool\": \"screen_ocr\", \"args\": {}}\n```");
        assert_eq!(plan.tool, ToolKind::ScreenOcr);
        assert_eq!(plan.message, None);
    }

    #[test]
    fn test_unbalanced_braces_fall_back() {
        let plan = parse_plan_from_output("} weird { text");
        assert_eq!(plan.tool, ToolKind::None);
        assert_eq!(plan.message.as_deref(), Some("} weird { text"));
    }

    #[test]
    fn test_structured_passthrough_defaults() {
        let map = json!({"args": {"x": 1}}).as_object().cloned().unwrap();
        let plan = normalize(RawOutput::Structured(map));
        assert_eq!(plan.tool, ToolKind::None);
        assert_eq!(plan.args.get("x"), Some(&json!(1)));
    }

    #[test]
    fn test_normalize_is_idempotent_on_plan_maps() {
        let mut plan = Plan::new(ToolKind::TypeText).with_arg("text", "hello");
        plan.message = Some("Typing".into());
        plan.task_end = true;
        let once = normalize(RawOutput::Structured(plan.to_map()));
        assert_eq!(once, plan);
        let twice = normalize(RawOutput::Structured(once.to_map()));
        assert_eq!(twice, once);
        assert_eq!(normalize(RawOutput::Text(plan.trace())), plan);
    }

    #[test]
    fn test_empty_output() {
        let plan = parse_plan_from_output("   ");
        assert_eq!(plan, Plan::default());
    }
}
