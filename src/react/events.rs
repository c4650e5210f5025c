//! 控制循环过程事件：供 CLI 展示旁白、工具状态与澄清问题

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON，便于日志或其它前端）
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactEvent {
    /// 跟进步数更新（第几步 / 上限）
    StepUpdate { step: usize, max_steps: usize },
    /// 计划附带的旁白
    Narration { text: String },
    /// 即将执行的工具（description 为 ui_description）
    ToolCall {
        tool: String,
        description: Option<String>,
    },
    /// 工具返回（预览，避免过长）
    Observation { tool: String, preview: String },
    /// 工具请求用户澄清
    Inquiry { question: String },
    /// 循环内部错误（已被吞掉，不会中断会话）
    Error { text: String },
    /// 本轮最终回复
    Final { text: String },
}
