//! 控制循环
//!
//! Plan -> Execute -> Decide -> (跟进 Plan | 结束)；跟进步数有硬上限。
//! 无论步骤中是否 panic，结束时都会持久化聊天历史、会话记录与最近一次请求/计划。

use std::panic::AssertUnwindSafe;
use std::path::Path;

use async_trait::async_trait;
use futures_util::FutureExt;

use crate::memory::{ChatHistory, MemoryStore, Message, SessionStore};
use crate::react::planner::followup_prompt;
use crate::react::{Plan, Planner, ReactEvent, ToolResult, TASK_END_TOKEN};
use crate::tools::executor::panic_message;
use crate::tools::ToolExecutor;

/// 单次请求内的默认跟进步数上限
pub const MAX_REACT_STEPS: usize = 20;

/// 没有任何结果时的回复
pub const NO_RESPONSE: &str = "No response from AI.";

/// 结果文本中出现即视为任务完成（不区分大小写）
const COMPLETION_PHRASES: &[&str] = &[
    "done",
    "complete",
    "finished",
    "no further action",
    "task accomplished",
];

/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 循环的观察者：接收过程事件，并在工具发起 inquiry 时提供澄清回答
#[async_trait]
pub trait TurnObserver: Send + Sync {
    fn on_event(&self, _event: &ReactEvent) {}

    /// 返回 None 表示用户未回答，循环结束并把问题作为回复
    async fn clarify(&self, _question: &str) -> Option<String> {
        None
    }
}

/// 什么都不做的观察者（测试与非交互场景）
pub struct SilentObserver;

impl TurnObserver for SilentObserver {}

/// 是否继续跟进
pub fn should_continue(plan: Option<&Plan>, result: &ToolResult) -> bool {
    let Some(plan) = plan else {
        return false;
    };
    if plan.task_end || plan.tool.is_terminal() {
        return false;
    }
    let lower = result.as_str().to_lowercase();
    if COMPLETION_PHRASES.iter().any(|p| lower.contains(p)) {
        return false;
    }
    !lower.contains(&TASK_END_TOKEN.to_lowercase())
}

/// 最终回复：结束型计划优先取 args.text，其次 message，再次工具结果
pub fn final_response(plan: Option<&Plan>, result: Option<&ToolResult>) -> String {
    let Some(result) = result else {
        return NO_RESPONSE.to_string();
    };
    let non_blank = |s: &String| !s.trim().is_empty();
    let response = match plan {
        Some(p) if p.task_end || p.tool.is_terminal() => p
            .arg_str("text")
            .filter(non_blank)
            .or_else(|| p.message.clone().filter(non_blank))
            .unwrap_or_else(|| result.to_string()),
        _ => result.to_string(),
    };
    if response.trim().is_empty() {
        NO_RESPONSE.to_string()
    } else {
        response
    }
}

/// 一轮对话所需的协作者
pub struct ReactSession<'a> {
    pub planner: &'a Planner,
    pub executor: &'a ToolExecutor,
    pub memory: &'a MemoryStore,
    pub sessions: &'a SessionStore,
    /// 当前会话记录文件
    pub session_path: &'a Path,
    pub observer: &'a dyn TurnObserver,
    pub max_steps: usize,
}

impl<'a> ReactSession<'a> {
    pub fn new(
        planner: &'a Planner,
        executor: &'a ToolExecutor,
        memory: &'a MemoryStore,
        sessions: &'a SessionStore,
        session_path: &'a Path,
    ) -> Self {
        Self {
            planner,
            executor,
            memory,
            sessions,
            session_path,
            observer: &SilentObserver,
            max_steps: MAX_REACT_STEPS,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn TurnObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// 本轮最近一次计划与结果；panic 后仍可用于收尾
#[derive(Default)]
struct TurnState {
    plan: Option<Plan>,
    result: Option<ToolResult>,
    steps: usize,
}

/// 处理一个顶层请求，总是返回一段文本
pub async fn run_turn(session: &ReactSession<'_>, history: &mut ChatHistory, request: &str) -> String {
    let mut state = TurnState::default();
    let outcome = AssertUnwindSafe(drive(session, history, request, &mut state))
        .catch_unwind()
        .await;

    let response = match outcome {
        Ok(()) => final_response(state.plan.as_ref(), state.result.as_ref()),
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            tracing::error!(reason = %reason, "control loop panicked");
            session.observer.on_event(&ReactEvent::Error { text: reason.clone() });
            format!("Internal error: {}", reason)
        }
    };
    tracing::info!(steps = state.steps, "turn finished");

    persist(session, history, request, state.plan.as_ref());
    session.observer.on_event(&ReactEvent::Final {
        text: response.clone(),
    });
    response
}

async fn drive(
    session: &ReactSession<'_>,
    history: &mut ChatHistory,
    request: &str,
    state: &mut TurnState,
) {
    let context = history.messages().to_vec();
    let mut plan = session.planner.plan(request, &context).await;
    history.push(Message::user(request));
    record_plan(session, history, &plan);
    let mut result = execute(session, history, &plan, request).await;
    state.plan = Some(plan.clone());
    state.result = Some(result.clone());

    while state.steps < session.max_steps && should_continue(Some(&plan), &result) {
        state.steps += 1;
        session.observer.on_event(&ReactEvent::StepUpdate {
            step: state.steps,
            max_steps: session.max_steps,
        });

        plan = match &result {
            ToolResult::Inquiry(question) => {
                session.observer.on_event(&ReactEvent::Inquiry {
                    question: question.clone(),
                });
                let Some(answer) = session.observer.clarify(question).await else {
                    break;
                };
                history.push(Message::assistant(question.clone()));
                history.push(Message::user(answer.clone()));
                session.planner.plan(&answer, history.messages()).await
            }
            ToolResult::Text(_) => {
                let prompt = followup_prompt(request, &plan, &result);
                session
                    .planner
                    .plan_followup(&prompt, history.messages())
                    .await
            }
        };
        record_plan(session, history, &plan);
        result = execute(session, history, &plan, request).await;
        state.plan = Some(plan.clone());
        state.result = Some(result.clone());
    }
}

/// 计划轨迹写入历史；有旁白时一并写入并通知观察者
fn record_plan(session: &ReactSession<'_>, history: &mut ChatHistory, plan: &Plan) {
    tracing::debug!(plan = %plan.trace(), "plan");
    history.push(Message::plan(plan.trace()));
    if let Some(text) = plan.message.as_deref().filter(|m| !m.trim().is_empty()) {
        session.observer.on_event(&ReactEvent::Narration {
            text: text.to_string(),
        });
        history.push(Message::assistant(text));
    }
}

async fn execute(
    session: &ReactSession<'_>,
    history: &mut ChatHistory,
    plan: &Plan,
    request: &str,
) -> ToolResult {
    session.observer.on_event(&ReactEvent::ToolCall {
        tool: plan.tool.name().to_string(),
        description: plan.ui_description.clone(),
    });
    let result = session.executor.execute(plan, request).await;
    session.observer.on_event(&ReactEvent::Observation {
        tool: plan.tool.name().to_string(),
        preview: preview(result.as_str()),
    });
    history.push(Message::tool(result.as_str()));
    result
}

/// 收尾持久化：失败只记录日志
fn persist(session: &ReactSession<'_>, history: &ChatHistory, request: &str, plan: Option<&Plan>) {
    if let Err(e) = session.memory.save_chat_history(history) {
        tracing::warn!(error = %e, "failed to save chat history");
    }
    if let Err(e) = session.sessions.save(session.session_path, history) {
        tracing::warn!(error = %e, path = %session.session_path.display(), "failed to save session");
    }
    if let Err(e) = session.memory.record_request(request, plan) {
        tracing::warn!(error = %e, "failed to record last request");
    }
}

fn preview(s: &str) -> String {
    if s.chars().count() > OBSERVATION_PREVIEW_CHARS {
        format!(
            "{}...",
            s.chars().take(OBSERVATION_PREVIEW_CHARS).collect::<String>()
        )
    } else {
        s.to_string()
    }
}
