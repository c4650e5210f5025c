//! 认知层：计划类型、规范化器、Planner 与控制循环

pub mod events;
pub mod loop_;
pub mod normalizer;
pub mod plan;
pub mod planner;

pub use events::ReactEvent;
pub use loop_::{
    final_response, run_turn, should_continue, ReactSession, SilentObserver, TurnObserver,
    MAX_REACT_STEPS, NO_RESPONSE,
};
pub use normalizer::{normalize, parse_plan_from_output, TASK_END_TOKEN};
pub use plan::{CatalogEntry, Plan, ToolKind, ToolResult};
pub use planner::{describe_plan, is_memorize_request, is_simple_question, Planner};
