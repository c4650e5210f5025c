//! 核心层：错误类型与组件构建

pub mod builder;
pub mod error;

pub use builder::{create_agent_builder, AgentBuilder, AgentComponents};
pub use error::AgentError;
