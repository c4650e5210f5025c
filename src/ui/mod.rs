//! 界面层：crossterm 着色的交互式命令行（菜单、聊天循环、会话管理）

pub mod cli;

pub use cli::{clean_output, start_cli};
