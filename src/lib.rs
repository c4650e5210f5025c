//! Commander - 桌面自动化智能体
//!
//! 模块划分：
//! - **agent**: Agent 运行时（会话、历史、单轮请求处理）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与组件构建
//! - **llm**: 模型后端抽象与实现（本地进程 / 远程 API / Mock）及问答路由
//! - **memory**: 记忆存储（记事本、检索库、聊天历史）与会话记录
//! - **react**: 计划类型、规范化器、Planner、控制循环
//! - **tools**: 工具箱（桌面、文件、shell、搜索、记忆）与执行器
//! - **ui**: 交互式命令行

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;
pub mod ui;

pub use agent::Agent;
