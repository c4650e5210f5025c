//! Commander - 桌面自动化智能体
//!
//! 入口：初始化日志、加载配置并装配 Agent，然后进入交互式命令行。

use anyhow::Context;
use commander::{core::create_agent_builder, observability, ui::start_cli, Agent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    // 可选：第一个参数为配置文件路径
    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let components = create_agent_builder(config_path)
        .build_components()
        .context("Failed to create agent")?;

    start_cli(Agent::new(components))
        .await
        .context("CLI run failed")?;

    Ok(())
}
