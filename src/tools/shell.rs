//! Shell 工具：在本机执行命令，禁止少量灾难性模式
//!
//! 通过 sh -c / cmd /C 执行，带超时与 tracing 审计；
//! 成功返回去空白的 stdout，非零退出且有 stderr 时返回 "Error: <stderr>"，无输出时返回固定提示。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::process::Command;

use crate::react::ToolKind;
use crate::tools::Tool;

/// 禁止的子串
const FORBIDDEN_SUBSTR: &[&str] = &[
    "rm -rf /",
    "rm -fr /",
    "rm -rf ~",
    "rm -rf *",
    "mkfs",
    "dd if=",
    "> /dev/sd",
    "chmod -r 777 /",
    ":(){ :|:& };:", // fork bomb
];

pub const NO_OUTPUT: &str = "Command executed successfully (no output)";

pub struct ShellTool {
    timeout: Duration,
}

impl ShellTool {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn check(&self, raw: &str) -> Result<(), String> {
        let raw_lower = raw.to_lowercase();
        for forbidden in FORBIDDEN_SUBSTR {
            if raw_lower.contains(forbidden) {
                return Err(format!("Forbidden pattern: {}", forbidden));
            }
        }
        Ok(())
    }

    /// 执行命令并按约定整理输出
    pub async fn run(&self, command: &str) -> Result<String, String> {
        self.check(command)?;
        tracing::info!(command = %command, "shell tool execute");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| format!("Command timed out after {}s", self.timeout.as_secs()))?
            .map_err(|e| format!("Execution failed: {}", e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() && !stderr.is_empty() {
            return Ok(format!("Error: {}", stderr));
        }
        if stdout.is_empty() {
            return Ok(NO_OUTPUT.to_string());
        }
        Ok(stdout)
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn kind(&self) -> ToolKind {
        ToolKind::RunCommand
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<String, String> {
        let command = args.get("cmd").and_then(|v| v.as_str()).unwrap_or("").trim();
        self.run(command).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stdout_is_trimmed() {
        let shell = ShellTool::new(10);
        assert_eq!(shell.run("echo '  hi  '").await.unwrap(), "hi");
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_stderr() {
        let shell = ShellTool::new(10);
        let out = shell.run("echo boom >&2; exit 3").await.unwrap();
        assert_eq!(out, "Error: boom");
    }

    #[tokio::test]
    async fn test_empty_output_message() {
        let shell = ShellTool::new(10);
        assert_eq!(shell.run("true").await.unwrap(), NO_OUTPUT);
    }

    #[tokio::test]
    async fn test_forbidden_and_timeout() {
        let shell = ShellTool::new(1);
        assert!(shell.run("rm -rf / --no-preserve-root").await.is_err());
        let err = shell.run("sleep 5").await.unwrap_err();
        assert!(err.contains("timed out"));
    }
}
