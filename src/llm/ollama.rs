//! 本地模型后端：以子进程方式运行 `ollama run <model>`
//!
//! 提示词写入 stdin，读取完整 stdout 作为文本输出；进程启动失败、超时、
//! 非零退出且无输出、输出为空都视为失败，交由规划器切换到下一级。

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::llm::{LlmBackend, LlmError, RawOutput};
use crate::memory::Message;

/// 本地进程后端
#[derive(Debug, Clone)]
pub struct LocalBackend {
    program: String,
    model: String,
    timeout: Duration,
}

impl LocalBackend {
    pub fn new(program: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            model: model.into(),
            timeout,
        }
    }

    /// 运行一次进程并返回去空白的 stdout
    pub async fn run_prompt(&self, prompt: &str) -> Result<String, LlmError> {
        let spawn_err = |e: std::io::Error| LlmError::Spawn {
            program: self.program.clone(),
            reason: e.to_string(),
        };
        let mut child = Command::new(&self.program)
            .arg("run")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        // 写 stdin 与等待退出都在同一个超时内：子进程不读 stdin 时写入会一直阻塞
        let stdin = child.stdin.take();
        let exchange = async move {
            if let Some(mut stdin) = stdin {
                // 进程可能不读 stdin 就退出，写失败时以其输出为准
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    tracing::debug!(error = %e, "local backend closed stdin early");
                }
                // 关闭 stdin，模型才会开始生成
                drop(stdin);
            }
            child.wait_with_output().await
        };

        // 超时后 future 被丢弃，kill_on_drop 负责结束子进程
        let output = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| LlmError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if !output.status.success() && !stderr.is_empty() {
                return Err(LlmError::Transport(stderr));
            }
            return Err(LlmError::EmptyResponse);
        }
        Ok(stdout)
    }
}

#[async_trait]
impl LlmBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn request(&self, prompt: &str, _history: &[Message]) -> Result<RawOutput, LlmError> {
        // 历史已由规划器拼进提示词
        tracing::debug!(model = %self.model, "local backend request");
        let text = self.run_prompt(prompt).await?;
        tracing::debug!(output = %text, "local backend output");
        Ok(RawOutput::Text(text))
    }
}
