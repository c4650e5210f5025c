//! 桌面操作：指针、键盘、截屏 OCR
//!
//! 通过外部程序驱动（默认 xdotool / scrot / tesseract，可配置）；
//! 程序不存在或返回非零时以 stderr 作为失败原因。

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::process::Command;

use crate::config::DesktopSection;
use crate::react::ToolKind;
use crate::tools::Tool;

/// 外部程序驱动
#[derive(Debug, Clone)]
pub struct DesktopDriver {
    input_program: String,
    screenshot_program: String,
    ocr_program: String,
}

async fn run_checked(program: &str, args: &[&str]) -> Result<(), String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| format!("failed to run {}: {}", program, e))?;
    if output.status.success() {
        return Ok(());
    }
    Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
}

async fn run_output(program: &str, args: &[&str]) -> Result<String, String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| format!("failed to run {}: {}", program, e))?;
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).to_string());
    }
    Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
}

/// 坐标参数：接受整数、整数值浮点或数字字符串
fn coordinate(args: &Map<String, Value>, key: &str) -> Result<i64, String> {
    let value = args.get(key).ok_or_else(|| format!("missing {}", key))?;
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v >= 0 => Ok(v),
        Some(v) => Err(format!("{} must be >= 0, got {}", key, v)),
        None => Err(format!("{} must be an integer, got {}", key, value)),
    }
}

impl DesktopDriver {
    pub fn new(cfg: &DesktopSection) -> Self {
        Self {
            input_program: cfg.input_program.clone(),
            screenshot_program: cfg.screenshot_program.clone(),
            ocr_program: cfg.ocr_program.clone(),
        }
    }

    pub async fn move_mouse(&self, x: i64, y: i64) -> Result<(), String> {
        let (x, y) = (x.to_string(), y.to_string());
        run_checked(&self.input_program, &["mousemove", &x, &y]).await
    }

    pub async fn click(&self) -> Result<(), String> {
        run_checked(&self.input_program, &["click", "1"]).await
    }

    pub async fn type_text(&self, text: &str) -> Result<(), String> {
        if text.contains('\0') {
            return Err("text contains null byte".to_string());
        }
        run_checked(&self.input_program, &["type", "--delay", "20", "--", text]).await
    }

    /// 截屏到临时文件后做 OCR，返回识别出的文本
    pub async fn capture_and_ocr(&self) -> Result<String, String> {
        let path: PathBuf =
            std::env::temp_dir().join(format!("commander_screen_{}.png", std::process::id()));
        let path_str = path.to_string_lossy().to_string();
        run_checked(&self.screenshot_program, &["-o", &path_str]).await?;
        let text = run_output(&self.ocr_program, &[&path_str, "stdout"]).await;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::debug!(error = %e, path = %path_str, "failed to remove screenshot");
        }
        Ok(text?.trim().to_string())
    }
}

pub struct ScreenOcrTool(pub DesktopDriver);
pub struct MoveMouseTool(pub DesktopDriver);
pub struct ClickTool(pub DesktopDriver);
pub struct TypeTextTool(pub DesktopDriver);

#[async_trait]
impl Tool for ScreenOcrTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ScreenOcr
    }

    async fn execute(&self, _args: &Map<String, Value>) -> Result<String, String> {
        let text = self.0.capture_and_ocr().await?;
        if text.is_empty() {
            Ok("Captured the screen and performed OCR.".to_string())
        } else {
            Ok(format!("Captured the screen and performed OCR.\n{}", text))
        }
    }
}

#[async_trait]
impl Tool for MoveMouseTool {
    fn kind(&self) -> ToolKind {
        ToolKind::MoveMouse
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<String, String> {
        let x = coordinate(args, "x")?;
        let y = coordinate(args, "y")?;
        self.0.move_mouse(x, y).await?;
        Ok(format!("Moved mouse to ({}, {}).", x, y))
    }
}

#[async_trait]
impl Tool for ClickTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Click
    }

    async fn execute(&self, _args: &Map<String, Value>) -> Result<String, String> {
        self.0.click().await?;
        Ok("Clicked mouse.".to_string())
    }
}

#[async_trait]
impl Tool for TypeTextTool {
    fn kind(&self) -> ToolKind {
        ToolKind::TypeText
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<String, String> {
        let text = args.get("text").and_then(|v| v.as_str()).unwrap_or("");
        self.0.type_text(text).await?;
        Ok(format!("Typed: {}", text))
    }
}
