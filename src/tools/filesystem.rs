//! 文件读写工具
//!
//! read_file / write_file / append_file 直接作用于本机路径（单用户桌面代理，不设沙箱）；
//! 路径开头的 `~/` 展开为 HOME，写入时自动创建父目录。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;

use crate::react::ToolKind;
use crate::tools::Tool;

/// 展开 `~/` 前缀
fn expand_path(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}

fn str_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("{} must be a string", key))
}

async fn ensure_parent(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Create dir failed: {}", e))?;
        }
    }
    Ok(())
}

/// 读取文件内容
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ReadFile
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<String, String> {
        let path = expand_path(str_arg(args, "path")?);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("Read failed: {}: {}", path.display(), e))
    }
}

/// 覆盖写入文件
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::WriteFile
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<String, String> {
        let raw = str_arg(args, "path")?;
        let content = str_arg(args, "content")?;
        let path = expand_path(raw);
        ensure_parent(&path).await?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| format!("Write failed: {}: {}", path.display(), e))?;
        Ok(format!("Wrote to {}.", raw))
    }
}

/// 追加写入文件（不存在则创建）
pub struct AppendFileTool;

#[async_trait]
impl Tool for AppendFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::AppendFile
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<String, String> {
        let raw = str_arg(args, "path")?;
        let content = str_arg(args, "content")?;
        let path = expand_path(raw);
        ensure_parent(&path).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| format!("Open failed: {}: {}", path.display(), e))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| format!("Append failed: {}: {}", path.display(), e))?;
        file.flush()
            .await
            .map_err(|e| format!("Append failed: {}: {}", path.display(), e))?;
        Ok(format!("Appended to {}.", raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_write_append_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub/notes.txt");
        let p = path.to_string_lossy().to_string();

        let out = WriteFileTool
            .execute(&args(json!({"path": p, "content": "hello"})))
            .await
            .unwrap();
        assert_eq!(out, format!("Wrote to {}.", p));

        let out = AppendFileTool
            .execute(&args(json!({"path": p, "content": " world"})))
            .await
            .unwrap();
        assert_eq!(out, format!("Appended to {}.", p));

        let content = ReadFileTool.execute(&args(json!({"path": p}))).await.unwrap();
        assert_eq!(content, "hello world");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("absent.txt").to_string_lossy().to_string();
        let err = ReadFileTool.execute(&args(json!({"path": p}))).await.unwrap_err();
        assert!(err.starts_with("Read failed"));
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(expand_path("~/x.txt"), PathBuf::from(home).join("x.txt"));
        }
        assert_eq!(expand_path("/tmp/x"), PathBuf::from("/tmp/x"));
    }
}
