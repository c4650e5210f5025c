//! 交互式命令行：主菜单、聊天循环与会话管理
//!
//! 只负责展示与读取输入；所有决策都在控制循环内完成。

use std::io::Write;

use anyhow::Context;
use async_trait::async_trait;
use crossterm::style::{Color, Stylize};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor::MoveTo, execute};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::agent::Agent;
use crate::memory::ChatHistory;
use crate::react::{ReactEvent, TurnObserver, TASK_END_TOKEN};

/// 去掉调试/方括号行、提示词回显、空行与结束标记，用于展示历史记录
pub fn clean_output(text: &str) -> String {
    text.lines()
        .filter(|l| !l.trim().starts_with('['))
        .filter(|l| !l.trim().to_lowercase().starts_with("prompt:"))
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.replace(TASK_END_TOKEN, "").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// 按行读取标准输入
struct Prompter {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl Prompter {
    fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// 打印提示并读取一行；EOF 或读取失败返回 None
    async fn ask(&self, label: &str) -> Option<String> {
        print!("{} ", format!("{}:", label).bold().blue());
        let _ = std::io::stdout().flush();
        match self.lines.lock().await.next_line().await {
            Ok(Some(line)) => Some(line.trim().to_string()),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stdin");
                None
            }
        }
    }
}

/// 控制循环事件在终端上的呈现
struct CliObserver<'a> {
    prompter: &'a Prompter,
    /// 本轮最近一次旁白；与最终回复相同时不重复打印
    last_narration: std::sync::Mutex<Option<String>>,
}

impl<'a> CliObserver<'a> {
    fn new(prompter: &'a Prompter) -> Self {
        Self {
            prompter,
            last_narration: std::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl<'a> TurnObserver for CliObserver<'a> {
    fn on_event(&self, event: &ReactEvent) {
        match event {
            ReactEvent::Narration { text } => {
                println!("{} {}", "AI:".bold().cyan(), text);
                *self.last_narration.lock().unwrap_or_else(|e| e.into_inner()) = Some(text.clone());
            }
            ReactEvent::ToolCall { tool, description } => {
                if tool != "none" && tool != "inquiry" {
                    let display = description
                        .clone()
                        .unwrap_or_else(|| format!("Executing {}", tool));
                    println!("{}", display.bold().yellow());
                }
            }
            ReactEvent::Observation { tool, .. } => {
                if tool != "none" && tool != "inquiry" {
                    println!("{} {}", "Done:".bold().green(), tool.as_str().bold().cyan());
                }
            }
            ReactEvent::StepUpdate { step, max_steps } => {
                println!("{}", format!("Reasoning next step ({}/{})...", step, max_steps).dim());
            }
            ReactEvent::Inquiry { question } => {
                println!("{} {}", "AI:".bold().cyan(), question)
            }
            ReactEvent::Error { text } => println!("{}", text.as_str().red()),
            ReactEvent::Final { text } => {
                let narrated = self
                    .last_narration
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .take();
                let cleaned = clean_output(text);
                if !cleaned.is_empty() && narrated.as_deref() != Some(text.as_str()) {
                    println!("{} {}", "AI:".bold().cyan(), cleaned);
                }
            }
        }
    }

    async fn clarify(&self, _question: &str) -> Option<String> {
        self.prompter
            .ask("Your response")
            .await
            .filter(|a| !a.is_empty())
    }
}

fn clear_screen() {
    let _ = execute!(std::io::stdout(), Clear(ClearType::All), MoveTo(0, 0));
}

/// 单行带边框提示
fn panel(text: &str, color: Color) {
    let width = text.chars().count() + 4;
    println!("{}", format!("╭{}╮", "─".repeat(width)).with(color));
    println!("{}  {}  {}", "│".with(color), text.bold().with(color), "│".with(color));
    println!("{}", format!("╰{}╯", "─".repeat(width)).with(color));
}

fn print_menu() {
    clear_screen();
    println!();
    println!("{}", "Welcome to Commander AI".bold().magenta());
    println!("{}", "Commander AI Main Menu".bold().cyan());
    println!();
    println!("{} New chat/session", "1.".bold().green());
    println!("{} List chats", "2.".bold().green());
    println!("{} Load previous chat", "3.".bold().green());
    println!("{} Delete a chat", "4.".bold().green());
    println!("{} Delete all cache/history", "5.".bold().green());
    println!("{} Exit", "0.".bold().red());
    println!();
}

/// 运行主菜单，直到用户选择退出或输入结束
pub async fn start_cli(mut agent: Agent) -> anyhow::Result<()> {
    let prompter = Prompter::new();
    loop {
        print_menu();
        let Some(choice) = prompter.ask("Select an option [1]").await else {
            break;
        };
        match choice.as_str() {
            "" | "1" => {
                clear_screen();
                agent.new_session();
                panel("New chat started!", Color::Green);
                chat_loop(&mut agent, &prompter).await;
            }
            "2" => {
                clear_screen();
                list_chats(&agent);
                pause(&prompter).await;
            }
            "3" => {
                clear_screen();
                load_chat(&mut agent, &prompter).await?;
            }
            "4" => {
                clear_screen();
                delete_chat(&agent, &prompter).await;
                pause(&prompter).await;
            }
            "5" => {
                clear_screen();
                delete_all_cache(&mut agent, &prompter).await;
                pause(&prompter).await;
            }
            "0" => {
                clear_screen();
                panel("Goodbye!", Color::Red);
                break;
            }
            _ => panel("Invalid option. Try again.", Color::Yellow),
        }
    }
    Ok(())
}

async fn pause(prompter: &Prompter) {
    let _ = prompter.ask("Press Enter to continue").await;
}

/// 聊天循环：输入 exit 返回菜单
async fn chat_loop(agent: &mut Agent, prompter: &Prompter) {
    println!("{}", "Type 'exit' to return to menu.".bold().magenta());
    let observer = CliObserver::new(prompter);
    loop {
        let Some(input) = prompter.ask("You").await else {
            break;
        };
        if input.eq_ignore_ascii_case("exit") {
            break;
        }
        if input.is_empty() {
            continue;
        }
        println!(
            "{}",
            format!("Planning next action using {}...", agent.backend_label()).yellow()
        );
        // 最终回复由 observer 在 Final 事件中打印
        agent.handle_request(&input, &observer).await;
    }
}

fn list_chats(agent: &Agent) -> usize {
    let chats = agent.sessions().list();
    if chats.is_empty() {
        panel("No chats found.", Color::Yellow);
        return 0;
    }
    println!("{}", "Available Chats".bold().cyan());
    for (i, chat) in chats.iter().enumerate() {
        let name = chat
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("{}  {}", format!("{:>4}", i + 1).bold().green(), name);
    }
    chats.len()
}

fn print_history(history: &ChatHistory) {
    println!("{}", "Chat History".bold().cyan());
    for entry in history.messages() {
        let role = entry.role.as_str();
        let mut chars = role.chars();
        let role = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        println!("{}: {}", role.bold().magenta(), clean_output(&entry.content));
    }
}

async fn ask_index(prompter: &Prompter, label: &str) -> Option<usize> {
    let raw = prompter.ask(label).await?;
    match raw.parse::<usize>() {
        Ok(i) => Some(i),
        Err(_) => {
            panel("Invalid input.", Color::Red);
            None
        }
    }
}

/// 查看历史会话，可选择继续该会话
async fn load_chat(agent: &mut Agent, prompter: &Prompter) -> anyhow::Result<()> {
    if list_chats(agent) == 0 {
        pause(prompter).await;
        return Ok(());
    }
    let Some(index) = ask_index(prompter, "Enter chat number to view").await else {
        return Ok(());
    };
    let path = match agent.sessions().get(index) {
        Ok(p) => p,
        Err(_) => {
            panel("Invalid chat number.", Color::Red);
            pause(prompter).await;
            return Ok(());
        }
    };
    let history = match agent.sessions().load(&path) {
        Ok(h) => h,
        Err(e) => {
            panel(&format!("Failed to read chat: {}", e), Color::Red);
            pause(prompter).await;
            return Ok(());
        }
    };
    print_history(&history);

    let answer = prompter.ask("Continue this chat? (y/n) [n]").await;
    if matches!(answer.as_deref(), Some("y") | Some("Y")) {
        agent
            .resume(&path)
            .with_context(|| format!("Failed to resume {}", path.display()))?;
        chat_loop(agent, prompter).await;
    }
    Ok(())
}

async fn delete_chat(agent: &Agent, prompter: &Prompter) {
    if list_chats(agent) == 0 {
        return;
    }
    let Some(index) = ask_index(prompter, "Enter chat number to delete").await else {
        return;
    };
    match agent.sessions().delete(index) {
        Ok(_) => panel("Chat deleted.", Color::Green),
        Err(_) => panel("Invalid chat number.", Color::Red),
    }
}

async fn delete_all_cache(agent: &mut Agent, prompter: &Prompter) {
    let answer = prompter
        .ask("Are you sure you want to delete ALL cache and chat history? (y/n) [n]")
        .await;
    if !matches!(answer.as_deref(), Some("y") | Some("Y")) {
        panel("Cancelled.", Color::Yellow);
        return;
    }
    match agent.clear_all() {
        Ok(()) => panel("All cache and chat history deleted.", Color::Green),
        Err(e) => panel(&format!("Error deleting cache: {}", e), Color::Red),
    }
}
