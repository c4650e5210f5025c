//! 工具层：注册表、执行器与各工具实现

pub mod answer;
pub mod desktop;
pub mod echo;
pub mod executor;
pub mod filesystem;
pub mod memory;
pub mod registry;
pub mod schema;
pub mod search;
pub mod shell;

pub use answer::DirectAnswerTool;
pub use desktop::{ClickTool, DesktopDriver, MoveMouseTool, ScreenOcrTool, TypeTextTool};
pub use echo::EchoTool;
pub use executor::{missing_argument, ToolExecutor, GENERIC_CLARIFICATION};
pub use filesystem::{AppendFileTool, ReadFileTool, WriteFileTool};
pub use memory::{NotepadAddTool, RagQueryTool};
pub use registry::{Tool, ToolRegistry};
pub use schema::plan_schema_json;
pub use search::SearchTool;
pub use shell::ShellTool;
