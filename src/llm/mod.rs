//! LLM 层：后端抽象与实现（本地进程 / OpenAI 兼容 API / Mock）与问答路由

pub mod mock;
pub mod ollama;
pub mod openai;
pub mod router;
pub mod traits;

pub use mock::{EchoBackend, MockBackend, MockReply};
pub use ollama::LocalBackend;
pub use openai::RemoteBackend;
pub use router::{classify_question, QuestionAnswerer, QuestionKind};
pub use traits::{LlmBackend, LlmError, RawOutput};
