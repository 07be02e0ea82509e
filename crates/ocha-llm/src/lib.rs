pub mod types;
pub mod traits;
pub mod streaming;
pub mod openai;

pub use traits::{ChatClient, ChatRequest, ChatResponse, ChatOptions, TokenUsage};
pub use streaming::StreamEvent;
pub use openai::OpenAIClient;
pub use types::{Message, Content, Tool, ToolCall};
