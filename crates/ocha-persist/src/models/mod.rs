mod message;
mod thread;

pub use message::{Message, MessagePart, MessageRole, PartState};
pub(crate) use message::validate_parts;
pub use thread::Thread;
