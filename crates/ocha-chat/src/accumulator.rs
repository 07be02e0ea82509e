use std::collections::HashMap;

use ocha_llm::StreamEvent;
use ocha_persist::{MessagePart, PartState};

struct ToolCallBuffer {
    tool_call_id: String,
    tool_name: String,
    arguments: String,
    order: usize,
}

/// Accumulates engine stream events into the parts of one assistant message.
///
/// Tool-call deltas arrive fragmented (id and name on the first delta,
/// argument text spread over many); they are buffered per call id and only
/// turned into parts at the end of the turn. Tool parts come first, then the
/// trailing text part if any text was produced.
#[derive(Default)]
pub struct TurnAccumulator {
    text_buffer: String,
    tool_calls: HashMap<String, ToolCallBuffer>,
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Message { content } => {
                self.text_buffer.push_str(content);
            }
            StreamEvent::ToolCall {
                index,
                id,
                name,
                arguments,
            } => {
                let tool_call_id = id.clone().unwrap_or_else(|| format!("call_{}", index));
                let order = self.tool_calls.len();

                let entry = self
                    .tool_calls
                    .entry(tool_call_id.clone())
                    .or_insert_with(|| ToolCallBuffer {
                        tool_call_id,
                        tool_name: String::new(),
                        arguments: String::new(),
                        order,
                    });

                if let Some(name) = name {
                    entry.tool_name = name.clone();
                }
                if let Some(args) = arguments {
                    entry.arguments.push_str(args);
                }
            }
            StreamEvent::Done { .. } => {}
        }
    }

    /// Whether any content has been accumulated
    pub fn is_empty(&self) -> bool {
        self.text_buffer.is_empty() && self.tool_calls.is_empty()
    }

    /// Finalize into message parts: tool parts in arrival order, then the
    /// trailing text part when non-empty.
    pub fn into_parts(self) -> Vec<MessagePart> {
        let mut buffers: Vec<ToolCallBuffer> = self.tool_calls.into_values().collect();
        buffers.sort_by_key(|b| b.order);

        let mut parts: Vec<MessagePart> = buffers
            .into_iter()
            .map(|b| MessagePart::Tool {
                tool: b.tool_name,
                tool_call_id: b.tool_call_id,
                state: PartState::Call,
                input: serde_json::from_str(&b.arguments).ok(),
                output: None,
            })
            .collect();

        if !self.text_buffer.is_empty() {
            parts.push(MessagePart::text(self.text_buffer));
        }

        parts
    }
}
