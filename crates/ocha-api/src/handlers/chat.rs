use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;

use ocha_llm::{Message as EngineMessage, StreamEvent};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    #[serde(default, alias = "threadId")]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Legacy shape: the client supplies the full context and nothing is
    /// persisted server-side
    #[serde(default)]
    pub messages: Option<Vec<UiMessage>>,
}

#[derive(Debug, Deserialize)]
pub struct UiMessage {
    pub role: UiRole,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub parts: Vec<UiPart>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UiPart {
    Text { text: String },
}

/// Run a chat turn and stream the engine's output as Server-Sent Events.
///
/// `{threadId, content}` runs the persisted orchestration flow;
/// the legacy `{messages}` shape streams statelessly.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ChatRequestBody>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if state.config.openai_api_key.is_empty() {
        return Err(ApiError::Config("OPENAI_API_KEY is not set".to_string()));
    }

    let event_stream = if let Some(messages) = req.messages {
        let context: Vec<EngineMessage> = messages.iter().map(to_engine_message).collect();
        state.orchestrator.stream_stateless(context).await?
    } else {
        let thread_id = req
            .thread_id
            .ok_or_else(|| ApiError::Validation("threadId is required".to_string()))?;
        let content = req
            .content
            .ok_or_else(|| ApiError::Validation("content is required".to_string()))?;

        state
            .orchestrator
            .run_turn(&thread_id, &user.id, &content)
            .await?
    };

    let sse_stream = event_stream.map(|event| Ok::<Event, Infallible>(to_sse_event(event)));
    Ok(Sse::new(sse_stream))
}

fn to_engine_message(message: &UiMessage) -> EngineMessage {
    let text = match &message.content {
        Some(content) => content.clone(),
        None => {
            let mut out = String::new();
            for UiPart::Text { text } in &message.parts {
                out.push_str(text);
            }
            out
        }
    };

    match message.role {
        UiRole::User => EngineMessage::human(text),
        UiRole::Assistant => EngineMessage::ai(text),
        UiRole::System => EngineMessage::system(text),
    }
}

fn to_sse_event(event: anyhow::Result<StreamEvent>) -> Event {
    let sse_event = match event {
        Ok(StreamEvent::Message { content }) => Event::default()
            .event("message")
            .json_data(json!({ "content": content })),
        Ok(StreamEvent::ToolCall {
            index,
            id,
            name,
            arguments,
        }) => Event::default().event("tool_call").json_data(json!({
            "index": index,
            "id": id,
            "name": name,
            "arguments": arguments,
        })),
        Ok(StreamEvent::Done { finish_reason }) => Event::default().event("done").json_data(json!({
            "status": "completed",
            "finish_reason": finish_reason,
        })),
        Err(e) => Event::default()
            .event("error")
            .json_data(json!({ "error": e.to_string() })),
    };

    sse_event.unwrap_or_else(|_| Event::default().event("error").data("{}"))
}
