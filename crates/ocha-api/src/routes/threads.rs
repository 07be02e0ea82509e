use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use ocha_persist::{Message, MessagePart, MessageRole, Thread};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateThreadRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameThreadRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMessageRequest {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ListThreadsResponse {
    pub threads: Vec<Thread>,
}

#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub thread: Thread,
}

#[derive(Debug, Serialize)]
pub struct ThreadDetailResponse {
    pub thread: Thread,
    pub messages: Vec<Message>,
    pub is_owner: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: Message,
}

#[derive(Debug, Serialize)]
pub struct DeleteThreadResponse {
    pub message: String,
}

/// List the caller's threads, most recently updated first
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<ListThreadsResponse>> {
    let threads = state.store.list_threads(&user.id).await?;
    Ok(Json(ListThreadsResponse { threads }))
}

/// Create a new thread owned by the caller
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateThreadRequest>,
) -> ApiResult<(StatusCode, Json<ThreadResponse>)> {
    let thread_id = uuid::Uuid::new_v4().to_string();
    let thread = state
        .store
        .create_thread(&thread_id, &user.id, req.title)
        .await?;

    Ok((StatusCode::CREATED, Json(ThreadResponse { thread })))
}

/// Get a thread with its messages
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ThreadDetailResponse>> {
    let thread = owned_thread(&state, &thread_id, &user.id).await?;
    let messages = state.store.list_messages(&thread_id).await?;

    Ok(Json(ThreadDetailResponse {
        thread,
        messages,
        is_owner: true,
    }))
}

/// Rename a thread
pub async fn rename_thread(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(thread_id): Path<String>,
    Json(req): Json<RenameThreadRequest>,
) -> ApiResult<Json<ThreadResponse>> {
    if req.title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".to_string()));
    }

    owned_thread(&state, &thread_id, &user.id).await?;
    state.store.rename_thread(&thread_id, req.title.trim()).await?;

    let thread = state
        .store
        .get_thread(&thread_id)
        .await?
        .ok_or_else(|| ApiError::ThreadNotFound(thread_id))?;
    Ok(Json(ThreadResponse { thread }))
}

/// Append a message to a thread without invoking the engine
pub async fn add_message(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(thread_id): Path<String>,
    Json(req): Json<AddMessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    owned_thread(&state, &thread_id, &user.id).await?;

    let message_id = uuid::Uuid::new_v4().to_string();
    let message = state
        .store
        .add_message(
            &message_id,
            &thread_id,
            req.role,
            vec![MessagePart::text(req.content)],
        )
        .await?;

    Ok((StatusCode::CREATED, Json(MessageResponse { message })))
}

/// Delete a thread and all of its messages
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<DeleteThreadResponse>> {
    owned_thread(&state, &thread_id, &user.id).await?;
    state.store.delete_thread(&thread_id).await?;

    Ok(Json(DeleteThreadResponse {
        message: "Thread deleted successfully".to_string(),
    }))
}

/// Resolve a thread the caller owns.
///
/// A thread owned by someone else gets the same "not found" as a missing
/// one, so this route never confirms existence to non-owners.
pub(crate) async fn owned_thread(
    state: &AppState,
    thread_id: &str,
    user_id: &str,
) -> ApiResult<Thread> {
    let thread = state
        .store
        .get_thread(thread_id)
        .await?
        .ok_or_else(|| ApiError::ThreadNotFound(thread_id.to_string()))?;

    if thread.user_id != user_id {
        tracing::debug!(thread_id, "Ownership mismatch");
        return Err(ApiError::ThreadNotFound(thread_id.to_string()));
    }

    Ok(thread)
}
