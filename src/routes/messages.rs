// ============================================================================
// Messaging Routes
// ============================================================================
//
// Endpoints:
// - POST /api/v1/messages/conversation       - find or create a conversation
// - GET  /api/v1/messages/conversations      - inbox, newest activity first
// - GET  /api/v1/messages/:conversation_id   - message history (read receipts)
// - POST /api/v1/messages/:conversation_id   - send a message
// - GET  /api/v1/messages/unread/count       - total unread for the user
//
// Every durable send is mirrored to the conversation's room and to the
// notification sink; both are best-effort and never fail the request.
//
// ============================================================================

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::chat;
use crate::clients::notify;
use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::extractors::CurrentUser;
use crate::utils::display_user;
use crate::ws::events::ServerEvent;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub recipient_id: Option<String>,
    pub listing_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// POST /api/v1/messages/conversation
pub async fn create_conversation(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
    Json(request): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let conversation = chat::conversations::get_or_create(
        ctx.store.as_ref(),
        &user.0,
        request.recipient_id.as_deref(),
        request.listing_id.as_deref(),
    )
    .await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "conversation": conversation })),
    ))
}

/// GET /api/v1/messages/conversations
pub async fn list_conversations(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let conversations = chat::conversations::list_for_user(ctx.store.as_ref(), &user.0).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "conversations": conversations })),
    ))
}

/// GET /api/v1/messages/:conversation_id
pub async fn list_messages(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let messages =
        chat::messages::list_messages(ctx.store.as_ref(), &conversation_id, &user.0).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "messages": messages })),
    ))
}

/// POST /api/v1/messages/:conversation_id
pub async fn send_message(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
    Path(conversation_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let receipt =
        chat::messages::send_message(ctx.store.as_ref(), &conversation_id, &user.0, &request.text)
            .await?;

    tracing::debug!(
        conversation_id = %conversation_id,
        sender = %display_user(&user.0, &ctx.config.logging),
        "Message sent"
    );

    // Mirror the durable write to open chat windows. The sender already has
    // the message in this response, so their own connection is skipped.
    let payload = serde_json::to_value(&receipt.view)?;
    ctx.presence
        .relay_excluding_user(
            &conversation_id,
            &user.0,
            ServerEvent::NewMessage {
                conversation_id: conversation_id.clone(),
                message: payload,
            },
        )
        .await;

    notify::dispatch(
        ctx.notifier.clone(),
        receipt.recipient_id.clone(),
        "new_message",
        json!({
            "conversationId": conversation_id,
            "messageId": receipt.view.message.id.clone(),
            "senderId": user.0,
        }),
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": receipt.view })),
    ))
}

/// GET /api/v1/messages/unread/count
pub async fn unread_count(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let count = chat::messages::unread_count(ctx.store.as_ref(), &user.0).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "count": count })),
    ))
}
