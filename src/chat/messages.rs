use std::collections::HashMap;

use chrono::Utc;
use serde_json::json;

use crate::config::{LAST_MESSAGE_PREVIEW_CHARS, MAX_MESSAGE_CHARS};
use crate::error::{AppError, AppResult};
use crate::model::{Conversation, Message, MessageView, UserSummary};
use crate::store::{Filter, RecordStore};

use super::{user_summary, CONVERSATIONS, MESSAGES};

async fn load_conversation(
    store: &dyn RecordStore,
    conversation_id: &str,
) -> AppResult<Conversation> {
    let doc = store
        .get(CONVERSATIONS, conversation_id)
        .await?
        .ok_or_else(|| AppError::not_found("Conversation not found"))?;
    Ok(doc.decode()?)
}

/// All messages of a conversation, oldest first, with sender profiles
/// attached. Side effect: every unread message not sent by the requester is
/// marked read, best-effort per message; a failed mark is logged and
/// retried naturally on the next read.
pub async fn list_messages(
    store: &dyn RecordStore,
    conversation_id: &str,
    requester_id: &str,
) -> AppResult<Vec<MessageView>> {
    let conversation = load_conversation(store, conversation_id).await?;
    if !conversation.has_participant(requester_id) {
        return Err(AppError::forbidden("Not authorized"));
    }

    let docs = store
        .query(MESSAGES, &[Filter::eq("conversationId", conversation_id)])
        .await?;

    let mut messages = Vec::with_capacity(docs.len());
    for doc in docs {
        messages.push(doc.decode::<Message>()?);
    }
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    for message in &messages {
        if message.sender_id != requester_id && !message.read {
            if let Err(e) = store
                .update(MESSAGES, &message.id, json!({"read": true}))
                .await
            {
                tracing::warn!(
                    error = %e,
                    message_id = %message.id,
                    conversation_id = %conversation_id,
                    "Failed to mark message read"
                );
            }
        }
    }

    // One profile lookup per distinct sender.
    let mut profiles: HashMap<String, UserSummary> = HashMap::new();
    let mut views = Vec::with_capacity(messages.len());
    for message in messages {
        let sender = match profiles.get(&message.sender_id) {
            Some(profile) => profile.clone(),
            None => {
                let profile = user_summary(store, &message.sender_id).await?;
                profiles.insert(message.sender_id.clone(), profile.clone());
                profile
            }
        };
        views.push(MessageView { message, sender });
    }

    Ok(views)
}

/// Result of a successful send: the enriched message plus the recipient,
/// so the caller can mirror the write to the real-time channel and the
/// notification sink without reloading the conversation.
#[derive(Debug)]
pub struct SendReceipt {
    pub view: MessageView,
    pub recipient_id: String,
}

/// Appends a message and refreshes the conversation's last-message
/// snapshot. The message write is the durable operation; a snapshot-patch
/// failure afterwards leaves the inbox preview stale until the next send
/// and is logged rather than surfaced.
pub async fn send_message(
    store: &dyn RecordStore,
    conversation_id: &str,
    sender_id: &str,
    text: &str,
) -> AppResult<SendReceipt> {
    let conversation = load_conversation(store, conversation_id).await?;
    if !conversation.has_participant(sender_id) {
        return Err(AppError::forbidden("Not authorized"));
    }

    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::invalid("Message cannot be empty"));
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::invalid(format!(
            "Message exceeds {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    let now = Utc::now();
    let doc = store
        .add(
            MESSAGES,
            json!({
                "conversationId": conversation_id,
                "senderId": sender_id,
                "text": text,
                "read": false,
                "createdAt": now,
            }),
        )
        .await?;
    let message: Message = doc.decode()?;

    let preview: String = text.chars().take(LAST_MESSAGE_PREVIEW_CHARS).collect();
    let snapshot = json!({
        "lastMessage": {
            "text": preview,
            "senderId": sender_id,
            "createdAt": now,
        },
        "updatedAt": now,
    });
    if let Err(e) = store.update(CONVERSATIONS, conversation_id, snapshot).await {
        tracing::warn!(
            error = %e,
            conversation_id = %conversation_id,
            message_id = %message.id,
            "Failed to refresh last-message snapshot, inbox preview is stale"
        );
    }

    crate::metrics::MESSAGES_SENT_TOTAL.inc();

    let recipient_id = conversation
        .other_participant(sender_id)
        .unwrap_or_default()
        .to_string();
    let sender = user_summary(store, sender_id).await?;
    Ok(SendReceipt {
        view: MessageView { message, sender },
        recipient_id,
    })
}

/// Total unread messages addressed to the user across all conversations.
/// Recomputed on demand; nothing to keep consistent on the read path.
pub async fn unread_count(store: &dyn RecordStore, user_id: &str) -> AppResult<u64> {
    let docs = store
        .query(
            CONVERSATIONS,
            &[Filter::contains("participantIds", user_id)],
        )
        .await?;

    let mut total = 0u64;
    for doc in docs {
        let conversation: Conversation = doc.decode()?;
        let Some(other) = conversation.other_participant(user_id) else {
            continue;
        };
        total += store
            .count(
                MESSAGES,
                &[
                    Filter::eq("conversationId", conversation.id.as_str()),
                    Filter::eq("senderId", other),
                    Filter::eq("read", false),
                ],
            )
            .await?;
    }

    Ok(total)
}
