use chrono::Utc;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::model::{Conversation, ConversationView};
use crate::store::{Filter, RecordStore, StoreError};

use super::{hydrate_conversation, CONVERSATIONS};

/// Lookup key for a two-party conversation: both participants plus an exact
/// listing match. A conversation about listing X is distinct from the
/// unscoped conversation between the same two users.
fn pair_filters(user_a: &str, user_b: &str, listing_id: Option<&str>) -> [Filter; 3] {
    let listing_value = match listing_id {
        Some(listing_id) => Value::String(listing_id.to_string()),
        None => Value::Null,
    };

    [
        Filter::contains("participantIds", user_a),
        Filter::contains("participantIds", user_b),
        Filter::Eq("listingId", listing_value),
    ]
}

/// Finds or lazily creates the conversation between the current user and
/// `recipient_id`, optionally scoped to a listing. Idempotent: repeated
/// calls with the same arguments resolve to the same conversation, and
/// concurrent racing creators are serialized by the store's
/// compare-and-create, so no duplicate row can be produced.
pub async fn get_or_create(
    store: &dyn RecordStore,
    current_user_id: &str,
    recipient_id: Option<&str>,
    listing_id: Option<&str>,
) -> AppResult<ConversationView> {
    let recipient_id = match recipient_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Err(AppError::invalid("Recipient required")),
    };
    if recipient_id == current_user_id {
        return Err(AppError::invalid("Cannot message yourself"));
    }

    let filters = pair_filters(current_user_id, recipient_id, listing_id);

    let existing = store.query(CONVERSATIONS, &filters).await?;
    if let Some(doc) = existing.first() {
        let conversation: Conversation = doc.decode()?;
        return Ok(hydrate_conversation(store, conversation).await?);
    }

    let now = Utc::now();
    let body = json!({
        "participantIds": [current_user_id, recipient_id],
        "listingId": listing_id,
        "lastMessage": null,
        "createdAt": now,
        "updatedAt": now,
    });

    let conversation: Conversation = match store
        .add_if_absent(CONVERSATIONS, &filters, body)
        .await
    {
        Ok(doc) => {
            let conversation: Conversation = doc.decode()?;
            tracing::info!(
                conversation_id = %conversation.id,
                listing_scoped = conversation.listing_id.is_some(),
                "Conversation created"
            );
            conversation
        }
        // Lost the creation race; the winner's row is there now.
        Err(StoreError::Conflict(_)) => {
            let winners = store.query(CONVERSATIONS, &filters).await?;
            let doc = winners.first().ok_or_else(|| {
                AppError::internal("Conversation vanished after create conflict")
            })?;
            doc.decode()?
        }
        Err(e) => return Err(e.into()),
    };

    Ok(hydrate_conversation(store, conversation).await?)
}

/// All conversations containing the user, newest activity first.
pub async fn list_for_user(
    store: &dyn RecordStore,
    user_id: &str,
) -> AppResult<Vec<ConversationView>> {
    let docs = store
        .query(
            CONVERSATIONS,
            &[Filter::contains("participantIds", user_id)],
        )
        .await?;

    let mut views = Vec::with_capacity(docs.len());
    for doc in docs {
        let conversation: Conversation = doc.decode()?;
        views.push(hydrate_conversation(store, conversation).await?);
    }

    views.sort_by(|a, b| b.conversation.updated_at.cmp(&a.conversation.updated_at));
    Ok(views)
}
