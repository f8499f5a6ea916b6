// ============================================================================
// Chat Domain
// ============================================================================
//
// Conversation resolution, the message log and the unread counter, all built
// on the generic record store. Profile and listing summaries are read from
// the `users` / `listings` collections maintained by the rest of the
// marketplace; a missing profile degrades to a placeholder instead of
// failing the request.
//
// ============================================================================

pub mod conversations;
pub mod messages;

use crate::model::{Conversation, ConversationView, ListingSummary, UserSummary};
use crate::store::{RecordStore, StoreError};

pub const CONVERSATIONS: &str = "conversations";
pub const MESSAGES: &str = "messages";
pub const USERS: &str = "users";
pub const LISTINGS: &str = "listings";

/// Reads a participant's profile summary. Absent or undecodable profile
/// documents (deleted accounts) degrade to a placeholder; store failures
/// propagate.
pub(crate) async fn user_summary(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<UserSummary, StoreError> {
    match store.get(USERS, user_id).await? {
        Some(doc) => Ok(doc.decode().unwrap_or_else(|_| {
            tracing::debug!(user_id = %user_id, "User document missing profile fields");
            UserSummary::placeholder(user_id)
        })),
        None => Ok(UserSummary::placeholder(user_id)),
    }
}

pub(crate) async fn listing_summary(
    store: &dyn RecordStore,
    listing_id: &str,
) -> Result<Option<ListingSummary>, StoreError> {
    match store.get(LISTINGS, listing_id).await? {
        Some(doc) => match doc.decode() {
            Ok(listing) => Ok(Some(listing)),
            Err(e) => {
                tracing::warn!(error = %e, listing_id = %listing_id, "Undecodable listing document");
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

/// Attaches participant profiles and the listing summary to a conversation.
/// Pure read-enrichment, no mutation.
pub(crate) async fn hydrate_conversation(
    store: &dyn RecordStore,
    conversation: Conversation,
) -> Result<ConversationView, StoreError> {
    let mut participants = Vec::with_capacity(conversation.participant_ids.len());
    for participant_id in &conversation.participant_ids {
        participants.push(user_summary(store, participant_id).await?);
    }

    let listing = match &conversation.listing_id {
        Some(listing_id) => listing_summary(store, listing_id).await?,
        None => None,
    };

    Ok(ConversationView {
        conversation,
        participants,
        listing,
    })
}
