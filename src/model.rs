use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable record grouping messages between exactly two users, optionally
/// scoped to one listing. `participant_ids` keeps insertion order for
/// display; lookup is order-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub participant_ids: Vec<String>,
    pub listing_id: Option<String>,
    pub last_message: Option<LastMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participant_ids.iter().any(|p| p == user_id)
    }

    /// The participant other than `user_id`. Conversations always hold
    /// exactly two distinct participants.
    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        self.participant_ids
            .iter()
            .find(|p| p.as_str() != user_id)
            .map(|p| p.as_str())
    }
}

/// Denormalized inbox preview stored on the conversation so the inbox can
/// render without loading message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub text: String,
    pub sender_id: String,
    pub created_at: DateTime<Utc>,
}

/// A single chat message. Immutable after creation except for `read`,
/// which flips to true when the recipient loads the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Profile summary attached to conversations and messages for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl UserSummary {
    /// Placeholder profile for users whose document no longer exists.
    pub fn placeholder(user_id: &str) -> Self {
        Self {
            id: user_id.to_string(),
            name: "Student".to_string(),
            avatar: None,
            college: None,
            year: None,
        }
    }
}

/// Listing summary attached to listing-scoped conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// Conversation enriched with participant profiles and listing summary,
/// as returned by the REST API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub participants: Vec<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing: Option<ListingSummary>,
}

/// Message enriched with the sender's profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub sender: UserSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_participant_helpers() {
        let conv = Conversation {
            id: "c1".to_string(),
            participant_ids: vec!["u1".to_string(), "u2".to_string()],
            listing_id: None,
            last_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(conv.has_participant("u1"));
        assert!(!conv.has_participant("u3"));
        assert_eq!(conv.other_participant("u1"), Some("u2"));
        assert_eq!(conv.other_participant("u2"), Some("u1"));
    }

    #[test]
    fn wire_names_are_camel_case() {
        let msg = Message {
            id: "m1".to_string(),
            conversation_id: "c1".to_string(),
            sender_id: "u1".to_string(),
            text: "hello".to_string(),
            read: false,
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("conversationId").is_some());
        assert!(value.get("senderId").is_some());
        assert!(value.get("createdAt").is_some());
    }
}
