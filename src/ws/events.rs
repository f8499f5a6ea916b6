use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound real-time events. Wire form is a JSON text frame
/// `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Announce which user this connection belongs to.
    UserOnline(String),
    /// Subscribe to a conversation's room.
    JoinConversation(String),
    /// Unsubscribe from a conversation's room.
    LeaveConversation(String),
    /// Re-broadcast an already-persisted message to the room.
    SendMessage {
        conversation_id: String,
        message: Value,
    },
    Typing {
        conversation_id: String,
    },
    StopTyping {
        conversation_id: String,
    },
}

/// Outbound real-time events, same wire form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Full list of currently-connected user ids.
    UsersOnline(Vec<String>),
    NewMessage {
        conversation_id: String,
        message: Value,
    },
    UserTyping {
        conversation_id: String,
    },
    UserStopTyping {
        conversation_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_events_parse_from_wire_form() {
        let event: ClientEvent =
            serde_json::from_value(json!({"event": "user_online", "data": "u1"})).unwrap();
        assert!(matches!(event, ClientEvent::UserOnline(ref id) if id == "u1"));

        let event: ClientEvent =
            serde_json::from_value(json!({"event": "join_conversation", "data": "c1"})).unwrap();
        assert!(matches!(event, ClientEvent::JoinConversation(ref id) if id == "c1"));

        let event: ClientEvent = serde_json::from_value(
            json!({"event": "typing", "data": {"conversationId": "c1"}}),
        )
        .unwrap();
        assert!(matches!(event, ClientEvent::Typing { ref conversation_id } if conversation_id == "c1"));

        let event: ClientEvent = serde_json::from_value(json!({
            "event": "send_message",
            "data": {"conversationId": "c1", "message": {"text": "hi"}},
        }))
        .unwrap();
        match event {
            ClientEvent::SendMessage {
                conversation_id,
                message,
            } => {
                assert_eq!(conversation_id, "c1");
                assert_eq!(message["text"], json!("hi"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn server_events_serialize_to_wire_form() {
        let value = serde_json::to_value(ServerEvent::UsersOnline(vec!["u1".to_string()])).unwrap();
        assert_eq!(value, json!({"event": "users_online", "data": ["u1"]}));

        let value = serde_json::to_value(ServerEvent::UserStopTyping {
            conversation_id: "c1".to_string(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"event": "user_stop_typing", "data": {"conversationId": "c1"}})
        );
    }
}
