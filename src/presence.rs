// ============================================================================
// Presence & Typing Broadcaster
// ============================================================================
//
// In-memory registry of open real-time connections, the users they belong
// to, and the conversation rooms they joined. All relays are fire-and-forget;
// a send failure never fails the operation that triggered it.
//
// State lives only in this process: a restart resets presence and clients
// re-announce on reconnect. Running multiple instances requires replacing
// this registry with an external pub/sub backend.
//
// ============================================================================

use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::metrics;
use crate::ws::events::ServerEvent;

pub type ConnectionId = Uuid;
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

#[derive(Default)]
struct PresenceState {
    /// Outbound channel of every open connection.
    senders: HashMap<ConnectionId, EventSender>,
    /// user id -> tracked connection. One entry per user; last wins.
    online: HashMap<String, ConnectionId>,
    /// Reverse of `online`, for disconnect bookkeeping.
    announced: HashMap<ConnectionId, String>,
    /// room (conversation id) -> subscribed connections.
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

impl PresenceState {
    fn broadcast(&self, event: &ServerEvent) {
        for (conn, tx) in &self.senders {
            if tx.send(event.clone()).is_err() {
                tracing::debug!(connection = %conn, "Dropping event for closed connection");
            }
        }
    }

    fn online_user_ids(&self) -> Vec<String> {
        self.online.keys().cloned().collect()
    }
}

#[derive(Default)]
pub struct PresenceRegistry {
    state: RwLock<PresenceState>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection and returns its id.
    pub async fn register(&self, tx: EventSender) -> ConnectionId {
        let conn = Uuid::new_v4();
        self.state.write().await.senders.insert(conn, tx);
        metrics::WS_CONNECTIONS.inc();
        conn
    }

    /// Associates the connection with a user and broadcasts the updated
    /// online list to everyone. A second session for the same user simply
    /// takes over the mapping.
    pub async fn announce_online(&self, conn: ConnectionId, user_id: String) {
        let mut state = self.state.write().await;

        if let Some(previous) = state.announced.insert(conn, user_id.clone()) {
            if previous != user_id && state.online.get(&previous) == Some(&conn) {
                state.online.remove(&previous);
            }
        }
        state.online.insert(user_id, conn);

        let event = ServerEvent::UsersOnline(state.online_user_ids());
        state.broadcast(&event);
    }

    /// Removes the connection: its rooms, its outbound channel, and its
    /// presence entry when it is still the tracked one for the user.
    pub async fn disconnect(&self, conn: ConnectionId) {
        let mut state = self.state.write().await;

        state.senders.remove(&conn);
        for members in state.rooms.values_mut() {
            members.remove(&conn);
        }
        state.rooms.retain(|_, members| !members.is_empty());

        let mut presence_changed = false;
        if let Some(user_id) = state.announced.remove(&conn) {
            // A newer session for the same user keeps the user online.
            if state.online.get(&user_id) == Some(&conn) {
                state.online.remove(&user_id);
                presence_changed = true;
            }
        }

        if presence_changed {
            let event = ServerEvent::UsersOnline(state.online_user_ids());
            state.broadcast(&event);
        }

        metrics::WS_CONNECTIONS.dec();
    }

    pub async fn join_room(&self, conn: ConnectionId, room: &str) {
        let mut state = self.state.write().await;
        state
            .rooms
            .entry(room.to_string())
            .or_default()
            .insert(conn);
    }

    pub async fn leave_room(&self, conn: ConnectionId, room: &str) {
        let mut state = self.state.write().await;
        if let Some(members) = state.rooms.get_mut(room) {
            members.remove(&conn);
            if members.is_empty() {
                state.rooms.remove(room);
            }
        }
    }

    /// Sends the event to every room subscriber except `exclude`.
    /// Fire-and-forget: closed receivers are skipped.
    pub async fn relay_to_room(
        &self,
        room: &str,
        exclude: Option<ConnectionId>,
        event: ServerEvent,
    ) {
        let state = self.state.read().await;
        let Some(members) = state.rooms.get(room) else {
            return;
        };

        let mut delivered = 0u64;
        for conn in members {
            if Some(*conn) == exclude {
                continue;
            }
            if let Some(tx) = state.senders.get(conn) {
                if tx.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }

        if delivered > 0 {
            metrics::EVENTS_RELAYED_TOTAL.inc_by(delivered);
        }
    }

    /// Room relay for events originating from the REST path, where the
    /// originator is known by user id rather than connection.
    pub async fn relay_excluding_user(&self, room: &str, user_id: &str, event: ServerEvent) {
        let exclude = self.state.read().await.online.get(user_id).copied();
        self.relay_to_room(room, exclude, event).await;
    }

    pub async fn online_users(&self) -> Vec<String> {
        self.state.read().await.online_user_ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    async fn connect(registry: &PresenceRegistry) -> (ConnectionId, UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = registry.register(tx).await;
        (conn, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn duplicate_announce_keeps_one_presence_entry() {
        let registry = PresenceRegistry::new();
        let (conn_a, mut rx_a) = connect(&registry).await;
        let (conn_b, _rx_b) = connect(&registry).await;

        registry.announce_online(conn_a, "u1".to_string()).await;
        registry.announce_online(conn_b, "u1".to_string()).await;

        assert_eq!(registry.online_users().await, vec!["u1".to_string()]);

        // Every announce rebroadcasts the full list to all connections.
        let events = drain(&mut rx_a);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events.last(),
            Some(ServerEvent::UsersOnline(users)) if users == &vec!["u1".to_string()]
        ));
    }

    #[tokio::test]
    async fn stale_disconnect_does_not_evict_newer_session() {
        let registry = PresenceRegistry::new();
        let (conn_a, _rx_a) = connect(&registry).await;
        let (conn_b, _rx_b) = connect(&registry).await;

        registry.announce_online(conn_a, "u1".to_string()).await;
        registry.announce_online(conn_b, "u1".to_string()).await;

        // The older session closing must not take the user offline.
        registry.disconnect(conn_a).await;
        assert_eq!(registry.online_users().await, vec!["u1".to_string()]);

        registry.disconnect(conn_b).await;
        assert!(registry.online_users().await.is_empty());
    }

    #[tokio::test]
    async fn typing_relay_excludes_the_sender() {
        let registry = PresenceRegistry::new();
        let (sender, mut sender_rx) = connect(&registry).await;
        let (peer, mut peer_rx) = connect(&registry).await;
        let (outsider, mut outsider_rx) = connect(&registry).await;

        registry.join_room(sender, "c1").await;
        registry.join_room(peer, "c1").await;

        registry
            .relay_to_room(
                "c1",
                Some(sender),
                ServerEvent::UserTyping {
                    conversation_id: "c1".to_string(),
                },
            )
            .await;

        assert!(drain(&mut sender_rx).is_empty());
        assert!(drain(&mut outsider_rx).is_empty());
        let received = drain(&mut peer_rx);
        assert_eq!(received.len(), 1);
        assert!(matches!(received[0], ServerEvent::UserTyping { .. }));
    }

    #[tokio::test]
    async fn leaving_a_room_stops_delivery() {
        let registry = PresenceRegistry::new();
        let (conn, mut rx) = connect(&registry).await;

        registry.join_room(conn, "c1").await;
        registry
            .relay_to_room(
                "c1",
                None,
                ServerEvent::UserTyping {
                    conversation_id: "c1".to_string(),
                },
            )
            .await;
        assert_eq!(drain(&mut rx).len(), 1);

        registry.leave_room(conn, "c1").await;
        registry
            .relay_to_room(
                "c1",
                None,
                ServerEvent::UserTyping {
                    conversation_id: "c1".to_string(),
                },
            )
            .await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn rest_originated_relay_excludes_the_senders_connection() {
        let registry = PresenceRegistry::new();
        let (sender, mut sender_rx) = connect(&registry).await;
        let (peer, mut peer_rx) = connect(&registry).await;

        registry.announce_online(sender, "u1".to_string()).await;
        registry.join_room(sender, "c1").await;
        registry.join_room(peer, "c1").await;
        drain(&mut sender_rx);
        drain(&mut peer_rx);

        registry
            .relay_excluding_user(
                "c1",
                "u1",
                ServerEvent::NewMessage {
                    conversation_id: "c1".to_string(),
                    message: serde_json::json!({"text": "hi"}),
                },
            )
            .await;

        assert!(drain(&mut sender_rx).is_empty());
        assert_eq!(drain(&mut peer_rx).len(), 1);
    }
}
