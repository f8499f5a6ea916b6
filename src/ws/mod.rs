// ============================================================================
// Real-Time Channel
// ============================================================================
//
// One task per connection: a select loop over inbound frames and the
// connection's outbound event queue. Inbound events only touch the presence
// registry; durable writes stay on the REST path. Malformed frames are
// ignored, never answered.
//
// ============================================================================

pub mod events;

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};

use crate::context::AppContext;
use crate::presence::ConnectionId;
use crate::utils::display_user;
use events::{ClientEvent, ServerEvent};

/// Accept loop for the real-time listener. Runs until the process exits.
pub async fn serve(listener: TcpListener, ctx: Arc<AppContext>) {
    loop {
        match listener.accept().await {
            Ok((socket, addr)) => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    handle_connection(socket, addr, ctx).await;
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to accept real-time connection");
            }
        }
    }
}

async fn handle_connection(socket: TcpStream, addr: SocketAddr, ctx: Arc<AppContext>) {
    let ws_stream = match accept_async(socket).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::debug!(error = %e, %addr, "WebSocket upgrade failed");
            return;
        }
    };
    tracing::debug!(%addr, "WebSocket connection established");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let conn = ctx.presence.register(tx).await;

    loop {
        tokio::select! {
            inbound = ws_receiver.next() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => handle_event(&ctx, conn, event).await,
                            Err(e) => {
                                tracing::debug!(error = %e, %addr, "Ignoring malformed real-time event");
                            }
                        }
                    }
                    Some(Ok(WsMessage::Ping(payload))) => {
                        let _ = ws_sender.send(WsMessage::Pong(payload)).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, %addr, "WebSocket error");
                        break;
                    }
                }
            }

            outbound = rx.recv() => {
                let Some(event) = outbound else { break };
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if ws_sender.send(WsMessage::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize server event");
                    }
                }
            }
        }
    }

    ctx.presence.disconnect(conn).await;
    tracing::debug!(%addr, "Connection closed");
}

async fn handle_event(ctx: &AppContext, conn: ConnectionId, event: ClientEvent) {
    match event {
        ClientEvent::UserOnline(user_id) => {
            tracing::debug!(
                user = %display_user(&user_id, &ctx.config.logging),
                "User announced online"
            );
            ctx.presence.announce_online(conn, user_id).await;
        }
        ClientEvent::JoinConversation(conversation_id) => {
            ctx.presence.join_room(conn, &conversation_id).await;
        }
        ClientEvent::LeaveConversation(conversation_id) => {
            ctx.presence.leave_room(conn, &conversation_id).await;
        }
        // The sender already has the message from the REST response, so
        // the relay goes to everyone else in the room.
        ClientEvent::SendMessage {
            conversation_id,
            message,
        } => {
            let event = ServerEvent::NewMessage {
                conversation_id: conversation_id.clone(),
                message,
            };
            ctx.presence
                .relay_to_room(&conversation_id, Some(conn), event)
                .await;
        }
        ClientEvent::Typing { conversation_id } => {
            let event = ServerEvent::UserTyping {
                conversation_id: conversation_id.clone(),
            };
            ctx.presence
                .relay_to_room(&conversation_id, Some(conn), event)
                .await;
        }
        ClientEvent::StopTyping { conversation_id } => {
            let event = ServerEvent::UserStopTyping {
                conversation_id: conversation_id.clone(),
            };
            ctx.presence
                .relay_to_room(&conversation_id, Some(conn), event)
                .await;
        }
    }
}
