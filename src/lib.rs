//! Real-time messaging server for a campus marketplace.
//!
//! Durable conversations and messages live behind a REST API; presence,
//! typing indicators and message-arrival events travel over a separate
//! room-based WebSocket channel. The two paths are independent: every
//! durable write is mirrored to the real-time channel best-effort, and a
//! real-time outage never fails a REST call.

pub mod chat;
pub mod clients;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod model;
pub mod presence;
pub mod routes;
pub mod store;
pub mod utils;
pub mod ws;

pub use context::AppContext;
