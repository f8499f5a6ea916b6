use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, IntCounter, IntGauge, TextEncoder, opts, register_int_counter, register_int_gauge,
};

pub static WS_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(opts!(
        "campus_chat_ws_connections",
        "Number of currently open real-time connections"
    ))
    .unwrap()
});

pub static MESSAGES_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "campus_chat_messages_sent_total",
        "Total number of messages persisted"
    ))
    .unwrap()
});

pub static EVENTS_RELAYED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "campus_chat_events_relayed_total",
        "Total number of real-time events relayed to room subscribers"
    ))
    .unwrap()
});

pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode(&metric_families, &mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}
