use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_chat_server::clients::auth::{CurrentUserResolver, HttpAuthClient};
use campus_chat_server::clients::notify::{HttpNotifier, NotificationSink, NullNotifier};
use campus_chat_server::config::Config;
use campus_chat_server::context::AppContext;
use campus_chat_server::presence::PresenceRegistry;
use campus_chat_server::store::{postgres, PgStore, RecordStore};
use campus_chat_server::{routes, ws};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.rust_log.clone()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("=== Campus Chat Server Starting ===");

    let pool = postgres::create_pool(&config).await?;
    postgres::init_schema(&pool).await?;
    info!("Connected to database");

    let store: Arc<dyn RecordStore> = Arc::new(PgStore::new(pool));
    let auth: Arc<dyn CurrentUserResolver> = Arc::new(HttpAuthClient::new(&config.auth_service_url));
    let notifier: Arc<dyn NotificationSink> = match &config.notify_service_url {
        Some(url) => Arc::new(HttpNotifier::new(url)),
        None => {
            info!("NOTIFY_SERVICE_URL not set, notifications disabled");
            Arc::new(NullNotifier)
        }
    };
    let presence = Arc::new(PresenceRegistry::new());

    let config = Arc::new(config);
    let ctx = Arc::new(AppContext::new(
        store,
        presence,
        auth,
        notifier,
        config.clone(),
    ));

    let http_listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    let ws_listener = TcpListener::bind(("0.0.0.0", config.ws_port)).await?;
    info!(port = config.port, "REST API listening");
    info!(port = config.ws_port, "Real-time channel listening");

    let app = routes::create_router(ctx.clone());

    tokio::spawn(ws::serve(ws_listener, ctx.clone()));

    axum::serve(http_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
