use std::sync::Arc;

use crate::clients::auth::CurrentUserResolver;
use crate::clients::notify::NotificationSink;
use crate::config::Config;
use crate::presence::PresenceRegistry;
use crate::store::RecordStore;

/// Application context containing shared dependencies.
/// Built once at startup; handlers and the real-time layer share it.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn RecordStore>,
    pub presence: Arc<PresenceRegistry>,
    pub auth: Arc<dyn CurrentUserResolver>,
    pub notifier: Arc<dyn NotificationSink>,
    pub config: Arc<Config>,
}

impl AppContext {
    pub fn new(
        store: Arc<dyn RecordStore>,
        presence: Arc<PresenceRegistry>,
        auth: Arc<dyn CurrentUserResolver>,
        notifier: Arc<dyn NotificationSink>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            presence,
            auth,
            notifier,
            config,
        }
    }
}
