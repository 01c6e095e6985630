//! Shared application state handed to every handler.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::notify::Notifier;
use crate::setup::SetupWizard;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<AppConfig>,
    pub setup: Arc<RwLock<SetupWizard>>,
    pub notifier: Notifier,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Store, config: AppConfig) -> Self {
        let notifier = Notifier::new(config.notify_webhook_url.clone());
        Self {
            store,
            config: Arc::new(config),
            setup: Arc::new(RwLock::new(SetupWizard::new())),
            notifier,
            started_at: Instant::now(),
        }
    }

    pub fn with_setup(self, wizard: SetupWizard) -> Self {
        Self {
            setup: Arc::new(RwLock::new(wizard)),
            ..self
        }
    }
}
