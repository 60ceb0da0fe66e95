use std::sync::Arc;

use crate::config::ServerConfig;
use crate::credentials::CredentialStore;
use crate::services::{ProviderServices, ServiceError, VoiceServices};

/// State shared by every HTTP handler and voice connection.
pub struct AppState {
    pub config: ServerConfig,
    pub credentials: Arc<CredentialStore>,
    pub services: Arc<dyn VoiceServices>,
}

impl AppState {
    /// Load credentials from the configured bundle path and wire up the
    /// production backends.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, ServiceError> {
        let credentials = Arc::new(CredentialStore::load(config.secrets_path.clone()));
        let services = Arc::new(ProviderServices::new()?);
        Ok(Self::with_services(config, credentials, services))
    }

    pub fn with_services(
        config: ServerConfig,
        credentials: Arc<CredentialStore>,
        services: Arc<dyn VoiceServices>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            credentials,
            services,
        })
    }
}
