pub mod config;
pub mod core;
pub mod credentials;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod state;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use core::*;
pub use credentials::{ApiKeyBundle, CredentialStore, SecretName, SecretSet};
pub use errors::{AppError, AppResult};
pub use services::{ProviderServices, ServiceError, VoiceServices, VoiceSession};
pub use state::AppState;
