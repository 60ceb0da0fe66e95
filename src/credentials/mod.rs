//! Provider credential store.
//!
//! The four provider API keys live outside [`ServerConfig`](crate::config::ServerConfig)
//! because they can be replaced while the server is running. The store keeps the
//! current [`SecretSet`] behind an [`ArcSwap`]: readers take a cheap snapshot and
//! [`CredentialStore::reload`] swaps in a freshly built set in a single store, so a
//! reader never observes a mix of old and new keys.
//!
//! Keys are layered per name: a non-empty value in the JSON bundle on disk wins,
//! otherwise the matching environment variable is used.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The fixed set of provider keys the gateway needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretName {
    /// Murf speech synthesis
    SpeechSynthesis,
    /// AssemblyAI streaming transcription
    SpeechToText,
    /// Gemini conversational model
    LanguageModel,
    /// SerpAPI web search
    Search,
}

impl SecretName {
    /// Every logical name, in reporting order.
    pub const ALL: [SecretName; 4] = [
        SecretName::SpeechSynthesis,
        SecretName::SpeechToText,
        SecretName::LanguageModel,
        SecretName::Search,
    ];

    /// Environment variable the key falls back to (also its public name).
    pub fn env_var(&self) -> &'static str {
        match self {
            SecretName::SpeechSynthesis => "MURF_API_KEY",
            SecretName::SpeechToText => "ASSEMBLYAI_API_KEY",
            SecretName::LanguageModel => "GEMINI_API_KEY",
            SecretName::Search => "SERPAPI_API_KEY",
        }
    }
}

impl fmt::Display for SecretName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_var())
    }
}

impl Serialize for SecretName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.env_var())
    }
}

/// One complete, immutable set of provider keys.
///
/// Values are either present (non-blank) or absent. Secret material is wiped
/// when the set is dropped and never appears in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretSet {
    speech_synthesis: Option<String>,
    speech_to_text: Option<String>,
    language_model: Option<String>,
    search: Option<String>,
}

impl SecretSet {
    /// Build a set from raw values, treating blank strings as absent.
    pub fn new(
        speech_synthesis: Option<String>,
        speech_to_text: Option<String>,
        language_model: Option<String>,
        search: Option<String>,
    ) -> Self {
        Self {
            speech_synthesis: non_blank(speech_synthesis),
            speech_to_text: non_blank(speech_to_text),
            language_model: non_blank(language_model),
            search: non_blank(search),
        }
    }

    pub fn get(&self, name: SecretName) -> Option<&str> {
        match name {
            SecretName::SpeechSynthesis => self.speech_synthesis.as_deref(),
            SecretName::SpeechToText => self.speech_to_text.as_deref(),
            SecretName::LanguageModel => self.language_model.as_deref(),
            SecretName::Search => self.search.as_deref(),
        }
    }

    /// Names whose value is absent, in [`SecretName::ALL`] order.
    pub fn missing(&self) -> Vec<SecretName> {
        SecretName::ALL
            .into_iter()
            .filter(|name| self.get(*name).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    fn slot_mut(&mut self, name: SecretName) -> &mut Option<String> {
        match name {
            SecretName::SpeechSynthesis => &mut self.speech_synthesis,
            SecretName::SpeechToText => &mut self.speech_to_text,
            SecretName::LanguageModel => &mut self.language_model,
            SecretName::Search => &mut self.search,
        }
    }
}

impl fmt::Debug for SecretSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("SecretSet");
        for name in SecretName::ALL {
            let shown = if self.get(name).is_some() {
                "[REDACTED]"
            } else {
                "<absent>"
            };
            debug.field(name.env_var(), &shown);
        }
        debug.finish()
    }
}

/// The bundle format persisted to disk and accepted by `POST /save_api_keys`.
#[derive(Clone, Default, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyBundle {
    pub murf_api_key: Option<String>,
    pub assembly_ai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub serp_api_key: Option<String>,
}

impl ApiKeyBundle {
    fn value(&self, name: SecretName) -> Option<&str> {
        match name {
            SecretName::SpeechSynthesis => self.murf_api_key.as_deref(),
            SecretName::SpeechToText => self.assembly_ai_api_key.as_deref(),
            SecretName::LanguageModel => self.gemini_api_key.as_deref(),
            SecretName::Search => self.serp_api_key.as_deref(),
        }
    }
}

impl fmt::Debug for ApiKeyBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyBundle").finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to write API key bundle to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize API key bundle: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Process-wide credential store.
pub struct CredentialStore {
    path: PathBuf,
    current: ArcSwap<SecretSet>,
    save_lock: Mutex<()>,
}

impl CredentialStore {
    /// Create a store backed by `path` and perform the initial load.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let secrets = read_layered(&path);
        log_missing(&secrets);

        Self {
            path,
            current: ArcSwap::from_pointee(secrets),
            save_lock: Mutex::new(()),
        }
    }

    /// Create a store with a fixed initial set (still reloadable from `path`).
    pub fn with_secrets(path: impl Into<PathBuf>, secrets: SecretSet) -> Self {
        Self {
            path: path.into(),
            current: ArcSwap::from_pointee(secrets),
            save_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The set current at the time of the call.
    pub fn snapshot(&self) -> Arc<SecretSet> {
        self.current.load_full()
    }

    /// Rebuild the set from disk and environment, then swap it in.
    pub fn reload(&self) -> Arc<SecretSet> {
        let secrets = Arc::new(read_layered(&self.path));
        log_missing(&secrets);
        self.current.store(Arc::clone(&secrets));
        info!(
            missing = secrets.missing().len(),
            "Reloaded provider API keys"
        );
        secrets
    }

    /// Names whose value is currently absent.
    pub fn validate(&self) -> Vec<SecretName> {
        self.current.load().missing()
    }

    pub fn all_present(&self) -> bool {
        self.validate().is_empty()
    }

    /// Persist `bundle` next to the current bundle file and reload.
    ///
    /// The file is written to a temporary sibling and renamed into place.
    /// Concurrent saves are serialized.
    pub async fn save(&self, bundle: &ApiKeyBundle) -> Result<Arc<SecretSet>, CredentialError> {
        let _guard = self.save_lock.lock().await;

        let json = serde_json::to_vec_pretty(bundle)?;
        let tmp_path = temp_sibling(&self.path);

        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|source| CredentialError::Write {
                path: tmp_path.clone(),
                source,
            })?;

        if let Err(source) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(CredentialError::Write {
                path: self.path.clone(),
                source,
            });
        }

        Ok(self.reload())
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("path", &self.path)
            .field("current", &self.current.load())
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "api_keys.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read the bundle at `path`, treating a missing or malformed file as absent.
fn read_bundle(path: &Path) -> Option<ApiKeyBundle> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "{} not found, falling back to environment variables",
                path.display()
            );
            return None;
        }
        Err(e) => {
            warn!(
                "Failed to read {}: {}; falling back to environment variables",
                path.display(),
                e
            );
            return None;
        }
    };

    match serde_json::from_str::<ApiKeyBundle>(&contents) {
        Ok(bundle) => Some(bundle),
        Err(e) => {
            warn!(
                "Malformed API key bundle {}: {}; falling back to environment variables",
                path.display(),
                e
            );
            None
        }
    }
}

fn read_layered(path: &Path) -> SecretSet {
    let bundle = read_bundle(path);
    let mut secrets = SecretSet::default();

    for name in SecretName::ALL {
        let from_file = bundle
            .as_ref()
            .and_then(|b| b.value(name))
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string);
        let value = from_file.or_else(|| non_blank(std::env::var(name.env_var()).ok()));
        *secrets.slot_mut(name) = value;
    }

    secrets
}

fn log_missing(secrets: &SecretSet) {
    for name in secrets.missing() {
        warn!("{} not configured", name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    fn clear_key_env() {
        unsafe {
            for name in SecretName::ALL {
                env::remove_var(name.env_var());
            }
        }
    }

    fn full_bundle() -> ApiKeyBundle {
        ApiKeyBundle {
            murf_api_key: Some("murf".into()),
            assembly_ai_api_key: Some("aai".into()),
            gemini_api_key: Some("gem".into()),
            serp_api_key: Some("serp".into()),
        }
    }

    #[test]
    #[serial]
    fn test_missing_file_falls_back_to_env() {
        clear_key_env();
        unsafe {
            env::set_var("GEMINI_API_KEY", "env-gemini");
        }

        let dir = TempDir::new().unwrap();
        let store = CredentialStore::load(dir.path().join("api_keys.json"));

        assert_eq!(
            store.snapshot().get(SecretName::LanguageModel),
            Some("env-gemini")
        );
        assert_eq!(
            store.validate(),
            vec![
                SecretName::SpeechSynthesis,
                SecretName::SpeechToText,
                SecretName::Search
            ]
        );
        assert!(!store.all_present());

        clear_key_env();
    }

    #[test]
    #[serial]
    fn test_file_value_wins_over_env_per_key() {
        clear_key_env();
        unsafe {
            env::set_var("MURF_API_KEY", "env-murf");
            env::set_var("SERPAPI_API_KEY", "env-serp");
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("api_keys.json");
        std::fs::write(
            &path,
            r#"{"murfApiKey":"file-murf","assemblyAiApiKey":"file-aai","geminiApiKey":"file-gem","serpApiKey":"  "}"#,
        )
        .unwrap();

        let store = CredentialStore::load(&path);
        let secrets = store.snapshot();

        assert_eq!(secrets.get(SecretName::SpeechSynthesis), Some("file-murf"));
        assert_eq!(secrets.get(SecretName::Search), Some("env-serp"));
        assert!(store.all_present());

        clear_key_env();
    }

    #[test]
    #[serial]
    fn test_malformed_file_is_treated_as_absent() {
        clear_key_env();
        unsafe {
            env::set_var("ASSEMBLYAI_API_KEY", "env-aai");
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("api_keys.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = CredentialStore::load(&path);
        assert_eq!(
            store.snapshot().get(SecretName::SpeechToText),
            Some("env-aai")
        );

        clear_key_env();
    }

    #[test]
    fn test_each_missing_key_is_reported() {
        for missing in SecretName::ALL {
            let mut secrets = SecretSet::new(
                Some("a".into()),
                Some("b".into()),
                Some("c".into()),
                Some("d".into()),
            );
            *secrets.slot_mut(missing) = None;

            assert_eq!(secrets.missing(), vec![missing]);
            assert!(!secrets.is_complete());
        }
    }

    #[test]
    fn test_debug_redacts_values() {
        let secrets = SecretSet::new(Some("super-secret".into()), None, None, None);
        let rendered = format!("{secrets:?}");

        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("MURF_API_KEY"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_bundle_fields_are_optional() {
        let bundle: ApiKeyBundle =
            serde_json::from_str(r#"{"geminiApiKey": "g", "theme": "dark"}"#).unwrap();
        assert_eq!(bundle.gemini_api_key.as_deref(), Some("g"));
        assert!(bundle.murf_api_key.is_none());
        assert!(bundle.assembly_ai_api_key.is_none());
        assert!(bundle.serp_api_key.is_none());

        let empty: ApiKeyBundle = serde_json::from_str("{}").unwrap();
        assert!(empty.value(SecretName::Search).is_none());
    }

    #[test]
    fn test_secret_name_serializes_as_env_var() {
        let json = serde_json::to_string(&SecretName::ALL).unwrap();
        assert_eq!(
            json,
            r#"["MURF_API_KEY","ASSEMBLYAI_API_KEY","GEMINI_API_KEY","SERPAPI_API_KEY"]"#
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_save_persists_camel_case_and_reloads() {
        clear_key_env();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("api_keys.json");
        let store = CredentialStore::load(&path);
        assert_eq!(store.validate().len(), 4);

        store.save(&full_bundle()).await.unwrap();

        assert!(store.all_present());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"assemblyAiApiKey\""));
        assert!(written.contains("\"serpApiKey\""));
        assert!(!dir.path().join("api_keys.json.tmp").exists());
    }

    #[tokio::test]
    #[serial]
    async fn test_save_into_missing_directory_fails() {
        clear_key_env();

        let dir = TempDir::new().unwrap();
        let store = CredentialStore::load(dir.path().join("nope").join("api_keys.json"));

        let result = store.save(&full_bundle()).await;
        assert!(matches!(result, Err(CredentialError::Write { .. })));
        assert!(!store.all_present());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[serial]
    async fn test_reload_is_observed_whole() {
        clear_key_env();

        let dir = TempDir::new().unwrap();
        let store = Arc::new(CredentialStore::load(dir.path().join("api_keys.json")));
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let reader = {
            let store = Arc::clone(&store);
            let stop = Arc::clone(&stop);
            tokio::task::spawn_blocking(move || {
                let mut observed = 0usize;
                while !stop.load(std::sync::atomic::Ordering::Acquire) {
                    let missing = store.validate().len();
                    assert!(missing == 0 || missing == 4, "saw {missing} missing keys");
                    observed += 1;
                }
                observed
            })
        };

        for round in 0..50 {
            let bundle = if round % 2 == 0 {
                full_bundle()
            } else {
                ApiKeyBundle::default()
            };
            store.save(&bundle).await.unwrap();
        }

        stop.store(true, std::sync::atomic::Ordering::Release);
        let observed = reader.await.unwrap();
        assert!(observed > 0);
    }
}
