//! Credential selection.
//!
//! The API key is owned by whatever hosts the client: a browser shell, a
//! desktop app, or the process environment. The client only asks whether a key
//! is selected, asks the host to run its selection flow, and borrows the
//! selected key to authenticate requests.

use crate::error::SuiteError;
use async_trait::async_trait;
use std::env;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Environment variables consulted by [`EnvCredentialHost`], in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// An opaque API key. Its value never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw key.
    pub fn new(key: impl Into<String>) -> Self {
        Credential(key.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// The environment that owns credential selection.
#[async_trait]
pub trait CredentialHost: Send + Sync {
    /// Whether a key is currently selected.
    async fn has_selected_key(&self) -> Result<bool, SuiteError>;

    /// Runs the host's interactive selection flow and returns once the user
    /// completes or cancels it.
    async fn open_select_key(&self) -> Result<(), SuiteError>;

    /// The currently selected key.
    async fn credential(&self) -> Result<Credential, SuiteError>;
}

/// Makes sure a key is selected before anything talks to the service.
pub struct CredentialGate<H> {
    host: Arc<H>,
}

impl<H> Clone for CredentialGate<H> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
        }
    }
}

impl<H: CredentialHost> CredentialGate<H> {
    /// Creates a gate over `host`.
    pub fn new(host: Arc<H>) -> Self {
        Self { host }
    }

    /// The host consulted for selection and keys.
    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// Opens the host's selection flow if no key is selected yet.
    ///
    /// The answer is never cached: the selection can change or be revoked
    /// between calls, so this asks the host every time. Errors come only from
    /// the host and are returned unchanged.
    pub async fn ensure_credential(&self) -> Result<(), SuiteError> {
        if self.host.has_selected_key().await? {
            debug!("API key already selected");
            return Ok(());
        }
        info!("No API key selected, opening key selection");
        self.host.open_select_key().await
    }

    /// Sends the user through key selection again, regardless of the current
    /// state. Used after the service rejects the selected key.
    pub async fn reselect(&self) -> Result<(), SuiteError> {
        info!("Re-opening key selection after the key was rejected");
        self.host.open_select_key().await
    }
}

/// Reads the key from the process environment.
///
/// Selecting a key means reloading a `.env` file from the working directory.
#[derive(Debug, Default, Clone)]
pub struct EnvCredentialHost;

impl EnvCredentialHost {
    /// Creates the host. Nothing is read until the first check.
    pub fn new() -> Self {
        EnvCredentialHost
    }

    fn lookup() -> Option<String> {
        API_KEY_VARS
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find(|value| !value.trim().is_empty())
    }
}

#[async_trait]
impl CredentialHost for EnvCredentialHost {
    async fn has_selected_key(&self) -> Result<bool, SuiteError> {
        Ok(Self::lookup().is_some())
    }

    async fn open_select_key(&self) -> Result<(), SuiteError> {
        dotenvy::dotenv().ok();
        match Self::lookup() {
            Some(_) => Ok(()),
            None => Err(SuiteError::Credential(format!(
                "no API key selected; set one of {}",
                API_KEY_VARS.join(", ")
            ))),
        }
    }

    async fn credential(&self) -> Result<Credential, SuiteError> {
        Self::lookup()
            .map(Credential::new)
            .ok_or_else(|| SuiteError::Credential("no API key selected".to_string()))
    }
}

/// A host whose key is set programmatically.
///
/// Starts out with or without a key; [`StaticCredentialHost::select`] plays
/// the role of the user picking one.
#[derive(Debug, Default)]
pub struct StaticCredentialHost {
    selected: Mutex<Option<Credential>>,
}

impl StaticCredentialHost {
    /// A host with `key` already selected.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            selected: Mutex::new(Some(Credential::new(key))),
        }
    }

    /// A host with nothing selected. Opening selection then fails as if
    /// the user cancelled.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Replaces the selected key.
    pub fn select(&self, key: impl Into<String>) {
        *self.slot() = Some(Credential::new(key));
    }

    /// Drops the selected key.
    pub fn clear(&self) {
        *self.slot() = None;
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Credential>> {
        self.selected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CredentialHost for StaticCredentialHost {
    async fn has_selected_key(&self) -> Result<bool, SuiteError> {
        Ok(self.slot().is_some())
    }

    async fn open_select_key(&self) -> Result<(), SuiteError> {
        if self.slot().is_some() {
            Ok(())
        } else {
            Err(SuiteError::Credential("key selection was cancelled".to_string()))
        }
    }

    async fn credential(&self) -> Result<Credential, SuiteError> {
        self.slot()
            .clone()
            .ok_or_else(|| SuiteError::Credential("no API key selected".to_string()))
    }
}
