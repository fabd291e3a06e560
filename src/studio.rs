//! Headless driver for the creative suite panel.
//!
//! Mirrors what the page does around a generation: one submission at a
//! time, a single result slot that each attempt clears and each success
//! overwrites, and a trip back through key selection when the service
//! rejects the key.

use crate::client::GenerationClient;
use crate::credential::CredentialHost;
use crate::error::SuiteError;
use crate::types::{GenerationRequest, GenerationResult};
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// What the result viewport shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PanelState {
    #[default]
    Idle,
    InProgress,
    Completed(GenerationResult),
    Failed(String),
}

/// Drives generations the way the panel does.
///
/// Holds one [`GenerationClient`] and the result slot. At most one
/// submission is in flight; the slot stays [`PanelState::InProgress`] until
/// the attempt settles, including any trip back through key selection.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use creative_suite::{EnvCredentialHost, GenerationClient, GenerationRequest, ImageSize, Studio};
/// # use tokio_util::sync::CancellationToken;
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let studio = Studio::new(GenerationClient::new(Arc::new(EnvCredentialHost::new()))?);
/// let request = GenerationRequest::image("a red cube", ImageSize::Small);
/// studio.submit(request, &CancellationToken::new()).await?;
/// println!("{:?}", studio.state());
/// # Ok(())
/// # }
/// ```
pub struct Studio<H> {
    client: GenerationClient<H>,
    state: Mutex<PanelState>,
}

impl<H: CredentialHost> Studio<H> {
    /// Wraps `client` with an idle panel.
    pub fn new(client: GenerationClient<H>) -> Self {
        Self {
            client,
            state: Mutex::new(PanelState::Idle),
        }
    }

    /// The client submissions go through.
    pub fn client(&self) -> &GenerationClient<H> {
        &self.client
    }

    /// A snapshot of the result slot.
    pub fn state(&self) -> PanelState {
        self.slot().clone()
    }

    /// Whether a submission is pending. New submissions are refused with
    /// `SuiteError::Busy` while this is true.
    pub fn is_busy(&self) -> bool {
        matches!(*self.slot(), PanelState::InProgress)
    }

    /// Runs one user-initiated generation.
    ///
    /// # Errors
    ///
    /// - `SuiteError::InvalidRequest` for an empty prompt; the panel is left
    ///   untouched.
    /// - `SuiteError::Busy` while another submission is pending.
    /// - Anything the client returns. The panel then shows the message, and
    ///   key selection is reopened first if the key was rejected.
    pub async fn submit(
        &self,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, SuiteError> {
        if request.prompt().trim().is_empty() {
            return Err(SuiteError::InvalidRequest("prompt must not be empty".to_string()));
        }

        {
            let mut state = self.slot();
            if *state == PanelState::InProgress {
                warn!("Rejected submission while a generation is pending");
                return Err(SuiteError::Busy);
            }
            *state = PanelState::InProgress;
        }

        let _pending = Pending { state: &self.state };
        info!(kind = ?request.kind(), "Starting generation");
        let outcome = self.client.generate(&request, cancel).await;

        match outcome {
            Ok(result) => {
                *self.slot() = PanelState::Completed(result.clone());
                Ok(result)
            }
            Err(err) => {
                error!(error = %err, "Generation failed");
                // Still in progress until selection returns.
                if err.needs_reselection() {
                    if let Err(selection_err) = self.client.gate().reselect().await {
                        warn!(error = %selection_err, "Key re-selection failed");
                    }
                }
                *self.slot() = PanelState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Returns the panel to idle, dropping any result or error.
    pub fn reset(&self) -> Result<(), SuiteError> {
        let mut state = self.slot();
        if *state == PanelState::InProgress {
            return Err(SuiteError::Busy);
        }
        *state = PanelState::Idle;
        Ok(())
    }

    fn slot(&self) -> MutexGuard<'_, PanelState> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<PanelState>) -> MutexGuard<'_, PanelState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Marks the panel failed if a submission is dropped before it settles.
struct Pending<'a> {
    state: &'a Mutex<PanelState>,
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        if *state == PanelState::InProgress {
            *state = PanelState::Failed(SuiteError::Cancelled.to_string());
        }
    }
}
