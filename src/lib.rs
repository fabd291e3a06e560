//! Image and video generation for the portfolio's AI creative suite.
//!
//! This crate wraps the hosted generative API behind a small, asynchronous
//! interface. A [`CredentialGate`] makes sure an API key is selected before
//! each generation, and a [`GenerationClient`] turns prompts into displayable
//! assets.
//!
//! ## Features
//! - Square image generation in three size tiers.
//! - Video generation from a prompt and an optional reference image.
//! - Bounded, cancellable polling of long-running video jobs.
//! - In-memory assets that can be displayed or written to disk.
//! - A [`Studio`] driver enforcing one generation at a time.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use creative_suite::{EnvCredentialHost, GenerationClient, GenerationRequest, ImageSize};
//! # use tokio_util::sync::CancellationToken;
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let client = GenerationClient::new(Arc::new(EnvCredentialHost::new()))?;
//! let request = GenerationRequest::image("a red cube", ImageSize::Small);
//! let result = client.generate(&request, &CancellationToken::new()).await?;
//! println!("{:?}", result.asset);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod studio;
pub mod types;

pub use client::{GenerationClient, API_KEY_HEADER};
pub use config::ClientConfig;
pub use credential::{
    Credential, CredentialGate, CredentialHost, EnvCredentialHost, StaticCredentialHost,
};
pub use error::{ErrorClass, SuiteError};
pub use studio::{PanelState, Studio};
pub use types::{
    AspectRatio, AssetHandle, GenerationRequest, GenerationResult, ImageSize, MediaKind,
    ReferenceImage, VideoJob,
};
