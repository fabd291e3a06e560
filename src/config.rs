use crate::error::SuiteError;
use std::env;
use std::time::Duration;

/// Public Gemini endpoint, `v1beta` surface.
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
/// Model used for still images.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
/// Model used for video jobs.
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";
/// Resolution requested for every video.
pub const DEFAULT_VIDEO_RESOLUTION: &str = "720p";
/// Delay between two status queries of a video job.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Upper bound on waiting for a video job before `SuiteError::Timeout`.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(10 * 60);

/// Settings for a [`GenerationClient`](crate::GenerationClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the generative API. Always ends with `/`.
    pub base_url: String,
    pub image_model: String,
    pub video_model: String,
    pub video_resolution: String,
    /// Delay between two status queries of a video job.
    pub poll_interval: Duration,
    /// Upper bound on the time spent waiting for a video job.
    pub max_wait: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            video_resolution: DEFAULT_VIDEO_RESOLUTION.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by environment variables:
    ///
    /// - `GEMINI_API_BASE`
    /// - `CREATIVE_SUITE_IMAGE_MODEL`, `CREATIVE_SUITE_VIDEO_MODEL`
    /// - `CREATIVE_SUITE_POLL_SECS`, `CREATIVE_SUITE_MAX_WAIT_SECS`
    ///
    /// # Errors
    ///
    /// `SuiteError::InvalidRequest` if a duration variable is not a whole
    /// number of seconds.
    pub fn from_env() -> Result<Self, SuiteError> {
        let mut config = Self::default();
        if let Some(base_url) = non_empty_env("GEMINI_API_BASE") {
            config = config.with_base_url(&base_url);
        }
        if let Some(model) = non_empty_env("CREATIVE_SUITE_IMAGE_MODEL") {
            config.image_model = model;
        }
        if let Some(model) = non_empty_env("CREATIVE_SUITE_VIDEO_MODEL") {
            config.video_model = model;
        }
        if let Some(secs) = secs_env("CREATIVE_SUITE_POLL_SECS")? {
            config.poll_interval = secs;
        }
        if let Some(secs) = secs_env("CREATIVE_SUITE_MAX_WAIT_SECS")? {
            config.max_wait = secs;
        }
        Ok(config)
    }

    /// Points the client at another API root. A trailing `/` is added when
    /// missing so that relative endpoints join below it.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let trimmed = base_url.trim().trim_end_matches('/');
        self.base_url = format!("{trimmed}/");
        self
    }

    /// Sets the delay between status queries.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets how long a video job may take before giving up.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Overrides the image model name.
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    /// Overrides the video model name.
    pub fn with_video_model(mut self, model: impl Into<String>) -> Self {
        self.video_model = model.into();
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn secs_env(name: &str) -> Result<Option<Duration>, SuiteError> {
    non_empty_env(name)
        .map(|raw| {
            raw.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| SuiteError::InvalidRequest(format!("{name} must be whole seconds, got `{raw}`")))
        })
        .transpose()
}
