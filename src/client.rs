use crate::config::ClientConfig;
use crate::credential::{CredentialGate, CredentialHost};
use crate::error::SuiteError;
use crate::types::{
    AspectRatio, AssetHandle, Content, GenerateContentRequest, GenerateContentResponse,
    GenerationConfig, GenerationRequest, GenerationResult, ImageConfig, ImageSize, Operation,
    PredictLongRunningRequest, ReferenceImage, TextPart, VideoInstance, VideoJob,
    VideoParameters,
};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Header carrying the API key on every request, downloads included.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

const IMAGE_ASPECT_RATIO: &str = "1:1";
const DEFAULT_VIDEO_MIME: &str = "video/mp4";

/// Client for the image and video generation endpoints.
///
/// Every generation first runs the [`CredentialGate`]; the key itself is
/// fetched from the injected host per request, so a re-selected key takes
/// effect immediately.
pub struct GenerationClient<H> {
    client: reqwest::Client,
    base_url: Url,
    config: ClientConfig,
    gate: CredentialGate<H>,
}

impl<H> Clone for GenerationClient<H> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            config: self.config.clone(),
            gate: self.gate.clone(),
        }
    }
}

impl<H: CredentialHost> GenerationClient<H> {
    /// Creates a client configured from the environment.
    ///
    /// # Errors
    ///
    /// - `SuiteError::InvalidRequest` if an environment override is malformed.
    /// - `SuiteError::RequestFailed` if the internal HTTP client fails to build.
    /// - `SuiteError::UrlParseFailed` if the base URL is invalid.
    pub fn new(host: Arc<H>) -> Result<Self, SuiteError> {
        Self::with_config(host, ClientConfig::from_env()?)
    }

    /// Creates a client with explicit settings, e.g. pointing at a mock server.
    pub fn with_config(host: Arc<H>, config: ClientConfig) -> Result<Self, SuiteError> {
        let client = reqwest::Client::builder().build()?;
        let base_url = Url::parse(&config.base_url)?;

        Ok(Self {
            client,
            base_url,
            config,
            gate: CredentialGate::new(host),
        })
    }

    /// The gate every generation passes before a request is sent.
    ///
    /// Exposed so callers can run [`CredentialGate::reselect`] when an error
    /// reports [`SuiteError::needs_reselection`].
    pub fn gate(&self) -> &CredentialGate<H> {
        &self.gate
    }

    /// The settings this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Generates one square image.
    ///
    /// The first response part carrying inline data wins and is returned as
    /// a `data:image/png;base64,...` URI.
    ///
    /// # Errors
    ///
    /// `SuiteError::Generation("no image data returned")` when no part
    /// carries image data.
    pub async fn generate_image(
        &self,
        prompt: &str,
        size: ImageSize,
    ) -> Result<AssetHandle, SuiteError> {
        self.gate.ensure_credential().await?;

        let url = self.model_endpoint(&self.config.image_model, "generateContent")?;
        let request_body = GenerateContentRequest {
            contents: [Content {
                parts: [TextPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                image_config: ImageConfig {
                    aspect_ratio: IMAGE_ASPECT_RATIO,
                    image_size: size.as_str(),
                },
            },
        };

        info!(size = size.as_str(), "Requesting image generation");
        let request = self.authorized(self.client.post(url).json(&request_body)).await?;
        let response: GenerateContentResponse = self.send_json(request).await?;

        first_inline_image(response)
    }

    /// Submits a video generation job and returns its handle without waiting.
    pub async fn submit_video(
        &self,
        prompt: &str,
        reference_image: Option<&ReferenceImage>,
        aspect_ratio: AspectRatio,
    ) -> Result<VideoJob, SuiteError> {
        let url = self.model_endpoint(&self.config.video_model, "predictLongRunning")?;
        let request_body = PredictLongRunningRequest {
            instances: [VideoInstance {
                prompt,
                image: reference_image,
            }],
            parameters: VideoParameters {
                aspect_ratio: aspect_ratio.as_str(),
                resolution: &self.config.video_resolution,
                sample_count: 1,
            },
        };

        info!(
            aspect_ratio = aspect_ratio.as_str(),
            with_reference = reference_image.is_some(),
            "Submitting video generation job"
        );
        let request = self.authorized(self.client.post(url).json(&request_body)).await?;
        let operation: Operation = self.send_json(request).await?;

        Ok(operation.into_job())
    }

    /// Queries the current state of a video job.
    pub async fn get_video_job(&self, name: &str) -> Result<VideoJob, SuiteError> {
        let url = self.base_url.join(name.trim_start_matches('/'))?;
        let request = self.authorized(self.client.get(url)).await?;
        let operation: Operation = self.send_json(request).await?;

        Ok(operation.into_job())
    }

    /// Polls a video job until it reports done.
    ///
    /// Each status query is issued only after the previous one has been
    /// consumed, `poll_interval` apart. A job that is already done is returned
    /// as is.
    ///
    /// # Errors
    ///
    /// - `SuiteError::Timeout` once `max_wait` has elapsed.
    /// - `SuiteError::Cancelled` when `cancel` fires.
    pub async fn wait_for_video(
        &self,
        job: VideoJob,
        cancel: &CancellationToken,
    ) -> Result<VideoJob, SuiteError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(job = %job.name, "Video job wait cancelled");
                Err(SuiteError::Cancelled)
            }
            outcome = timeout(self.config.max_wait, self.poll_until_done(job.clone())) => {
                outcome.map_err(|_| {
                    warn!(job = %job.name, max_wait = ?self.config.max_wait, "Video job did not finish in time");
                    SuiteError::Timeout
                })?
            }
        }
    }

    async fn poll_until_done(&self, mut job: VideoJob) -> Result<VideoJob, SuiteError> {
        let mut polls = 0u32;
        while !job.done {
            sleep(self.config.poll_interval).await;
            job = self.get_video_job(&job.name).await?;
            polls += 1;
            debug!(job = %job.name, polls, done = job.done, "Polled video job");
        }
        Ok(job)
    }

    /// Fetches a generated video into memory.
    ///
    /// The API key is sent as the `x-goog-api-key` header. `cancel` is
    /// honoured while waiting for the response and between body chunks.
    pub async fn download_video(
        &self,
        uri: &str,
        cancel: &CancellationToken,
    ) -> Result<AssetHandle, SuiteError> {
        let url = Url::parse(uri)?;
        let request = self.authorized(self.client.get(url)).await?;
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SuiteError::Cancelled),
            response = request.send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let error_body: serde_json::Value = response.json().await.unwrap_or_default();
            return Err(SuiteError::from_status(status, &error_body));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::trim)
            .filter(|value| !value.is_empty() && *value != "application/octet-stream")
            .unwrap_or(DEFAULT_VIDEO_MIME)
            .to_string();

        let mut stream = response.bytes_stream();
        let mut bytes = Vec::new();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SuiteError::Cancelled),
                chunk = stream.next() => chunk,
            };
            match chunk {
                Some(chunk) => bytes.extend_from_slice(&chunk?),
                None => break,
            }
        }

        if bytes.is_empty() {
            return Err(SuiteError::Generation("video download was empty".to_string()));
        }
        info!(bytes = bytes.len(), mime_type = %mime_type, "Downloaded generated video");

        Ok(AssetHandle::Bytes { mime_type, bytes })
    }

    /// Generates one video: submit, wait, download.
    ///
    /// # Errors
    ///
    /// `SuiteError::Generation("no video download link returned")` when the
    /// finished job carries no video location; nothing is fetched then.
    pub async fn generate_video(
        &self,
        prompt: &str,
        reference_image: Option<&ReferenceImage>,
        aspect_ratio: AspectRatio,
        cancel: &CancellationToken,
    ) -> Result<AssetHandle, SuiteError> {
        self.gate.ensure_credential().await?;

        let job = self.submit_video(prompt, reference_image, aspect_ratio).await?;
        let job = self.wait_for_video(job, cancel).await?;

        if let Some(message) = job.error {
            return Err(SuiteError::Generation(message));
        }
        let Some(uri) = job.video_uri else {
            return Err(SuiteError::Generation(
                "no video download link returned".to_string(),
            ));
        };

        self.download_video(&uri, cancel).await
    }

    /// Runs a single generation of either kind.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, SuiteError> {
        let asset = match request {
            GenerationRequest::Image { prompt, size } => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(SuiteError::Cancelled),
                    asset = self.generate_image(prompt, *size) => asset?,
                }
            }
            GenerationRequest::Video {
                prompt,
                reference_image,
                aspect_ratio,
            } => {
                self.generate_video(prompt, reference_image.as_ref(), *aspect_ratio, cancel)
                    .await?
            }
        };

        Ok(GenerationResult {
            kind: request.kind(),
            asset,
        })
    }

    fn model_endpoint(&self, model: &str, method: &str) -> Result<Url, SuiteError> {
        let model = model.trim().trim_start_matches("models/");
        Ok(self.base_url.join(&format!("models/{model}:{method}"))?)
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, SuiteError> {
        let credential = self.gate.host().credential().await?;
        Ok(request.header(API_KEY_HEADER, credential.expose()))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, SuiteError> {
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let error_body: serde_json::Value = response.json().await.unwrap_or_default();
            Err(SuiteError::from_status(status, &error_body))
        }
    }
}

fn first_inline_image(response: GenerateContentResponse) -> Result<AssetHandle, SuiteError> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.inline_data)
        .find(|inline| !inline.data.is_empty())
        .map(|inline| AssetHandle::DataUri(format!("data:image/png;base64,{}", inline.data)))
        .ok_or_else(|| SuiteError::Generation("no image data returned".to_string()))
}
