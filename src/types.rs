use crate::error::SuiteError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

static DATA_URI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:(?P<mime>[^;,]+)?(?:;[^,]*)?,(?P<data>.*)$").unwrap()
});

const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Output tier for generated images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageSize {
    #[default]
    Small,
    Medium,
    Large,
}

impl ImageSize {
    /// The tier name the image model understands.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Small => "1K",
            ImageSize::Medium => "2K",
            ImageSize::Large => "4K",
        }
    }
}

impl std::str::FromStr for ImageSize {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" | "1k" => Ok(ImageSize::Small),
            "medium" | "2k" => Ok(ImageSize::Medium),
            "large" | "4k" => Ok(ImageSize::Large),
            other => Err(SuiteError::InvalidRequest(format!("unknown image size `{other}`"))),
        }
    }
}

/// Frame shape for generated videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Landscape,
    Portrait,
}

impl AspectRatio {
    /// The ratio as the video API spells it, `16:9` or `9:16`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

impl std::str::FromStr for AspectRatio {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "16:9" | "landscape" => Ok(AspectRatio::Landscape),
            "9:16" | "portrait" => Ok(AspectRatio::Portrait),
            other => Err(SuiteError::InvalidRequest(format!("unknown aspect ratio `{other}`"))),
        }
    }
}

/// An image used to seed video generation.
///
/// The payload is kept base64 encoded, the form the video model expects it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

impl ReferenceImage {
    /// Builds a reference image from a `data:` URI, as produced by a browser
    /// file reader. A bare base64 string is accepted too and treated as PNG.
    pub fn from_data_uri(uri: &str) -> Result<Self, SuiteError> {
        let (mime_type, data) = match DATA_URI_RE.captures(uri.trim()) {
            Some(caps) => (
                caps.name("mime")
                    .map(|m| m.as_str())
                    .unwrap_or(DEFAULT_IMAGE_MIME)
                    .to_string(),
                caps.name("data").map(|d| d.as_str()).unwrap_or_default(),
            ),
            None => (DEFAULT_IMAGE_MIME.to_string(), uri.trim()),
        };

        if data.is_empty() {
            return Err(SuiteError::InvalidRequest("reference image is empty".to_string()));
        }
        BASE64.decode(data)?;

        Self::checked(data.to_string(), mime_type)
    }

    /// Encodes raw image bytes.
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Result<Self, SuiteError> {
        if bytes.is_empty() {
            return Err(SuiteError::InvalidRequest("reference image is empty".to_string()));
        }
        Self::checked(BASE64.encode(bytes), mime_type.to_string())
    }

    /// Reads an image from disk, guessing its MIME type from the extension.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SuiteError> {
        let path = path.as_ref();
        let mime_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or(DEFAULT_IMAGE_MIME);
        let bytes = fs::read(path).await?;
        Self::from_bytes(&bytes, mime_type)
    }

    fn checked(bytes_base64_encoded: String, mime_type: String) -> Result<Self, SuiteError> {
        if !mime_type.starts_with("image/") {
            return Err(SuiteError::InvalidRequest(format!(
                "reference must be an image, got `{mime_type}`"
            )));
        }
        Ok(Self {
            bytes_base64_encoded,
            mime_type,
        })
    }

    /// The image MIME type, e.g. `image/png`.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The image bytes, standard base64 without a `data:` header.
    pub fn base64_data(&self) -> &str {
        &self.bytes_base64_encoded
    }
}

/// What kind of media a request produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// A single user-initiated generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    Image {
        prompt: String,
        size: ImageSize,
    },
    Video {
        prompt: String,
        reference_image: Option<ReferenceImage>,
        aspect_ratio: AspectRatio,
    },
}

impl GenerationRequest {
    /// An image request.
    pub fn image(prompt: impl Into<String>, size: ImageSize) -> Self {
        GenerationRequest::Image {
            prompt: prompt.into(),
            size,
        }
    }

    /// A video request, optionally animating `reference_image`.
    pub fn video(
        prompt: impl Into<String>,
        reference_image: Option<ReferenceImage>,
        aspect_ratio: AspectRatio,
    ) -> Self {
        GenerationRequest::Video {
            prompt: prompt.into(),
            reference_image,
            aspect_ratio,
        }
    }

    /// The prompt, whatever the kind.
    pub fn prompt(&self) -> &str {
        match self {
            GenerationRequest::Image { prompt, .. } | GenerationRequest::Video { prompt, .. } => {
                prompt
            }
        }
    }

    /// Image or video.
    pub fn kind(&self) -> MediaKind {
        match self {
            GenerationRequest::Image { .. } => MediaKind::Image,
            GenerationRequest::Video { .. } => MediaKind::Video,
        }
    }
}

/// A locally usable reference to generated media.
#[derive(Clone, PartialEq, Eq)]
pub enum AssetHandle {
    /// A `data:` URI, directly displayable.
    DataUri(String),
    /// Fetched bytes held in memory.
    Bytes { mime_type: String, bytes: Vec<u8> },
}

impl std::fmt::Debug for AssetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetHandle::DataUri(uri) => f
                .debug_tuple("DataUri")
                .field(&format_args!("{} chars", uri.len()))
                .finish(),
            AssetHandle::Bytes { mime_type, bytes } => f
                .debug_struct("Bytes")
                .field("mime_type", mime_type)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

impl AssetHandle {
    /// MIME type of the asset. Data URIs without a readable header count as
    /// `image/png`.
    pub fn mime_type(&self) -> &str {
        match self {
            AssetHandle::DataUri(uri) => DATA_URI_RE
                .captures(uri)
                .and_then(|caps| caps.name("mime"))
                .map(|m| m.as_str())
                .unwrap_or(DEFAULT_IMAGE_MIME),
            AssetHandle::Bytes { mime_type, .. } => mime_type,
        }
    }

    /// Decoded media bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SuiteError> {
        match self {
            AssetHandle::DataUri(uri) => {
                let data = DATA_URI_RE
                    .captures(uri)
                    .and_then(|caps| caps.name("data"))
                    .map(|d| d.as_str())
                    .unwrap_or_default();
                Ok(BASE64.decode(data)?)
            }
            AssetHandle::Bytes { bytes, .. } => Ok(bytes.clone()),
        }
    }

    /// Saves the asset as `<dest_dir>/<stem>.<ext>`, the extension following
    /// the MIME type.
    pub async fn write_to<P: AsRef<Path>>(
        &self,
        dest_dir: P,
        stem: &str,
    ) -> Result<PathBuf, SuiteError> {
        let mime_type = self.mime_type();
        let subtype = mime_type.split('/').nth(1).unwrap_or_default();
        let extension = mime_guess::get_mime_extensions_str(mime_type)
            .and_then(|exts| {
                exts.iter()
                    .find(|ext| **ext == subtype)
                    .or_else(|| exts.first())
                    .copied()
            })
            .unwrap_or("bin");
        let file_path = dest_dir.as_ref().join(format!("{stem}.{extension}"));

        let content = self.to_bytes()?;
        fs::create_dir_all(dest_dir.as_ref()).await?;
        let mut file = fs::File::create(&file_path).await?;
        file.write_all(&content).await?;
        file.flush().await?;

        Ok(file_path)
    }
}

/// A completed generation, owned by the caller until the next one replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub kind: MediaKind,
    pub asset: AssetHandle,
}

/// Snapshot of a remote video generation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJob {
    /// Operation name, used as the path for status queries.
    pub name: String,
    pub done: bool,
    /// Download location of the first generated video, once done.
    pub video_uri: Option<String>,
    /// Error message reported by the service for a failed job.
    pub error: Option<String>,
}

impl Operation {
    pub(crate) fn into_job(self) -> VideoJob {
        let video_uri = self
            .response
            .and_then(|r| r.generate_video_response)
            .and_then(|r| r.generated_samples.into_iter().next())
            .and_then(|s| s.video)
            .and_then(|v| v.uri)
            .filter(|uri| !uri.is_empty());
        let error = self.error.map(|e| {
            if e.message.is_empty() {
                format!("video job failed with code {}", e.code)
            } else {
                e.message
            }
        });

        VideoJob {
            name: self.name,
            done: self.done,
            video_uri,
            error,
        }
    }
}

// Wire types for the `generateContent` endpoint.

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest<'a> {
    pub(crate) contents: [Content<'a>; 1],
    pub(crate) generation_config: GenerationConfig,
}

#[derive(Serialize)]
pub(crate) struct Content<'a> {
    pub(crate) parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
pub(crate) struct TextPart<'a> {
    pub(crate) text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    pub(crate) image_config: ImageConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageConfig {
    pub(crate) aspect_ratio: &'static str,
    pub(crate) image_size: &'static str,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub(crate) candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct Candidate {
    #[serde(default)]
    pub(crate) content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub(crate) parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResponsePart {
    #[serde(default)]
    pub(crate) inline_data: Option<InlineData>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct InlineData {
    #[serde(default)]
    pub(crate) data: String,
}

// Wire types for the `predictLongRunning` endpoint and its operations.

#[derive(Serialize)]
pub(crate) struct PredictLongRunningRequest<'a> {
    pub(crate) instances: [VideoInstance<'a>; 1],
    pub(crate) parameters: VideoParameters<'a>,
}

#[derive(Serialize)]
pub(crate) struct VideoInstance<'a> {
    pub(crate) prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) image: Option<&'a ReferenceImage>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoParameters<'a> {
    pub(crate) aspect_ratio: &'static str,
    pub(crate) resolution: &'a str,
    pub(crate) sample_count: u8,
}

#[derive(Deserialize, Debug)]
pub(crate) struct Operation {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) done: bool,
    #[serde(default)]
    pub(crate) response: Option<OperationResponse>,
    #[serde(default)]
    pub(crate) error: Option<OperationError>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OperationResponse {
    #[serde(default)]
    pub(crate) generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateVideoResponse {
    #[serde(default)]
    pub(crate) generated_samples: Vec<GeneratedSample>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct GeneratedSample {
    #[serde(default)]
    pub(crate) video: Option<VideoFile>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct VideoFile {
    #[serde(default)]
    pub(crate) uri: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct OperationError {
    #[serde(default)]
    pub(crate) code: i32,
    #[serde(default)]
    pub(crate) message: String,
}
