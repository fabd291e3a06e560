use reqwest::StatusCode;

/// Remote messages that mean the selected credential was rejected.
const REJECTED_KEY_MARKERS: [&str; 2] = ["Requested entity was not found", "API key not valid"];

/// Every failure the creative suite can surface.
#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    /// Raised by the credential host: selection cancelled or no key available.
    #[error("Credential error: {0}")]
    Credential(String),
    /// The service refused the selected key (HTTP 401 or 403).
    #[error("API key rejected: {0}")]
    KeyRejected(String),
    #[error("Generation failed: {0}")]
    Generation(String),
    #[error("Network request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("API request failed ({status}): {message}")]
    ApiError { status: StatusCode, message: String },
    #[error("timeout")]
    Timeout,
    #[error("cancelled")]
    Cancelled,
    #[error("Failed to parse API response: {0}")]
    ResponseParseFailed(#[from] serde_json::Error),
    #[error("URL parsing failed: {0}")]
    UrlParseFailed(#[from] url::ParseError),
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("A generation is already in progress")]
    Busy,
}

/// The families callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The host could not provide a key, or the service refused it.
    Credential,
    /// A well-formed response without the expected payload.
    Generation,
    /// Network, HTTP, decoding, timeout and cancellation failures.
    Transport,
    /// The submission was refused locally before anything was sent.
    Rejected,
}

impl SuiteError {
    /// Which family this error belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            SuiteError::Credential(_) | SuiteError::KeyRejected(_) => ErrorClass::Credential,
            SuiteError::Generation(_) => ErrorClass::Generation,
            SuiteError::InvalidRequest(_) | SuiteError::Busy => ErrorClass::Rejected,
            SuiteError::RequestFailed(_)
            | SuiteError::ApiError { .. }
            | SuiteError::Timeout
            | SuiteError::Cancelled
            | SuiteError::ResponseParseFailed(_)
            | SuiteError::UrlParseFailed(_)
            | SuiteError::IoError(_)
            | SuiteError::Base64(_) => ErrorClass::Transport,
        }
    }

    /// Whether the caller should send the user back through key selection
    /// before allowing another attempt. This is a hint only; nothing retries.
    ///
    /// Only the service refusing the key counts. Errors the host raised while
    /// selecting, such as a cancelled dialog, do not.
    pub fn needs_reselection(&self) -> bool {
        let message = match self {
            SuiteError::KeyRejected(_) => return true,
            SuiteError::Credential(_) => return false,
            other => other.to_string(),
        };
        REJECTED_KEY_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
    }

    /// Maps a non-2xx response to the matching variant.
    pub(crate) fn from_status(status: StatusCode, body: &serde_json::Value) -> Self {
        let message = body
            .pointer("/error/message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SuiteError::KeyRejected(message),
            _ => SuiteError::ApiError { status, message },
        }
    }
}
