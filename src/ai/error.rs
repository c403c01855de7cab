use std::fmt;

/// Classified completion-provider failure, so the caller can pick the right
/// recovery strategy without inspecting provider-specific exception text.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Invalid or expired API key.
    Auth,
    /// 429 / quota exhausted — worth one delayed retry.
    Quota,
    /// Request timed out.
    Timeout,
    /// Connection refused, DNS failure, reset, etc.
    Network,
    /// Provider-side 5xx.
    Server,
    /// Anything else.
    Unknown,
}

impl ProviderError {
    /// Pure classification over status code and response body. The status
    /// mapping is the contract; body markers are a fallback only, because
    /// Gemini reports an invalid key as HTTP 400 with API_KEY_INVALID in the
    /// body, and error text is not a stable contract otherwise.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => ProviderErrorKind::Auth,
            429 => ProviderErrorKind::Quota,
            408 => ProviderErrorKind::Timeout,
            500 | 502 | 503 | 504 => ProviderErrorKind::Server,
            _ => classify_body(body),
        };
        Self {
            kind,
            status: Some(status),
            message: truncate(body),
        }
    }

    pub fn network(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ProviderErrorKind::Timeout
        } else {
            ProviderErrorKind::Network
        };
        Self {
            kind,
            status: None,
            message: err.to_string(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Unknown,
            status: None,
            message: message.into(),
        }
    }

    pub fn is_quota(&self) -> bool {
        self.kind == ProviderErrorKind::Quota
    }
}

fn classify_body(body: &str) -> ProviderErrorKind {
    let lower = body.to_lowercase();
    if lower.contains("api_key_invalid")
        || lower.contains("api key not valid")
        || lower.contains("invalid api key")
        || lower.contains("authentication")
    {
        ProviderErrorKind::Auth
    } else if lower.contains("quota")
        || lower.contains("resource_exhausted")
        || lower.contains("rate limit")
    {
        ProviderErrorKind::Quota
    } else {
        ProviderErrorKind::Unknown
    }
}

fn truncate(body: &str) -> String {
    if body.len() > 300 {
        let mut end = 300;
        while end > 0 && !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "provider error ({status}, {:?}): {}", self.kind, self.message),
            None => write!(f, "provider error ({:?}): {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for ProviderError {}
