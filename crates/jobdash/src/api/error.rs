use serde_json::Value;

/// Every failure the API client and controllers hand to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Rejected locally; nothing was sent.
    #[error("{0}")]
    Validation(String),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    RequestFailed { status: u16, message: String },

    /// The caller cancelled the request. Never shown to users.
    #[error("request aborted")]
    Aborted,

    /// Transport or decoding failure.
    #[error("request failed: {0}")]
    Unknown(String),
}

pub const GENERIC_FAILURE_MESSAGE: &str = "Unable to reach the job service. Please try again.";

impl ApiError {
    pub fn from_response(status: u16, body: &str) -> Self {
        ApiError::RequestFailed {
            status,
            message: extract_message(status, body),
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, ApiError::Aborted)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text to show the user, or `None` for errors that must stay silent.
    pub fn user_message(&self) -> Option<String> {
        match self {
            ApiError::Validation(msg) => Some(msg.clone()),
            ApiError::RequestFailed { message, .. } => Some(message.clone()),
            ApiError::Aborted => None,
            ApiError::Unknown(_) => Some(GENERIC_FAILURE_MESSAGE.to_string()),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Unknown(format!("timed out: {e}"))
        } else if e.is_decode() {
            ApiError::Unknown(format!("invalid response body: {e}"))
        } else {
            ApiError::Unknown(e.to_string())
        }
    }
}

/// Best-effort human-readable message from a failure body.
///
/// Order: `detail` / `error` / `message` string, then the first field error
/// of a `{"field": ["msg", ...]}` object, then the raw text, then a generic
/// message carrying the status code.
pub fn extract_message(status: u16, body: &str) -> String {
    let text = body.trim();

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        for key in ["detail", "error", "message"] {
            if let Some(Value::String(s)) = map.get(key) {
                if !s.trim().is_empty() {
                    return s.trim().to_string();
                }
            }
        }

        for (field, value) in &map {
            let first = match value {
                Value::Array(items) => items.iter().find_map(|v| v.as_str()),
                Value::String(s) => Some(s.as_str()),
                _ => None,
            };
            if let Some(msg) = first {
                return format!("{field}: {msg}");
            }
        }
    }

    if text.is_empty() {
        format!("Request failed with status {status}")
    } else {
        text.to_string()
    }
}
