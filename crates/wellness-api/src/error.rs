// Backend error taxonomy.

use thiserror::Error;

const TRANSPORT_MESSAGE: &str = "Unable to reach the server. Please check your connection.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection refused, DNS failure, timeout, or a broken body stream.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// HTTP 401. On login this means bad credentials; anywhere else the
    /// session is no longer valid.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// HTTP 400/422: the backend rejected the input.
    #[error("rejected: {message}")]
    Validation { message: String },

    /// HTTP 404.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Any other non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A success response whose body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => TRANSPORT_MESSAGE.to_string(),
            ApiError::Unauthorized { message }
            | ApiError::Validation { message }
            | ApiError::NotFound { message }
            | ApiError::Status { message, .. } => message.clone(),
            ApiError::Decode(_) => "The server sent an unexpected response.".to_string(),
        }
    }

    /// Map a non-success status and its body to an error. The backend puts
    /// its explanation under `error` or `message`.
    pub fn from_status(status: u16, body: &str) -> ApiError {
        let message = extract_message(body).unwrap_or_else(|| default_message(status));
        match status {
            401 => ApiError::Unauthorized { message },
            404 => ApiError::NotFound { message },
            400 | 422 => ApiError::Validation { message },
            _ => ApiError::Status { status, message },
        }
    }
}

fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(|v| match v {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            serde_json::Value::Object(obj) => obj
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string),
            _ => None,
        })
}

fn default_message(status: u16) -> String {
    match status {
        401 => "Unauthorized".to_string(),
        404 => "Not found".to_string(),
        500..=599 => "Internal server error".to_string(),
        _ => format!("Request failed with status {status}"),
    }
}
