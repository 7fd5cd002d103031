use thiserror::Error;

/// Longest slice of a remote response body kept in an error message.
pub const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Failed to submit prediction: {status} - {body}")]
    Submit { status: u16, body: String },

    #[error("No event_id received from prediction service")]
    MissingEventId,

    #[error("Failed to get prediction result: {status} - {body}")]
    ResultFetch { status: u16, body: String },

    #[error(
        "Request timeout after {secs} seconds. The remote model service may be cold-starting - please try again."
    )]
    Timeout { secs: u64 },

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("No valid data found in SSE response")]
    NoSseData,

    #[error("Failed to parse disease predictions: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for PredictionError {
    fn from(err: reqwest::Error) -> Self {
        PredictionError::Transport(err.to_string())
    }
}

pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => body[..idx].to_string(),
        None => body.to_string(),
    }
}
