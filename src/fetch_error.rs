#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Network { status: Option<u16>, message: String },
    #[error("Source not found: {0}")]
    NotFound(String),
    #[error("Invalid request header {0}")]
    InvalidHeader(String),
    #[error("Too many redirects (limit {limit})")]
    TooManyRedirects { limit: usize },
    #[error("Failed to write downloaded workbook: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// HTTP status that caused the failure, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Network { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
