use thiserror::Error;

/// Failure talking to an upstream data source (schedules, player landings)
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("source returned {status} for {resource}")]
    Status { resource: String, status: u16 },

    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Upstream answered 404 for the requested resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::Status { status: 404, .. })
    }
}
