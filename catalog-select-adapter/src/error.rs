/// A failed call to the catalog search provider.
///
/// This is the only error kind that crosses the picker boundary; stale responses, blocked
/// selections and corrupt cache entries are handled internally.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("catalog search unavailable: {0}")]
    Unavailable(String),
    #[error("catalog search rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("catalog search returned a malformed response: {0}")]
    Malformed(String),
    #[error("catalog search task panicked")]
    Panicked,
    #[error("catalog search task was cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Whether re-issuing the same query may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Panicked | Self::Cancelled => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::Malformed(_) => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    #[error("selector task is no longer running")]
    Closed,
}
