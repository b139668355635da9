use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("stored session failed validation ({0} violations)")]
    InvalidRecord(usize),

    #[error("recorder is closing; no further mutations accepted")]
    RecorderClosed,

    #[error("a page view is already open for this page load")]
    PageViewAlreadyOpen,

    #[error("no page view is open")]
    NoOpenPageView,
}
