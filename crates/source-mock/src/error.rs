use thiserror::Error;
use txsync_source::TransactionSourceError;

/// Error type for the mock source.
#[derive(Debug, Error)]
pub enum Error {
    /// A stored record could not be turned into JSON.
    #[error("failed to encode transaction: {0}")]
    Encode(serde_json::Error),

    /// A failure queued with `fail_next` or `fail_page`.
    #[error("injected failure")]
    Injected,

    /// The cursor was not produced by this source.
    #[error("invalid page cursor: {0}")]
    InvalidCursor(String),
}

impl TransactionSourceError for Error {}
