use thiserror::Error;
use txsync_source::TransactionSourceError;

/// Error type for the HTTP transaction source.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    Client(reqwest::Error),

    /// The request failed in transport or the body could not be decoded.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The base URL cannot have a path, e.g. `mailto:` URLs.
    #[error("base url {0} cannot carry a path")]
    InvalidBaseUrl(url::Url),

    /// The backend answered with a non-success status.
    #[error("a call to \"{path}\" failed with status {status}")]
    Status {
        /// Request path.
        path: String,

        /// HTTP status code.
        status: u16,
    },
}

impl TransactionSourceError for Error {}
