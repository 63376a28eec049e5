use thiserror::Error;
use txsync_source::{Direction, TransactionSourceError};

/// An error that can occur during a reconciliation cycle.
#[derive(Debug, Error)]
pub enum Error<E>
where
    E: TransactionSourceError,
{
    /// A page of one direction could not be fetched.
    #[error("failed to fetch {direction} transactions: {source}")]
    Fetch {
        /// Direction whose listing failed.
        direction: Direction,

        /// Underlying source error.
        source: E,
    },

    /// The listener was stopped while the fetch was in flight.
    #[error("transaction fetch was cancelled")]
    Cancelled,
}
