use thiserror::Error;

/// A wire record could not be turned into a [`crate::TransactionRecord`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// A field the poller depends on was absent.
    #[error("transaction {id} is missing required field `{field}`")]
    MissingField {
        /// Id of the offending record, or `<unknown>` when the id itself is missing.
        id: String,

        /// Wire name of the missing field.
        field: &'static str,
    },

    /// The record is not a JSON object of the expected shape.
    #[error("transaction {id} is malformed: {reason}")]
    Malformed {
        /// Id of the offending record, or `<unknown>` when it has none.
        id: String,

        /// What the decoder tripped over.
        reason: String,
    },
}
