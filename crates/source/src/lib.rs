//! Abstract interface for paginated, cursor-based transaction listings.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::error::Error;
use std::fmt::{self, Debug, Display};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use txsync_transactions::de::null_as_default;

/// Marker trait for transaction source errors.
pub trait TransactionSourceError: Error + Send + Sync + 'static {}

/// Which side of a transfer the listing is filtered on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Transactions the wallet sends.
    Outgoing,

    /// Transactions the wallet receives.
    Incoming,
}

impl Direction {
    /// Name of the query flag that selects this direction.
    #[must_use]
    pub const fn query_flag(self) -> &'static str {
        match self {
            Self::Outgoing => "outgoing",
            Self::Incoming => "incoming",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_flag())
    }
}

/// A single page request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionQuery {
    /// Direction filter.
    pub direction: Direction,

    /// Lower bound on `createdAt`.
    pub after: u64,

    /// Continuation token from the previous page, if any.
    pub page_cursor: Option<String>,
}

impl TransactionQuery {
    /// A query for the first page of `direction` after `after`.
    #[must_use]
    pub const fn first_page(direction: Direction, after: u64) -> Self {
        Self {
            direction,
            after,
            page_cursor: None,
        }
    }

    /// The same query, continued from `cursor`.
    #[must_use]
    pub fn with_cursor(&self, cursor: String) -> Self {
        Self {
            page_cursor: Some(cursor),
            ..self.clone()
        }
    }
}

/// Paging metadata of a response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    /// Cursor of the next page; absent when the listing is exhausted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// A single page of results.
///
/// Records are kept as raw JSON so that one malformed element can be dropped
/// without losing the rest of the page. Decode them with
/// [`txsync_transactions::RawTransaction::from_value`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionPage {
    /// Records on this page, in source order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<Value>,

    /// Paging metadata.
    #[serde(default, deserialize_with = "null_as_default")]
    pub paging: Paging,
}

impl TransactionPage {
    /// Cursor of the next page, ignoring empty cursors.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.paging.next.as_deref().filter(|next| !next.is_empty())
    }
}

/// A remote listing of transactions, queried one page at a time.
#[async_trait]
pub trait TransactionSource
where
    Self: Clone + Debug + Send + Sync + 'static,
{
    /// The error type for the source.
    type Error: TransactionSourceError;

    /// Fetches one page of transactions matching `query`.
    async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<TransactionPage, Self::Error>;
}
