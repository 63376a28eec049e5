//! A mock implementation of the transaction source. Serves scripted
//! transactions from memory, with failure injection and query recording.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
pub use error::Error;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use txsync_source::{Direction, Paging, TransactionPage, TransactionQuery, TransactionSource};
use txsync_transactions::RawTransaction;

const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Clone, Debug)]
enum Entry {
    Typed(RawTransaction),
    Json(Value),
}

impl Entry {
    fn id(&self) -> Option<&str> {
        match self {
            Self::Typed(transaction) => transaction.id.as_deref(),
            Self::Json(value) => value.get("id").and_then(Value::as_str),
        }
    }

    fn created_at(&self) -> Option<u64> {
        match self {
            Self::Typed(transaction) => transaction.created_at,
            Self::Json(value) => value.get("createdAt").and_then(Value::as_u64),
        }
    }

    fn to_value(&self) -> Result<Value, Error> {
        match self {
            Self::Typed(transaction) => serde_json::to_value(transaction).map_err(Error::Encode),
            Self::Json(value) => Ok(value.clone()),
        }
    }
}

#[derive(Debug)]
struct State {
    delay: Option<Duration>,
    failing_pages: Vec<(Direction, String)>,
    failures_remaining: usize,
    incoming: Vec<Entry>,
    outgoing: Vec<Entry>,
    page_size: usize,
    queries: Vec<TransactionQuery>,
}

impl State {
    fn entries(&self, direction: Direction) -> &Vec<Entry> {
        match direction {
            Direction::Outgoing => &self.outgoing,
            Direction::Incoming => &self.incoming,
        }
    }

    fn entries_mut(&mut self, direction: Direction) -> &mut Vec<Entry> {
        match direction {
            Direction::Outgoing => &mut self.outgoing,
            Direction::Incoming => &mut self.incoming,
        }
    }

    fn upsert(&mut self, direction: Direction, entry: Entry) {
        let entries = self.entries_mut(direction);

        match entries
            .iter_mut()
            .find(|existing| existing.id().is_some() && existing.id() == entry.id())
        {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    fn take_page_failure(&mut self, query: &TransactionQuery) -> bool {
        let position = self.failing_pages.iter().position(|(direction, cursor)| {
            *direction == query.direction && query.page_cursor.as_deref() == Some(cursor.as_str())
        });

        position
            .map(|position| self.failing_pages.remove(position))
            .is_some()
    }
}

/// In-memory transaction source. Used for testing.
///
/// Records are served sorted by `createdAt`, filtered by
/// `createdAt >= after`, in pages of a fixed size. Cursors are page offsets.
#[derive(Clone, Debug)]
pub struct MockTransactionSource {
    state: Arc<Mutex<State>>,
}

impl Default for MockTransactionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransactionSource {
    /// Creates an empty source with the default page size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Creates an empty source that serves at most `page_size` records per page.
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                delay: None,
                failing_pages: Vec::new(),
                failures_remaining: 0,
                incoming: Vec::new(),
                outgoing: Vec::new(),
                page_size: page_size.max(1),
                queries: Vec::new(),
            })),
        }
    }

    /// Inserts a record, replacing any record with the same id in that
    /// direction. Replacing is how tests move a transaction through its
    /// lifecycle.
    pub async fn upsert(&self, direction: Direction, transaction: RawTransaction) {
        self.state
            .lock()
            .await
            .upsert(direction, Entry::Typed(transaction));
    }

    /// Like [`Self::upsert`], but serves `value` verbatim. Lets tests put
    /// records on the wire that do not fit [`RawTransaction`].
    pub async fn upsert_json(&self, direction: Direction, value: Value) {
        self.state
            .lock()
            .await
            .upsert(direction, Entry::Json(value));
    }

    /// Removes every record from both directions.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.outgoing.clear();
        state.incoming.clear();
    }

    /// Makes the next `count` requests fail.
    pub async fn fail_next(&self, count: usize) {
        self.state.lock().await.failures_remaining = count;
    }

    /// Makes the next request for the page of `direction` at `cursor` fail.
    pub async fn fail_page(&self, direction: Direction, cursor: impl Into<String>) {
        self.state
            .lock()
            .await
            .failing_pages
            .push((direction, cursor.into()));
    }

    /// Delays every response by `delay`.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().await.delay = delay;
    }

    /// Every query received so far, in order.
    pub async fn queries(&self) -> Vec<TransactionQuery> {
        self.state.lock().await.queries.clone()
    }

    /// Forgets recorded queries.
    pub async fn clear_queries(&self) {
        self.state.lock().await.queries.clear();
    }
}

#[async_trait]
impl TransactionSource for MockTransactionSource {
    type Error = Error;

    async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<TransactionPage, Self::Error> {
        let delay = {
            let mut state = self.state.lock().await;
            state.queries.push(query.clone());
            state.delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;

        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            debug!("failing {} query as requested", query.direction);
            return Err(Error::Injected);
        }

        if state.take_page_failure(query) {
            debug!(cursor = ?query.page_cursor, "failing {} page as requested", query.direction);
            return Err(Error::Injected);
        }

        let offset = match &query.page_cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| Error::InvalidCursor(cursor.clone()))?,
            None => 0,
        };

        let mut matching: Vec<&Entry> = state
            .entries(query.direction)
            .iter()
            .filter(|entry| entry.created_at().is_none_or(|created_at| created_at >= query.after))
            .collect();
        matching.sort_by_key(|entry| entry.created_at());

        let end = offset.saturating_add(state.page_size).min(matching.len());
        let data = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|entry| entry.to_value())
            .collect::<Result<Vec<_>, _>>()?;
        let next = (end < matching.len()).then(|| end.to_string());

        Ok(TransactionPage {
            data,
            paging: Paging { next },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use txsync_transactions::TransactionStatus;

    fn tx(id: &str, created_at: u64) -> RawTransaction {
        RawTransaction {
            id: Some(id.to_string()),
            status: Some(TransactionStatus::Completed),
            created_at: Some(created_at),
            last_updated: Some(created_at),
            ..RawTransaction::default()
        }
    }

    fn ids(page: &TransactionPage) -> Vec<&str> {
        page.data
            .iter()
            .filter_map(|value| value.get("id").and_then(Value::as_str))
            .collect()
    }

    #[tokio::test]
    async fn test_pages_follow_cursor() {
        let source = MockTransactionSource::with_page_size(2);
        for (id, created_at) in [("c", 30), ("a", 10), ("b", 20)] {
            source.upsert(Direction::Outgoing, tx(id, created_at)).await;
        }

        let query = TransactionQuery::first_page(Direction::Outgoing, 0);
        let first = source.list_transactions(&query).await.unwrap();
        assert_eq!(ids(&first), vec!["a", "b"]);
        assert_eq!(first.next_cursor(), Some("2"));

        let second = source
            .list_transactions(&query.with_cursor("2".to_string()))
            .await
            .unwrap();
        assert_eq!(ids(&second), vec!["c"]);
        assert_eq!(second.next_cursor(), None);
    }

    #[tokio::test]
    async fn test_after_is_inclusive_lower_bound() {
        let source = MockTransactionSource::new();
        source.upsert(Direction::Incoming, tx("a", 100)).await;
        source.upsert(Direction::Incoming, tx("b", 150)).await;

        let page = source
            .list_transactions(&TransactionQuery::first_page(Direction::Incoming, 150))
            .await
            .unwrap();

        assert_eq!(page.data.len(), 1);
        assert_eq!(ids(&page), vec!["b"]);
    }

    #[tokio::test]
    async fn test_directions_are_independent() {
        let source = MockTransactionSource::new();
        source.upsert(Direction::Outgoing, tx("a", 1)).await;

        let page = source
            .list_transactions(&TransactionQuery::first_page(Direction::Incoming, 0))
            .await
            .unwrap();

        assert!(page.data.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let source = MockTransactionSource::new();
        let mut pending = tx("a", 1);
        pending.status = Some(TransactionStatus::PendingSignature);
        source.upsert(Direction::Outgoing, pending).await;
        source.upsert(Direction::Outgoing, tx("a", 1)).await;

        let page = source
            .list_transactions(&TransactionQuery::first_page(Direction::Outgoing, 0))
            .await
            .unwrap();

        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0]["status"], "COMPLETED");
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let source = MockTransactionSource::new();
        source.fail_next(1).await;
        let query = TransactionQuery::first_page(Direction::Outgoing, 0);

        assert_matches!(source.list_transactions(&query).await, Err(Error::Injected));
        assert!(source.list_transactions(&query).await.is_ok());
        assert_eq!(source.queries().await.len(), 2);
    }

    #[tokio::test]
    async fn test_rejects_foreign_cursor() {
        let source = MockTransactionSource::new();
        let query = TransactionQuery::first_page(Direction::Outgoing, 0).with_cursor("zzz".into());

        assert_matches!(
            source.list_transactions(&query).await,
            Err(Error::InvalidCursor(cursor)) if cursor == "zzz"
        );
    }

    #[tokio::test]
    async fn test_page_failure_hits_only_that_page() {
        let source = MockTransactionSource::with_page_size(1);
        source.upsert(Direction::Outgoing, tx("a", 1)).await;
        source.upsert(Direction::Outgoing, tx("b", 2)).await;
        source.fail_page(Direction::Outgoing, "1").await;

        let first = TransactionQuery::first_page(Direction::Outgoing, 0);
        let second = first.with_cursor("1".to_string());

        assert!(source.list_transactions(&first).await.is_ok());
        assert_matches!(source.list_transactions(&second).await, Err(Error::Injected));
        assert_eq!(ids(&source.list_transactions(&second).await.unwrap()), vec!["b"]);
    }

    #[tokio::test]
    async fn test_json_records_are_served_verbatim() {
        let source = MockTransactionSource::new();
        source.upsert(Direction::Incoming, tx("a", 5)).await;
        source
            .upsert_json(
                Direction::Incoming,
                serde_json::json!({ "id": "b", "createdAt": 7, "status": 3 }),
            )
            .await;

        let page = source
            .list_transactions(&TransactionQuery::first_page(Direction::Incoming, 0))
            .await
            .unwrap();

        assert_eq!(ids(&page), vec!["a", "b"]);
        assert_eq!(page.data[1]["status"], 3);
    }
}
