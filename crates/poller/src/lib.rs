//! Keeps a local view of a wallet's transactions in sync with a paginated
//! remote listing.
//!
//! Every cycle fetches the outgoing and incoming listings concurrently, each
//! from its own watermark, merges them by id and hands the result to a
//! callback. Watermarks only advance once both directions were fetched and
//! the result was delivered, so neither a failed nor an abandoned cycle loses
//! track of transactions.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod error;
mod merge;
mod retry;
mod watermark;

pub use config::{
    CancellationMode, CircuitBreakerConfig, DEFAULT_POLL_INTERVAL, PollerConfig, RetryPolicy,
};
pub use error::Error;
pub use merge::merge;
pub use retry::CircuitState;
pub use watermark::{Watermarks, next_watermark};

use std::sync::Arc;

use parking_lot::Mutex;
use retry::RetryState;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use txsync_source::{Direction, TransactionPage, TransactionQuery, TransactionSource};
use txsync_transactions::TransactionRecord;

#[derive(Debug, Default)]
struct ListenerSlot {
    active: Option<(u64, CancellationToken)>,
    next_generation: u64,
}

/// Marks a listening session as active for as long as it lives.
struct ActiveListener<'a> {
    generation: u64,
    slot: &'a Mutex<ListenerSlot>,
    token: CancellationToken,
}

impl Drop for ActiveListener<'_> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        if matches!(&slot.active, Some((generation, _)) if *generation == self.generation) {
            slot.active = None;
        }
    }
}

struct Inner<S>
where
    S: TransactionSource,
{
    config: PollerConfig,
    listener: Mutex<ListenerSlot>,
    source: S,
    task_tracker: TaskTracker,
    watermarks: tokio::sync::Mutex<Watermarks>,
}

/// Polls a [`TransactionSource`] and reconciles both transfer directions.
///
/// Meant to be created once per session and shared by cloning; clones refer
/// to the same watermarks and listener.
pub struct TransactionPoller<S>
where
    S: TransactionSource,
{
    inner: Arc<Inner<S>>,
}

impl<S> Clone for TransactionPoller<S>
where
    S: TransactionSource,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S> TransactionPoller<S>
where
    S: TransactionSource,
{
    /// Creates a new poller with both watermarks at zero.
    #[must_use]
    pub fn new(source: S, config: PollerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                listener: Mutex::new(ListenerSlot::default()),
                source,
                task_tracker: TaskTracker::new(),
                watermarks: tokio::sync::Mutex::new(Watermarks::default()),
            }),
        }
    }

    /// The current watermarks. Waits for a cycle in progress to finish.
    pub async fn watermarks(&self) -> Watermarks {
        *self.inner.watermarks.lock().await
    }

    /// Whether a listening loop is active.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.inner.listener.lock().active.is_some()
    }

    /// Runs exactly one reconciliation cycle and returns the merged
    /// transactions, newest `lastUpdated` first.
    ///
    /// # Errors
    ///
    /// Returns an error if any page of either direction could not be
    /// fetched. Watermarks are left untouched in that case.
    pub async fn fetch_once(&self) -> Result<Vec<TransactionRecord>, Error<S::Error>> {
        let mut watermarks = self.inner.watermarks.lock().await;
        let (transactions, next) = self
            .reconcile(*watermarks, &CancellationToken::new())
            .await?;
        *watermarks = next;

        Ok(transactions)
    }

    /// Polls until [`Self::stop_listening`] is called, handing every
    /// successful cycle's transactions to `callback`.
    ///
    /// Does nothing if a loop is already active. Failed cycles are logged and
    /// retried according to the configured [`RetryPolicy`] and circuit
    /// breaker.
    pub async fn start_listening<F>(&self, callback: F)
    where
        F: Fn(Vec<TransactionRecord>) + Send + Sync + 'static,
    {
        let Some(listener) = self.activate() else {
            warn!("transaction listener is already active");
            return;
        };
        let token = listener.token.clone();

        info!("starting transaction listener");
        let mut retry = RetryState::new(&self.inner.config);

        while !token.is_cancelled() {
            retry.before_cycle();

            let delay = {
                let mut watermarks = self.inner.watermarks.lock().await;

                match self.reconcile(*watermarks, &token).await {
                    Ok((transactions, next)) => {
                        // Watermarks stay put so an abandoned cycle is fetched again.
                        if token.is_cancelled() {
                            break;
                        }

                        callback(transactions);
                        *watermarks = next;
                        retry.on_success()
                    }
                    Err(Error::Cancelled) => break,
                    Err(e) => {
                        error!("error while fetching transactions: {e}");
                        let delay = retry.on_failure();
                        debug!(circuit = ?retry.circuit(), "retrying in {delay:?}");
                        delay
                    }
                }
            };

            tokio::select! {
                () = token.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        info!("transaction listener stopped");
        drop(listener);
    }

    /// Runs [`Self::start_listening`] as a background task.
    pub fn spawn_listener<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: Fn(Vec<TransactionRecord>) + Send + Sync + 'static,
    {
        let poller = self.clone();
        self.inner
            .task_tracker
            .spawn(async move { poller.start_listening(callback).await })
    }

    /// Signals the listening loop to exit. Safe to call at any time, any
    /// number of times.
    pub fn stop_listening(&self) {
        let active = self.inner.listener.lock().active.take();

        match active {
            Some((_, token)) => {
                info!("stopping transaction listener");
                token.cancel();
            }
            None => debug!("transaction listener is not active"),
        }
    }

    /// Waits for every listener started with [`Self::spawn_listener`] to exit.
    pub async fn wait(&self) {
        self.inner.task_tracker.close();
        self.inner.task_tracker.wait().await;
        self.inner.task_tracker.reopen();
    }

    /// Stops listening and waits for every spawned listener to exit.
    pub async fn shutdown(&self) {
        self.stop_listening();
        self.wait().await;
    }

    fn activate(&self) -> Option<ActiveListener<'_>> {
        let mut slot = self.inner.listener.lock();
        if slot.active.is_some() {
            return None;
        }

        let generation = slot.next_generation;
        slot.next_generation = slot.next_generation.wrapping_add(1);

        let token = CancellationToken::new();
        slot.active = Some((generation, token.clone()));

        Some(ActiveListener {
            generation,
            slot: &self.inner.listener,
            token,
        })
    }

    /// Fetches both directions from `current` and returns the merged
    /// transactions with the watermarks that should follow. Writing the
    /// watermarks back is left to the caller.
    async fn reconcile(
        &self,
        current: Watermarks,
        cancel: &CancellationToken,
    ) -> Result<(Vec<TransactionRecord>, Watermarks), Error<S::Error>> {
        let (outgoing, incoming) = tokio::try_join!(
            self.fetch_all_pages(Direction::Outgoing, current.outgoing, cancel),
            self.fetch_all_pages(Direction::Incoming, current.incoming, cancel),
        )?;

        let is_final = self.inner.config.is_final;
        let mut next = current;
        for (direction, records) in [
            (Direction::Outgoing, &outgoing),
            (Direction::Incoming, &incoming),
        ] {
            let from = current.get(direction);
            let to = next_watermark(records, from, is_final);
            if to != from {
                debug!(%direction, from, to, "advancing watermark");
            }
            next.set(direction, to);
        }

        let transactions = merge(outgoing, incoming);
        info!(count = transactions.len(), "fetched transactions");

        Ok((transactions, next))
    }

    async fn fetch_all_pages(
        &self,
        direction: Direction,
        after: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<TransactionRecord>, Error<S::Error>> {
        let mut records = Vec::new();
        let mut query = TransactionQuery::first_page(direction, after);

        loop {
            let page = self.fetch_page(&query, cancel).await?;
            let next = page.next_cursor().map(ToString::to_string);

            for value in page.data {
                match TransactionRecord::try_from(value) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!(%direction, "dropping malformed transaction: {e}"),
                }
            }

            match next {
                Some(cursor) => query = query.with_cursor(cursor),
                None => break,
            }
        }

        Ok(records)
    }

    async fn fetch_page(
        &self,
        query: &TransactionQuery,
        cancel: &CancellationToken,
    ) -> Result<TransactionPage, Error<S::Error>> {
        let fetch = self.inner.source.list_transactions(query);

        let result = match self.inner.config.cancellation {
            CancellationMode::Graceful => fetch.await,
            CancellationMode::Immediate => tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                result = fetch => result,
            },
        };

        result.map_err(|source| Error::Fetch {
            direction: query.direction,
            source,
        })
    }
}
