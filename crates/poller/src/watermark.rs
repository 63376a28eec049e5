use txsync_source::Direction;
use txsync_transactions::{TransactionRecord, TransactionStatus};

/// Per-direction lower bounds on `createdAt` for the next fetch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Watermarks {
    /// Watermark of the outgoing listing.
    pub outgoing: u64,

    /// Watermark of the incoming listing.
    pub incoming: u64,
}

impl Watermarks {
    /// The watermark of `direction`.
    #[must_use]
    pub const fn get(&self, direction: Direction) -> u64 {
        match direction {
            Direction::Outgoing => self.outgoing,
            Direction::Incoming => self.incoming,
        }
    }

    pub(crate) fn set(&mut self, direction: Direction, value: u64) {
        match direction {
            Direction::Outgoing => self.outgoing = value,
            Direction::Incoming => self.incoming = value,
        }
    }
}

/// Computes the watermark that follows `current` after fetching `records`.
///
/// While anything is still in flight the watermark parks on the oldest
/// non-final transaction, so it is fetched again next cycle. Once everything
/// fetched is final the watermark moves past the newest one and settled
/// history drops out of the window for good. An empty fetch changes nothing.
///
/// The result never goes below `current`.
#[must_use]
pub fn next_watermark(
    records: &[TransactionRecord],
    current: u64,
    is_final: fn(&TransactionStatus) -> bool,
) -> u64 {
    let oldest_pending = records
        .iter()
        .filter(|record| !is_final(&record.status))
        .map(|record| record.created_at)
        .min();

    let next = match oldest_pending {
        Some(created_at) => created_at,
        None => records
            .iter()
            .map(|record| record.created_at)
            .max()
            .map_or(current, |newest| newest.saturating_add(1)),
    };

    next.max(current)
}
