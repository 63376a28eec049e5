use std::collections::HashMap;

use txsync_transactions::TransactionRecord;

/// Merges both directions into one list without duplicate ids, newest
/// `lastUpdated` first.
///
/// Incoming records are applied after outgoing ones, so a transfer seen from
/// both sides resolves to its incoming representation.
#[must_use]
pub fn merge(
    outgoing: Vec<TransactionRecord>,
    incoming: Vec<TransactionRecord>,
) -> Vec<TransactionRecord> {
    let mut by_id = HashMap::with_capacity(outgoing.len() + incoming.len());
    for record in outgoing.into_iter().chain(incoming) {
        by_id.insert(record.id.clone(), record);
    }

    let mut merged: Vec<TransactionRecord> = by_id.into_values().collect();
    merged.sort_by(|a, b| {
        b.last_updated
            .cmp(&a.last_updated)
            .then_with(|| a.id.cmp(&b.id))
    });
    merged
}
