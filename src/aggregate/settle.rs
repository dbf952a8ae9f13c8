//! Settle-all join.
//!
//! Unlike `try_join_all`, nothing short-circuits: every future runs to
//! completion and its own `Result` is kept.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;

/// Drive every keyed future to completion.
///
/// `on_settle` runs once per future in completion order. The returned
/// vector follows input order.
pub async fn settle_all<K, T, E, Fut, F>(tasks: Vec<(K, Fut)>, mut on_settle: F) -> Vec<(K, Result<T, E>)>
where
    Fut: Future<Output = Result<T, E>>,
    F: FnMut(&K, &Result<T, E>),
{
    let total = tasks.len();
    let mut keys = Vec::with_capacity(total);
    let mut pending = FuturesUnordered::new();

    for (idx, (key, fut)) in tasks.into_iter().enumerate() {
        keys.push(key);
        pending.push(async move { (idx, fut.await) });
    }

    let mut slots: Vec<Option<Result<T, E>>> = (0..total).map(|_| None).collect();

    while let Some((idx, outcome)) = pending.next().await {
        on_settle(&keys[idx], &outcome);
        slots[idx] = Some(outcome);
    }

    keys.into_iter()
        .zip(slots)
        .filter_map(|(key, slot)| slot.map(|outcome| (key, outcome)))
        .collect()
}
