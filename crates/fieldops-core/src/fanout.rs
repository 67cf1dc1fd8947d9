//! Bounded fan-out for batches of independent requests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use serde::Serialize;

use crate::error::ApiError;

/// Default cap on requests in flight for one batch.
pub const DEFAULT_FANOUT_LIMIT: usize = 5;

/// Run `worker` over every item with at most `limit` calls in flight.
///
/// Workers pull the next index from a shared cursor, so a slow item never
/// blocks the others. Results come back in input order and one failure does
/// not cancel its siblings. A `limit` of zero is treated as one.
pub fn run_bounded<T, R, F>(items: &[T], limit: usize, worker: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }

    let runners = limit.max(1).min(items.len());
    let cursor = AtomicUsize::new(0);
    let slots: Vec<Mutex<Option<R>>> = items.iter().map(|_| Mutex::new(None)).collect();

    thread::scope(|scope| {
        for _ in 0..runners {
            scope.spawn(|| {
                loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(item) = items.get(index) else {
                        break;
                    };
                    let result = worker(item);
                    if let Ok(mut slot) = slots[index].lock() {
                        *slot = Some(result);
                    }
                }
            });
        }
    });

    slots
        .into_iter()
        .filter_map(|slot| slot.into_inner().ok().flatten())
        .collect()
}

/// Outcome of one item in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkOutcome {
    #[must_use]
    pub fn from_result<T>(id: &str, result: &Result<T, ApiError>) -> Self {
        match result {
            Ok(_) => Self {
                id: id.to_string(),
                ok: true,
                error: None,
            },
            Err(err) => Self {
                id: id.to_string(),
                ok: false,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Aggregate of a batch, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BulkReport {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BulkOutcome>,
}

impl BulkReport {
    #[must_use]
    pub fn new(results: Vec<BulkOutcome>) -> Self {
        let succeeded = results.iter().filter(|r| r.ok).count();
        Self {
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    #[must_use]
    pub const fn all_ok(&self) -> bool {
        self.failed == 0
    }
}
