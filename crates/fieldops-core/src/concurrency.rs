//! Optimistic concurrency for ticket writes.
//!
//! Every ticket write carries `expected_ticket_version`. The backend rejects
//! the write with 409 when the stored version moved on; the client never
//! merges or retries.

use serde_json::Value;

use crate::error::{ApiError, CONFLICT_MESSAGE};
use crate::form::FormData;
use crate::model::Ticket;

pub const EXPECTED_VERSION_FIELD: &str = "expected_ticket_version";

/// Version a write should claim to be based on. Missing or non-positive
/// versions fall back to `1`.
#[must_use]
pub fn expected_version(version: Option<i64>) -> i64 {
    version.filter(|v| *v >= 1).unwrap_or(1)
}

/// Version observed when a ticket was loaded for editing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionGuard {
    captured: Option<i64>,
}

impl VersionGuard {
    #[must_use]
    pub const fn capture(ticket: &Ticket) -> Self {
        Self {
            captured: ticket.ticket_version,
        }
    }

    #[must_use]
    pub const fn from_version(version: Option<i64>) -> Self {
        Self { captured: version }
    }

    #[must_use]
    pub const fn captured(&self) -> Option<i64> {
        self.captured
    }

    /// Write `expected_ticket_version` into an outgoing payload.
    ///
    /// Precedence: captured version, then the form's own `ticket_version`,
    /// then `1`.
    pub fn stamp(&self, form: &mut FormData) -> i64 {
        let from_form = form.get("ticket_version").and_then(Value::as_i64);
        let version = expected_version(self.captured.or(from_form));
        form.insert(EXPECTED_VERSION_FIELD.to_string(), Value::from(version));
        version
    }
}

/// Rewrite a version conflict so its display text is the fixed update
/// message. Other errors pass through untouched.
#[must_use]
pub fn conflict_for_update(err: ApiError) -> ApiError {
    match err {
        ApiError::Conflict {
            current_version,
            expected_version,
            ..
        } => ApiError::Conflict {
            message: CONFLICT_MESSAGE.to_string(),
            current_version,
            expected_version,
        },
        other => other,
    }
}
