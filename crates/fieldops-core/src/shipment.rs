//! Shipment update planning.
//!
//! Moving a shipment to `shipped` must go through the status endpoint so the
//! backend can decrement inventory; every other edit is a plain `PUT`.

use serde_json::{Map, Value};

use crate::form::FormData;

pub const SHIPPED: &str = "shipped";

/// Fields owned by the status endpoint when a shipment ships.
const STATUS_FIELDS: &[&str] = &["status", "tracking_number", "return_tracking"];

#[derive(Debug, Clone, PartialEq)]
pub enum ShipmentUpdatePlan {
    /// `PUT /shipments/{id}` with the whole cleaned form.
    Put(FormData),
    /// `PATCH /shipments/{id}/status`, then `PUT` the leftovers if any.
    Ship {
        status: FormData,
        remaining: Option<FormData>,
    },
}

/// Decide how to persist a cleaned shipment form given the stored status.
#[must_use]
pub fn plan_update(current_status: Option<&str>, cleaned: FormData) -> ShipmentUpdatePlan {
    let becomes_shipped = cleaned.get("status").and_then(Value::as_str) == Some(SHIPPED);
    if !becomes_shipped || current_status == Some(SHIPPED) {
        return ShipmentUpdatePlan::Put(cleaned);
    }

    let mut status = Map::new();
    status.insert("status".into(), Value::from(SHIPPED));
    for key in ["tracking_number", "return_tracking", "remove_from_inventory"] {
        status.insert(key.into(), cleaned.get(key).cloned().unwrap_or(Value::Null));
    }

    let remaining: FormData = cleaned
        .into_iter()
        .filter(|(key, _)| !STATUS_FIELDS.contains(&key.as_str()))
        .collect();

    ShipmentUpdatePlan::Ship {
        status,
        remaining: (!remaining.is_empty()).then_some(remaining),
    }
}

/// Body for a bare status change (`fo shipment-status`).
#[must_use]
pub fn status_body(status: &str) -> FormData {
    let mut body = Map::new();
    body.insert("status".into(), Value::from(status));
    body
}
