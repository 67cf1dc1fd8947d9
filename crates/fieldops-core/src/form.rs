//! Write-payload shaping for create/update forms.

use serde_json::{Map, Value};

use crate::error::{ApiError, ErrorCode};

/// Outgoing JSON object for create/update calls.
pub type FormData = Map<String, Value>;

/// Keys whose empty values must reach the backend as explicit `null`.
///
/// Everything else with an empty value is dropped from the payload.
pub const NULLABLE_FIELDS: &[&str] = &[
    "item_id",
    "ticket_id",
    "assigned_user_id",
    "charges_out",
    "charges_in",
    "parts_cost",
    "total_cost",
    "date_shipped",
    "date_returned",
    "date_created",
    "date_scheduled",
    "date_closed",
    "due_date",
    "time_spent",
    "sla_target_hours",
    "sla_breach_hours",
    "escalation_level",
    "estimated_hours",
    "actual_hours",
    "billing_rate",
    "quality_score",
    "follow_up_date",
    "nro_phase1_scheduled_date",
    "nro_phase2_scheduled_date",
];

/// Relations and server-owned fields the ticket write schema rejects.
pub const TICKET_READ_ONLY_FIELDS: &[&str] = &[
    "ticket_id",
    "created_at",
    "site",
    "assigned_user",
    "claimed_user",
    "onsite_tech",
    "last_updated_user",
    "approved_user",
    "audits",
    "tasks",
    "shipments",
    "inventory_transactions",
    "comments",
    "time_entries",
    "attachments",
];

const EDIT_DATE_FIELDS: &[&str] = &["date_created", "date_scheduled", "date_closed"];

const EDIT_TIME_FIELDS: &[&str] = &[
    "check_in_time",
    "check_out_time",
    "claimed_at",
    "approved_at",
    "start_time",
    "end_time",
];

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Normalize empty values: nullable keys become `null`, other empty keys are
/// removed. Non-empty values pass through untouched.
#[must_use]
pub fn clean_form_data(data: &FormData) -> FormData {
    data.iter()
        .filter_map(|(key, value)| {
            if !is_empty(value) {
                Some((key.clone(), value.clone()))
            } else if NULLABLE_FIELDS.contains(&key.as_str()) {
                Some((key.clone(), Value::Null))
            } else {
                None
            }
        })
        .collect()
}

/// Drop relation and server-owned keys before a ticket write.
#[must_use]
pub fn strip_ticket_read_only_fields(data: &FormData) -> FormData {
    data.iter()
        .filter(|(key, _)| !TICKET_READ_ONLY_FIELDS.contains(&key.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Reshape a fetched ticket so its fields round-trip through an edit.
///
/// Timestamps on date-only fields are cut to `YYYY-MM-DD`, `due_date` keeps
/// minute precision, and missing date and time fields become empty strings
/// (which [`clean_form_data`] later writes as explicit nulls).
#[must_use]
pub fn normalize_ticket_for_edit(raw: &FormData) -> FormData {
    let mut out = raw.clone();

    for key in EDIT_DATE_FIELDS {
        if let Some(Value::String(s)) = out.get_mut(*key) {
            *s = truncate_chars(s, 10);
        }
    }

    if let Some(Value::String(s)) = out.get_mut("due_date") {
        if s.chars().count() > 10 {
            *s = truncate_chars(s, 16);
        }
    }

    let blank_when_absent = EDIT_DATE_FIELDS
        .iter()
        .chain(&["due_date"])
        .chain(EDIT_TIME_FIELDS);
    for key in blank_when_absent {
        if matches!(out.get(*key), None | Some(Value::Null)) {
            out.insert((*key).to_string(), Value::String(String::new()));
        }
    }

    out
}

/// Parse a `key=value` assignment from the command line.
///
/// The value is decoded as JSON when it parses (`5`, `true`, `null`,
/// `"quoted"`), otherwise it is taken as a plain string. An empty right-hand
/// side yields an empty string so `clean_form_data` can null or drop it.
///
/// # Errors
///
/// Returns [`ApiError::InvalidInput`] when there is no `=` or the key is empty.
pub fn parse_assignment(input: &str) -> Result<(String, Value), ApiError> {
    let Some((key, raw)) = input.split_once('=') else {
        return Err(ApiError::invalid_input(
            ErrorCode::InvalidInput,
            format!("expected key=value, got '{input}'"),
        ));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(ApiError::invalid_input(
            ErrorCode::InvalidInput,
            format!("missing field name in '{input}'"),
        ));
    }

    let value = if raw.is_empty() {
        Value::String(String::new())
    } else {
        serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };
    Ok((key.to_string(), value))
}

/// Apply a list of `key=value` assignments onto `form`, later ones winning.
///
/// # Errors
///
/// Propagates the first malformed assignment.
pub fn apply_assignments<S: AsRef<str>>(form: &mut FormData, pairs: &[S]) -> Result<(), ApiError> {
    for pair in pairs {
        let (key, value) = parse_assignment(pair.as_ref())?;
        form.insert(key, value);
    }
    Ok(())
}
