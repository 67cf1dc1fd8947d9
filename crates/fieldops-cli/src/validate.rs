use crate::output::CliError;
use chrono::NaiveDate;
use fieldops_core::error::ErrorCode;
use fieldops_core::form::{self, FormData};
use std::fmt;

pub const MAX_TICKET_ID_LEN: usize = 64;
pub const MAX_COMMENT_LEN: usize = 8_192;
pub const SCHEDULE_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
    pub suggestion: String,
    pub code: ErrorCode,
}

impl ValidationError {
    pub fn new(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            field,
            value: value.into(),
            reason: reason.into(),
            suggestion: suggestion.into(),
            code: ErrorCode::InvalidInput,
        }
    }

    pub fn to_cli_error(&self) -> CliError {
        CliError::with_details(self.to_string(), self.suggestion.clone(), self.code.code())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} '{}': {}", self.field, self.value, self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// Ticket ids end up as URL path segments, so only a conservative
/// character set is accepted.
pub fn validate_ticket_id(s: &str) -> Result<(), ValidationError> {
    if s.trim().is_empty() {
        return Err(ValidationError::new(
            "ticket_id",
            s,
            "must not be empty",
            "pass a ticket id such as T-1042",
        ));
    }
    if s.chars().count() > MAX_TICKET_ID_LEN {
        return Err(ValidationError::new(
            "ticket_id",
            s,
            format!("must be <= {MAX_TICKET_ID_LEN} characters"),
            "check that the whole id was pasted, not a URL",
        ));
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ValidationError::new(
            "ticket_id",
            s,
            "may only contain letters, digits, '-', '_' and '.'",
            "remove spaces, slashes and other punctuation",
        ));
    }
    Ok(())
}

pub fn validate_ticket_ids(ids: &[String]) -> Result<(), ValidationError> {
    ids.iter().try_for_each(|id| validate_ticket_id(id))
}

/// Accept `YYYY-MM-DD` only and return it normalized.
pub fn validate_schedule_date(s: &str) -> Result<String, ValidationError> {
    let trimmed = s.trim();
    NaiveDate::parse_from_str(trimmed, SCHEDULE_DATE_FORMAT)
        .map(|date| date.format(SCHEDULE_DATE_FORMAT).to_string())
        .map_err(|err| {
            ValidationError::new(
                "date",
                s,
                format!("not a calendar date ({err})"),
                "use --date YYYY-MM-DD, e.g. --date 2026-03-14",
            )
        })
}

pub fn validate_comment(s: &str) -> Result<(), ValidationError> {
    if s.trim().is_empty() {
        return Err(ValidationError::new(
            "comment",
            s,
            "must not be empty",
            "write some text after the ticket id",
        ));
    }
    if s.chars().count() > MAX_COMMENT_LEN {
        return Err(ValidationError::new(
            "comment",
            "…",
            format!("must be <= {MAX_COMMENT_LEN} characters"),
            "split the note into several comments",
        ));
    }
    Ok(())
}

/// Parse repeated `--set key=value` flags into a form object.
pub fn parse_assignments(pairs: &[String]) -> Result<FormData, ValidationError> {
    let mut data = FormData::new();
    form::apply_assignments(&mut data, pairs).map_err(|err| {
        ValidationError::new(
            "--set",
            pairs.join(" "),
            err.to_string(),
            "use --set key=value; values are parsed as JSON when possible",
        )
    })?;
    Ok(data)
}
