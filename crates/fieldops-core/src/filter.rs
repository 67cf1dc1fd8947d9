//! Ticket list filtering.
//!
//! `TicketListFilter` maps onto the server-side query string. The free-text
//! matcher below is purely local and never issues a request.

use crate::model::Ticket;

/// Case-insensitive substring match over the identifying fields of a ticket.
///
/// An empty (or all-whitespace) needle matches everything.
#[must_use]
pub fn matches_search(ticket: &Ticket, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    [
        Some(ticket.ticket_id.as_str()),
        ticket.site_id.as_deref(),
        ticket.inc_number.as_deref(),
        ticket.so_number.as_deref(),
        ticket.workflow_state.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}

#[must_use]
pub fn filter_tickets<'a>(tickets: &'a [Ticket], needle: &str) -> Vec<&'a Ticket> {
    tickets.iter().filter(|t| matches_search(t, needle)).collect()
}

/// Status value that means "everything except archived".
pub const ACTIVE_STATUS: &str = "active";

/// Status value that disables status filtering.
pub const ANY_STATUS: &str = "all";

/// Server-side list filters for `GET /tickets/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketListFilter {
    pub ticket_type: Option<String>,
    pub status: Option<String>,
    pub workflow_state: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
}

impl TicketListFilter {
    /// `status=active` is a client-side pseudo-filter, never sent.
    #[must_use]
    pub fn is_active_view(&self) -> bool {
        self.status.as_deref() == Some(ACTIVE_STATUS)
    }

    /// Query pairs shared by the list and count endpoints.
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        let status = self
            .status
            .as_deref()
            .filter(|s| *s != ACTIVE_STATUS && *s != ANY_STATUS);
        let type_filter = self.ticket_type.as_deref().filter(|t| *t != ANY_STATUS);

        [
            ("ticket_type", type_filter),
            ("status", status),
            ("workflow_state", self.workflow_state.as_deref()),
            ("priority", self.priority.as_deref()),
            ("search", self.search.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .filter(|v| !v.trim().is_empty())
                .map(|v| (key.to_string(), v.to_string()))
        })
        .collect()
    }

    /// Same filter with the status forced to `archived`; used to subtract
    /// archived tickets from the total in the active view.
    #[must_use]
    pub fn archived_only(&self) -> Self {
        Self {
            status: Some("archived".to_string()),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ticket(id: &str, site: &str, inc: Option<&str>, state: &str) -> Ticket {
        serde_json::from_value(json!({
            "ticket_id": id,
            "site_id": site,
            "inc_number": inc,
            "workflow_state": state,
        }))
        .expect("fixture")
    }

    #[test]
    fn search_is_case_insensitive_over_identifying_fields() {
        let rows = vec![
            ticket("T-100", "S-AAA", Some("INC0042"), "needstech"),
            ticket("T-200", "S-BBB", None, "pending_approval"),
        ];
        let ids = |needle: &str| {
            filter_tickets(&rows, needle)
                .into_iter()
                .map(|t| t.ticket_id.clone())
                .collect::<Vec<_>>()
        };

        assert_eq!(ids("inc0042"), vec!["T-100"]);
        assert_eq!(ids("s-bbb"), vec!["T-200"]);
        assert_eq!(ids("APPROVAL"), vec!["T-200"]);
        assert_eq!(ids("  "), vec!["T-100", "T-200"]);
        assert!(ids("zzz").is_empty());
    }

    #[test]
    fn active_and_all_are_not_sent_as_status() {
        let active = TicketListFilter {
            status: Some("active".into()),
            priority: Some("critical".into()),
            ..TicketListFilter::default()
        };
        assert!(active.is_active_view());
        assert_eq!(
            active.to_query(),
            vec![("priority".to_string(), "critical".to_string())]
        );

        let all = TicketListFilter {
            status: Some("all".into()),
            ticket_type: Some("all".into()),
            ..TicketListFilter::default()
        };
        assert!(all.to_query().is_empty());
    }

    #[test]
    fn archived_only_overrides_status() {
        let active = TicketListFilter {
            status: Some("active".into()),
            search: Some("acme".into()),
            ..TicketListFilter::default()
        };
        let query = active.archived_only().to_query();
        assert!(query.contains(&("status".to_string(), "archived".to_string())));
        assert!(query.contains(&("search".to_string(), "acme".to_string())));
    }
}
