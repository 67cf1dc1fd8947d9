//! `fo queue`: the dispatcher worklist with each row's recommended action.

use anyhow::Result;
use clap::Args;
use fieldops_core::filter::filter_tickets;
use fieldops_core::model::Ticket;
use fieldops_core::workflow::{Queue, action_for_ticket};
use serde::Serialize;
use std::io::{self, Write};

use crate::cmd::or_dash;
use crate::context::AppContext;
use crate::output::{OutputMode, Renderable, pretty_rule, render_mode, truncate, write_list};

#[derive(Args, Debug)]
pub struct QueueArgs {
    /// Worklist: all, approval, needstech, goback, returns.
    #[arg(long, short)]
    pub queue: Option<Queue>,

    /// Only show rows whose id, site, INC, SO or state contains this text.
    #[arg(long, short)]
    pub search: Option<String>,

    /// Maximum rows to fetch (default from config, 300).
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueRow {
    pub ticket_id: String,
    pub site_id: Option<String>,
    pub inc_number: Option<String>,
    pub workflow_state: Option<String>,
    pub date_scheduled: Option<String>,
    pub action: Option<&'static str>,
}

impl QueueRow {
    fn from_ticket(ticket: &Ticket) -> Self {
        Self {
            ticket_id: ticket.ticket_id.clone(),
            site_id: ticket.site_id.clone(),
            inc_number: ticket.inc_number.clone(),
            workflow_state: ticket.workflow_state.clone(),
            date_scheduled: ticket.date_scheduled.clone(),
            action: action_for_ticket(ticket).map(|a| a.label),
        }
    }
}

impl Renderable for QueueRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{:<14} {:<12} {:<36} {}",
            truncate(&self.ticket_id, 14),
            truncate(or_dash(self.site_id.as_deref()), 12),
            truncate(or_dash(self.workflow_state.as_deref()), 36),
            self.action.unwrap_or("-"),
        )
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, self)?;
        Ok(())
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}  {}  {}  {}",
            self.ticket_id,
            or_dash(self.site_id.as_deref()),
            or_dash(self.workflow_state.as_deref()),
            self.action.unwrap_or("-"),
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["TICKET", "SITE", "STATE", "ACTION"]
    }
}

#[derive(Debug, Serialize)]
pub struct QueueOutput {
    pub queue: Queue,
    pub label: &'static str,
    /// Rows returned by the server before the local text filter.
    pub fetched: usize,
    pub tickets: Vec<QueueRow>,
}

/// Build the worklist view. The search text only narrows what was fetched.
pub fn build_queue_output(queue: Queue, tickets: &[Ticket], search: Option<&str>) -> QueueOutput {
    let rows = filter_tickets(tickets, search.unwrap_or(""))
        .into_iter()
        .map(QueueRow::from_ticket)
        .collect();
    QueueOutput {
        queue,
        label: queue.label(),
        fetched: tickets.len(),
        tickets: rows,
    }
}

pub fn run_queue(args: &QueueArgs, ctx: &AppContext) -> Result<()> {
    let queue = args.queue.unwrap_or(ctx.config.dispatch.default_queue);
    let limit = args.limit.unwrap_or(ctx.config.dispatch.queue_limit);

    let client = ctx.client()?;
    let tickets = client.dispatch_queue(queue, limit, 0)?;
    let out = build_queue_output(queue, &tickets, args.search.as_deref());

    render_mode(
        ctx.output,
        &out,
        |o, w| write_list(w, &o.tickets, OutputMode::Text),
        |o, w| {
            writeln!(w, "{} ({} of {})", o.label, o.tickets.len(), o.fetched)?;
            pretty_rule(w)?;
            if o.tickets.is_empty() {
                return writeln!(w, "Nothing to dispatch.");
            }
            writeln!(w, "{:<14} {:<12} {:<36} ACTION", "TICKET", "SITE", "STATE")?;
            write_list(w, &o.tickets, OutputMode::Pretty)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tickets() -> Vec<Ticket> {
        serde_json::from_value(json!([
            {"ticket_id": "T-1", "site_id": "S-100", "workflow_state": "pending_approval"},
            {"ticket_id": "T-2", "site_id": "S-200", "inc_number": "INC777", "workflow_state": "needstech"},
            {"ticket_id": "T-3", "site_id": "S-300", "workflow_state": "onsite"}
        ]))
        .expect("tickets")
    }

    #[test]
    fn rows_carry_recommended_action() {
        let out = build_queue_output(Queue::All, &tickets(), None);
        let actions: Vec<_> = out.tickets.iter().map(|r| r.action).collect();
        assert_eq!(actions, vec![Some("Approve"), Some("Convert/Schedule"), None]);
        assert_eq!(out.label, "All");
        assert_eq!(out.fetched, 3);
    }

    #[test]
    fn search_narrows_rows_but_not_fetched_count() {
        let out = build_queue_output(Queue::Needstech, &tickets(), Some("inc777"));
        assert_eq!(out.tickets.len(), 1);
        assert_eq!(out.tickets[0].ticket_id, "T-2");
        assert_eq!(out.fetched, 3);
    }

    #[test]
    fn text_row_uses_dashes_for_missing_fields() {
        let ticket: Ticket = serde_json::from_value(json!({"ticket_id": "T-9"})).expect("ticket");
        let mut buf = Vec::new();
        QueueRow::from_ticket(&ticket).render_table(&mut buf).expect("write");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "T-9  -  -  -\n");
    }
}
