//! `fo show`: ticket detail with comments, time entries, shipments, tasks.

use anyhow::Result;
use clap::Args;
use fieldops_core::client::TicketDetail;
use fieldops_core::workflow::action_for_ticket;
use serde_json::Value;
use std::io::{self, Write};

use crate::cmd::or_dash;
use crate::context::AppContext;
use crate::output::{pretty_kv, pretty_section, render_mode, truncate};
use crate::validate;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Ticket to show.
    pub id: String,
}

/// First non-empty string field among `keys`.
fn field<'a>(row: &'a Value, keys: &[&str]) -> &'a str {
    keys.iter()
        .find_map(|k| row.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
        .unwrap_or("-")
}

fn scalar(row: &Value, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => "-".to_string(),
    }
}

fn write_section(
    w: &mut dyn Write,
    heading: &str,
    rows: &[Value],
    line: impl Fn(&Value) -> String,
) -> io::Result<()> {
    writeln!(w)?;
    pretty_section(w, &format!("{heading} ({})", rows.len()))?;
    if rows.is_empty() {
        return writeln!(w, "  (none)");
    }
    for row in rows {
        writeln!(w, "  {}", line(row))?;
    }
    Ok(())
}

fn write_detail(d: &TicketDetail, w: &mut dyn Write) -> io::Result<()> {
    let t = &d.ticket;
    pretty_section(w, &format!("Ticket {}", t.ticket_id))?;
    pretty_kv(w, "site", or_dash(t.site_id.as_deref()))?;
    pretty_kv(w, "type", or_dash(t.ticket_type.as_deref()))?;
    pretty_kv(w, "status", or_dash(t.status.as_deref()))?;
    pretty_kv(w, "workflow", or_dash(t.workflow_state.as_deref()))?;
    pretty_kv(w, "priority", or_dash(t.priority.as_deref()))?;
    pretty_kv(w, "version", t.ticket_version.map_or_else(|| "-".to_string(), |v| v.to_string()))?;
    pretty_kv(w, "scheduled", or_dash(t.date_scheduled.as_deref()))?;
    pretty_kv(w, "INC", or_dash(t.inc_number.as_deref()))?;
    pretty_kv(w, "SO", or_dash(t.so_number.as_deref()))?;
    pretty_kv(w, "claimed by", or_dash(t.claimed_by.as_deref()))?;
    if let Some(action) = action_for_ticket(t) {
        pretty_kv(w, "next action", action.label)?;
    }
    if let Some(notes) = t.notes.as_deref().filter(|n| !n.is_empty()) {
        pretty_kv(w, "notes", truncate(notes, 200))?;
    }

    write_section(w, "Comments", &d.comments, |c| {
        format!(
            "{}  {}: {}",
            truncate(field(c, &["created_at"]), 16),
            field(c, &["user_name", "user_id"]),
            truncate(field(c, &["comment"]), 120)
        )
    })?;
    write_section(w, "Time entries", &d.time_entries, |e| {
        format!(
            "{} → {}  {} min",
            truncate(field(e, &["start_time"]), 16),
            truncate(field(e, &["end_time"]), 16),
            scalar(e, "duration_minutes")
        )
    })?;
    write_section(w, "Shipments", &d.shipments, |s| {
        format!(
            "{}  {}  {}",
            scalar(s, "shipment_id"),
            field(s, &["status"]),
            field(s, &["tracking_number", "what_is_being_shipped"])
        )
    })?;
    write_section(w, "Tasks", &d.tasks, |t| {
        format!(
            "{}  [{}] {}",
            scalar(t, "task_id"),
            field(t, &["status"]),
            truncate(field(t, &["description", "title"]), 100)
        )
    })
}

fn write_detail_text(d: &TicketDetail, w: &mut dyn Write) -> io::Result<()> {
    let t = &d.ticket;
    writeln!(
        w,
        "{}  {}  {}  {}  v{}",
        t.ticket_id,
        or_dash(t.site_id.as_deref()),
        or_dash(t.status.as_deref()),
        or_dash(t.workflow_state.as_deref()),
        t.expected_version()
    )?;
    writeln!(
        w,
        "comments={} time_entries={} shipments={} tasks={}",
        d.comments.len(),
        d.time_entries.len(),
        d.shipments.len(),
        d.tasks.len()
    )
}

pub fn run_show(args: &ShowArgs, ctx: &AppContext) -> Result<()> {
    validate::validate_ticket_id(&args.id)?;
    let client = ctx.client()?;
    let detail = client.ticket_detail(&args.id)?;
    render_mode(ctx.output, &detail, write_detail_text, write_detail)
}
