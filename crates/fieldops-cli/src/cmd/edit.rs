//! `fo edit` and `fo create`: ticket writes from `--set key=value` pairs.
//!
//! Edits go through the optimistic version guard: the version seen when the
//! ticket was loaded travels with the write, and a 409 is reported as a
//! conflict without retrying.

use anyhow::Result;
use clap::Args;
use fieldops_core::concurrency::EXPECTED_VERSION_FIELD;
use fieldops_core::form::FormData;
use fieldops_core::model::Ticket;
use serde::Serialize;
use serde_json::Value;

use crate::cmd::or_dash;
use crate::context::AppContext;
use crate::output::{pretty_kv, render};
use crate::validate;

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Ticket to edit.
    pub id: String,

    /// Field assignment, repeatable. Values are JSON when they parse
    /// (`5`, `true`, `null`), text otherwise. `key=` clears a field.
    #[arg(long = "set", short = 's', value_name = "KEY=VALUE", required = true)]
    pub set: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Site the ticket belongs to.
    #[arg(long)]
    pub site: String,

    /// Ticket type.
    #[arg(long = "type", short = 't', default_value = "inhouse")]
    pub ticket_type: String,

    /// Priority.
    #[arg(long, short, default_value = "normal")]
    pub priority: String,

    /// Extra field assignment, repeatable.
    #[arg(long = "set", short = 's', value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

#[derive(Debug, Serialize)]
struct WriteOutput {
    ok: bool,
    ticket_id: String,
    ticket_version: Option<i64>,
    workflow_state: Option<String>,
    changed: Vec<String>,
}

impl WriteOutput {
    fn new(ticket: &Ticket, changed: &FormData) -> Self {
        Self {
            ok: true,
            ticket_id: ticket.ticket_id.clone(),
            ticket_version: ticket.ticket_version,
            workflow_state: ticket.workflow_state.clone(),
            changed: changed.keys().cloned().collect(),
        }
    }
}

/// Reject edits that try to set the guard field by hand.
fn check_changes(changes: &FormData) -> Result<(), validate::ValidationError> {
    if changes.contains_key(EXPECTED_VERSION_FIELD) {
        return Err(validate::ValidationError::new(
            "--set",
            EXPECTED_VERSION_FIELD,
            "is managed by the client",
            "drop it; the version read when the ticket is loaded is sent automatically",
        ));
    }
    Ok(())
}

fn create_payload(args: &CreateArgs) -> Result<FormData> {
    let mut data = FormData::new();
    data.insert("site_id".into(), Value::from(args.site.trim()));
    data.insert("type".into(), Value::from(args.ticket_type.trim()));
    data.insert("priority".into(), Value::from(args.priority.trim()));
    for (key, value) in validate::parse_assignments(&args.set)? {
        data.insert(key, value);
    }
    Ok(data)
}

pub fn run_edit(args: &EditArgs, ctx: &AppContext) -> Result<()> {
    validate::validate_ticket_id(&args.id)?;
    let changes = validate::parse_assignments(&args.set)?;
    check_changes(&changes)?;

    let client = ctx.client()?;
    let ticket = client.edit_ticket(&args.id, &changes)?;

    let out = WriteOutput::new(&ticket, &changes);
    render(ctx.output, &out, |o, w| {
        writeln!(w, "Updated {}", o.ticket_id)?;
        pretty_kv(w, "fields", o.changed.join(", "))?;
        pretty_kv(
            w,
            "version",
            o.ticket_version.map_or_else(|| "-".to_string(), |v| v.to_string()),
        )
    })
}

pub fn run_create(args: &CreateArgs, ctx: &AppContext) -> Result<()> {
    if args.site.trim().is_empty() {
        anyhow::bail!("--site must not be empty");
    }
    let data = create_payload(args)?;

    let client = ctx.client()?;
    let ticket = client.create_ticket(&data)?;

    let out = WriteOutput::new(&ticket, &data);
    render(ctx.output, &out, |o, w| {
        writeln!(w, "Created {}", o.ticket_id)?;
        pretty_kv(w, "state", or_dash(o.workflow_state.as_deref()))
    })
}
