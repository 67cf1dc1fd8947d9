//! `fo resource <kind> …`: plain CRUD over the non-ticket record families.

use anyhow::Result;
use clap::{Args, Subcommand};
use fieldops_core::model::Resource;
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::cmd::{confirm, load_form};
use crate::context::{AppContext, Client};
use crate::output::{pretty_rule, render, render_mode, truncate};

#[derive(Args, Debug)]
pub struct ResourceArgs {
    /// Record family: sites, shipments, inventory, fieldtechs,
    /// fieldtech-companies, tasks, users.
    pub kind: Resource,

    #[command(subcommand)]
    pub command: ResourceCommand,
}

#[derive(Subcommand, Debug)]
pub enum ResourceCommand {
    #[command(
        about = "List records",
        after_help = "EXAMPLES:\n    # Shipments for one ticket\n    fo resource shipments list --where ticket_id=T-1042\n\n    # Second page of sites\n    fo resource sites list --limit 50 --skip 50"
    )]
    List(ListArgs),

    #[command(about = "Show one record")]
    Get(IdArgs),

    #[command(
        about = "Create a record",
        after_help = "EXAMPLES:\n    fo resource sites create --set site_id=S-9001 --set city=Dayton\n    fo resource inventory create --file part.json"
    )]
    Create(WriteArgs),

    #[command(
        about = "Update a record",
        long_about = "Update a record. For shipments, a move to `shipped` goes through the status endpoint first so inventory is adjusted server-side."
    )]
    Update(UpdateArgs),

    #[command(about = "Delete a record")]
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Server-side filter, repeatable (`key=value`).
    #[arg(long = "where", short = 'w', value_name = "KEY=VALUE")]
    pub filters: Vec<String>,

    #[arg(long, default_value_t = 100)]
    pub limit: u32,

    #[arg(long, default_value_t = 0)]
    pub skip: u32,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// JSON object with the record fields.
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Field assignment, repeatable; applied over `--file`.
    #[arg(long = "set", short = 's', value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub id: String,

    #[command(flatten)]
    pub fields: WriteArgs,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    pub id: String,

    /// Do not ask for confirmation.
    #[arg(long, short)]
    pub yes: bool,
}

#[derive(Debug, Serialize)]
struct RecordList {
    resource: Resource,
    count: usize,
    records: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct DeleteOutput {
    ok: bool,
    resource: Resource,
    id: String,
}

/// Split `key=value` filters into query pairs.
fn query_pairs(filters: &[String]) -> Result<Vec<(String, String)>> {
    filters
        .iter()
        .map(|f| match f.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
            _ => anyhow::bail!("expected --where key=value, got '{f}'"),
        })
        .collect()
}

/// Id plus a few descriptive fields, for one-line display.
fn record_line(resource: Resource, record: &Value) -> String {
    let id_field = resource.id_field();
    let id = match record.get(id_field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "-".to_string(),
    };
    let rest: Vec<String> = record
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(k, _)| k.as_str() != id_field)
        .filter_map(|(k, v)| match v {
            Value::String(s) if !s.is_empty() => Some(format!("{k}={}", truncate(s, 24))),
            Value::Number(n) => Some(format!("{k}={n}")),
            _ => None,
        })
        .take(4)
        .collect();
    format!("{id:<12} {}", rest.join("  "))
}

fn write_record(record: &Value, w: &mut dyn Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *w, record)?;
    writeln!(w)
}

fn run_list(client: &Client, kind: Resource, args: &ListArgs, ctx: &AppContext) -> Result<()> {
    let mut query = query_pairs(&args.filters)?;
    query.push(("limit".to_string(), args.limit.to_string()));
    query.push(("skip".to_string(), args.skip.to_string()));

    let records = client.list_resource(kind, query)?;
    let out = RecordList {
        resource: kind,
        count: records.len(),
        records,
    };
    render_mode(
        ctx.output,
        &out,
        |o, w| {
            for r in &o.records {
                serde_json::to_writer(&mut *w, r)?;
                writeln!(w)?;
            }
            Ok(())
        },
        |o, w| {
            writeln!(w, "{} ({})", o.resource, o.count)?;
            pretty_rule(w)?;
            for r in &o.records {
                writeln!(w, "{}", record_line(o.resource, r))?;
            }
            Ok(())
        },
    )
}

pub fn run_resource(args: &ResourceArgs, ctx: &AppContext) -> Result<()> {
    let kind = args.kind;
    let client = ctx.client()?;

    match &args.command {
        ResourceCommand::List(list) => run_list(&client, kind, list, ctx),
        ResourceCommand::Get(get) => {
            let record = client.get_resource(kind, &get.id)?;
            render(ctx.output, &record, |r, w| write_record(r, w))
        }
        ResourceCommand::Create(write) => {
            let data = load_form(write.file.as_deref(), &write.set)?;
            let record = client.create_resource(kind, &data)?;
            render(ctx.output, &record, |r, w| {
                writeln!(w, "Created {}", record_line(kind, r))
            })
        }
        ResourceCommand::Update(update) => {
            let data = load_form(update.fields.file.as_deref(), &update.fields.set)?;
            if data.is_empty() {
                anyhow::bail!("nothing to update: pass --set key=value or --file");
            }
            let record = if kind == Resource::Shipments {
                client.update_shipment(&update.id, &data)?
            } else {
                client.update_resource(kind, &update.id, &data)?
            };
            render(ctx.output, &record, |r, w| {
                writeln!(w, "Updated {}", record_line(kind, r))
            })
        }
        ResourceCommand::Delete(delete) => {
            confirm(delete.yes, &format!("Delete {kind} {}?", delete.id))?;
            client.delete_resource(kind, &delete.id)?;
            let out = DeleteOutput {
                ok: true,
                resource: kind,
                id: delete.id.clone(),
            };
            render(ctx.output, &out, |o, w| writeln!(w, "Deleted {} {}", o.resource, o.id))
        }
    }
}
