//! `fo company …`: field-tech company roster and lookups.

use anyhow::Result;
use clap::{Args, Subcommand};
use fieldops_core::client::CompanySaveReport;
use serde_json::Value;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::cmd::load_form;
use crate::context::AppContext;
use crate::output::{pretty_kv, render};

#[derive(Args, Debug)]
pub struct CompanyArgs {
    #[command(subcommand)]
    pub command: CompanyCommand,
}

#[derive(Subcommand, Debug)]
pub enum CompanyCommand {
    #[command(
        about = "Create or update a company and reconcile its technicians",
        long_about = "Create or update a company from a JSON file. With a company_id the company is updated and technicians missing from `techs` are deleted; the rest are created or updated.",
        after_help = "EXAMPLES:\n    # Save the roster edited in acme.json\n    fo company save acme.json\n\n    # Override one field without editing the file\n    fo company save acme.json --set region=Midwest"
    )]
    Save(SaveArgs),

    #[command(about = "List states with companies")]
    States,

    #[command(about = "List known regions")]
    Regions,

    #[command(about = "Look up a ZIP code")]
    Zip { zip: String },

    #[command(about = "Import companies and technicians from a CSV file")]
    Import { csv: PathBuf },
}

#[derive(Args, Debug)]
pub struct SaveArgs {
    /// JSON object: company fields plus a `techs` array.
    pub file: PathBuf,

    /// Field assignment applied over the file, repeatable.
    #[arg(long = "set", short = 's', value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

fn write_save_report(r: &CompanySaveReport, w: &mut dyn Write) -> io::Result<()> {
    let id = r
        .company
        .get("company_id")
        .map_or_else(|| "-".to_string(), |v| v.to_string().trim_matches('"').to_string());
    let name = r
        .company
        .get("company_name")
        .and_then(Value::as_str)
        .unwrap_or("-");
    writeln!(
        w,
        "{} company {id} ({name})",
        if r.created { "Created" } else { "Updated" }
    )?;
    pretty_kv(w, "techs saved", r.techs.succeeded.to_string())?;
    pretty_kv(w, "techs removed", r.deleted_techs.to_string())?;
    for failed in r.techs.results.iter().filter(|o| !o.ok) {
        writeln!(
            w,
            "  failed {}: {}",
            failed.id,
            failed.error.as_deref().unwrap_or("unknown error")
        )?;
    }
    Ok(())
}

fn write_value(value: &Value, w: &mut dyn Write) -> io::Result<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => writeln!(w, "{s}")?,
                    other => writeln!(w, "{other}")?,
                }
            }
            Ok(())
        }
        other => {
            serde_json::to_writer_pretty(&mut *w, other)?;
            writeln!(w)
        }
    }
}

pub fn run_company(args: &CompanyArgs, ctx: &AppContext) -> Result<()> {
    let client = ctx.client()?;
    match &args.command {
        CompanyCommand::Save(save) => {
            let data = load_form(Some(save.file.as_path()), &save.set)?;
            let report = client.save_company(&data)?;
            render(ctx.output, &report, |r, w| write_save_report(r, w))?;
            if !report.techs.all_ok() {
                anyhow::bail!("{} technician(s) failed to save", report.techs.failed);
            }
            Ok(())
        }
        CompanyCommand::States => {
            let states = client.company_states()?;
            render(ctx.output, &states, |v, w| write_value(v, w))
        }
        CompanyCommand::Regions => {
            let regions = client.company_regions()?;
            render(ctx.output, &regions, |v, w| write_value(v, w))
        }
        CompanyCommand::Zip { zip } => {
            let zip = zip.trim();
            if zip.is_empty() || !zip.chars().all(|c| c.is_ascii_digit() || c == '-') {
                anyhow::bail!("invalid ZIP code '{zip}'");
            }
            let found = client.company_zip_lookup(zip)?;
            render(ctx.output, &found, |v, w| write_value(v, w))
        }
        CompanyCommand::Import { csv } => {
            let result = client.import_companies_file(csv)?;
            render(ctx.output, &result, |v, w| {
                writeln!(w, "Imported {}", csv.display())?;
                write_value(v, w)
            })
        }
    }
}
