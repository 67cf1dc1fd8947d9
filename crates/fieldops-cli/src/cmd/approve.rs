//! `fo approve`: bulk approval through the bounded fan-out.
//!
//! Every id gets its own request; a failure is reported against its id and
//! never stops the rest of the batch.

use anyhow::Result;
use clap::Args;
use fieldops_core::fanout::BulkReport;
use std::io::{self, Write};

use crate::context::AppContext;
use crate::output::render;
use crate::validate;

#[derive(Args, Debug)]
pub struct ApproveArgs {
    /// Tickets to approve.
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<String>,
}

/// Keep the first occurrence of each id.
fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .map(|id| id.trim().to_string())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn write_report(report: &BulkReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "Approve results")?;
    writeln!(w, "{:-<88}", "")?;
    writeln!(w, "status  ticket            detail")?;
    writeln!(w, "{:-<88}", "")?;
    for r in &report.results {
        if r.ok {
            writeln!(w, "ok    {:<16}  approved", r.id)?;
        } else {
            writeln!(
                w,
                "err   {:<16}  {}",
                r.id,
                r.error.as_deref().unwrap_or("unknown error")
            )?;
        }
    }
    writeln!(w, "{:-<88}", "")?;
    writeln!(w, "{} succeeded, {} failed", report.succeeded, report.failed)
}

/// Error for a report with failures: the single message, or a count.
fn failure_summary(report: &BulkReport) -> Option<String> {
    let failures: Vec<&str> = report
        .results
        .iter()
        .filter(|r| !r.ok)
        .map(|r| r.error.as_deref().unwrap_or("unknown error"))
        .collect();
    match failures.as_slice() {
        [] => None,
        [only] => Some((*only).to_string()),
        many => Some(format!("{} ticket(s) failed to approve", many.len())),
    }
}

pub fn run_approve(args: &ApproveArgs, ctx: &AppContext) -> Result<()> {
    let ids = dedup_ids(&args.ids);
    validate::validate_ticket_ids(&ids)?;

    let client = ctx.client()?;
    let report = client.bulk_approve(&ids);

    render(ctx.output, &report, |r, w| write_report(r, w))?;

    if let Some(message) = failure_summary(&report) {
        anyhow::bail!("{message}");
    }
    Ok(())
}
