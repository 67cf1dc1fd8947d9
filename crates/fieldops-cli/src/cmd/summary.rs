//! `fo summary`: workflow summary report.

use anyhow::Result;
use clap::Args;
use fieldops_core::model::WorkflowSummary;
use std::io::{self, Write};

use crate::context::AppContext;
use crate::output::{pretty_kv, pretty_section, render_mode};

/// Outstanding return ids shown in human output; JSON carries all of them.
pub const MAX_OUTSTANDING_SHOWN: usize = 25;

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Days of history to include (default from config, 30).
    #[arg(long)]
    pub lookback_days: Option<u32>,

    /// Minutes on site before a ticket counts as too long (default 180).
    #[arg(long)]
    pub onsite_alert_minutes: Option<u32>,
}

fn write_summary(s: &WorkflowSummary, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Queue aging")?;
    if s.queue_aging.is_empty() {
        writeln!(w, "  (no queued tickets)")?;
    }
    for q in &s.queue_aging {
        writeln!(
            w,
            "{:<14} {:>5}   avg {:>6.1}h   max {:>6.1}h",
            q.queue, q.count, q.avg_age_hours, q.max_age_hours
        )?;
    }
    writeln!(w)?;
    pretty_section(w, "Alerts")?;
    pretty_kv(w, "onsite too long", s.onsite_too_long_count.to_string())?;
    pretty_kv(w, "NRO phase 1", s.nro_phase1_pending_count.to_string())?;
    pretty_kv(w, "NRO phase 2", s.nro_phase2_pending_count.to_string())?;

    let ids = &s.returns_outstanding_ticket_ids;
    writeln!(w)?;
    pretty_section(w, &format!("Returns outstanding ({})", ids.len()))?;
    for id in ids.iter().take(MAX_OUTSTANDING_SHOWN) {
        writeln!(w, "  {id}")?;
    }
    if ids.len() > MAX_OUTSTANDING_SHOWN {
        writeln!(w, "  … and {} more", ids.len() - MAX_OUTSTANDING_SHOWN)?;
    }
    Ok(())
}

fn write_summary_text(s: &WorkflowSummary, w: &mut dyn Write) -> io::Result<()> {
    for q in &s.queue_aging {
        writeln!(w, "queue={} count={} avg_hours={:.1} max_hours={:.1}", q.queue, q.count, q.avg_age_hours, q.max_age_hours)?;
    }
    writeln!(
        w,
        "queued_total={} onsite_too_long={} nro_pending={} returns_outstanding={}",
        s.queued_total(),
        s.onsite_too_long_count,
        s.nro_pending_total(),
        s.returns_outstanding_ticket_ids.len()
    )
}

pub fn run_summary(args: &SummaryArgs, ctx: &AppContext) -> Result<()> {
    let lookback = args.lookback_days.unwrap_or(ctx.config.reports.lookback_days);
    let onsite = args
        .onsite_alert_minutes
        .unwrap_or(ctx.config.reports.onsite_alert_minutes);

    let client = ctx.client()?;
    let summary = client.workflow_summary(lookback, onsite)?;
    render_mode(ctx.output, &summary, write_summary_text, write_summary)
}
