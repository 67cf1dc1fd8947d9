//! `fo list`: paged ticket list with server-side filters.

use anyhow::Result;
use clap::Args;
use fieldops_core::client::TicketPage;
use fieldops_core::filter::{ACTIVE_STATUS, TicketListFilter};
use fieldops_core::model::Ticket;
use serde::Serialize;
use std::io::{self, Write};

use crate::cmd::or_dash;
use crate::context::AppContext;
use crate::output::{OutputMode, Renderable, pretty_rule, render_mode, truncate, write_list};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Ticket type (inhouse, onsite, nro, projects, misc, all).
    #[arg(long = "type", short = 't')]
    pub ticket_type: Option<String>,

    /// Status; `active` hides archived tickets, `all` disables the filter.
    #[arg(long, short, default_value = ACTIVE_STATUS)]
    pub status: String,

    /// Workflow state.
    #[arg(long, short = 'w')]
    pub workflow_state: Option<String>,

    /// Priority (normal, critical, emergency).
    #[arg(long, short)]
    pub priority: Option<String>,

    /// Free-text search, passed to the server as is.
    #[arg(long)]
    pub search: Option<String>,

    /// Rows per page.
    #[arg(long, short, default_value_t = 25, value_parser = clap::value_parser!(u32).range(1..=500))]
    pub limit: u32,

    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,
}

impl ListArgs {
    pub fn filter(&self) -> TicketListFilter {
        let non_blank = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        TicketListFilter {
            ticket_type: non_blank(&self.ticket_type),
            status: Some(self.status.trim().to_lowercase()),
            workflow_state: non_blank(&self.workflow_state),
            priority: non_blank(&self.priority),
            search: non_blank(&self.search),
        }
    }

    pub const fn skip(&self) -> u32 {
        (self.page.saturating_sub(1)).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketRow {
    pub ticket_id: String,
    pub site_id: Option<String>,
    pub ticket_type: Option<String>,
    pub status: Option<String>,
    pub workflow_state: Option<String>,
    pub priority: Option<String>,
    pub date_scheduled: Option<String>,
}

impl From<&Ticket> for TicketRow {
    fn from(t: &Ticket) -> Self {
        Self {
            ticket_id: t.ticket_id.clone(),
            site_id: t.site_id.clone(),
            ticket_type: t.ticket_type.clone(),
            status: t.status.clone(),
            workflow_state: t.workflow_state.clone(),
            priority: t.priority.clone(),
            date_scheduled: t.date_scheduled.clone(),
        }
    }
}

impl Renderable for TicketRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let scheduled = self.date_scheduled.as_deref().map(|d| truncate(d, 10));
        writeln!(
            w,
            "{:<14} {:<12} {:<8} {:<12} {:<30} {:<9} {}",
            truncate(&self.ticket_id, 14),
            truncate(or_dash(self.site_id.as_deref()), 12),
            or_dash(self.ticket_type.as_deref()),
            or_dash(self.status.as_deref()),
            truncate(or_dash(self.workflow_state.as_deref()), 30),
            or_dash(self.priority.as_deref()),
            or_dash(scheduled.as_deref()),
        )
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, self)?;
        Ok(())
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}  {}  {}  {}  {}  {}",
            self.ticket_id,
            or_dash(self.site_id.as_deref()),
            or_dash(self.ticket_type.as_deref()),
            or_dash(self.status.as_deref()),
            or_dash(self.workflow_state.as_deref()),
            or_dash(self.priority.as_deref()),
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["TICKET", "SITE", "TYPE", "STATUS", "STATE", "PRIORITY"]
    }
}

#[derive(Debug, Serialize)]
struct ListOutput {
    total: u64,
    archived: u64,
    page: u32,
    pages: u64,
    limit: u32,
    tickets: Vec<TicketRow>,
}

fn page_count(total: u64, limit: u32) -> u64 {
    total.div_ceil(u64::from(limit.max(1))).max(1)
}

fn list_output(page: TicketPage, args: &ListArgs) -> ListOutput {
    ListOutput {
        total: page.total,
        archived: page.archived,
        page: args.page,
        pages: page_count(page.total, args.limit),
        limit: args.limit,
        tickets: page.tickets.iter().map(TicketRow::from).collect(),
    }
}

pub fn run_list(args: &ListArgs, ctx: &AppContext) -> Result<()> {
    let client = ctx.client()?;
    let page = client.ticket_page(&args.filter(), args.limit, args.skip())?;
    let out = list_output(page, args);

    render_mode(
        ctx.output,
        &out,
        |o, w| write_list(w, &o.tickets, OutputMode::Text),
        |o, w| {
            writeln!(
                w,
                "Tickets: {} (page {}/{}, {} archived)",
                o.total, o.page, o.pages, o.archived
            )?;
            pretty_rule(w)?;
            if o.tickets.is_empty() {
                return writeln!(w, "No tickets match.");
            }
            write_list(w, &o.tickets, OutputMode::Pretty)
        },
    )
}
