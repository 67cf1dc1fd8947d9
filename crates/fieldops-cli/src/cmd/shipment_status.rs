//! `fo shipment-status`: move a shipment to a new status.
//!
//! Goes through `PATCH /shipments/{id}/status`, which is where the backend
//! adjusts inventory for shipped parts.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use serde_json::Value;

use crate::context::AppContext;
use crate::output::render;

#[derive(Args, Debug)]
pub struct ShipmentStatusArgs {
    /// Shipment id.
    pub id: String,

    /// New status, e.g. pending, shipped, delivered, returned.
    pub status: String,
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    ok: bool,
    shipment_id: String,
    status: String,
    shipment: Value,
}

pub fn run_shipment_status(args: &ShipmentStatusArgs, ctx: &AppContext) -> Result<()> {
    let status = args.status.trim().to_lowercase();
    if status.is_empty() {
        anyhow::bail!("status must not be empty");
    }

    let client = ctx.client()?;
    let shipment = client.set_shipment_status(args.id.trim(), &status)?;

    let out = StatusOutput {
        ok: true,
        shipment_id: args.id.trim().to_string(),
        status,
        shipment,
    };
    render(ctx.output, &out, |o, w| {
        writeln!(w, "Shipment {} is now {}", o.shipment_id, o.status)
    })
}
