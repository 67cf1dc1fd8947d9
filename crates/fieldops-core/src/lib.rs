//! fieldops-core library.
//!
//! Typed model and REST client for the field-ops ticketing backend: the
//! dispatcher action table, the optimistic version guard, write-payload
//! cleaning, and bounded fan-out for batch calls. The backend owns every
//! record and every state-machine rule; nothing here is authoritative.

pub mod client;
pub mod company;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod fanout;
pub mod filter;
pub mod form;
pub mod model;
pub mod notify;
pub mod session;
pub mod shipment;
pub mod workflow;

/// # Conventions
///
/// - **Errors**: backend calls return [`error::ApiError`]; local I/O uses `anyhow::Result`.
/// - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).
pub use client::{ApiClient, Transport, UreqTransport};
pub use error::{ApiError, ErrorCode};
pub use model::{Ticket, WorkflowState};
pub use workflow::{Queue, QueueAction, action_for};
