pub mod report;
pub mod resource;
pub mod ticket;

pub use report::{QueueAging, WorkflowSummary};
pub use resource::{Resource, path_segment};
pub use ticket::{
    ParseEnumError, Ticket, TicketPriority, TicketStatus, TicketType, WorkflowState,
};
