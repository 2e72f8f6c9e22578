//! Transaction flow state machine.
//!
//! Orchestrates one transaction attempt from validation through
//! settlement, persisting a record for every attempt and broadcasting
//! lifecycle events.

pub mod error;
pub mod events;
pub mod record;
pub mod service;
pub mod state;

pub use error::FlowError;
pub use events::{FlowEvent, FlowEvents};
pub use record::{FailureStep, RecordStatus, TransactionRecord};
pub use service::{ConfirmationSnapshot, TransactionFlow, TransactionFlowService};
pub use state::FlowState;
