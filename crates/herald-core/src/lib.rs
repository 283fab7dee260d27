pub mod config;
pub mod error;
pub mod intent;
pub mod report;
pub mod types;

pub use config::HeraldConfig;
pub use error::{HeraldError, Result};
pub use intent::{Intent, Selector};
pub use report::{BroadcastReport, Completion, Progress, RunId, RunState};
pub use types::{
    DeliveryOutcome, DeliveryStatus, Destination, DestinationId, FailureReason, Message,
    MessageKind, ParseIdentifierError,
};
