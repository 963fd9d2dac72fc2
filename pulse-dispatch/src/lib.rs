//! # pulse-dispatch
//!
//! Everything between a stamped record and the collection endpoint.
//!
//! ## Components
//! - **queue**: bounded FIFO of pending records, oldest dropped on overflow
//! - **scheduler**: idle / timer-armed / flushing state machine with retry bookkeeping
//! - **outcome**: per-batch delivery result reconciled by the scheduler
//! - **transport**: primary POST and pixel GET channels, and the selector between them
//!
//! The `test-util` feature exposes `MockTransport`, a scripted in-process
//! transport.
//!
//! The scheduler is sans-IO: it is driven with explicit [`std::time::Instant`]s
//! and returns batches for the caller to deliver.

pub mod outcome;
pub mod queue;
pub mod scheduler;
pub mod transport;

pub use outcome::{ItemFailure, Outcome};
pub use queue::{EventQueue, QueuedRecord};
pub use scheduler::{
    backoff_delay, Batch, BatchScheduler, FlushTrigger, Reconciliation, SchedulerConfig,
    SchedulerState,
};
pub use transport::{
    DeliveryContext, DeliveryMode, HttpTransport, PrimaryRequest, SelectorConfig, Transport,
    TransportSelector,
};

#[cfg(any(test, feature = "test-util"))]
pub use transport::{MockTransport, PostReply};
