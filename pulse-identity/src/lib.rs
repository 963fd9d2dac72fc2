//! # pulse-identity
//!
//! Derives and persists the anonymous identifier and the session identifier.
//! Storage failures degrade to memory-only identity; they are never fatal.

pub mod session;
pub mod storage;
pub mod store;

pub use session::SessionState;
pub use storage::{MemoryStorage, SqliteStorage};
pub use store::IdentityStore;
