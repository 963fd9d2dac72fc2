//! [`KeyValueStorage`] backends.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use pulse_core::traits::KeyValueStorage;
pub use sqlite::SqliteStorage;
