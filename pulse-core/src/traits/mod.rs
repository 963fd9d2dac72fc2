//! Seams implemented by other crates.

pub mod storage;

pub use storage::KeyValueStorage;
