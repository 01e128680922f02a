//! In-memory storage backend for the Thrive server.
//!
//! Implements every `thrive-storage` trait on top of `dashmap` maps. Used by
//! the test suites and for running the server without a database; nothing is
//! persisted across restarts.
//!
//! ```ignore
//! use thrive_db_memory::InMemoryStorage;
//! use thrive_storage::prelude::*;
//!
//! let storage: DynStorage = std::sync::Arc::new(InMemoryStorage::new());
//! storage.create_task(&task).await?;
//! ```

mod accounts;
mod activity;
mod engagement;
mod platform;
mod storage;

pub use storage::InMemoryStorage;

/// Creates a shareable in-memory storage instance.
pub fn create_storage() -> thrive_storage::DynStorage {
    std::sync::Arc::new(InMemoryStorage::new())
}
