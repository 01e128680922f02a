//! # thrive-storage
//!
//! Storage abstraction layer for the Thrive server.
//!
//! This crate defines the traits and types that storage backends implement.
//! It contains no implementation; see `thrive-db-memory` and
//! `thrive-db-postgres`.
//!
//! ```ignore
//! use thrive_storage::prelude::*;
//!
//! async fn open_tasks(storage: &DynStorage, user: Uuid) -> StorageResult<Vec<Task>> {
//!     storage
//!         .list_tasks(user, &TaskFilter::default().with_status(TaskStatus::Pending))
//!         .await
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{
    AnalyticsStorage, BadgeStorage, CalendarStorage, ContentStorage, FocusStorage, HealthStorage,
    NotificationStorage, OtpStorage, SchemaStorage, SocialStorage, Storage, StudentStorage,
    SubscriptionStorage, TaskStorage, UserStorage,
};
pub use types::{
    DEFAULT_PAGE_SIZE, HealthLogFilter, HealthMetricSummary, MAX_PAGE_SIZE, MigrationStatus,
    PlatformStats, StudentVerificationFilter, TaskFilter, page_size,
};

pub type StorageResult<T> = Result<T, StorageError>;

pub type DynStorage = std::sync::Arc<dyn Storage>;

/// Brings every storage trait into scope so methods resolve on `DynStorage`.
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::traits::{
        AnalyticsStorage, BadgeStorage, CalendarStorage, ContentStorage, FocusStorage,
        HealthStorage, NotificationStorage, OtpStorage, SchemaStorage, SocialStorage, Storage,
        StudentStorage, SubscriptionStorage, TaskStorage, UserStorage,
    };
    pub use crate::types::{
        HealthLogFilter, HealthMetricSummary, MigrationStatus, PlatformStats,
        StudentVerificationFilter, TaskFilter, page_size,
    };
    pub use crate::{DynStorage, StorageResult};
}
