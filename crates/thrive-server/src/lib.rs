pub mod config;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;
pub mod services;
pub mod state;

pub use config::{
    AiConfig, AppConfig, AuthSettings, LocalizationConfig, MetricsConfig, PostgresStorageConfig,
    ServerConfig, StorageBackend, StorageConfig, VoiceConfig,
};
pub use observability::{init_tracing, shutdown_tracing};
pub use server::{ServerBuilder, ThriveServer, build_app, build_router, create_storage};
pub use state::AppState;
