use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, middleware};
use thrive_api::ApiError;
use thrive_auth::authentication_middleware;
use thrive_db_postgres::PostgresStorage;
use thrive_storage::prelude::*;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{AppConfig, StorageBackend};
use crate::state::AppState;
use crate::{metrics, middleware as app_middleware, routes};

pub struct ThriveServer {
    addr: SocketAddr,
    app: Router,
}

/// Opens the configured backend. The in-memory store is migrated here; the
/// Postgres store migrates itself when `run_migrations` is set.
pub async fn create_storage(cfg: &AppConfig) -> anyhow::Result<DynStorage> {
    let storage: DynStorage = match cfg.storage.backend {
        StorageBackend::Memory => {
            let storage = thrive_db_memory::create_storage();
            storage.run_migrations().await?;
            storage
        }
        StorageBackend::Postgres => {
            let pg = PostgresStorage::new(cfg.storage.postgres.to_backend_config()).await?;
            Arc::new(pg)
        }
    };
    tracing::info!(backend = storage.backend_name(), "storage ready");
    Ok(storage)
}

async fn fallback() -> ApiError {
    ApiError::not_found("Route not found")
}

/// Routes plus the middleware stack.
///
/// Order, innermost first: authentication -> http metrics -> trace -> timeout
/// -> request id -> cors -> body limit.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    let timeout = state.config.request_timeout();
    if state.config.metrics.enabled {
        metrics::init_metrics();
    }

    routes::api_router()
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            authentication_middleware,
        ))
        .layer(middleware::from_fn(app_middleware::http_metrics))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Opens storage, builds the shared state and returns the complete router.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let storage = create_storage(cfg).await?;
    let state = AppState::new(cfg.clone(), storage)?;
    Ok(build_router(state))
}

#[derive(Default)]
pub struct ServerBuilder {
    config: AppConfig,
    addr: Option<SocketAddr>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    pub async fn build(self) -> anyhow::Result<ThriveServer> {
        let app = build_app(&self.config).await?;
        Ok(ThriveServer {
            addr: self.addr.unwrap_or_else(|| self.config.addr()),
            app,
        })
    }
}

impl ThriveServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
