//! Pool construction for [`PostgresStorage`](crate::PostgresStorage).

use std::str::FromStr;
use std::time::Duration;

use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgConnectOptions, PgPool, Postgres};
use tracing::{debug, info, instrument};

use crate::config::PostgresConfig;
use crate::error::{PostgresError, Result};

/// Recycled after this long even when healthy.
const DEFAULT_MAX_LIFETIME_SECS: u64 = 30 * 60;

fn connect_options(config: &PostgresConfig) -> Result<PgConnectOptions> {
    let options = PgConnectOptions::from_str(&config.url)
        .map_err(|e| PostgresError::config(format!("invalid database url: {e}")))?;
    Ok(options.application_name(&config.application_name))
}

#[instrument(skip(config), fields(url = %mask_password(&config.url)))]
pub async fn create_pool(config: &PostgresConfig) -> Result<PgPool> {
    if config.pool_size == 0 {
        return Err(PostgresError::config("pool_size must be greater than zero"));
    }
    let connect = connect_options(config)?;

    // keep a small warm set so the first requests after idle do not pay for handshakes
    let min_connections = config
        .min_connections
        .unwrap_or(config.pool_size / 4)
        .clamp(1, config.pool_size);

    info!(
        max = config.pool_size,
        min = min_connections,
        application = %config.application_name,
        "opening postgres pool"
    );

    let mut options = PoolOptions::<Postgres>::new()
        .max_connections(config.pool_size)
        .min_connections(min_connections)
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .max_lifetime(Duration::from_secs(
            config.max_lifetime_secs.unwrap_or(DEFAULT_MAX_LIFETIME_SECS),
        ))
        .test_before_acquire(false);
    if let Some(idle) = config.idle_timeout_ms {
        options = options.idle_timeout(Duration::from_millis(idle));
    }

    let pool = options.connect_with(connect).await?;
    debug!(size = pool.size(), "postgres pool ready");
    Ok(pool)
}

/// Round-trips a trivial query; used by the health endpoint.
#[instrument(skip(pool))]
pub async fn test_connection(pool: &PgPool) -> Result<()> {
    sqlx_core::query::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Replaces the password in a connection URL so it can be logged.
pub fn mask_password(url: &str) -> String {
    let Some((head, host)) = url.rsplit_once('@') else {
        return url.to_string();
    };
    let (scheme, userinfo) = match head.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, head),
    };
    let Some((user, _)) = userinfo.split_once(':') else {
        return url.to_string();
    };
    match scheme {
        Some(scheme) => format!("{scheme}://{user}:****@{host}"),
        None => format!("{user}:****@{host}"),
    }
}
