//! Access to the Odyssey administrative console.

use crate::collectors::error::StepError;
use crate::collectors::rows::ResultSet;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info_span, instrument};
use tracing_futures::Instrument as _;

/// Runs one fixed `show ...;` command and returns its decoded rows.
pub trait AdminConsole: Send + Sync {
    fn query<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<ResultSet>>;

    /// Release the underlying connection. Called once at the end of a scrape.
    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

/// Console backed by a one-connection sqlx pool.
///
/// The console only understands the simple-query protocol, so commands go
/// through `raw_sql` and the pool never pings connections before handing
/// them out.
pub struct PgConsole {
    pool: PgPool,
}

impl PgConsole {
    /// Open the single console connection, bounded by `deadline`.
    ///
    /// # Errors
    ///
    /// Returns `DeadlineExceeded` when the deadline passes first, otherwise
    /// the driver error.
    #[instrument(skip(options), level = "debug", err, fields(db.system = "odyssey", otel.kind = "client"))]
    pub async fn connect(
        options: &PgConnectOptions,
        deadline: Option<Instant>,
    ) -> Result<Self, StepError> {
        let options = options.clone().statement_cache_capacity(0);

        let mut pool_options = PgPoolOptions::new()
            .max_connections(1)
            .min_connections(0)
            .test_before_acquire(false);

        let connect = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(StepError::DeadlineExceeded);
                }
                pool_options = pool_options.acquire_timeout(remaining);
                timeout_at(deadline, pool_options.connect_with(options))
                    .await
                    .map_err(|_| StepError::DeadlineExceeded)?
            }
            None => pool_options.connect_with(options).await,
        };

        let pool = connect.context("failed to open console connection")?;

        debug!("connected to Odyssey console");

        Ok(Self { pool })
    }
}

impl AdminConsole for PgConsole {
    fn query<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<ResultSet>> {
        Box::pin(async move {
            let span = info_span!(
                "db.query",
                db.system = "odyssey",
                db.operation = "SHOW",
                db.statement = command,
                otel.kind = "client"
            );

            let rows = sqlx::raw_sql(command)
                .fetch_all(&self.pool)
                .instrument(span)
                .await
                .with_context(|| format!("error running {command:?}"))?;

            ResultSet::from_pg_rows(&rows)
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.pool.close().await;
        })
    }
}
