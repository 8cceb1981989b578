use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::{Mutex, RwLock};
use tokio::time::{self, Instant};

use crate::cfg;
use crate::db::DbError;

pub type DbPool = sqlx::SqlitePool;

/// Owns the connection pool and shields callers from transient storage failures.
///
/// Every data operation goes through [`Database::execute_with_retry`], which bounds each
/// attempt with a timeout and all attempts with an overall deadline. Latency sensitive
/// flows call [`Database::ensure_healthy`] first, which re-initializes the pool at most
/// once per call when the health probe fails.
pub struct Database {
    pool: RwLock<DbPool>,
    options: SqliteConnectOptions,
    settings: cfg::DatabaseSettings,
    // holds the instant of the last failed re-initialization
    reinit: Mutex<Option<Instant>>,
}

impl Database {
    /// Connects eagerly, failing if the database cannot be reached
    pub async fn open(settings: &cfg::DatabaseSettings) -> Result<Self, DbError> {
        let options = connect_options(settings)?;
        let pool = connect(&options, settings).await?;
        tracing::info!("Database initialized successfully");
        Ok(Self::with_pool(pool, options, settings))
    }

    /// Creates the pool without connecting; connections are established on first use
    pub fn open_lazy(settings: &cfg::DatabaseSettings) -> Result<Self, DbError> {
        let options = connect_options(settings)?;
        let pool = pool_options(settings).connect_lazy_with(options.clone());
        Ok(Self::with_pool(pool, options, settings))
    }

    fn with_pool(pool: DbPool, options: SqliteConnectOptions, settings: &cfg::DatabaseSettings) -> Self {
        Self {
            pool: RwLock::new(pool),
            options,
            settings: settings.clone(),
            reinit: Mutex::new(None),
        }
    }

    const fn resilience(&self) -> &cfg::ResilienceSettings {
        &self.settings.resilience
    }

    /// Returns a handle to the current pool
    pub async fn pool(&self) -> DbPool {
        self.pool.read().await.clone()
    }

    pub async fn close(&self) {
        self.pool.read().await.close().await;
        tracing::info!("Database pool closed");
    }

    /// Probes the pool and, if the probe fails, waits `reinit_delay` and makes exactly one
    /// attempt to replace the pool with a fresh one.
    pub async fn ensure_healthy(&self) -> Result<(), DbError> {
        let pool = self.pool().await;
        let Err(probe_error) = self.probe(&pool).await else {
            return Ok(());
        };
        tracing::warn!(error = %probe_error, "Database health check failed");

        let mut last_failure = self.reinit.lock().await;

        // another request may have repaired the pool while this one was waiting for the lock
        if self.probe(&self.pool().await).await.is_ok() {
            return Ok(());
        }

        // a re-initialization just failed, don't pile up delayed attempts behind it
        if last_failure.is_some_and(|at| at.elapsed() < self.resilience().reinit_delay()) {
            return Err(DbError::Unavailable { attempts: 1 });
        }

        time::sleep(self.resilience().reinit_delay()).await;
        match self.reinitialize().await {
            Ok(()) => {
                *last_failure = None;
                tracing::info!("Database pool re-initialized");
                Ok(())
            }
            Err(e) => {
                *last_failure = Some(Instant::now());
                tracing::error!(error = %e, "Database re-initialization failed");
                Err(DbError::Unavailable { attempts: 2 })
            }
        }
    }

    async fn reinitialize(&self) -> Result<(), DbError> {
        let fresh = time::timeout(self.resilience().attempt_timeout(), connect(&self.options, &self.settings))
            .await
            .map_err(|_| DbError::TimedOut)??;
        self.probe(&fresh).await?;

        let stale = std::mem::replace(&mut *self.pool.write().await, fresh);
        tokio::spawn(async move { stale.close().await });
        Ok(())
    }

    async fn probe(&self, pool: &DbPool) -> Result<(), DbError> {
        time::timeout(self.resilience().attempt_timeout(), sqlx::query("SELECT 1").execute(pool))
            .await
            .map_err(|_| DbError::TimedOut)?
            .map(|_| ())
            .map_err(DbError::ConnectionFailed)
    }

    /// Runs `operation` against the pool, retrying transient failures.
    ///
    /// Permanent failures are returned immediately. Once `max_attempts` or the overall
    /// deadline is exhausted the result is [`DbError::Unavailable`]. Only for reads and
    /// writes that can be applied twice; see [`Database::execute_write_with_retry`].
    pub async fn execute_with_retry<T, F, Fut>(&self, operation: &str, f: F) -> Result<T, DbError>
    where
        F: Fn(DbPool) -> Fut,
        Fut: Future<Output = Result<T, DbError>>,
    {
        self.run_with_retry(operation, Replay::Transient, f).await
    }

    /// Runs a write that must not be applied twice.
    ///
    /// Only failures raised before the statement ran ([`DbError::is_unapplied`]) are
    /// retried. A timed-out attempt may still commit, so it is reported as
    /// [`DbError::TimedOut`] rather than run again.
    pub async fn execute_write_with_retry<T, F, Fut>(&self, operation: &str, f: F) -> Result<T, DbError>
    where
        F: Fn(DbPool) -> Fut,
        Fut: Future<Output = Result<T, DbError>>,
    {
        self.run_with_retry(operation, Replay::Unapplied, f).await
    }

    async fn run_with_retry<T, F, Fut>(&self, operation: &str, replay: Replay, f: F) -> Result<T, DbError>
    where
        F: Fn(DbPool) -> Fut,
        Fut: Future<Output = Result<T, DbError>>,
    {
        let max_attempts = self.resilience().max_attempts.max(1);
        let deadline = Instant::now() + self.resilience().overall_deadline();
        let mut attempt = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(operation, attempts = attempt, "Database operation deadline exceeded");
                return Err(DbError::Unavailable { attempts: attempt });
            }
            attempt += 1;

            let pool = self.pool().await;
            let attempt_timeout = self.resilience().attempt_timeout().min(remaining);
            let result = time::timeout(attempt_timeout, f(pool))
                .await
                .unwrap_or(Err(DbError::TimedOut));

            match result {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(operation, attempt, "Database operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !replay.allows(&e) => {
                    if e.is_transient() {
                        tracing::warn!(operation, attempt, error = %e, "Write outcome unknown, not retrying");
                    }
                    return Err(e);
                }
                Err(e) if attempt >= max_attempts => {
                    tracing::warn!(operation, attempt, error = %e, "Database operation failed after max attempts");
                    return Err(DbError::Unavailable { attempts: attempt });
                }
                Err(e) => {
                    let backoff = self
                        .backoff_duration(attempt)
                        .min(deadline.saturating_duration_since(Instant::now()));
                    tracing::warn!(
                        operation,
                        attempt,
                        error = %e,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        "Database operation failed, retrying after backoff"
                    );
                    time::sleep(backoff).await;
                }
            }
        }
    }

    /// Exponential backoff for the retry following `attempt`, with up to 25% jitter
    fn backoff_duration(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff_ms = self
            .resilience()
            .initial_backoff_ms
            .saturating_mul(1_u64 << exponent)
            .min(self.resilience().max_backoff_ms);
        let jitter_ms = if backoff_ms >= 4 {
            rand::rng().random_range(0..=backoff_ms / 4)
        } else {
            0
        };
        Duration::from_millis(backoff_ms + jitter_ms)
    }
}

/// Which failed attempts may be run again
#[derive(Clone, Copy, Debug)]
enum Replay {
    Transient,
    Unapplied,
}

impl Replay {
    fn allows(self, error: &DbError) -> bool {
        match self {
            Self::Transient => error.is_transient(),
            Self::Unapplied => error.is_unapplied(),
        }
    }
}

fn connect_options(settings: &cfg::DatabaseSettings) -> Result<SqliteConnectOptions, DbError> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .map_err(DbError::ConnectionFailed)?
        .create_if_missing(true)
        .foreign_keys(true)
        // keep lock waits inside a single attempt's budget
        .busy_timeout(settings.resilience.attempt_timeout());
    Ok(options)
}

fn pool_options(settings: &cfg::DatabaseSettings) -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(settings.max_connections.max(1))
        .acquire_timeout(settings.resilience.attempt_timeout())
}

async fn connect(options: &SqliteConnectOptions, settings: &cfg::DatabaseSettings) -> Result<DbPool, DbError> {
    pool_options(settings)
        .connect_with(options.clone())
        .await
        .map_err(DbError::ConnectionFailed)
}
