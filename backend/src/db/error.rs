use thiserror::Error;

// SQLite primary result codes that indicate a busy or temporarily unreachable database
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const SQLITE_IOERR: i32 = 10;
const SQLITE_CANTOPEN: i32 = 14;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    #[error("Database operation failed: {0}")]
    OperationFailed(#[from] sqlx::Error),

    #[error("Database operation timed out")]
    TimedOut,

    #[error("Database unavailable after {attempts} attempt(s)")]
    Unavailable { attempts: u32 },

    #[error("Row not found")]
    NotFound,

    #[error("Row was modified concurrently")]
    Conflict,
}

impl DbError {
    /// Whether retrying the same operation may succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed(_) | Self::TimedOut => true,
            Self::OperationFailed(e) => is_transient_sqlx_error(e),
            Self::Unavailable { .. } | Self::NotFound | Self::Conflict => false,
        }
    }

    /// Whether a failed write can be retried without risking a second application.
    ///
    /// A timed-out attempt may still commit on the sqlite worker, so it never qualifies.
    #[must_use]
    pub fn is_unapplied(&self) -> bool {
        match self {
            Self::ConnectionFailed(_) => true,
            Self::OperationFailed(e) => is_unapplied_sqlx_error(e),
            Self::TimedOut | Self::Unavailable { .. } | Self::NotFound | Self::Conflict => false,
        }
    }

    /// Whether the storage layer as a whole is unusable right now
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::TimedOut | Self::ConnectionFailed(_))
    }

    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::OperationFailed(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}

fn is_transient_sqlx_error(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(e) => sqlite_primary_code(&**e)
            .is_some_and(|code| matches!(code, SQLITE_BUSY | SQLITE_LOCKED | SQLITE_IOERR | SQLITE_CANTOPEN)),
        _ => false,
    }
}

// Failures raised before a statement could apply anything: no connection was handed
// out, or sqlite refused the lock.
fn is_unapplied_sqlx_error(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(e) => {
            sqlite_primary_code(&**e).is_some_and(|code| matches!(code, SQLITE_BUSY | SQLITE_LOCKED))
        }
        _ => false,
    }
}

fn sqlite_primary_code(error: &dyn sqlx::error::DatabaseError) -> Option<i32> {
    if !matches!(error.kind(), sqlx::error::ErrorKind::Other) {
        return None;
    }
    // sqlite reports the extended result code, the low byte is the primary code
    error.code().and_then(|code| code.parse::<i32>().ok()).map(|code| code & 0xff)
}
