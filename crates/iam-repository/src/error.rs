use thiserror::Error;

/// Error types for repository/database operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database error - wraps all SeaORM errors
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem error while preparing the database location
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value does not fit the signed 64-bit column it is stored in.
    #[error("Value {value} for column '{column}' exceeds i64::MAX")]
    OutOfRange { column: &'static str, value: u64 },

    /// A stored row could not be turned back into its domain type.
    #[error("Corrupt row in '{table}': {reason}")]
    CorruptRow { table: &'static str, reason: String },

    /// Refused to move the sync watermark backwards outside of an explicit reset.
    #[error("Sync watermark regression: stored {stored}, requested {requested}")]
    WatermarkRegression { stored: u64, requested: u64 },
}

/// Convenient Result type alias for RepositoryError
pub type Result<T> = std::result::Result<T, RepositoryError>;

pub(crate) fn to_db_int(column: &'static str, value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| RepositoryError::OutOfRange { column, value })
}

pub(crate) fn from_db_int(table: &'static str, column: &'static str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| RepositoryError::CorruptRow {
        table,
        reason: format!("negative {column}: {value}"),
    })
}
