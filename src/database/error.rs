use std::fmt;
use thiserror::Error;

/// What went wrong in the order or card-token store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatabaseErrorKind {
    #[error("{entity} with ID '{id}' not found")]
    NotFound { entity: String, id: String },

    /// e.g. the same vendor card token saved twice
    #[error("A record with {column} '{value}' already exists")]
    UniqueConstraintViolation { column: String, value: String },

    #[error("Database query failed: {message}")]
    QueryError { message: String },

    #[error("Transaction failed: {message}")]
    TransactionError { message: String },

    /// Pool closed, timed out or the socket dropped
    #[error("Database connection error: {message}")]
    ConnectionError { message: String },

    /// Stored value could not be mapped back to a domain type
    #[error("Stored {entity} is invalid: {message}")]
    Corrupted { entity: String, message: String },

    #[error("Unknown database error: {message}")]
    Unknown { message: String },
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DatabaseError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
    pub context: Option<String>,
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(DatabaseErrorKind::NotFound {
            entity: entity.into(),
            id: id.into(),
        })
    }

    pub fn corrupted(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DatabaseErrorKind::Corrupted {
            entity: entity.into(),
            message: message.into(),
        })
    }

    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::NotFound { .. })
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::UniqueConstraintViolation { .. })
    }

    #[cfg(feature = "database")]
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::not_found("Record", "unknown"),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::new(DatabaseErrorKind::ConnectionError {
                    message: error.to_string(),
                })
            }
            sqlx::Error::Io(io_err) => Self::new(DatabaseErrorKind::ConnectionError {
                message: io_err.to_string(),
            }),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // Postgres unique_violation
                Some("23505") => Self::new(DatabaseErrorKind::UniqueConstraintViolation {
                    column: db_err.constraint().unwrap_or("unknown").to_string(),
                    value: "provided value".to_string(),
                }),
                _ => Self::new(DatabaseErrorKind::QueryError {
                    message: db_err.message().to_string(),
                }),
            },
            _ => Self::new(DatabaseErrorKind::Unknown {
                message: error.to_string(),
            }),
        }
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{} ({})", self.kind, context),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for DatabaseError {}
