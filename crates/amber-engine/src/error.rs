use amber_db::DbError;
use thiserror::Error;

/// Error taxonomy for lifecycle operations.
///
/// The HTTP layer maps these onto status codes; the engine never decides
/// transport concerns itself.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid input: unknown status value, missing required field.
    #[error("{0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The backing store failed; not retried here.
    #[error("storage error: {0}")]
    Storage(DbError),
}

impl From<DbError> for EngineError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound => EngineError::NotFound("record"),
            other => EngineError::Storage(other),
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        EngineError::Storage(DbError::Sqlx(e))
    }
}

/// Maps a store-level `NotFound` onto a named entity; everything else
/// becomes a storage error.
pub(crate) fn map_not_found(entity: &'static str) -> impl Fn(DbError) -> EngineError {
    move |e| match e {
        DbError::NotFound => EngineError::NotFound(entity),
        other => EngineError::Storage(other),
    }
}
