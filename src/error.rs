use serde_json::json;
use thiserror::Error;

/// Which kind of record a lookup failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Student,
    Subject,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Entity::Student => "student",
            Entity::Subject => "subject",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{} {id} not found", .entity.as_str())]
    NotFound { entity: Entity, id: i64 },

    #[error("subject '{name}' already exists")]
    DuplicateName { name: String, existing_id: i64 },

    #[error("marks ({value}) must be between {min} and {max}")]
    OutOfRange { value: i64, min: i64, max: i64 },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("access denied")]
    AccessDenied,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("database error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn not_found(entity: Entity, id: i64) -> Self {
        StoreError::NotFound { entity, id }
    }

    /// Stable wire code reported in IPC error objects.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::DuplicateName { .. } => "duplicate_name",
            StoreError::OutOfRange { .. } => "out_of_range",
            StoreError::ConstraintViolation(_) => "constraint_violation",
            StoreError::AccessDenied => "access_denied",
            StoreError::InvalidCredentials => "invalid_credentials",
            StoreError::Storage(_) => "db_query_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            StoreError::NotFound { entity, id } => Some(json!({
                "entity": entity.as_str(),
                "id": id,
            })),
            StoreError::DuplicateName { name, existing_id } => Some(json!({
                "name": name,
                "existingId": existing_id,
            })),
            StoreError::OutOfRange { value, min, max } => Some(json!({
                "value": value,
                "min": min,
                "max": max,
            })),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(f, _)
                if f.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::ConstraintViolation(e.to_string())
            }
            _ => StoreError::Storage(e.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
