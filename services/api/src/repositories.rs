//! Repositories for database operations

use resolution::StoreError;
use tracing::error;

pub mod garment;

pub use garment::{GarmentChanges, GarmentFilter, GarmentRepository};

/// Map driver errors onto the store taxonomy; 23505 is unique_violation
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            match db.constraint() {
                Some(constraint) if constraint.contains("barcode") => StoreError::Conflict(
                    "a garment with this barcode already exists".to_string(),
                ),
                Some(constraint) => StoreError::Conflict(constraint.to_string()),
                None => StoreError::Conflict("unique constraint".to_string()),
            }
        }
        other => {
            error!("Garment query failed: {}", other);
            StoreError::Backend(other.to_string())
        }
    }
}
