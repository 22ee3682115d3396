//! Shared infrastructure for the wardrobe services
//!
//! PostgreSQL pooling and migrations, the Redis cache used for short-lived
//! login state, and the database error type.

pub mod cache;
pub mod database;
pub mod error;
