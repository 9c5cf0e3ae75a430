//! SQLite storage implementation for FamQuest.
//!
//! This crate provides all database-related functionality using Diesel ORM
//! with SQLite. It implements the repository traits defined in
//! `famquest-core` and contains:
//! - Database connection pooling and management
//! - Embedded Diesel migrations
//! - Repository implementations for profiles, goals, progress, notifications
//! - Database-specific model types (with Diesel derives)
//!
//! This crate is the only place in the application where Diesel dependencies
//! exist. The core crate is database-agnostic and works with traits.
//!
//! All writes funnel through a single writer actor that executes each job
//! inside `immediate_transaction` on one dedicated connection. That serial
//! execution is what makes the progress engine's read-modify-write atomic
//! with respect to other writers of the same assignment row.

pub mod db;
pub mod errors;
pub mod schema;

// Repository implementations
pub mod goals;
pub mod notifications;
pub mod profiles;
pub mod progress;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors
pub use errors::StorageError;

// Re-export from famquest-core for convenience
pub use famquest_core::errors::{DatabaseError, Error, Result};
