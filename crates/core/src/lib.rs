//! FamQuest Core - Domain entities, services, and traits.
//!
//! This crate contains the core business logic for FamQuest: the goal
//! lifecycle, the progress & reward engine, scheduled resets, and timed
//! tasks. It is database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate.

pub mod errors;
pub mod goals;
pub mod notifications;
pub mod profiles;
pub mod progress;
pub mod resets;
pub mod timers;

// Re-export error types
pub use errors::Error;
pub use errors::Result;

// Re-export the authenticated actor consumed by all services
pub use goals::{Actor, ActorRole};
