//! Progress & reward engine - pure math, service, and traits.

pub mod engine;
mod progress_model;
mod progress_service;
mod progress_traits;


pub use engine::{
    apply_minutes, check_progress_preconditions, check_start_preconditions, compute_rollup,
    minutes_from_percentage, remaining_minutes, round_half_away, ProgressComputation, Rollup,
};
pub use progress_model::{
    ProgressApplied, ProgressInput, ProgressOutcome, StartedTask, TaskStartCheck,
};
pub use progress_service::ProgressService;
pub use progress_traits::{ProgressRepositoryTrait, ProgressServiceTrait};
