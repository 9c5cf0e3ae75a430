pub mod actor;
pub mod api;
pub mod config;
pub mod error;
pub mod main_lib;
pub mod notifications;
pub mod scheduler;

pub use main_lib::{build_state, init_tracing, AppState};
