mod model;
mod repository;

pub use model::{ChildProfileDB, NewChildProfileDB};
pub use repository::ChildProfileRepository;
