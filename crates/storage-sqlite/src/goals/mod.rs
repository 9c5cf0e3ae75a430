mod model;
mod repository;

pub use model::{GoalAssignmentDB, GoalDB, NewGoalAssignmentDB, NewGoalDB};
pub use repository::GoalRepository;
