//! Goals module - domain models, services, and traits.

mod goals_model;
mod goals_service;
mod goals_traits;

#[cfg(test)]
mod service_tests;

pub use goals_model::{
    Actor, ActorRole, AssignmentAction, ChildGoalView, Goal, GoalAssignment, GoalFieldPatch,
    GoalPatch, GoalStatus, GoalType, NewGoal, NewGoalRecord, ParentGoalView,
};
pub use goals_service::GoalService;
pub use goals_traits::{GoalRepositoryTrait, GoalServiceTrait};
