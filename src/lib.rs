//! Adaptive level-sequencing core for a segment-based dungeon game.
//!
//! The crate decides which authored level segments the player sees next and
//! how segments are scored and pruned as attempts finish. Three layers:
//! a directed probabilistic graph of segments ([`graph::PolicyGraph`]), an
//! MDP solver over it ([`solver`]), and the stateful
//! [`director::AdaptiveDirector`] that closes the learning loop and stitches
//! the next playable level out of static tile data.
//!
//! Platform-agnostic: no rendering, no input handling, no persistence. The
//! host game calls [`director::AdaptiveDirector::get`] once per new level and
//! [`director::AdaptiveDirector::update`] once per finished attempt.

pub mod constants;
pub mod data;
pub mod director;
pub mod graph;
pub mod solver;

// Re-export commonly used types
pub use constants::{KEY_DEATH, KEY_END, KEY_START, NUM_ROWS};
pub use data::{DataError, EdgeDef, LevelData, SegmentDef};
pub use director::{
    AdaptiveDirector, AttemptTelemetry, DirectorConfig, DirectorError, SessionType,
};
pub use graph::{Edge, GraphError, Outcome, OutcomeList, PolicyGraph, Segment};
pub use solver::{
    Backup, EvalStrategy, Policy, SweepStyle, evaluate, improve_policy, max_utility,
    policy_iteration, random_policy, utility_of_action,
};
