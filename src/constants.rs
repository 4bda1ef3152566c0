//! Shared constants for the sequencing core.

/// Fixed tile-row height of every segment and link block.
pub const NUM_ROWS: usize = 11;

/// Universal entry node; never terminal.
pub const KEY_START: &str = "start";
/// Terminal sink for failed traversals.
pub const KEY_DEATH: &str = "death";
/// Terminal goal node.
pub const KEY_END: &str = "end";

/// Canonical default entry segment; exempt from entry-edge pruning.
pub const DEFAULT_ENTRY_SEGMENT: &str = "0_0";

/// Base score of the death sink under both objectives.
pub const DEATH_BASE_SCORE: f64 = -10.0;

/// Discount factor the director solves with.
pub const DEFAULT_GAMMA: f64 = 0.95;
/// Evaluation sweeps per improvement step.
pub const DEFAULT_POLICY_K: u32 = 20;
/// Sessions between objective flips in switch mode.
pub const DEFAULT_SWITCH_INTERVAL: u32 = 3;
