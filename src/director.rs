//! Online director: learns from finished attempts and assembles the next
//! playable level from the solver's policy.
//!
//! The director exclusively owns the graph; the solver borrows it for the
//! duration of a single `policy_iteration` call. Everything here runs on the
//! host's game loop thread, one attempt in flight at a time.

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use smallvec::smallvec;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::constants::{
    DEFAULT_ENTRY_SEGMENT, DEFAULT_GAMMA, DEFAULT_POLICY_K, DEFAULT_SWITCH_INTERVAL, KEY_DEATH,
    KEY_END, KEY_START, NUM_ROWS,
};
use crate::data::{DataError, LevelData};
use crate::graph::{Edge, GraphError, PolicyGraph};
use crate::solver::{self, Backup, EvalStrategy, Policy, SweepStyle};

const DEFAULT_DIRECTOR_DATA: &str = include_str!("../assets/data/director.json");

/// Launch flag forcing the objective-switching session type.
pub const ENV_FORCE_BOTH: &str = "DIRECTOR_FORCE_BOTH";

/// What the session optimizes for the whole playthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    /// Uniform-random policy, no optimization.
    Random,
    /// Optimize authored difficulty scores.
    Difficulty,
    /// Optimize authored enjoyability scores.
    Enjoyment,
    /// Alternate between the two objectives on a fixed cadence.
    Both,
}

/// Director tuning, loaded from `assets/data/director.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorConfig {
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    #[serde(default = "default_policy_k")]
    pub policy_k: u32,
    #[serde(default = "default_switch_interval")]
    pub switch_interval: u32,
    #[serde(default = "default_entry_segment")]
    pub entry_segment: String,
    /// Forces the session type instead of the uniform draw.
    #[serde(default)]
    pub session_override: Option<SessionType>,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            gamma: default_gamma(),
            policy_k: default_policy_k(),
            switch_interval: default_switch_interval(),
            entry_segment: default_entry_segment(),
            session_override: None,
        }
    }
}

impl DirectorConfig {
    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_DIRECTOR_DATA).unwrap_or_default()
    }

    /// Builder-style session override.
    #[must_use]
    pub fn with_session_override(mut self, session_type: SessionType) -> Self {
        self.session_override = Some(session_type);
        self
    }

    /// Apply the launch flag, if set in the environment.
    #[must_use]
    pub fn with_env_override(mut self) -> Self {
        let forced = std::env::var(ENV_FORCE_BOTH)
            .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        if forced {
            self.session_override = Some(SessionType::Both);
        }
        self
    }
}

fn default_gamma() -> f64 {
    DEFAULT_GAMMA
}

fn default_policy_k() -> u32 {
    DEFAULT_POLICY_K
}

fn default_switch_interval() -> u32 {
    DEFAULT_SWITCH_INTERVAL
}

fn default_entry_segment() -> String {
    DEFAULT_ENTRY_SEGMENT.to_string()
}

#[derive(Debug, Error, PartialEq)]
pub enum DirectorError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("policy has no candidate actions for \"{0}\"")]
    EmptyPolicy(String),
    #[error("segment \"{0}\" has no tile data")]
    MissingTiles(String),
}

/// Snapshot of director state for the host's telemetry sink. The director
/// performs no I/O itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptTelemetry {
    pub session_type: SessionType,
    pub optimize_difficulty: bool,
    pub sessions_played: u32,
    pub losses_in_a_row: u32,
    pub active_segment_keys: Vec<String>,
}

/// Stateful orchestrator over the graph and solver.
pub struct AdaptiveDirector {
    graph: PolicyGraph,
    tiles: BTreeMap<String, Vec<String>>,
    config: DirectorConfig,
    session_type: SessionType,
    optimize_difficulty: bool,
    losses_in_a_row: u32,
    player_won_last_session: bool,
    sessions_played: u32,
    active_segment_keys: Vec<String>,
    columns_per_segment: Vec<usize>,
    rng: ChaCha20Rng,
}

impl AdaptiveDirector {
    /// Construct around an offline-built graph and tile table. The session
    /// type is drawn uniformly unless the config overrides it.
    #[must_use]
    pub fn new(
        mut graph: PolicyGraph,
        tiles: BTreeMap<String, Vec<String>>,
        config: DirectorConfig,
        seed: u64,
    ) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let session_type = match config.session_override {
            Some(forced) => forced,
            None => match rng.gen_range(0..4u8) {
                0 => SessionType::Random,
                1 => SessionType::Difficulty,
                2 => SessionType::Enjoyment,
                _ => SessionType::Both,
            },
        };
        let optimize_difficulty = session_type == SessionType::Difficulty;
        for segment in graph.segments_mut() {
            segment.update_reward(optimize_difficulty);
        }
        info!("director session type {session_type:?}");
        Self {
            graph,
            tiles,
            config,
            session_type,
            optimize_difficulty,
            losses_in_a_row: 0,
            player_won_last_session: false,
            sessions_played: 0,
            active_segment_keys: Vec::new(),
            columns_per_segment: Vec::new(),
            rng,
        }
    }

    /// Convenience constructor from authored level data.
    ///
    /// # Errors
    ///
    /// Returns an error if the level data fails validation.
    pub fn from_level_data(
        data: &LevelData,
        config: DirectorConfig,
        seed: u64,
    ) -> Result<Self, DataError> {
        Ok(Self::new(data.build_graph()?, data.tile_table(), config, seed))
    }

    /// Record the outcome of one finished attempt; called exactly once per
    /// attempt, before the next [`Self::get`].
    ///
    /// # Errors
    ///
    /// Returns an error if the previous chain references names missing from
    /// the graph, which indicates a corrupted catalog.
    pub fn update(
        &mut self,
        player_won: bool,
        furthest_column_reached: usize,
    ) -> Result<(), DirectorError> {
        self.sessions_played += 1;
        if self.session_type == SessionType::Both
            && self.config.switch_interval > 0
            && self.sessions_played % self.config.switch_interval == 0
        {
            self.optimize_difficulty = !self.optimize_difficulty;
            let optimize_difficulty = self.optimize_difficulty;
            for segment in self.graph.segments_mut() {
                segment.update_reward(optimize_difficulty);
            }
            debug!("objective flipped; optimize_difficulty={optimize_difficulty}");
        }

        let scored = self.percent_completed(player_won, furthest_column_reached);
        for (key, percent) in &scored {
            if *percent >= 1.0 && !self.graph.has_edge(KEY_START, key) {
                // A fully cleared segment becomes a future entry point.
                self.graph.add_edge(Edge::new(
                    KEY_START.to_string(),
                    key.clone(),
                    smallvec![(key.clone(), 1.0), (KEY_DEATH.to_string(), 0.0)],
                ));
                debug!("unlocked entry edge start -> {key}");
            }

            let node = self
                .graph
                .node_mut(key)
                .ok_or_else(|| GraphError::UnknownSegment(key.clone()))?;
            node.visited_count += 1;
            node.sum_percent_completed += percent;
            node.update_reward(self.optimize_difficulty);
            let survival = node.survival_rate();

            // The survival estimate belongs to the segment, so every edge
            // landing on it shares the same distribution.
            for edge in self.graph.edges_mut() {
                if edge.tgt != *key {
                    continue;
                }
                if let Some(slot) = edge.outcomes.get_mut(0) {
                    *slot = (key.clone(), survival);
                }
                if let Some(slot) = edge.outcomes.get_mut(1) {
                    *slot = (KEY_DEATH.to_string(), 1.0 - survival);
                }
            }
            debug!("segment {key}: percent={percent:.3} survival={survival:.3}");
        }

        if !player_won {
            self.losses_in_a_row += 1;
            self.prune_entry_edges();
        }
        self.player_won_last_session = player_won;
        Ok(())
    }

    /// Assemble the next playable level: up to `level_segment_budget` hops
    /// beyond the seeded start, stitched into `NUM_ROWS` rows of text.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy or tile catalog is inconsistent with
    /// the graph.
    pub fn get(&mut self, level_segment_budget: usize) -> Result<Vec<String>, DirectorError> {
        let policy = if self.session_type == SessionType::Random {
            solver::random_policy(&self.graph)
        } else {
            let strategy = EvalStrategy {
                backup: Backup::RandomCandidate,
                sweep: SweepStyle::InPlace,
            };
            solver::policy_iteration(
                &mut self.graph,
                self.config.gamma,
                strategy,
                self.config.policy_k,
                true,
                &mut self.rng,
            )?
        };

        let mut chain: Vec<String> = vec![KEY_START.to_string()];
        if self.player_won_last_session {
            // A win lets the walk skip ahead; a loss restarts from the entry.
            let seeded = self.sample_candidate(&policy, KEY_START)?;
            chain.push(seeded);
        }
        for _ in 0..level_segment_budget {
            let current = chain[chain.len() - 1].clone();
            let Some(candidates) = policy.get(&current).filter(|c| !c.is_empty()) else {
                break;
            };
            let next = candidates[self.rng.gen_range(0..candidates.len())].clone();
            if next == KEY_END {
                break;
            }
            chain.push(next);
        }
        chain.remove(0);

        let mut rows = vec![String::new(); NUM_ROWS];
        let mut columns_per_segment = Vec::with_capacity(chain.len());
        for (i, key) in chain.iter().enumerate() {
            let tiles = self
                .tiles
                .get(key)
                .ok_or_else(|| DirectorError::MissingTiles(key.clone()))?;
            let mut width = tiles.first().map_or(0, String::len);
            if i > 0 {
                // Stitch the traversed edge's link columns ahead of this
                // segment; they count toward its recorded width.
                let edge = self.graph.require_edge(&chain[i - 1], key)?;
                for block in &edge.links {
                    width += block.first().map_or(0, String::len);
                    for (row, link_row) in rows.iter_mut().zip(block) {
                        row.push_str(link_row);
                    }
                }
            }
            for (row, tile_row) in rows.iter_mut().zip(tiles) {
                row.push_str(tile_row);
            }
            columns_per_segment.push(width);
        }

        debug!("assembled chain {chain:?} ({columns_per_segment:?} columns)");
        self.active_segment_keys = chain;
        self.columns_per_segment = columns_per_segment;
        Ok(rows)
    }

    /// Per-segment completion fractions for the previous chain. On a loss
    /// the walk consumes the furthest column against the recorded segment
    /// widths and stops at the segment where the budget runs out; later
    /// segments stay unscored.
    fn percent_completed(&self, player_won: bool, furthest_column: usize) -> Vec<(String, f64)> {
        let mut scored = Vec::new();
        if player_won {
            for key in &self.active_segment_keys {
                scored.push((key.clone(), 1.0));
            }
            return scored;
        }
        let mut remaining = furthest_column as f64;
        for (key, width) in self
            .active_segment_keys
            .iter()
            .zip(&self.columns_per_segment)
        {
            let width = *width as f64;
            if width > 0.0 && remaining >= width {
                scored.push((key.clone(), 1.0));
                remaining -= width;
            } else {
                let fraction = if width > 0.0 { remaining / width } else { 0.0 };
                scored.push((key.clone(), fraction));
                break;
            }
        }
        scored
    }

    /// Compounding entry pruning: one round per loss in the current streak.
    /// Each round removes the shallowest (ties: hardest) non-canonical entry
    /// neighbor, stopping before the entry point would be stranded.
    fn prune_entry_edges(&mut self) {
        for _ in 0..self.losses_in_a_row {
            let Some(neighbors) = self.graph.neighbors(KEY_START) else {
                break;
            };
            if neighbors.len() <= 1 {
                break;
            }
            let mut victim: Option<(String, u32, f64)> = None;
            for key in neighbors {
                if *key == self.config.entry_segment {
                    continue;
                }
                let Some(node) = self.graph.node(key) else {
                    continue;
                };
                let better = match &victim {
                    None => true,
                    Some((_, depth, difficulty)) => {
                        node.depth < *depth
                            || (node.depth == *depth && node.difficulty > *difficulty)
                    }
                };
                if better {
                    victim = Some((key.clone(), node.depth, node.difficulty));
                }
            }
            let Some((key, _, _)) = victim else {
                break;
            };
            debug!(
                "pruning entry edge start -> {key} (loss streak {})",
                self.losses_in_a_row
            );
            self.graph.remove_edge(KEY_START, &key);
        }
    }

    fn sample_candidate(&mut self, policy: &Policy, key: &str) -> Result<String, DirectorError> {
        let candidates = policy
            .get(key)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| DirectorError::EmptyPolicy(key.to_string()))?;
        Ok(candidates[self.rng.gen_range(0..candidates.len())].clone())
    }

    #[must_use]
    pub fn telemetry(&self) -> AttemptTelemetry {
        AttemptTelemetry {
            session_type: self.session_type,
            optimize_difficulty: self.optimize_difficulty,
            sessions_played: self.sessions_played,
            losses_in_a_row: self.losses_in_a_row,
            active_segment_keys: self.active_segment_keys.clone(),
        }
    }

    #[must_use]
    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    #[must_use]
    pub fn sessions_played(&self) -> u32 {
        self.sessions_played
    }

    #[must_use]
    pub fn active_segment_keys(&self) -> &[String] {
        &self.active_segment_keys
    }

    #[must_use]
    pub fn columns_per_segment(&self) -> &[usize] {
        &self.columns_per_segment
    }

    #[must_use]
    pub fn graph(&self) -> &PolicyGraph {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(width: usize) -> Vec<String> {
        (0..NUM_ROWS).map(|_| "X".repeat(width)).collect()
    }

    /// start -> 0_0 -> 1_0 -> end, ten columns per segment.
    fn linear_data() -> LevelData {
        let json = serde_json::json!({
            "segments": {
                "0_0": { "tiles": rows(10), "difficulty": -0.2, "enjoyability": 0.4, "depth": 0 },
                "1_0": { "tiles": rows(10), "difficulty": -0.8, "enjoyability": 0.7, "depth": 1 }
            },
            "edges": [
                { "src": "start", "tgt": "0_0" },
                { "src": "0_0", "tgt": "1_0" },
                { "src": "1_0", "tgt": "end" }
            ]
        });
        LevelData::from_json(&json.to_string()).unwrap()
    }

    fn forked_entry_data() -> LevelData {
        let json = serde_json::json!({
            "segments": {
                "0_0": { "tiles": rows(8), "difficulty": -0.2, "enjoyability": 0.4, "depth": 0 },
                "1_0": { "tiles": rows(8), "difficulty": -0.8, "enjoyability": 0.7, "depth": 1 },
                "1_1": { "tiles": rows(8), "difficulty": -1.2, "enjoyability": 0.9, "depth": 1 }
            },
            "edges": [
                { "src": "start", "tgt": "0_0" },
                { "src": "start", "tgt": "1_0" },
                { "src": "start", "tgt": "1_1" },
                { "src": "0_0", "tgt": "end" },
                { "src": "1_0", "tgt": "end" },
                { "src": "1_1", "tgt": "end" }
            ]
        });
        LevelData::from_json(&json.to_string()).unwrap()
    }

    fn director(data: &LevelData, session_type: SessionType, seed: u64) -> AdaptiveDirector {
        let config = DirectorConfig::default().with_session_override(session_type);
        AdaptiveDirector::from_level_data(data, config, seed).unwrap()
    }

    #[test]
    fn loss_scores_only_reached_segments() {
        let data = linear_data();
        let mut d = director(&data, SessionType::Difficulty, 17);
        d.get(5).unwrap();
        assert_eq!(d.active_segment_keys(), ["0_0", "1_0"]);
        assert_eq!(d.columns_per_segment(), [10, 10]);

        d.update(false, 5).unwrap();

        let first = d.graph().node("0_0").unwrap();
        assert_eq!(first.visited_count, 2);
        assert!((first.sum_percent_completed - 1.5).abs() < 1e-12);
        // The walk stops at the segment where the columns ran out.
        let second = d.graph().node("1_0").unwrap();
        assert_eq!(second.visited_count, 1);
        assert!((second.sum_percent_completed - 1.0).abs() < 1e-12);
    }

    #[test]
    fn survival_rate_overwrites_every_inbound_edge() {
        let data = linear_data();
        let mut d = director(&data, SessionType::Difficulty, 17);
        d.get(5).unwrap();
        d.update(false, 5).unwrap();

        let entry = d.graph().edge(KEY_START, "0_0").unwrap();
        assert_eq!(entry.outcomes[0], ("0_0".to_string(), 0.75));
        assert_eq!(entry.outcomes[1], (KEY_DEATH.to_string(), 0.25));
    }

    #[test]
    fn reward_invariant_holds_after_update() {
        let data = linear_data();
        let mut d = director(&data, SessionType::Difficulty, 17);
        d.get(5).unwrap();
        d.update(false, 5).unwrap();

        let node = d.graph().node("0_0").unwrap();
        assert!((node.reward - node.difficulty * f64::from(node.visited_count)).abs() < 1e-12);

        let mut e = director(&data, SessionType::Enjoyment, 17);
        e.get(5).unwrap();
        e.update(true, 0).unwrap();
        let node = e.graph().node("0_0").unwrap();
        assert!(
            (node.reward - node.enjoyability * f64::from(node.visited_count)).abs() < 1e-12
        );
    }

    #[test]
    fn win_unlocks_cleared_segments_as_entries() {
        let data = linear_data();
        let mut d = director(&data, SessionType::Difficulty, 17);
        d.get(5).unwrap();
        assert!(!d.graph().has_edge(KEY_START, "1_0"));

        d.update(true, 0).unwrap();

        assert!(d.graph().has_edge(KEY_START, "1_0"));
        assert!(
            d.graph()
                .neighbors(KEY_START)
                .unwrap()
                .contains(&"1_0".to_string())
        );
        // Fresh survival estimate for the cleared segment: 2/2.
        let unlocked = d.graph().edge(KEY_START, "1_0").unwrap();
        assert_eq!(unlocked.outcomes[0], ("1_0".to_string(), 1.0));
        assert_eq!(unlocked.outcomes[1], (KEY_DEATH.to_string(), 0.0));
    }

    #[test]
    fn entry_pruning_never_strands_start() {
        let data = forked_entry_data();
        let mut d = director(&data, SessionType::Difficulty, 23);

        d.update(false, 0).unwrap();
        // Streak of one: the shallowest non-canonical entry goes first; depth
        // ties break toward the larger (easier) difficulty.
        assert_eq!(d.graph().neighbors(KEY_START).unwrap(), ["0_0", "1_1"]);

        d.update(false, 0).unwrap();
        assert_eq!(d.graph().neighbors(KEY_START).unwrap(), ["0_0"]);

        d.update(false, 0).unwrap();
        assert_eq!(d.graph().neighbors(KEY_START).unwrap(), ["0_0"]);
    }

    #[test]
    fn loss_streak_survives_wins() {
        // Four entry points so the compounded pruning stays observable after
        // the intervening win.
        let json = serde_json::json!({
            "segments": {
                "0_0": { "tiles": rows(8), "difficulty": -0.2, "enjoyability": 0.4, "depth": 0 },
                "1_0": { "tiles": rows(8), "difficulty": -0.8, "enjoyability": 0.7, "depth": 1 },
                "1_1": { "tiles": rows(8), "difficulty": -1.2, "enjoyability": 0.9, "depth": 1 },
                "2_0": { "tiles": rows(8), "difficulty": -0.5, "enjoyability": 0.6, "depth": 2 }
            },
            "edges": [
                { "src": "start", "tgt": "0_0" },
                { "src": "start", "tgt": "1_0" },
                { "src": "start", "tgt": "1_1" },
                { "src": "start", "tgt": "2_0" },
                { "src": "0_0", "tgt": "end" },
                { "src": "1_0", "tgt": "end" },
                { "src": "1_1", "tgt": "end" },
                { "src": "2_0", "tgt": "end" }
            ]
        });
        let data = LevelData::from_json(&json.to_string()).unwrap();
        let mut d = director(&data, SessionType::Difficulty, 17);

        // Streak of one: a single pruning round removes "1_0".
        d.update(false, 0).unwrap();
        assert_eq!(d.telemetry().losses_in_a_row, 1);
        assert_eq!(
            d.graph().neighbors(KEY_START).unwrap(),
            ["0_0", "1_1", "2_0"]
        );

        // A win neither resets the streak nor prunes anything.
        d.update(true, 0).unwrap();
        assert_eq!(d.telemetry().losses_in_a_row, 1);
        assert_eq!(d.graph().neighbors(KEY_START).unwrap().len(), 3);

        // The next loss compounds to two rounds, removing both remaining
        // non-canonical entries in one update.
        d.update(false, 0).unwrap();
        assert_eq!(d.telemetry().losses_in_a_row, 2);
        assert_eq!(d.graph().neighbors(KEY_START).unwrap(), ["0_0"]);
    }

    #[test]
    fn both_mode_flips_objective_every_third_session() {
        let data = linear_data();
        let mut d = director(&data, SessionType::Both, 31);
        assert!(!d.telemetry().optimize_difficulty);
        d.update(false, 0).unwrap();
        d.update(false, 0).unwrap();
        assert!(!d.telemetry().optimize_difficulty);
        d.update(false, 0).unwrap();
        assert!(d.telemetry().optimize_difficulty);
        // Rewards recomputed for the new objective.
        let node = d.graph().node("1_0").unwrap();
        assert!((node.reward - node.difficulty * f64::from(node.visited_count)).abs() < 1e-12);
    }

    #[test]
    fn win_seeds_the_walk_one_hop_deeper() {
        let data = linear_data();
        let mut d = director(&data, SessionType::Random, 41);
        let level = d.get(1).unwrap();
        assert_eq!(d.active_segment_keys(), ["0_0"]);
        assert_eq!(level.len(), NUM_ROWS);

        d.update(true, 0).unwrap();
        d.get(1).unwrap();
        assert_eq!(d.active_segment_keys(), ["0_0", "1_0"]);
    }

    #[test]
    fn link_blocks_widen_the_following_segment() {
        let json = serde_json::json!({
            "segments": {
                "0_0": { "tiles": rows(10), "difficulty": -0.2, "enjoyability": 0.4, "depth": 0 },
                "1_0": { "tiles": rows(10), "difficulty": -0.8, "enjoyability": 0.7, "depth": 1 }
            },
            "edges": [
                { "src": "start", "tgt": "0_0" },
                {
                    "src": "0_0",
                    "tgt": "1_0",
                    "links": [vec!["--".to_string(); NUM_ROWS], vec!["^^^".to_string(); NUM_ROWS]]
                },
                { "src": "1_0", "tgt": "end" }
            ]
        });
        let data = LevelData::from_json(&json.to_string()).unwrap();
        let mut d = director(&data, SessionType::Difficulty, 7);

        let level = d.get(5).unwrap();
        assert_eq!(d.active_segment_keys(), ["0_0", "1_0"]);
        assert_eq!(d.columns_per_segment(), [10, 15]);
        assert_eq!(level.len(), NUM_ROWS);
        for row in &level {
            assert_eq!(row.len(), 25);
        }
        assert_eq!(level[0], format!("{}--^^^{}", "X".repeat(10), "X".repeat(10)));
    }

    #[test]
    fn uniform_draw_reaches_every_session_type() {
        let data = linear_data();
        let mut seen = Vec::new();
        for seed in 0..100 {
            let d = AdaptiveDirector::from_level_data(&data, DirectorConfig::default(), seed)
                .unwrap();
            if !seen.contains(&d.session_type()) {
                seen.push(d.session_type());
            }
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn telemetry_serializes_for_the_host() {
        let data = linear_data();
        let mut d = director(&data, SessionType::Enjoyment, 13);
        d.get(3).unwrap();
        d.update(false, 4).unwrap();

        let value = serde_json::to_value(d.telemetry()).unwrap();
        assert_eq!(value["session_type"], "enjoyment");
        assert_eq!(value["sessions_played"], 1);
        assert_eq!(value["losses_in_a_row"], 1);
        assert!(value["active_segment_keys"].is_array());
    }

    #[test]
    fn env_flag_forces_the_objective_switching_session() {
        unsafe { std::env::set_var(ENV_FORCE_BOTH, "1") };
        let forced = DirectorConfig::default().with_env_override();
        assert_eq!(forced.session_override, Some(SessionType::Both));

        unsafe { std::env::set_var(ENV_FORCE_BOTH, "TRUE") };
        let forced = DirectorConfig::default().with_env_override();
        assert_eq!(forced.session_override, Some(SessionType::Both));

        unsafe { std::env::set_var(ENV_FORCE_BOTH, "0") };
        let ignored = DirectorConfig::default().with_env_override();
        assert_eq!(ignored.session_override, None);

        unsafe { std::env::remove_var(ENV_FORCE_BOTH) };
        let unset = DirectorConfig::default().with_env_override();
        assert_eq!(unset.session_override, None);
    }

    #[test]
    fn config_override_beats_uniform_draw() {
        let config = DirectorConfig::default().with_session_override(SessionType::Both);
        assert_eq!(config.session_override, Some(SessionType::Both));
        let loaded = DirectorConfig::load_from_static();
        assert_eq!(loaded.session_override, None);
        assert_eq!(loaded.entry_segment, "0_0");
        assert!((loaded.gamma - 0.95).abs() < 1e-12);
        assert_eq!(loaded.policy_k, 20);
    }
}
