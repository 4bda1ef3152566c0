//! Directed probabilistic graph of level segments.
//!
//! Nodes are authored level segments; edges carry the landing distribution
//! observed when the player attempts the hop. The graph is built once from
//! static level data and then mutated in place for the life of the process.

use smallvec::SmallVec;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::constants::{DEATH_BASE_SCORE, KEY_DEATH, KEY_END, KEY_START};

/// A single landing possibility: segment name and its weight.
pub type Outcome = (String, f64);

/// Landing distribution of an edge. Entry 0 is the survive landing, entry 1
/// the death sink. Weights are not required to sum to 1 after online updates.
pub type OutcomeList = SmallVec<[Outcome; 2]>;

/// Lookup failures surface loudly; the catalog and graph are authored
/// together, so a miss is a programming error rather than runtime input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("unknown segment \"{0}\"")]
    UnknownSegment(String),
    #[error("no edge from \"{src}\" to \"{tgt}\"")]
    UnknownEdge { src: String, tgt: String },
}

/// One authored level segment.
///
/// `reward` and `utility` are solver-facing and mutated in place;
/// `difficulty`, `enjoyability` and `depth` are authored offline and never
/// change; the visit counters accumulate across attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub reward: f64,
    pub utility: f64,
    pub is_terminal: bool,
    /// Reachable segments in insertion order. Order matters: policy
    /// improvement breaks ties toward earlier neighbors.
    pub neighbors: Vec<String>,
    pub difficulty: f64,
    pub enjoyability: f64,
    /// Topological distance from the entry point, used only as a pruning
    /// tie-break.
    pub depth: u32,
    pub visited_count: u32,
    pub sum_percent_completed: f64,
}

impl Segment {
    #[must_use]
    pub fn new(
        name: String,
        difficulty: f64,
        enjoyability: f64,
        depth: u32,
        is_terminal: bool,
        neighbors: Vec<String>,
    ) -> Self {
        let mut segment = Self {
            name,
            reward: 0.0,
            utility: 0.0,
            is_terminal,
            neighbors,
            difficulty,
            enjoyability,
            depth,
            visited_count: 1,
            sum_percent_completed: 1.0,
        };
        segment.update_reward(true);
        segment
    }

    /// Recompute the reward for the active objective. Reward scales with the
    /// visit count, so frequently seen segments keep gaining weight; the
    /// growth law lives here and nowhere else.
    pub fn update_reward(&mut self, optimize_difficulty: bool) {
        let base = if optimize_difficulty {
            self.difficulty
        } else {
            self.enjoyability
        };
        self.reward = base * f64::from(self.visited_count);
    }

    /// Online estimate of the chance a player survives this segment.
    #[must_use]
    pub fn survival_rate(&self) -> f64 {
        self.sum_percent_completed / f64::from(self.visited_count)
    }
}

/// Directed edge with its landing distribution and transition tile blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub src: String,
    pub tgt: String,
    pub outcomes: OutcomeList,
    /// Tile-column blocks stitched ahead of `tgt` during level assembly.
    /// Unused by the solver.
    pub links: Vec<Vec<String>>,
}

impl Edge {
    #[must_use]
    pub fn new(src: String, tgt: String, outcomes: OutcomeList) -> Self {
        Self {
            src,
            tgt,
            outcomes,
            links: Vec::new(),
        }
    }
}

/// The segment graph. Ordered maps keep solver sweeps deterministic for a
/// given RNG seed.
#[derive(Debug, Clone, Default)]
pub struct PolicyGraph {
    nodes: BTreeMap<String, Segment>,
    edges: BTreeMap<(String, String), Edge>,
}

impl PolicyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty graph seeded with the three sentinel nodes: `start` (entry),
    /// `death` (terminal, strongly negative) and `end` (terminal, neutral).
    #[must_use]
    pub fn with_sentinels() -> Self {
        let mut graph = Self::default();
        graph.add_node(Segment::new(
            KEY_START.to_string(),
            0.0,
            0.0,
            0,
            false,
            Vec::new(),
        ));
        graph.add_node(Segment::new(
            KEY_DEATH.to_string(),
            DEATH_BASE_SCORE,
            DEATH_BASE_SCORE,
            0,
            true,
            Vec::new(),
        ));
        graph.add_node(Segment::new(
            KEY_END.to_string(),
            0.0,
            0.0,
            0,
            true,
            Vec::new(),
        ));
        graph
    }

    #[must_use]
    pub fn node(&self, name: &str) -> Option<&Segment> {
        self.nodes.get(name)
    }

    #[must_use]
    pub fn node_mut(&mut self, name: &str) -> Option<&mut Segment> {
        self.nodes.get_mut(name)
    }

    /// Like [`Self::node`] but failing loudly on a miss.
    pub fn require(&self, name: &str) -> Result<&Segment, GraphError> {
        self.nodes
            .get(name)
            .ok_or_else(|| GraphError::UnknownSegment(name.to_string()))
    }

    pub fn require_mut(&mut self, name: &str) -> Result<&mut Segment, GraphError> {
        self.nodes
            .get_mut(name)
            .ok_or_else(|| GraphError::UnknownSegment(name.to_string()))
    }

    #[must_use]
    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    #[must_use]
    pub fn has_edge(&self, src: &str, tgt: &str) -> bool {
        self.edges
            .contains_key(&(src.to_string(), tgt.to_string()))
    }

    pub fn add_node(&mut self, segment: Segment) {
        self.nodes.insert(segment.name.clone(), segment);
    }

    /// Insert an edge and register `tgt` as a neighbor of `src` if it is not
    /// one already.
    pub fn add_edge(&mut self, edge: Edge) {
        if let Some(node) = self.nodes.get_mut(&edge.src)
            && !node.neighbors.iter().any(|n| n == &edge.tgt)
        {
            node.neighbors.push(edge.tgt.clone());
        }
        self.edges.insert((edge.src.clone(), edge.tgt.clone()), edge);
    }

    #[must_use]
    pub fn edge(&self, src: &str, tgt: &str) -> Option<&Edge> {
        self.edges.get(&(src.to_string(), tgt.to_string()))
    }

    #[must_use]
    pub fn edge_mut(&mut self, src: &str, tgt: &str) -> Option<&mut Edge> {
        self.edges.get_mut(&(src.to_string(), tgt.to_string()))
    }

    pub fn require_edge(&self, src: &str, tgt: &str) -> Result<&Edge, GraphError> {
        self.edge(src, tgt).ok_or_else(|| GraphError::UnknownEdge {
            src: src.to_string(),
            tgt: tgt.to_string(),
        })
    }

    /// Delete one edge and drop `tgt` from `src`'s neighbor list. No
    /// probability rebalancing happens here; that belongs to
    /// [`Self::remove_node`] only.
    pub fn remove_edge(&mut self, src: &str, tgt: &str) -> bool {
        let removed = self
            .edges
            .remove(&(src.to_string(), tgt.to_string()))
            .is_some();
        if removed && let Some(node) = self.nodes.get_mut(src) {
            node.neighbors.retain(|n| n != tgt);
        }
        removed
    }

    /// Delete a node. Every edge whose landing distribution references the
    /// node first has that entry removed with its weight spread evenly over
    /// the remaining entries of the same edge (total mass per edge is
    /// conserved). All edges touching the node are then cascade-deleted and
    /// the name is scrubbed from every neighbor list.
    pub fn remove_node(&mut self, name: &str) -> bool {
        if !self.nodes.contains_key(name) {
            return false;
        }
        for edge in self.edges.values_mut() {
            let Some(idx) = edge.outcomes.iter().position(|(n, _)| n == name) else {
                continue;
            };
            let (_, weight) = edge.outcomes.remove(idx);
            if edge.outcomes.is_empty() {
                continue;
            }
            let share = weight / edge.outcomes.len() as f64;
            for (_, w) in &mut edge.outcomes {
                *w += share;
            }
        }
        self.edges
            .retain(|(src, tgt), _| src != name && tgt != name);
        for node in self.nodes.values_mut() {
            node.neighbors.retain(|n| n != name);
        }
        self.nodes.remove(name).is_some()
    }

    #[must_use]
    pub fn neighbors(&self, name: &str) -> Option<&[String]> {
        self.nodes.get(name).map(|n| n.neighbors.as_slice())
    }

    /// Overwrite utilities for the named segments.
    pub fn set_utilities(&mut self, utilities: &BTreeMap<String, f64>) {
        for (name, utility) in utilities {
            if let Some(node) = self.nodes.get_mut(name) {
                node.utility = *utility;
            }
        }
    }

    pub fn reset_utilities(&mut self) {
        for node in self.nodes.values_mut() {
            node.utility = 0.0;
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.nodes.keys()
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.nodes.values()
    }

    pub fn segments_mut(&mut self) -> impl Iterator<Item = &mut Segment> {
        self.nodes.values_mut()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.edges.values_mut()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
