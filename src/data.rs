//! Serde data model for the authored segment catalog and graph topology.
//!
//! The tile table stays opaque to this crate: assembly concatenates rows of
//! text and never interprets individual characters.

use serde::{Deserialize, Serialize};
use smallvec::smallvec;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::constants::{KEY_DEATH, KEY_END, KEY_START, NUM_ROWS};
use crate::graph::{Edge, PolicyGraph, Segment};

const DEFAULT_LEVEL_DATA: &str = include_str!("../assets/data/levels.json");

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("failed to parse level data: {0}")]
    Parse(String),
    #[error("segment \"{segment}\" has {rows} tile rows, expected {NUM_ROWS}")]
    WrongRowCount { segment: String, rows: usize },
    #[error("segment \"{0}\" has tile rows of unequal width")]
    RaggedRows(String),
    #[error("edge \"{src}\" -> \"{tgt}\" references an undeclared segment")]
    UnknownEndpoint { src: String, tgt: String },
    #[error("edge \"{src}\" -> \"{tgt}\" carries a malformed link block")]
    BadLink { src: String, tgt: String },
}

/// Authored description of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SegmentDef {
    /// Fixed-height ASCII tile block, one string per row.
    pub tiles: Vec<String>,
    #[serde(default)]
    pub difficulty: f64,
    #[serde(default)]
    pub enjoyability: f64,
    #[serde(default)]
    pub depth: u32,
}

/// Authored edge; landing distributions start deterministic and are learned
/// online.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDef {
    pub src: String,
    pub tgt: String,
    /// Transition tile blocks, each `NUM_ROWS` rows of equal width.
    #[serde(default)]
    pub links: Vec<Vec<String>>,
}

/// The full authored level-design table: segment catalog plus graph
/// topology. Edge order defines neighbor order, which the solver uses for
/// tie-breaking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LevelData {
    #[serde(default)]
    pub segments: BTreeMap<String, SegmentDef>,
    #[serde(default)]
    pub edges: Vec<EdgeDef>,
}

impl LevelData {
    /// Parse level data from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        serde_json::from_str(json).map_err(|e| DataError::Parse(e.to_string()))
    }

    /// Built-in catalog shipped with the crate.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_LEVEL_DATA).unwrap_or_default()
    }

    /// Check tile-block shapes and edge endpoints.
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found.
    pub fn validate(&self) -> Result<(), DataError> {
        for (name, def) in &self.segments {
            if def.tiles.len() != NUM_ROWS {
                return Err(DataError::WrongRowCount {
                    segment: name.clone(),
                    rows: def.tiles.len(),
                });
            }
            let width = def.tiles[0].len();
            if def.tiles.iter().any(|row| row.len() != width) {
                return Err(DataError::RaggedRows(name.clone()));
            }
        }
        for edge in &self.edges {
            if !self.is_known(&edge.src) || !self.is_known(&edge.tgt) {
                return Err(DataError::UnknownEndpoint {
                    src: edge.src.clone(),
                    tgt: edge.tgt.clone(),
                });
            }
            for block in &edge.links {
                let well_formed = block.len() == NUM_ROWS
                    && block.iter().all(|row| row.len() == block[0].len());
                if !well_formed {
                    return Err(DataError::BadLink {
                        src: edge.src.clone(),
                        tgt: edge.tgt.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn is_known(&self, name: &str) -> bool {
        self.segments.contains_key(name)
            || name == KEY_START
            || name == KEY_DEATH
            || name == KEY_END
    }

    /// Read-only copy of the tile table keyed by segment name.
    #[must_use]
    pub fn tile_table(&self) -> BTreeMap<String, Vec<String>> {
        self.segments
            .iter()
            .map(|(name, def)| (name.clone(), def.tiles.clone()))
            .collect()
    }

    /// Build the runtime graph: sentinels, one node per segment, one edge per
    /// authored hop with the initial landing distribution
    /// `[(tgt, 1.0), (death, 0.0)]`.
    ///
    /// # Errors
    ///
    /// Returns an error if [`Self::validate`] rejects the data.
    pub fn build_graph(&self) -> Result<PolicyGraph, DataError> {
        self.validate()?;
        let mut graph = PolicyGraph::with_sentinels();
        for (name, def) in &self.segments {
            graph.add_node(Segment::new(
                name.clone(),
                def.difficulty,
                def.enjoyability,
                def.depth,
                false,
                Vec::new(),
            ));
        }
        for def in &self.edges {
            let mut edge = Edge::new(
                def.src.clone(),
                def.tgt.clone(),
                smallvec![(def.tgt.clone(), 1.0), (KEY_DEATH.to_string(), 0.0)],
            );
            edge.links = def.links.clone();
            graph.add_edge(edge);
        }
        Ok(graph)
    }
}
