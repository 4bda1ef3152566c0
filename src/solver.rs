//! Policy and value iteration over a [`PolicyGraph`].
//!
//! All functions borrow the graph for the duration of one call; utilities are
//! the only node state they touch. Callers pass the RNG so seeded runs are
//! reproducible.

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

use crate::graph::{GraphError, PolicyGraph};

/// Candidate action sets per non-terminal node. A candidate is the name of a
/// neighbor; taking it means traversing that edge and sampling its landing
/// distribution.
pub type Policy = BTreeMap<String, Vec<String>>;

/// How a sweep commits freshly computed utilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStyle {
    /// Jacobi: buffer the whole sweep, commit at the end.
    Buffered,
    /// Gauss-Seidel: overwrite immediately so later nodes in the same sweep
    /// see fresher values.
    InPlace,
}

/// Which action a sweep backs up for each node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backup {
    /// Pure value iteration: the best neighbor action, ignoring any policy.
    Greedy,
    /// Policy evaluation: one uniformly random member of the node's current
    /// candidate set.
    RandomCandidate,
}

/// Evaluation strategy, resolved once per [`policy_iteration`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalStrategy {
    pub backup: Backup,
    pub sweep: SweepStyle,
}

/// Bellman backup for the action nominally leading `src -> tgt`: the
/// weighted sum over the edge's landing distribution of immediate reward
/// plus discounted utility.
pub fn utility_of_action(
    graph: &PolicyGraph,
    src: &str,
    tgt: &str,
    gamma: f64,
) -> Result<f64, GraphError> {
    let edge = graph.require_edge(src, tgt)?;
    let mut total = 0.0;
    for (landing, weight) in &edge.outcomes {
        let node = graph.require(landing)?;
        total += weight * (node.reward + gamma * node.utility);
    }
    Ok(total)
}

/// Best achievable one-step backup for a node; 0 for terminal nodes.
pub fn max_utility(graph: &PolicyGraph, name: &str, gamma: f64) -> Result<f64, GraphError> {
    let node = graph.require(name)?;
    if node.is_terminal {
        return Ok(0.0);
    }
    let mut best: Option<f64> = None;
    for neighbor in &node.neighbors {
        let utility = utility_of_action(graph, name, neighbor, gamma)?;
        best = Some(best.map_or(utility, |b| b.max(utility)));
    }
    Ok(best.unwrap_or(0.0))
}

/// One evaluation sweep over every node in the chosen style. Terminal and
/// candidate-less nodes back up to 0.
pub fn evaluate(
    graph: &mut PolicyGraph,
    policy: &Policy,
    strategy: EvalStrategy,
    gamma: f64,
    rng: &mut impl Rng,
) -> Result<(), GraphError> {
    let names: Vec<String> = graph.names().cloned().collect();
    let mut buffer: BTreeMap<String, f64> = BTreeMap::new();
    for name in &names {
        let value = match strategy.backup {
            Backup::Greedy => max_utility(graph, name, gamma)?,
            Backup::RandomCandidate => match policy.get(name).and_then(|c| c.choose(rng)) {
                Some(action) => utility_of_action(graph, name, action, gamma)?,
                None => 0.0,
            },
        };
        match strategy.sweep {
            SweepStyle::InPlace => graph.require_mut(name)?.utility = value,
            SweepStyle::Buffered => {
                buffer.insert(name.clone(), value);
            }
        }
    }
    if strategy.sweep == SweepStyle::Buffered {
        graph.set_utilities(&buffer);
    }
    Ok(())
}

/// Collapse each non-terminal node's candidate set to the first neighbor
/// whose action utility is strictly greater than the best seen so far
/// (stored neighbor order breaks ties toward earlier entries).
///
/// The returned change flag compares the new best against a uniformly random
/// sample of the node's previous candidate set, so it can fire or stay quiet
/// spuriously; [`policy_iteration`] tolerates that by always running one
/// extra cycle.
pub fn improve_policy(
    graph: &PolicyGraph,
    policy: &mut Policy,
    gamma: f64,
    rng: &mut impl Rng,
) -> Result<bool, GraphError> {
    let mut changed = false;
    let names: Vec<String> = graph.names().cloned().collect();
    for name in &names {
        let node = graph.require(name)?;
        if node.is_terminal {
            continue;
        }
        let mut best: Option<(String, f64)> = None;
        for neighbor in &node.neighbors {
            let utility = utility_of_action(graph, name, neighbor, gamma)?;
            if best.as_ref().is_none_or(|(_, b)| utility > *b) {
                best = Some((neighbor.clone(), utility));
            }
        }
        let Some((action, _)) = best else {
            continue;
        };
        match policy.get(name).and_then(|c| c.choose(rng)) {
            Some(previous) if previous == &action => {}
            _ => changed = true,
        }
        policy.insert(name.clone(), vec![action]);
    }
    Ok(changed)
}

/// Baseline policy: every non-terminal node's candidate set is its full
/// neighbor list.
#[must_use]
pub fn random_policy(graph: &PolicyGraph) -> Policy {
    graph
        .segments()
        .filter(|s| !s.is_terminal)
        .map(|s| (s.name.clone(), s.neighbors.clone()))
        .collect()
}

/// Alternate evaluation and improvement until the change signal goes quiet,
/// then run one extra unconditional cycle. Each outer iteration applies
/// `policy_k` evaluation sweeps before improving.
///
/// The returned policy is rebuilt from scratch: for every non-terminal node,
/// all neighbors tied for the maximum action utility, not just the single
/// action tracked during iteration.
pub fn policy_iteration(
    graph: &mut PolicyGraph,
    gamma: f64,
    strategy: EvalStrategy,
    policy_k: u32,
    reset_utility: bool,
    rng: &mut impl Rng,
) -> Result<Policy, GraphError> {
    if reset_utility {
        graph.reset_utilities();
    }
    let mut policy = random_policy(graph);
    loop {
        for _ in 0..policy_k {
            evaluate(graph, &policy, strategy, gamma, rng)?;
        }
        if !improve_policy(graph, &mut policy, gamma, rng)? {
            break;
        }
    }
    for _ in 0..policy_k {
        evaluate(graph, &policy, strategy, gamma, rng)?;
    }
    improve_policy(graph, &mut policy, gamma, rng)?;

    let mut result = Policy::new();
    for node in graph.segments() {
        if node.is_terminal {
            continue;
        }
        let mut utilities = Vec::with_capacity(node.neighbors.len());
        let mut best = f64::NEG_INFINITY;
        for neighbor in &node.neighbors {
            let utility = utility_of_action(graph, &node.name, neighbor, gamma)?;
            if utility > best {
                best = utility;
            }
            utilities.push((neighbor.clone(), utility));
        }
        let tied: Vec<String> = utilities
            .into_iter()
            .filter(|(_, u)| *u == best)
            .map(|(n, _)| n)
            .collect();
        result.insert(node.name.clone(), tied);
    }
    Ok(result)
}
