//! K diverse alternative routes via iterative edge penalization
//!
//! Each accepted route adds a surcharge onto its edges, pushing the
//! next search toward different parts of the network. A candidate is
//! accepted only when its edge overlap with every route found so far
//! stays under the configured limit, so near-duplicates of the best
//! path are filtered out rather than returned.

use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use log::trace;
use petgraph::graph::EdgeIndex;

use super::astar::{SearchPath, astar_search};
use super::{CancelToken, Route, RouteMode};
use crate::Error;
use crate::config::RouterConfig;
use crate::model::{NodeId, RoadGraph};

/// Up to `k` loopless routes with meaningfully different edge sets,
/// best route first. Fewer are returned when the network does not
/// offer enough distinct paths.
///
/// # Errors
///
/// Returns [`Error::UnknownNode`] when either id is absent from the
/// graph.
pub fn find_alternatives(
    graph: &RoadGraph,
    config: &RouterConfig,
    start: NodeId,
    end: NodeId,
    mode: RouteMode,
    k: usize,
) -> Result<Vec<Route>, Error> {
    find_alternatives_with_cancel(graph, config, start, end, mode, k, &CancelToken::new())
}

/// [`find_alternatives`] with cooperative cancellation.
pub fn find_alternatives_with_cancel(
    graph: &RoadGraph,
    config: &RouterConfig,
    start: NodeId,
    end: NodeId,
    mode: RouteMode,
    k: usize,
    cancel: &CancelToken,
) -> Result<Vec<Route>, Error> {
    if k == 0 {
        return Ok(Vec::new());
    }
    let start_idx = graph.node_index(start).ok_or(Error::UnknownNode(start))?;
    let end_idx = graph.node_index(end).ok_or(Error::UnknownNode(end))?;

    let snapshot = graph.risk_snapshot();
    let penalty_m = mode.penalty_m(config);

    let mut accepted: Vec<SearchPath> = Vec::new();
    let mut accepted_sets: Vec<HashSet<EdgeIndex>> = Vec::new();
    let mut surcharges: HashMap<EdgeIndex, f64> = HashMap::new();

    // A few extra attempts beyond k: some iterations only reshuffle
    // penalties without producing a sufficiently distinct candidate.
    let max_attempts = k.saturating_mul(3).max(4);
    for attempt in 0..max_attempts {
        if accepted.len() >= k {
            break;
        }

        let Some(candidate) = astar_search(
            graph,
            &snapshot,
            start_idx,
            end_idx,
            penalty_m,
            config.impassable_threshold,
            &surcharges,
            cancel,
        )?
        else {
            // Penalties never block edges, so an empty result means
            // the pair is genuinely disconnected: no point retrying
            break;
        };

        let candidate_set: HashSet<EdgeIndex> = candidate.edges.iter().copied().collect();
        let distinct = accepted_sets
            .iter()
            .all(|set| overlap_share(&candidate_set, set) <= config.alternative_overlap_limit);

        // Penalize the candidate's edges either way, so the next
        // iteration explores further afield.
        for &edge in &candidate.edges {
            let increment = graph.graph[edge].length_m * config.alternative_penalty_factor;
            *surcharges.entry(edge).or_insert(0.0) += increment;
        }

        if distinct {
            accepted.push(candidate);
            accepted_sets.push(candidate_set);
        } else {
            trace!("Alternative attempt {attempt} overlapped too much, retrying");
        }
    }

    // Penalty cycling can resurface an identical edge sequence;
    // callers are promised no duplicates.
    let routes = accepted
        .iter()
        .unique_by(|path| path.edges.clone())
        .map(|path| super::build_route(graph, &snapshot, config, path))
        .collect();
    Ok(routes)
}

/// Share of `candidate` edges already present in `other`.
fn overlap_share(candidate: &HashSet<EdgeIndex>, other: &HashSet<EdgeIndex>) -> f64 {
    if candidate.is_empty() {
        return 1.0;
    }
    let shared = candidate.intersection(other).count();
    shared as f64 / candidate.len() as f64
}
