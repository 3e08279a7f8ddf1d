use std::collections::{BTreeMap, BTreeSet, HashMap};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::core::event_data::{EventLog, Trace};
use crate::core::process_models::dependency_graph::{
    DependencyEdge, DependencyGraph, DependencyGraphError,
};
use crate::utils::Executor;

/// Separator between an activity and its occurrence number in unrolled logs
pub const OCCURRENCE_SEPARATOR: &str = "##";

///
/// Errors of the Agrawal miner
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgrawalError {
    /// Log does not contain a single activity
    EmptyLog,
    /// The mined graph violates the [`DependencyGraph`] invariants
    Graph(DependencyGraphError),
}

impl std::fmt::Display for AgrawalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgrawalError::EmptyLog => write!(f, "Event log contains no activities"),
            AgrawalError::Graph(e) => write!(f, "Invalid dependency graph: {e}"),
        }
    }
}

impl std::error::Error for AgrawalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AgrawalError::Graph(e) => Some(e),
            AgrawalError::EmptyLog => None,
        }
    }
}

impl From<DependencyGraphError> for AgrawalError {
    fn from(e: DependencyGraphError) -> Self {
        Self::Graph(e)
    }
}

///
/// Variant of the Agrawal algorithm, selected by the shape of the log
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum AgrawalAlgorithm {
    /// Every trace contains every activity exactly once
    SpecialDag,
    /// No trace repeats an activity
    GeneralDag,
    /// Some trace repeats an activity
    CyclicDag,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
/// Algorithm parameters for the Agrawal miner
pub struct AgrawalMinerConfig {
    /// Minimal number of (trace-frequency weighted) observations of an edge
    pub min_instances: u64,
    /// How to run the per-trace steps
    #[serde(default)]
    pub executor: Executor,
}

impl Default for AgrawalMinerConfig {
    fn default() -> Self {
        Self {
            min_instances: 1,
            executor: Executor::Sequential,
        }
    }
}

impl AgrawalMinerConfig {
    /// Serialize parameters to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
    /// Deserialize parameters from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Pairs `(u, v)` of distinct activities such that `u` occurs before `v` in `trace`
fn eventually_follows(trace: &Trace) -> BTreeSet<(String, String)> {
    let acts = trace.as_slice();
    let mut pairs = BTreeSet::new();
    for (i, u) in acts.iter().enumerate() {
        for v in &acts[i + 1..] {
            if u != v {
                pairs.insert((u.clone(), v.clone()));
            }
        }
    }
    pairs
}

///
/// Rename repeated occurrences of activities: the `k`-th repetition of `a` becomes `a##0k`
///
/// ```rust
/// use process_discovery::core::event_data::Trace;
/// use process_discovery::discovery::agrawal::unroll_trace;
///
/// assert_eq!(unroll_trace(&Trace::from("a b a a")), Trace::from("a b a##01 a##02"));
/// ```
pub fn unroll_trace(trace: &Trace) -> Trace {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    Trace::new(trace.iter().map(|a| {
        let count = seen.entry(a).or_insert(0);
        let label = if *count == 0 {
            a.to_string()
        } else {
            format!("{a}{OCCURRENCE_SEPARATOR}{:02}", *count)
        };
        *count += 1;
        label
    }))
}

/// Activity label of an (unrolled) occurrence label
pub fn base_label(label: &str) -> &str {
    match label.rsplit_once(OCCURRENCE_SEPARATOR) {
        Some((base, suffix))
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) =>
        {
            base
        }
        _ => label,
    }
}

///
/// Agrawal miner: discovers a [`DependencyGraph`] from an [`EventLog`]
///
/// ```rust
/// use process_discovery::discovery::agrawal::{AgrawalMinerConfig, AgrawalMinerInstance};
/// use process_discovery::event_log;
///
/// let log = event_log!("A B C D E", "A C D B E", "A C B D E");
/// let graph = AgrawalMinerInstance::new(AgrawalMinerConfig::default()).discover(&log).unwrap();
/// assert_eq!(graph.edges().len(), 5);
/// assert!(graph.contains_edge("C", "D"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AgrawalMinerInstance {
    config: AgrawalMinerConfig,
}

impl AgrawalMinerInstance {
    /// Miner with the given parameters
    pub fn new(config: AgrawalMinerConfig) -> Self {
        Self { config }
    }

    /// Parameters in use
    pub fn config(&self) -> &AgrawalMinerConfig {
        &self.config
    }

    /// Variant [`AgrawalMinerInstance::discover`] uses for `log`
    pub fn selected_algorithm(&self, log: &EventLog) -> AgrawalAlgorithm {
        let all = log.seen_activities();
        if log.distinct_traces().iter().any(|t| t.has_repeated_activities()) {
            AgrawalAlgorithm::CyclicDag
        } else if log.distinct_traces().iter().all(|t| t.len() == all.len()) {
            AgrawalAlgorithm::SpecialDag
        } else {
            AgrawalAlgorithm::GeneralDag
        }
    }

    /// Discover a dependency graph, selecting the algorithm by log shape
    pub fn discover(&self, log: &EventLog) -> Result<DependencyGraph, AgrawalError> {
        let algorithm = self.selected_algorithm(log);
        log::info!(
            "Agrawal miner ({algorithm:?}) on {} distinct traces",
            log.num_distinct_traces()
        );
        match algorithm {
            AgrawalAlgorithm::SpecialDag => self.special_dag(log),
            AgrawalAlgorithm::GeneralDag => self.general_dag(log),
            AgrawalAlgorithm::CyclicDag => self.cyclic_dag(log),
        }
    }

    ///
    /// Weighted eventually-follows edges of the log
    ///
    /// Counter of `(u, v)`: summed frequency of the traces in which `u` occurs before `v`.
    /// Edges observed less than `min_instances` times and pairs observed in both directions
    /// are dropped.
    ///
    fn ordering_edges(&self, log: &EventLog) -> Vec<DependencyEdge> {
        let traces: Vec<(&Trace, u64)> = log.iter().collect();
        let per_trace = self
            .config
            .executor
            .map(&traces, |(t, w)| (eventually_follows(t), *w));
        let mut counts: BTreeMap<(String, String), u64> = BTreeMap::new();
        for (pairs, w) in per_trace {
            for p in pairs {
                *counts.entry(p).or_insert(0) += w;
            }
        }
        counts.retain(|_, c| *c >= self.config.min_instances);
        let edges: Vec<DependencyEdge> = counts
            .iter()
            .filter(|((u, v), _)| !counts.contains_key(&(v.clone(), u.clone())))
            .map(|((u, v), c)| DependencyEdge::new(u.as_str(), v.as_str(), *c))
            .collect();
        log::debug!("{} one-directional ordering edges", edges.len());
        edges
    }

    fn nodes(log: &EventLog) -> Result<BTreeSet<String>, AgrawalError> {
        let nodes = log.seen_activities();
        if nodes.is_empty() {
            return Err(AgrawalError::EmptyLog);
        }
        Ok(nodes)
    }

    ///
    /// Special DAG variant: every trace contains every activity exactly once
    ///
    /// Transitive reduction of the one-directional ordering edges.
    ///
    pub fn special_dag(&self, log: &EventLog) -> Result<DependencyGraph, AgrawalError> {
        let nodes = Self::nodes(log)?;
        let graph = DependencyGraph::new(nodes, self.ordering_edges(log), false)?;
        Ok(graph.transitive_reduction())
    }

    ///
    /// General DAG variant: no trace repeats an activity
    ///
    /// Drops the ordering edges within strongly connected components, then keeps exactly
    /// the edges that survive the transitive reduction of the subgraph induced by at least
    /// one trace.
    ///
    pub fn general_dag(&self, log: &EventLog) -> Result<DependencyGraph, AgrawalError> {
        let nodes = Self::nodes(log)?;
        let graph = DependencyGraph::new(nodes.iter().cloned(), self.ordering_edges(log), true)?;

        let component_of: HashMap<String, usize> = graph
            .find_strongly_connected_components()
            .into_iter()
            .enumerate()
            .flat_map(|(i, c)| c.into_iter().map(move |n| (n, i)))
            .collect();
        let acyclic_edges: Vec<DependencyEdge> = graph
            .edges()
            .iter()
            .filter(|e| component_of.get(&e.source) != component_of.get(&e.target))
            .cloned()
            .collect();
        log::debug!(
            "Dropped {} edges inside strongly connected components",
            graph.edges().len() - acyclic_edges.len()
        );
        let graph = DependencyGraph::new(nodes.iter().cloned(), acyclic_edges, true)?;

        let traces = log.distinct_traces();
        let marked: BTreeSet<(String, String)> = self
            .config
            .executor
            .flat_map(&traces, |t| {
                graph
                    .induce_subgraph(t)
                    .transitive_reduction()
                    .edges()
                    .iter()
                    .map(|e| (e.source.clone(), e.target.clone()))
                    .collect::<Vec<_>>()
            })
            .into_iter()
            .collect();
        let kept: Vec<DependencyEdge> = graph
            .edges()
            .iter()
            .filter(|e| marked.contains(&(e.source.clone(), e.target.clone())))
            .cloned()
            .collect();
        Ok(DependencyGraph::new(nodes, kept, false)?)
    }

    ///
    /// Cyclic variant: some trace repeats an activity
    ///
    /// Repeated occurrences are renamed ([`unroll_trace`]), the general DAG variant is run on
    /// the unrolled log, and occurrences of the same activity are merged again. Self-loops
    /// created by merging are dropped; counters of merged edges are summed up. Start and end
    /// are those of the unrolled graph.
    ///
    pub fn cyclic_dag(&self, log: &EventLog) -> Result<DependencyGraph, AgrawalError> {
        let unrolled = log.map_traces(unroll_trace);
        let graph = self.general_dag(&unrolled)?;
        let (Some(start), Some(end)) = (graph.start(), graph.end()) else {
            return Err(AgrawalError::Graph(DependencyGraphError::InvalidStart(Vec::new())));
        };
        let nodes: BTreeSet<String> = graph
            .nodes()
            .iter()
            .map(|n| base_label(n).to_string())
            .collect();
        let edges: Vec<DependencyEdge> = graph
            .edges()
            .iter()
            .filter_map(|e| {
                let (s, t) = (base_label(&e.source), base_label(&e.target));
                (s != t).then(|| DependencyEdge::new(s, t, e.counter))
            })
            .collect();
        Ok(DependencyGraph::with_start_end(
            nodes,
            edges,
            base_label(start).to_string(),
            base_label(end).to_string(),
        )?)
    }
}

/// Discover a [`DependencyGraph`] using the Agrawal miner
pub fn agrawal_discover_dependency_graph(
    log: &EventLog,
    config: AgrawalMinerConfig,
) -> Result<DependencyGraph, AgrawalError> {
    AgrawalMinerInstance::new(config).discover(log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        assert_eq!(base_label("a##01"), "a");
        assert_eq!(base_label("a##b"), "a##b");
        assert_eq!(base_label("x##"), "x##");
        assert_eq!(base_label("plain"), "plain");
        assert_eq!(
            unroll_trace(&Trace::from("a b a b a")),
            Trace::from("a b a##01 b##01 a##02")
        );
    }

    #[test]
    fn config_json() {
        let config = AgrawalMinerConfig {
            min_instances: 2,
            executor: Executor::Parallel,
        };
        let back = AgrawalMinerConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn empty_log() {
        let miner = AgrawalMinerInstance::default();
        assert_eq!(
            miner.discover(&EventLog::new()).unwrap_err(),
            AgrawalError::EmptyLog
        );
    }
}
