use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::OnceLock;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::core::event_data::Trace;

use super::scc::strongly_connected_components;

/// Node of a [`DependencyGraph`]: an activity label
pub type DependencyNode = String;

///
/// Errors when constructing or querying a [`DependencyGraph`]
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyGraphError {
    /// An edge or a requested start/end vertex refers to a node not in the graph
    UnknownNode(String),
    /// Graph does not have exactly one vertex without incoming edges (found vertices given)
    InvalidStart(Vec<String>),
    /// Graph does not have exactly one vertex without outgoing edges (found vertices given)
    InvalidEnd(Vec<String>),
}

impl std::fmt::Display for DependencyGraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyGraphError::UnknownNode(n) => write!(f, "Unknown node {n}"),
            DependencyGraphError::InvalidStart(found) => write!(
                f,
                "Expected exactly one start vertex, found {}: {:?}",
                found.len(),
                found
            ),
            DependencyGraphError::InvalidEnd(found) => write!(
                f,
                "Expected exactly one end vertex, found {}: {:?}",
                found.len(),
                found
            ),
        }
    }
}

impl std::error::Error for DependencyGraphError {}

///
/// Directed edge between two activities together with an observation counter
///
/// Equality, ordering and hashing only consider `(source, target)`.
///
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Source activity
    pub source: DependencyNode,
    /// Target activity
    pub target: DependencyNode,
    /// Number of observations supporting this edge
    pub counter: u64,
}

impl DependencyEdge {
    /// New edge with the given counter
    pub fn new<S: Into<String>>(source: S, target: S, counter: u64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            counter,
        }
    }

    fn key(&self) -> (&str, &str) {
        (&self.source, &self.target)
    }
}

impl PartialEq for DependencyEdge {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for DependencyEdge {}

impl PartialOrd for DependencyEdge {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DependencyEdge {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl std::hash::Hash for DependencyEdge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Dense reachability table over the sorted node list
#[derive(Debug, Clone)]
struct Reachability {
    nodes: Vec<DependencyNode>,
    table: Vec<bool>,
}

impl Reachability {
    fn position(&self, node: &str) -> Option<usize> {
        self.nodes.binary_search_by(|n| n.as_str().cmp(node)).ok()
    }

    fn get(&self, from: &str, to: &str) -> bool {
        match (self.position(from), self.position(to)) {
            (Some(i), Some(j)) => self.table[i * self.nodes.len() + j],
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DependencyGraphData {
    nodes: BTreeSet<DependencyNode>,
    edges: Vec<DependencyEdge>,
    start: Option<DependencyNode>,
    end: Option<DependencyNode>,
    ignore_start_end: bool,
}

///
/// Directed graph over activities with a unique start and a unique end vertex
///
/// Unless constructed with `ignore_start_end`, exactly one node has no incoming edges
/// ([`DependencyGraph::start`]) and exactly one node has no outgoing edges
/// ([`DependencyGraph::end`]). Vertices without any incident edge are dropped in that case.
///
/// Graphs are immutable: operations like [`DependencyGraph::transitive_reduction`] return a
/// new graph. Reachability between nodes is computed once per graph value, on first use.
///
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DependencyGraphData")]
#[serde(into = "DependencyGraphData")]
pub struct DependencyGraph {
    nodes: BTreeSet<DependencyNode>,
    edges: BTreeSet<DependencyEdge>,
    start: Option<DependencyNode>,
    end: Option<DependencyNode>,
    ignore_start_end: bool,
    reachability: OnceLock<Reachability>,
}

impl TryFrom<DependencyGraphData> for DependencyGraph {
    type Error = DependencyGraphError;

    fn try_from(data: DependencyGraphData) -> Result<Self, Self::Error> {
        match (data.start, data.end) {
            (Some(start), Some(end)) if data.ignore_start_end => {
                Self::with_start_end(data.nodes, data.edges, start, end)
            }
            _ => Self::new(data.nodes, data.edges, data.ignore_start_end),
        }
    }
}

impl From<DependencyGraph> for DependencyGraphData {
    fn from(g: DependencyGraph) -> Self {
        Self {
            nodes: g.nodes,
            edges: g.edges.into_iter().collect(),
            start: g.start,
            end: g.end,
            ignore_start_end: g.ignore_start_end,
        }
    }
}

impl PartialEq for DependencyGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

impl Eq for DependencyGraph {}

impl DependencyGraph {
    ///
    /// Construct a graph from nodes and edges
    ///
    /// Edges with an unknown endpoint are rejected. Duplicate edges are merged by summing
    /// their counters. Unless `ignore_start_end` is set, isolated vertices are dropped
    /// (a graph consisting of a single node is kept) and the remaining graph must have
    /// exactly one start and one end vertex.
    ///
    pub fn new<N, E>(
        nodes: N,
        edges: E,
        ignore_start_end: bool,
    ) -> Result<Self, DependencyGraphError>
    where
        N: IntoIterator<Item = DependencyNode>,
        E: IntoIterator<Item = DependencyEdge>,
    {
        let mut nodes: BTreeSet<DependencyNode> = nodes.into_iter().collect();
        let edges = Self::merge_edges(&nodes, edges)?;

        if ignore_start_end {
            return Ok(Self::from_parts(nodes, edges, None, None, true));
        }

        if nodes.len() > 1 {
            let connected: BTreeSet<&str> = edges
                .iter()
                .flat_map(|e| [e.source.as_str(), e.target.as_str()])
                .collect();
            let isolated: Vec<DependencyNode> = nodes
                .iter()
                .filter(|n| !connected.contains(n.as_str()))
                .cloned()
                .collect();
            for n in &isolated {
                log::warn!("Dropping isolated vertex {n} from dependency graph");
                nodes.remove(n);
            }
        }

        let starts: Vec<DependencyNode> = nodes
            .iter()
            .filter(|n| !edges.iter().any(|e| &e.target == *n))
            .cloned()
            .collect();
        let ends: Vec<DependencyNode> = nodes
            .iter()
            .filter(|n| !edges.iter().any(|e| &e.source == *n))
            .cloned()
            .collect();
        if starts.len() != 1 {
            return Err(DependencyGraphError::InvalidStart(starts));
        }
        if ends.len() != 1 {
            return Err(DependencyGraphError::InvalidEnd(ends));
        }
        let start = starts.into_iter().next();
        let end = ends.into_iter().next();
        Ok(Self::from_parts(nodes, edges, start, end, false))
    }

    ///
    /// Construct a graph with explicitly given start and end vertex
    ///
    /// Used when loops make in-/out-degrees meaningless for identifying start and end
    /// (e.g., after merging unrolled activity occurrences). No degree checks are performed.
    ///
    pub fn with_start_end<N, E>(
        nodes: N,
        edges: E,
        start: DependencyNode,
        end: DependencyNode,
    ) -> Result<Self, DependencyGraphError>
    where
        N: IntoIterator<Item = DependencyNode>,
        E: IntoIterator<Item = DependencyEdge>,
    {
        let nodes: BTreeSet<DependencyNode> = nodes.into_iter().collect();
        let edges = Self::merge_edges(&nodes, edges)?;
        for n in [&start, &end] {
            if !nodes.contains(n) {
                return Err(DependencyGraphError::UnknownNode(n.clone()));
            }
        }
        Ok(Self::from_parts(nodes, edges, Some(start), Some(end), true))
    }

    fn merge_edges<E: IntoIterator<Item = DependencyEdge>>(
        nodes: &BTreeSet<DependencyNode>,
        edges: E,
    ) -> Result<BTreeSet<DependencyEdge>, DependencyGraphError> {
        let mut merged: BTreeMap<(DependencyNode, DependencyNode), u64> = BTreeMap::new();
        for e in edges {
            for n in [&e.source, &e.target] {
                if !nodes.contains(n) {
                    return Err(DependencyGraphError::UnknownNode(n.clone()));
                }
            }
            *merged.entry((e.source, e.target)).or_insert(0) += e.counter;
        }
        Ok(merged
            .into_iter()
            .map(|((s, t), c)| DependencyEdge::new(s, t, c))
            .collect())
    }

    fn from_parts(
        nodes: BTreeSet<DependencyNode>,
        edges: BTreeSet<DependencyEdge>,
        start: Option<DependencyNode>,
        end: Option<DependencyNode>,
        ignore_start_end: bool,
    ) -> Self {
        Self {
            nodes,
            edges,
            start,
            end,
            ignore_start_end,
            reachability: OnceLock::new(),
        }
    }

    /// Same graph with a different edge set (start, end and flags are kept)
    fn with_edges(&self, edges: BTreeSet<DependencyEdge>) -> Self {
        Self::from_parts(
            self.nodes.clone(),
            edges,
            self.start.clone(),
            self.end.clone(),
            self.ignore_start_end,
        )
    }

    /// Nodes (sorted)
    pub fn nodes(&self) -> &BTreeSet<DependencyNode> {
        &self.nodes
    }

    /// Edges (sorted by source, then target)
    pub fn edges(&self) -> &BTreeSet<DependencyEdge> {
        &self.edges
    }

    /// Start vertex (`None` for graphs built with `ignore_start_end`)
    pub fn start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    /// End vertex (`None` for graphs built with `ignore_start_end`)
    pub fn end(&self) -> Option<&str> {
        self.end.as_deref()
    }

    /// Whether the start/end invariant was skipped at construction
    pub fn ignores_start_end(&self) -> bool {
        self.ignore_start_end
    }

    /// Whether the graph contains the node
    pub fn contains_node(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    /// Edge from `source` to `target`, if present
    pub fn edge(&self, source: &str, target: &str) -> Option<&DependencyEdge> {
        self.edges.get(&DependencyEdge::new(source, target, 0))
    }

    /// Whether an edge from `source` to `target` exists
    pub fn contains_edge(&self, source: &str, target: &str) -> bool {
        self.edge(source, target).is_some()
    }

    /// Direct successors of a node
    pub fn outgoing(&self, node: &str) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter(|e| e.source == node)
            .map(|e| e.target.as_str())
            .collect()
    }

    /// Direct predecessors of a node
    pub fn ingoing(&self, node: &str) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter(|e| e.target == node)
            .map(|e| e.source.as_str())
            .collect()
    }

    fn reachability(&self) -> &Reachability {
        self.reachability.get_or_init(|| {
            let nodes: Vec<DependencyNode> = self.nodes.iter().cloned().collect();
            let n = nodes.len();
            let pos: HashMap<&str, usize> = nodes
                .iter()
                .enumerate()
                .map(|(i, v)| (v.as_str(), i))
                .collect();
            let mut succ: Vec<Vec<usize>> = vec![Vec::new(); n];
            for e in &self.edges {
                if let (Some(&s), Some(&t)) =
                    (pos.get(e.source.as_str()), pos.get(e.target.as_str()))
                {
                    succ[s].push(t);
                }
            }
            let mut table = vec![false; n * n];
            for from in 0..n {
                let row = &mut table[from * n..(from + 1) * n];
                row[from] = true;
                let mut queue = VecDeque::from([from]);
                while let Some(v) = queue.pop_front() {
                    for &w in &succ[v] {
                        if !row[w] {
                            row[w] = true;
                            queue.push_back(w);
                        }
                    }
                }
            }
            Reachability { nodes, table }
        })
    }

    /// Whether `to` can be reached from `from` (every node reaches itself)
    pub fn is_reachable(&self, from: &str, to: &str) -> bool {
        self.reachability().get(from, to)
    }

    ///
    /// Transitive reduction
    ///
    /// Removes every edge `(u, w)` for which some other node `v` (distinct from `u` and `w`)
    /// is reachable from `u` and reaches `w`. For acyclic graphs this is the unique minimal
    /// edge set with the same reachability.
    ///
    pub fn transitive_reduction(&self) -> Self {
        let edges: BTreeSet<DependencyEdge> = self
            .edges
            .iter()
            .filter(|e| {
                !self.nodes.iter().any(|v| {
                    v != &e.source
                        && v != &e.target
                        && self.is_reachable(&e.source, v)
                        && self.is_reachable(v, &e.target)
                })
            })
            .cloned()
            .collect();
        log::debug!(
            "Transitive reduction kept {} of {} edges",
            edges.len(),
            self.edges.len()
        );
        self.with_edges(edges)
    }

    /// Strongly connected components (including singleton components)
    pub fn find_strongly_connected_components(&self) -> Vec<BTreeSet<DependencyNode>> {
        let nodes: Vec<&DependencyNode> = self.nodes.iter().collect();
        let pos: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, v)| (v.as_str(), i))
            .collect();
        let mut succ: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for e in &self.edges {
            if let (Some(&s), Some(&t)) = (pos.get(e.source.as_str()), pos.get(e.target.as_str())) {
                succ[s].push(t);
            }
        }
        strongly_connected_components(&succ)
            .into_iter()
            .map(|c| c.into_iter().map(|i| nodes[i].clone()).collect())
            .collect()
    }

    ///
    /// Subgraph induced by a trace
    ///
    /// Contains the nodes occurring in `trace` and every edge `u -> v` of this graph for
    /// which `u` occurs before `v` in the trace. The result does not enforce the start/end
    /// invariant.
    ///
    pub fn induce_subgraph(&self, trace: &Trace) -> Self {
        let mut first: HashMap<&str, usize> = HashMap::new();
        let mut last: HashMap<&str, usize> = HashMap::new();
        for (i, a) in trace.iter().enumerate() {
            first.entry(a).or_insert(i);
            last.insert(a, i);
        }
        let nodes: BTreeSet<DependencyNode> = self
            .nodes
            .iter()
            .filter(|n| first.contains_key(n.as_str()))
            .cloned()
            .collect();
        let edges: BTreeSet<DependencyEdge> = self
            .edges
            .iter()
            .filter(|e| {
                match (first.get(e.source.as_str()), last.get(e.target.as_str())) {
                    (Some(i), Some(j)) => i < j,
                    _ => false,
                }
            })
            .cloned()
            .collect();
        Self::from_parts(nodes, edges, None, None, true)
    }

    /// Whether the graph is connected when ignoring edge directions
    pub fn is_weakly_connected(&self) -> bool {
        let Some(root) = self.nodes.iter().next() else {
            return true;
        };
        let mut seen: BTreeSet<&str> = BTreeSet::from([root.as_str()]);
        let mut queue = VecDeque::from([root.as_str()]);
        while let Some(v) = queue.pop_front() {
            for e in &self.edges {
                let next = if e.source == v {
                    e.target.as_str()
                } else if e.target == v {
                    e.source.as_str()
                } else {
                    continue;
                };
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen.len() == self.nodes.len()
    }

    /// Convert into a [`petgraph`] graph (node weights: activities, edge weights: counters)
    pub fn to_petgraph(&self) -> DiGraph<String, u64> {
        let mut graph: DiGraph<String, u64> = DiGraph::new();
        let index: HashMap<&str, NodeIndex> = self
            .nodes
            .iter()
            .map(|n| (n.as_str(), graph.add_node(n.clone())))
            .collect();
        for e in &self.edges {
            if let (Some(&s), Some(&t)) =
                (index.get(e.source.as_str()), index.get(e.target.as_str()))
            {
                graph.add_edge(s, t, e.counter);
            }
        }
        graph
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let edges: Vec<String> = self
            .edges
            .iter()
            .map(|e| format!("{}->{}", e.source, e.target))
            .collect();
        write!(f, "{{{}}}", edges.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
        let nodes: BTreeSet<String> = edges
            .iter()
            .flat_map(|(a, b)| [a.to_string(), b.to_string()])
            .collect();
        DependencyGraph::new(
            nodes,
            edges.iter().map(|(a, b)| DependencyEdge::new(*a, *b, 1)),
            false,
        )
        .unwrap()
    }

    #[test]
    fn start_and_end() {
        let g = graph(&[("a", "b"), ("b", "c"), ("a", "c")]);
        assert_eq!(g.start(), Some("a"));
        assert_eq!(g.end(), Some("c"));
        assert_eq!(g.outgoing("a"), ["b", "c"].into_iter().collect());
        assert_eq!(g.ingoing("c"), ["a", "b"].into_iter().collect());

        let two_starts = DependencyGraph::new(
            ["a", "b", "c"].map(String::from),
            [DependencyEdge::new("a", "c", 1), DependencyEdge::new("b", "c", 1)],
            false,
        );
        assert_eq!(
            two_starts.unwrap_err(),
            DependencyGraphError::InvalidStart(vec!["a".into(), "b".into()])
        );
        let ignored = DependencyGraph::new(
            ["a", "b", "c"].map(String::from),
            [DependencyEdge::new("a", "c", 1), DependencyEdge::new("b", "c", 1)],
            true,
        )
        .unwrap();
        assert_eq!(ignored.start(), None);
    }

    #[test]
    fn isolated_and_unknown_nodes() {
        let g = DependencyGraph::new(
            ["a", "b", "x"].map(String::from),
            [DependencyEdge::new("a", "b", 1)],
            false,
        )
        .unwrap();
        assert!(!g.contains_node("x"));
        assert_eq!(g.nodes().len(), 2);

        let single = DependencyGraph::new(["a".to_string()], Vec::new(), false).unwrap();
        assert_eq!(single.start(), Some("a"));
        assert_eq!(single.end(), Some("a"));

        assert_eq!(
            DependencyGraph::new(["a".to_string()], [DependencyEdge::new("a", "z", 1)], false)
                .unwrap_err(),
            DependencyGraphError::UnknownNode("z".into())
        );
    }

    #[test]
    fn edge_identity_ignores_counter() {
        assert_eq!(
            DependencyEdge::new("a", "b", 1),
            DependencyEdge::new("a", "b", 7)
        );
        let g = DependencyGraph::new(
            ["a", "b"].map(String::from),
            [DependencyEdge::new("a", "b", 2), DependencyEdge::new("a", "b", 3)],
            false,
        )
        .unwrap();
        assert_eq!(g.edges().len(), 1);
        assert_eq!(g.edge("a", "b").map(|e| e.counter), Some(5));
        assert!(g.edge("b", "a").is_none());
    }

    #[test]
    fn transitive_reduction_keeps_reachability() {
        let g = graph(&[
            ("a", "b"),
            ("a", "c"),
            ("a", "d"),
            ("b", "d"),
            ("c", "d"),
            ("a", "e"),
            ("d", "e"),
        ]);
        let r = g.transitive_reduction();
        let expected: BTreeSet<DependencyEdge> =
            [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "e")]
                .iter()
                .map(|(a, b)| DependencyEdge::new(*a, *b, 0))
                .collect();
        assert_eq!(r.edges(), &expected);
        assert_eq!(r.transitive_reduction(), r);
        for u in g.nodes() {
            for v in g.nodes() {
                assert_eq!(g.is_reachable(u, v), r.is_reachable(u, v));
            }
        }
        assert_eq!(r.start(), Some("a"));
        assert_eq!(r.end(), Some("e"));
    }

    #[test]
    fn sccs_and_subgraphs() {
        let g = DependencyGraph::new(
            ["a", "b", "c", "d"].map(String::from),
            [
                DependencyEdge::new("a", "b", 1),
                DependencyEdge::new("b", "c", 1),
                DependencyEdge::new("c", "b", 1),
                DependencyEdge::new("c", "d", 1),
            ],
            false,
        )
        .unwrap();
        let sccs = g.find_strongly_connected_components();
        assert_eq!(sccs.len(), 3);
        assert!(sccs.contains(&["b", "c"].map(String::from).into_iter().collect()));

        let sub = g.induce_subgraph(&Trace::from("a c b"));
        assert!(sub.ignores_start_end());
        assert_eq!(sub.nodes().len(), 3);
        assert!(sub.contains_edge("a", "b"));
        assert!(sub.contains_edge("c", "b"));
        assert!(!sub.contains_edge("b", "c"));
        assert!(sub.is_weakly_connected());
        let sub = g.induce_subgraph(&Trace::from("d a"));
        assert!(!sub.is_weakly_connected());
    }

    #[test]
    fn serde_and_petgraph() {
        let g = graph(&[("a", "b"), ("b", "c")]);
        let g2: DependencyGraph = serde_json::from_str(&g.to_json().unwrap()).unwrap();
        assert_eq!(g, g2);
        assert_eq!(g2.start(), Some("a"));
        let pg = g.to_petgraph();
        assert_eq!(pg.node_count(), 3);
        assert_eq!(pg.edge_count(), 2);
        assert_eq!(g.to_string(), "{a->b, b->c}");
    }
}
