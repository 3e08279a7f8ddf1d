use std::collections::HashMap;

use crate::core::event_data::EventLog;
use crate::core::process_models::dependency_graph::DependencyGraph;

///
/// Follows relation of an event log
///
/// `b` directly follows `a` iff both co-occur in some trace and, in every trace containing
/// both, all occurrences of `a` precede all occurrences of `b`. The follows relation is the
/// transitive closure of that.
///
#[derive(Debug, Clone)]
pub struct FollowsRelation {
    activities: Vec<String>,
    follows: Vec<bool>,
}

impl FollowsRelation {
    /// Compute the follows relation of `log`
    pub fn from_log(log: &EventLog) -> Self {
        let activities: Vec<String> = log.seen_activities().into_iter().collect();
        let n = activities.len();
        let index: HashMap<&str, usize> = activities
            .iter()
            .enumerate()
            .map(|(i, a)| (a.as_str(), i))
            .collect();
        // co-occurrence and violation per ordered pair
        let mut co_occur = vec![false; n * n];
        let mut violated = vec![false; n * n];
        for trace in log.distinct_traces() {
            let mut first: HashMap<usize, usize> = HashMap::new();
            let mut last: HashMap<usize, usize> = HashMap::new();
            for (pos, a) in trace.iter().enumerate() {
                if let Some(&i) = index.get(a) {
                    first.entry(i).or_insert(pos);
                    last.insert(i, pos);
                }
            }
            for (&a, &last_a) in &last {
                for (&b, &first_b) in &first {
                    if a == b {
                        continue;
                    }
                    co_occur[a * n + b] = true;
                    if last_a >= first_b {
                        violated[a * n + b] = true;
                    }
                }
            }
        }
        let mut follows: Vec<bool> = (0..n * n).map(|k| co_occur[k] && !violated[k]).collect();
        for k in 0..n {
            for i in 0..n {
                if !follows[i * n + k] {
                    continue;
                }
                for j in 0..n {
                    if follows[k * n + j] {
                        follows[i * n + j] = true;
                    }
                }
            }
        }
        Self {
            activities,
            follows,
        }
    }

    fn index_of(&self, activity: &str) -> Option<usize> {
        self.activities
            .binary_search_by(|a| a.as_str().cmp(activity))
            .ok()
    }

    /// Activities of the log (sorted)
    pub fn activities(&self) -> &[String] {
        &self.activities
    }

    /// Whether `b` follows `a`
    pub fn follows(&self, a: &str, b: &str) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(i), Some(j)) => self.follows[i * self.activities.len() + j],
            _ => false,
        }
    }

    /// Whether `b` depends on `a` (`b` follows `a`, but not vice versa)
    pub fn depends(&self, a: &str, b: &str) -> bool {
        self.follows(a, b) && !self.follows(b, a)
    }

    /// Whether `a` and `b` follow each other or neither follows the other
    pub fn independent(&self, a: &str, b: &str) -> bool {
        self.follows(a, b) == self.follows(b, a)
    }
}

///
/// Whether `graph` is conformal with `log`
///
/// 1. For every dependency `a -> b` of the log, `b` is reachable from `a` in the graph.
/// 2. Independent activities are not connected by a path in either direction.
/// 3. For every trace, all its activities are nodes of the graph, the subgraph induced by the
///    trace is weakly connected, and it has no path from a later to an earlier activity.
///
pub fn is_conformal(log: &EventLog, graph: &DependencyGraph) -> bool {
    let relation = FollowsRelation::from_log(log);
    let acts = relation.activities();
    for a in acts {
        for b in acts {
            if a == b {
                continue;
            }
            if relation.depends(a, b) && !graph.is_reachable(a, b) {
                log::debug!("Not conformal: no path for dependency {a} -> {b}");
                return false;
            }
            if relation.independent(a, b) && graph.is_reachable(a, b) {
                log::debug!("Not conformal: path between independent {a} and {b}");
                return false;
            }
        }
    }
    for trace in log.distinct_traces() {
        if let Some(missing) = trace.iter().find(|a| !graph.contains_node(a)) {
            log::debug!("Not conformal: activity {missing} of {trace} is not a node");
            return false;
        }
        let induced = graph.induce_subgraph(trace);
        if !induced.is_weakly_connected() {
            log::debug!("Not conformal: subgraph induced by {trace} is not connected");
            return false;
        }
        let acts = trace.as_slice();
        for (i, earlier) in acts.iter().enumerate() {
            for later in &acts[i + 1..] {
                if earlier != later && induced.is_reachable(later, earlier) {
                    log::debug!("Not conformal: path {later} -> {earlier} against {trace}");
                    return false;
                }
            }
        }
    }
    true
}
