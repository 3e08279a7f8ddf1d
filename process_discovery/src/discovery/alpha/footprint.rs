use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::event_data::{DirectlyFollowsGraph, EventLog};
use crate::utils::Executor;

///
/// Relation between an ordered pair of activities `(a, b)` in the footprint of a log
///
/// Based on the directly-follows relation `>` (`a > b` iff `b` directly followed `a` at
/// least `min_instances` times, weighted by trace frequency).
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlphaRelation {
    /// Only `b > a` was observed (the reverse of [`AlphaRelation::Causal`])
    DirectlyFollows,
    /// `a -> b`: `a > b` but not `b > a` (Alpha+: also for length-two loops)
    Causal,
    /// `a # b`: neither `a > b` nor `b > a`
    NeverFollows,
    /// `a || b`: both `a > b` and `b > a`
    Parallel,
}

impl AlphaRelation {
    /// Symbol used in footprint tables
    pub fn symbol(&self) -> &'static str {
        match self {
            AlphaRelation::DirectlyFollows => "<-",
            AlphaRelation::Causal => "->",
            AlphaRelation::NeverFollows => "#",
            AlphaRelation::Parallel => "||",
        }
    }
}

impl std::fmt::Display for AlphaRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

///
/// Footprint matrix: the [`AlphaRelation`] of every ordered pair of activities
///
/// Activities are indexed in lexicographic order.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootprintMatrix {
    activities: Vec<String>,
    follows: BTreeSet<(usize, usize)>,
    triangles: BTreeSet<(usize, usize)>,
    relations: Vec<AlphaRelation>,
}

impl FootprintMatrix {
    /// Footprint of the plain Alpha miner
    pub fn from_log(log: &EventLog, min_instances: u64, executor: Executor) -> Self {
        Self::build(log, min_instances, executor, false)
    }

    ///
    /// Footprint of the Alpha+ miner
    ///
    /// Additionally considers the triangle relation `a ^ b` (`a b a` was observed at least
    /// `min_instances` times). Then `a -> b` iff `a > b` and (`not b > a` or `a ^ b` or
    /// `b ^ a`), i.e., length-two loops are causal in both directions.
    ///
    pub fn from_log_plus(log: &EventLog, min_instances: u64, executor: Executor) -> Self {
        Self::build(log, min_instances, executor, true)
    }

    fn build(log: &EventLog, min_instances: u64, executor: Executor, plus: bool) -> Self {
        let dfg = DirectlyFollowsGraph::from_log(log, executor);
        let activities: Vec<String> = log.seen_activities().into_iter().collect();
        let index: BTreeMap<&str, usize> = activities
            .iter()
            .enumerate()
            .map(|(i, a)| (a.as_str(), i))
            .collect();
        let follows: BTreeSet<(usize, usize)> = dfg
            .df_pairs(min_instances)
            .into_iter()
            .filter_map(|(a, b)| Some((*index.get(a)?, *index.get(b)?)))
            .collect();
        let triangles: BTreeSet<(usize, usize)> = if plus {
            count_triangles(log, executor)
                .into_iter()
                .filter(|(_, w)| *w >= min_instances)
                .filter_map(|((a, b), _)| Some((*index.get(a.as_str())?, *index.get(b.as_str())?)))
                .collect()
        } else {
            BTreeSet::new()
        };

        let n = activities.len();
        let causal = |a: usize, b: usize| {
            follows.contains(&(a, b))
                && (!follows.contains(&(b, a))
                    || triangles.contains(&(a, b))
                    || triangles.contains(&(b, a)))
        };
        let mut relations = Vec::with_capacity(n * n);
        for a in 0..n {
            for b in 0..n {
                let rel = if a != b && causal(a, b) {
                    AlphaRelation::Causal
                } else if a != b && causal(b, a) {
                    AlphaRelation::DirectlyFollows
                } else {
                    match (follows.contains(&(a, b)), follows.contains(&(b, a))) {
                        (true, true) => AlphaRelation::Parallel,
                        (false, false) => AlphaRelation::NeverFollows,
                        (true, false) => AlphaRelation::Causal,
                        (false, true) => AlphaRelation::DirectlyFollows,
                    }
                };
                relations.push(rel);
            }
        }
        log::debug!(
            "Footprint over {} activities with {} directly-follows pairs ({} triangles)",
            n,
            follows.len(),
            triangles.len()
        );
        Self {
            activities,
            follows,
            triangles,
            relations,
        }
    }

    /// Activities (sorted)
    pub fn activities(&self) -> &[String] {
        &self.activities
    }

    /// Index of an activity
    pub fn index_of(&self, activity: &str) -> Option<usize> {
        self.activities
            .binary_search_by(|a| a.as_str().cmp(activity))
            .ok()
    }

    /// Relation between the activities with indices `a` and `b`
    ///
    /// Panics if an index is out of range.
    pub fn relation_by_index(&self, a: usize, b: usize) -> AlphaRelation {
        self.relations[a * self.activities.len() + b]
    }

    /// Relation between activities `a` and `b`, `None` if one of them was never seen
    pub fn relation(&self, a: &str, b: &str) -> Option<AlphaRelation> {
        Some(self.relation_by_index(self.index_of(a)?, self.index_of(b)?))
    }

    /// Whether `b` directly followed `a` (at least `min_instances` times)
    pub fn directly_follows(&self, a: &str, b: &str) -> bool {
        matches!(
            (self.index_of(a), self.index_of(b)),
            (Some(i), Some(j)) if self.follows.contains(&(i, j))
        )
    }

    /// Whether `a b a` was observed (only tracked by [`FootprintMatrix::from_log_plus`])
    pub fn triangle(&self, a: &str, b: &str) -> bool {
        matches!(
            (self.index_of(a), self.index_of(b)),
            (Some(i), Some(j)) if self.triangles.contains(&(i, j))
        )
    }

    /// `a -> b`
    pub fn is_causal(&self, a: &str, b: &str) -> bool {
        self.relation(a, b) == Some(AlphaRelation::Causal)
    }

    /// `a # b`
    pub fn is_never_follows(&self, a: &str, b: &str) -> bool {
        self.relation(a, b) == Some(AlphaRelation::NeverFollows)
    }

    /// `a || b`
    pub fn is_parallel(&self, a: &str, b: &str) -> bool {
        self.relation(a, b) == Some(AlphaRelation::Parallel)
    }
}

impl std::fmt::Display for FootprintMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self
            .activities
            .iter()
            .map(|a| a.len())
            .max()
            .unwrap_or(0)
            .max(2);
        write!(f, "{:width$}", "")?;
        for a in &self.activities {
            write!(f, " {a:>width$}")?;
        }
        writeln!(f)?;
        for (i, a) in self.activities.iter().enumerate() {
            write!(f, "{a:width$}")?;
            for j in 0..self.activities.len() {
                write!(f, " {:>width$}", self.relation_by_index(i, j).symbol())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Weighted number of `a b a` patterns per `(a, b)`
fn count_triangles(log: &EventLog, executor: Executor) -> BTreeMap<(String, String), u64> {
    let traces: Vec<_> = log.iter().collect();
    executor
        .flat_map(&traces, |(trace, freq)| {
            let acts = trace.as_slice();
            acts.windows(3)
                .filter(|w| w[0] == w[2] && w[0] != w[1])
                .map(|w| ((w[0].clone(), w[1].clone()), *freq))
                .collect::<Vec<_>>()
        })
        .into_iter()
        .fold(BTreeMap::new(), |mut acc, (pair, f)| {
            *acc.entry(pair).or_insert(0) += f;
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log;

    #[test]
    fn plain_footprint() {
        let log = event_log!("a b c d" => 3, "a c b d" => 2, "a e d");
        let fp = FootprintMatrix::from_log(&log, 1, Executor::Sequential);
        assert_eq!(fp.activities(), &["a", "b", "c", "d", "e"]);
        assert!(fp.is_causal("a", "b"));
        assert_eq!(fp.relation("b", "a"), Some(AlphaRelation::DirectlyFollows));
        assert!(fp.is_parallel("b", "c"));
        assert!(fp.is_never_follows("b", "e"));
        assert!(fp.is_never_follows("a", "a"));
        assert_eq!(fp.relation("a", "x"), None);
        assert!(fp.to_string().contains("->"));
    }

    #[test]
    fn relations_are_exclusive_and_consistent() {
        let log = event_log!("a b c d", "a c b d", "a b b d", "d a", "c a e");
        let fp = FootprintMatrix::from_log(&log, 1, Executor::Sequential);
        for a in fp.activities() {
            for b in fp.activities() {
                let r = fp.relation(a, b).unwrap();
                let rev = fp.relation(b, a).unwrap();
                match r {
                    AlphaRelation::Causal => assert_eq!(rev, AlphaRelation::DirectlyFollows),
                    AlphaRelation::DirectlyFollows => assert_eq!(rev, AlphaRelation::Causal),
                    AlphaRelation::Parallel | AlphaRelation::NeverFollows => assert_eq!(rev, r),
                }
            }
        }
    }

    #[test]
    fn threshold_after_aggregation() {
        // b c is observed once per trace, but with total weight 3
        let log = event_log!("a b c" => 2, "a c b");
        let fp = FootprintMatrix::from_log(&log, 2, Executor::Sequential);
        assert!(fp.directly_follows("b", "c"));
        assert!(!fp.directly_follows("c", "b"));
        assert!(fp.is_causal("b", "c"));
        assert!(!fp.directly_follows("a", "c"));
    }

    #[test]
    fn plus_footprint_single_triangle_direction() {
        // only `a b a` is observed, never `b a b`
        let log = event_log!("x a b a y");
        let plus = FootprintMatrix::from_log_plus(&log, 1, Executor::Sequential);
        assert!(plus.triangle("a", "b"));
        assert!(!plus.triangle("b", "a"));
        assert!(plus.is_causal("a", "b"));
        assert!(plus.is_causal("b", "a"));
        assert!(plus.is_causal("x", "a"));

        let plain = FootprintMatrix::from_log(&log, 1, Executor::Sequential);
        assert!(plain.is_parallel("a", "b"));
    }

    #[test]
    fn plus_footprint_detects_length_two_loops() {
        let log = event_log!("a b c d", "a b c b c d");
        let plain = FootprintMatrix::from_log(&log, 1, Executor::Sequential);
        assert!(plain.is_parallel("b", "c"));
        let plus = FootprintMatrix::from_log_plus(&log, 1, Executor::Parallel);
        assert!(plus.triangle("b", "c"));
        assert!(plus.triangle("c", "b"));
        assert!(plus.is_causal("b", "c"));
        assert!(plus.is_causal("c", "b"));
        assert!(plus.is_causal("a", "b"));
    }
}
