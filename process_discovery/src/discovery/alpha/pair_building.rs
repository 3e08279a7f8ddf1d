use std::collections::{BTreeSet, HashSet};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::utils::Executor;

use super::alpha_miner::AlphaError;
use super::footprint::{AlphaRelation, FootprintMatrix};

///
/// Candidate place of the Alpha miner: a pair of activity sets `(A, B)`
///
/// Valid iff every `a` in `A` is causally followed by every `b` in `B`, and all activities
/// within `A` (resp. `B`) are pairwise in the never-follows relation (including each
/// activity with itself).
///
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlphaPair {
    left: BTreeSet<String>,
    right: BTreeSet<String>,
}

impl AlphaPair {
    /// Create a pair, checking it against the footprint
    pub fn new<S: Into<String>, L: IntoIterator<Item = S>, R: IntoIterator<Item = S>>(
        left: L,
        right: R,
        footprint: &FootprintMatrix,
    ) -> Result<Self, AlphaError> {
        let pair = Self {
            left: left.into_iter().map(Into::into).collect(),
            right: right.into_iter().map(Into::into).collect(),
        };
        let indices = |side: &BTreeSet<String>| -> Option<Vec<usize>> {
            side.iter().map(|a| footprint.index_of(a)).collect()
        };
        match (indices(&pair.left), indices(&pair.right)) {
            (Some(l), Some(r)) if !l.is_empty() && !r.is_empty() && is_valid(footprint, &l, &r) => {
                Ok(pair)
            }
            _ => Err(AlphaError::InvalidPair {
                left: pair.left.into_iter().collect(),
                right: pair.right.into_iter().collect(),
            }),
        }
    }

    fn from_indices(footprint: &FootprintMatrix, (left, right): &IndexPair) -> Self {
        let acts = footprint.activities();
        Self {
            left: left.iter().map(|i| acts[*i].clone()).collect(),
            right: right.iter().map(|i| acts[*i].clone()).collect(),
        }
    }

    /// Input activities of the place
    pub fn left(&self) -> &BTreeSet<String> {
        &self.left
    }

    /// Output activities of the place
    pub fn right(&self) -> &BTreeSet<String> {
        &self.right
    }

    /// Whether both sides are contained in the respective side of `other`
    pub fn is_subsumed_by(&self, other: &AlphaPair) -> bool {
        self.left.is_subset(&other.left) && self.right.is_subset(&other.right)
    }

    /// Deterministic place name, e.g., `P({a,d},{b})`
    pub fn place_name(&self) -> String {
        format!(
            "P({{{}}},{{{}}})",
            self.left.iter().join(","),
            self.right.iter().join(",")
        )
    }
}

impl std::fmt::Display for AlphaPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.place_name())
    }
}

/// Pair of sorted activity index lists
type IndexPair = (Vec<usize>, Vec<usize>);

fn never_follows_among(footprint: &FootprintMatrix, side: &[usize]) -> bool {
    side.iter().all(|&a| {
        side.iter()
            .all(|&b| footprint.relation_by_index(a, b) == AlphaRelation::NeverFollows)
    })
}

fn all_causal_between(footprint: &FootprintMatrix, left: &[usize], right: &[usize]) -> bool {
    left.iter().all(|&a| {
        right
            .iter()
            .all(|&b| footprint.relation_by_index(a, b) == AlphaRelation::Causal)
    })
}

fn is_valid(footprint: &FootprintMatrix, left: &[usize], right: &[usize]) -> bool {
    never_follows_among(footprint, left)
        && never_follows_among(footprint, right)
        && all_causal_between(footprint, left, right)
}

/// Whether `x` can join the left side of `(left, right)`
fn extends_left(footprint: &FootprintMatrix, (left, right): &IndexPair, x: usize) -> bool {
    footprint.relation_by_index(x, x) == AlphaRelation::NeverFollows
        && left
            .iter()
            .all(|&a| footprint.relation_by_index(x, a) == AlphaRelation::NeverFollows)
        && right
            .iter()
            .all(|&b| footprint.relation_by_index(x, b) == AlphaRelation::Causal)
}

/// Whether `y` can join the right side of `(left, right)`
fn extends_right(footprint: &FootprintMatrix, (left, right): &IndexPair, y: usize) -> bool {
    footprint.relation_by_index(y, y) == AlphaRelation::NeverFollows
        && right
            .iter()
            .all(|&b| footprint.relation_by_index(y, b) == AlphaRelation::NeverFollows)
        && left
            .iter()
            .all(|&a| footprint.relation_by_index(a, y) == AlphaRelation::Causal)
}

fn with_added(side: &[usize], x: usize) -> Vec<usize> {
    let mut v = side.to_vec();
    if let Err(pos) = v.binary_search(&x) {
        v.insert(pos, x);
    }
    v
}

///
/// Build all valid [`AlphaPair`]s of the footprint
///
/// Starts from all causal singleton pairs `({a},{b})` where `a # a` and `b # b`, then grows
/// every newly found pair by one activity on either side until no new pair appears.
/// Each round fans out over the frontier using `executor` and merges by set union.
///
pub fn build_pairs(footprint: &FootprintMatrix, executor: Executor) -> BTreeSet<AlphaPair> {
    let n = footprint.activities().len();
    let mut pairs: HashSet<IndexPair> = (0..n)
        .cartesian_product(0..n)
        .filter(|&(a, b)| {
            a != b
                && footprint.relation_by_index(a, b) == AlphaRelation::Causal
                && footprint.relation_by_index(a, a) == AlphaRelation::NeverFollows
                && footprint.relation_by_index(b, b) == AlphaRelation::NeverFollows
        })
        .map(|(a, b)| (vec![a], vec![b]))
        .collect();
    let mut frontier: Vec<IndexPair> = pairs.iter().cloned().sorted().collect();
    let mut round = 0;
    while !frontier.is_empty() {
        round += 1;
        let grown: Vec<IndexPair> = executor.flat_map(&frontier, |pair| {
            let (left, right) = pair;
            let mut res: Vec<IndexPair> = Vec::new();
            for x in 0..n {
                if !left.contains(&x) && extends_left(footprint, pair, x) {
                    res.push((with_added(left, x), right.clone()));
                }
                if !right.contains(&x) && extends_right(footprint, pair, x) {
                    res.push((left.clone(), with_added(right, x)));
                }
            }
            res
        });
        frontier = grown
            .into_iter()
            .filter(|p| pairs.insert(p.clone()))
            .sorted()
            .collect();
        log::debug!(
            "Pair building round {round}: {} new pairs ({} total)",
            frontier.len(),
            pairs.len()
        );
    }
    pairs
        .iter()
        .map(|p| AlphaPair::from_indices(footprint, p))
        .collect()
}

/// Keep only pairs that are not subsumed by another pair
pub fn maximal_pairs(pairs: &BTreeSet<AlphaPair>, executor: Executor) -> Vec<AlphaPair> {
    let all: Vec<&AlphaPair> = pairs.iter().collect();
    let keep = executor.map(&all, |p| {
        !all.iter().any(|q| q != p && p.is_subsumed_by(q))
    });
    all.into_iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then(|| p.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log;

    #[test]
    fn pair_validity() {
        let log = event_log!("a b d", "a c d");
        let fp = FootprintMatrix::from_log(&log, 1, Executor::Sequential);
        let p = AlphaPair::new(["a"], ["b", "c"], &fp).unwrap();
        assert_eq!(p.place_name(), "P({a},{b,c})");
        assert!(AlphaPair::new(["a"], ["b", "d"], &fp).is_err());
        assert!(AlphaPair::new(["a"], ["x"], &fp).is_err());
        assert!(AlphaPair::new(Vec::<&str>::new(), ["b"], &fp).is_err());
    }

    #[test]
    fn closure_and_maximality() {
        let log = event_log!("a b d", "a c d");
        let fp = FootprintMatrix::from_log(&log, 1, Executor::Sequential);
        let pairs = build_pairs(&fp, Executor::Sequential);
        // ({a},{b}) ({a},{c}) ({b},{d}) ({c},{d}) ({a},{b,c}) ({b,c},{d})
        assert_eq!(pairs.len(), 6);
        assert_eq!(pairs, build_pairs(&fp, Executor::Parallel));
        let max: Vec<String> = maximal_pairs(&pairs, Executor::Sequential)
            .iter()
            .map(|p| p.place_name())
            .collect();
        assert_eq!(max, vec!["P({a},{b,c})", "P({b,c},{d})"]);
    }

    #[test]
    fn self_loops_never_form_pairs() {
        let log = event_log!("a b b c");
        let fp = FootprintMatrix::from_log(&log, 1, Executor::Sequential);
        let pairs = build_pairs(&fp, Executor::Sequential);
        assert!(pairs.iter().all(|p| !p.left().contains("b") && !p.right().contains("b")));
    }
}
