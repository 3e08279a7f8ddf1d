use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::utils::{Executor, SpillQueue, SpillQueueError};

use super::event_log_struct::{EventLog, Trace};

/// Activity in a directly-follows graph.
type Activity = String;

/// A directly-follows graph of [`Activity`]s.
///
/// Graph containing a set of activities, a set of directly-follows relations, a set of start
/// activities, and a set of end activities.
/// Both, the number of occurrences of activities and of directly-follows relations are annotated
/// with their frequency (weighted by trace frequency).
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectlyFollowsGraph {
    /// Activities
    pub activities: BTreeMap<Activity, u64>,
    /// Directly-follows relations
    #[serde_as(as = "Vec<(_, _)>")]
    pub directly_follows_relations: BTreeMap<(Activity, Activity), u64>,
    /// Start activities
    pub start_activities: BTreeSet<Activity>,
    /// End activities
    pub end_activities: BTreeSet<Activity>,
}

impl DirectlyFollowsGraph {
    /// Create new [`DirectlyFollowsGraph`] with no activities and directly-follows relations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a [`DirectlyFollowsGraph`] from an [`EventLog`]
    ///
    /// Distinct traces are scanned through the passed [`Executor`]; every observation is
    /// weighted by the frequency of its trace.
    pub fn from_log(log: &EventLog, executor: Executor) -> Self {
        let traces: Vec<(&Trace, u64)> = log.iter().collect();
        let per_trace: Vec<Self> = executor.map(&traces, |(t, w)| {
            let mut dfg = Self::new();
            dfg.add_trace(t, *w);
            dfg
        });
        per_trace.into_iter().fold(Self::new(), |mut acc, dfg| {
            acc.merge(dfg);
            acc
        })
    }

    fn add_trace(&mut self, trace: &Trace, frequency: u64) {
        let mut last: Option<&str> = None;
        for act in trace.iter() {
            self.add_activity(act.to_string(), frequency);
            match last {
                Some(prev) => self.add_df_relation(prev.to_string(), act.to_string(), frequency),
                None => self.add_start_activity(act.to_string()),
            }
            last = Some(act);
        }
        if let Some(last) = last {
            self.add_end_activity(last.to_string());
        }
    }

    fn merge(&mut self, other: Self) {
        for (act, f) in other.activities {
            self.add_activity(act, f);
        }
        for ((a, b), f) in other.directly_follows_relations {
            self.add_df_relation(a, b, f);
        }
        self.start_activities.extend(other.start_activities);
        self.end_activities.extend(other.end_activities);
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Add an activity with a frequency.
    ///
    /// If the activity already exists, the frequency count is added to the existing activity.
    pub fn add_activity(&mut self, activity: Activity, frequency: u64) {
        *self.activities.entry(activity).or_default() += frequency;
    }

    /// Adds an activity to the set of start activities.
    pub fn add_start_activity(&mut self, activity: Activity) {
        self.start_activities.insert(activity);
    }

    /// Adds an activity to the set of end activities.
    pub fn add_end_activity(&mut self, activity: Activity) {
        self.end_activities.insert(activity);
    }

    /// Add a directly-follows relation with a frequency.
    ///
    /// If the directly-follows relation already exists, the frequency count is added to the
    /// existing directly-follows relation.
    pub fn add_df_relation(&mut self, from: Activity, to: Activity, frequency: u64) {
        *self
            .directly_follows_relations
            .entry((from, to))
            .or_default() += frequency;
    }

    /// Checks if an activity is contained in the directly-follows graph.
    pub fn contains_activity<S: AsRef<str>>(&self, activity: S) -> bool {
        self.activities.contains_key(activity.as_ref())
    }

    /// Checks if a directly-follows relation is contained in the directly-follows graph.
    pub fn contains_df_relation<S: AsRef<str>>(&self, from: S, to: S) -> bool {
        self.df_count(from, to) > 0
    }

    /// Weighted number of times `to` directly followed `from`
    pub fn df_count<S: AsRef<str>>(&self, from: S, to: S) -> u64 {
        self.directly_follows_relations
            .get(&(from.as_ref().to_string(), to.as_ref().to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the ingoing activities of an activity in the directly-follows graph.
    pub fn ingoing_activities<S: AsRef<str>>(&self, activity: S) -> BTreeSet<&str> {
        self.directly_follows_relations
            .keys()
            .filter_map(|(x, y)| (y == activity.as_ref()).then_some(x.as_str()))
            .collect()
    }

    /// Returns the outgoing activities of an activity in the directly-follows graph.
    pub fn outgoing_activities<S: AsRef<str>>(&self, activity: S) -> BTreeSet<&str> {
        self.directly_follows_relations
            .keys()
            .filter_map(|(x, y)| (x == activity.as_ref()).then_some(y.as_str()))
            .collect()
    }

    /// Directly-follows pairs observed at least `min_instances` times
    pub fn df_pairs(&self, min_instances: u64) -> BTreeSet<(&str, &str)> {
        self.directly_follows_relations
            .iter()
            .filter(|(_, w)| **w >= min_instances)
            .map(|((a, b), _)| (a.as_str(), b.as_str()))
            .collect()
    }

    /// Copy of this graph without the directly-follows relations observed less than
    /// `min_instances` times
    pub fn filter(&self, min_instances: u64) -> Self {
        let mut ret = self.clone();
        ret.directly_follows_relations
            .retain(|_, w| *w >= min_instances);
        ret
    }

    ///
    /// Enumerate all walks from a start to an end activity with at most `max_len` activities
    ///
    /// The walks are built breadth-first (i.e., shorter walks come first; walks of equal
    /// length are ordered lexicographically). Both the frontier and the result keep at most
    /// `memory_capacity` items in memory and spill the rest to a temporary file.
    ///
    pub fn walks(
        &self,
        max_len: usize,
        memory_capacity: usize,
    ) -> Result<SpillQueue<Trace>, SpillQueueError> {
        let mut result: SpillQueue<Trace> = SpillQueue::new(memory_capacity);
        let mut frontier: SpillQueue<Vec<Activity>> = SpillQueue::new(memory_capacity);
        if max_len == 0 {
            return Ok(result);
        }
        for start in &self.start_activities {
            frontier.push(vec![start.clone()])?;
        }
        for len in 1..=max_len {
            let mut next: SpillQueue<Vec<Activity>> = SpillQueue::new(memory_capacity);
            for walk in frontier.drain()? {
                let walk = walk?;
                let Some(last) = walk.last() else {
                    continue;
                };
                if self.end_activities.contains(last) {
                    result.push(Trace::new(walk.iter().cloned()))?;
                }
                if len < max_len {
                    for succ in self.outgoing_activities(last) {
                        let mut extended = walk.clone();
                        extended.push(succ.to_string());
                        next.push(extended)?;
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        log::debug!("Enumerated {} walks (spilled {})", result.len(), result.spilled());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log;

    #[test]
    fn dfg_from_log() {
        let log = event_log!("a b c" => 2, "a c" => 1, "a b b c" => 1);
        let dfg = DirectlyFollowsGraph::from_log(&log, Executor::Sequential);
        assert_eq!(dfg.activities.get("a"), Some(&4));
        assert_eq!(dfg.activities.get("b"), Some(&4));
        assert_eq!(dfg.df_count("a", "b"), 3);
        assert_eq!(dfg.df_count("b", "b"), 1);
        assert_eq!(dfg.df_count("c", "a"), 0);
        assert!(dfg.contains_df_relation("a", "c"));
        assert_eq!(dfg.start_activities.len(), 1);
        assert_eq!(
            dfg.outgoing_activities("a"),
            ["b", "c"].into_iter().collect()
        );
        assert_eq!(dfg.ingoing_activities("c"), ["a", "b"].into_iter().collect());
        let filtered = dfg.filter(2);
        assert!(!filtered.contains_df_relation("a", "c"));
        assert!(filtered.contains_df_relation("a", "b"));

        let par = DirectlyFollowsGraph::from_log(&log, Executor::Parallel);
        assert_eq!(dfg, par);
    }

    #[test]
    fn dfg_json_roundtrip() {
        let log = event_log!("a b", "b a");
        let dfg = DirectlyFollowsGraph::from_log(&log, Executor::Sequential);
        let dfg2: DirectlyFollowsGraph = serde_json::from_str(&dfg.to_json().unwrap()).unwrap();
        assert_eq!(dfg, dfg2);
    }

    #[test]
    fn walks_with_spilling() {
        let log = event_log!("a b d", "a c d", "a b b d");
        let dfg = DirectlyFollowsGraph::from_log(&log, Executor::Sequential);
        let walks: Vec<Trace> = dfg
            .walks(4, 1)
            .unwrap()
            .drain()
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            walks,
            vec![
                Trace::from("a b d"),
                Trace::from("a c d"),
                Trace::from("a b b d"),
            ]
        );
        assert!(dfg.walks(0, 10).unwrap().is_empty());
    }
}
