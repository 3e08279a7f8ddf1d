use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

///
/// Errors that can occur when building or querying an [`EventLog`] or [`Trace`]
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventLogError {
    /// A trace was added with a frequency of zero
    ZeroFrequency(Trace),
    /// Index lookup past the end of a trace (with requested index and trace length)
    TraceIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Length of the trace
        len: usize,
    },
}

impl std::fmt::Display for EventLogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventLogError::ZeroFrequency(trace) => {
                write!(f, "Trace {trace} was added with frequency 0")
            }
            EventLogError::TraceIndexOutOfRange { index, len } => {
                write!(f, "Index {index} is out of range for trace of length {len}")
            }
        }
    }
}

impl std::error::Error for EventLogError {}

///
/// A single recorded execution: an ordered sequence of activity labels
///
/// Two traces are equal iff their label sequences are equal.
///
/// ```rust
/// use process_discovery::core::event_data::Trace;
///
/// let t = Trace::from("a b c");
/// assert_eq!(t.len(), 3);
/// assert_eq!(t.first(), Some("a"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Trace {
    activities: Vec<String>,
}

impl Trace {
    /// Create a new [`Trace`] from a sequence of activity labels
    pub fn new<S: Into<String>, I: IntoIterator<Item = S>>(activities: I) -> Self {
        Self {
            activities: activities.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of events in the trace
    pub fn len(&self) -> usize {
        self.activities.len()
    }

    /// Whether the trace has no events
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// Iterate over the activity labels in order
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.activities.iter().map(String::as_str)
    }

    /// Activity label at `index`
    pub fn get(&self, index: usize) -> Result<&str, EventLogError> {
        self.activities
            .get(index)
            .map(String::as_str)
            .ok_or(EventLogError::TraceIndexOutOfRange {
                index,
                len: self.activities.len(),
            })
    }

    /// First activity (if any)
    pub fn first(&self) -> Option<&str> {
        self.activities.first().map(String::as_str)
    }

    /// Last activity (if any)
    pub fn last(&self) -> Option<&str> {
        self.activities.last().map(String::as_str)
    }

    /// Activity labels as a slice
    pub fn as_slice(&self) -> &[String] {
        &self.activities
    }

    /// Set of distinct activities occurring in this trace
    pub fn activities(&self) -> BTreeSet<&str> {
        self.iter().collect()
    }

    /// Whether any activity occurs more than once
    pub fn has_repeated_activities(&self) -> bool {
        self.activities().len() != self.activities.len()
    }

    /// All pairs `(a, b)` such that `b` occurs directly after `a`
    pub fn directly_follows_pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.activities
            .windows(2)
            .map(|w| (w[0].as_str(), w[1].as_str()))
    }
}

impl From<&str> for Trace {
    /// Split a whitespace separated string into activity labels
    fn from(value: &str) -> Self {
        Trace::new(value.split_whitespace())
    }
}

impl From<Vec<String>> for Trace {
    fn from(activities: Vec<String>) -> Self {
        Self { activities }
    }
}

impl std::fmt::Display for Trace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>", self.activities.join(","))
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.activities.iter()
    }
}

///
/// Event log as a multiset of [`Trace`]s
///
/// Every distinct trace is stored once together with the number of times it was observed.
/// Traces are kept ordered, so every iteration over a log is deterministic.
///
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventLog {
    /// Distinct traces with their (positive) frequencies
    #[serde_as(as = "Vec<(_, _)>")]
    traces: BTreeMap<Trace, u64>,
    /// Log-level attributes (e.g., the name of the log); not interpreted by discovery
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl EventLog {
    /// Create new empty [`EventLog`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `frequency` occurrences of `trace`
    ///
    /// Frequencies of an already present trace are summed up.
    pub fn add_trace(&mut self, trace: Trace, frequency: u64) -> Result<(), EventLogError> {
        if frequency == 0 {
            return Err(EventLogError::ZeroFrequency(trace));
        }
        *self.traces.entry(trace).or_insert(0) += frequency;
        Ok(())
    }

    /// Builder-style variant of [`EventLog::add_trace`]
    pub fn with_trace(mut self, trace: Trace, frequency: u64) -> Result<Self, EventLogError> {
        self.add_trace(trace, frequency)?;
        Ok(self)
    }

    /// Iterate over distinct traces and their frequencies
    pub fn iter(&self) -> impl Iterator<Item = (&Trace, u64)> + '_ {
        self.traces.iter().map(|(t, f)| (t, *f))
    }

    /// Distinct traces (in deterministic order)
    pub fn distinct_traces(&self) -> Vec<&Trace> {
        self.traces.keys().collect()
    }

    /// Number of distinct traces
    pub fn num_distinct_traces(&self) -> usize {
        self.traces.len()
    }

    /// Frequency of the given trace (0 if not present)
    pub fn frequency_of(&self, trace: &Trace) -> u64 {
        self.traces.get(trace).copied().unwrap_or(0)
    }

    /// Total number of traces, i.e., the sum of all frequencies
    pub fn population(&self) -> u64 {
        self.traces.values().sum()
    }

    /// Whether the log contains no traces
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// All activities that occur in some trace
    pub fn seen_activities(&self) -> BTreeSet<String> {
        self.traces
            .keys()
            .flat_map(|t| t.iter().map(str::to_string))
            .collect()
    }

    /// First activity of each (non-empty) distinct trace
    pub fn seen_start_activities(&self) -> BTreeSet<String> {
        self.traces
            .keys()
            .filter_map(|t| t.first().map(str::to_string))
            .collect()
    }

    /// Last activity of each (non-empty) distinct trace
    pub fn seen_end_activities(&self) -> BTreeSet<String> {
        self.traces
            .keys()
            .filter_map(|t| t.last().map(str::to_string))
            .collect()
    }

    /// New log with `keep` applied to every trace
    ///
    /// Traces becoming equal are merged (frequencies summed up).
    pub fn map_traces<F: Fn(&Trace) -> Trace>(&self, keep: F) -> EventLog {
        let mut ret = EventLog {
            traces: BTreeMap::new(),
            attributes: self.attributes.clone(),
        };
        for (t, f) in &self.traces {
            *ret.traces.entry(keep(t)).or_insert(0) += f;
        }
        ret
    }
}

impl FromIterator<(Trace, u64)> for EventLog {
    /// Collect `(trace, frequency)` pairs; zero frequencies are skipped
    fn from_iter<T: IntoIterator<Item = (Trace, u64)>>(iter: T) -> Self {
        let mut log = EventLog::new();
        for (t, f) in iter {
            if f > 0 {
                *log.traces.entry(t).or_insert(0) += f;
            }
        }
        log
    }
}

impl FromIterator<Trace> for EventLog {
    fn from_iter<T: IntoIterator<Item = Trace>>(iter: T) -> Self {
        iter.into_iter().map(|t| (t, 1)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_basics() {
        let t = Trace::from("a b  c\tb");
        assert_eq!(t.len(), 4);
        assert_eq!(t.get(2), Ok("c"));
        assert_eq!(
            t.get(4),
            Err(EventLogError::TraceIndexOutOfRange { index: 4, len: 4 })
        );
        assert!(t.has_repeated_activities());
        assert_eq!(
            t.directly_follows_pairs().collect::<Vec<_>>(),
            vec![("a", "b"), ("b", "c"), ("c", "b")]
        );
        assert_eq!(t.to_string(), "<a,b,c,b>");
    }

    #[test]
    fn event_log_multiset() {
        let mut log = EventLog::new();
        log.add_trace("a b c".into(), 2).unwrap();
        log.add_trace("a c b".into(), 1).unwrap();
        log.add_trace("a b c".into(), 3).unwrap();
        assert_eq!(log.num_distinct_traces(), 2);
        assert_eq!(log.population(), 6);
        assert_eq!(log.frequency_of(&"a b c".into()), 5);
        assert_eq!(log.frequency_of(&"c".into()), 0);
        assert!(matches!(
            log.add_trace("x".into(), 0),
            Err(EventLogError::ZeroFrequency(_))
        ));
        assert_eq!(
            log.seen_activities(),
            ["a", "b", "c"].iter().map(|s| s.to_string()).collect()
        );
        assert_eq!(
            log.seen_start_activities(),
            ["a"].iter().map(|s| s.to_string()).collect()
        );
        assert_eq!(
            log.seen_end_activities(),
            ["b", "c"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn event_log_json_roundtrip() {
        let log: EventLog = vec![Trace::from("a b"), Trace::from("a b"), Trace::from("b")]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&log).unwrap();
        let log2: EventLog = serde_json::from_str(&json).unwrap();
        assert_eq!(log, log2);
        assert_eq!(log2.frequency_of(&"a b".into()), 2);
    }
}
