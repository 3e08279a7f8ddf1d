use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::event_data::{DirectlyFollowsGraph, EventLog, Trace};
use crate::core::process_models::petri_net::{
    AcceptingPetriNet, ArcType, LabelledPetriNetBuilder, Marking, PetriNetError, PlaceID,
    TransitionID,
};
use crate::utils::Executor;

use super::footprint::FootprintMatrix;
use super::pair_building::{build_pairs, maximal_pairs, AlphaPair};

/// Name of the start place of discovered nets
pub const START_PLACE: &str = "I";
/// Name of the sink place of discovered nets
pub const END_PLACE: &str = "O";

/// Marks "trace start" among the predecessors of length-one loops
const ARTIFICIAL_START: &str = "__START";
/// Marks "trace end" among the successors of length-one loops
const ARTIFICIAL_END: &str = "__END";

///
/// Errors of the Alpha miner family
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlphaError {
    /// Log does not contain a single activity
    EmptyLog,
    /// Activity sets do not form a valid [`AlphaPair`]
    InvalidPair {
        /// Left (input) activities
        left: Vec<String>,
        /// Right (output) activities
        right: Vec<String>,
    },
    /// Assembling the discovered Petri net failed
    PetriNet(PetriNetError),
}

impl std::fmt::Display for AlphaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlphaError::EmptyLog => write!(f, "Event log contains no activities"),
            AlphaError::InvalidPair { left, right } => {
                write!(f, "({left:?}, {right:?}) is not a valid Alpha pair")
            }
            AlphaError::PetriNet(e) => write!(f, "Could not build Petri net: {e}"),
        }
    }
}

impl std::error::Error for AlphaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AlphaError::PetriNet(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PetriNetError> for AlphaError {
    fn from(e: PetriNetError) -> Self {
        Self::PetriNet(e)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
/// Algorithm parameters for the Alpha and Alpha+ miner
pub struct AlphaMinerConfig {
    /// Minimal (trace-frequency weighted) number of observations of a directly-follows pair
    pub min_instances: u64,
    /// How to run the data-parallel steps
    #[serde(default)]
    pub executor: Executor,
}

impl Default for AlphaMinerConfig {
    fn default() -> Self {
        Self {
            min_instances: 1,
            executor: Executor::Sequential,
        }
    }
}

impl AlphaMinerConfig {
    /// Serialize parameters to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
    /// Deserialize parameters from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn place_id(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("place:{name}").as_bytes())
}

fn transition_id(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("transition:{name}").as_bytes())
}

/// Petri net under construction, with lookup of the synthesized nodes
struct NetSynthesis {
    builder: LabelledPetriNetBuilder,
    transitions: BTreeMap<String, TransitionID>,
    places: Vec<(AlphaPair, PlaceID)>,
    start: PlaceID,
    end: PlaceID,
}

impl NetSynthesis {
    fn finish(self) -> Result<AcceptingPetriNet, AlphaError> {
        let initial: Marking = [(self.start, 1)].into_iter().collect();
        let fin: Marking = [(self.end, 1)].into_iter().collect();
        let net = self.builder.build()?;
        Ok(AcceptingPetriNet::new(net, &initial, &[fin])?)
    }
}

///
/// Alpha miner on one event log
///
/// [`AlphaMinerInstance::new`] computes the footprint, the start/end activities, all
/// [`AlphaPair`]s and the maximal ones; [`AlphaMinerInstance::discover`] synthesizes the
/// accepting Petri net from them.
///
/// ```rust
/// use process_discovery::{event_log, discovery::alpha::{AlphaMinerConfig, AlphaMinerInstance}};
///
/// let log = event_log!("a b d", "a c d");
/// let miner = AlphaMinerInstance::new(&log, AlphaMinerConfig::default()).unwrap();
/// let net = miner.discover().unwrap();
/// assert_eq!(net.net().num_places(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct AlphaMinerInstance {
    config: AlphaMinerConfig,
    footprint: FootprintMatrix,
    start_activities: BTreeSet<String>,
    end_activities: BTreeSet<String>,
    pairs: BTreeSet<AlphaPair>,
    maximal_pairs: Vec<AlphaPair>,
}

impl AlphaMinerInstance {
    /// Run steps 1 to 5 of the Alpha miner (activities up to maximal pairs)
    pub fn new(log: &EventLog, config: AlphaMinerConfig) -> Result<Self, AlphaError> {
        let footprint = FootprintMatrix::from_log(log, config.min_instances, config.executor);
        Self::with_footprint(log, config, footprint)
    }

    fn with_footprint(
        log: &EventLog,
        config: AlphaMinerConfig,
        footprint: FootprintMatrix,
    ) -> Result<Self, AlphaError> {
        if footprint.activities().is_empty() {
            return Err(AlphaError::EmptyLog);
        }
        log::info!(
            "Alpha miner on {} distinct traces over {} activities",
            log.num_distinct_traces(),
            footprint.activities().len()
        );
        let pairs = build_pairs(&footprint, config.executor);
        let maximal_pairs = maximal_pairs(&pairs, config.executor);
        log::debug!(
            "Built {} pairs, {} of them maximal",
            pairs.len(),
            maximal_pairs.len()
        );
        Ok(Self {
            config,
            footprint,
            start_activities: log.seen_start_activities(),
            end_activities: log.seen_end_activities(),
            pairs,
            maximal_pairs,
        })
    }

    /// Parameters in use
    pub fn config(&self) -> &AlphaMinerConfig {
        &self.config
    }

    /// Footprint of the log
    pub fn footprint(&self) -> &FootprintMatrix {
        &self.footprint
    }

    /// All activities of the log (sorted)
    pub fn activities(&self) -> &[String] {
        self.footprint.activities()
    }

    /// Activities some trace starts with
    pub fn start_activities(&self) -> &BTreeSet<String> {
        &self.start_activities
    }

    /// Activities some trace ends with
    pub fn end_activities(&self) -> &BTreeSet<String> {
        &self.end_activities
    }

    /// All valid pairs
    pub fn pairs(&self) -> &BTreeSet<AlphaPair> {
        &self.pairs
    }

    /// Pairs not subsumed by another pair (one place each)
    pub fn maximal_pairs(&self) -> &[AlphaPair] {
        &self.maximal_pairs
    }

    fn synthesize<'a, I: IntoIterator<Item = &'a String>>(
        &'a self,
        extra_transitions: I,
    ) -> NetSynthesis {
        let mut builder = LabelledPetriNetBuilder::new();
        let transitions: BTreeMap<String, TransitionID> = self
            .activities()
            .iter()
            .chain(extra_transitions)
            .map(|a| {
                let id = builder.add_transition(a.as_str(), Some(transition_id(a)));
                (a.clone(), id)
            })
            .collect();

        let start = builder.add_place(START_PLACE, Some(place_id(START_PLACE)));
        let end = builder.add_place(END_PLACE, Some(place_id(END_PLACE)));
        for a in &self.start_activities {
            if let Some(t) = transitions.get(a) {
                builder.add_arc(ArcType::place_to_transition(start, *t), None);
            }
        }
        for a in &self.end_activities {
            if let Some(t) = transitions.get(a) {
                builder.add_arc(ArcType::transition_to_place(*t, end), None);
            }
        }

        let mut places = Vec::with_capacity(self.maximal_pairs.len());
        for pair in &self.maximal_pairs {
            let name = pair.place_name();
            let p = builder.add_place(name.as_str(), Some(place_id(&name)));
            for a in pair.left() {
                if let Some(t) = transitions.get(a) {
                    builder.add_arc(ArcType::transition_to_place(*t, p), None);
                }
            }
            for b in pair.right() {
                if let Some(t) = transitions.get(b) {
                    builder.add_arc(ArcType::place_to_transition(p, *t), None);
                }
            }
            places.push((pair.clone(), p));
        }
        NetSynthesis {
            builder,
            transitions,
            places,
            start,
            end,
        }
    }

    /// Run steps 6 and 7 (places and flows), returning the discovered net
    pub fn discover(&self) -> Result<AcceptingPetriNet, AlphaError> {
        let net = self.synthesize(std::iter::empty()).finish()?;
        log::info!(
            "Alpha miner discovered {} places, {} transitions and {} arcs",
            net.net().num_places(),
            net.net().num_transitions(),
            net.net().arcs().len()
        );
        Ok(net)
    }
}

/// Discover an [`AcceptingPetriNet`] using the Alpha miner
pub fn alpha_miner_discover_petri_net(
    log: &EventLog,
    config: AlphaMinerConfig,
) -> Result<AcceptingPetriNet, AlphaError> {
    AlphaMinerInstance::new(log, config)?.discover()
}

///
/// Neighbourhood of a length-one loop activity in the original log
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopContext {
    /// Activities directly preceding the loop activity (other loop activities excluded)
    pub predecessors: BTreeSet<String>,
    /// Activities directly following the loop activity (other loop activities excluded)
    pub successors: BTreeSet<String>,
}

///
/// Alpha+ miner on one event log
///
/// Length-one loops (`a > a`) are removed from the log, the remaining log is mined with
/// the Alpha+ footprint (detecting length-two loops), and each loop activity is added back
/// as a transition with a self-loop on the place(s) between its predecessors and successors.
///
#[derive(Debug, Clone)]
pub struct AlphaMinerPlusInstance {
    inner: AlphaMinerInstance,
    length_one_loops: BTreeMap<String, LoopContext>,
}

impl AlphaMinerPlusInstance {
    /// Detect length-one loops and run steps 1 to 5 on the loop-free log
    pub fn new(log: &EventLog, config: AlphaMinerConfig) -> Result<Self, AlphaError> {
        if log.seen_activities().is_empty() {
            return Err(AlphaError::EmptyLog);
        }
        let dfg = DirectlyFollowsGraph::from_log(log, config.executor);
        let df = dfg.df_pairs(config.min_instances);
        let loops: BTreeSet<String> = df
            .iter()
            .filter(|(a, b)| a == b)
            .map(|(a, _)| a.to_string())
            .collect();
        let starts = log.seen_start_activities();
        let ends = log.seen_end_activities();
        let length_one_loops: BTreeMap<String, LoopContext> = loops
            .iter()
            .map(|l| {
                let mut predecessors: BTreeSet<String> = df
                    .iter()
                    .filter(|(a, b)| b == l && !loops.contains(*a))
                    .map(|(a, _)| a.to_string())
                    .collect();
                let mut successors: BTreeSet<String> = df
                    .iter()
                    .filter(|(a, b)| a == l && !loops.contains(*b))
                    .map(|(_, b)| b.to_string())
                    .collect();
                if starts.contains(l) {
                    predecessors.insert(ARTIFICIAL_START.to_string());
                }
                if ends.contains(l) {
                    successors.insert(ARTIFICIAL_END.to_string());
                }
                (
                    l.clone(),
                    LoopContext {
                        predecessors,
                        successors,
                    },
                )
            })
            .collect();
        log::debug!("Found {} length-one loops", length_one_loops.len());

        let reduced = log.map_traces(|t| {
            Trace::new(t.iter().filter(|a| !loops.contains(*a)).map(str::to_string))
        });
        let footprint =
            FootprintMatrix::from_log_plus(&reduced, config.min_instances, config.executor);
        let inner = AlphaMinerInstance::with_footprint(&reduced, config, footprint)?;
        Ok(Self {
            inner,
            length_one_loops,
        })
    }

    /// Alpha miner run on the log without length-one loops
    pub fn inner(&self) -> &AlphaMinerInstance {
        &self.inner
    }

    /// Length-one loop activities and their neighbourhood
    pub fn length_one_loops(&self) -> &BTreeMap<String, LoopContext> {
        &self.length_one_loops
    }

    /// Discover the net, re-attaching length-one loops as self-loops
    pub fn discover(&self) -> Result<AcceptingPetriNet, AlphaError> {
        let mut synth = self.inner.synthesize(self.length_one_loops.keys());
        let start_pair = (
            BTreeSet::from([ARTIFICIAL_START.to_string()]),
            self.inner.start_activities.clone(),
        );
        let end_pair = (
            self.inner.end_activities.clone(),
            BTreeSet::from([ARTIFICIAL_END.to_string()]),
        );
        let mut candidates: Vec<(BTreeSet<String>, BTreeSet<String>, PlaceID)> = synth
            .places
            .iter()
            .map(|(pair, p)| (pair.left().clone(), pair.right().clone(), *p))
            .collect();
        candidates.push((start_pair.0, start_pair.1, synth.start));
        candidates.push((end_pair.0, end_pair.1, synth.end));

        for (activity, ctx) in &self.length_one_loops {
            let Some(t) = synth.transitions.get(activity).copied() else {
                continue;
            };
            let mut targets: Vec<PlaceID> = candidates
                .iter()
                .filter(|(l, r, _)| ctx.predecessors.is_subset(l) && ctx.successors.is_subset(r))
                .map(|(_, _, p)| *p)
                .collect();
            if targets.is_empty() {
                targets = candidates
                    .iter()
                    .filter(|(l, r, _)| {
                        !ctx.predecessors.is_disjoint(l) && !ctx.successors.is_disjoint(r)
                    })
                    .map(|(_, _, p)| *p)
                    .collect();
            }
            if targets.is_empty() {
                log::warn!("Length-one loop {activity} could not be attached to any place");
            }
            for p in targets {
                synth
                    .builder
                    .add_arc(ArcType::place_to_transition(p, t), None);
                synth
                    .builder
                    .add_arc(ArcType::transition_to_place(t, p), None);
            }
        }
        let net = synth.finish()?;
        log::info!(
            "Alpha+ miner discovered {} places, {} transitions and {} arcs",
            net.net().num_places(),
            net.net().num_transitions(),
            net.net().arcs().len()
        );
        Ok(net)
    }
}

/// Discover an [`AcceptingPetriNet`] using the Alpha+ miner
pub fn alpha_plus_miner_discover_petri_net(
    log: &EventLog,
    config: AlphaMinerConfig,
) -> Result<AcceptingPetriNet, AlphaError> {
    AlphaMinerPlusInstance::new(log, config)?.discover()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log;

    #[test]
    fn config_json() {
        let config = AlphaMinerConfig {
            min_instances: 3,
            executor: Executor::Parallel,
        };
        let json = config.to_json().unwrap();
        assert_eq!(AlphaMinerConfig::from_json(&json).unwrap(), config);
        let defaulted = AlphaMinerConfig::from_json(r#"{"min_instances": 2}"#).unwrap();
        assert_eq!(defaulted.executor, Executor::Sequential);
        assert!(AlphaMinerConfig::from_json("{").is_err());
    }

    #[test]
    fn empty_log() {
        let log = EventLog::new();
        assert_eq!(
            AlphaMinerInstance::new(&log, AlphaMinerConfig::default()).unwrap_err(),
            AlphaError::EmptyLog
        );
        assert_eq!(
            AlphaMinerPlusInstance::new(&log, AlphaMinerConfig::default()).unwrap_err(),
            AlphaError::EmptyLog
        );
    }

    #[test]
    fn deterministic_ids() {
        let log = event_log!("a b c", "a c b");
        let n1 = alpha_miner_discover_petri_net(&log, AlphaMinerConfig::default()).unwrap();
        let n2 = alpha_miner_discover_petri_net(&log, AlphaMinerConfig::default()).unwrap();
        assert_eq!(
            n1.net().to_json().unwrap(),
            n2.net().to_json().unwrap()
        );
    }
}
