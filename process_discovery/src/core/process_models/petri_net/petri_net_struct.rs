use std::collections::{BTreeMap, BTreeSet, HashMap};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use uuid::Uuid;

///
/// Errors when assembling a [`LabelledPetriNet`] or one of its markings
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PetriNetError {
    /// An arc or marking refers to a place that is not part of the net
    UnknownPlace(PlaceID),
    /// An arc refers to a transition that is not part of the net
    UnknownTransition(TransitionID),
    /// An accepting Petri net needs at least one final marking
    NoFinalMarking,
}

impl std::fmt::Display for PetriNetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PetriNetError::UnknownPlace(p) => write!(f, "Unknown place {}", p.0),
            PetriNetError::UnknownTransition(t) => write!(f, "Unknown transition {}", t.0),
            PetriNetError::NoFinalMarking => write!(f, "No final marking"),
        }
    }
}

impl std::error::Error for PetriNetError {}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Hash, Eq, PartialOrd, Ord)]
/// Place in a Petri net
///
/// Identified by its name together with its id.
pub struct Place {
    name: String,
    id: Uuid,
}

impl Place {
    /// Create a place with a freshly generated id
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self::with_id(name, Uuid::new_v4())
    }
    /// Create a place with the given id
    pub fn with_id<S: Into<String>>(name: S, id: Uuid) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
    /// Name of the place
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Id of the place
    pub fn id(&self) -> PlaceID {
        PlaceID(self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Hash, Eq, PartialOrd, Ord)]
/// Transition in a Petri net
///
/// Identified by name, id, weight and whether it is _silent_ (invisible).
pub struct Transition {
    name: String,
    id: Uuid,
    weight: OrderedFloat<f64>,
    silent: bool,
}

impl Transition {
    /// Create a visible transition (weight 1) with a freshly generated id
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self::with_id(name, Uuid::new_v4())
    }
    /// Create a visible transition (weight 1) with the given id
    pub fn with_id<S: Into<String>>(name: S, id: Uuid) -> Self {
        Self {
            name: name.into(),
            id,
            weight: OrderedFloat(1.0),
            silent: false,
        }
    }
    /// Create a silent transition (weight 1) with a freshly generated id
    pub fn silent<S: Into<String>>(name: S) -> Self {
        Self {
            silent: true,
            ..Self::new(name)
        }
    }
    /// Copy of this transition with the given weight
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = OrderedFloat(weight);
        self
    }
    /// Name of the transition
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Id of the transition
    pub fn id(&self) -> TransitionID {
        TransitionID(self.id)
    }
    /// Weight of the transition
    pub fn weight(&self) -> f64 {
        self.weight.0
    }
    /// Whether the transition is silent
    pub fn is_silent(&self) -> bool {
        self.silent
    }
    /// Transition label (None if this transition is _silent_)
    pub fn label(&self) -> Option<&str> {
        (!self.silent).then_some(self.name.as_str())
    }
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialOrd, Ord)]
/// Place ID
pub struct PlaceID(pub Uuid);
impl PlaceID {
    /// Get UUID
    pub fn get_uuid(self) -> Uuid {
        self.0
    }
}
impl From<&Place> for PlaceID {
    fn from(value: &Place) -> Self {
        PlaceID(value.id)
    }
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialOrd, Ord)]
/// Transition ID
pub struct TransitionID(pub Uuid);
impl From<&Transition> for TransitionID {
    fn from(value: &Transition) -> Self {
        TransitionID(value.id)
    }
}
impl TransitionID {
    /// Get UUID
    pub fn get_uuid(self) -> Uuid {
        self.0
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Nodes (Places or Transitions) in a Petri net
pub enum PetriNetNodes {
    /// None
    None,
    /// List of places
    Places(Vec<PlaceID>),
    /// List of transitions
    Transitions(Vec<TransitionID>),
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(tag = "type", content = "nodes")]
/// Arc type in a Petri net
///
/// Arcs always connect a place with a transition, never two nodes of the same kind.
pub enum ArcType {
    /// From Place to Transition
    PlaceTransition(PlaceID, TransitionID),
    /// From Transition to Place
    TransitionPlace(TransitionID, PlaceID),
}

impl ArcType {
    /// Create new from place to transition
    pub fn place_to_transition(from: PlaceID, to: TransitionID) -> ArcType {
        ArcType::PlaceTransition(from, to)
    }
    /// Create new from transition to place
    pub fn transition_to_place(from: TransitionID, to: PlaceID) -> ArcType {
        ArcType::TransitionPlace(from, to)
    }
    /// Place and transition connected by this arc
    pub fn endpoints(&self) -> (PlaceID, TransitionID) {
        match *self {
            ArcType::PlaceTransition(p, t) | ArcType::TransitionPlace(t, p) => (p, t),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(tag = "kind", content = "data")]
///
/// What an [`Arc`] carries between a place and a transition
///
pub enum Flow {
    /// Plain token flow moving the given number of tokens
    Population(u32),
    /// Token flow annotated with a guard predicate
    ///
    /// The predicate is opaque here; it is evaluated by decision-mining components.
    Guard(String),
    /// Token flow that also reads or writes the named data variables
    Information(Vec<String>),
}

impl Default for Flow {
    fn default() -> Self {
        Flow::Population(1)
    }
}

impl Flow {
    /// Number of tokens moved when firing along this flow
    pub fn tokens(&self) -> u64 {
        match self {
            Flow::Population(n) => u64::from(*n),
            Flow::Guard(_) | Flow::Information(_) => 1,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
/// Arc in a Petri net
///
/// Connecting a transition and a place (or the other way around)
pub struct Arc {
    /// Source and target of Arc
    pub from_to: ArcType,
    /// What the arc carries
    #[serde(default)]
    pub flow: Flow,
}

/// Marking of a Petri net: Assigning [`PlaceID`]s to a number of tokens
pub type Marking = HashMap<PlaceID, u64>;

#[serde_as]
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
///
/// Mutable assembly area for a [`LabelledPetriNet`]
///
pub struct LabelledPetriNetBuilder {
    /// Places
    #[serde_as(as = "Vec<(_, _)>")]
    pub places: BTreeMap<PlaceID, Place>,
    /// Transitions
    #[serde_as(as = "Vec<(_, _)>")]
    pub transitions: BTreeMap<TransitionID, Transition>,
    /// Arcs
    pub arcs: Vec<Arc>,
}

impl LabelledPetriNetBuilder {
    /// Create new builder with no places or transitions
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a place (with an optional passed UUID)
    ///
    /// If no ID is passed, a new UUID will be generated
    pub fn add_place<S: Into<String>>(&mut self, name: S, place_id: Option<Uuid>) -> PlaceID {
        let place = Place::with_id(name, place_id.unwrap_or_else(Uuid::new_v4));
        self.insert_place(place)
    }

    /// Add an already constructed [`Place`]
    pub fn insert_place(&mut self, place: Place) -> PlaceID {
        let id = place.id();
        self.places.insert(id, place);
        id
    }

    /// Add a visible transition (with an optional passed UUID)
    ///
    /// If no ID is passed, a new UUID will be generated
    pub fn add_transition<S: Into<String>>(
        &mut self,
        name: S,
        transition_id: Option<Uuid>,
    ) -> TransitionID {
        let transition = Transition::with_id(name, transition_id.unwrap_or_else(Uuid::new_v4));
        self.insert_transition(transition)
    }

    /// Add an already constructed [`Transition`]
    pub fn insert_transition(&mut self, transition: Transition) -> TransitionID {
        let id = transition.id();
        self.transitions.insert(id, transition);
        id
    }

    /// Add an arc (a unit [`Flow::Population`] flow if no flow is passed)
    pub fn add_arc(&mut self, from_to: ArcType, flow: Option<Flow>) {
        self.arcs.push(Arc {
            from_to,
            flow: flow.unwrap_or_default(),
        });
    }

    /// Remove any node (Transition/Place) together with its arcs
    pub fn remove_node(&mut self, id: &Uuid) {
        self.places.remove(&PlaceID(*id));
        self.transitions.remove(&TransitionID(*id));
        self.arcs.retain(|arc| {
            let (p, t) = arc.from_to.endpoints();
            p.0 != *id && t.0 != *id
        });
    }

    /// Validate the arcs and compute the pre-/postset caches
    pub fn build(self) -> Result<LabelledPetriNet, PetriNetError> {
        LabelledPetriNet::try_from(self)
    }
}

#[derive(Debug, Clone, Default)]
struct NodeIndex {
    place_preset: BTreeMap<PlaceID, Vec<TransitionID>>,
    place_postset: BTreeMap<PlaceID, Vec<TransitionID>>,
    transition_inputs: BTreeMap<TransitionID, Vec<(PlaceID, u64)>>,
    transition_outputs: BTreeMap<TransitionID, Vec<(PlaceID, u64)>>,
}

fn add_unique<T: PartialEq>(v: &mut Vec<T>, item: T) {
    if !v.contains(&item) {
        v.push(item);
    }
}

fn add_tokens(v: &mut Vec<(PlaceID, u64)>, place: PlaceID, tokens: u64) {
    match v.iter_mut().find(|(p, _)| *p == place) {
        Some((_, n)) => *n += tokens,
        None => v.push((place, tokens)),
    }
}

impl NodeIndex {
    fn new(net: &LabelledPetriNetBuilder) -> Self {
        let mut index = NodeIndex::default();
        for p in net.places.keys() {
            index.place_preset.insert(*p, Vec::new());
            index.place_postset.insert(*p, Vec::new());
        }
        for t in net.transitions.keys() {
            index.transition_inputs.insert(*t, Vec::new());
            index.transition_outputs.insert(*t, Vec::new());
        }
        for arc in &net.arcs {
            let tokens = arc.flow.tokens();
            match arc.from_to {
                ArcType::PlaceTransition(p, t) => {
                    index.place_postset.entry(p).or_default().push(t);
                    add_tokens(index.transition_inputs.entry(t).or_default(), p, tokens);
                }
                ArcType::TransitionPlace(t, p) => {
                    index.place_preset.entry(p).or_default().push(t);
                    add_tokens(index.transition_outputs.entry(t).or_default(), p, tokens);
                }
            }
        }
        for v in index
            .place_preset
            .values_mut()
            .chain(index.place_postset.values_mut())
        {
            let mut dedup = Vec::with_capacity(v.len());
            for t in v.drain(..) {
                add_unique(&mut dedup, t);
            }
            *v = dedup;
        }
        index
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "LabelledPetriNetBuilder", into = "LabelledPetriNetBuilder")]
///
/// A labelled Petri net of [`Place`]s and [`Transition`]s
///
/// Bipartite graph of [`Place`]s and [`Transition`]s with [`Arc`]s connecting them.
/// The net is immutable: pre- and postsets of every node are computed once on construction.
/// To change a net, go through [`LabelledPetriNet::to_builder`] and build a new one.
pub struct LabelledPetriNet {
    places: BTreeMap<PlaceID, Place>,
    transitions: BTreeMap<TransitionID, Transition>,
    arcs: Vec<Arc>,
    index: NodeIndex,
}

impl TryFrom<LabelledPetriNetBuilder> for LabelledPetriNet {
    type Error = PetriNetError;

    fn try_from(builder: LabelledPetriNetBuilder) -> Result<Self, Self::Error> {
        for arc in &builder.arcs {
            let (p, t) = arc.from_to.endpoints();
            if !builder.places.contains_key(&p) {
                return Err(PetriNetError::UnknownPlace(p));
            }
            if !builder.transitions.contains_key(&t) {
                return Err(PetriNetError::UnknownTransition(t));
            }
        }
        let index = NodeIndex::new(&builder);
        Ok(Self {
            places: builder.places,
            transitions: builder.transitions,
            arcs: builder.arcs,
            index,
        })
    }
}

impl From<LabelledPetriNet> for LabelledPetriNetBuilder {
    fn from(net: LabelledPetriNet) -> Self {
        Self {
            places: net.places,
            transitions: net.transitions,
            arcs: net.arcs,
        }
    }
}

impl LabelledPetriNet {
    /// Copy the net into a [`LabelledPetriNetBuilder`] for modification
    pub fn to_builder(&self) -> LabelledPetriNetBuilder {
        self.clone().into()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Places (ordered by id)
    pub fn places(&self) -> impl Iterator<Item = &Place> + '_ {
        self.places.values()
    }

    /// Transitions (ordered by id)
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> + '_ {
        self.transitions.values()
    }

    /// Arcs
    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    /// Number of places
    pub fn num_places(&self) -> usize {
        self.places.len()
    }

    /// Number of transitions
    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    /// Look up a place
    pub fn place(&self, id: &PlaceID) -> Option<&Place> {
        self.places.get(id)
    }

    /// Look up a transition
    pub fn transition(&self, id: &TransitionID) -> Option<&Transition> {
        self.transitions.get(id)
    }

    /// Place with the given name (first match in id order)
    pub fn place_by_name(&self, name: &str) -> Option<&Place> {
        self.places.values().find(|p| p.name == name)
    }

    /// Visible transitions carrying the given label
    pub fn transitions_by_label(&self, label: &str) -> Vec<TransitionID> {
        self.transitions
            .values()
            .filter(|t| t.label() == Some(label))
            .map(Transition::id)
            .collect()
    }

    /// Get the preset of a [`LabelledPetriNet`] node referred to by passed id
    pub fn preset_of(&self, id: Uuid) -> PetriNetNodes {
        if self.places.contains_key(&PlaceID(id)) {
            PetriNetNodes::Transitions(self.preset_of_place(PlaceID(id)))
        } else if self.transitions.contains_key(&TransitionID(id)) {
            PetriNetNodes::Places(self.preset_of_transition(TransitionID(id)))
        } else {
            PetriNetNodes::None
        }
    }

    /// Get postset of [`LabelledPetriNet`] node referred to by passed id
    pub fn postset_of(&self, id: Uuid) -> PetriNetNodes {
        if self.places.contains_key(&PlaceID(id)) {
            PetriNetNodes::Transitions(self.postset_of_place(PlaceID(id)))
        } else if self.transitions.contains_key(&TransitionID(id)) {
            PetriNetNodes::Places(self.postset_of_transition(TransitionID(id)))
        } else {
            PetriNetNodes::None
        }
    }

    /// Get the preset of a [`LabelledPetriNet`] place
    pub fn preset_of_place(&self, p: PlaceID) -> Vec<TransitionID> {
        self.index.place_preset.get(&p).cloned().unwrap_or_default()
    }

    /// Get postset of [`LabelledPetriNet`] place
    pub fn postset_of_place(&self, p: PlaceID) -> Vec<TransitionID> {
        self.index
            .place_postset
            .get(&p)
            .cloned()
            .unwrap_or_default()
    }

    /// Get the preset of [`LabelledPetriNet`] transition
    pub fn preset_of_transition(&self, t: TransitionID) -> Vec<PlaceID> {
        self.input_flows(t).iter().map(|(p, _)| *p).collect()
    }

    /// Get postset of [`LabelledPetriNet`] transition
    pub fn postset_of_transition(&self, t: TransitionID) -> Vec<PlaceID> {
        self.output_flows(t).iter().map(|(p, _)| *p).collect()
    }

    /// Places consumed from when firing `t`, with the number of tokens each
    pub fn input_flows(&self, t: TransitionID) -> &[(PlaceID, u64)] {
        self.index
            .transition_inputs
            .get(&t)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Places produced into when firing `t`, with the number of tokens each
    pub fn output_flows(&self, t: TransitionID) -> &[(PlaceID, u64)] {
        self.index
            .transition_outputs
            .get(&t)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Checks if the Petri net contains duplicate labels or silent transitions
    pub fn contains_duplicate_or_silent_transitions(&self) -> bool {
        let mut labels = BTreeSet::new();
        self.transitions
            .values()
            .any(|t| match t.label() {
                None => true,
                Some(l) => !labels.insert(l),
            })
    }
}
