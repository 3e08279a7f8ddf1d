use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::petri_net_struct::{LabelledPetriNet, Marking, PetriNetError, PlaceID, TransitionID};

///
/// Errors of the token game
///
/// Firing a transition that is not enabled is a logic error of the caller;
/// check [`PetriNetMarking::enabled`] first.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FiringError {
    /// Transition is part of the net but not enabled in the marking
    NotEnabled(TransitionID),
    /// Transition is not part of the net of the marking
    UnknownTransition(TransitionID),
}

impl std::fmt::Display for FiringError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FiringError::NotEnabled(t) => write!(f, "Transition {} is not enabled", t.0),
            FiringError::UnknownTransition(t) => write!(f, "Unknown transition {}", t.0),
        }
    }
}

impl std::error::Error for FiringError {}

///
/// Marking of a [`LabelledPetriNet`]: a multiset of tokens over its places
///
/// Markings are values: [`PetriNetMarking::fire`] returns a new marking and leaves the
/// original untouched, so alternative firing sequences can branch off the same marking.
/// Two markings are equal iff they belong to the same shared net (the same [`Arc`]) and
/// hold the same tokens (places without tokens are not stored).
///
#[derive(Debug, Clone)]
pub struct PetriNetMarking {
    net: Arc<LabelledPetriNet>,
    tokens: BTreeMap<PlaceID, u64>,
}

impl PartialEq for PetriNetMarking {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.net, &other.net) && self.tokens == other.tokens
    }
}

impl Eq for PetriNetMarking {}

impl Hash for PetriNetMarking {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tokens.hash(state);
    }
}

impl PetriNetMarking {
    /// Marking of `net` with the given token counts
    pub fn new(net: Arc<LabelledPetriNet>, tokens: &Marking) -> Result<Self, PetriNetError> {
        let mut ret = Self::empty(net);
        for (p, n) in tokens {
            if ret.net.place(p).is_none() {
                return Err(PetriNetError::UnknownPlace(*p));
            }
            if *n > 0 {
                ret.tokens.insert(*p, *n);
            }
        }
        Ok(ret)
    }

    /// Marking of `net` without any tokens
    pub fn empty(net: Arc<LabelledPetriNet>) -> Self {
        Self {
            net,
            tokens: BTreeMap::new(),
        }
    }

    /// The net this marking belongs to
    pub fn net(&self) -> &LabelledPetriNet {
        &self.net
    }

    /// Number of tokens in place `p`
    pub fn tokens_at(&self, p: &PlaceID) -> u64 {
        self.tokens.get(p).copied().unwrap_or(0)
    }

    /// Total number of tokens over all places
    pub fn total_tokens(&self) -> u64 {
        self.tokens.values().sum()
    }

    /// Marked places with their token counts
    pub fn iter(&self) -> impl Iterator<Item = (&PlaceID, &u64)> + '_ {
        self.tokens.iter()
    }

    /// Plain place to token count map (e.g., for exporters)
    pub fn to_marking_map(&self) -> Marking {
        self.tokens.iter().map(|(p, n)| (*p, *n)).collect()
    }

    /// Whether `t` is enabled, i.e., every input place holds enough tokens
    pub fn is_enabled(&self, t: &TransitionID) -> bool {
        self.net.transition(t).is_some()
            && self
                .net
                .input_flows(*t)
                .iter()
                .all(|(p, n)| self.tokens_at(p) >= *n)
    }

    /// All transitions enabled in this marking
    pub fn enabled(&self) -> BTreeSet<TransitionID> {
        self.net
            .transitions()
            .map(|t| t.id())
            .filter(|t| self.is_enabled(t))
            .collect()
    }

    /// Whether no transition is enabled
    pub fn is_dead(&self) -> bool {
        !self.net.transitions().any(|t| self.is_enabled(&t.id()))
    }

    /// Fire `t`, returning the resulting marking
    pub fn fire(&self, t: &TransitionID) -> Result<Self, FiringError> {
        if self.net.transition(t).is_none() {
            return Err(FiringError::UnknownTransition(*t));
        }
        if !self.is_enabled(t) {
            return Err(FiringError::NotEnabled(*t));
        }
        let mut tokens = self.tokens.clone();
        for (p, n) in self.net.input_flows(*t) {
            if let Some(count) = tokens.get_mut(p) {
                *count -= n;
                if *count == 0 {
                    tokens.remove(p);
                }
            }
        }
        for (p, n) in self.net.output_flows(*t) {
            if *n > 0 {
                *tokens.entry(*p).or_insert(0) += n;
            }
        }
        Ok(Self {
            net: Arc::clone(&self.net),
            tokens,
        })
    }

    /// Fire the given transitions one after another
    pub fn fire_sequence<'a, I: IntoIterator<Item = &'a TransitionID>>(
        &self,
        sequence: I,
    ) -> Result<Self, FiringError> {
        sequence
            .into_iter()
            .try_fold(self.clone(), |m, t| m.fire(t))
    }
}

impl std::fmt::Display for PetriNetMarking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .tokens
            .iter()
            .map(|(p, n)| match self.net.place(p) {
                Some(place) => format!("{}:{}", place.name(), n),
                None => format!("{}:{}", p.0, n),
            })
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

///
/// A [`LabelledPetriNet`] together with an initial and (at least one) final marking
///
#[derive(Debug, Clone)]
pub struct AcceptingPetriNet {
    net: Arc<LabelledPetriNet>,
    initial_marking: PetriNetMarking,
    final_markings: Vec<PetriNetMarking>,
}

impl AcceptingPetriNet {
    /// Combine a net with its initial and final markings
    pub fn new(
        net: LabelledPetriNet,
        initial_marking: &Marking,
        final_markings: &[Marking],
    ) -> Result<Self, PetriNetError> {
        if final_markings.is_empty() {
            return Err(PetriNetError::NoFinalMarking);
        }
        let net = Arc::new(net);
        let initial_marking = PetriNetMarking::new(Arc::clone(&net), initial_marking)?;
        let final_markings = final_markings
            .iter()
            .map(|m| PetriNetMarking::new(Arc::clone(&net), m))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            net,
            initial_marking,
            final_markings,
        })
    }

    /// The underlying net
    pub fn net(&self) -> &LabelledPetriNet {
        &self.net
    }

    /// Shared handle to the underlying net
    pub fn shared_net(&self) -> Arc<LabelledPetriNet> {
        Arc::clone(&self.net)
    }

    /// Initial marking
    pub fn initial_marking(&self) -> &PetriNetMarking {
        &self.initial_marking
    }

    /// Final markings (any of them is accepted)
    pub fn final_markings(&self) -> &[PetriNetMarking] {
        &self.final_markings
    }

    /// Whether `marking` equals one of the final markings
    pub fn reached_final(&self, marking: &PetriNetMarking) -> bool {
        self.final_markings.iter().any(|m| m == marking)
    }

    /// Replay a sequence of activity labels, firing the first enabled transition per label
    ///
    /// Returns the reached marking, or `None` if some label has no enabled transition.
    /// Silent transitions are never fired.
    pub fn replay_labels<'a, I: IntoIterator<Item = &'a str>>(
        &self,
        labels: I,
    ) -> Option<PetriNetMarking> {
        let mut marking = self.initial_marking.clone();
        for label in labels {
            let t = self
                .net
                .transitions_by_label(label)
                .into_iter()
                .find(|t| marking.is_enabled(t))?;
            marking = marking.fire(&t).ok()?;
        }
        Some(marking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::process_models::petri_net::petri_net_struct::{
        ArcType, Flow, LabelledPetriNetBuilder,
    };

    /// p0 -> a -> p1 -> b -> p2, and c consuming from p1 and producing into p1 and p3
    fn sample() -> (Arc<LabelledPetriNet>, [PlaceID; 4], [TransitionID; 3]) {
        let mut b = LabelledPetriNetBuilder::new();
        let p0 = b.add_place("p0", None);
        let p1 = b.add_place("p1", None);
        let p2 = b.add_place("p2", None);
        let p3 = b.add_place("p3", None);
        let ta = b.add_transition("a", None);
        let tb = b.add_transition("b", None);
        let tc = b.add_transition("c", None);
        b.add_arc(ArcType::place_to_transition(p0, ta), None);
        b.add_arc(ArcType::transition_to_place(ta, p1), None);
        b.add_arc(ArcType::place_to_transition(p1, tb), None);
        b.add_arc(ArcType::transition_to_place(tb, p2), None);
        b.add_arc(ArcType::place_to_transition(p1, tc), None);
        b.add_arc(ArcType::transition_to_place(tc, p1), None);
        b.add_arc(
            ArcType::transition_to_place(tc, p3),
            Some(Flow::Population(2)),
        );
        (Arc::new(b.build().unwrap()), [p0, p1, p2, p3], [ta, tb, tc])
    }

    #[test]
    fn enabled_and_fire() {
        let (net, [p0, p1, p2, p3], [ta, tb, tc]) = sample();
        let m0 = PetriNetMarking::new(net.clone(), &[(p0, 1)].into_iter().collect()).unwrap();
        assert_eq!(m0.enabled(), [ta].into_iter().collect());
        assert_eq!(m0.fire(&tb), Err(FiringError::NotEnabled(tb)));

        let m1 = m0.fire(&ta).unwrap();
        // firing never touches the source marking
        assert_eq!(m0.tokens_at(&p0), 1);
        assert_eq!(m1.tokens_at(&p0), 0);
        assert_eq!(m1.tokens_at(&p1), 1);
        assert_eq!(m1.enabled(), [tb, tc].into_iter().collect());

        let m2 = m1.fire(&tc).unwrap();
        assert_eq!(m2.tokens_at(&p1), 1);
        assert_eq!(m2.tokens_at(&p3), 2);
        let m3 = m2.fire(&tb).unwrap();
        assert_eq!(m3.tokens_at(&p2), 1);
        assert!(m3.is_dead());
        assert_eq!(m3.total_tokens(), 3);

        let direct = m0.fire_sequence(&[ta, tc, tb]).unwrap();
        assert_eq!(direct, m3);
        assert_eq!(
            m0.fire_sequence(&[ta, tb, tb]),
            Err(FiringError::NotEnabled(tb))
        );
    }

    #[test]
    fn conservation_outside_pre_and_postsets() {
        let (net, places, transitions) = sample();
        let start: Marking = places.iter().map(|p| (*p, 3)).collect();
        let m = PetriNetMarking::new(net.clone(), &start).unwrap();
        for t in transitions {
            assert!(m.is_enabled(&t));
            let next = m.fire(&t).unwrap();
            let pre = net.preset_of_transition(t);
            let post = net.postset_of_transition(t);
            for p in places {
                if !pre.contains(&p) && !post.contains(&p) {
                    assert_eq!(next.tokens_at(&p), m.tokens_at(&p));
                }
            }
            let consumed: u64 = net.input_flows(t).iter().map(|(_, n)| n).sum();
            let produced: u64 = net.output_flows(t).iter().map(|(_, n)| n).sum();
            assert_eq!(next.total_tokens() + consumed, m.total_tokens() + produced);
        }
    }

    #[test]
    fn unknown_transitions_and_places() {
        let (net, _, _) = sample();
        let m = PetriNetMarking::empty(net.clone());
        let ghost = TransitionID(uuid::Uuid::new_v4());
        assert_eq!(m.fire(&ghost), Err(FiringError::UnknownTransition(ghost)));
        let ghost_place = PlaceID(uuid::Uuid::new_v4());
        assert_eq!(
            PetriNetMarking::new(net, &[(ghost_place, 1)].into_iter().collect()).unwrap_err(),
            PetriNetError::UnknownPlace(ghost_place)
        );
    }

    #[test]
    fn equality_requires_the_same_net() {
        let (net, [p0, ..], _) = sample();
        let tokens: Marking = [(p0, 1)].into_iter().collect();
        let m = PetriNetMarking::new(net.clone(), &tokens).unwrap();
        assert_eq!(m, PetriNetMarking::new(net.clone(), &tokens).unwrap());

        // same place ids, but a distinct net value
        let copy = Arc::new((*net).clone());
        let other = PetriNetMarking::new(copy, &tokens).unwrap();
        assert_eq!(other.tokens_at(&p0), m.tokens_at(&p0));
        assert_ne!(m, other);
    }

    #[test]
    fn accepting_net() {
        let (net, [p0, _, p2, p3], _) = sample();
        let net = (*net).clone();
        let apn = AcceptingPetriNet::new(
            net,
            &[(p0, 1)].into_iter().collect(),
            &[
                [(p2, 1)].into_iter().collect(),
                [(p2, 1), (p3, 2)].into_iter().collect(),
            ],
        )
        .unwrap();
        let end = apn.replay_labels(["a", "c", "b"]).unwrap();
        assert!(apn.reached_final(&end));
        let end = apn.replay_labels(["a", "b"]).unwrap();
        assert!(apn.reached_final(&end));
        assert!(apn.replay_labels(["b"]).is_none());
        assert!(!apn.reached_final(apn.initial_marking()));
        assert_eq!(apn.initial_marking().to_string(), "[p0:1]");
    }
}
