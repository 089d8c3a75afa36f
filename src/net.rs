//! Petri net graph model.

use std::collections::{HashSet, VecDeque};

use educe::Educe;
use indexmap::IndexMap;
use thiserror::Error;

use crate::exec::TransitionSelector;
use crate::net::flow::{Inflow, Outflow};
use crate::net::place::Place;
use crate::net::trans::Transition;
use crate::types::TypeDescriptor;

pub mod flow;
pub mod place;
pub mod trans;

/// Errors raised while constructing or validating a net.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Two places share a name.
    #[error("duplicate place name {name:?}")]
    DuplicatePlace {
        /// The colliding name.
        name: String,
    },
    /// Two transitions share a name.
    #[error("duplicate transition name {name:?}")]
    DuplicateTrans {
        /// The colliding name.
        name: String,
    },
    /// An arc references a place that is not part of the net.
    #[error("arc references unknown place {place:?}")]
    UnknownPlace {
        /// The dangling place name.
        place: String,
    },
    /// An arc references a transition that is not part of the net.
    #[error("arc references unknown transition {transition:?}")]
    UnknownTrans {
        /// The dangling transition name.
        transition: String,
    },
    /// An inflow targets an argument the transition does not declare.
    #[error("transition {transition:?} declares no argument {argument:?}")]
    UnknownArgument {
        /// The transition name.
        transition: String,
        /// The undeclared argument name.
        argument: String,
    },
    /// Two inflows bind the same argument of one transition.
    #[error("argument {argument:?} of transition {transition:?} is bound by more than one inflow")]
    DuplicateArgument {
        /// The transition name.
        transition: String,
        /// The doubly bound argument name.
        argument: String,
    },
    /// An inflow's place type does not fit the declared argument type.
    #[error(
        "inflow from {place:?} to {transition:?}.{argument}: \
         place type {place_type} does not match argument type {argument_type}"
    )]
    ArgumentTypeMismatch {
        /// The source place name.
        place: String,
        /// The target transition name.
        transition: String,
        /// The bound argument name.
        argument: String,
        /// The place's declared element type.
        place_type: Box<TypeDescriptor>,
        /// The argument's declared type.
        argument_type: Box<TypeDescriptor>,
    },
    /// An outflow's place type does not fit the declared return type.
    #[error(
        "outflow from {transition:?} to {place:?}: \
         place type {place_type} does not match return type {return_type}"
    )]
    ReturnTypeMismatch {
        /// The source transition name.
        transition: String,
        /// The destination place name.
        place: String,
        /// The place's declared element type.
        place_type: Box<TypeDescriptor>,
        /// The transition's declared return type.
        return_type: Box<TypeDescriptor>,
    },
    /// A seed token does not inhabit its place's element type.
    #[error("token of type {found} does not inhabit place {place:?} of type {expected}")]
    TokenTypeMismatch {
        /// The place name.
        place: String,
        /// The place's declared element type.
        expected: TypeDescriptor,
        /// The offending token's runtime type.
        found: String,
    },
    /// A transition's outflows mix indexed and unindexed arcs.
    #[error("outflows of transition {transition:?} mix indexed and unindexed arcs")]
    MixedReturnIndices {
        /// The transition name.
        transition: String,
    },
}

/// A node or arc accepted by [`PetriNet::from_nodes`].
#[derive(Educe)]
#[educe(Debug)]
pub enum NetNode {
    /// A place.
    Place(Place),
    /// A transition.
    Trans(Transition),
    /// An argument arc.
    Inflow(Inflow),
    /// A return arc.
    Outflow(Outflow),
    /// The net's transition selector.
    Selector(#[educe(Debug(ignore))] TransitionSelector),
}

impl From<Place> for NetNode {
    fn from(place: Place) -> Self {
        NetNode::Place(place)
    }
}

impl From<Transition> for NetNode {
    fn from(trans: Transition) -> Self {
        NetNode::Trans(trans)
    }
}

impl From<Inflow> for NetNode {
    fn from(inflow: Inflow) -> Self {
        NetNode::Inflow(inflow)
    }
}

impl From<Outflow> for NetNode {
    fn from(outflow: Outflow) -> Self {
        NetNode::Outflow(outflow)
    }
}

impl From<TransitionSelector> for NetNode {
    fn from(selector: TransitionSelector) -> Self {
        NetNode::Selector(selector)
    }
}

/// Typed Petri net: places, transitions, and the arcs connecting them.
///
/// The net owns its nodes exclusively and is mutated in place by
/// [`PetriNet::execute`](crate::exec). The history fields are bounded
/// observation windows; they never influence firing.
#[derive(Educe)]
#[educe(Debug)]
pub struct PetriNet {
    pub(crate) places: Vec<Place>,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) inflows: Vec<Inflow>,
    pub(crate) outflows: Vec<Outflow>,
    #[educe(Debug(ignore))]
    pub(crate) selector: Option<TransitionSelector>,
    pub(crate) transition_history: VecDeque<String>,
    pub(crate) input_place_history: VecDeque<Vec<Place>>,
    pub(crate) output_place_history: VecDeque<Vec<Place>>,
}

impl PetriNet {
    /// Builds a net from a mixed sequence of places, transitions, arcs, and
    /// at most one selector (a later selector node replaces an earlier one).
    ///
    /// ## Errors
    ///
    /// Returns a [`GraphError`] when names collide, an arc dangles, or an
    /// arc's endpoint types are incompatible.
    pub fn from_nodes(nodes: impl IntoIterator<Item = NetNode>) -> Result<Self, GraphError> {
        let mut places = Vec::new();
        let mut transitions = Vec::new();
        let mut inflows = Vec::new();
        let mut outflows = Vec::new();
        let mut selector = None;
        for node in nodes {
            match node {
                NetNode::Place(place) => places.push(place),
                NetNode::Trans(trans) => transitions.push(trans),
                NetNode::Inflow(inflow) => inflows.push(inflow),
                NetNode::Outflow(outflow) => outflows.push(outflow),
                NetNode::Selector(chosen) => selector = Some(chosen),
            }
        }
        let net = Self {
            places,
            transitions,
            inflows,
            outflows,
            selector,
            transition_history: VecDeque::new(),
            input_place_history: VecDeque::new(),
            output_place_history: VecDeque::new(),
        };
        net.validate()?;
        Ok(net)
    }

    /// Attaches a selector consulted by every execution of this net, unless
    /// overridden per call.
    #[must_use]
    pub fn with_selector(mut self, selector: TransitionSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Decomposes the net back into the node sequence it was built from,
    /// including its selector, if any.
    ///
    /// The history windows are observation state and are dropped.
    #[must_use]
    pub fn into_nodes(self) -> Vec<NetNode> {
        let mut nodes = Vec::with_capacity(
            self.places.len() + self.transitions.len() + self.inflows.len() + self.outflows.len(),
        );
        nodes.extend(self.places.into_iter().map(NetNode::Place));
        nodes.extend(self.transitions.into_iter().map(NetNode::Trans));
        nodes.extend(self.inflows.into_iter().map(NetNode::Inflow));
        nodes.extend(self.outflows.into_iter().map(NetNode::Outflow));
        nodes.extend(self.selector.into_iter().map(NetNode::Selector));
        nodes
    }

    /// Returns the places in insertion order.
    #[inline]
    #[must_use]
    pub fn places(&self) -> &[Place] {
        &self.places
    }

    /// Returns the place with the given name.
    #[must_use]
    pub fn place_named(&self, name: &str) -> Option<&Place> {
        self.places.iter().find(|place| place.name == name)
    }

    /// Returns the transitions in insertion order.
    #[inline]
    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Returns the transition with the given name.
    #[must_use]
    pub fn transition_named(&self, name: &str) -> Option<&Transition> {
        self.transitions.iter().find(|trans| trans.name == name)
    }

    /// Returns the argument arcs in insertion order.
    #[inline]
    #[must_use]
    pub fn inflows(&self) -> &[Inflow] {
        &self.inflows
    }

    /// Returns the return arcs in insertion order.
    #[inline]
    #[must_use]
    pub fn outflows(&self) -> &[Outflow] {
        &self.outflows
    }

    /// Returns the names of the most recently fired transitions, oldest
    /// first.
    #[inline]
    #[must_use]
    pub fn transition_history(&self) -> &VecDeque<String> {
        &self.transition_history
    }

    /// Returns the most recent input-place snapshots, one list per firing.
    #[inline]
    #[must_use]
    pub fn input_place_history(&self) -> &VecDeque<Vec<Place>> {
        &self.input_place_history
    }

    /// Returns the most recent output-place snapshots, one list per firing.
    #[inline]
    #[must_use]
    pub fn output_place_history(&self) -> &VecDeque<Vec<Place>> {
        &self.output_place_history
    }

    fn validate(&self) -> Result<(), GraphError> {
        let mut place_ids: IndexMap<&str, usize> = IndexMap::new();
        for (i, place) in self.places.iter().enumerate() {
            if place_ids.insert(place.name.as_str(), i).is_some() {
                return Err(GraphError::DuplicatePlace {
                    name: place.name.clone(),
                });
            }
        }
        let mut trans_ids: IndexMap<&str, usize> = IndexMap::new();
        for (i, trans) in self.transitions.iter().enumerate() {
            if trans_ids.insert(trans.name.as_str(), i).is_some() {
                return Err(GraphError::DuplicateTrans {
                    name: trans.name.clone(),
                });
            }
        }

        let mut bound_arguments: HashSet<(&str, &str)> = HashSet::new();
        for inflow in &self.inflows {
            let Some(&place_id) = place_ids.get(inflow.place.as_str()) else {
                return Err(GraphError::UnknownPlace {
                    place: inflow.place.clone(),
                });
            };
            let Some(&trans_id) = trans_ids.get(inflow.transition.as_str()) else {
                return Err(GraphError::UnknownTrans {
                    transition: inflow.transition.clone(),
                });
            };
            let trans = &self.transitions[trans_id];
            let Some(argument_type) = trans.signature.param_type(&inflow.argument) else {
                return Err(GraphError::UnknownArgument {
                    transition: inflow.transition.clone(),
                    argument: inflow.argument.clone(),
                });
            };
            if !bound_arguments.insert((inflow.transition.as_str(), inflow.argument.as_str())) {
                return Err(GraphError::DuplicateArgument {
                    transition: inflow.transition.clone(),
                    argument: inflow.argument.clone(),
                });
            }
            let place = &self.places[place_id];
            if !place.ty.matches_lifted(argument_type) {
                return Err(GraphError::ArgumentTypeMismatch {
                    place: inflow.place.clone(),
                    transition: inflow.transition.clone(),
                    argument: inflow.argument.clone(),
                    place_type: Box::new(place.ty.clone()),
                    argument_type: Box::new(argument_type.clone()),
                });
            }
        }

        for outflow in &self.outflows {
            let Some(&place_id) = place_ids.get(outflow.place.as_str()) else {
                return Err(GraphError::UnknownPlace {
                    place: outflow.place.clone(),
                });
            };
            let Some(&trans_id) = trans_ids.get(outflow.transition.as_str()) else {
                return Err(GraphError::UnknownTrans {
                    transition: outflow.transition.clone(),
                });
            };
            let place = &self.places[place_id];
            let return_type = self.transitions[trans_id].signature.return_type();
            if !place.ty.matches_lifted(return_type) {
                return Err(GraphError::ReturnTypeMismatch {
                    transition: outflow.transition.clone(),
                    place: outflow.place.clone(),
                    place_type: Box::new(place.ty.clone()),
                    return_type: Box::new(return_type.clone()),
                });
            }
        }

        for trans in &self.transitions {
            let mut indexed = false;
            let mut unindexed = false;
            for outflow in self.outflows.iter().filter(|o| o.transition == trans.name) {
                match outflow.return_index {
                    Some(_) => indexed = true,
                    None => unindexed = true,
                }
            }
            if indexed && unindexed {
                return Err(GraphError::MixedReturnIndices {
                    transition: trans.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Name-to-index projections over a net, derived in one pass and valid
/// until the net's topology changes.
#[derive(Debug, Default)]
pub(crate) struct NetIndex {
    pub(crate) place_ids: IndexMap<String, usize>,
    pub(crate) trans_ids: IndexMap<String, usize>,
    /// Indices into `net.inflows`, grouped per transition.
    pub(crate) inflow_ids: Vec<Vec<usize>>,
    /// Indices into `net.outflows`, grouped per transition.
    pub(crate) outflow_ids: Vec<Vec<usize>>,
}

impl NetIndex {
    pub(crate) fn build(net: &PetriNet) -> Self {
        let place_ids: IndexMap<String, usize> = net
            .places
            .iter()
            .enumerate()
            .map(|(i, place)| (place.name.clone(), i))
            .collect();
        let trans_ids: IndexMap<String, usize> = net
            .transitions
            .iter()
            .enumerate()
            .map(|(i, trans)| (trans.name.clone(), i))
            .collect();
        let mut inflow_ids = vec![Vec::new(); net.transitions.len()];
        for (i, inflow) in net.inflows.iter().enumerate() {
            inflow_ids[trans_ids[inflow.transition.as_str()]].push(i);
        }
        let mut outflow_ids = vec![Vec::new(); net.transitions.len()];
        for (i, outflow) in net.outflows.iter().enumerate() {
            outflow_ids[trans_ids[outflow.transition.as_str()]].push(i);
        }
        Self {
            place_ids,
            trans_ids,
            inflow_ids,
            outflow_ids,
        }
    }
}
