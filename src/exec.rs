//! Net execution: fireability, transition selection, and the firing loop.

use std::collections::VecDeque;
use std::sync::Arc;

use educe::Educe;
use thiserror::Error;
use tracing::{debug, info};

use crate::net::trans::{BoxError, Transition};
use crate::net::{NetIndex, PetriNet};
use crate::types::TypeDescriptor;

mod fire;
mod route;

/// Errors raised while executing a net.
///
/// Every error is fatal to the current call; tokens consumed by an earlier
/// stage of the failing firing stay consumed.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Token history requires token copying.
    #[error("token history requires token copying to be enabled")]
    ConfigInvalid,
    /// The selector chose a transition that is not enabled.
    #[error("selector chose transition {transition:?}, which is not enabled")]
    SelectorInvalid {
        /// The chosen transition name.
        transition: String,
    },
    /// A fixed kwarg key is also bound by an inflow.
    #[error("fixed kwarg {key:?} of transition {transition:?} is also bound by an inflow")]
    KwargCollision {
        /// The transition name.
        transition: String,
        /// The colliding key.
        key: String,
    },
    /// The transition function failed.
    #[error("transition {transition:?} failed")]
    FunctionFailed {
        /// The transition name.
        transition: String,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },
    /// No output place's type matches the result.
    #[error("no output place of transition {transition:?} admits a result of type {result_type}")]
    NoRoute {
        /// The transition name.
        transition: String,
        /// The runtime type of the unroutable result.
        result_type: String,
    },
    /// Multiple output places match while token copying is disabled.
    #[error(
        "result of transition {transition:?} matches places {places:?} \
         but token copying is disabled"
    )]
    AmbiguousRoute {
        /// The transition name.
        transition: String,
        /// The names of all matching places.
        places: Vec<String>,
    },
    /// Return arcs carry indices while an output distribution is present.
    #[error("transition {transition:?} has indexed outflows and an output distribution")]
    IndexedWithDistribution {
        /// The transition name.
        transition: String,
    },
    /// A token failed its destination place's type check.
    #[error("token of type {found} does not inhabit place {place:?} of type {expected}")]
    TypeViolation {
        /// The place name.
        place: String,
        /// The place's declared element type.
        expected: TypeDescriptor,
        /// The offending token's runtime type.
        found: String,
    },
    /// A distribution routed a token to a place absent from the net.
    #[error("transition {transition:?} distributed a token to unknown place {place:?}")]
    UnknownPlace {
        /// The transition name.
        transition: String,
        /// The unknown place name.
        place: String,
    },
}

/// Picks which enabled transition fires next.
///
/// Receives the net and the enabled transitions in declaration order, and
/// returns the name of the chosen transition, or `None` to halt. Selectors
/// must not mutate the net and must pick from the supplied transitions.
pub type TransitionSelector = Arc<dyn Fn(&PetriNet, &[&Transition]) -> Option<String> + Send + Sync>;

/// Ready-made selector firing enabled transitions in declaration order,
/// the opposite of the default last-to-first policy.
#[must_use]
pub fn first_to_last() -> TransitionSelector {
    Arc::new(|_, enabled| enabled.first().map(|trans| trans.name().to_owned()))
}

/// Configuration for one [`PetriNet::execute`] call.
#[derive(Clone, Educe)]
#[educe(Debug)]
pub struct ExecOptions {
    pub(crate) max_transitions: usize,
    pub(crate) allow_copying: bool,
    pub(crate) transition_history: usize,
    pub(crate) place_history: usize,
    pub(crate) token_history: usize,
    #[educe(Debug(ignore))]
    pub(crate) selector: Option<TransitionSelector>,
}

impl ExecOptions {
    /// Returns options bounding the run to `max_transitions` firings, with
    /// copying disabled and history windows of one.
    #[must_use]
    pub fn new(max_transitions: usize) -> Self {
        Self {
            max_transitions,
            allow_copying: false,
            transition_history: 1,
            place_history: 1,
            token_history: 0,
            selector: None,
        }
    }

    /// Permits the engine to deep-copy tokens for fan-out and history.
    ///
    /// Disabled by default: a value may behave unexpectedly when copied,
    /// so aliasing a result into several places must be opted into.
    #[must_use]
    pub fn allow_copying(mut self, allow: bool) -> Self {
        self.allow_copying = allow;
        self
    }

    /// Window length for last-fired transition names; 0 disables.
    #[must_use]
    pub fn transition_history(mut self, length: usize) -> Self {
        self.transition_history = length;
        self
    }

    /// Window length for input and output place snapshots; 0 disables.
    #[must_use]
    pub fn place_history(mut self, length: usize) -> Self {
        self.place_history = length;
        self
    }

    /// Window length for tokens carried by place snapshots; requires
    /// copying.
    #[must_use]
    pub fn token_history(mut self, length: usize) -> Self {
        self.token_history = length;
        self
    }

    /// Overrides the net's selector for this call.
    #[must_use]
    pub fn selector(mut self, selector: TransitionSelector) -> Self {
        self.selector = Some(selector);
        self
    }
}

/// Transitions whose every inflow has a non-empty source place, in
/// declaration order. A transition with no inflows is vacuously enabled.
fn enabled_ids(net: &PetriNet, index: &NetIndex) -> Vec<usize> {
    (0..net.transitions.len())
        .filter(|&t| {
            index.inflow_ids[t].iter().all(|&arc_id| {
                let place_id = index.place_ids[net.inflows[arc_id].place.as_str()];
                !net.places[place_id].tokens.is_empty()
            })
        })
        .collect()
}

/// Applies the selector precedence: per-call over per-net over default.
/// The default fires the last enabled transition in declaration order,
/// so sink-ward transitions run before upstream producers keep going.
fn select(
    net: &PetriNet,
    index: &NetIndex,
    enabled: &[usize],
    selector: Option<&TransitionSelector>,
) -> Result<Option<usize>, ExecError> {
    let Some(selector) = selector.or(net.selector.as_ref()) else {
        return Ok(enabled.last().copied());
    };
    let enabled_refs: Vec<&Transition> = enabled.iter().map(|&t| &net.transitions[t]).collect();
    match selector(net, &enabled_refs) {
        None => Ok(None),
        Some(name) => match index.trans_ids.get(name.as_str()).copied() {
            Some(t) if enabled.contains(&t) => Ok(Some(t)),
            _ => Err(ExecError::SelectorInvalid { transition: name }),
        },
    }
}

fn push_window<T>(window: &mut VecDeque<T>, item: T, length: usize) {
    if length == 0 {
        return;
    }
    window.push_back(item);
    while window.len() > length {
        window.pop_front();
    }
}

impl PetriNet {
    /// Repeatedly selects and fires enabled transitions, up to the bound in
    /// `opts`.
    ///
    /// The net is mutated in place; the return value is the number of
    /// transitions fired. History windows are updated after every firing.
    ///
    /// ## Errors
    ///
    /// Returns an [`ExecError`] when the options are inconsistent, a
    /// resident token fails its place type, or a firing fails in any of
    /// its three stages. Consumed input tokens are not restored on
    /// failure.
    pub async fn execute(&mut self, opts: ExecOptions) -> Result<usize, ExecError> {
        if opts.token_history > 0 && !opts.allow_copying {
            return Err(ExecError::ConfigInvalid);
        }
        for place in &self.places {
            for token in &place.tokens {
                if !place.ty.admits(token) {
                    return Err(ExecError::TypeViolation {
                        place: place.name.clone(),
                        expected: place.ty.clone(),
                        found: token.type_name(),
                    });
                }
            }
        }
        let index = NetIndex::build(self);
        let record_tokens = opts.token_history > 0;
        let mut fired = 0;
        while fired < opts.max_transitions {
            let enabled = enabled_ids(self, &index);
            let Some(t) = select(self, &index, &enabled, opts.selector.as_ref())? else {
                info!(fired, "no enabled transition remaining");
                return Ok(fired);
            };
            let name = self.transitions[t].name.clone();
            debug!(transition = %name, "firing");
            let (input_snapshot, output_snapshot) = {
                let Self {
                    places,
                    transitions,
                    inflows,
                    outflows,
                    ..
                } = &mut *self;
                let trans = &transitions[t];
                let (kwargs, input_snapshot) = fire::extract_inputs(
                    trans,
                    inflows,
                    &index.inflow_ids[t],
                    places,
                    &index,
                    record_tokens,
                )?;
                let result = fire::invoke(trans, kwargs).await?;
                let output_snapshot = fire::distribute(
                    trans,
                    result,
                    outflows,
                    &index.outflow_ids[t],
                    places,
                    &index,
                    opts.allow_copying,
                    record_tokens,
                )?;
                (input_snapshot, output_snapshot)
            };
            fired += 1;
            push_window(&mut self.transition_history, name, opts.transition_history);
            push_window(
                &mut self.input_place_history,
                input_snapshot,
                opts.place_history,
            );
            push_window(
                &mut self.output_place_history,
                output_snapshot,
                opts.place_history,
            );
        }
        info!(fired, "maximum transition count reached");
        Ok(fired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::flow::{Inflow, Outflow};
    use crate::net::place::Place;
    use crate::net::trans::{Activation, ActivationFn, Signature};
    use crate::net::NetNode;
    use crate::token::Token;
    use futures::FutureExt;
    use indexmap::IndexMap;

    fn int_place(name: &str, tokens: &[i64]) -> NetNode {
        NetNode::Place(
            Place::with_tokens(
                name,
                TypeDescriptor::Int,
                tokens.iter().map(|&v| Token::Int(v)).collect(),
            )
            .unwrap(),
        )
    }

    fn increment(name: &str) -> Transition {
        Transition::new(
            name,
            Signature::new([("x", TypeDescriptor::Int)], TypeDescriptor::Int),
            |kwargs| Ok(Token::Int(kwargs["x"].as_int().unwrap_or(0) + 1)),
        )
    }

    // (In) -> |Inc| -> (Out)
    fn increment_pipeline() -> PetriNet {
        PetriNet::from_nodes(vec![
            int_place("In", &[1, 2, 3]),
            increment("Inc").into(),
            Inflow::new("In", "Inc", "x").into(),
            Outflow::new("Inc", "Out").into(),
            Place::new("Out", TypeDescriptor::Int).into(),
        ])
        .unwrap()
    }

    // (In) -> |T1| -> (Mid) -> |T2| -> (Out)
    fn two_stage_pipeline() -> PetriNet {
        PetriNet::from_nodes(vec![
            int_place("In", &[1]),
            int_place("Mid", &[10]),
            Place::new("Out", TypeDescriptor::Int).into(),
            increment("T1").into(),
            Inflow::new("In", "T1", "x").into(),
            Outflow::new("T1", "Mid").into(),
            increment("T2").into(),
            Inflow::new("Mid", "T2", "x").into(),
            Outflow::new("T2", "Out").into(),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_single_firing_pops_the_tail() {
        let mut net = increment_pipeline();
        let fired = net.execute(ExecOptions::new(1)).await.unwrap();
        assert_eq!(fired, 1);
        assert_eq!(
            net.place_named("In").unwrap().tokens(),
            &[Token::Int(1), Token::Int(2)]
        );
        assert_eq!(net.place_named("Out").unwrap().tokens(), &[Token::Int(4)]);
    }

    #[tokio::test]
    async fn test_execution_drains_until_nothing_is_enabled() {
        let mut net = increment_pipeline();
        let fired = net.execute(ExecOptions::new(10)).await.unwrap();
        assert_eq!(fired, 3);
        assert!(net.place_named("In").unwrap().tokens().is_empty());
        assert_eq!(
            net.place_named("Out").unwrap().tokens(),
            &[Token::Int(4), Token::Int(3), Token::Int(2)]
        );
    }

    #[tokio::test]
    async fn test_zero_max_transitions_is_a_no_op() {
        let mut net = increment_pipeline();
        let fired = net.execute(ExecOptions::new(0)).await.unwrap();
        assert_eq!(fired, 0);
        assert_eq!(net.place_named("In").unwrap().tokens().len(), 3);
        assert!(net.place_named("Out").unwrap().tokens().is_empty());
    }

    #[tokio::test]
    async fn test_list_argument_lifts_the_entire_place() {
        let sum = Transition::new(
            "Sum",
            Signature::new(
                [("xs", TypeDescriptor::list(TypeDescriptor::Int))],
                TypeDescriptor::Int,
            ),
            |kwargs| {
                let total = kwargs["xs"]
                    .as_list()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(Token::as_int)
                    .sum();
                Ok(Token::Int(total))
            },
        );
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[1, 2, 3]),
            sum.into(),
            Inflow::new("In", "Sum", "xs").into(),
            Outflow::new("Sum", "Total").into(),
            Place::new("Total", TypeDescriptor::Int).into(),
        ])
        .unwrap();
        let fired = net.execute(ExecOptions::new(1)).await.unwrap();
        assert_eq!(fired, 1);
        assert!(net.place_named("In").unwrap().tokens().is_empty());
        assert_eq!(net.place_named("Total").unwrap().tokens(), &[Token::Int(6)]);
    }

    #[tokio::test]
    async fn test_list_place_feeding_list_argument_pops_one_token() {
        // The argument type equals the place's element type, so one list
        // token is popped instead of lifting a list of lists.
        let first = Transition::new(
            "First",
            Signature::new(
                [("xs", TypeDescriptor::list(TypeDescriptor::Int))],
                TypeDescriptor::Int,
            ),
            |kwargs| {
                let head = kwargs["xs"]
                    .as_list()
                    .and_then(|items| items.first())
                    .and_then(Token::as_int)
                    .unwrap_or(0);
                Ok(Token::Int(head))
            },
        );
        let batches = Place::with_tokens(
            "Batches",
            TypeDescriptor::list(TypeDescriptor::Int),
            vec![
                Token::List(vec![Token::Int(1), Token::Int(2)]),
                Token::List(vec![Token::Int(3)]),
            ],
        )
        .unwrap();
        let mut net = PetriNet::from_nodes(vec![
            batches.into(),
            first.into(),
            Inflow::new("Batches", "First", "xs").into(),
            Outflow::new("First", "Heads").into(),
            Place::new("Heads", TypeDescriptor::Int).into(),
        ])
        .unwrap();
        let fired = net.execute(ExecOptions::new(1)).await.unwrap();
        assert_eq!(fired, 1);
        assert_eq!(net.place_named("Batches").unwrap().tokens().len(), 1);
        assert_eq!(net.place_named("Heads").unwrap().tokens(), &[Token::Int(3)]);
    }

    #[tokio::test]
    async fn test_ambiguous_routing_without_copying_fails() {
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[5]),
            increment("Inc").into(),
            Inflow::new("In", "Inc", "x").into(),
            Outflow::new("Inc", "A").into(),
            Outflow::new("Inc", "B").into(),
            Place::new("A", TypeDescriptor::Int).into(),
            Place::new("B", TypeDescriptor::Int).into(),
        ])
        .unwrap();
        let err = net.execute(ExecOptions::new(1)).await.unwrap_err();
        assert!(matches!(
            err,
            ExecError::AmbiguousRoute { places, .. } if places == vec!["A", "B"]
        ));
    }

    #[tokio::test]
    async fn test_fan_out_with_copying_fills_every_matching_place() {
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[5]),
            increment("Inc").into(),
            Inflow::new("In", "Inc", "x").into(),
            Outflow::new("Inc", "A").into(),
            Outflow::new("Inc", "B").into(),
            Place::new("A", TypeDescriptor::Int).into(),
            Place::new("B", TypeDescriptor::Int).into(),
        ])
        .unwrap();
        let fired = net
            .execute(ExecOptions::new(1).allow_copying(true))
            .await
            .unwrap();
        assert_eq!(fired, 1);
        assert_eq!(net.place_named("A").unwrap().tokens(), &[Token::Int(6)]);
        assert_eq!(net.place_named("B").unwrap().tokens(), &[Token::Int(6)]);
    }

    #[tokio::test]
    async fn test_default_selector_prefers_later_transitions() {
        let mut net = two_stage_pipeline();
        let fired = net.execute(ExecOptions::new(1)).await.unwrap();
        assert_eq!(fired, 1);
        // T2 fired on the pre-seeded Mid token; In is untouched.
        assert_eq!(net.place_named("In").unwrap().tokens().len(), 1);
        assert!(net.place_named("Mid").unwrap().tokens().is_empty());
        assert_eq!(net.place_named("Out").unwrap().tokens(), &[Token::Int(11)]);
    }

    #[tokio::test]
    async fn test_first_to_last_selector_override() {
        let mut net = two_stage_pipeline();
        let fired = net
            .execute(ExecOptions::new(1).selector(first_to_last()))
            .await
            .unwrap();
        assert_eq!(fired, 1);
        assert!(net.place_named("In").unwrap().tokens().is_empty());
        assert_eq!(
            net.place_named("Mid").unwrap().tokens(),
            &[Token::Int(10), Token::Int(2)]
        );
    }

    #[tokio::test]
    async fn test_net_selector_can_halt_execution() {
        let mut net = increment_pipeline().with_selector(Arc::new(|_, _| None));
        let fired = net.execute(ExecOptions::new(10)).await.unwrap();
        assert_eq!(fired, 0);
        assert_eq!(net.place_named("In").unwrap().tokens().len(), 3);
    }

    #[tokio::test]
    async fn test_call_selector_overrides_net_selector() {
        let mut net = increment_pipeline().with_selector(Arc::new(|_, _| None));
        let fired = net
            .execute(ExecOptions::new(1).selector(first_to_last()))
            .await
            .unwrap();
        assert_eq!(fired, 1);
    }

    #[tokio::test]
    async fn test_selector_returning_disabled_transition_fails() {
        let mut net = two_stage_pipeline();
        // Drain In so only T2 is enabled, then insist on T1.
        net.places[0].tokens.clear();
        let selector: TransitionSelector = Arc::new(|_, _| Some("T1".to_owned()));
        let err = net
            .execute(ExecOptions::new(1).selector(selector))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExecError::SelectorInvalid { transition } if transition == "T1"
        ));
    }

    #[tokio::test]
    async fn test_selector_returning_unknown_transition_fails() {
        let mut net = increment_pipeline();
        let selector: TransitionSelector = Arc::new(|_, _| Some("Ghost".to_owned()));
        let err = net
            .execute(ExecOptions::new(1).selector(selector))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::SelectorInvalid { .. }));
    }

    #[tokio::test]
    async fn test_activation_priorities_guide_a_user_selector() {
        fn priority(net: &PetriNet, trans: &Transition) -> f64 {
            match trans.activation(net) {
                Some(Activation::Priority(p)) => p,
                _ => 0.0,
            }
        }
        let inc = increment("Inc")
            .with_activation(ActivationFn::Nullary(Box::new(|| Activation::Priority(1.0))));
        let dec = Transition::new(
            "Dec",
            Signature::new([("x", TypeDescriptor::Int)], TypeDescriptor::Int),
            |kwargs| Ok(Token::Int(kwargs["x"].as_int().unwrap_or(0) - 1)),
        )
        .with_activation(ActivationFn::Nullary(Box::new(|| {
            Activation::Priority(10.0)
        })));
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[5]),
            inc.into(),
            dec.into(),
            Inflow::new("In", "Inc", "x").into(),
            Inflow::new("In", "Dec", "x").into(),
            Outflow::new("Inc", "Out").into(),
            Outflow::new("Dec", "Out").into(),
            Place::new("Out", TypeDescriptor::Int).into(),
        ])
        .unwrap();
        let selector: TransitionSelector = Arc::new(|net, enabled| {
            enabled
                .iter()
                .max_by(|a, b| {
                    priority(net, a)
                        .partial_cmp(&priority(net, b))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|trans| trans.name().to_owned())
        });
        let fired = net
            .execute(ExecOptions::new(1).selector(selector))
            .await
            .unwrap();
        assert_eq!(fired, 1);
        assert_eq!(net.place_named("Out").unwrap().tokens(), &[Token::Int(4)]);
    }

    #[tokio::test]
    async fn test_async_transition_fires() {
        let double = Transition::new_async(
            "Double",
            Signature::new([("x", TypeDescriptor::Int)], TypeDescriptor::Int),
            |kwargs| {
                async move { Ok(Token::Int(kwargs["x"].as_int().unwrap_or(0) * 2)) }.boxed()
            },
        );
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[21]),
            double.into(),
            Inflow::new("In", "Double", "x").into(),
            Outflow::new("Double", "Out").into(),
            Place::new("Out", TypeDescriptor::Int).into(),
        ])
        .unwrap();
        let fired = net.execute(ExecOptions::new(1)).await.unwrap();
        assert_eq!(fired, 1);
        assert_eq!(net.place_named("Out").unwrap().tokens(), &[Token::Int(42)]);
    }

    #[tokio::test]
    async fn test_fixed_kwargs_are_merged() {
        let add = Transition::new(
            "Add",
            Signature::new(
                [("x", TypeDescriptor::Int), ("y", TypeDescriptor::Int)],
                TypeDescriptor::Int,
            ),
            |kwargs| {
                Ok(Token::Int(
                    kwargs["x"].as_int().unwrap_or(0) + kwargs["y"].as_int().unwrap_or(0),
                ))
            },
        )
        .with_fixed_kwargs(IndexMap::from([("y".to_owned(), Token::Int(10))]));
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[1]),
            add.into(),
            Inflow::new("In", "Add", "x").into(),
            Outflow::new("Add", "Out").into(),
            Place::new("Out", TypeDescriptor::Int).into(),
        ])
        .unwrap();
        net.execute(ExecOptions::new(1)).await.unwrap();
        assert_eq!(net.place_named("Out").unwrap().tokens(), &[Token::Int(11)]);
    }

    #[tokio::test]
    async fn test_fixed_kwarg_collision_fails() {
        let inc = increment("Inc")
            .with_fixed_kwargs(IndexMap::from([("x".to_owned(), Token::Int(1))]));
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[1]),
            inc.into(),
            Inflow::new("In", "Inc", "x").into(),
            Outflow::new("Inc", "Out").into(),
            Place::new("Out", TypeDescriptor::Int).into(),
        ])
        .unwrap();
        let err = net.execute(ExecOptions::new(1)).await.unwrap_err();
        assert!(matches!(err, ExecError::KwargCollision { key, .. } if key == "x"));
    }

    #[tokio::test]
    async fn test_function_error_is_wrapped() {
        let boom = Transition::new(
            "Boom",
            Signature::new([("x", TypeDescriptor::Int)], TypeDescriptor::Int),
            |_| Err("the computation went sideways".into()),
        );
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[1]),
            boom.into(),
            Inflow::new("In", "Boom", "x").into(),
            Outflow::new("Boom", "Out").into(),
            Place::new("Out", TypeDescriptor::Int).into(),
        ])
        .unwrap();
        let err = net.execute(ExecOptions::new(1)).await.unwrap_err();
        assert!(matches!(
            err,
            ExecError::FunctionFailed { transition, .. } if transition == "Boom"
        ));
    }

    #[tokio::test]
    async fn test_no_route_for_an_unmatched_result() {
        let sink = Transition::new(
            "Sink",
            Signature::new([("x", TypeDescriptor::Int)], TypeDescriptor::Int),
            |kwargs| Ok(kwargs["x"].clone()),
        );
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[1]),
            sink.into(),
            Inflow::new("In", "Sink", "x").into(),
        ])
        .unwrap();
        let err = net.execute(ExecOptions::new(1)).await.unwrap_err();
        assert!(matches!(
            err,
            ExecError::NoRoute { result_type, .. } if result_type == "int"
        ));
    }

    #[tokio::test]
    async fn test_null_result_with_no_outflows_is_dropped() {
        let consume = Transition::new(
            "Consume",
            Signature::new([("x", TypeDescriptor::Int)], TypeDescriptor::Null),
            |_| Ok(Token::Null),
        );
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[1, 2]),
            consume.into(),
            Inflow::new("In", "Consume", "x").into(),
        ])
        .unwrap();
        let fired = net.execute(ExecOptions::new(10)).await.unwrap();
        assert_eq!(fired, 2);
        assert!(net.place_named("In").unwrap().tokens().is_empty());
    }

    #[tokio::test]
    async fn test_empty_list_result_deposits_per_place_kind() {
        let drain = Transition::new(
            "Drain",
            Signature::new(
                [("x", TypeDescriptor::Int)],
                TypeDescriptor::list(TypeDescriptor::Int),
            ),
            |_| Ok(Token::List(vec![])),
        );
        // Into a non-list place: nothing is deposited.
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[1]),
            drain.into(),
            Inflow::new("In", "Drain", "x").into(),
            Outflow::new("Drain", "Out").into(),
            Place::new("Out", TypeDescriptor::Int).into(),
        ])
        .unwrap();
        let fired = net.execute(ExecOptions::new(1)).await.unwrap();
        assert_eq!(fired, 1);
        assert!(net.place_named("Out").unwrap().tokens().is_empty());

        // Into a list place: one empty list token.
        let drain = Transition::new(
            "Drain",
            Signature::new(
                [("x", TypeDescriptor::Int)],
                TypeDescriptor::list(TypeDescriptor::Int),
            ),
            |_| Ok(Token::List(vec![])),
        );
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[1]),
            drain.into(),
            Inflow::new("In", "Drain", "x").into(),
            Outflow::new("Drain", "Out").into(),
            Place::new("Out", TypeDescriptor::list(TypeDescriptor::Int)).into(),
        ])
        .unwrap();
        let fired = net.execute(ExecOptions::new(1)).await.unwrap();
        assert_eq!(fired, 1);
        assert_eq!(
            net.place_named("Out").unwrap().tokens(),
            &[Token::List(vec![])]
        );
    }

    #[tokio::test]
    async fn test_output_distribution_routes_by_name() {
        let split = Transition::new(
            "Split",
            Signature::new([("x", TypeDescriptor::Int)], TypeDescriptor::Int),
            |kwargs| Ok(kwargs["x"].clone()),
        )
        .with_output_distribution(|result| {
            IndexMap::from([
                ("Kept".to_owned(), result.clone()),
                ("Skipped".to_owned(), Token::Null),
            ])
        });
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[7]),
            split.into(),
            Inflow::new("In", "Split", "x").into(),
            Outflow::new("Split", "Kept").into(),
            Outflow::new("Split", "Skipped").into(),
            Place::new("Kept", TypeDescriptor::Int).into(),
            Place::new("Skipped", TypeDescriptor::Int).into(),
        ])
        .unwrap();
        let fired = net.execute(ExecOptions::new(1)).await.unwrap();
        assert_eq!(fired, 1);
        assert_eq!(net.place_named("Kept").unwrap().tokens(), &[Token::Int(7)]);
        assert!(net.place_named("Skipped").unwrap().tokens().is_empty());
    }

    #[tokio::test]
    async fn test_indexed_outflows_with_distribution_fail() {
        let split = Transition::new(
            "Split",
            Signature::new([("x", TypeDescriptor::Int)], TypeDescriptor::Int),
            |kwargs| Ok(kwargs["x"].clone()),
        )
        .with_output_distribution(|result| IndexMap::from([("A".to_owned(), result.clone())]));
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[1]),
            split.into(),
            Inflow::new("In", "Split", "x").into(),
            Outflow::indexed("Split", "A", 0).into(),
            Place::new("A", TypeDescriptor::Int).into(),
        ])
        .unwrap();
        let err = net.execute(ExecOptions::new(1)).await.unwrap_err();
        assert!(matches!(err, ExecError::IndexedWithDistribution { .. }));
    }

    #[tokio::test]
    async fn test_distribution_to_unknown_place_fails() {
        let split = Transition::new(
            "Split",
            Signature::new([("x", TypeDescriptor::Int)], TypeDescriptor::Int),
            |kwargs| Ok(kwargs["x"].clone()),
        )
        .with_output_distribution(|result| {
            IndexMap::from([("Ghost".to_owned(), result.clone())])
        });
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[1]),
            split.into(),
            Inflow::new("In", "Split", "x").into(),
        ])
        .unwrap();
        let err = net.execute(ExecOptions::new(1)).await.unwrap_err();
        assert!(matches!(
            err,
            ExecError::UnknownPlace { place, .. } if place == "Ghost"
        ));
    }

    #[tokio::test]
    async fn test_distribution_token_failing_the_place_type_fails() {
        let corrupt = Transition::new(
            "Corrupt",
            Signature::new([("x", TypeDescriptor::Int)], TypeDescriptor::Int),
            |kwargs| Ok(kwargs["x"].clone()),
        )
        .with_output_distribution(|_| {
            IndexMap::from([("Out".to_owned(), Token::Str("oops".to_owned()))])
        });
        let mut net = PetriNet::from_nodes(vec![
            int_place("In", &[1]),
            corrupt.into(),
            Inflow::new("In", "Corrupt", "x").into(),
            Outflow::new("Corrupt", "Out").into(),
            Place::new("Out", TypeDescriptor::Int).into(),
        ])
        .unwrap();
        let err = net.execute(ExecOptions::new(1)).await.unwrap_err();
        assert!(matches!(err, ExecError::TypeViolation { place, .. } if place == "Out"));
    }

    #[tokio::test]
    async fn test_token_history_requires_copying() {
        let mut net = increment_pipeline();
        let err = net
            .execute(ExecOptions::new(1).token_history(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::ConfigInvalid));
    }

    #[tokio::test]
    async fn test_precheck_rejects_ill_typed_resident_tokens() {
        let mut net = increment_pipeline();
        net.places[0].tokens.push(Token::Str("rogue".to_owned()));
        let err = net.execute(ExecOptions::new(1)).await.unwrap_err();
        assert!(matches!(err, ExecError::TypeViolation { place, .. } if place == "In"));
    }

    #[tokio::test]
    async fn test_histories_are_bounded_windows() {
        let mut net = increment_pipeline();
        let fired = net
            .execute(
                ExecOptions::new(10)
                    .transition_history(2)
                    .place_history(2),
            )
            .await
            .unwrap();
        assert_eq!(fired, 3);
        assert_eq!(net.transition_history(), &["Inc", "Inc"]);
        assert_eq!(net.input_place_history().len(), 2);
        assert_eq!(net.output_place_history().len(), 2);
        // Snapshots carry no tokens unless token history is enabled.
        let inputs = &net.input_place_history()[0];
        assert_eq!(inputs[0].name(), "In");
        assert!(inputs[0].tokens().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_history_windows_stay_empty() {
        let mut net = increment_pipeline();
        net.execute(
            ExecOptions::new(10)
                .transition_history(0)
                .place_history(0),
        )
        .await
        .unwrap();
        assert!(net.transition_history().is_empty());
        assert!(net.input_place_history().is_empty());
        assert!(net.output_place_history().is_empty());
    }

    #[tokio::test]
    async fn test_token_history_snapshots_carry_copies() {
        let mut net = increment_pipeline();
        net.execute(
            ExecOptions::new(1)
                .allow_copying(true)
                .token_history(1),
        )
        .await
        .unwrap();
        let inputs = &net.input_place_history()[0];
        assert_eq!(inputs[0].tokens(), &[Token::Int(3)]);
        let outputs = &net.output_place_history()[0];
        assert_eq!(outputs[0].name(), "Out");
        assert_eq!(outputs[0].tokens(), &[Token::Int(4)]);
    }

    #[tokio::test]
    async fn test_resident_tokens_still_match_after_execution() {
        let mut net = increment_pipeline();
        net.execute(ExecOptions::new(10)).await.unwrap();
        for place in net.places() {
            for token in place.tokens() {
                assert!(place.element_type().admits(token));
            }
        }
    }
}
