//! Petri net transitions.

use educe::Educe;
use futures::future::BoxFuture;
use indexmap::IndexMap;

use crate::net::flow::Outflow;
use crate::net::place::Place;
use crate::net::{NetNode, PetriNet};
use crate::token::Token;
use crate::types::TypeDescriptor;

/// Error type a transition function may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Keyword arguments passed to a transition function, in binding order.
pub type Kwargs = IndexMap<String, Token>;

/// Map from place name to token, produced by an output distribution.
pub type Distribution = IndexMap<String, Token>;

/// Boxed synchronous transition function.
pub type SyncFn = Box<dyn Fn(Kwargs) -> Result<Token, BoxError> + Send + Sync>;

/// Boxed asynchronous transition function.
pub type AsyncFn =
    Box<dyn Fn(Kwargs) -> BoxFuture<'static, Result<Token, BoxError>> + Send + Sync>;

/// Boxed output distribution function.
pub type DistributionFn = Box<dyn Fn(&Token) -> Distribution + Send + Sync>;

/// The callable behind a transition.
///
/// Functions come in a synchronous and an asynchronous variant; the engine
/// branches on the variant rather than wrapping every function in a future.
pub enum TransitionFn {
    /// A synchronous function.
    Sync(SyncFn),
    /// An asynchronous function, awaited during firing.
    Async(AsyncFn),
}

/// Declared argument and return types of a transition function.
///
/// The engine has no reflection over closures, so the signature carries the
/// type annotations the firing protocol and graph validation consult.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Signature {
    params: Vec<(String, TypeDescriptor)>,
    returns: TypeDescriptor,
}

impl Signature {
    /// Returns a signature from named argument types and a return type.
    #[must_use]
    pub fn new<S: Into<String>>(
        params: impl IntoIterator<Item = (S, TypeDescriptor)>,
        returns: TypeDescriptor,
    ) -> Self {
        Self {
            params: params
                .into_iter()
                .map(|(name, ty)| (name.into(), ty))
                .collect(),
            returns,
        }
    }

    /// Returns the declared type of the named argument.
    #[must_use]
    pub fn param_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.params
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, ty)| ty)
    }

    /// Returns the declared return type.
    #[inline]
    #[must_use]
    pub fn return_type(&self) -> &TypeDescriptor {
        &self.returns
    }
}

/// Verdict of an activation guard.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Activation {
    /// The guard blocks the transition.
    Blocked,
    /// The guard allows the transition.
    Enabled,
    /// The guard allows the transition with a priority hint for selectors.
    Priority(f64),
}

/// Optional guard on a transition, consulted only by custom selectors.
pub enum ActivationFn {
    /// A guard that inspects nothing.
    Nullary(Box<dyn Fn() -> Activation + Send + Sync>),
    /// A guard that inspects the net.
    Contextual(Box<dyn Fn(&PetriNet) -> Activation + Send + Sync>),
}

/// A named function with arcs binding its arguments to places and its
/// return value to places.
#[derive(Educe)]
#[educe(Debug)]
pub struct Transition {
    pub(crate) name: String,
    #[educe(Debug(ignore))]
    pub(crate) function: TransitionFn,
    pub(crate) signature: Signature,
    pub(crate) fixed_kwargs: Option<Kwargs>,
    #[educe(Debug(ignore))]
    pub(crate) output_distribution: Option<DistributionFn>,
    #[educe(Debug(ignore))]
    pub(crate) activation: Option<ActivationFn>,
}

impl Transition {
    /// Returns a transition wrapping a synchronous function.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        signature: Signature,
        function: impl Fn(Kwargs) -> Result<Token, BoxError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            function: TransitionFn::Sync(Box::new(function)),
            signature,
            fixed_kwargs: None,
            output_distribution: None,
            activation: None,
        }
    }

    /// Returns a transition wrapping an asynchronous function.
    #[must_use]
    pub fn new_async(
        name: impl Into<String>,
        signature: Signature,
        function: impl Fn(Kwargs) -> BoxFuture<'static, Result<Token, BoxError>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            function: TransitionFn::Async(Box::new(function)),
            signature,
            fixed_kwargs: None,
            output_distribution: None,
            activation: None,
        }
    }

    /// Adds fixed keyword arguments merged into every invocation.
    ///
    /// A key also bound by an inflow fails the firing with a collision
    /// error.
    #[must_use]
    pub fn with_fixed_kwargs(mut self, kwargs: Kwargs) -> Self {
        self.fixed_kwargs = Some(kwargs);
        self
    }

    /// Replaces type-based routing with an explicit distribution function.
    #[must_use]
    pub fn with_output_distribution(
        mut self,
        distribution: impl Fn(&Token) -> Distribution + Send + Sync + 'static,
    ) -> Self {
        self.output_distribution = Some(Box::new(distribution));
        self
    }

    /// Attaches an activation guard.
    #[must_use]
    pub fn with_activation(mut self, activation: ActivationFn) -> Self {
        self.activation = Some(activation);
        self
    }

    /// Returns the transition's name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared signature.
    #[inline]
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Evaluates the activation guard against the net, if one is attached.
    ///
    /// The default selector never calls this; custom selectors may.
    #[must_use]
    pub fn activation(&self, net: &PetriNet) -> Option<Activation> {
        match &self.activation {
            None => None,
            Some(ActivationFn::Nullary(guard)) => Some(guard()),
            Some(ActivationFn::Contextual(guard)) => Some(guard(net)),
        }
    }
}

/// Returns a transition plus one return arc per named output place.
///
/// Shorthand for the common case of wiring a transition's outputs while
/// building a node sequence for [`PetriNet::from_nodes`].
#[must_use]
pub fn transition_with_outflows(
    transition: Transition,
    output_places: &[&str],
    use_return_indices: bool,
) -> Vec<NetNode> {
    let name = transition.name().to_owned();
    let mut nodes = vec![NetNode::Trans(transition)];
    for (i, place) in output_places.iter().enumerate() {
        let outflow = if use_return_indices {
            Outflow::indexed(name.clone(), *place, i)
        } else {
            Outflow::new(name.clone(), *place)
        };
        nodes.push(NetNode::Outflow(outflow));
    }
    nodes
}

/// Returns a transition, one return arc per output, and the typed output
/// places themselves.
#[must_use]
pub fn transition_with_output_places<S: Into<String>>(
    transition: Transition,
    outputs: impl IntoIterator<Item = (S, TypeDescriptor)>,
    use_return_indices: bool,
) -> Vec<NetNode> {
    let name = transition.name().to_owned();
    let mut nodes = vec![NetNode::Trans(transition)];
    for (i, (place, ty)) in outputs.into_iter().enumerate() {
        let place = place.into();
        let outflow = if use_return_indices {
            Outflow::indexed(name.clone(), place.clone(), i)
        } else {
            Outflow::new(name.clone(), place.clone())
        };
        nodes.push(NetNode::Outflow(outflow));
        nodes.push(NetNode::Place(Place::new(place, ty)));
    }
    nodes
}
