#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![deny(clippy::all)]

pub mod exec;
pub mod net;
pub mod token;
pub mod types;

pub use exec::{first_to_last, ExecError, ExecOptions, TransitionSelector};
pub use net::flow::{Inflow, Outflow};
pub use net::place::Place;
pub use net::trans::{
    transition_with_outflows, transition_with_output_places, Activation, ActivationFn, AsyncFn,
    BoxError, Distribution, DistributionFn, Kwargs, Signature, SyncFn, Transition, TransitionFn,
};
pub use net::{GraphError, NetNode, PetriNet};
pub use token::Token;
pub use types::TypeDescriptor;
