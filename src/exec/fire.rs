//! The three-stage firing protocol: extract, invoke, distribute.

use indexmap::IndexMap;
use tracing::trace;

use crate::exec::{route, ExecError};
use crate::net::flow::{Inflow, Outflow};
use crate::net::place::Place;
use crate::net::trans::{Kwargs, Transition, TransitionFn};
use crate::net::NetIndex;
use crate::token::Token;
use crate::types::TypeDescriptor;

/// Whether an inflow lifts the entire place contents instead of popping
/// one token: the argument is a parameterized list whose element type the
/// place's element type matches. A list-typed place feeding a list-typed
/// argument pops one token.
fn lifts(place_type: &TypeDescriptor, argument_type: Option<&TypeDescriptor>) -> bool {
    match argument_type.map(TypeDescriptor::unfold) {
        Some(TypeDescriptor::List(element)) => place_type.matches(element),
        _ => false,
    }
}

/// Stage 1: pop or lift argument tokens out of the source places.
///
/// Returns the keyword bindings and the input-place snapshots. The
/// availability of every binding is checked before any place is mutated,
/// so a contract-violating selector fails without partial consumption.
pub(crate) fn extract_inputs(
    trans: &Transition,
    inflows: &[Inflow],
    inflow_ids: &[usize],
    places: &mut [Place],
    index: &NetIndex,
    record_tokens: bool,
) -> Result<(Kwargs, Vec<Place>), ExecError> {
    let mut available: IndexMap<usize, usize> = IndexMap::new();
    for &arc_id in inflow_ids {
        let arc = &inflows[arc_id];
        let place_id = index.place_ids[arc.place.as_str()];
        let remaining = available
            .entry(place_id)
            .or_insert_with(|| places[place_id].tokens.len());
        let argument_type = trans.signature.param_type(&arc.argument);
        if lifts(&places[place_id].ty, argument_type) {
            *remaining = 0;
        } else if *remaining == 0 {
            return Err(ExecError::SelectorInvalid {
                transition: trans.name.clone(),
            });
        } else {
            *remaining -= 1;
        }
    }

    let mut kwargs = Kwargs::new();
    let mut snapshots = Vec::with_capacity(inflow_ids.len());
    for &arc_id in inflow_ids {
        let arc = &inflows[arc_id];
        let place = &mut places[index.place_ids[arc.place.as_str()]];
        let mut snapshot = place.copy_sans_tokens();
        let argument_type = trans.signature.param_type(&arc.argument);
        if lifts(&place.ty, argument_type) {
            let tokens = std::mem::take(&mut place.tokens);
            trace!(
                transition = %trans.name,
                argument = %arc.argument,
                count = tokens.len(),
                "lifting entire place"
            );
            if record_tokens {
                snapshot.tokens = tokens.clone();
            }
            kwargs.insert(arc.argument.clone(), Token::List(tokens));
        } else {
            // The availability pre-pass guarantees the pop succeeds.
            let Some(token) = place.tokens.pop() else {
                return Err(ExecError::SelectorInvalid {
                    transition: trans.name.clone(),
                });
            };
            trace!(transition = %trans.name, argument = %arc.argument, "popping one token");
            if record_tokens {
                snapshot.tokens.push(token.clone());
            }
            kwargs.insert(arc.argument.clone(), token);
        }
        snapshots.push(snapshot);
    }
    Ok((kwargs, snapshots))
}

/// Stage 2: merge the fixed kwargs and invoke the transition function,
/// awaiting it when asynchronous.
pub(crate) async fn invoke(trans: &Transition, mut kwargs: Kwargs) -> Result<Token, ExecError> {
    if let Some(fixed) = &trans.fixed_kwargs {
        for (key, value) in fixed {
            if kwargs.contains_key(key) {
                return Err(ExecError::KwargCollision {
                    transition: trans.name.clone(),
                    key: key.clone(),
                });
            }
            kwargs.insert(key.clone(), value.clone());
        }
    }
    let outcome = match &trans.function {
        TransitionFn::Sync(function) => function(kwargs),
        TransitionFn::Async(function) => function(kwargs).await,
    };
    outcome.map_err(|source| ExecError::FunctionFailed {
        transition: trans.name.clone(),
        source,
    })
}

/// Stage 3: route the result and deposit tokens into output places.
///
/// Returns the output-place snapshots, one per receiving place.
#[allow(clippy::too_many_arguments)]
pub(crate) fn distribute(
    trans: &Transition,
    result: Token,
    outflows: &[Outflow],
    outflow_ids: &[usize],
    places: &mut [Place],
    index: &NetIndex,
    allow_copying: bool,
    record_tokens: bool,
) -> Result<Vec<Place>, ExecError> {
    if trans.output_distribution.is_some() {
        route_by_distribution(trans, &result, outflows, outflow_ids, places, index, record_tokens)
    } else {
        route_by_type(
            trans,
            result,
            outflows,
            outflow_ids,
            places,
            index,
            allow_copying,
            record_tokens,
        )
    }
}

/// Default routing: candidate places come from the outflow arcs and the
/// result lands wherever its type matches.
#[allow(clippy::too_many_arguments)]
fn route_by_type(
    trans: &Transition,
    result: Token,
    outflows: &[Outflow],
    outflow_ids: &[usize],
    places: &mut [Place],
    index: &NetIndex,
    allow_copying: bool,
    record_tokens: bool,
) -> Result<Vec<Place>, ExecError> {
    let candidates: Vec<usize> = outflow_ids
        .iter()
        .map(|&i| index.place_ids[outflows[i].place.as_str()])
        .collect();
    if result.is_null() && candidates.is_empty() {
        return Ok(Vec::new());
    }
    let matching = route::matching_places(&result, &candidates, places);
    if matching.is_empty() {
        return Err(ExecError::NoRoute {
            transition: trans.name.clone(),
            result_type: result.type_name(),
        });
    }
    if matching.len() > 1 && !allow_copying {
        return Err(ExecError::AmbiguousRoute {
            transition: trans.name.clone(),
            places: matching
                .iter()
                .map(|&p| places[p].name.clone())
                .collect(),
        });
    }
    // The first matching place takes the result itself; every further
    // place takes a deep copy.
    let copies: Vec<Token> = matching.iter().skip(1).map(|_| result.clone()).collect();
    let mut snapshots = Vec::with_capacity(matching.len());
    for (&place_id, token) in matching.iter().zip(std::iter::once(result).chain(copies)) {
        let added = route::deposit(&mut places[place_id], token, record_tokens)?;
        let mut snapshot = places[place_id].copy_sans_tokens();
        snapshot.tokens = added;
        snapshots.push(snapshot);
    }
    Ok(snapshots)
}

/// Distribution routing: the transition's own function decides which place
/// receives which token. Null entries are silently skipped. Entries are
/// owned, distinct values, so they deposit as-is without copying.
fn route_by_distribution(
    trans: &Transition,
    result: &Token,
    outflows: &[Outflow],
    outflow_ids: &[usize],
    places: &mut [Place],
    index: &NetIndex,
    record_tokens: bool,
) -> Result<Vec<Place>, ExecError> {
    if outflow_ids
        .iter()
        .any(|&i| outflows[i].return_index.is_some())
    {
        return Err(ExecError::IndexedWithDistribution {
            transition: trans.name.clone(),
        });
    }
    let distribution = trans
        .output_distribution
        .as_ref()
        .map(|f| f(result))
        .unwrap_or_default();
    let mut snapshots = Vec::new();
    for (place_name, token) in distribution {
        if token.is_null() {
            continue;
        }
        let Some(&place_id) = index.place_ids.get(place_name.as_str()) else {
            return Err(ExecError::UnknownPlace {
                transition: trans.name.clone(),
                place: place_name,
            });
        };
        let added = route::deposit(&mut places[place_id], token, record_tokens)?;
        let mut snapshot = places[place_id].copy_sans_tokens();
        snapshot.tokens = added;
        snapshots.push(snapshot);
    }
    Ok(snapshots)
}
