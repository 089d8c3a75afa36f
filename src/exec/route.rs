//! Output routing and the deposit rules.

use crate::exec::ExecError;
use crate::net::place::Place;
use crate::token::Token;

/// Finds the candidate places whose declared types match a result value.
///
/// A non-empty list result matches a place either as a whole or through
/// its contents; direct matches are ordered before matches by contents.
/// An empty list matches every candidate, since the intended element type
/// is indeterminable at runtime.
pub(crate) fn matching_places(
    value: &Token,
    candidates: &[usize],
    places: &[Place],
) -> Vec<usize> {
    match value {
        Token::List(items) if !items.is_empty() => {
            let direct: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|&p| places[p].ty.admits(value))
                .collect();
            let by_contents: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|p| !direct.contains(p))
                .filter(|&p| items.iter().all(|item| places[p].ty.admits(item)))
                .collect();
            direct.into_iter().chain(by_contents).collect()
        }
        Token::List(_) => candidates.to_vec(),
        _ => candidates
            .iter()
            .copied()
            .filter(|&p| places[p].ty.admits(value))
            .collect(),
    }
}

/// Deposits a token into a place, honoring the list-vs-element rules:
///
/// - a non-empty list into a non-list place extends the place with the
///   list's elements;
/// - an empty list into a list place is appended as one empty token;
/// - an empty list into a non-list place deposits nothing;
/// - a null token deposits nothing;
/// - anything else is appended as a single token.
///
/// Every deposited token is type-checked first. Returns copies of the
/// tokens actually added when `record` is set (token history).
pub(crate) fn deposit(
    place: &mut Place,
    token: Token,
    record: bool,
) -> Result<Vec<Token>, ExecError> {
    if token.is_null() {
        return Ok(Vec::new());
    }
    let list_place = place.ty.is_list_type();
    match token {
        Token::List(items) if !items.is_empty() && !list_place => {
            for item in &items {
                if !place.ty.admits(item) {
                    return Err(ExecError::TypeViolation {
                        place: place.name.clone(),
                        expected: place.ty.clone(),
                        found: item.type_name(),
                    });
                }
            }
            let recorded = if record { items.clone() } else { Vec::new() };
            place.tokens.extend(items);
            Ok(recorded)
        }
        Token::List(items) if items.is_empty() && list_place => {
            place.tokens.push(Token::List(Vec::new()));
            Ok(if record {
                vec![Token::List(Vec::new())]
            } else {
                Vec::new()
            })
        }
        Token::List(items) if items.is_empty() => Ok(Vec::new()),
        token => {
            if !place.ty.admits(&token) {
                return Err(ExecError::TypeViolation {
                    place: place.name.clone(),
                    expected: place.ty.clone(),
                    found: token.type_name(),
                });
            }
            let recorded = if record { vec![token.clone()] } else { Vec::new() };
            place.tokens.push(token);
            Ok(recorded)
        }
    }
}
