//! Petri net places.

use crate::net::GraphError;
use crate::token::Token;
use crate::types::TypeDescriptor;

/// A named, typed token buffer.
///
/// Tokens are accessed as a stack during firing: deposits push to the back
/// and extraction pops from the back. Every resident token inhabits the
/// place's declared element type.
#[derive(Clone, PartialEq, Debug)]
pub struct Place {
    pub(crate) name: String,
    pub(crate) ty: TypeDescriptor,
    pub(crate) tokens: Vec<Token>,
}

impl Place {
    /// Returns an empty place holding tokens of the given element type.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
            tokens: Vec::new(),
        }
    }

    /// Returns a place seeded with tokens.
    ///
    /// ## Errors
    ///
    /// Returns [`GraphError::TokenTypeMismatch`] if a seed token does not
    /// inhabit the element type.
    pub fn with_tokens(
        name: impl Into<String>,
        ty: TypeDescriptor,
        tokens: Vec<Token>,
    ) -> Result<Self, GraphError> {
        let name = name.into();
        for token in &tokens {
            if !ty.admits(token) {
                return Err(GraphError::TokenTypeMismatch {
                    place: name,
                    expected: ty,
                    found: token.type_name(),
                });
            }
        }
        Ok(Self { name, ty, tokens })
    }

    /// Returns the place's name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared element type.
    #[inline]
    #[must_use]
    pub fn element_type(&self) -> &TypeDescriptor {
        &self.ty
    }

    /// Returns the resident tokens, oldest first.
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Returns a copy of this place carrying no tokens. History snapshots
    /// start from this.
    #[must_use]
    pub(crate) fn copy_sans_tokens(&self) -> Self {
        Self {
            name: self.name.clone(),
            ty: self.ty.clone(),
            tokens: Vec::new(),
        }
    }
}
