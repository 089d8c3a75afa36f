//! Type descriptors and the runtime compatibility predicates.

use std::fmt;

use crate::token::Token;

/// Declared type of the tokens a place holds, a function argument accepts,
/// or a function returns.
///
/// Descriptors are compared structurally, with named aliases unfolded on
/// demand. Integer and float are distinct nominal types.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TypeDescriptor {
    /// The top type; admits every token.
    Any,
    /// The null marker type.
    Null,
    /// Booleans.
    Bool,
    /// Integers.
    Int,
    /// Floating-point numbers.
    Float,
    /// Strings.
    Str,
    /// A union over member types.
    Union(Vec<TypeDescriptor>),
    /// A list with a declared element type.
    List(Box<TypeDescriptor>),
    /// A mapping with declared key and value types.
    Dict(Box<TypeDescriptor>, Box<TypeDescriptor>),
    /// A fixed-length sequence with positional element types.
    Tuple(Vec<TypeDescriptor>),
    /// A list with no declared element type.
    RawList,
    /// A mapping with no declared key and value types.
    RawDict,
    /// A fixed-length sequence with no declared element types.
    RawTuple,
    /// A user-defined type, matched nominally by name.
    Struct(String),
    /// A named alias wrapping another descriptor.
    Alias {
        /// The alias name.
        name: String,
        /// The aliased descriptor.
        inner: Box<TypeDescriptor>,
    },
}

impl TypeDescriptor {
    /// Returns a `list` descriptor over the given element type.
    #[must_use]
    pub fn list(element: TypeDescriptor) -> Self {
        TypeDescriptor::List(Box::new(element))
    }

    /// Returns a `dict` descriptor over the given key and value types.
    #[must_use]
    pub fn dict(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Dict(Box::new(key), Box::new(value))
    }

    /// Returns a `tuple` descriptor over the given positional types.
    #[must_use]
    pub fn tuple(elements: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        TypeDescriptor::Tuple(elements.into_iter().collect())
    }

    /// Returns a union descriptor over the given member types.
    #[must_use]
    pub fn union(members: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        TypeDescriptor::Union(members.into_iter().collect())
    }

    /// Returns an optional descriptor: a union of `inner` and the null type.
    #[must_use]
    pub fn optional(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Union(vec![inner, TypeDescriptor::Null])
    }

    /// Returns a named alias wrapping `inner`.
    #[must_use]
    pub fn alias(name: impl Into<String>, inner: TypeDescriptor) -> Self {
        TypeDescriptor::Alias {
            name: name.into(),
            inner: Box::new(inner),
        }
    }

    /// Resolves alias chains down to the underlying descriptor.
    #[must_use]
    pub fn unfold(&self) -> &TypeDescriptor {
        let mut ty = self;
        while let TypeDescriptor::Alias { inner, .. } = ty {
            ty = inner;
        }
        ty
    }

    /// Returns whether this descriptor names a list, parameterized or not.
    #[must_use]
    pub fn is_list_type(&self) -> bool {
        matches!(
            self.unfold(),
            TypeDescriptor::List(_) | TypeDescriptor::RawList
        )
    }

    /// Returns whether `token` inhabits this declared type.
    ///
    /// Never fails; a mismatch is `false` and higher layers translate it
    /// into typed errors.
    #[must_use]
    pub fn admits(&self, token: &Token) -> bool {
        if matches!(self, TypeDescriptor::Any) {
            return true;
        }
        // The null check precedes alias unfolding: a null token inhabits
        // only the null type itself or a union listing it.
        if token.is_null() {
            return match self {
                TypeDescriptor::Null => true,
                TypeDescriptor::Union(members) => {
                    members.iter().any(|m| matches!(m, TypeDescriptor::Null))
                }
                _ => false,
            };
        }
        match self {
            TypeDescriptor::Any => true,
            TypeDescriptor::Alias { inner, .. } => inner.admits(token),
            TypeDescriptor::Union(members) => members.iter().any(|m| m.admits(token)),
            TypeDescriptor::List(element) => match token {
                Token::List(items) => items.iter().all(|item| element.admits(item)),
                _ => false,
            },
            TypeDescriptor::Dict(key, value) => match token {
                Token::Dict(entries) => entries
                    .iter()
                    .all(|(k, v)| key.admits(k) && value.admits(v)),
                _ => false,
            },
            TypeDescriptor::Tuple(elements) => match token {
                Token::Tuple(values) => {
                    values.len() == elements.len()
                        && elements.iter().zip(values).all(|(ty, v)| ty.admits(v))
                }
                _ => false,
            },
            TypeDescriptor::RawList => matches!(token, Token::List(_)),
            TypeDescriptor::RawDict => matches!(token, Token::Dict(_)),
            TypeDescriptor::RawTuple => matches!(token, Token::Tuple(_)),
            TypeDescriptor::Bool => matches!(token, Token::Bool(_)),
            TypeDescriptor::Int => matches!(token, Token::Int(_)),
            TypeDescriptor::Float => matches!(token, Token::Float(_)),
            TypeDescriptor::Str => matches!(token, Token::Str(_)),
            TypeDescriptor::Struct(name) => {
                matches!(token, Token::Struct { ty, .. } if ty == name)
            }
            TypeDescriptor::Null => false,
        }
    }

    /// Returns whether two declared types agree: structurally equal once
    /// top-level aliases are unfolded, or either side is the top type.
    #[must_use]
    pub fn matches(&self, other: &TypeDescriptor) -> bool {
        let a = self.unfold();
        let b = other.unfold();
        if matches!(a, TypeDescriptor::Any) || matches!(b, TypeDescriptor::Any) {
            return true;
        }
        a == b
    }

    /// Returns whether a place of this element type may feed an argument of
    /// type `argument`: directly, or lifted when `argument` is a list of
    /// this element type.
    #[must_use]
    pub fn matches_lifted(&self, argument: &TypeDescriptor) -> bool {
        if self.matches(argument) {
            return true;
        }
        match argument.unfold() {
            TypeDescriptor::List(element) => self.matches(element),
            _ => false,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Any => f.write_str("Any"),
            TypeDescriptor::Null => f.write_str("None"),
            TypeDescriptor::Bool => f.write_str("bool"),
            TypeDescriptor::Int => f.write_str("int"),
            TypeDescriptor::Float => f.write_str("float"),
            TypeDescriptor::Str => f.write_str("str"),
            TypeDescriptor::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            TypeDescriptor::List(element) => write!(f, "list[{element}]"),
            TypeDescriptor::Dict(key, value) => write!(f, "dict[{key}, {value}]"),
            TypeDescriptor::Tuple(elements) => {
                f.write_str("tuple[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
            TypeDescriptor::RawList => f.write_str("list"),
            TypeDescriptor::RawDict => f.write_str("dict"),
            TypeDescriptor::RawTuple => f.write_str("tuple"),
            TypeDescriptor::Struct(name) | TypeDescriptor::Alias { name, .. } => {
                f.write_str(name)
            }
        }
    }
}
