//! Runtime token values.

/// A value residing in a place, consumed and produced by firings.
///
/// Tokens are move-only: the engine never duplicates one unless token
/// copying has been enabled for the run, in which case [`Clone`] is the
/// deep-copy operation it is permitted to call.
#[derive(Clone, PartialEq, Debug)]
pub enum Token {
    /// The null marker.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer. Integers are not floats.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string.
    Str(String),
    /// An ordered sequence of tokens.
    List(Vec<Token>),
    /// A fixed-length sequence of tokens.
    Tuple(Vec<Token>),
    /// A mapping, kept in insertion order.
    Dict(Vec<(Token, Token)>),
    /// A user-defined value, matched nominally by its type name.
    Struct {
        /// Name of the user-defined type.
        ty: String,
        /// Field values in declaration order.
        fields: Vec<(String, Token)>,
    },
}

impl Token {
    /// Returns whether this token is the null marker.
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Token::Null)
    }

    /// Returns the name of this token's runtime type, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            Token::Null => "None".to_owned(),
            Token::Bool(_) => "bool".to_owned(),
            Token::Int(_) => "int".to_owned(),
            Token::Float(_) => "float".to_owned(),
            Token::Str(_) => "str".to_owned(),
            Token::List(_) => "list".to_owned(),
            Token::Tuple(_) => "tuple".to_owned(),
            Token::Dict(_) => "dict".to_owned(),
            Token::Struct { ty, .. } => ty.clone(),
        }
    }

    /// Returns the inner integer, if this token is an integer.
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Token::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the inner float, if this token is a float.
    #[inline]
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Token::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the inner boolean, if this token is a boolean.
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Token::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the inner string, if this token is a string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Token::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the inner sequence, if this token is a list.
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[Token]> {
        match self {
            Token::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for Token {
    fn from(value: bool) -> Self {
        Token::Bool(value)
    }
}

impl From<i64> for Token {
    fn from(value: i64) -> Self {
        Token::Int(value)
    }
}

impl From<f64> for Token {
    fn from(value: f64) -> Self {
        Token::Float(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::Str(value.to_owned())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::Str(value)
    }
}

impl From<Vec<Token>> for Token {
    fn from(items: Vec<Token>) -> Self {
        Token::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Token::Null.type_name(), "None");
        assert_eq!(Token::Int(1).type_name(), "int");
        assert_eq!(Token::Float(1.0).type_name(), "float");
        assert_eq!(Token::List(vec![]).type_name(), "list");
        let value = Token::Struct {
            ty: "Reading".to_owned(),
            fields: vec![("value".to_owned(), Token::Int(3))],
        };
        assert_eq!(value.type_name(), "Reading");
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Token::Int(7).as_int(), Some(7));
        assert_eq!(Token::Float(7.0).as_int(), None);
        assert_eq!(Token::from("hi").as_str(), Some("hi"));
        let list = Token::from(vec![Token::Int(1), Token::Int(2)]);
        assert_eq!(list.as_list().map(<[Token]>::len), Some(2));
    }

    #[test]
    fn test_clone_is_a_deep_copy() {
        let original = Token::List(vec![Token::Str("a".to_owned())]);
        let copy = original.clone();
        assert_eq!(original, copy);
        if let (Token::List(a), Token::List(b)) = (&original, &copy) {
            assert_ne!(a.as_ptr(), b.as_ptr());
        }
    }
}
