//! Place-transition arcs.

/// Directed arc binding a place to a named argument of a transition.
///
/// During firing, the source place supplies one token to the argument, or
/// its entire contents when the argument is declared as a list of the
/// place's element type.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Inflow {
    pub(crate) place: String,
    pub(crate) transition: String,
    pub(crate) argument: String,
}

impl Inflow {
    /// Returns an arc feeding tokens from `place` into the `argument` of
    /// `transition`.
    #[must_use]
    pub fn new(
        place: impl Into<String>,
        transition: impl Into<String>,
        argument: impl Into<String>,
    ) -> Self {
        Self {
            place: place.into(),
            transition: transition.into(),
            argument: argument.into(),
        }
    }

    /// Returns the source place name.
    #[must_use]
    pub fn place(&self) -> &str {
        &self.place
    }

    /// Returns the target transition name.
    #[must_use]
    pub fn transition(&self) -> &str {
        &self.transition
    }

    /// Returns the bound argument name.
    #[must_use]
    pub fn argument(&self) -> &str {
        &self.argument
    }
}

/// Directed arc routing a transition's return value to a place.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Outflow {
    pub(crate) transition: String,
    pub(crate) place: String,
    pub(crate) return_index: Option<usize>,
}

impl Outflow {
    /// Returns an arc routing the return value of `transition` to `place`.
    #[must_use]
    pub fn new(transition: impl Into<String>, place: impl Into<String>) -> Self {
        Self {
            transition: transition.into(),
            place: place.into(),
            return_index: None,
        }
    }

    /// Returns an arc carrying a positional index into a returned tuple.
    #[must_use]
    pub fn indexed(
        transition: impl Into<String>,
        place: impl Into<String>,
        index: usize,
    ) -> Self {
        Self {
            transition: transition.into(),
            place: place.into(),
            return_index: Some(index),
        }
    }

    /// Returns the source transition name.
    #[must_use]
    pub fn transition(&self) -> &str {
        &self.transition
    }

    /// Returns the destination place name.
    #[must_use]
    pub fn place(&self) -> &str {
        &self.place
    }

    /// Returns the positional index, if any.
    #[must_use]
    pub fn return_index(&self) -> Option<usize> {
        self.return_index
    }
}
