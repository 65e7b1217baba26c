//! A value slot that may be empty.
//!
//! `Optional` is a thin wrapper over [`Option`] with the access rules the
//! containers expect: reading an empty slot is a contract violation and
//! panics, and [`set`](Optional::set) assigns over a present value in place
//! rather than replacing the slot.

/// A slot holding at most one `T`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Optional<T> {
    slot: Option<T>,
}

impl<T> Optional<T> {
    /// An empty slot.
    #[must_use]
    pub const fn none() -> Self {
        Optional { slot: None }
    }

    /// A slot holding `value`.
    #[must_use]
    pub const fn from(value: T) -> Self {
        Optional { slot: Some(value) }
    }

    /// Stores `value`, assigning over the current value if there is one.
    pub fn set(&mut self, value: T) {
        match &mut self.slot {
            Some(current) => *current = value,
            None => self.slot = Some(value),
        }
    }

    /// The stored value.
    ///
    /// # Panics
    ///
    /// Panics if the slot is empty.
    #[must_use]
    pub fn get(&self) -> &T {
        match &self.slot {
            Some(value) => value,
            None => panic!("Cannot get() from empty option"),
        }
    }

    /// # Panics
    ///
    /// Panics if the slot is empty.
    #[must_use]
    pub fn get_mut(&mut self) -> &mut T {
        match &mut self.slot {
            Some(value) => value,
            None => panic!("Cannot get() from empty option"),
        }
    }

    /// The stored value, or `default` if the slot is empty.
    #[must_use]
    pub fn get_or(&self, default: T) -> T
    where
        T: Clone,
    {
        match &self.slot {
            Some(value) => value.clone(),
            None => default,
        }
    }

    /// Returns `true` if the slot holds a value.
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.slot.is_some()
    }

    /// Drops the stored value, if any.
    pub fn reset(&mut self) {
        self.slot = None;
    }

    /// Moves the value out, leaving the slot empty.
    pub fn take(&mut self) -> Option<T> {
        self.slot.take()
    }

    /// Borrows the value as a plain [`Option`].
    #[must_use]
    pub fn as_option(&self) -> Option<&T> {
        self.slot.as_ref()
    }
}

impl<T> Default for Optional<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T> From<Option<T>> for Optional<T> {
    fn from(slot: Option<T>) -> Self {
        Optional { slot }
    }
}

impl<T> From<Optional<T>> for Option<T> {
    fn from(opt: Optional<T>) -> Self {
        opt.slot
    }
}
