//! Read-only, insertion-ordered property store.
//!
//! Memoizes one projector run. Once the store holds at least one entry it
//! is never cleared or replaced for the lifetime of the owning object; an
//! empty store is the signal that a full build may be attempted again.

use super::types::{CanonicalProperty, ExtractError, PropertyKey, PropertyValue};

#[derive(Debug, Default)]
pub struct PropertyCache {
    entries: Vec<CanonicalProperty>,
}

impl PropertyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True before any successful build.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries currently present (0 before any successful build).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Populate the store from one projector run, in projector order.
    /// Only callable while empty; a non-empty store is immutable.
    pub(crate) fn fill(&mut self, properties: Vec<CanonicalProperty>) {
        debug_assert!(self.entries.is_empty(), "property cache rebuilt");
        self.entries = properties;
    }

    /// Key at the given insertion index.
    pub fn key_at(&self, index: usize) -> Result<PropertyKey, ExtractError> {
        self.entries
            .get(index)
            .map(|entry| entry.key)
            .ok_or(ExtractError::OutOfRange)
    }

    /// Look up a value by key.
    pub fn get(&self, key: PropertyKey) -> Result<&PropertyValue, ExtractError> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
            .ok_or(ExtractError::NotFound)
    }

    /// The source format carries no writable metadata; writes always fail.
    pub fn set(&mut self, _key: PropertyKey, _value: PropertyValue) -> Result<(), ExtractError> {
        Err(ExtractError::NotSupported)
    }

    /// No key is ever writable.
    pub fn is_writable(&self, _key: PropertyKey) -> bool {
        false
    }
}
