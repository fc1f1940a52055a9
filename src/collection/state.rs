use std::fmt;
use std::sync::Arc;

/// Snapshot of a keyed collection.
pub struct CollectionState<T> {
    /// Records in insertion order, unless replaced wholesale.
    pub entities: Vec<Arc<T>>,
    /// Whether a successful mutation happened since creation or the last clear.
    pub loaded: bool,
    /// Caller-driven; no CRUD action touches it.
    pub loading: bool,
    /// Message of the last recoverable failure.
    pub error: Option<String>,
}

impl<T> CollectionState<T> {
    pub(crate) fn initial(entities: Vec<Arc<T>>) -> Self {
        Self {
            entities,
            loaded: false,
            loading: false,
            error: None,
        }
    }

    /// Look up a record by position.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.entities.get(index).map(Arc::as_ref)
    }

    /// Iterate over the records.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entities.iter().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self::initial(Vec::new())
    }
}

// Manual impls: cloning a snapshot clones the `Arc`s, not the records.
impl<T> Clone for CollectionState<T> {
    fn clone(&self) -> Self {
        Self {
            entities: self.entities.clone(),
            loaded: self.loaded,
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CollectionState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionState")
            .field("entities", &self.entities)
            .field("loaded", &self.loaded)
            .field("loading", &self.loading)
            .field("error", &self.error)
            .finish()
    }
}

impl<T: PartialEq> PartialEq for CollectionState<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entities == other.entities
            && self.loaded == other.loaded
            && self.loading == other.loading
            && self.error == other.error
    }
}
