use super::state::CollectionState;
use crate::identifier::Identifier;
use serde_json::Value;
use std::sync::Arc;

pub type AddHook<T> = Arc<dyn Fn(Arc<T>, &CollectionState<T>) -> Vec<Arc<T>> + Send + Sync>;
pub type AddManyHook<T> =
    Arc<dyn Fn(Vec<Arc<T>>, &CollectionState<T>) -> Vec<Arc<T>> + Send + Sync>;
pub type UpdateHook<T> =
    Arc<dyn Fn(&Identifier, &Value, &CollectionState<T>) -> Vec<Arc<T>> + Send + Sync>;
pub type UpdateManyHook<T> =
    Arc<dyn Fn(&[Value], &CollectionState<T>) -> Vec<Arc<T>> + Send + Sync>;
pub type DeleteHook<T> =
    Arc<dyn Fn(&Identifier, &CollectionState<T>) -> Vec<Arc<T>> + Send + Sync>;
pub type DeleteManyHook<T> =
    Arc<dyn Fn(&[Identifier], &CollectionState<T>) -> Vec<Arc<T>> + Send + Sync>;
pub type ClearHook<T> = Arc<dyn Fn(&CollectionState<T>) -> Vec<Arc<T>> + Send + Sync>;
pub type ReplaceAllHook<T> =
    Arc<dyn Fn(Vec<Arc<T>>, &CollectionState<T>) -> Vec<Arc<T>> + Send + Sync>;

/// Caller-supplied replacements for the default collection operations.
///
/// A hook receives the action input and the current state and returns the
/// complete next `entities` sequence. The store adopts it as is: no
/// duplicate check, `loaded` becomes `true` and `error` is cleared.
/// Operations without a hook use [`reducer`](super::reducer).
///
/// Hooks run while the store's write lock is held. Reading or writing the
/// same store from inside a hook, even through a cloned handle, deadlocks.
/// Everything a hook needs is in its arguments.
pub struct CollectionHooks<T> {
    pub add: Option<AddHook<T>>,
    pub add_many: Option<AddManyHook<T>>,
    pub update: Option<UpdateHook<T>>,
    pub update_many: Option<UpdateManyHook<T>>,
    pub delete: Option<DeleteHook<T>>,
    pub delete_many: Option<DeleteManyHook<T>>,
    pub clear: Option<ClearHook<T>>,
    pub replace_all: Option<ReplaceAllHook<T>>,
}

impl<T> Default for CollectionHooks<T> {
    fn default() -> Self {
        Self {
            add: None,
            add_many: None,
            update: None,
            update_many: None,
            delete: None,
            delete_many: None,
            clear: None,
            replace_all: None,
        }
    }
}

impl<T> Clone for CollectionHooks<T> {
    fn clone(&self) -> Self {
        Self {
            add: self.add.clone(),
            add_many: self.add_many.clone(),
            update: self.update.clone(),
            update_many: self.update_many.clone(),
            delete: self.delete.clone(),
            delete_many: self.delete_many.clone(),
            clear: self.clear.clone(),
            replace_all: self.replace_all.clone(),
        }
    }
}
