use crate::error::StoreError;
use crate::merge::{merge_record, MergeStrategy};
use crate::store::{Store, Subscription};
use crate::Record;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Snapshot of a singleton store.
pub struct EntityState<T> {
    pub entity: Option<Arc<T>>,
    /// `true` exactly when `entity` is present.
    pub loaded: bool,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Clone for EntityState<T> {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity.clone(),
            loaded: self.loaded,
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for EntityState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityState")
            .field("entity", &self.entity)
            .field("loaded", &self.loaded)
            .field("loading", &self.loading)
            .field("error", &self.error)
            .finish()
    }
}

impl<T: PartialEq> PartialEq for EntityState<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
            && self.loaded == other.loaded
            && self.loading == other.loading
            && self.error == other.error
    }
}

/// Configuration for [`create_entity_store`].
///
/// Defaults: no initial entity, shallow updates.
pub struct EntityOptions<T> {
    initial_state: Option<T>,
    strategy: MergeStrategy,
}

impl<T> Default for EntityOptions<T> {
    fn default() -> Self {
        Self {
            initial_state: None,
            strategy: MergeStrategy::Shallow,
        }
    }
}

impl<T> EntityOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_state(mut self, entity: T) -> Self {
        self.initial_state = Some(entity);
        self
    }

    /// Merge nested objects on update instead of overwriting top-level fields.
    pub fn deep_merge(mut self, enabled: bool) -> Self {
        self.strategy = if enabled {
            MergeStrategy::Deep
        } else {
            MergeStrategy::Shallow
        };
        self
    }

    pub fn merge_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// A reactive holder for zero or one record.
pub struct EntityStore<T> {
    store: Store<EntityState<T>>,
    strategy: MergeStrategy,
}

impl<T> Clone for EntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            strategy: self.strategy,
        }
    }
}

/// Create an independent singleton store.
///
/// ```
/// use crudstore::{create_entity_store, EntityOptions};
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct User {
///     id: u32,
///     name: String,
/// }
///
/// let user = create_entity_store(EntityOptions::<User>::new());
/// user.set(User { id: 1, name: "Alice".into() });
/// user.update(json!({ "name": "Bob" }));
/// assert_eq!(user.entity().unwrap().name, "Bob");
/// ```
pub fn create_entity_store<T: Record>(options: EntityOptions<T>) -> EntityStore<T> {
    EntityStore::new(options)
}

impl<T: Record> EntityStore<T> {
    pub fn new(options: EntityOptions<T>) -> Self {
        let entity = options.initial_state.map(Arc::new);
        Self {
            store: Store::new(EntityState {
                loaded: entity.is_some(),
                entity,
                loading: false,
                error: None,
            }),
            strategy: options.strategy,
        }
    }

    pub fn state(&self) -> EntityState<T> {
        self.store.get()
    }

    pub fn entity(&self) -> Option<Arc<T>> {
        self.store.read(|state| state.entity.clone())
    }

    pub fn loaded(&self) -> bool {
        self.store.read(|state| state.loaded)
    }

    pub fn loading(&self) -> bool {
        self.store.read(|state| state.loading)
    }

    pub fn error(&self) -> Option<String> {
        self.store.read(|state| state.error.clone())
    }

    pub fn merge_strategy(&self) -> MergeStrategy {
        self.strategy
    }

    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&EntityState<T>) + Send + Sync + 'static,
    {
        self.store.subscribe(callback)
    }

    /// Replace the entity.
    pub fn set(&self, entity: T) {
        let entity = Arc::new(entity);
        debug!("set entity");
        self.store.replace_with(|state| EntityState {
            entity: Some(entity),
            loaded: true,
            loading: state.loading,
            error: None,
        });
    }

    /// Merge `patch` into the present entity.
    ///
    /// Without an entity nothing changes except `error`, which is set to
    /// [`StoreError::MissingEntity`]. A patch that does not fit `T` is
    /// reported the same way.
    pub fn update(&self, patch: Value) {
        let strategy = self.strategy;
        self.store.replace_with(|state| {
            let merged = match &state.entity {
                Some(entity) => merge_record(entity.as_ref(), &patch, strategy),
                None => Err(StoreError::MissingEntity),
            };
            match merged {
                Ok(entity) => {
                    debug!(?strategy, "update entity");
                    EntityState {
                        entity: Some(Arc::new(entity)),
                        loaded: true,
                        loading: state.loading,
                        error: None,
                    }
                }
                Err(err) => {
                    warn!(%err, "entity update failed");
                    EntityState {
                        error: Some(err.to_string()),
                        ..state.clone()
                    }
                }
            }
        });
    }

    /// Remove the entity.
    pub fn clear(&self) {
        debug!("clear entity");
        self.store.replace_with(|state| EntityState {
            entity: None,
            loaded: false,
            loading: state.loading,
            error: None,
        });
    }

    pub fn set_error(&self, error: Option<String>) {
        self.store.replace_with(|state| EntityState {
            error,
            ..state.clone()
        });
    }

    pub fn set_loading(&self, loading: bool) {
        self.store.replace_with(|state| EntityState {
            loading,
            ..state.clone()
        });
    }
}
