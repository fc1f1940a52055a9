use super::hooks::CollectionHooks;
use super::reducer;
use super::state::CollectionState;
use crate::error::StoreError;
use crate::identifier::{Identifier, IdentifierPolicy};
use crate::store::{Store, Subscription};
use crate::Record;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for [`create_collection_store`].
///
/// Defaults: identifier field `"id"`, no initial records, no hooks.
pub struct CollectionOptions<T> {
    policy: IdentifierPolicy,
    initial_state: Vec<T>,
    hooks: CollectionHooks<T>,
}

impl<T> Default for CollectionOptions<T> {
    fn default() -> Self {
        Self {
            policy: IdentifierPolicy::default(),
            initial_state: Vec::new(),
            hooks: CollectionHooks::default(),
        }
    }
}

impl<T> CollectionOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `id_key` instead of `"id"` as the identifier field.
    pub fn id_key(mut self, id_key: impl Into<String>) -> Self {
        self.policy = IdentifierPolicy::new(id_key);
        self
    }

    /// Use a prebuilt policy, for example one read from configuration.
    pub fn identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn initial_state(mut self, entities: impl IntoIterator<Item = T>) -> Self {
        self.initial_state = entities.into_iter().collect();
        self
    }

    /// Install a full set of hooks at once, replacing any set through the
    /// `on_*` builders. The same locking rule applies to every hook.
    pub fn hooks(mut self, hooks: CollectionHooks<T>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the default `add` (duplicate check then append).
    ///
    /// Runs under the store's write lock: calling back into this store from
    /// the hook, even through a cloned handle, deadlocks.
    pub fn on_add<F>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<T>, &CollectionState<T>) -> Vec<Arc<T>> + Send + Sync + 'static,
    {
        self.hooks.add = Some(Arc::new(hook));
        self
    }

    /// Replace the default `add_many` (append everything).
    ///
    /// Runs under the store's write lock: calling back into this store from
    /// the hook, even through a cloned handle, deadlocks.
    pub fn on_add_many<F>(mut self, hook: F) -> Self
    where
        F: Fn(Vec<Arc<T>>, &CollectionState<T>) -> Vec<Arc<T>> + Send + Sync + 'static,
    {
        self.hooks.add_many = Some(Arc::new(hook));
        self
    }

    /// Replace the default `update`. The hook gets the target identifier
    /// and the raw patch.
    ///
    /// Runs under the store's write lock: calling back into this store from
    /// the hook, even through a cloned handle, deadlocks.
    pub fn on_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Identifier, &Value, &CollectionState<T>) -> Vec<Arc<T>> + Send + Sync + 'static,
    {
        self.hooks.update = Some(Arc::new(hook));
        self
    }

    /// Replace the default `update_many`. The hook gets the raw patches.
    ///
    /// Runs under the store's write lock: calling back into this store from
    /// the hook, even through a cloned handle, deadlocks.
    pub fn on_update_many<F>(mut self, hook: F) -> Self
    where
        F: Fn(&[Value], &CollectionState<T>) -> Vec<Arc<T>> + Send + Sync + 'static,
    {
        self.hooks.update_many = Some(Arc::new(hook));
        self
    }

    /// Replace the default `delete`.
    ///
    /// Runs under the store's write lock: calling back into this store from
    /// the hook, even through a cloned handle, deadlocks.
    pub fn on_delete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Identifier, &CollectionState<T>) -> Vec<Arc<T>> + Send + Sync + 'static,
    {
        self.hooks.delete = Some(Arc::new(hook));
        self
    }

    /// Replace the default `delete_many`.
    ///
    /// Runs under the store's write lock: calling back into this store from
    /// the hook, even through a cloned handle, deadlocks.
    pub fn on_delete_many<F>(mut self, hook: F) -> Self
    where
        F: Fn(&[Identifier], &CollectionState<T>) -> Vec<Arc<T>> + Send + Sync + 'static,
    {
        self.hooks.delete_many = Some(Arc::new(hook));
        self
    }

    /// Replace the default `clear`. Whatever the hook returns is adopted,
    /// so a clear hook can keep records.
    ///
    /// Runs under the store's write lock: calling back into this store from
    /// the hook, even through a cloned handle, deadlocks.
    pub fn on_clear<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CollectionState<T>) -> Vec<Arc<T>> + Send + Sync + 'static,
    {
        self.hooks.clear = Some(Arc::new(hook));
        self
    }

    /// Replace the default `replace_all`.
    ///
    /// Runs under the store's write lock: calling back into this store from
    /// the hook, even through a cloned handle, deadlocks.
    pub fn on_replace_all<F>(mut self, hook: F) -> Self
    where
        F: Fn(Vec<Arc<T>>, &CollectionState<T>) -> Vec<Arc<T>> + Send + Sync + 'static,
    {
        self.hooks.replace_all = Some(Arc::new(hook));
        self
    }
}

/// A reactive collection of records keyed by identifier.
///
/// Every action reads the current state, computes the next one and publishes
/// it in a single step. Recoverable failures land in `error`; actions never
/// panic or return errors. Cloning the handle shares the same state.
pub struct CollectionStore<T> {
    store: Store<CollectionState<T>>,
    policy: Arc<IdentifierPolicy>,
    hooks: Arc<CollectionHooks<T>>,
}

impl<T> Clone for CollectionStore<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            policy: Arc::clone(&self.policy),
            hooks: Arc::clone(&self.hooks),
        }
    }
}

/// Create an independent collection store.
///
/// # Example
///
/// ```
/// use crudstore::{create_collection_store, CollectionOptions};
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Product {
///     id: u32,
///     name: String,
/// }
///
/// let products = create_collection_store(CollectionOptions::<Product>::new());
/// products.add(Product { id: 1, name: "Laptop".into() });
/// products.update(1, json!({ "name": "Tablet" }));
///
/// assert_eq!(products.find(1).unwrap().name, "Tablet");
/// assert!(products.loaded());
/// ```
pub fn create_collection_store<T: Record>(options: CollectionOptions<T>) -> CollectionStore<T> {
    CollectionStore::new(options)
}

impl<T: Record> CollectionStore<T> {
    pub fn new(options: CollectionOptions<T>) -> Self {
        let CollectionOptions {
            policy,
            initial_state,
            hooks,
        } = options;
        let entities: Vec<Arc<T>> = initial_state.into_iter().map(Arc::new).collect();
        warn_unkeyed(&policy, &entities);

        Self {
            store: Store::new(CollectionState::initial(entities)),
            policy: Arc::new(policy),
            hooks: Arc::new(hooks),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> CollectionState<T> {
        self.store.get()
    }

    pub fn entities(&self) -> Vec<Arc<T>> {
        self.store.read(|state| state.entities.clone())
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

    pub fn len(&self) -> usize {
        self.store.read(CollectionState::len)
    }

    pub fn is_empty(&self) -> bool {
        self.store.read(CollectionState::is_empty)
    }

    /// The identifier field this store resolved at creation.
    pub fn id_key(&self) -> &str {
        self.policy.id_key()
    }

    /// Run `f` after every state change. See [`Store::subscribe`].
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&CollectionState<T>) + Send + Sync + 'static,
    {
        self.store.subscribe(callback)
    }

    /// Add one record, refusing a duplicate identifier.
    pub fn add(&self, item: T) {
        let item = Arc::new(item);
        self.store.replace_with(|state| match &self.hooks.add {
            Some(hook) => adopt(state, hook(item, state)),
            None => match reducer::add(&state.entities, item, &self.policy) {
                Ok(entities) => {
                    debug!(count = entities.len(), "add");
                    loaded_with(state, entities)
                }
                Err(err) => fail(state, "add", err),
            },
        });
    }

    /// Append records without checking for duplicates.
    pub fn add_many(&self, items: impl IntoIterator<Item = T>) {
        let items: Vec<Arc<T>> = items.into_iter().map(Arc::new).collect();
        warn_unkeyed(&self.policy, &items);
        self.store.replace_with(|state| match &self.hooks.add_many {
            Some(hook) => adopt(state, hook(items, state)),
            None => {
                let entities = reducer::add_many(&state.entities, items);
                debug!(count = entities.len(), "add_many");
                loaded_with(state, entities)
            }
        });
    }

    /// Shallow-merge `patch` into the record carrying `id`.
    ///
    /// A patch may change the identifier field, but not to an identifier
    /// another record holds: that sets `error` and leaves the state as is.
    pub fn update(&self, id: impl Into<Identifier>, patch: Value) {
        let id = id.into();
        self.store.replace_with(|state| match &self.hooks.update {
            Some(hook) => adopt(state, hook(&id, &patch, state)),
            None => match reducer::update(&state.entities, &id, &patch, &self.policy) {
                Ok(entities) => {
                    debug!(%id, "update");
                    patched(state, entities)
                }
                Err(err) => fail(state, "update", err),
            },
        });
    }

    /// Apply patches that each carry the identifier field of their target.
    pub fn update_many(&self, patches: Vec<Value>) {
        self.store.replace_with(|state| match &self.hooks.update_many {
            Some(hook) => adopt(state, hook(&patches, state)),
            None => match reducer::update_many(&state.entities, &patches, &self.policy) {
                Ok(entities) => {
                    debug!(patches = patches.len(), "update_many");
                    patched(state, entities)
                }
                Err(err) => fail(state, "update_many", err),
            },
        });
    }

    pub fn delete(&self, id: impl Into<Identifier>) {
        let id = id.into();
        self.store.replace_with(|state| match &self.hooks.delete {
            Some(hook) => adopt(state, hook(&id, state)),
            None => {
                let entities = reducer::delete(&state.entities, &id, &self.policy);
                debug!(%id, count = entities.len(), "delete");
                pruned(state, entities)
            }
        });
    }

    pub fn delete_many<I>(&self, ids: I)
    where
        I: IntoIterator,
        I::Item: Into<Identifier>,
    {
        let ids: Vec<Identifier> = ids.into_iter().map(Into::into).collect();
        self.store.replace_with(|state| match &self.hooks.delete_many {
            Some(hook) => adopt(state, hook(&ids, state)),
            None => {
                let entities = reducer::delete_many(&state.entities, &ids, &self.policy);
                debug!(ids = ids.len(), count = entities.len(), "delete_many");
                pruned(state, entities)
            }
        });
    }

    /// Drop every record and reset `loaded` and `error`.
    pub fn clear(&self) {
        self.store.replace_with(|state| match &self.hooks.clear {
            Some(hook) => adopt(state, hook(state)),
            None => {
                debug!("clear");
                CollectionState {
                    entities: Vec::new(),
                    loaded: false,
                    loading: state.loading,
                    error: None,
                }
            }
        });
    }

    /// Replace the whole sequence. Duplicates are not checked.
    pub fn replace_all(&self, items: impl IntoIterator<Item = T>) {
        let items: Vec<Arc<T>> = items.into_iter().map(Arc::new).collect();
        warn_unkeyed(&self.policy, &items);
        self.store.replace_with(|state| match &self.hooks.replace_all {
            Some(hook) => adopt(state, hook(items, state)),
            None => {
                debug!(count = items.len(), "replace_all");
                loaded_with(state, items)
            }
        });
    }

    pub fn find(&self, id: impl Into<Identifier>) -> Option<Arc<T>> {
        let id = id.into();
        self.store
            .read(|state| reducer::find(&state.entities, &id, &self.policy))
    }

    pub fn has(&self, id: impl Into<Identifier>) -> bool {
        let id = id.into();
        self.store
            .read(|state| reducer::has(&state.entities, &id, &self.policy))
    }

    /// Overwrite `error` and nothing else.
    pub fn set_error(&self, error: Option<String>) {
        self.store.replace_with(|state| CollectionState {
            error,
            ..state.clone()
        });
    }

    /// Overwrite `loading` and nothing else.
    pub fn set_loading(&self, loading: bool) {
        self.store.replace_with(|state| CollectionState {
            loading,
            ..state.clone()
        });
    }
}

// Records without an identifier are accepted but can never be found.
// Checked once on the way in, not on every scan.
fn warn_unkeyed<T: Record>(policy: &IdentifierPolicy, items: &[Arc<T>]) {
    let unkeyed = items
        .iter()
        .filter(|item| policy.extract(item.as_ref()).is_none())
        .count();
    if unkeyed > 0 {
        warn!(id_key = %policy.id_key(), unkeyed, "inserting records without usable identifier");
    }
}

// Hook results are trusted wholesale.
fn adopt<T>(state: &CollectionState<T>, entities: Vec<Arc<T>>) -> CollectionState<T> {
    debug!(count = entities.len(), "adopting hook result");
    loaded_with(state, entities)
}

fn loaded_with<T>(state: &CollectionState<T>, entities: Vec<Arc<T>>) -> CollectionState<T> {
    CollectionState {
        entities,
        loaded: true,
        loading: state.loading,
        error: None,
    }
}

fn patched<T>(state: &CollectionState<T>, entities: Vec<Arc<T>>) -> CollectionState<T> {
    let changed = entities
        .iter()
        .zip(&state.entities)
        .any(|(next, prev)| !Arc::ptr_eq(next, prev));
    CollectionState {
        entities,
        loaded: state.loaded || changed,
        loading: state.loading,
        error: None,
    }
}

fn pruned<T>(state: &CollectionState<T>, entities: Vec<Arc<T>>) -> CollectionState<T> {
    CollectionState {
        loaded: state.loaded && !entities.is_empty(),
        entities,
        loading: state.loading,
        error: None,
    }
}

fn fail<T>(state: &CollectionState<T>, op: &str, err: StoreError) -> CollectionState<T> {
    warn!(op, %err, "collection action failed");
    CollectionState {
        error: Some(err.to_string()),
        ..state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Product {
        id: u32,
        name: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Book {
        isbn: String,
        title: String,
    }

    fn product(id: u32, name: &str) -> Product {
        Product {
            id,
            name: name.to_string(),
        }
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn store_with(items: Vec<Product>) -> CollectionStore<Product> {
        create_collection_store(CollectionOptions::new().initial_state(items))
    }

    #[test]
    fn initial_state() {
        let store = store_with(vec![]);
        let state = store.state();
        assert!(state.entities.is_empty());
        assert!(!state.loaded);
        assert!(!state.loading);
        assert_eq!(state.error, None);
        assert_eq!(store.id_key(), "id");
    }

    #[test]
    fn initial_records_are_not_loaded() {
        let store = store_with(vec![product(1, "Laptop")]);
        assert_eq!(store.len(), 1);
        assert!(!store.loaded());
    }

    #[test]
    fn add_marks_loaded() {
        let store = store_with(vec![]);
        store.add(product(1, "Laptop"));
        assert_eq!(store.len(), 1);
        assert!(store.loaded());
    }

    #[test]
    fn duplicate_add_sets_error_without_mutation() {
        let store = store_with(vec![product(1, "Laptop")]);
        let before = store.state();

        store.add(product(1, "Other"));

        let after = store.state();
        assert_eq!(after.entities, before.entities);
        assert!(!after.loaded);
        assert_eq!(after.error.as_deref(), Some("Item with id=1 already exists."));
    }

    #[test]
    fn successful_action_clears_error() {
        let store = store_with(vec![]);
        store.add(product(1, "Laptop"));
        store.add(product(1, "Laptop"));
        assert!(store.error().is_some());

        store.add(product(2, "Phone"));
        assert_eq!(store.error(), None);
    }

    #[test]
    fn custom_id_key() {
        let store = create_collection_store(CollectionOptions::<Book>::new().id_key("isbn"));
        store.add(Book {
            isbn: "978-0".to_string(),
            title: "Dune".to_string(),
        });
        store.add(Book {
            isbn: "978-0".to_string(),
            title: "Dune again".to_string(),
        });

        assert_eq!(store.len(), 1);
        assert_eq!(store.error().as_deref(), Some("Item with isbn=978-0 already exists."));
        assert_eq!(store.find("978-0").unwrap().title, "Dune");
    }

    #[test]
    fn update_without_match_keeps_loaded() {
        let store = store_with(vec![product(1, "Laptop")]);
        store.update(9, json!({"name": "Nothing"}));
        assert!(!store.loaded());

        store.update(1, json!({"name": "Tablet"}));
        assert!(store.loaded());
        assert_eq!(store.find(1).unwrap().name, "Tablet");
    }

    #[test]
    fn update_onto_taken_identifier_sets_error() {
        let store = store_with(vec![]);
        store.add_many(vec![product(1, "Laptop"), product(2, "Phone")]);
        let before = store.state();

        store.update(2, json!({"id": 1}));

        let after = store.state();
        assert_eq!(after.entities, before.entities);
        assert_eq!(after.error.as_deref(), Some("Item with id=1 already exists."));
        let ids: Vec<u32> = store.entities().iter().map(|p| p.id).collect();
        assert_eq!(ids, [1, 2]);

        store.update(2, json!({"id": 3}));
        assert_eq!(store.error(), None);
        assert!(store.has(3));
        assert!(!store.has(2));
    }

    #[test]
    fn float_identifiers_match_integers() {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        struct Reading {
            id: f64,
            value: i32,
        }

        let store = create_collection_store(CollectionOptions::<Reading>::new());
        store.add(Reading { id: 1.0, value: 10 });
        store.add(Reading { id: 1.0, value: 20 });
        assert_eq!(store.len(), 1);

        assert!(store.has(1));
        assert_eq!(store.find(1).unwrap().value, 10);

        let products = store_with(vec![product(1, "Laptop")]);
        products.update_many(vec![json!({"id": 1.0, "name": "Tablet"})]);
        assert_eq!(products.error(), None);
        assert_eq!(products.find(1).unwrap().name, "Tablet");
        assert_eq!(products.find(1.0).unwrap().id, 1);
    }

    #[test]
    fn unkeyed_records_warn_once_on_insert() {
        let buffer = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer({
                let buffer = buffer.clone();
                move || buffer.clone()
            })
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let store = create_collection_store(CollectionOptions::<Product>::new().id_key("sku"));
            store.replace_all(vec![product(1, "Laptop"), product(2, "Phone")]);

            for _ in 0..5 {
                assert!(!store.has("LAP-1"));
                assert!(store.find("LAP-1").is_none());
                store.update_many(vec![json!({"sku": "LAP-1", "name": "Tablet"})]);
            }
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("without usable identifier").count(), 1);
        assert!(output.contains("unkeyed=2"));
    }

    #[test]
    fn state_get_and_iter() {
        let store = store_with(vec![product(1, "Laptop"), product(2, "Phone")]);
        let state = store.state();

        assert_eq!(state.get(1), Some(&product(2, "Phone")));
        assert_eq!(state.get(2), None);

        let names: Vec<&str> = state.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Laptop", "Phone"]);
        assert_eq!(state.iter().count(), state.len());
    }

    #[test]
    fn invalid_patch_sets_error() {
        let store = store_with(vec![product(1, "Laptop")]);
        store.update(1, json!("Tablet"));
        assert_eq!(store.find(1).unwrap().name, "Laptop");
        assert_eq!(
            store.error().as_deref(),
            Some("patch must be an object, got string")
        );
    }

    #[test]
    fn delete_last_record_unloads() {
        let store = store_with(vec![]);
        store.add(product(1, "Laptop"));
        store.add(product(2, "Phone"));

        store.delete(1);
        assert!(store.loaded());

        store.delete(2);
        assert!(store.is_empty());
        assert!(!store.loaded());
    }

    #[test]
    fn delete_many_unloads_when_empty() {
        let store = store_with(vec![]);
        store.add_many(vec![product(1, "Laptop"), product(2, "Phone")]);
        store.delete_many([1, 2]);
        assert!(store.is_empty());
        assert!(!store.loaded());
    }

    #[test]
    fn set_error_and_loading_touch_only_their_field() {
        let store = store_with(vec![product(1, "Laptop")]);
        store.set_loading(true);
        store.set_error(Some("Something went wrong".to_string()));

        let state = store.state();
        assert!(state.loading);
        assert_eq!(state.error.as_deref(), Some("Something went wrong"));
        assert_eq!(state.len(), 1);
        assert!(!state.loaded);

        store.set_error(None);
        store.set_loading(false);
        assert_eq!(store.error(), None);
        assert!(!store.loading());
    }

    #[test]
    fn loading_survives_crud() {
        let store = store_with(vec![]);
        store.set_loading(true);
        store.add(product(1, "Laptop"));
        store.clear();
        assert!(store.loading());
    }

    #[test]
    fn add_hook_replaces_dedup() {
        let store = create_collection_store(
            CollectionOptions::<Product>::new().on_add(|item, state| {
                // Upsert: newest record wins and goes first.
                let mut next = vec![Arc::clone(&item)];
                next.extend(state.entities.iter().filter(|e| e.id != item.id).cloned());
                next
            }),
        );

        store.add(product(1, "Laptop"));
        store.add(product(2, "Phone"));
        store.add(product(1, "Tablet"));

        let names: Vec<String> = store.entities().iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, ["Tablet", "Phone"]);
        assert_eq!(store.error(), None);
    }

    #[test]
    fn hooks_may_break_uniqueness() {
        let store = create_collection_store(
            CollectionOptions::<Product>::new().on_add(|item, state| {
                let mut next = state.entities.clone();
                next.push(item);
                next
            }),
        );
        store.add(product(1, "Laptop"));
        store.add(product(1, "Laptop"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.error(), None);
    }

    #[test]
    fn hook_result_marks_loaded() {
        let store = create_collection_store(
            CollectionOptions::<Product>::new()
                .initial_state(vec![product(1, "Laptop")])
                .on_delete(|_, state| state.entities.clone()),
        );
        store.delete(1);
        assert_eq!(store.len(), 1);
        assert!(store.loaded());
    }

    #[test]
    fn hooks_receive_inputs() {
        let store = create_collection_store(
            CollectionOptions::<Product>::new()
                .initial_state(vec![product(1, "Laptop"), product(2, "Phone")])
                .on_update(|id, patch, state| {
                    assert_eq!(id, &Identifier::from(2));
                    assert_eq!(patch, &json!({"name": "ignored"}));
                    state.entities.iter().rev().cloned().collect()
                })
                .on_delete_many(|ids, state| {
                    assert_eq!(ids.len(), 2);
                    state.entities[..1].to_vec()
                })
                .on_clear(|state| state.entities.clone()),
        );

        store.update(2, json!({"name": "ignored"}));
        assert_eq!(store.entities()[0].id, 2);

        store.delete_many([1, 2]);
        assert_eq!(store.len(), 1);

        store.clear();
        assert_eq!(store.len(), 1);
        assert!(store.loaded());
    }

    #[test]
    fn update_many_and_replace_all_hooks_are_adopted() {
        let store = create_collection_store(
            CollectionOptions::<Product>::new()
                .initial_state(vec![product(1, "Laptop"), product(2, "Phone")])
                .on_update_many(|patches, state| {
                    assert_eq!(patches, &[json!({"id": 9, "name": "Nowhere"})]);
                    // Upper-case every name regardless of the patches.
                    state
                        .iter()
                        .map(|p| Arc::new(product(p.id, &p.name.to_uppercase())))
                        .collect()
                })
                .on_replace_all(|items, state| {
                    // Keep existing records, append the new ones.
                    state.entities.iter().cloned().chain(items).collect()
                }),
        );

        store.set_error(Some("stale".to_string()));
        store.update_many(vec![json!({"id": 9, "name": "Nowhere"})]);

        let state = store.state();
        let names: Vec<&str> = state.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["LAPTOP", "PHONE"]);
        assert!(state.loaded);
        assert_eq!(state.error, None);

        store.set_error(Some("stale".to_string()));
        store.replace_all(vec![product(2, "Phone again")]);

        let ids: Vec<u32> = store.entities().iter().map(|p| p.id).collect();
        assert_eq!(ids, [1, 2, 2]);
        assert!(store.loaded());
        assert_eq!(store.error(), None);
    }

    #[test]
    fn hooks_struct_and_identifier_policy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let hooks = CollectionHooks::<Book> {
            add: Some(Arc::new({
                let calls = calls.clone();
                move |item: Arc<Book>, state: &CollectionState<Book>| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let mut next = state.entities.clone();
                    next.push(item);
                    next
                }
            })),
            clear: Some(Arc::new(|state: &CollectionState<Book>| {
                state.entities[..1].to_vec()
            })),
            ..CollectionHooks::default()
        };
        let policy: IdentifierPolicy = serde_json::from_value(json!({"id_key": "isbn"})).unwrap();

        let store = create_collection_store(
            CollectionOptions::<Book>::new()
                .on_delete(|_, _| Vec::new())
                .identifier_policy(policy)
                .hooks(hooks),
        );
        assert_eq!(store.id_key(), "isbn");

        let dune = Book {
            isbn: "978-0".to_string(),
            title: "Dune".to_string(),
        };
        store.add(dune.clone());
        store.add(dune.clone());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.error(), None);
        assert_eq!(store.find("978-0").as_deref(), Some(&dune));

        // `hooks` replaced the earlier `on_delete`, so the default runs.
        store.delete("978-0");
        assert!(store.is_empty());
        assert!(!store.loaded());

        store.add(dune.clone());
        store.add(dune);
        store.clear();
        assert_eq!(store.len(), 1);
        assert!(store.loaded());
    }

    #[test]
    fn handles_are_isolated() {
        let a = store_with(vec![]);
        let b = store_with(vec![]);
        a.add(product(1, "Laptop"));
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 0);

        let a2 = a.clone();
        a2.add(product(2, "Phone"));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn subscribers_see_each_action() {
        let store = store_with(vec![]);
        let calls = Arc::new(AtomicUsize::new(0));
        let last_len = Arc::new(AtomicUsize::new(0));

        let _subscription = store.subscribe({
            let calls = calls.clone();
            let last_len = last_len.clone();
            move |state| {
                calls.fetch_add(1, Ordering::SeqCst);
                last_len.store(state.len(), Ordering::SeqCst);
            }
        });

        store.add(product(1, "Laptop"));
        store.add_many(vec![product(2, "Phone"), product(3, "Watch")]);
        store.delete(3);

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(last_len.load(Ordering::SeqCst), 2);
    }
}
