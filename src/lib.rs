//! # crudstore
//!
//! Reactive CRUD containers for client-side application state.
//!
//! Two stores are built on a small observable state holder ([`Store`]):
//!
//! ## Collection stores
//!
//! - [`CollectionStore<T>`] - many records, unique by an identifier field
//! - Add, update, delete (single and bulk), clear, replace, find
//! - Every mutating operation can be replaced by a caller-supplied hook
//!
//! ## Entity stores
//!
//! - [`EntityStore<T>`] - zero or one record
//! - Shallow or deep partial updates
//!
//! Both carry `loaded`, `loading` and `error` next to their data. Failures
//! such as a duplicate identifier are written to `error`, never raised.
//!
//! ```
//! use crudstore::{create_collection_store, CollectionOptions};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Product {
//!     id: u32,
//!     name: String,
//! }
//!
//! let products = create_collection_store(CollectionOptions::<Product>::new());
//! products.add(Product { id: 1, name: "Laptop".into() });
//! products.add(Product { id: 1, name: "Laptop".into() });
//!
//! assert_eq!(products.len(), 1);
//! assert_eq!(products.error().as_deref(), Some("Item with id=1 already exists."));
//! ```

pub mod collection;
pub mod entity;
pub mod error;
pub mod identifier;
pub mod merge;
pub mod store;

use serde::de::DeserializeOwned;
use serde::Serialize;

// Re-export main types for convenience
pub use collection::{
    create_collection_store, CollectionHooks, CollectionOptions, CollectionState, CollectionStore,
};
pub use entity::{create_entity_store, EntityOptions, EntityState, EntityStore};
pub use error::{Result, StoreError};
pub use identifier::{Identifier, IdentifierPolicy, DEFAULT_ID_KEY};
pub use merge::{deep_merge, merge_record, shallow_merge, MergeStrategy};
pub use store::{Store, Subscription};

/// Anything a store can hold.
///
/// Records travel through JSON for identifier lookup and partial updates.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Record for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}
