//! Singleton-entity stores.
//!
//! An [`EntityStore`] holds zero or one record, with shallow or deep partial
//! updates.

mod store;

pub use store::{create_entity_store, EntityOptions, EntityState, EntityStore};
