//! Keyed-collection stores.
//!
//! A [`CollectionStore`] holds many records of one type, deduplicated by an
//! identifier field. Each CRUD operation has a default in [`reducer`] that a
//! caller can swap out through [`CollectionHooks`].

mod hooks;
pub mod reducer;
mod state;
mod store;

pub use hooks::{
    AddHook, AddManyHook, ClearHook, CollectionHooks, DeleteHook, DeleteManyHook, ReplaceAllHook,
    UpdateHook, UpdateManyHook,
};
pub use state::CollectionState;
pub use store::{create_collection_store, CollectionOptions, CollectionStore};
