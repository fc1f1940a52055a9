//! The reactive state holder the entity stores are built on.
//!
//! A [`Store`] owns one immutable state value, replaces it atomically and
//! notifies subscribers after each replacement.

mod store;

pub use store::{Store, Subscription};
