//! Record identifiers and the policy that resolves them.

mod identifier;

pub use identifier::{Identifier, IdentifierPolicy, DEFAULT_ID_KEY};
