//! Default collection semantics as pure functions.
//!
//! Each function takes the current records and returns the next sequence.
//! Records that are not touched keep their `Arc`, so consumers can detect
//! change with [`Arc::ptr_eq`].

use crate::error::{Result, StoreError};
use crate::identifier::{Identifier, IdentifierPolicy};
use crate::merge::{merge_record, MergeStrategy};
use crate::Record;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Append `item` unless a record with the same identifier exists.
pub fn add<T: Serialize>(
    entities: &[Arc<T>],
    item: Arc<T>,
    policy: &IdentifierPolicy,
) -> Result<Vec<Arc<T>>> {
    match policy.extract(item.as_ref()) {
        Some(id) if has(entities, &id, policy) => {
            return Err(StoreError::DuplicateIdentifier {
                key: policy.id_key().to_string(),
                id,
            });
        }
        Some(_) => {}
        None => warn!(id_key = %policy.id_key(), "adding record without usable identifier"),
    }

    let mut next = entities.to_vec();
    next.push(item);
    Ok(next)
}

/// Append every item. Duplicates are not checked.
pub fn add_many<T>(entities: &[Arc<T>], items: Vec<Arc<T>>) -> Vec<Arc<T>> {
    let mut next = Vec::with_capacity(entities.len() + items.len());
    next.extend_from_slice(entities);
    next.extend(items);
    next
}

/// Shallow-merge `patch` into every record carrying `id`.
///
/// A patch that moves a record onto an identifier another record already
/// holds is rejected with [`StoreError::DuplicateIdentifier`].
pub fn update<T: Record>(
    entities: &[Arc<T>],
    id: &Identifier,
    patch: &Value,
    policy: &IdentifierPolicy,
) -> Result<Vec<Arc<T>>> {
    let next = entities
        .iter()
        .map(|entity| {
            if policy.matches(entity.as_ref(), id) {
                merge_record(entity.as_ref(), patch, MergeStrategy::Shallow).map(Arc::new)
            } else {
                Ok(Arc::clone(entity))
            }
        })
        .collect::<Result<Vec<_>>>()?;
    ensure_no_collision(entities, &next, policy)?;
    Ok(next)
}

/// Shallow-merge each patch into the record whose identifier it carries.
///
/// Patches are matched through the identifier field inside them. When
/// several patches carry the same identifier the first one wins; patches
/// without an identifier are ignored. The identifier field only selects the
/// record and is not merged, so the record keeps its own encoding of it.
pub fn update_many<T: Record>(
    entities: &[Arc<T>],
    patches: &[Value],
    policy: &IdentifierPolicy,
) -> Result<Vec<Arc<T>>> {
    let tagged: Vec<(Identifier, Value)> = patches
        .iter()
        .filter_map(|patch| match policy.extract_value(patch) {
            Some(id) => {
                let mut body = patch.clone();
                if let Some(fields) = body.as_object_mut() {
                    fields.remove(policy.id_key());
                }
                Some((id, body))
            }
            None => {
                warn!(id_key = %policy.id_key(), "ignoring patch without identifier");
                None
            }
        })
        .collect();

    entities
        .iter()
        .map(|entity| {
            let patch = policy.extract(entity.as_ref()).and_then(|own| {
                tagged
                    .iter()
                    .find(|(id, _)| policy.equals(id, &own))
                    .map(|(_, patch)| patch)
            });
            match patch {
                Some(patch) => {
                    merge_record(entity.as_ref(), patch, MergeStrategy::Shallow).map(Arc::new)
                }
                None => Ok(Arc::clone(entity)),
            }
        })
        .collect()
}

// `before` and `after` are index-aligned. Only records whose identifier
// changed are checked, so collisions left by overrides are not reported.
fn ensure_no_collision<T: Serialize>(
    before: &[Arc<T>],
    after: &[Arc<T>],
    policy: &IdentifierPolicy,
) -> Result<()> {
    for (index, (old, new)) in before.iter().zip(after).enumerate() {
        if Arc::ptr_eq(old, new) {
            continue;
        }
        let Some(id) = policy.extract(new.as_ref()) else {
            continue;
        };
        if policy.extract(old.as_ref()).as_ref() == Some(&id) {
            continue;
        }
        let taken = after
            .iter()
            .enumerate()
            .any(|(other, entity)| other != index && policy.matches(entity.as_ref(), &id));
        if taken {
            return Err(StoreError::DuplicateIdentifier {
                key: policy.id_key().to_string(),
                id,
            });
        }
    }
    Ok(())
}

/// Remove every record carrying `id`.
pub fn delete<T: Serialize>(
    entities: &[Arc<T>],
    id: &Identifier,
    policy: &IdentifierPolicy,
) -> Vec<Arc<T>> {
    entities
        .iter()
        .filter(|entity| !policy.matches(entity.as_ref(), id))
        .cloned()
        .collect()
}

/// Remove every record whose identifier is in `ids`.
pub fn delete_many<T: Serialize>(
    entities: &[Arc<T>],
    ids: &[Identifier],
    policy: &IdentifierPolicy,
) -> Vec<Arc<T>> {
    let doomed: HashSet<&Identifier> = ids.iter().collect();
    entities
        .iter()
        .filter(|entity| {
            policy
                .extract(entity.as_ref())
                .map_or(true, |id| !doomed.contains(&id))
        })
        .cloned()
        .collect()
}

/// First record carrying `id`.
pub fn find<T: Serialize>(
    entities: &[Arc<T>],
    id: &Identifier,
    policy: &IdentifierPolicy,
) -> Option<Arc<T>> {
    entities
        .iter()
        .find(|entity| policy.matches(entity.as_ref(), id))
        .cloned()
}

pub fn has<T: Serialize>(entities: &[Arc<T>], id: &Identifier, policy: &IdentifierPolicy) -> bool {
    entities
        .iter()
        .any(|entity| policy.matches(entity.as_ref(), id))
}
