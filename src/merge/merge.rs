use crate::error::{Result, StoreError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a partial patch is folded into an existing record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Top-level fields of the patch overwrite the record's (default).
    #[default]
    Shallow,
    /// Nested objects are merged recursively, see [`deep_merge`].
    Deep,
}

/// Recursively merge `patch` into `base`.
///
/// When both sides are objects every key of `patch` is merged into `base`;
/// keys absent from `patch` are kept. Any other pairing, including arrays and
/// `null`, lets the patch value replace the base value whole.
///
/// `base` is consumed: untouched sub-objects are moved into the result
/// rather than copied.
///
/// ```
/// use crudstore::deep_merge;
/// use serde_json::json;
///
/// let merged = deep_merge(json!({"a": {"x": 1}}), &json!({"a": {"x": 2, "y": 3}}));
/// assert_eq!(merged, json!({"a": {"x": 2, "y": 3}}));
///
/// let merged = deep_merge(json!({"a": {"x": 1}}), &json!({"a": 5}));
/// assert_eq!(merged, json!({"a": 5}));
/// ```
pub fn deep_merge(base: Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(mut base), Value::Object(patch)) => {
            for (key, patch_value) in patch {
                match base.get_mut(key) {
                    Some(slot) if slot.is_object() && patch_value.is_object() => {
                        let current = slot.take();
                        *slot = deep_merge(current, patch_value);
                    }
                    _ => {
                        base.insert(key.clone(), patch_value.clone());
                    }
                }
            }
            Value::Object(base)
        }
        (_, patch) => patch.clone(),
    }
}

/// Overwrite the top-level fields of `base` with those of `patch`.
pub fn shallow_merge(base: Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(mut base), Value::Object(patch)) => {
            for (key, patch_value) in patch {
                base.insert(key.clone(), patch_value.clone());
            }
            Value::Object(base)
        }
        (_, patch) => patch.clone(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Apply a partial `patch` to a typed record and return the new record.
///
/// Fails without touching anything when the patch is not an object or when
/// the merged document no longer deserialises into `T`.
pub fn merge_record<T>(record: &T, patch: &Value, strategy: MergeStrategy) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    if !patch.is_object() {
        return Err(StoreError::InvalidPatch {
            kind: kind_of(patch),
        });
    }

    let base = serde_json::to_value(record)?;
    let merged = match strategy {
        MergeStrategy::Shallow => shallow_merge(base, patch),
        MergeStrategy::Deep => deep_merge(base, patch),
    };
    Ok(serde_json::from_value(merged)?)
}
