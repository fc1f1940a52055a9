use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Number, Value};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Field used as identifier when none is configured.
pub const DEFAULT_ID_KEY: &str = "id";

/// The unique key of a record within a collection.
///
/// Numbers compare by value, so `1`, `1u64` and `1.0` are the same
/// identifier. Numbers and strings never match: `Identifier::from(1)` and
/// `Identifier::from("1")` are different identifiers.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Value")]
pub enum Identifier {
    Number(Number),
    String(String),
}

// Integral floats in integer range collapse to their integer form.
fn canonical(n: &Number) -> Number {
    if let Some(f) = n.as_f64().filter(|_| n.is_f64()) {
        if f.fract() == 0.0 {
            if f >= 0.0 && f <= u64::MAX as f64 {
                return Number::from(f as u64);
            }
            if f >= i64::MIN as f64 && f < 0.0 {
                return Number::from(f as i64);
            }
        }
    }
    n.clone()
}

impl Identifier {
    /// Read an identifier out of a JSON scalar. Anything but a number or a
    /// string has no identifier.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Identifier::Number(canonical(n))),
            Value::String(s) => Some(Identifier::String(s.clone())),
            _ => None,
        }
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Identifier::Number(a), Identifier::Number(b)) => canonical(a) == canonical(b),
            (Identifier::String(a), Identifier::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Identifier::Number(n) => {
                0u8.hash(state);
                canonical(n).hash(state);
            }
            Identifier::String(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Identifier::Number(n) => n.serialize(serializer),
            Identifier::String(s) => serializer.serialize_str(s),
        }
    }
}

impl TryFrom<Value> for Identifier {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Identifier::from_value(&value)
            .ok_or_else(|| format!("identifier must be a number or a string, got {value}"))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Number(n) => write!(f, "{n}"),
            Identifier::String(s) => f.write_str(s),
        }
    }
}

macro_rules! impl_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Identifier {
                fn from(n: $t) -> Self {
                    Identifier::Number(Number::from(n))
                }
            }
        )*
    };
}

impl_from_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Integral values become integer identifiers. Non-finite values have no
/// JSON number form and fall back to their string rendering.
impl From<f64> for Identifier {
    fn from(n: f64) -> Self {
        match Number::from_f64(n) {
            Some(number) => Identifier::Number(canonical(&number)),
            None => Identifier::String(n.to_string()),
        }
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier::String(s.to_string())
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Identifier::String(s)
    }
}

impl From<&Identifier> for Identifier {
    fn from(id: &Identifier) -> Self {
        id.clone()
    }
}

/// Resolves which field of a record is its identifier.
///
/// The field is fixed at construction time. `IdentifierPolicy::default()`
/// uses [`DEFAULT_ID_KEY`]; deserialising a policy without a `id_key` field
/// falls back to the same default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierPolicy {
    id_key: String,
}

impl Default for IdentifierPolicy {
    fn default() -> Self {
        Self {
            id_key: DEFAULT_ID_KEY.to_string(),
        }
    }
}

impl IdentifierPolicy {
    /// Use `id_key` as the identifier field.
    pub fn new(id_key: impl Into<String>) -> Self {
        Self {
            id_key: id_key.into(),
        }
    }

    /// The resolved identifier field name.
    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    /// Extract the identifier of an already-serialised record or patch.
    pub fn extract_value(&self, value: &Value) -> Option<Identifier> {
        value.get(&self.id_key).and_then(Identifier::from_value)
    }

    /// Extract the identifier of a record.
    ///
    /// Returns `None` when the record does not serialise to an object or the
    /// field is missing or not a scalar. Such records never match an
    /// identifier.
    pub fn extract<T: Serialize>(&self, record: &T) -> Option<Identifier> {
        serde_json::to_value(record)
            .ok()
            .and_then(|value| self.extract_value(&value))
    }

    /// Value equality between identifiers.
    pub fn equals(&self, a: &Identifier, b: &Identifier) -> bool {
        a == b
    }

    /// Whether `record` carries identifier `id`.
    pub fn matches<T: Serialize>(&self, record: &T, id: &Identifier) -> bool {
        self.extract(record)
            .is_some_and(|own| self.equals(&own, id))
    }
}
