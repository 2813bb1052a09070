//! The ordered scalar family shared by every graph index key.
//!
//! [`TupleElement`] is the "tuple element" type from the data model: a closed
//! set of variable-typed scalars with a total order that downstream byte
//! encodings (see `kg-store::codec`) must preserve bit-for-bit.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single ordered scalar stored in a graph triple/quad position.
///
/// Variants are ordered by discriminant first (Nil < Bool < Int < Float <
/// Bytes < Str), then by value within a variant. This ordering is the
/// contract the key codec must reproduce in byte form.
#[derive(Debug, Clone, PartialEq)]
pub enum TupleElement {
    /// Absent value. Used only where the data model explicitly allows a
    /// sparse component (e.g. an unconfigured graph field).
    Nil,
    /// Boolean scalar.
    Bool(bool),
    /// Signed 64-bit integer scalar.
    Int(i64),
    /// IEEE-754 double. Never NaN — constructors reject it.
    Float(f64),
    /// Raw byte string, compared lexicographically.
    Bytes(Vec<u8>),
    /// UTF-8 string, compared lexicographically by byte value.
    Str(String),
}

impl TupleElement {
    /// Build a float element, rejecting NaN since NaN has no total order.
    pub fn float(v: f64) -> Result<Self, TupleElementError> {
        if v.is_nan() {
            return Err(TupleElementError::NotOrdered("NaN"));
        }
        Ok(TupleElement::Float(v))
    }

    /// Discriminant used for the primary sort key across variants.
    fn rank(&self) -> u8 {
        match self {
            TupleElement::Nil => 0,
            TupleElement::Bool(_) => 1,
            TupleElement::Int(_) => 2,
            TupleElement::Float(_) => 3,
            TupleElement::Bytes(_) => 4,
            TupleElement::Str(_) => 5,
        }
    }

    /// True if this element represents the sparse-index "absent" marker.
    pub fn is_nil(&self) -> bool {
        matches!(self, TupleElement::Nil)
    }
}

impl From<&str> for TupleElement {
    fn from(s: &str) -> Self {
        TupleElement::Str(s.to_string())
    }
}

impl From<String> for TupleElement {
    fn from(s: String) -> Self {
        TupleElement::Str(s)
    }
}

impl From<i64> for TupleElement {
    fn from(v: i64) -> Self {
        TupleElement::Int(v)
    }
}

impl From<bool> for TupleElement {
    fn from(v: bool) -> Self {
        TupleElement::Bool(v)
    }
}

impl From<Vec<u8>> for TupleElement {
    fn from(v: Vec<u8>) -> Self {
        TupleElement::Bytes(v)
    }
}

impl Eq for TupleElement {}

impl Hash for TupleElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            TupleElement::Nil => {}
            TupleElement::Bool(b) => b.hash(state),
            TupleElement::Int(i) => i.hash(state),
            // `0.0 == -0.0` under the derived `PartialEq`/the `Ord` impl
            // below (both defer to `f64::partial_cmp`); normalize the sign
            // bit so equal values always hash equally.
            TupleElement::Float(f) => {
                let bits = if *f == 0.0 { 0.0f64.to_bits() } else { f.to_bits() };
                bits.hash(state);
            }
            TupleElement::Bytes(b) => b.hash(state),
            TupleElement::Str(s) => s.hash(state),
        }
    }
}

impl PartialOrd for TupleElement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TupleElement {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (TupleElement::Nil, TupleElement::Nil) => Ordering::Equal,
            (TupleElement::Bool(a), TupleElement::Bool(b)) => a.cmp(b),
            (TupleElement::Int(a), TupleElement::Int(b)) => a.cmp(b),
            (TupleElement::Float(a), TupleElement::Float(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (TupleElement::Bytes(a), TupleElement::Bytes(b)) => a.cmp(b),
            (TupleElement::Str(a), TupleElement::Str(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for TupleElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TupleElement::Nil => write!(f, "nil"),
            TupleElement::Bool(b) => write!(f, "{b}"),
            TupleElement::Int(i) => write!(f, "{i}"),
            TupleElement::Float(v) => write!(f, "{v}"),
            TupleElement::Bytes(b) => write!(f, "0x{}", hex(b)),
            TupleElement::Str(s) => write!(f, "{s:?}"),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// An ordered list of [`TupleElement`]s — the unit the key codec packs.
pub type Tuple = Vec<TupleElement>;

/// Errors raised constructing or validating tuple elements.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TupleElementError {
    /// The value has no well-defined total order (e.g. NaN floats).
    #[error("value is not totally ordered: {0}")]
    NotOrdered(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_by_variant_then_value() {
        assert!(TupleElement::Nil < TupleElement::Bool(false));
        assert!(TupleElement::Bool(true) < TupleElement::Int(-1000));
        assert!(TupleElement::Int(5) < TupleElement::Float(0.0));
        assert!(TupleElement::Float(1e9) < TupleElement::Bytes(vec![0]));
        assert!(TupleElement::Bytes(vec![255]) < TupleElement::Str(String::new()));
    }

    #[test]
    fn string_ordering_is_lexicographic() {
        let a = TupleElement::from("alpha");
        let b = TupleElement::from("beta");
        assert!(a < b);
    }

    #[test]
    fn nan_is_rejected() {
        assert!(TupleElement::float(f64::NAN).is_err());
        assert!(TupleElement::float(1.5).is_ok());
    }

    fn hash_of(e: &TupleElement) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut h = DefaultHasher::new();
        e.hash(&mut h);
        h.finish()
    }

    #[test]
    fn equal_values_hash_equally() {
        assert_eq!(hash_of(&TupleElement::from("a")), hash_of(&TupleElement::from("a")));
        assert_eq!(hash_of(&TupleElement::Int(7)), hash_of(&TupleElement::Int(7)));
        assert_eq!(hash_of(&TupleElement::Float(0.0)), hash_of(&TupleElement::Float(-0.0)));
    }
}
