//! Order-preserving tuple codec and byte-prefixed subspaces.
//!
//! `pack`/`unpack` are pure functions: for any two tuples `t1`, `t2`,
//! `pack(t1) < pack(t2)` (lexicographic on bytes) iff `t1 < t2`
//! (component-wise, per [`TupleElement`]'s declared ordering).
//!
//! ## Encoding scheme
//!
//! Every element is prefixed with a one-byte type tag chosen so tag order
//! matches [`TupleElement`]'s variant order (`Nil < Bool < Int < Float <
//! Bytes < Str`):
//!
//! - `Nil`: tag only, no payload.
//! - `Bool`: tag + one byte (`0x00`/`0x01`).
//! - `Int`: tag + 8 big-endian bytes of `(value as u64) ^ SIGN_BIT`. Flipping
//!   the sign bit turns two's-complement ordering into unsigned byte-order.
//! - `Float`: tag + 8 big-endian bytes of a monotonic transform (flip all
//!   bits if negative, else flip only the sign bit) — the standard
//!   order-preserving transform for IEEE-754 doubles without NaN.
//! - `Bytes`/`Str`: tag + escaped payload + terminator. Every `0x00` byte in
//!   the payload is escaped as `0x00 0xFF`; the payload ends with `0x00
//!   0x00`. This keeps the encoding prefix-free under naive byte comparison:
//!   a shorter string never looks like a prefix-match of a longer one
//!   because the terminator sorts before the escape continuation.
//!
//! A [`Subspace`] is a byte prefix plus helpers to pack/unpack tuples inside
//! it and to derive child subspaces (one per index ordering, see
//! `kg_store::strategy`).

use kg_model::{Tuple, TupleElement};
use thiserror::Error;

const TAG_NIL: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_FLOAT: u8 = 0x03;
const TAG_BYTES: u8 = 0x04;
const TAG_STR: u8 = 0x05;

const ESCAPE: u8 = 0x00;
const ESCAPE_CONTINUE: u8 = 0xFF;
const ESCAPE_END: u8 = 0x00;

const SIGN_BIT: u64 = 1 << 63;

/// Errors raised unpacking a key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The key does not start with the subspace's prefix.
    #[error("key does not belong to this subspace")]
    KeyOutsideSubspace,
    /// The key's tuple encoding is truncated or contains an unknown tag.
    #[error("malformed tuple encoding: {0}")]
    MalformedTuple(&'static str),
}

/// Pack a single element in order-preserving form.
fn pack_element(buf: &mut Vec<u8>, elem: &TupleElement) {
    match elem {
        TupleElement::Nil => buf.push(TAG_NIL),
        TupleElement::Bool(b) => {
            buf.push(TAG_BOOL);
            buf.push(if *b { 1 } else { 0 });
        }
        TupleElement::Int(i) => {
            buf.push(TAG_INT);
            let encoded = (*i as u64) ^ SIGN_BIT;
            buf.extend_from_slice(&encoded.to_be_bytes());
        }
        TupleElement::Float(f) => {
            buf.push(TAG_FLOAT);
            let bits = f.to_bits();
            let transformed = if bits & SIGN_BIT != 0 { !bits } else { bits | SIGN_BIT };
            buf.extend_from_slice(&transformed.to_be_bytes());
        }
        TupleElement::Bytes(b) => {
            buf.push(TAG_BYTES);
            pack_escaped(buf, b);
        }
        TupleElement::Str(s) => {
            buf.push(TAG_STR);
            pack_escaped(buf, s.as_bytes());
        }
    }
}

fn pack_escaped(buf: &mut Vec<u8>, data: &[u8]) {
    for &byte in data {
        if byte == ESCAPE {
            buf.push(ESCAPE);
            buf.push(ESCAPE_CONTINUE);
        } else {
            buf.push(byte);
        }
    }
    buf.push(ESCAPE);
    buf.push(ESCAPE_END);
}

/// Pack a full tuple into order-preserving bytes.
pub fn pack(tuple: &[TupleElement]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(tuple.len() * 9);
    for elem in tuple {
        pack_element(&mut buf, elem);
    }
    buf
}

/// Unpack a full tuple from order-preserving bytes.
pub fn unpack(mut bytes: &[u8]) -> Result<Tuple, CodecError> {
    let mut out = Tuple::new();
    while !bytes.is_empty() {
        let (elem, rest) = unpack_element(bytes)?;
        out.push(elem);
        bytes = rest;
    }
    Ok(out)
}

fn unpack_element(bytes: &[u8]) -> Result<(TupleElement, &[u8]), CodecError> {
    let (&tag, rest) = bytes
        .split_first()
        .ok_or(CodecError::MalformedTuple("empty input"))?;
    match tag {
        TAG_NIL => Ok((TupleElement::Nil, rest)),
        TAG_BOOL => {
            let (&b, rest) = rest
                .split_first()
                .ok_or(CodecError::MalformedTuple("truncated bool"))?;
            Ok((TupleElement::Bool(b != 0), rest))
        }
        TAG_INT => {
            if rest.len() < 8 {
                return Err(CodecError::MalformedTuple("truncated int"));
            }
            let (head, tail) = rest.split_at(8);
            let bits = u64::from_be_bytes(head.try_into().unwrap());
            let value = (bits ^ SIGN_BIT) as i64;
            Ok((TupleElement::Int(value), tail))
        }
        TAG_FLOAT => {
            if rest.len() < 8 {
                return Err(CodecError::MalformedTuple("truncated float"));
            }
            let (head, tail) = rest.split_at(8);
            let transformed = u64::from_be_bytes(head.try_into().unwrap());
            let bits = if transformed & SIGN_BIT != 0 {
                transformed & !SIGN_BIT
            } else {
                !transformed
            };
            Ok((TupleElement::Float(f64::from_bits(bits)), tail))
        }
        TAG_BYTES => {
            let (data, tail) = unpack_escaped(rest)?;
            Ok((TupleElement::Bytes(data), tail))
        }
        TAG_STR => {
            let (data, tail) = unpack_escaped(rest)?;
            let s = String::from_utf8(data)
                .map_err(|_| CodecError::MalformedTuple("invalid utf-8 in string element"))?;
            Ok((TupleElement::Str(s), tail))
        }
        _ => Err(CodecError::MalformedTuple("unknown type tag")),
    }
}

fn unpack_escaped(mut bytes: &[u8]) -> Result<(Vec<u8>, &[u8]), CodecError> {
    let mut out = Vec::new();
    loop {
        let pos = bytes
            .iter()
            .position(|&b| b == ESCAPE)
            .ok_or(CodecError::MalformedTuple("unterminated string/bytes"))?;
        out.extend_from_slice(&bytes[..pos]);
        let marker = *bytes
            .get(pos + 1)
            .ok_or(CodecError::MalformedTuple("truncated escape sequence"))?;
        match marker {
            ESCAPE_CONTINUE => {
                out.push(ESCAPE);
                bytes = &bytes[pos + 2..];
            }
            ESCAPE_END => {
                bytes = &bytes[pos + 2..];
                return Ok((out, bytes));
            }
            _ => return Err(CodecError::MalformedTuple("invalid escape marker")),
        }
    }
}

/// A byte-prefixed namespace inside the KV store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subspace {
    prefix: Vec<u8>,
}

impl Subspace {
    /// A subspace rooted at an arbitrary byte prefix.
    pub fn new(prefix: impl Into<Vec<u8>>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// The raw prefix bytes.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Derive a child subspace by appending a small integer component
    /// (the ordering's index).
    pub fn child(&self, index: u8) -> Subspace {
        let mut prefix = self.prefix.clone();
        prefix.push(index);
        Subspace { prefix }
    }

    /// Pack a tuple into a key inside this subspace.
    pub fn pack(&self, tuple: &[TupleElement]) -> Vec<u8> {
        let mut key = self.prefix.clone();
        key.extend(pack(tuple));
        key
    }

    /// Unpack a key, stripping this subspace's prefix.
    pub fn unpack(&self, key: &[u8]) -> Result<Tuple, CodecError> {
        let rest = key
            .strip_prefix(self.prefix.as_slice())
            .ok_or(CodecError::KeyOutsideSubspace)?;
        unpack(rest)
    }

    /// The contiguous `[begin, end)` range covering every key in this
    /// subspace.
    pub fn range(&self) -> (Vec<u8>, Vec<u8>) {
        let begin = self.prefix.clone();
        let mut end = self.prefix.clone();
        increment(&mut end);
        (begin, end)
    }

    /// The `[begin, end)` range covering keys whose tuple starts with the
    /// given prefix of elements — used by the scanner to scan a bound
    /// prefix of an ordering without materializing an upper bound by hand.
    pub fn range_for_prefix(&self, prefix_tuple: &[TupleElement]) -> (Vec<u8>, Vec<u8>) {
        let begin = self.pack(prefix_tuple);
        let mut end = begin.clone();
        increment(&mut end);
        (begin, end)
    }
}

/// Smallest byte string strictly greater than every string with `bytes` as a
/// prefix: increment the last byte that isn't already `0xFF`, truncating the
/// trailing run of `0xFF`s. Used to turn a prefix into an exclusive end key.
fn increment(bytes: &mut Vec<u8>) {
    while let Some(&last) = bytes.last() {
        if last == 0xFF {
            bytes.pop();
        } else {
            *bytes.last_mut().unwrap() += 1;
            return;
        }
    }
    // All bytes were 0xFF (or prefix empty): no finite successor exists in a
    // bounded keyspace; callers treat an empty end key as "no upper bound".
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_model::TupleElement as E;
    use proptest::prelude::*;

    #[test]
    fn round_trip_mixed_tuple() {
        let tuple: Tuple = vec![
            E::Str("hello".into()),
            E::Int(-42),
            E::Float(3.25),
            E::Bool(true),
            E::Bytes(vec![1, 0, 2]),
            E::Nil,
        ];
        let packed = pack(&tuple);
        let unpacked = unpack(&packed).unwrap();
        assert_eq!(tuple, unpacked);
    }

    #[test]
    fn int_ordering_is_preserved_in_bytes() {
        let a = pack(&[E::Int(-100)]);
        let b = pack(&[E::Int(5)]);
        let c = pack(&[E::Int(1_000_000)]);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn float_ordering_is_preserved_in_bytes() {
        let a = pack(&[E::Float(-5.5)]);
        let b = pack(&[E::Float(-0.1)]);
        let c = pack(&[E::Float(0.0)]);
        let d = pack(&[E::Float(2.0)]);
        assert!(a < b && b < c && c < d);
    }

    #[test]
    fn string_ordering_is_preserved_and_prefix_free() {
        let short = pack(&[E::Str("ab".into())]);
        let long = pack(&[E::Str("abc".into())]);
        assert!(short < long, "shorter string must sort before its extension");

        let with_nul = pack(&[E::Bytes(vec![1, 0, 2])]);
        let without = pack(&[E::Bytes(vec![1])]);
        assert!(without < with_nul);
    }

    #[test]
    fn subspace_unpack_rejects_foreign_prefix() {
        let sub = Subspace::new(vec![1, 2, 3]);
        let key = Subspace::new(vec![9, 9, 9]).pack(&[E::Int(1)]);
        assert_eq!(sub.unpack(&key), Err(CodecError::KeyOutsideSubspace));
    }

    #[test]
    fn subspace_child_appends_ordering_index() {
        let root = Subspace::new(vec![0xAB]);
        let child = root.child(2);
        assert_eq!(child.prefix(), &[0xAB, 2]);
    }

    #[test]
    fn subspace_range_is_contiguous() {
        let sub = Subspace::new(vec![5]);
        let (begin, end) = sub.range();
        assert_eq!(begin, vec![5]);
        assert_eq!(end, vec![6]);

        let key_in_range = sub.pack(&[E::Int(0)]);
        assert!(key_in_range >= begin && key_in_range < end);
    }

    proptest! {
        #[test]
        fn prop_round_trip_any_tuple(
            elems in proptest::collection::vec(arb_element(), 0..6)
        ) {
            let packed = pack(&elems);
            let unpacked = unpack(&packed).unwrap();
            prop_assert_eq!(elems, unpacked);
        }

        #[test]
        fn prop_ordering_matches_pack(a in arb_element(), b in arb_element()) {
            let pa = pack(&[a.clone()]);
            let pb = pack(&[b.clone()]);
            prop_assert_eq!(a.cmp(&b), pa.cmp(&pb));
        }
    }

    fn arb_element() -> impl Strategy<Value = TupleElement> {
        prop_oneof![
            Just(E::Nil),
            any::<bool>().prop_map(E::Bool),
            any::<i64>().prop_map(E::Int),
            (-1e6f64..1e6f64).prop_map(E::Float),
            proptest::collection::vec(any::<u8>(), 0..12).prop_map(E::Bytes),
            "[a-zA-Z0-9]{0,12}".prop_map(E::Str),
        ]
    }
}
