//! # Canonical Serialization — Deterministic Byte Production
//!
//! This module defines `CanonicalBytes`, the sole construction path for
//! bytes used in digest computation across the attestation stack: package
//! digests, proof bytes, anchor notes, and receipt signatures are all
//! defined over canonical bytes.
//!
//! ## Security Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only way to
//! construct it is through `CanonicalBytes::new()`, which validates the
//! value tree (float rejection) before serializing with recursively sorted
//! keys and compact separators. Any function requiring canonical bytes for
//! digest computation must accept `&CanonicalBytes`, so the "wrong
//! serialization path" defect class is structurally impossible.
//!
//! ## Canonical form
//!
//! - Object keys sorted ascending (byte order) at every depth.
//! - Arrays preserve element order.
//! - No insignificant whitespace.
//! - Strings escaped per RFC 8259.
//! - Numbers are integers only; floats are rejected at construction.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by canonical serialization.
///
/// # Invariants
///
/// - The only constructors are `CanonicalBytes::new()` and
///   `CanonicalBytes::from_value()`.
/// - All object keys are sorted recursively; separators are compact.
/// - No float ever reaches the serializer.
///
/// These invariants are enforced by the constructors and cannot be violated
/// by downstream code because the inner `Vec<u8>` is private.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// This is the ONLY way to produce bytes for digest computation.
    /// All digest computation in the stack must flow through here.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-built JSON value.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        reject_floats(&value)?;
        // serde_json::Map is BTreeMap-backed (the `preserve_order` feature
        // is not enabled anywhere in this workspace), so object keys are
        // sorted recursively and `to_string` emits compact separators.
        let bytes = serde_json::to_string(&value)?.into_bytes();
        Ok(Self(bytes))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes of the canonical form.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the canonical form is empty (never the case for
    /// a serialized JSON value, but callers may check).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Walk a JSON value and reject any float.
///
/// Canonical payloads in this stack are float-free by construction
/// (digests, identifiers, counts, ISO-8601 strings). A float would make
/// the shortest-round-trip rendering a cross-implementation hazard, so it
/// is refused outright.
fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Object(map) => {
            for v in map.values() {
                reject_floats(v)?;
            }
            Ok(())
        }
        Value::Array(arr) => {
            for v in arr {
                reject_floats(v)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn canonical_bytes_simple() {
        let mut data = BTreeMap::new();
        data.insert("b", 2);
        data.insert("a", 1);
        let cb = CanonicalBytes::new(&data).expect("should canonicalize");
        assert_eq!(cb.as_bytes(), br#"{"a":1,"b":2}"#);
    }

    #[test]
    fn keys_sorted_recursively() {
        let value = json!({"z": {"b": 1, "a": 2}, "a": [3, 1, 2]});
        let cb = CanonicalBytes::from_value(value).unwrap();
        assert_eq!(
            std::str::from_utf8(cb.as_bytes()).unwrap(),
            r#"{"a":[3,1,2],"z":{"a":2,"b":1}}"#
        );
    }

    #[test]
    fn array_order_preserved() {
        let cb = CanonicalBytes::from_value(json!(["c", "a", "b"])).unwrap();
        assert_eq!(cb.as_bytes(), br#"["c","a","b"]"#);
    }

    #[test]
    fn float_rejection() {
        let result = CanonicalBytes::from_value(json!({"amount": 1.5}));
        assert!(matches!(
            result,
            Err(CanonicalizationError::FloatRejected(_))
        ));
    }

    #[test]
    fn nested_float_rejection() {
        let result = CanonicalBytes::from_value(json!({"a": [{"b": 0.25}]}));
        assert!(result.is_err());
    }

    #[test]
    fn integers_pass() {
        let cb = CanonicalBytes::from_value(json!({"n": 42, "m": -7})).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"m":-7,"n":42}"#);
    }

    #[test]
    fn string_escaping_rfc8259() {
        let cb = CanonicalBytes::from_value(json!({"s": "a\"b\\c\n"})).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"s":"a\"b\\c\n"}"#);
    }

    #[test]
    fn round_trip_stability() {
        // canonical(parse(canonical(x))) == canonical(x)
        let value = json!({
            "protocol": "zkpa",
            "version": "1.1",
            "nested": {"z": null, "a": true, "list": [1, 2, 3]}
        });
        let first = CanonicalBytes::from_value(value).unwrap();
        let reparsed: Value = serde_json::from_slice(first.as_bytes()).unwrap();
        let second = CanonicalBytes::from_value(reparsed).unwrap();
        assert_eq!(first, second);
    }

    use proptest::prelude::*;

    /// Float-free JSON values of bounded depth, covering the shapes the
    /// package schema can produce.
    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| Value::Number(n.into())),
            "[a-zA-Z0-9_:/.-]{0,16}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_canonical_round_trip(value in arb_json()) {
            let first = CanonicalBytes::from_value(value).unwrap();
            let reparsed: Value = serde_json::from_slice(first.as_bytes()).unwrap();
            let second = CanonicalBytes::from_value(reparsed).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
