//! Canonical CBOR helpers.
//!
//! `ciborium` already emits definite-length containers and shortest-form
//! integers, so the only canonicalization left for RFC 8949 §4.2.1
//! determinism is map-key ordering: this module sorts integer-keyed map
//! entries ascending before handing the value to `ciborium`.

use ciborium::value::Value;

use crate::{CryptoError, Result};

/// Build a CBOR map from `(key, value)` pairs, sorting entries by integer
/// key so the encoding is canonical regardless of insertion order.
pub fn canonical_map(mut entries: Vec<(i64, Value)>) -> Value {
    entries.sort_by_key(|(k, _)| *k);
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (Value::Integer(k.into()), v))
            .collect(),
    )
}

/// Encode a CBOR value to its binary form.
pub fn to_vec(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out).map_err(|e| CryptoError::Cbor(e.to_string()))?;
    Ok(out)
}

/// Decode a CBOR value from its binary form.
pub fn from_slice(bytes: &[u8]) -> Result<Value> {
    ciborium::from_reader(bytes).map_err(|e| CryptoError::Cbor(e.to_string()))
}

/// Look up an integer key in a decoded CBOR map.
pub fn map_get<'a>(value: &'a Value, key: i64) -> Option<&'a Value> {
    value.as_map()?.iter().find_map(|(k, v)| {
        if k.as_integer() == Some(key.into()) {
            Some(v)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_map_sorts_keys_regardless_of_insertion_order() {
        let a = canonical_map(vec![(3, Value::Integer(1.into())), (1, Value::Integer(2.into()))]);
        let b = canonical_map(vec![(1, Value::Integer(2.into())), (3, Value::Integer(1.into()))]);
        assert_eq!(to_vec(&a).expect("encode"), to_vec(&b).expect("encode"));
    }

    #[test]
    fn roundtrip() {
        let value = canonical_map(vec![(1, Value::Text("iss".into()))]);
        let encoded = to_vec(&value).expect("encode");
        let decoded = from_slice(&encoded).expect("decode");
        assert_eq!(map_get(&decoded, 1), Some(&Value::Text("iss".into())));
    }
}
