//! MeshCoP TLV codec.
//!
//! Wire format: `type(1) | length(1 or 3) | value(length)`. A length whose
//! first byte is `0xFF` is followed by a big-endian `u16` giving the true
//! length; that extended form is only canonical for lengths `>= 0xFF`
//! (255). Any other encoding is rejected — see [`decode`].

use crate::{Result, TlvError};

/// Length threshold above which the extended (3-byte) length form is used.
const EXTENDED_LENGTH_MARKER: u8 = 0xFF;
/// Smallest length value for which the extended form is canonical.
const EXTENDED_LENGTH_MIN: usize = 0xFF;

/// A single TLV record: an 8-bit type and an opaque value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tlv {
    pub tlv_type: u8,
    pub value: Vec<u8>,
}

impl Tlv {
    pub fn new(tlv_type: u8, value: impl Into<Vec<u8>>) -> Self {
        Self {
            tlv_type,
            value: value.into(),
        }
    }

    /// Append this TLV's wire encoding to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TooLong`] if the value exceeds the 16-bit length
    /// field (65535 bytes) the extended form can express.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        let len = self.value.len();
        if len > u16::MAX as usize {
            return Err(TlvError::TooLong(format!(
                "TLV type {} has length {len}, exceeds 65535",
                self.tlv_type
            )));
        }
        out.push(self.tlv_type);
        if len < EXTENDED_LENGTH_MIN {
            out.push(len as u8);
        } else {
            out.push(EXTENDED_LENGTH_MARKER);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
        out.extend_from_slice(&self.value);
        Ok(())
    }
}

/// An ordered collection of TLVs as they appear on the wire.
///
/// Insertion order is preserved and duplicate types are permitted — some
/// MeshCoP fields (e.g. Channel Mask entries) are legitimately repeated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TlvSet(Vec<Tlv>);

impl TlvSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, tlv: Tlv) -> &mut Self {
        self.0.push(tlv);
        self
    }

    pub fn with(mut self, tlv: Tlv) -> Self {
        self.0.push(tlv);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tlv> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return the first TLV of the given type, if present.
    pub fn get(&self, tlv_type: u8) -> Option<&Tlv> {
        self.0.iter().find(|t| t.tlv_type == tlv_type)
    }

    /// Return all TLVs of the given type, in wire order.
    pub fn get_all(&self, tlv_type: u8) -> impl Iterator<Item = &Tlv> {
        self.0.iter().filter(move |t| t.tlv_type == tlv_type)
    }

    /// Return a copy of this set with its TLVs stably sorted by type.
    ///
    /// Used by the token manager's signing-content canonicalization, which
    /// requires the result to be invariant under reordering of the input.
    pub fn sorted_by_type(&self) -> Self {
        let mut sorted = self.0.clone();
        sorted.sort_by_key(|t| t.tlv_type);
        Self(sorted)
    }

    /// Return a copy retaining only TLVs whose type passes `predicate`.
    pub fn filter(&self, predicate: impl Fn(u8) -> bool) -> Self {
        Self(
            self.0
                .iter()
                .filter(|t| predicate(t.tlv_type))
                .cloned()
                .collect(),
        )
    }

    /// Encode every TLV in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TooLong`] if any value exceeds the protocol
    /// maximum for its length field.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for tlv in &self.0 {
            tlv.encode_into(&mut out)?;
        }
        Ok(out)
    }

    /// Decode a TLV stream, consuming it until exhaustion.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::Truncated`] if a length or value is cut short,
    /// and [`TlvError::NonCanonical`] if a length uses the extended form
    /// for a value that fits in the short form (or vice versa).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut tlvs = Vec::new();
        let mut cursor = 0usize;

        while cursor < bytes.len() {
            let tlv_type = bytes[cursor];
            cursor += 1;

            let first_len_byte = *bytes.get(cursor).ok_or_else(|| {
                TlvError::Truncated(format!("type {tlv_type} has no length byte"))
            })?;
            cursor += 1;

            let length = if first_len_byte == EXTENDED_LENGTH_MARKER {
                let len_bytes = bytes.get(cursor..cursor + 2).ok_or_else(|| {
                    TlvError::Truncated(format!(
                        "type {tlv_type} extended length truncated"
                    ))
                })?;
                cursor += 2;
                let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
                if len < EXTENDED_LENGTH_MIN {
                    return Err(TlvError::NonCanonical(format!(
                        "type {tlv_type} used extended length form for value {len} < 255"
                    )));
                }
                len
            } else {
                first_len_byte as usize
            };

            let value = bytes
                .get(cursor..cursor + length)
                .ok_or_else(|| {
                    TlvError::Truncated(format!(
                        "type {tlv_type} value truncated: need {length} bytes"
                    ))
                })?
                .to_vec();
            cursor += length;

            tlvs.push(Tlv { tlv_type, value });
        }

        Ok(Self(tlvs))
    }

    /// Decode in strict mode: fail if any decoded type is not present in
    /// `allowed`.
    pub fn decode_strict(bytes: &[u8], allowed: &[u8]) -> Result<Self> {
        let set = Self::decode(bytes)?;
        for tlv in &set.0 {
            if !allowed.contains(&tlv.tlv_type) {
                return Err(TlvError::UnexpectedType(tlv.tlv_type));
            }
        }
        Ok(set)
    }
}

impl IntoIterator for TlvSet {
    type Item = Tlv;
    type IntoIter = std::vec::IntoIter<Tlv>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Tlv> for TlvSet {
    fn from_iter<I: IntoIterator<Item = Tlv>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_short_form() {
        let set = TlvSet::new()
            .with(Tlv::new(10, b"OT-Commissioner".to_vec()))
            .with(Tlv::new(16, vec![0x01]));
        let encoded = set.encode().expect("encode");
        let decoded = TlvSet::decode(&encoded).expect("decode");
        assert_eq!(set, decoded);
    }

    #[test]
    fn roundtrip_extended_form() {
        let long_value = vec![0xAB; 300];
        let set = TlvSet::new().with(Tlv::new(30, long_value));
        let encoded = set.encode().expect("encode");
        // type + 0xFF marker + 2-byte length
        assert_eq!(encoded[1], 0xFF);
        let decoded = TlvSet::decode(&encoded).expect("decode");
        assert_eq!(set, decoded);
    }

    #[test]
    fn short_form_boundary_254_is_canonical() {
        let set = TlvSet::new().with(Tlv::new(1, vec![0u8; 254]));
        let encoded = set.encode().expect("encode");
        assert_eq!(encoded[1], 254);
        assert_eq!(TlvSet::decode(&encoded).expect("decode"), set);
    }

    #[test]
    fn non_canonical_extended_length_rejected() {
        // type=1, length marker 0xFF, extended length = 0 (must use short form)
        let bytes = [1u8, 0xFF, 0x00, 0x00];
        let err = TlvSet::decode(&bytes).expect_err("must reject");
        assert!(matches!(err, TlvError::NonCanonical(_)));
    }

    #[test]
    fn non_canonical_extended_length_254_rejected() {
        let bytes = [1u8, 0xFF, 0x00, 0xFE];
        let err = TlvSet::decode(&bytes).expect_err("must reject");
        assert!(matches!(err, TlvError::NonCanonical(_)));
    }

    #[test]
    fn truncated_length_byte_rejected() {
        let bytes = [1u8];
        let err = TlvSet::decode(&bytes).expect_err("must reject");
        assert!(matches!(err, TlvError::Truncated(_)));
    }

    #[test]
    fn truncated_value_rejected() {
        let bytes = [1u8, 5, 0, 1]; // claims 5 bytes, only 2 present
        let err = TlvSet::decode(&bytes).expect_err("must reject");
        assert!(matches!(err, TlvError::Truncated(_)));
    }

    #[test]
    fn duplicate_types_preserved_in_order() {
        let set = TlvSet::new()
            .with(Tlv::new(53, vec![0x00]))
            .with(Tlv::new(53, vec![0x01]));
        let all: Vec<_> = set.get_all(53).collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].value, vec![0x00]);
        assert_eq!(all[1].value, vec![0x01]);
    }

    #[test]
    fn sorted_by_type_is_stable_and_order_independent() {
        let a = TlvSet::new()
            .with(Tlv::new(10, vec![1]))
            .with(Tlv::new(2, vec![2]))
            .with(Tlv::new(5, vec![3]));
        let b = TlvSet::new()
            .with(Tlv::new(5, vec![3]))
            .with(Tlv::new(10, vec![1]))
            .with(Tlv::new(2, vec![2]));
        assert_eq!(a.sorted_by_type(), b.sorted_by_type());
    }

    #[test]
    fn decode_strict_rejects_unknown_type() {
        let set = TlvSet::new().with(Tlv::new(99, vec![1]));
        let encoded = set.encode().expect("encode");
        let err = TlvSet::decode_strict(&encoded, &[1, 2, 3]).expect_err("must reject");
        assert!(matches!(err, TlvError::UnexpectedType(99)));
    }
}
