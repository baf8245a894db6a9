//! `JoinerHandler`: the application-facing callback surface for the joiner
//! pool, mirroring `commissioner_session::SessionHandler`'s plain-trait
//! style (no `async fn` in traits, no serialization machinery at this
//! layer — the facade is responsible for serializing handler dispatch
//! across both the session and the joiner pool, per spec §4.7).

use commissioner_types::ids::JoinerId;
use commissioner_types::meshcop;
use commissioner_types::tlv::TlvSet;

/// Vendor fields a joiner presents at `JOIN_FIN`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VendorInfo {
    pub vendor_name: Option<String>,
    pub vendor_model: Option<String>,
    pub vendor_sw_version: Option<String>,
    pub vendor_stack_version: Option<Vec<u8>>,
    pub vendor_data: Option<Vec<u8>>,
    pub provisioning_url: Option<String>,
}

impl VendorInfo {
    /// Extract vendor fields from a decoded `JOIN_FIN.req` TLV set. Fields
    /// that fail UTF-8 decoding are dropped rather than rejecting the whole
    /// finalize — a malformed vendor string shouldn't block admission.
    pub fn from_tlvs(tlvs: &TlvSet) -> Self {
        let text = |tlv_type: u8| {
            tlvs.get(tlv_type)
                .and_then(|tlv| String::from_utf8(tlv.value.clone()).ok())
        };
        Self {
            vendor_name: text(meshcop::VENDOR_NAME),
            vendor_model: text(meshcop::VENDOR_MODEL),
            vendor_sw_version: text(meshcop::VENDOR_SW_VERSION),
            vendor_stack_version: tlvs.get(meshcop::VENDOR_STACK_VERSION).map(|t| t.value.clone()),
            vendor_data: tlvs.get(meshcop::VENDOR_DATA).map(|t| t.value.clone()),
            provisioning_url: text(meshcop::PROVISIONING_URL),
        }
    }
}

/// Callbacks the joiner pool invokes as relayed joiner sessions progress.
///
/// Implementations must not block: these run inline on whichever task is
/// driving the joiner's handshake, and a slow handler stalls that one
/// joiner's progress (it does not stall the commissioner session or other
/// joiners, since each runs on its own task).
pub trait JoinerHandler: Send + Sync {
    /// An unknown joiner id was admitted by steering data; look up its
    /// PSKd (e.g. from a provisioning list). Returning `None` rejects the
    /// joiner — the pool never creates a session for it.
    fn on_joiner_request(&self, joiner_id: JoinerId) -> Option<Vec<u8>>;

    /// The relayed DTLS handshake with this joiner completed.
    fn on_joiner_connected(&self, _joiner_id: JoinerId) {}

    /// `JOIN_FIN.req` arrived with the joiner's vendor fields. The return
    /// value becomes the `JOIN_FIN.rsp` State TLV (`true` = Accept).
    fn on_joiner_finalize(&self, joiner_id: JoinerId, vendor: &VendorInfo) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use commissioner_types::tlv::Tlv;

    #[test]
    fn vendor_info_extracts_present_fields_only() {
        let tlvs = TlvSet::new()
            .with(Tlv::new(meshcop::VENDOR_NAME, b"Acme".to_vec()))
            .with(Tlv::new(meshcop::VENDOR_MODEL, b"Widget".to_vec()));
        let vendor = VendorInfo::from_tlvs(&tlvs);
        assert_eq!(vendor.vendor_name.as_deref(), Some("Acme"));
        assert_eq!(vendor.vendor_model.as_deref(), Some("Widget"));
        assert!(vendor.vendor_sw_version.is_none());
    }

    #[test]
    fn non_utf8_vendor_field_is_dropped_not_rejected() {
        let tlvs = TlvSet::new().with(Tlv::new(meshcop::VENDOR_NAME, vec![0xFF, 0xFE]));
        let vendor = VendorInfo::from_tlvs(&tlvs);
        assert!(vendor.vendor_name.is_none());
    }
}
