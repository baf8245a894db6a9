//! Active, Pending, Commissioner, and BBR dataset structures.
//!
//! Each dataset is a sparse collection of MeshCoP TLVs: a device only
//! includes the fields it actually holds, and MGMT_*_GET responses may omit
//! fields the network has not set. `present` tracks which fields are valid
//! so callers can distinguish "absent" from "zero".

use crate::meshcop;
use crate::tlv::{Tlv, TlvSet};
use crate::{Result, TlvError};

bitflags::bitflags! {
    /// Presence bitmap mirroring the fields of [`ActiveDataset`] /
    /// [`PendingDataset`]. A bit is set if and only if the corresponding
    /// `Option` field is `Some`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DatasetFieldSet: u32 {
        const ACTIVE_TIMESTAMP          = 1 << 0;
        const CHANNEL                   = 1 << 1;
        const CHANNEL_MASK               = 1 << 2;
        const EXTENDED_PAN_ID            = 1 << 3;
        const MESH_LOCAL_PREFIX          = 1 << 4;
        const NETWORK_KEY                = 1 << 5;
        const NETWORK_NAME               = 1 << 6;
        const PAN_ID                     = 1 << 7;
        const PSKC                       = 1 << 8;
        const SECURITY_POLICY            = 1 << 9;
        const PENDING_TIMESTAMP          = 1 << 10;
        const DELAY_TIMER                = 1 << 11;
    }
}

/// Security Policy TLV: rotation time in hours and an 8-bit flag octet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SecurityPolicy {
    pub rotation_time: u16,
    pub flags: u8,
}

/// The Thread Active Operational Dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveDataset {
    pub present: DatasetFieldSet,
    pub active_timestamp: Option<u64>,
    pub channel: Option<u16>,
    pub channel_mask: Option<Vec<u8>>,
    pub extended_pan_id: Option<[u8; 8]>,
    pub mesh_local_prefix: Option<[u8; 8]>,
    pub network_key: Option<[u8; 16]>,
    pub network_name: Option<String>,
    pub pan_id: Option<u16>,
    pub pskc: Option<[u8; 16]>,
    pub security_policy: Option<SecurityPolicy>,
}

/// The Thread Pending Operational Dataset: an [`ActiveDataset`] plus the
/// delay timer and pending timestamp that govern when it takes effect.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingDataset {
    pub active: ActiveDataset,
    pub pending_timestamp: Option<u64>,
    pub delay_timer: Option<u32>,
}

/// The Commissioner Dataset: commissioner session id, border agent
/// locator, and steering data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommissionerDataset {
    pub border_agent_locator: Option<u16>,
    pub session_id: Option<u16>,
    pub steering_data: Option<Vec<u8>>,
}

/// The Backbone Border Router (BBR) Dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BbrDataset {
    pub sequence_number: Option<u8>,
    pub reregistration_delay: Option<u16>,
    pub mlr_timeout: Option<u32>,
}

impl ActiveDataset {
    /// Decode an Active Dataset from its wire-format TLV encoding.
    ///
    /// Unknown TLV types are ignored rather than rejected: an Active
    /// Dataset response may legitimately carry TLVs this decoder does not
    /// model (e.g. vendor TLVs), and dropping the whole dataset over one
    /// unrecognized field would be wrong.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let set = TlvSet::decode(bytes)?;
        let mut dataset = Self::default();

        for tlv in set.iter() {
            match tlv.tlv_type {
                meshcop::ACTIVE_TIMESTAMP => {
                    dataset.active_timestamp = Some(read_u64(tlv)?);
                    dataset.present.insert(DatasetFieldSet::ACTIVE_TIMESTAMP);
                }
                meshcop::CHANNEL => {
                    dataset.channel = Some(read_channel(tlv)?);
                    dataset.present.insert(DatasetFieldSet::CHANNEL);
                }
                meshcop::CHANNEL_MASK => {
                    dataset.channel_mask = Some(tlv.value.clone());
                    dataset.present.insert(DatasetFieldSet::CHANNEL_MASK);
                }
                meshcop::EXTENDED_PAN_ID => {
                    dataset.extended_pan_id = Some(read_array::<8>(tlv)?);
                    dataset.present.insert(DatasetFieldSet::EXTENDED_PAN_ID);
                }
                meshcop::NETWORK_MESH_LOCAL_PREFIX => {
                    dataset.mesh_local_prefix = Some(read_array::<8>(tlv)?);
                    dataset.present.insert(DatasetFieldSet::MESH_LOCAL_PREFIX);
                }
                meshcop::NETWORK_KEY => {
                    dataset.network_key = Some(read_array::<16>(tlv)?);
                    dataset.present.insert(DatasetFieldSet::NETWORK_KEY);
                }
                meshcop::NETWORK_NAME => {
                    dataset.network_name = Some(read_utf8(tlv)?);
                    dataset.present.insert(DatasetFieldSet::NETWORK_NAME);
                }
                meshcop::PAN_ID => {
                    dataset.pan_id = Some(read_u16(tlv)?);
                    dataset.present.insert(DatasetFieldSet::PAN_ID);
                }
                meshcop::PSKC => {
                    dataset.pskc = Some(read_array::<16>(tlv)?);
                    dataset.present.insert(DatasetFieldSet::PSKC);
                }
                meshcop::SECURITY_POLICY => {
                    dataset.security_policy = Some(read_security_policy(tlv)?);
                    dataset.present.insert(DatasetFieldSet::SECURITY_POLICY);
                }
                _ => {}
            }
        }

        Ok(dataset)
    }

    /// Encode this dataset back to its wire-format TLV form, emitting only
    /// the fields marked present.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut set = TlvSet::new();

        if let Some(v) = self.active_timestamp {
            set.push(Tlv::new(meshcop::ACTIVE_TIMESTAMP, v.to_be_bytes().to_vec()));
        }
        if let Some(v) = self.channel {
            set.push(Tlv::new(meshcop::CHANNEL, encode_channel(v)));
        }
        if let Some(v) = &self.channel_mask {
            set.push(Tlv::new(meshcop::CHANNEL_MASK, v.clone()));
        }
        if let Some(v) = self.extended_pan_id {
            set.push(Tlv::new(meshcop::EXTENDED_PAN_ID, v.to_vec()));
        }
        if let Some(v) = self.mesh_local_prefix {
            set.push(Tlv::new(meshcop::NETWORK_MESH_LOCAL_PREFIX, v.to_vec()));
        }
        if let Some(v) = self.network_key {
            set.push(Tlv::new(meshcop::NETWORK_KEY, v.to_vec()));
        }
        if let Some(v) = &self.network_name {
            set.push(Tlv::new(meshcop::NETWORK_NAME, v.as_bytes().to_vec()));
        }
        if let Some(v) = self.pan_id {
            set.push(Tlv::new(meshcop::PAN_ID, v.to_be_bytes().to_vec()));
        }
        if let Some(v) = self.pskc {
            set.push(Tlv::new(meshcop::PSKC, v.to_vec()));
        }
        if let Some(policy) = &self.security_policy {
            let mut value = policy.rotation_time.to_be_bytes().to_vec();
            value.push(policy.flags);
            set.push(Tlv::new(meshcop::SECURITY_POLICY, value));
        }

        set.encode()
    }
}

impl PendingDataset {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let set = TlvSet::decode(bytes)?;
        let mut dataset = Self {
            active: ActiveDataset::decode(&set.encode()?)?,
            ..Default::default()
        };

        if let Some(tlv) = set.get(meshcop::PENDING_TIMESTAMP) {
            dataset.pending_timestamp = Some(read_u64(tlv)?);
            dataset
                .active
                .present
                .insert(DatasetFieldSet::PENDING_TIMESTAMP);
        }
        if let Some(tlv) = set.get(meshcop::DELAY_TIMER) {
            dataset.delay_timer = Some(read_u32(tlv)?);
            dataset.active.present.insert(DatasetFieldSet::DELAY_TIMER);
        }

        Ok(dataset)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = self.active.encode()?;
        if let Some(v) = self.pending_timestamp {
            Tlv::new(meshcop::PENDING_TIMESTAMP, v.to_be_bytes().to_vec()).encode_into(&mut out)?;
        }
        if let Some(v) = self.delay_timer {
            Tlv::new(meshcop::DELAY_TIMER, v.to_be_bytes().to_vec()).encode_into(&mut out)?;
        }
        Ok(out)
    }
}

impl CommissionerDataset {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let set = TlvSet::decode(bytes)?;
        let mut dataset = Self::default();

        if let Some(tlv) = set.get(meshcop::BORDER_AGENT_LOCATOR) {
            dataset.border_agent_locator = Some(read_u16(tlv)?);
        }
        if let Some(tlv) = set.get(meshcop::COMMISSIONER_SESSION_ID) {
            dataset.session_id = Some(read_u16(tlv)?);
        }
        if let Some(tlv) = set.get(meshcop::STEERING_DATA) {
            dataset.steering_data = Some(tlv.value.clone());
        }

        Ok(dataset)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut set = TlvSet::new();
        if let Some(v) = self.border_agent_locator {
            set.push(Tlv::new(meshcop::BORDER_AGENT_LOCATOR, v.to_be_bytes().to_vec()));
        }
        if let Some(v) = self.session_id {
            set.push(Tlv::new(
                meshcop::COMMISSIONER_SESSION_ID,
                v.to_be_bytes().to_vec(),
            ));
        }
        if let Some(v) = &self.steering_data {
            set.push(Tlv::new(meshcop::STEERING_DATA, v.clone()));
        }
        set.encode()
    }
}

impl BbrDataset {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let set = TlvSet::decode(bytes)?;
        let mut dataset = Self::default();

        if let Some(tlv) = set.get(meshcop::BBR_SEQUENCE_NUMBER) {
            dataset.sequence_number = Some(tlv.value.first().copied().ok_or_else(|| {
                TlvError::InvalidArgs("BBR sequence number TLV expected 1 byte, got 0".to_string())
            })?);
        }
        if let Some(tlv) = set.get(meshcop::BBR_REREGISTRATION_DELAY) {
            dataset.reregistration_delay = Some(read_u16(tlv)?);
        }
        if let Some(tlv) = set.get(meshcop::BBR_MLR_TIMEOUT) {
            dataset.mlr_timeout = Some(read_u32(tlv)?);
        }

        Ok(dataset)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut set = TlvSet::new();
        if let Some(v) = self.sequence_number {
            set.push(Tlv::new(meshcop::BBR_SEQUENCE_NUMBER, vec![v]));
        }
        if let Some(v) = self.reregistration_delay {
            set.push(Tlv::new(
                meshcop::BBR_REREGISTRATION_DELAY,
                v.to_be_bytes().to_vec(),
            ));
        }
        if let Some(v) = self.mlr_timeout {
            set.push(Tlv::new(meshcop::BBR_MLR_TIMEOUT, v.to_be_bytes().to_vec()));
        }
        set.encode()
    }
}

fn read_u16(tlv: &Tlv) -> Result<u16> {
    let bytes: [u8; 2] = tlv.value.clone().try_into().map_err(|_| {
        TlvError::InvalidArgs(format!("TLV type {} expected 2 bytes", tlv.tlv_type))
    })?;
    Ok(u16::from_be_bytes(bytes))
}

fn read_u32(tlv: &Tlv) -> Result<u32> {
    let bytes: [u8; 4] = tlv.value.clone().try_into().map_err(|_| {
        TlvError::InvalidArgs(format!("TLV type {} expected 4 bytes", tlv.tlv_type))
    })?;
    Ok(u32::from_be_bytes(bytes))
}

fn read_u64(tlv: &Tlv) -> Result<u64> {
    let bytes: [u8; 8] = tlv.value.clone().try_into().map_err(|_| {
        TlvError::InvalidArgs(format!("TLV type {} expected 8 bytes", tlv.tlv_type))
    })?;
    Ok(u64::from_be_bytes(bytes))
}

fn read_array<const N: usize>(tlv: &Tlv) -> Result<[u8; N]> {
    tlv.value
        .clone()
        .try_into()
        .map_err(|_| TlvError::InvalidArgs(format!("TLV type {} expected {N} bytes", tlv.tlv_type)))
}

fn read_utf8(tlv: &Tlv) -> Result<String> {
    String::from_utf8(tlv.value.clone())
        .map_err(|_| TlvError::InvalidArgs(format!("TLV type {} is not valid UTF-8", tlv.tlv_type)))
}

/// The Channel TLV carries a 2-byte channel page followed by a 2-byte
/// channel number; only the page-0 (2.4GHz) channel number is modeled.
fn read_channel(tlv: &Tlv) -> Result<u16> {
    if tlv.value.len() != 4 {
        return Err(TlvError::InvalidArgs(format!(
            "channel TLV expected 4 bytes, got {}",
            tlv.value.len()
        )));
    }
    Ok(u16::from_be_bytes([tlv.value[2], tlv.value[3]]))
}

fn encode_channel(channel: u16) -> Vec<u8> {
    let mut out = vec![0u8, 0u8];
    out.extend_from_slice(&channel.to_be_bytes());
    out
}

fn read_security_policy(tlv: &Tlv) -> Result<SecurityPolicy> {
    if tlv.value.len() < 3 {
        return Err(TlvError::InvalidArgs(format!(
            "security policy TLV expected at least 3 bytes, got {}",
            tlv.value.len()
        )));
    }
    Ok(SecurityPolicy {
        rotation_time: u16::from_be_bytes([tlv.value[0], tlv.value[1]]),
        flags: tlv.value[2],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_active() -> ActiveDataset {
        ActiveDataset {
            network_name: Some("Test Network".to_string()),
            pan_id: Some(0x1234),
            extended_pan_id: Some([0, 1, 2, 3, 4, 5, 6, 7]),
            channel: Some(15),
            network_key: Some([0xAB; 16]),
            active_timestamp: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn active_dataset_roundtrip() {
        let dataset = sample_active();
        let encoded = dataset.encode().expect("encode");
        let decoded = ActiveDataset::decode(&encoded).expect("decode");
        assert_eq!(dataset.network_name, decoded.network_name);
        assert_eq!(dataset.pan_id, decoded.pan_id);
        assert_eq!(dataset.channel, decoded.channel);
        assert_eq!(dataset.network_key, decoded.network_key);
        assert!(decoded.present.contains(DatasetFieldSet::NETWORK_NAME));
        assert!(decoded.present.contains(DatasetFieldSet::CHANNEL));
    }

    #[test]
    fn absent_fields_are_not_in_present_bitmap() {
        let dataset = ActiveDataset::decode(&[]).expect("decode empty");
        assert_eq!(dataset.present, DatasetFieldSet::empty());
        assert!(dataset.pskc.is_none());
    }

    #[test]
    fn pending_dataset_roundtrip_carries_delay_timer() {
        let dataset = PendingDataset {
            active: sample_active(),
            pending_timestamp: Some(2),
            delay_timer: Some(60_000),
        };
        let encoded = dataset.encode().expect("encode");
        let decoded = PendingDataset::decode(&encoded).expect("decode");
        assert_eq!(decoded.pending_timestamp, Some(2));
        assert_eq!(decoded.delay_timer, Some(60_000));
        assert_eq!(decoded.active.network_name, dataset.active.network_name);
    }

    #[test]
    fn commissioner_dataset_roundtrip() {
        let dataset = CommissionerDataset {
            border_agent_locator: Some(0xF000),
            session_id: Some(7),
            steering_data: Some(vec![0xFF, 0xFF]),
        };
        let encoded = dataset.encode().expect("encode");
        let decoded = CommissionerDataset::decode(&encoded).expect("decode");
        assert_eq!(dataset, decoded);
    }

    #[test]
    fn bbr_dataset_roundtrip() {
        let dataset = BbrDataset {
            sequence_number: Some(3),
            reregistration_delay: Some(120),
            mlr_timeout: Some(3600),
        };
        let encoded = dataset.encode().expect("encode");
        let decoded = BbrDataset::decode(&encoded).expect("decode");
        assert_eq!(dataset, decoded);
    }
}
