//! MeshCoP TLV type constants.
//!
//! Values follow the Thread 1.2/1.3 Mesh Commissioning Protocol TLV
//! registry. The CCM extension types (`CommissionerToken` and its signature
//! companions) are grouped at the end since they only apply in CCM mode.

pub const CHANNEL: u8 = 0;
pub const PAN_ID: u8 = 1;
pub const EXTENDED_PAN_ID: u8 = 2;
pub const NETWORK_NAME: u8 = 3;
pub const PSKC: u8 = 4;
pub const NETWORK_KEY: u8 = 5;
pub const NETWORK_KEY_SEQUENCE_COUNTER: u8 = 6;
pub const NETWORK_MESH_LOCAL_PREFIX: u8 = 7;
pub const STEERING_DATA: u8 = 8;
pub const BORDER_AGENT_LOCATOR: u8 = 9;
pub const COMMISSIONER_ID: u8 = 10;
pub const COMMISSIONER_SESSION_ID: u8 = 11;
pub const SECURITY_POLICY: u8 = 12;
pub const GET: u8 = 13;
pub const ACTIVE_TIMESTAMP: u8 = 14;
pub const COMMISSIONER_UDP_PORT: u8 = 15;
pub const STATE: u8 = 16;
pub const JOINER_DTLS_ENCAPSULATION: u8 = 17;
pub const JOINER_UDP_PORT: u8 = 18;
pub const JOINER_IID: u8 = 19;
pub const JOINER_ROUTER_LOCATOR: u8 = 20;
pub const JOINER_ROUTER_KEK: u8 = 21;
pub const PROVISIONING_URL: u8 = 32;
pub const VENDOR_NAME: u8 = 33;
pub const VENDOR_MODEL: u8 = 34;
pub const VENDOR_SW_VERSION: u8 = 35;
pub const VENDOR_DATA: u8 = 36;
pub const VENDOR_STACK_VERSION: u8 = 37;
pub const UDP_ENCAPSULATION: u8 = 48;
pub const IPV6_ADDRESS: u8 = 49;
pub const PENDING_TIMESTAMP: u8 = 51;
pub const DELAY_TIMER: u8 = 52;
pub const CHANNEL_MASK: u8 = 53;
pub const COUNT: u8 = 54;
pub const PERIOD: u8 = 55;
pub const SCAN_DURATION: u8 = 56;
pub const ENERGY_LIST: u8 = 57;
pub const DOMAIN_NAME: u8 = 59;
pub const BBR_SEQUENCE_NUMBER: u8 = 65;
pub const BBR_REREGISTRATION_DELAY: u8 = 66;
pub const BBR_MLR_TIMEOUT: u8 = 67;

// CCM extension TLVs (Commercial Commissioning Mode only).
pub const COMMISSIONER_TOKEN: u8 = 81;
pub const COMMISSIONER_SIGNATURE: u8 = 82;
pub const COMMISSIONER_PEN_SIGNATURE: u8 = 83;
pub const THREAD_COMMISSIONER_TOKEN: u8 = 85;
pub const THREAD_COMMISSIONER_SIGNATURE: u8 = 86;

/// State TLV values used in petition/dataset-set responses.
pub mod state {
    pub const ACCEPT: i8 = 1;
    pub const PENDING: i8 = 0;
    pub const REJECT: i8 = -1;
}

/// Active Dataset parameter TLV types, used by the token manager's signing
/// canonicalization for MGMT_ACTIVE_SET.
pub const ACTIVE_DATASET_PARAMETERS: &[u8] = &[
    CHANNEL,
    PAN_ID,
    EXTENDED_PAN_ID,
    NETWORK_NAME,
    PSKC,
    NETWORK_KEY,
    NETWORK_KEY_SEQUENCE_COUNTER,
    NETWORK_MESH_LOCAL_PREFIX,
    SECURITY_POLICY,
    ACTIVE_TIMESTAMP,
    CHANNEL_MASK,
];

/// Pending Dataset parameter TLV types (Active Dataset parameters plus
/// Pending Timestamp and Delay Timer), used for MGMT_PENDING_SET.
pub const PENDING_DATASET_PARAMETERS: &[u8] = &[
    CHANNEL,
    PAN_ID,
    EXTENDED_PAN_ID,
    NETWORK_NAME,
    PSKC,
    NETWORK_KEY,
    NETWORK_KEY_SEQUENCE_COUNTER,
    NETWORK_MESH_LOCAL_PREFIX,
    SECURITY_POLICY,
    ACTIVE_TIMESTAMP,
    CHANNEL_MASK,
    PENDING_TIMESTAMP,
    DELAY_TIMER,
];

/// Whether `tlv_type` is a dataset parameter for the Active (`is_active =
/// true`) or Pending (`is_active = false`) dataset.
pub fn is_dataset_parameter(is_active: bool, tlv_type: u8) -> bool {
    if is_active {
        ACTIVE_DATASET_PARAMETERS.contains(&tlv_type)
    } else {
        PENDING_DATASET_PARAMETERS.contains(&tlv_type)
    }
}

/// TLV types excluded from the token manager's signing content regardless
/// of dataset context (the token and signature TLVs sign themselves).
pub const SIGNING_EXCLUDED: &[u8] = &[
    COMMISSIONER_TOKEN,
    COMMISSIONER_SIGNATURE,
    COMMISSIONER_PEN_SIGNATURE,
    THREAD_COMMISSIONER_TOKEN,
    THREAD_COMMISSIONER_SIGNATURE,
];
