//! MeshCoP CoAP URI-Path registry.
//!
//! Every resource the commissioner core sends to or receives from is
//! listed here, grouped the way the spec's external-interfaces table does.

/// Petition for commissioner authority.
pub const PETITIONING: &str = "/c/cp";
/// Commissioner keep-alive.
pub const KEEP_ALIVE: &str = "/c/ca";
/// MGMT_GET.
pub const MGMT_GET: &str = "/c/mg";
/// MGMT_SET.
pub const MGMT_SET: &str = "/c/ms";
/// Commissioner Dataset GET.
pub const MGMT_COMMISSIONER_GET: &str = "/c/cg";
/// Commissioner Dataset SET.
pub const MGMT_COMMISSIONER_SET: &str = "/c/cs";
/// BBR Dataset GET.
pub const MGMT_BBR_GET: &str = "/c/bg";
/// BBR Dataset SET.
pub const MGMT_BBR_SET: &str = "/c/bs";
/// Active Dataset GET.
pub const MGMT_ACTIVE_GET: &str = "/c/ag";
/// Active Dataset SET.
pub const MGMT_ACTIVE_SET: &str = "/c/as";
/// Pending Dataset GET.
pub const MGMT_PENDING_GET: &str = "/c/pg";
/// Pending Dataset SET.
pub const MGMT_PENDING_SET: &str = "/c/ps";
/// Secure Pending Dataset SET.
pub const MGMT_SECURE_PENDING_SET: &str = "/c/sp";
/// Unsolicited dataset-changed notification.
pub const MGMT_DATASET_CHANGED: &str = "/c/dc";
/// Announce Begin.
pub const MGMT_ANNOUNCE_BEGIN: &str = "/c/ab";
/// PAN ID Query.
pub const MGMT_PANID_QUERY: &str = "/c/pq";
/// PAN ID Conflict notification.
pub const MGMT_PANID_CONFLICT: &str = "/c/pc";
/// Energy Scan.
pub const MGMT_ED_SCAN: &str = "/c/es";
/// Energy Report notification.
pub const MGMT_ED_REPORT: &str = "/c/er";
/// Reenroll command.
pub const MGMT_REENROLL: &str = "/c/re";
/// Domain Reset command.
pub const MGMT_DOMAIN_RESET: &str = "/c/rt";
/// Network Migrate command.
pub const MGMT_NET_MIGRATE: &str = "/c/nm";
/// Relayed joiner frame, Border Agent to joiner.
pub const RELAY_RX: &str = "/c/rx";
/// Relayed joiner frame, joiner to Border Agent.
pub const RELAY_TX: &str = "/c/tx";
/// Joiner entrust (KEK delivery).
pub const JOIN_ENT: &str = "/c/je";
/// Joiner finalize.
pub const JOIN_FIN: &str = "/c/jf";
/// Joiner application-layer message.
pub const JOIN_APP: &str = "/c/ja";

/// Diagnostic GET.
pub const DIAG_GET: &str = "/d/dg";
/// Diagnostic GET query.
pub const DIAG_GET_QUERY: &str = "/d/dq";
/// Diagnostic GET answer.
pub const DIAG_GET_ANSWER: &str = "/d/da";
/// Diagnostic reset.
pub const DIAG_RESET: &str = "/d/dr";

/// Multicast Listener Registration.
pub const MULTICAST_LISTENER_REGISTRATION: &str = "/n/mr";

/// COM_TOK request, served by the domain registrar.
pub const COM_TOKEN_REQUEST: &str = "/.well-known/ccm";
