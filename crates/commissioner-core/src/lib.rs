//! # commissioner-core
//!
//! L6: the façade applications embed. [`facade::Commissioner`] wires every
//! layer below it — DTLS transport, the CoAP engine, the CCM token
//! manager, the commissioner session state machine, and the joiner session
//! pool — into one asynchronous-and-synchronous API with serialized
//! handler callbacks (spec §4.7).
//!
//! ## Modules
//!
//! - [`config`] — `CommissionerConfig`, `CcmCredentials`: resolved
//!   configuration the embedding application hands in at construction
//!   time. Parsing a config file, on-disk credential lookup, and Border
//!   Agent discovery are the caller's job, not this crate's.
//! - [`error`] — `Error`/`ErrorCode`: the stable numeric error taxonomy
//!   every lower-layer error collapses into at this boundary.
//! - [`handler`] — `CommissionerHandler`: the unified callback trait
//!   applications implement.
//! - [`facade`] — `Commissioner`: the top-level type.

pub mod config;
pub mod error;
pub mod facade;
pub mod handler;

pub use config::{CcmCredentials, CommissionerConfig};
pub use error::{Error, ErrorCode, Result};
pub use facade::Commissioner;
pub use handler::CommissionerHandler;

/// Install a `tracing-subscriber` `fmt` layer filtered by `RUST_LOG` (or
/// `default_level` if unset) as the process-wide default.
///
/// This is a convenience for applications and examples that have no
/// subscriber of their own; it is never called internally by the core
/// itself, which only ever emits `tracing` events and leaves subscriber
/// choice (format, sinks, verbosity) to the embedder. Calling this more
/// than once per process is a no-op after the first call succeeds.
pub fn init_tracing(default_level: tracing::Level) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
