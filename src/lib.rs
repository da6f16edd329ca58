//! cs800-io - Control client for the Cryostream 800 cryocooler
//!
//! The Cryostream 800 broadcasts a status packet over UDP roughly once per
//! second and accepts commands on a second UDP port with no acknowledgment
//! of any kind. This library turns that into a command-with-confirmation
//! API: every high-level operation sends its command frame, waits out the
//! broadcast interval, re-reads the device status and retries until the
//! requested state is observed or the retry budget runs out.
//!
//! ## Ports
//!
//! - 30303 UDP: identification packets (reserved by the device, unused here)
//! - 30304 UDP: status broadcasts (received)
//! - 30305 UDP: commands (sent)

pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod probe;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
pub use session::DeviceSession;
pub use types::{AutofillMode, Outcome, RunMode};
