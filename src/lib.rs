#![deny(unsafe_code)]
#![warn(missing_docs)]

//! An event-driven IPMI v1.5 LAN client for MD5-authenticated sessions.
//!
//! The crate implements:
//! - the RMCP / session / IPMB wire format and both IPMB checksums
//! - MD5 session auth codes
//! - the session handshake (capabilities, challenge, activation, privilege)
//! - queued `Chassis Control` commands over the established session
//!
//! [`Client`] is a synchronous state machine fed by a driver. Drivers for
//! blocking UDP (`blocking` feature) and tokio (`async` feature) live in
//! [`transport`].
//!
//! ```no_run
//! # #[cfg(feature = "blocking")]
//! # fn main() -> ipmi_lan::Result<()> {
//! use ipmi_lan::transport::blocking::UdpTransport;
//! use ipmi_lan::{ChassisControl, Client};
//!
//! let transport = UdpTransport::connect("192.0.2.10:623".parse().unwrap())?;
//! let mut client = Client::builder().password("secret").build(transport)?;
//! client.submit(ChassisControl::PowerCycle);
//! client.run_until_idle()?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "blocking"))]
//! # fn main() {}
//! ```

mod client;
pub mod commands;
mod crypto;
mod debug;
mod error;
mod observe;
pub mod protocol;
mod session;
pub mod transport;
mod types;

pub use crate::client::{Client, ClientBuilder, Status};
pub use crate::crypto::{AUTH_FIELD_LEN, Password, compute_auth_code, verify_auth_code};
pub use crate::error::{ChecksumKind, Error, Result};
pub use crate::session::SessionState;
pub use crate::transport::{EntropySource, SystemEntropy, Transport};
pub use crate::types::{AuthType, ChassisControl, PrivilegeLevel};
