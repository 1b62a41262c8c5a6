//! Growl Protocol Library
//!
//! Client-side codecs for the two Growl wire protocols: the legacy
//! fixed-binary UDP protocol (growl 1.2 and older) and the text-based
//! GNTP protocol (growl 1.3 and later, with authentication, symmetric
//! encryption and binary resource attachments).
//!
//! This crate performs no network I/O. It builds outbound packet bytes
//! and parses inbound GNTP response frames; the transports live in the
//! client crate.

pub mod constants;
pub mod crypto;
pub mod error;
pub mod gntp;
pub mod response;
pub mod session;
pub mod udp;

pub use error::{GrowlError, ServerCondition};
pub use session::{Icon, NotificationType, Session};
