//! File transfer serving engines.
//!
//! Both engines validate the request against the session's directory
//! before committing to a transfer. A validation failure becomes a `NO`
//! reply with a readable reason and the session carries on; only socket
//! errors end the connection.
//!
//! # Known gaps
//!
//! Upload names are joined to the session directory as sent, so a name
//! containing `..` or an absolute path lands outside it.

pub mod get;
pub mod put;

pub use get::{serve_get, GetOutcome, DIRECTORY_REASON, NOT_REGULAR_REASON};
pub use put::{serve_put, PutOutcome, EXISTS_REASON};
