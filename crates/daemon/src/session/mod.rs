//! Session handling.
//!
//! A session is one client connection and its private working directory.
//! Sessions share nothing mutable; the only common state is the read-only
//! [`ServerSettings`].

pub mod handler;

pub use handler::{ServerSettings, SessionHandler, SessionId};
