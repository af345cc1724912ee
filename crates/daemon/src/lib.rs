//! # fileshell Daemon Library
//!
//! Serves remote clients over TCP: read-only inspection through an
//! allow-listed command proxy, per-session directory changes, and whole-file
//! downloads and uploads.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Supervisor                       │
//! │            accept loop, one task per client          │
//! ├──────────────────────────────────────────────────────┤
//! │  ┌────────────────┐  ┌────────────────┐              │
//! │  │ SessionHandler │  │ SessionHandler │   ...        │
//! │  │  (own cwd)     │  │  (own cwd)     │              │
//! │  └───────┬────────┘  └────────────────┘              │
//! │          │                                           │
//! │   ┌──────┴───────┬──────────────┐                    │
//! │   │ ProxyExecutor│ serve_get    │ serve_put          │
//! │   └──────────────┴──────────────┘                    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::net::{IpAddr, Ipv4Addr};
//!
//! use daemon::{Config, ServerSettings, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     config.validate()?;
//!
//!     let settings = ServerSettings::new(&config, std::env::current_dir()?);
//!     let supervisor =
//!         Supervisor::bind(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 7000, settings).await?;
//!     supervisor.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`supervisor`]: Listener and session spawning
//! - [`session`]: Per-connection command loop
//! - [`proxy`]: Allow-listed read-only command execution
//! - [`files`]: Download and upload serving

pub mod config;
pub mod files;
pub mod proxy;
pub mod session;
pub mod supervisor;

// Re-export protocol for convenience
pub use protocol;

pub use config::{Config, ConfigError};
pub use files::{serve_get, serve_put, GetOutcome, PutOutcome};
pub use proxy::{ProxyExecutor, ProxyOutcome};
pub use session::{ServerSettings, SessionHandler, SessionId};
pub use supervisor::{Supervisor, SupervisorError};
