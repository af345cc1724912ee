//! # fileshell Client Library
//!
//! Interactive client for a fileshell daemon. Each prompt line is either
//! handled locally (`cd`, `help`, `q`, anything unrecognized goes to the
//! local shell) or sent to the daemon (`sls`, `scd`, `spwd`, `smd5sum`,
//! `get`, `put`).
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use client::{ClientSession, Flow};
//! use protocol::DirectoryContext;
//! use tokio::net::TcpStream;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let stream = TcpStream::connect(("127.0.0.1", 7000)).await?;
//!     let mut session = ClientSession::new(stream, DirectoryContext::from_current_dir()?);
//!
//!     if session.execute("sls -l").await? == Flow::Quit {
//!         return Ok(());
//!     }
//!     session.execute("get notes.txt").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: Prompt line classification and argument checks
//! - [`session`]: Connection driver and command execution
//! - [`transfer`]: Download and upload
//! - [`local`]: Local shell, help screen and prompt

pub mod command;
pub mod local;
pub mod session;
pub mod transfer;

pub use command::{classify_local, transfer_argument, ArgumentError, LocalVerb};
pub use local::{prompt, run_shell, HELP_TEXT};
pub use session::{ClientSession, Flow};
pub use transfer::{DownloadOutcome, UploadOutcome};
