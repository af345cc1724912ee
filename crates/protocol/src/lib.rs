//! # fileshell Protocol Library
//!
//! Wire definitions shared by the fileshell daemon and client.
//!
//! ## Overview
//!
//! A connection carries a sequence of NUL-terminated command lines from the
//! client. Each command is answered in one of three shapes:
//!
//! - **Streamed output**: proxied read-only commands (`sls`, `spwd`,
//!   `smd5sum`) reply with arbitrary output bytes ending in a single `0x00`
//! - **Message**: `scd` replies with a NUL-terminated status text
//! - **Transfer**: `get` and `put` run a binary header exchange followed by
//!   a body of announced size
//!
//! ```text
//! client                                   daemon
//!   │ "get notes.txt\0"                       │
//!   │ ──────────────────────────────────────► │
//!   │        "OK" + size (8 bytes) + body     │
//!   │ ◄────────────────────────────────────── │
//!   │ "put notes.txt\0"                       │
//!   │ ──────────────────────────────────────► │
//!   │                    "OK"                 │
//!   │ ◄────────────────────────────────────── │
//!   │ size (8 bytes) + body                   │
//!   │ ──────────────────────────────────────► │
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{classify, encode_command, Verb};
//!
//! let command = classify(b"get notes.txt");
//! assert_eq!(command.verb, Verb::Get);
//! assert_eq!(command.argument, b"notes.txt");
//!
//! let wire = encode_command(b"spwd").unwrap();
//! assert_eq!(wire, b"spwd\0");
//! ```
//!
//! ## Modules
//!
//! - [`command`]: Command framing and verb classification
//! - [`header`]: GET/PUT reply headers and the size field
//! - [`connection`]: Buffered connection with exact read helpers
//! - [`transfer`]: Chunked body streaming
//! - [`directory`]: Per-session working directory
//! - [`probe`]: Filesystem queries and error descriptions
//! - [`error`]: Error types

pub mod command;
pub mod connection;
pub mod directory;
pub mod error;
pub mod header;
pub mod probe;
pub mod transfer;

pub use command::{classify, encode_command, Command, Verb, COMMAND_TERMINATOR, MAX_COMMAND_LEN};
pub use connection::Connection;
pub use directory::{DirectoryContext, CHANGE_DIR_SUCCESS};
pub use error::{ProtocolError, Result};
pub use header::{
    GetHeader, TransferStatus, GET_REPLY_SIZE, PUT_REPLY_SIZE, REPLY_NO, REPLY_OK, SIZE_FIELD_LEN,
};
pub use probe::{describe_io_error, extract_file_name, FileKind, FileProbe};
pub use transfer::{body_len, receive_body, send_body, CHUNK_SIZE};
