//! Command line framing and classification.
//!
//! # Wire Format
//!
//! A command is ASCII text followed by a single `0x00` terminator. The whole
//! encoded line, terminator included, is at most [`MAX_COMMAND_LEN`] bytes.
//!
//! # Classification
//!
//! Verbs are recognized by fixed literal prefixes, checked in table order.
//! The first matching prefix wins and the remaining bytes are the argument.
//! Argument validity is never inspected here.

use crate::error::{ProtocolError, Result};

/// Maximum encoded command length, terminator included.
pub const MAX_COMMAND_LEN: usize = 500;

/// Byte terminating every command line and NUL-terminated message.
pub const COMMAND_TERMINATOR: u8 = 0;

/// The classified command tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// `sls`: list files through the proxy executor.
    List,
    /// `scd `: change the session directory.
    ChangeDir,
    /// `spwd`: print the session directory through the proxy executor.
    PrintDir,
    /// `smd5sum `: checksum files through the proxy executor.
    Checksum,
    /// `get `: download a file.
    Get,
    /// `put `: upload a file.
    Put,
    /// Anything else.
    Unknown,
}

/// Prefix table in match order.
const PREFIXES: &[(&[u8], Verb)] = &[
    (b"sls" as &[u8], Verb::List),
    (b"scd " as &[u8], Verb::ChangeDir),
    (b"get " as &[u8], Verb::Get),
    (b"put " as &[u8], Verb::Put),
    (b"spwd" as &[u8], Verb::PrintDir),
    (b"smd5sum " as &[u8], Verb::Checksum),
];

impl Verb {
    /// Whether the verb is answered by an external allow-listed program.
    pub fn is_proxied(self) -> bool {
        matches!(self, Verb::List | Verb::PrintDir | Verb::Checksum)
    }

    /// The literal prefix for this verb, if it has one.
    pub fn prefix(self) -> Option<&'static [u8]> {
        PREFIXES
            .iter()
            .find(|(_, verb)| *verb == self)
            .map(|(prefix, _)| *prefix)
    }
}

/// A classified command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    /// The matched verb.
    pub verb: Verb,
    /// Bytes following the matched prefix (the whole line for `Unknown`).
    pub argument: &'a [u8],
    /// The full line, without terminator.
    pub line: &'a [u8],
}

impl<'a> Command<'a> {
    /// Argument as text, replacing invalid UTF-8.
    pub fn argument_lossy(&self) -> String {
        String::from_utf8_lossy(self.argument).into_owned()
    }

    /// The line with the distinguishing leading `s` removed, as handed to
    /// the proxy executor (`sls -l` becomes `ls -l`).
    pub fn proxy_invocation(&self) -> &'a [u8] {
        self.line.get(1..).unwrap_or_default()
    }
}

/// Classify a command line.
///
/// Pure and total: every byte sequence yields a command, and classifying a
/// line twice gives the same answer.
pub fn classify(line: &[u8]) -> Command<'_> {
    for (prefix, verb) in PREFIXES {
        if let Some(argument) = line.strip_prefix(*prefix) {
            return Command {
                verb: *verb,
                argument,
                line,
            };
        }
    }

    Command {
        verb: Verb::Unknown,
        argument: line,
        line,
    }
}

/// Encode a command line for transmission.
///
/// Appends the terminator. Fails if the line contains a NUL or if the
/// encoded form would exceed [`MAX_COMMAND_LEN`].
pub fn encode_command(line: &[u8]) -> Result<Vec<u8>> {
    if let Some(offset) = line.iter().position(|b| *b == COMMAND_TERMINATOR) {
        return Err(ProtocolError::InteriorNul { offset });
    }

    if line.len() + 1 > MAX_COMMAND_LEN {
        return Err(ProtocolError::command_too_long());
    }

    let mut encoded = Vec::with_capacity(line.len() + 1);
    encoded.extend_from_slice(line);
    encoded.push(COMMAND_TERMINATOR);
    Ok(encoded)
}
