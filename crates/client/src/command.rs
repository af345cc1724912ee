//! Client-side command classification and argument checks.

use thiserror::Error;

use protocol::{classify, Command, MAX_COMMAND_LEN};

/// Prefix of the local directory change command.
pub const LOCAL_CD_PREFIX: &str = "cd ";

/// Length of the `get`/`put` verbs, without separator.
pub const TRANSFER_VERB_LEN: usize = 3;

/// What a prompt line asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalVerb<'a> {
    /// Blank line.
    Empty,
    /// `cd PATH`: change the local directory.
    ChangeDir(&'a str),
    /// `help`: print the help screen.
    Help,
    /// `q`: leave the prompt.
    Quit,
    /// A command for the daemon.
    Remote(Command<'a>),
    /// Anything else runs in the local shell.
    Shell(&'a str),
}

/// Malformed `get`/`put` arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// No path after the verb.
    #[error("{verb} requires a path to a file.")]
    Missing {
        /// The verb as typed.
        verb: String,
    },

    /// More than one separator between verb and path.
    #[error("only one whitespace is permitted between the command and the argument.")]
    ExtraWhitespace,
}

/// Classify a prompt line.
pub fn classify_local(line: &str) -> LocalVerb<'_> {
    if line.is_empty() {
        return LocalVerb::Empty;
    }
    if let Some(path) = line.strip_prefix(LOCAL_CD_PREFIX) {
        return LocalVerb::ChangeDir(path);
    }
    if line == "help" {
        return LocalVerb::Help;
    }
    if line == "q" {
        return LocalVerb::Quit;
    }

    let command = classify(line.as_bytes());
    if command.verb == protocol::Verb::Unknown {
        LocalVerb::Shell(line)
    } else {
        LocalVerb::Remote(command)
    }
}

/// Whether `line` is too long to send.
pub fn exceeds_command_limit(line: &str) -> bool {
    line.len() >= MAX_COMMAND_LEN
}

/// Extract the path argument of a `get` or `put` line.
///
/// Spaces and tabs after the verb are skipped; exactly one is allowed.
pub fn transfer_argument(line: &str) -> Result<&str, ArgumentError> {
    let verb = line.get(..TRANSFER_VERB_LEN).unwrap_or(line);
    let rest = line.get(TRANSFER_VERB_LEN..).unwrap_or_default();
    let argument = rest.trim_start_matches([' ', '\t']);

    if argument.is_empty() {
        return Err(ArgumentError::Missing {
            verb: verb.to_string(),
        });
    }
    if rest.len() - argument.len() > 1 {
        return Err(ArgumentError::ExtraWhitespace);
    }
    Ok(argument)
}
