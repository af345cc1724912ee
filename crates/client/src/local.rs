//! Local side of the prompt: shell passthrough, help screen and prompt text.

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use crossterm::style::Stylize;
use tokio::process::Command;

/// Help screen, without colors.
pub const HELP_TEXT: &str = "\
Legend:
  []                   - Optional arguments

Recognized client side commands:
  cd PATH              - Change directory.
  help                 - Print this help screen.
  q                    - Quit.
  Anything else is run by the local shell.

Recognized server side commands:
  scd PATH             - Server change directory.
  sls [PATH] [OPTIONS] - Server list files (compatible with all 'ls' arguments).
  spwd                 - Server print working directory
  smd5sum FILES        - Server compute the md5 for the following set of files.

File transfer commands:
  get FILE             - Download a file from the server.
  put FILE             - Upload a file to the servers current working directory.
";

/// Section headings highlighted in [`render_help`].
const HELP_HEADINGS: &[&str] = &[
    "Legend:",
    "Recognized client side commands:",
    "Recognized server side commands:",
    "File transfer commands:",
];

/// The help screen with highlighted headings.
pub fn render_help() -> String {
    let mut out = String::with_capacity(HELP_TEXT.len() + 64);
    for line in HELP_TEXT.lines() {
        if HELP_HEADINGS.contains(&line) {
            out.push_str(&line.blue().bold().to_string());
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Prompt showing the local directory.
pub fn prompt(cwd: &Path) -> String {
    format!("{}{}", cwd.display().to_string().yellow(), " > ".green())
}

/// Highlighted error line.
pub fn error_line(message: impl std::fmt::Display) -> String {
    format!("{} {}\n", "ERROR:".red(), message)
}

/// Run `line` through `sh -c` in `cwd`, sharing this terminal.
pub async fn run_shell(line: &str, cwd: &Path) -> io::Result<ExitStatus> {
    tracing::debug!(line, cwd = %cwd.display(), "Running local shell command");
    Command::new("sh")
        .arg("-c")
        .arg(line)
        .current_dir(cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
}
