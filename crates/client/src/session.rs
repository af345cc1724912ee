//! Client session: one connection, one local directory, one output sink.

use std::io::Write;
use std::path::Path;

use tokio::io::{AsyncRead, AsyncWrite};

use protocol::probe::describe_io_error;
use protocol::{Connection, DirectoryContext, Result, Verb, CHUNK_SIZE};

use crate::command::{classify_local, exceeds_command_limit, LocalVerb};
use crate::local::{error_line, render_help, run_shell};

/// Whether the prompt loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// The user asked to leave.
    Quit,
}

/// Drives one connection to a daemon.
pub struct ClientSession<S> {
    pub(crate) conn: Connection<S>,
    pub(crate) local: DirectoryContext,
    pub(crate) output: Box<dyn Write + Send>,
    pub(crate) show_progress: bool,
    pub(crate) chunk_size: usize,
}

impl<S> ClientSession<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Wrap a connected stream. Output goes to stdout, progress is shown.
    pub fn new(stream: S, local: DirectoryContext) -> Self {
        Self {
            conn: Connection::new(stream),
            local,
            output: Box::new(std::io::stdout()),
            show_progress: true,
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Send command output and messages to `output` instead of stdout.
    pub fn with_output(mut self, output: Box<dyn Write + Send>) -> Self {
        self.output = output;
        self
    }

    /// Enable or disable transfer progress bars.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// The local working directory.
    pub fn local_dir(&self) -> &Path {
        self.local.cwd()
    }

    /// Execute one prompt line.
    ///
    /// Local mistakes (bad arguments, missing files, refusals from the
    /// daemon) are printed and the session continues. `Err` means the
    /// connection is unusable.
    pub async fn execute(&mut self, line: &str) -> Result<Flow> {
        if exceeds_command_limit(line) {
            self.print(&error_line("command too long."))?;
            return Ok(Flow::Continue);
        }

        match classify_local(line) {
            LocalVerb::Empty => {}
            LocalVerb::Quit => return Ok(Flow::Quit),
            LocalVerb::Help => self.print(&render_help())?,
            LocalVerb::ChangeDir(path) => {
                if let Err(e) = self.local.change(path) {
                    self.print(&error_line(describe_io_error(&e)))?;
                }
            }
            LocalVerb::Shell(command) => {
                self.output.flush()?;
                match run_shell(command, self.local.cwd()).await {
                    Ok(status) if !status.success() => {
                        tracing::debug!(%status, "Shell command failed");
                    }
                    Ok(_) => {}
                    Err(e) => self.print(&error_line(describe_io_error(&e)))?,
                }
            }
            LocalVerb::Remote(command) => match command.verb {
                Verb::Get => {
                    self.download(line).await?;
                }
                Verb::Put => {
                    self.upload(line).await?;
                }
                _ => {
                    self.remote(line.as_bytes()).await?;
                }
            },
        }

        Ok(Flow::Continue)
    }

    /// Send a read-only command and copy its reply to the output.
    pub async fn remote(&mut self, line: &[u8]) -> Result<u64> {
        self.conn.send_command(line).await?;
        let copied = self.conn.copy_message(&mut self.output).await?;
        self.output.flush()?;
        Ok(copied)
    }

    pub(crate) fn print(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes())?;
        self.output.flush()?;
        Ok(())
    }
}
