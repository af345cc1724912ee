//! Per-connection command loop.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use uuid::Uuid;

use protocol::probe::describe_io_error;
use protocol::{
    classify, Connection, DirectoryContext, ProtocolError, Result, Verb, CHANGE_DIR_SUCCESS,
};

use crate::config::Config;
use crate::files::{serve_get, serve_put};
use crate::proxy::ProxyExecutor;

/// Unique identifier for a session.
pub type SessionId = String;

/// Settings shared read-only by every session.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Executor for proxied read-only commands.
    pub proxy: ProxyExecutor,
    /// Transfer chunk size.
    pub chunk_size: usize,
    /// Directory each new session starts in.
    pub start_dir: PathBuf,
}

impl ServerSettings {
    /// Build settings from configuration, starting sessions in `start_dir`.
    pub fn new(config: &Config, start_dir: PathBuf) -> Self {
        Self {
            proxy: ProxyExecutor::new(
                config.proxy.allowed_programs.clone(),
                config.transfer.chunk_size,
            ),
            chunk_size: config.transfer.chunk_size,
            start_dir,
        }
    }
}

/// Serves one client connection until it closes.
///
/// Each handler owns its own [`DirectoryContext`], so `scd` in one session
/// is invisible to every other.
pub struct SessionHandler<S> {
    id: SessionId,
    conn: Connection<S>,
    ctx: DirectoryContext,
    settings: Arc<ServerSettings>,
    commands: u64,
}

impl<S> SessionHandler<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Create a handler for a freshly accepted stream.
    pub fn new(stream: S, settings: Arc<ServerSettings>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conn: Connection::new(stream),
            ctx: DirectoryContext::new(settings.start_dir.clone()),
            settings,
            commands: 0,
        }
    }

    /// This session's identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session's current directory.
    pub fn cwd(&self) -> &std::path::Path {
        self.ctx.cwd()
    }

    /// Read and dispatch commands until the client disconnects.
    ///
    /// Returns the number of commands handled. Any error ends the session.
    pub async fn run(mut self) -> Result<u64> {
        while let Some(line) = self.conn.read_command().await? {
            self.dispatch(&line).await?;
            self.commands += 1;
        }
        Ok(self.commands)
    }

    /// Handle a single command line.
    pub async fn dispatch(&mut self, line: &[u8]) -> Result<()> {
        let command = classify(line);
        tracing::info!(verb = ?command.verb, command = %String::from_utf8_lossy(line), "Received command");

        match command.verb {
            Verb::ChangeDir => {
                let reply = match self.ctx.change(&*command.argument_lossy()) {
                    Ok(()) => {
                        tracing::info!(cwd = %self.ctx.cwd().display(), "Directory changed");
                        CHANGE_DIR_SUCCESS.to_string()
                    }
                    Err(e) => describe_io_error(&e),
                };
                self.conn.send_message(&reply).await
            }
            Verb::List | Verb::PrintDir | Verb::Checksum => {
                self.settings
                    .proxy
                    .run(&mut self.conn, command.proxy_invocation(), self.ctx.cwd())
                    .await?;
                Ok(())
            }
            Verb::Get => {
                serve_get(
                    &mut self.conn,
                    &self.ctx,
                    command.argument,
                    self.settings.chunk_size,
                )
                .await?;
                Ok(())
            }
            Verb::Put => {
                serve_put(
                    &mut self.conn,
                    &self.ctx,
                    command.argument,
                    self.settings.chunk_size,
                )
                .await?;
                Ok(())
            }
            Verb::Unknown => Err(ProtocolError::UnknownCommand(
                String::from_utf8_lossy(line).into_owned(),
            )),
        }
    }
}
