//! Read-only command proxy.
//!
//! Proxied verbs (`sls`, `spwd`, `smd5sum`) run an allow-listed program in
//! the session directory and stream its combined stdout and stderr back to
//! the client in fixed-size chunks. The reply always ends with a single
//! `0x00` byte, even when the program printed nothing.
//!
//! Arguments are passed to the program verbatim. There is no shell, so
//! metacharacters are inert, but option arguments are not filtered.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::process::Command;

use protocol::{Connection, ProtocolError, Result};

/// How a proxied command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyOutcome {
    /// The program ran; its output was forwarded.
    Completed {
        /// Output bytes forwarded, sentinel excluded.
        bytes: u64,
        /// Exit code, if the program exited normally.
        exit_code: Option<i32>,
    },
    /// The program is not on the allow-list; the client got a notice.
    Refused {
        /// Program name as requested.
        program: String,
    },
}

/// Runs allow-listed programs on behalf of a session.
#[derive(Debug, Clone)]
pub struct ProxyExecutor {
    allowed: Vec<String>,
    chunk_size: usize,
}

impl ProxyExecutor {
    /// Create an executor for the given program names.
    pub fn new(allowed: Vec<String>, chunk_size: usize) -> Self {
        Self {
            allowed,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Whether `program` may be run.
    pub fn is_allowed(&self, program: &str) -> bool {
        self.allowed.iter().any(|p| p == program)
    }

    /// Run `invocation` in `cwd` and stream its output to the peer.
    ///
    /// `invocation` is the command line with its leading `s` removed, for
    /// example `ls -l`.
    ///
    /// # Errors
    ///
    /// Spawn failures and socket errors are connection-fatal. A program that
    /// is not allow-listed is not an error.
    pub async fn run<S>(
        &self,
        conn: &mut Connection<S>,
        invocation: &[u8],
        cwd: &Path,
    ) -> Result<ProxyOutcome>
    where
        S: AsyncRead + AsyncWrite,
    {
        let text = String::from_utf8_lossy(invocation);
        let mut words = text.split_ascii_whitespace();
        let program = words.next().unwrap_or_default().to_string();
        let args: Vec<&str> = words.collect();

        if !self.is_allowed(&program) {
            tracing::warn!(program = %program, "Refusing program not on allow-list");
            conn.send_message(&format!("{program}: command not allowed\n"))
                .await?;
            return Ok(ProxyOutcome::Refused { program });
        }

        tracing::debug!(program = %program, ?args, cwd = %cwd.display(), "Running proxied command");

        let mut child = Command::new(&program)
            .args(&args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProtocolError::Spawn {
                program: program.clone(),
                source,
            })?;

        let (mut stdout, mut stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                return Err(ProtocolError::Spawn {
                    program,
                    source: std::io::Error::other("child pipes unavailable"),
                })
            }
        };

        let mut pending = Vec::with_capacity(self.chunk_size * 2);
        let mut out_buf = vec![0u8; self.chunk_size];
        let mut err_buf = vec![0u8; self.chunk_size];
        let mut out_open = true;
        let mut err_open = true;
        let mut bytes = 0u64;

        while out_open || err_open {
            tokio::select! {
                read = stdout.read(&mut out_buf), if out_open => {
                    let n = read?;
                    if n == 0 {
                        out_open = false;
                    } else {
                        bytes += n as u64;
                        self.forward(conn, &mut pending, &out_buf[..n]).await?;
                    }
                }
                read = stderr.read(&mut err_buf), if err_open => {
                    let n = read?;
                    if n == 0 {
                        err_open = false;
                    } else {
                        bytes += n as u64;
                        self.forward(conn, &mut pending, &err_buf[..n]).await?;
                    }
                }
            }
        }

        pending.push(protocol::COMMAND_TERMINATOR);
        conn.write_all(&pending).await?;
        conn.flush().await?;

        let status = child.wait().await?;
        tracing::debug!(program = %program, bytes, %status, "Proxied command finished");

        Ok(ProxyOutcome::Completed {
            bytes,
            exit_code: status.code(),
        })
    }

    /// Buffer `data` and write out every full chunk.
    async fn forward<S>(
        &self,
        conn: &mut Connection<S>,
        pending: &mut Vec<u8>,
        data: &[u8],
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite,
    {
        pending.extend_from_slice(data);
        while pending.len() >= self.chunk_size {
            conn.write_all(&pending[..self.chunk_size]).await?;
            pending.drain(..self.chunk_size);
        }
        Ok(())
    }
}
