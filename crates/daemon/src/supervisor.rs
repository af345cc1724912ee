//! TCP listener and session spawning.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::Instrument;

use crate::session::{ServerSettings, SessionHandler};

/// Errors that stop the supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The listening socket could not be created.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Reason reported by the OS.
        source: io::Error,
    },

    /// Accepting a connection failed.
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    /// Local address lookup failed.
    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] io::Error),
}

/// Accepts connections and runs one [`SessionHandler`] per client.
pub struct Supervisor {
    listener: TcpListener,
    settings: Arc<ServerSettings>,
}

impl Supervisor {
    /// Bind a listener on `address:port`. Port 0 picks a free port.
    pub async fn bind(
        address: IpAddr,
        port: u16,
        settings: ServerSettings,
    ) -> Result<Self, SupervisorError> {
        let addr = SocketAddr::new(address, port);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| SupervisorError::Bind { addr, source })?;

        Ok(Self {
            listener,
            settings: Arc::new(settings),
        })
    }

    /// The bound address.
    pub fn local_addr(&self) -> Result<SocketAddr, SupervisorError> {
        self.listener
            .local_addr()
            .map_err(SupervisorError::LocalAddr)
    }

    /// Accept connections forever.
    ///
    /// Each session runs on its own task. Session failures and panics stay
    /// inside that task; only an accept failure returns from here.
    pub async fn run(self) -> Result<(), SupervisorError> {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(%addr, "Waiting for connections");
        }

        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .map_err(SupervisorError::Accept)?;

            let handler = SessionHandler::new(stream, Arc::clone(&self.settings));
            let span = tracing::info_span!("session", session_id = %handler.id(), %peer);

            // The handle is dropped; the runtime reclaims the task when it ends.
            tokio::spawn(
                async move {
                    tracing::info!("Connected.");
                    match handler.run().await {
                        Ok(commands) => tracing::info!(commands, "Disconnected."),
                        Err(e) if e.is_disconnect() => {
                            tracing::info!(reason = %e, "Disconnected.")
                        }
                        Err(e) => tracing::warn!(error = %e, "Disconnected."),
                    }
                }
                .instrument(span),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use protocol::{Connection, CHANGE_DIR_SUCCESS};
    use std::net::Ipv4Addr;
    use tempfile::TempDir;
    use tokio::net::TcpStream;

    async fn start(dir: &std::path::Path) -> SocketAddr {
        let settings = ServerSettings::new(&Config::default(), dir.to_path_buf());
        let supervisor = Supervisor::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0, settings)
            .await
            .unwrap();
        let addr = supervisor.local_addr().unwrap();
        tokio::spawn(supervisor.run());
        addr
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let dir = TempDir::new().unwrap();
        let addr = start(dir.path()).await;
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_port_in_use() {
        let dir = TempDir::new().unwrap();
        let addr = start(dir.path()).await;
        let settings = ServerSettings::new(&Config::default(), dir.path().to_path_buf());

        let result = Supervisor::bind(addr.ip(), addr.port(), settings).await;
        assert!(matches!(result, Err(SupervisorError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_failed_session_does_not_stop_supervisor() {
        let dir = TempDir::new().unwrap();
        let addr = start(dir.path()).await;

        let mut doomed = Connection::new(TcpStream::connect(addr).await.unwrap());
        doomed.send_command(b"bogus").await.unwrap();
        // The daemon drops the session, so the next read sees a close.
        assert!(doomed.read_message().await.is_err());

        let mut healthy = Connection::new(TcpStream::connect(addr).await.unwrap());
        healthy.send_command(b"scd .").await.unwrap();
        assert_eq!(
            healthy.read_message().await.unwrap(),
            CHANGE_DIR_SUCCESS.as_bytes()
        );
    }
}
