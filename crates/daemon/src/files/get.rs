//! Serving side of `get`.

use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncWrite};

use protocol::header::encode_get_refusal;
use protocol::probe::{describe_io_error, probe, FileKind};
use protocol::{send_body, Connection, DirectoryContext, GetHeader, Result};

/// Refusal reason for a directory.
pub const DIRECTORY_REASON: &str = "Can not download directory.";

/// Refusal reason for sockets, FIFOs and devices.
pub const NOT_REGULAR_REASON: &str = "Not a regular file.";

/// Result of a served `get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOutcome {
    /// The file was streamed.
    Sent {
        /// Resolved path.
        path: PathBuf,
        /// Size announced in the header.
        size: u64,
        /// Bytes actually streamed.
        sent: u64,
    },
    /// The request was refused with `NO`.
    Refused {
        /// Reason sent to the client.
        reason: String,
    },
}

/// Serve a download of `argument`, resolved against `ctx`.
pub async fn serve_get<S>(
    conn: &mut Connection<S>,
    ctx: &DirectoryContext,
    argument: &[u8],
    chunk_size: usize,
) -> Result<GetOutcome>
where
    S: AsyncRead + AsyncWrite,
{
    let path = match ctx.locate(&*String::from_utf8_lossy(argument)) {
        Ok(path) => path,
        Err(e) => return refuse(conn, describe_io_error(&e)).await,
    };

    let info = match probe(&path) {
        Ok(info) => info,
        Err(e) => return refuse(conn, describe_io_error(&e)).await,
    };

    match info.kind {
        FileKind::Regular => {}
        FileKind::Directory => return refuse(conn, DIRECTORY_REASON.to_string()).await,
        FileKind::Other => return refuse(conn, NOT_REGULAR_REASON.to_string()).await,
    }

    let mut file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => return refuse(conn, describe_io_error(&e)).await,
    };

    let size = info.size;
    let announced = i64::try_from(size).unwrap_or(i64::MAX);
    conn.write_all(&GetHeader::Ok { size: announced }.encode())
        .await?;

    tracing::info!(path = %path.display(), size, "Sending file");
    let sent = send_body(conn, &mut file, size, chunk_size, |_| {}).await?;
    if sent < size {
        tracing::warn!(
            path = %path.display(),
            size,
            sent,
            "File shrank during download; client will wait for missing bytes"
        );
    }

    Ok(GetOutcome::Sent { path, size, sent })
}

async fn refuse<S>(conn: &mut Connection<S>, reason: String) -> Result<GetOutcome>
where
    S: AsyncRead + AsyncWrite,
{
    tracing::info!(reason = %reason, "Refusing download");
    // Header and reason go out in one write so they arrive together.
    conn.write_all(&encode_get_refusal(&reason)).await?;
    conn.flush().await?;
    Ok(GetOutcome::Refused { reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{GetHeader, ProtocolError};
    use tempfile::TempDir;
    use tokio::io::duplex;

    async fn fetch(ctx: &DirectoryContext, name: &str) -> (GetOutcome, GetHeader, Vec<u8>) {
        let (server, client) = duplex(1024 * 1024);
        let mut server = Connection::new(server);
        let mut client = Connection::new(client);

        let outcome = serve_get(&mut server, ctx, name.as_bytes(), 500)
            .await
            .unwrap();
        let header = client.read_get_header().await.unwrap();
        let payload = match header {
            GetHeader::Ok { size } => {
                let mut body = Vec::new();
                protocol::receive_body(&mut client, &mut body, size as u64, 500, |_| {})
                    .await
                    .unwrap();
                body
            }
            GetHeader::No => client.read_reason().await.unwrap().into_bytes(),
        };
        (outcome, header, payload)
    }

    #[tokio::test]
    async fn test_get_regular_file() {
        let dir = TempDir::new().unwrap();
        let data: Vec<u8> = (0..1501u32).map(|i| (i % 256) as u8).collect();
        std::fs::write(dir.path().join("blob.bin"), &data).unwrap();
        let ctx = DirectoryContext::new(dir.path());

        let (outcome, header, body) = fetch(&ctx, "blob.bin").await;
        assert_eq!(header, GetHeader::Ok { size: 1501 });
        assert_eq!(body, data);
        assert!(matches!(outcome, GetOutcome::Sent { size: 1501, sent: 1501, .. }));
    }

    #[tokio::test]
    async fn test_get_empty_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("empty"), b"").unwrap();
        let ctx = DirectoryContext::new(dir.path());

        let (_, header, body) = fetch(&ctx, "empty").await;
        assert_eq!(header, GetHeader::Ok { size: 0 });
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_file() {
        let dir = TempDir::new().unwrap();
        let ctx = DirectoryContext::new(dir.path());

        let (outcome, header, reason) = fetch(&ctx, "absent.txt").await;
        assert_eq!(header, GetHeader::No);
        let reason = String::from_utf8(reason).unwrap();
        assert!(!reason.contains("os error"));
        assert_eq!(outcome, GetOutcome::Refused { reason });
    }

    #[tokio::test]
    async fn test_get_empty_argument() {
        let dir = TempDir::new().unwrap();
        let ctx = DirectoryContext::new(dir.path());

        let (outcome, header, reason) = fetch(&ctx, "").await;
        assert_eq!(header, GetHeader::No);
        assert_eq!(reason, b"No such file or directory");
        assert!(matches!(outcome, GetOutcome::Refused { .. }));
    }

    #[tokio::test]
    async fn test_get_file_shrinks_while_streaming() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shrinking.bin");
        std::fs::write(&path, vec![7u8; 10_000]).unwrap();
        let ctx = DirectoryContext::new(dir.path());

        // The pipe is far smaller than a chunk, so the server stalls inside
        // the first chunk until the client starts reading the body.
        let (server, client) = duplex(64);
        let mut client = Connection::new(client);
        let serving = tokio::spawn(async move {
            let mut server = Connection::new(server);
            serve_get(&mut server, &ctx, b"shrinking.bin", 500).await
        });

        assert_eq!(
            client.read_get_header().await.unwrap(),
            GetHeader::Ok { size: 10_000 }
        );
        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(0)
            .unwrap();

        let mut received = 0u64;
        let mut buf = [0u8; 256];
        loop {
            let n = client.read_some(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received += n as u64;
        }

        match serving.await.unwrap().unwrap() {
            GetOutcome::Sent { size, sent, .. } => {
                assert_eq!(size, 10_000);
                assert!(sent < size, "sent {sent} of {size}");
                assert_eq!(received, sent);
            }
            other => panic!("expected Sent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let ctx = DirectoryContext::new(dir.path());

        let (_, header, reason) = fetch(&ctx, "sub").await;
        assert_eq!(header, GetHeader::No);
        assert_eq!(reason, DIRECTORY_REASON.as_bytes());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_get_socket() {
        let dir = TempDir::new().unwrap();
        let _listener = std::os::unix::net::UnixListener::bind(dir.path().join("sock")).unwrap();
        let ctx = DirectoryContext::new(dir.path());

        let (_, header, reason) = fetch(&ctx, "sock").await;
        assert_eq!(header, GetHeader::No);
        assert_eq!(reason, NOT_REGULAR_REASON.as_bytes());
    }

    #[tokio::test]
    async fn test_get_absolute_path_ignores_session_dir() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let path = other.path().join("abs.txt");
        std::fs::write(&path, b"absolute").unwrap();
        let ctx = DirectoryContext::new(dir.path());

        let (_, _, body) = fetch(&ctx, path.to_str().unwrap()).await;
        assert_eq!(body, b"absolute");
    }

    #[tokio::test]
    async fn test_get_client_gone_is_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("big"), vec![1u8; 64 * 1024]).unwrap();
        let ctx = DirectoryContext::new(dir.path());

        let (server, client) = duplex(1024);
        drop(client);
        let mut server = Connection::new(server);

        let err = serve_get(&mut server, &ctx, b"big", 500).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionClosed(_)));
    }
}
