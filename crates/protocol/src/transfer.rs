//! Chunked body streaming for GET and PUT.
//!
//! Both directions move a body of a size announced up front. The sender
//! stops at the announced size or at source EOF, whichever comes first; the
//! receiver insists on the full size and treats an early close as fatal.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::connection::Connection;
use crate::error::{ProtocolError, Result};

/// Default transfer chunk size in bytes.
pub const CHUNK_SIZE: usize = 500;

/// Convert a wire size into a byte count.
pub fn body_len(size: i64) -> Result<u64> {
    u64::try_from(size)
        .map_err(|_| ProtocolError::TransferFailed(format!("invalid body size {size}")))
}

/// Stream up to `size` bytes from `source` to the peer.
///
/// Returns the number of bytes sent. A source that ends early yields a short
/// count; the peer is not told, so it will wait for the rest.
pub async fn send_body<S, R, F>(
    conn: &mut Connection<S>,
    source: &mut R,
    size: u64,
    chunk_size: usize,
    mut on_progress: F,
) -> Result<u64>
where
    S: AsyncRead + AsyncWrite,
    R: AsyncRead + Unpin,
    F: FnMut(u64),
{
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut sent = 0u64;

    while sent < size {
        let want = chunk_len(buf.len(), size - sent);
        let n = source.read(&mut buf[..want]).await?;
        if n == 0 {
            tracing::debug!(sent, size, "source ended before announced size");
            break;
        }
        conn.write_all(&buf[..n]).await?;
        sent += n as u64;
        on_progress(sent);
    }

    conn.flush().await?;
    Ok(sent)
}

/// Receive exactly `size` bytes from the peer into `sink`.
///
/// # Errors
///
/// Returns [`ProtocolError::ConnectionClosed`] if the peer closes first.
/// Bytes already received are flushed to `sink` before returning.
pub async fn receive_body<S, W, F>(
    conn: &mut Connection<S>,
    sink: &mut W,
    size: u64,
    chunk_size: usize,
    mut on_progress: F,
) -> Result<u64>
where
    S: AsyncRead + AsyncWrite,
    W: AsyncWrite + Unpin,
    F: FnMut(u64),
{
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut received = 0u64;

    while received < size {
        let want = chunk_len(buf.len(), size - received);
        let n = conn.read_some(&mut buf[..want]).await?;
        if n == 0 {
            sink.flush().await?;
            return Err(ProtocolError::ConnectionClosed(format!(
                "peer closed after {received} of {size} bytes"
            )));
        }
        sink.write_all(&buf[..n]).await?;
        received += n as u64;
        on_progress(received);
    }

    sink.flush().await?;
    Ok(received)
}

fn chunk_len(chunk_size: usize, remaining: u64) -> usize {
    usize::try_from(remaining).map_or(chunk_size, |r| r.min(chunk_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 256) as u8).collect()
    }

    async fn stream_through(data: Vec<u8>) -> Vec<u8> {
        let (a, b) = duplex(CHUNK_SIZE * 2);
        let mut sender = Connection::new(a);
        let mut receiver = Connection::new(b);
        let size = data.len() as u64;

        let send = tokio::spawn(async move {
            let mut source: &[u8] = &data;
            send_body(&mut sender, &mut source, size, CHUNK_SIZE, |_| {})
                .await
                .unwrap()
        });

        let mut sink = Vec::new();
        let received = receive_body(&mut receiver, &mut sink, size, CHUNK_SIZE, |_| {})
            .await
            .unwrap();
        assert_eq!(send.await.unwrap(), size);
        assert_eq!(received, size);
        sink
    }

    #[tokio::test]
    async fn test_chunk_boundaries() {
        for len in [0, 1, CHUNK_SIZE - 1, CHUNK_SIZE, CHUNK_SIZE + 1, 3 * CHUNK_SIZE] {
            let data = pattern(len);
            assert_eq!(stream_through(data.clone()).await, data, "len {len}");
        }
    }

    #[tokio::test]
    async fn test_send_body_stops_at_size() {
        let (a, b) = duplex(4096);
        let mut sender = Connection::new(a);
        let mut receiver = Connection::new(b);

        let data = pattern(1000);
        let mut source: &[u8] = &data;
        let sent = send_body(&mut sender, &mut source, 600, CHUNK_SIZE, |_| {})
            .await
            .unwrap();
        assert_eq!(sent, 600);
        drop(sender);

        let mut sink = Vec::new();
        let err = receive_body(&mut receiver, &mut sink, 601, CHUNK_SIZE, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionClosed(_)));
        assert_eq!(sink, &data[..600]);
    }

    #[tokio::test]
    async fn test_send_body_short_source() {
        let (a, _b) = duplex(4096);
        let mut sender = Connection::new(a);
        let data = pattern(10);
        let mut source: &[u8] = &data;

        let sent = send_body(&mut sender, &mut source, 500, CHUNK_SIZE, |_| {})
            .await
            .unwrap();
        assert_eq!(sent, 10);
    }

    #[tokio::test]
    async fn test_progress_reports_running_total() {
        let (a, b) = duplex(4096);
        let mut sender = Connection::new(a);
        let mut receiver = Connection::new(b);

        let data = pattern(1200);
        let mut source: &[u8] = &data;
        let mut sent_marks = Vec::new();
        send_body(&mut sender, &mut source, 1200, CHUNK_SIZE, |n| sent_marks.push(n))
            .await
            .unwrap();
        assert_eq!(sent_marks.last(), Some(&1200));

        let mut sink = Vec::new();
        let mut received_marks = Vec::new();
        receive_body(&mut receiver, &mut sink, 1200, CHUNK_SIZE, |n| {
            received_marks.push(n)
        })
        .await
        .unwrap();
        assert_eq!(received_marks.last(), Some(&1200));
        assert!(received_marks.windows(2).all(|w| w[0] < w[1]));
        assert!(received_marks
            .windows(2)
            .all(|w| w[1] - w[0] <= CHUNK_SIZE as u64));
    }

    #[test]
    fn test_body_len() {
        assert_eq!(body_len(0).unwrap(), 0);
        assert_eq!(body_len(501).unwrap(), 501);
        assert!(matches!(
            body_len(-1),
            Err(ProtocolError::TransferFailed(_))
        ));
    }
}
