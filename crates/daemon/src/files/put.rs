//! Serving side of `put`.

use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncWrite};

use protocol::header::{encode_put_refusal, REPLY_OK};
use protocol::probe::{describe_io_error, exists};
use protocol::{body_len, receive_body, Connection, DirectoryContext, Result};

/// Refusal reason when the destination is taken.
pub const EXISTS_REASON: &str = "File already exists";

/// Result of a served `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// The body was received in full.
    Stored {
        /// Destination path.
        path: PathBuf,
        /// Bytes written.
        size: u64,
    },
    /// The request was refused with `NO`.
    Refused {
        /// Reason sent to the client.
        reason: String,
    },
}

/// Serve an upload named `argument` into the directory of `ctx`.
///
/// Existing entries are never replaced. If the client disconnects
/// mid-body the partially written file is left in place and the error is
/// returned.
pub async fn serve_put<S>(
    conn: &mut Connection<S>,
    ctx: &DirectoryContext,
    argument: &[u8],
    chunk_size: usize,
) -> Result<PutOutcome>
where
    S: AsyncRead + AsyncWrite,
{
    let path = match ctx.locate(&*String::from_utf8_lossy(argument)) {
        Ok(path) => path,
        Err(e) => return refuse(conn, describe_io_error(&e)).await,
    };

    if exists(&path) {
        return refuse(conn, EXISTS_REASON.to_string()).await;
    }

    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
    {
        Ok(file) => file,
        Err(e) => return refuse(conn, describe_io_error(&e)).await,
    };

    conn.write_all(&REPLY_OK).await?;
    conn.flush().await?;

    let size = body_len(conn.read_size().await?)?;
    tracing::info!(path = %path.display(), size, "Receiving file");

    match receive_body(conn, &mut file, size, chunk_size, |_| {}).await {
        Ok(size) => Ok(PutOutcome::Stored { path, size }),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Upload aborted; partial file kept");
            Err(e)
        }
    }
}

async fn refuse<S>(conn: &mut Connection<S>, reason: String) -> Result<PutOutcome>
where
    S: AsyncRead + AsyncWrite,
{
    tracing::info!(reason = %reason, "Refusing upload");
    conn.write_all(&encode_put_refusal(&reason)).await?;
    conn.flush().await?;
    Ok(PutOutcome::Refused { reason })
}
