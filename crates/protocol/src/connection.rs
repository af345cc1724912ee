//! Buffered connection wrapper used by both peers.
//!
//! The stream is split into a buffered read half and a raw write half so a
//! caller can hold both while streaming. Every read helper here is exact: a
//! short read is reported as [`ProtocolError::ConnectionClosed`] instead of
//! being retried or padded.

use std::io::Write;

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf,
    WriteHalf,
};

use crate::command::{encode_command, COMMAND_TERMINATOR, MAX_COMMAND_LEN};
use crate::error::{ProtocolError, Result};
use crate::header::{decode_size, decode_tag, GetHeader, TransferStatus, GET_REPLY_SIZE};
use crate::header::{PUT_REPLY_SIZE, SIZE_FIELD_LEN};

/// One end of a protocol connection.
pub struct Connection<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Wrap a connected stream.
    pub fn new(stream: S) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    /// Read one NUL-terminated command line.
    ///
    /// Returns `Ok(None)` when the peer closes cleanly before sending any
    /// byte of a new line. The returned line excludes the terminator.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::CommandTooLong`] if [`MAX_COMMAND_LEN`] bytes arrive
    ///   without a terminator
    /// - [`ProtocolError::UnterminatedCommand`] if the peer closes mid-line
    pub async fn read_command(&mut self) -> Result<Option<Vec<u8>>> {
        let mut line = Vec::with_capacity(64);
        let received = (&mut self.reader)
            .take(MAX_COMMAND_LEN as u64)
            .read_until(COMMAND_TERMINATOR, &mut line)
            .await?;

        if received == 0 {
            return Ok(None);
        }

        if line.last() == Some(&COMMAND_TERMINATOR) {
            line.pop();
            return Ok(Some(line));
        }

        if received >= MAX_COMMAND_LEN {
            Err(ProtocolError::command_too_long())
        } else {
            Err(ProtocolError::UnterminatedCommand { received })
        }
    }

    /// Send a command line, appending the terminator.
    pub async fn send_command(&mut self, line: &[u8]) -> Result<()> {
        let encoded = encode_command(line)?;
        self.write_all(&encoded).await?;
        self.flush().await
    }

    /// Send a NUL-terminated text message.
    pub async fn send_message(&mut self, text: &str) -> Result<()> {
        let mut encoded = Vec::with_capacity(text.len() + 1);
        encoded.extend_from_slice(text.as_bytes());
        encoded.push(COMMAND_TERMINATOR);
        self.write_all(&encoded).await?;
        self.flush().await
    }

    /// Read a NUL-terminated reply, returning it without the terminator.
    pub async fn read_message(&mut self) -> Result<Vec<u8>> {
        let mut message = Vec::new();
        self.copy_message(&mut message).await?;
        Ok(message)
    }

    /// Copy a NUL-terminated reply into `sink` as it arrives.
    ///
    /// The terminator is consumed but not copied. Returns the number of
    /// bytes copied. Failures writing to `sink` are local and come back as
    /// [`ProtocolError::Io`], never as a disconnect.
    pub async fn copy_message<W: Write>(&mut self, sink: &mut W) -> Result<u64> {
        let mut copied = 0u64;
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Err(ProtocolError::ConnectionClosed(format!(
                    "reply ended after {copied} bytes without terminator"
                )));
            }

            match available.iter().position(|b| *b == COMMAND_TERMINATOR) {
                Some(end) => {
                    sink.write_all(&available[..end]).map_err(ProtocolError::Io)?;
                    copied += end as u64;
                    self.reader.consume(end + 1);
                    sink.flush().map_err(ProtocolError::Io)?;
                    return Ok(copied);
                }
                None => {
                    let len = available.len();
                    sink.write_all(available).map_err(ProtocolError::Io)?;
                    copied += len as u64;
                    self.reader.consume(len);
                }
            }
        }
    }

    /// Read the fixed 10-byte GET reply header.
    pub async fn read_get_header(&mut self) -> Result<GetHeader> {
        let mut buf = [0u8; GET_REPLY_SIZE];
        self.reader.read_exact(&mut buf).await?;
        GetHeader::decode(&buf)
    }

    /// Read the 2-byte PUT reply tag.
    pub async fn read_put_tag(&mut self) -> Result<TransferStatus> {
        let mut buf = [0u8; PUT_REPLY_SIZE];
        self.reader.read_exact(&mut buf).await?;
        decode_tag(buf)
    }

    /// Read an 8-byte size field.
    pub async fn read_size(&mut self) -> Result<i64> {
        let mut buf = [0u8; SIZE_FIELD_LEN];
        self.reader.read_exact(&mut buf).await?;
        Ok(decode_size(buf))
    }

    /// Read the reason text following a `NO` header.
    ///
    /// Reasons carry no length or terminator, so this returns whatever a
    /// single read yields. The serving side writes header and reason in one
    /// call, which keeps them together on every transport we run on.
    pub async fn read_reason(&mut self) -> Result<String> {
        let available = self.reader.fill_buf().await?;
        if available.is_empty() {
            return Err(ProtocolError::ConnectionClosed(
                "peer closed before sending a reason".to_string(),
            ));
        }
        let reason = String::from_utf8_lossy(available).into_owned();
        let len = available.len();
        self.reader.consume(len);
        Ok(reason)
    }

    /// Read at most `buf.len()` bytes. Returns 0 only at end of stream.
    pub async fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.reader.read(buf).await?)
    }

    /// Write all of `buf`.
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.writer.write_all(buf).await?;
        Ok(())
    }

    /// Flush buffered writes.
    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }

    /// Shut down the write half.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
