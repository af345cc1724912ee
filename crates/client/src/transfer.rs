//! Requesting side of `get` and `put`.

use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncRead, AsyncWrite};

use protocol::header::encode_size;
use protocol::probe::{describe_io_error, exists, extract_file_name, is_regular_file};
use protocol::{
    body_len, receive_body, send_body, GetHeader, ProtocolError, Result, TransferStatus,
};

use crate::command::transfer_argument;
use crate::local::error_line;
use crate::session::ClientSession;

/// Indicatif template for transfer progress.
const PROGRESS_TEMPLATE: &str =
    "{msg:.dim} {wide_bar:.cyan} {eta} @ {decimal_bytes_per_sec} [{decimal_total_bytes:.dim}]";

const DOWNLOAD_DONE: &str = "File downloaded, use 'smd5sum' to verify the files checksum on the server,\n\
and then 'md5sum' on your computer, if they match, then the file was\n\
download without error.\n";

const UPLOAD_DONE: &str = "File uploaded, use 'smd5sum' to verify the files checksum on the server,\n\
and then 'md5sum' on your computer, if they match, then the file was\n\
uploaded without error.\n";

/// Result of a `get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was saved locally.
    Saved {
        /// Local destination.
        path: PathBuf,
        /// Bytes received.
        size: u64,
    },
    /// The daemon answered `NO`.
    Refused {
        /// Reason from the daemon.
        reason: String,
    },
    /// A local check failed; nothing was sent.
    Rejected {
        /// What was wrong.
        reason: String,
    },
}

/// Result of a `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The file was sent in full.
    Sent {
        /// Bytes sent.
        size: u64,
    },
    /// The daemon answered `NO`.
    Refused {
        /// Reason from the daemon.
        reason: String,
    },
    /// A local check failed; nothing was sent.
    Rejected {
        /// What was wrong.
        reason: String,
    },
}

impl<S> ClientSession<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Download the file named on a `get` line into the local directory.
    ///
    /// The local file is created only once the daemon has accepted, so a
    /// refusal leaves nothing behind.
    pub async fn download(&mut self, line: &str) -> Result<DownloadOutcome> {
        let remote_path = match transfer_argument(line) {
            Ok(path) => path,
            Err(e) => return self.reject_download(e.to_string()),
        };

        let Some(file_name) = extract_file_name(remote_path) else {
            return self.reject_download(format!("{remote_path} is a directory."));
        };

        let destination = self.local.resolve(file_name);
        if exists(&destination) {
            return self.reject_download(format!("The file {remote_path} already exists."));
        }

        self.conn.send_command(line.as_bytes()).await?;

        let size = match self.conn.read_get_header().await? {
            GetHeader::Ok { size } => body_len(size)?,
            GetHeader::No => {
                let reason = self.conn.read_reason().await?;
                self.print(&format!("{reason}\n"))?;
                return Ok(DownloadOutcome::Refused { reason });
            }
        };

        // The daemon is already streaming; without a file to put it in the
        // connection cannot be resynchronised.
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&destination)
            .await
            .map_err(|e| {
                ProtocolError::TransferFailed(format!(
                    "cannot create {}: {}",
                    destination.display(),
                    describe_io_error(&e)
                ))
            })?;

        let bar = self.progress_bar(size, file_name);
        let received = receive_body(&mut self.conn, &mut file, size, self.chunk_size, |n| {
            bar.set_position(n)
        })
        .await;
        bar.finish_and_clear();

        match received {
            Ok(size) => {
                tracing::info!(path = %destination.display(), size, "Download complete");
                self.print(DOWNLOAD_DONE)?;
                Ok(DownloadOutcome::Saved {
                    path: destination,
                    size,
                })
            }
            Err(e) => {
                self.print(&error_line("Could not download file."))?;
                Err(e)
            }
        }
    }

    /// Upload the local file named on a `put` line to the daemon's directory.
    ///
    /// Only the file name is sent; the daemon stores it in its session
    /// directory.
    pub async fn upload(&mut self, line: &str) -> Result<UploadOutcome> {
        let local_path = match transfer_argument(line) {
            Ok(path) => path,
            Err(e) => return self.reject_upload(e.to_string()),
        };

        let source = self.local.resolve(local_path);
        match is_regular_file(&source) {
            Ok(true) => {}
            Ok(false) => return self.reject_upload(format!("{local_path} is not a regular file.")),
            Err(e) => return self.reject_upload(describe_io_error(&e)),
        }

        let Some(file_name) = extract_file_name(local_path) else {
            return self.reject_upload(format!("{local_path} is not a regular file."));
        };

        let mut file = match tokio::fs::File::open(&source).await {
            Ok(file) => file,
            Err(e) => return self.reject_upload(describe_io_error(&e)),
        };
        let size = match file.metadata().await {
            Ok(metadata) => metadata.len(),
            Err(e) => return self.reject_upload(describe_io_error(&e)),
        };

        self.conn
            .send_command(format!("put {file_name}").as_bytes())
            .await?;

        if self.conn.read_put_tag().await? == TransferStatus::No {
            let reason = self.conn.read_reason().await?;
            self.print(&format!("{reason}\n"))?;
            return Ok(UploadOutcome::Refused { reason });
        }

        let announced = i64::try_from(size)
            .map_err(|_| ProtocolError::TransferFailed(format!("file too large: {size}")))?;
        self.conn.write_all(&encode_size(announced)).await?;

        let bar = self.progress_bar(size, file_name);
        let sent = send_body(&mut self.conn, &mut file, size, self.chunk_size, |n| {
            bar.set_position(n)
        })
        .await;
        bar.finish_and_clear();
        let sent = sent?;

        if sent < size {
            return Err(ProtocolError::TransferFailed(format!(
                "{local_path} shrank during upload ({sent} of {size} bytes sent)"
            )));
        }

        tracing::info!(path = %source.display(), size, "Upload complete");
        self.print(UPLOAD_DONE)?;
        Ok(UploadOutcome::Sent { size })
    }

    fn reject_download(&mut self, reason: String) -> Result<DownloadOutcome> {
        self.print(&error_line(&reason))?;
        Ok(DownloadOutcome::Rejected { reason })
    }

    fn reject_upload(&mut self, reason: String) -> Result<UploadOutcome> {
        self.print(&error_line(&reason))?;
        Ok(UploadOutcome::Rejected { reason })
    }

    fn progress_bar(&self, size: u64, name: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(size).with_message(name.to_string());
        if let Ok(style) = ProgressStyle::with_template(PROGRESS_TEMPLATE) {
            bar.set_style(style);
        }
        bar
    }
}
