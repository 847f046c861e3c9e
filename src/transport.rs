//! The command channel as seen by the higher level operations.
//!
//! [`FtpStream`](crate::FtpStream) is the network implementation. Every call
//! returns its own error detail, there is no "last error" to read afterwards.

use std::io::{Read, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use super::types::{FileType, Result};

/// Direction of a transfer, seen from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Upload,
    Download,
}

/// State reported by each step of a non-blocking transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    /// Data is still flowing, poll again.
    MoreData,
    /// The server confirmed the transfer.
    Finished,
    /// The transfer ended without confirmation, with the reason.
    Failed(String),
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::MoreData)
    }
}

/// Everything needed to start a non-blocking transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub direction: TransferDirection,
    /// Local file read from (upload) or written to (download).
    pub local: PathBuf,
    pub remote: String,
    pub file_type: FileType,
    /// Byte offset to restart from, `0` for a full transfer.
    pub offset: u64,
}

/// Commands the client issues over a single control connection, one at a time.
pub trait Transport {
    /// Sends an arbitrary command and returns every reply line, whatever the code.
    fn send_command(&mut self, command: &str) -> Result<Vec<String>>;

    /// Raw `LIST` lines for `path`, with `-R` when `recursive`.
    fn list_directory(&mut self, path: &str, recursive: bool) -> Result<Vec<String>>;

    /// Raw `NLST` lines for `path`.
    fn name_list(&mut self, path: &str) -> Result<Vec<String>>;

    /// Opens the data channel for `request`. Usually answers `MoreData`.
    fn start_transfer(&mut self, request: TransferRequest) -> Result<TransferStatus>;

    /// Moves the next chunk of the transfer started last.
    fn continue_transfer(&mut self) -> Result<TransferStatus>;

    /// Position reached in the remote file by the current or last transfer.
    fn transfer_position(&self) -> u64;

    fn change_directory(&mut self, path: &str) -> Result<()>;

    fn current_directory(&mut self) -> Result<String>;

    fn parent_directory(&mut self) -> Result<()>;

    fn create_directory(&mut self, path: &str) -> Result<()>;

    fn remove_file(&mut self, path: &str) -> Result<()>;

    fn remove_directory(&mut self, path: &str) -> Result<()>;

    fn rename(&mut self, from: &str, to: &str) -> Result<()>;

    /// Lines of the `FEAT` reply, trimmed.
    fn features(&mut self) -> Result<Vec<String>>;

    /// `SIZE` of `path`, `None` when the reply carries no size.
    fn file_size(&mut self, path: &str) -> Result<Option<u64>>;

    fn modification_time(&mut self, path: &str) -> Result<Option<DateTime<Utc>>>;

    fn set_transfer_type(&mut self, file_type: FileType) -> Result<()>;

    /// Downloads `path` from `offset` into `sink`, returns the bytes written.
    fn retrieve(&mut self, path: &str, offset: u64, sink: &mut dyn Write) -> Result<u64>;

    /// Uploads `source` to `path` starting at `offset`, returns the bytes sent.
    fn store(&mut self, path: &str, offset: u64, source: &mut dyn Read) -> Result<u64>;

    fn noop(&mut self) -> Result<()>;
}
