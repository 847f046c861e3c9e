//! ftp-toolkit is an FTP client library written in Rust.
//!
//! [`FtpStream`] speaks the protocol over one control connection.
//! [`FtpClient`] builds file level operations on top of it: existence and
//! size checks, recursive copy and removal, search by pattern and transfers
//! that report their progress while they run.
//!
//! ### Usage
//!
//! ```no_run
//! use ftp_toolkit::{Connection, FtpClient, FtpConfig};
//!
//! let config = FtpConfig::default().with_progress_interval(2);
//! let connection = Connection::plain("127.0.0.1", 21, "Doe", "mumble");
//! let mut client = FtpClient::connect(&connection, config).unwrap_or_else(|err|
//!     panic!("{}", err)
//! );
//! client
//!     .async_download("/pub/big.iso", "big.iso", true, |progress| {
//!         println!("{}% at {} kB/s", progress.percentage, progress.speed_kbps)
//!     })
//!     .unwrap();
//! let _ = client.quit();
//! ```
//!
//! Control channel traffic is logged through the `log` facade at `debug`
//! level.

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

mod client;
mod config;
mod connection;
mod data_stream;
mod ftp;
pub mod list;
pub mod path;
pub mod reply;
pub mod status;
pub mod transfer;
pub mod transport;
pub mod types;

#[cfg(test)]
mod memftp;

pub use self::client::FtpClient;
pub use self::config::{FtpConfig, OptionValue};
pub use self::connection::{Connection, Security, DEFAULT_PORT};
pub use self::data_stream::DataStream;
pub use self::ftp::{FtpStream, Mode, DEFAULT_CHUNK_SIZE};
pub use self::list::{EntryType, FileEntry, ListFilter, ListOptions, Listing};
pub use self::reply::Reply;
pub use self::transfer::{Clock, SystemClock, TransferEngine, TransferJob, TransferProgress};
pub use self::transport::{TransferDirection, TransferRequest, TransferStatus, Transport};
pub use self::types::{FtpError, Result};
