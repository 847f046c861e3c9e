//! Options shared by a connection and the client built on it.
//!
//! `FtpConfig` is a plain value: build one, hand a reference to
//! [`Connection::open`](crate::Connection::open) and move it into
//! [`FtpClient::new`](crate::FtpClient::new). Options can be set by name
//! through [`FtpConfig::set`], which looks them up in a fixed table.

use std::fmt;
use std::time::Duration;

use super::ftp::{Mode, DEFAULT_CHUNK_SIZE};
use super::types::{FileType, FormatControl, FtpError, Result};

/// Value given to [`FtpConfig::set`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Int(u64),
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OptionValue::Bool(value) => write!(f, "{}", value),
            OptionValue::Int(value) => write!(f, "{}", value),
            OptionValue::Text(value) => write!(f, "{:?}", value),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<u64> for OptionValue {
    fn from(value: u64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

type Setter = fn(&mut FtpConfig, OptionValue) -> Result<()>;

/// Every option accepted by [`FtpConfig::set`].
const OPTIONS: &[(&str, Setter)] = &[
    ("timeout", set_timeout),
    ("passive", set_passive),
    ("transfer_type", set_transfer_type),
    ("initial_directory", set_initial_directory),
    ("progress_interval", set_progress_interval),
    ("chunk_size", set_chunk_size),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpConfig {
    /// Connect timeout, also used for reads and writes on every socket.
    pub timeout: Duration,
    /// `false` selects active (`PORT`) data connections.
    pub passive: bool,
    pub file_type: FileType,
    /// Directory entered right after login.
    pub initial_directory: Option<String>,
    /// Seconds between progress reports of the non-blocking transfers.
    pub progress_interval: u64,
    /// Bytes moved per poll of a non-blocking transfer.
    pub chunk_size: usize,
}

impl Default for FtpConfig {
    fn default() -> Self {
        FtpConfig {
            timeout: Duration::from_secs(90),
            passive: true,
            file_type: FileType::Binary,
            initial_directory: None,
            progress_interval: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl FtpConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the option called `name`.
    ///
    /// ```
    /// use ftp_toolkit::FtpConfig;
    ///
    /// let mut config = FtpConfig::new();
    /// config.set("passive", false).unwrap();
    /// config.set("transfer_type", "ascii").unwrap();
    /// assert!(config.set("colour", true).is_err());
    /// assert!(config.set("timeout", "soon").is_err());
    /// ```
    pub fn set<V: Into<OptionValue>>(&mut self, name: &str, value: V) -> Result<()> {
        let setter = OPTIONS
            .iter()
            .find(|(option, _)| *option == name)
            .map(|(_, setter)| *setter)
            .ok_or_else(|| FtpError::InvalidConfig(format!("unknown option {}", name)))?;
        setter(self, value.into())
    }

    /// Names accepted by [`FtpConfig::set`].
    pub fn option_names() -> impl Iterator<Item = &'static str> {
        OPTIONS.iter().map(|(name, _)| *name)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }

    pub fn with_file_type(mut self, file_type: FileType) -> Self {
        self.file_type = file_type;
        self
    }

    pub fn with_initial_directory<S: Into<String>>(mut self, directory: S) -> Self {
        self.initial_directory = Some(directory.into());
        self
    }

    /// An interval of `0` is stored as `1`.
    pub fn with_progress_interval(mut self, seconds: u64) -> Self {
        self.progress_interval = seconds.max(1);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Data connection mode derived from `passive`.
    pub fn mode(&self) -> Mode {
        if self.passive {
            Mode::Passive
        } else {
            Mode::Active
        }
    }
}

fn wrong_type(name: &str, expected: &str, value: &OptionValue) -> FtpError {
    FtpError::InvalidConfig(format!("{} expects {}, got {}", name, expected, value))
}

fn positive(name: &str, value: OptionValue) -> Result<u64> {
    match value {
        OptionValue::Int(0) => Err(FtpError::InvalidConfig(format!("{} must be greater than 0", name))),
        OptionValue::Int(n) => Ok(n),
        other => Err(wrong_type(name, "an integer", &other)),
    }
}

fn set_timeout(config: &mut FtpConfig, value: OptionValue) -> Result<()> {
    config.timeout = Duration::from_secs(positive("timeout", value)?);
    Ok(())
}

fn set_passive(config: &mut FtpConfig, value: OptionValue) -> Result<()> {
    match value {
        OptionValue::Bool(passive) => {
            config.passive = passive;
            Ok(())
        }
        other => Err(wrong_type("passive", "a boolean", &other)),
    }
}

fn set_transfer_type(config: &mut FtpConfig, value: OptionValue) -> Result<()> {
    let file_type = match &value {
        OptionValue::Text(text) if text.eq_ignore_ascii_case("ascii") => FileType::Ascii(FormatControl::Default),
        OptionValue::Text(text) if text.eq_ignore_ascii_case("binary") => FileType::Binary,
        other => return Err(wrong_type("transfer_type", "\"ascii\" or \"binary\"", other)),
    };
    config.file_type = file_type;
    Ok(())
}

fn set_initial_directory(config: &mut FtpConfig, value: OptionValue) -> Result<()> {
    match value {
        OptionValue::Text(directory) if directory.trim().is_empty() => {
            config.initial_directory = None;
            Ok(())
        }
        OptionValue::Text(directory) => {
            config.initial_directory = Some(directory);
            Ok(())
        }
        other => Err(wrong_type("initial_directory", "a path", &other)),
    }
}

fn set_progress_interval(config: &mut FtpConfig, value: OptionValue) -> Result<()> {
    config.progress_interval = positive("progress_interval", value)?;
    Ok(())
}

fn set_chunk_size(config: &mut FtpConfig, value: OptionValue) -> Result<()> {
    let size = positive("chunk_size", value)?;
    config.chunk_size = usize::try_from(size).map_err(|_| FtpError::InvalidConfig(format!("chunk_size {} is too large", size)))?;
    Ok(())
}
