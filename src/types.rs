//! The set of valid values for FTP commands

use std::fmt;

use thiserror::Error;

use super::status;

const CHANNEL_FAILURES: [u32; 3] = [
    status::NOT_AVAILABLE,
    status::CANNOT_OPEN_DATA_CONNECTION,
    status::TRANSFER_ABORTED,
];

/// A shorthand for a Result whose error type is always an FtpError.
pub type Result<T> = ::std::result::Result<T, FtpError>;

/// `FtpError` is a library-global error type to describe the different kinds of
/// errors that might occur while using FTP.
#[derive(Debug, Error)]
pub enum FtpError {
    #[error("FTP ConnectionError: {0}")]
    ConnectionError(#[from] ::std::io::Error),
    #[error("FTP SecureError: {0}")]
    SecureError(String),
    /// The server sent something that is not a valid reply.
    #[error("FTP InvalidResponse: {0}")]
    InvalidResponse(String),
    /// The server answered with a code outside of the expected set.
    #[error("FTP UnexpectedResponse: {0}")]
    UnexpectedResponse(Line),
    #[error("FTP InvalidAddress: {0}")]
    InvalidAddress(#[from] ::std::net::AddrParseError),
    /// Rejected locally, never sent to the server.
    #[error("FTP InvalidCommand: {0}")]
    InvalidCommand(String),
    #[error("FTP InvalidPattern: {0}")]
    InvalidPattern(String),
    #[error("FTP InvalidConfig: {0}")]
    InvalidConfig(String),
    #[error("FTP PathIsDirectory: {0}")]
    PathIsDirectory(String),
    #[error("FTP NotFound: {0}")]
    NotFound(String),
    #[error("FTP FeatureUnsupported: {0}")]
    FeatureUnsupported(String),
    #[error("FTP TransferFailed: {0}")]
    TransferFailed(String),
    #[error("FTP OperationFailed: {0}")]
    OperationFailed(String),
}

impl FtpError {
    /// Returns the reply line when the server refused the command.
    ///
    /// `421` (service closing) and `425`/`426` (data connection failures)
    /// report a broken channel rather than an answer and are not refusals.
    pub fn rejection(&self) -> Option<&Line> {
        match self {
            FtpError::UnexpectedResponse(line) if !CHANNEL_FAILURES.contains(&line.0) => Some(line),
            _ => None,
        }
    }

    /// `true` when the server understood the command and answered negatively.
    pub fn is_rejection(&self) -> bool {
        self.rejection().is_some()
    }
}

/// Text Format Control used in `TYPE` command
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormatControl {
    /// Default text format control (is NonPrint)
    Default,
    /// Non-print (not destined for printing)
    NonPrint,
    /// Telnet format control (\<CR\>, \<FF\>, etc.)
    Telnet,
    /// ASA (Fortran) Carriage Control
    Asa,
}

/// File Type used in `TYPE` command
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileType {
    /// ASCII text (the argument is the text format control)
    Ascii(FormatControl),
    /// EBCDIC text (the argument is the text format control)
    Ebcdic(FormatControl),
    /// Image,
    Image,
    /// Binary (the synonym to Image)
    Binary,
    /// Local format (the argument is the number of bits in one byte on local machine)
    Local(u8),
}

/// `Line` contains a command code and the contents of a line of text read from the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line(pub u32, pub String);

impl fmt::Display for FormatControl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FormatControl::Default | FormatControl::NonPrint => write!(f, "N"),
            FormatControl::Telnet => write!(f, "T"),
            FormatControl::Asa => write!(f, "C"),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FileType::Ascii(fc) => write!(f, "A {}", fc),
            FileType::Ebcdic(fc) => write!(f, "E {}", fc),
            FileType::Image | FileType::Binary => write!(f, "I"),
            FileType::Local(bits) => write!(f, "L {}", bits),
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.1.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn type_command_arguments() {
        assert_eq!(FileType::Ascii(FormatControl::Default).to_string(), "A N");
        assert_eq!(FileType::Ebcdic(FormatControl::Asa).to_string(), "E C");
        assert_eq!(FileType::Binary.to_string(), "I");
        assert_eq!(FileType::Local(8).to_string(), "L 8");
    }

    #[test]
    fn rejection_is_only_for_unexpected_reply() {
        let rejected = FtpError::UnexpectedResponse(Line(550, "550 No such file\r\n".into()));
        assert!(rejected.is_rejection());
        assert_eq!(rejected.to_string(), "FTP UnexpectedResponse: 550 No such file");

        let io = FtpError::ConnectionError(std::io::ErrorKind::BrokenPipe.into());
        assert!(!io.is_rejection());
    }

    #[test]
    fn channel_failures_are_not_rejections() {
        for code in [421, 425, 426] {
            let err = FtpError::UnexpectedResponse(Line(code, format!("{} gone", code)));
            assert!(!err.is_rejection(), "{} counted as a refusal", code);
        }
        assert!(FtpError::UnexpectedResponse(Line(450, "450 busy".into())).is_rejection());
        assert!(FtpError::UnexpectedResponse(Line(502, "502 not implemented".into())).is_rejection());
    }
}
