//! Parsing of raw, possibly multi-line, command replies.
//!
//! ```
//! use ftp_toolkit::reply::Reply;
//!
//! let reply = Reply::parse(&["211-Features:", " MDTM", " SIZE", "211 End"]);
//! assert_eq!(reply.code, Some(211));
//! assert_eq!(reply.body.as_deref(), Some(&[" MDTM".to_string(), " SIZE".to_string()][..]));
//! assert_eq!(reply.success, Some(true));
//! ```

use regex::Regex;

use super::status;

lazy_static! {
    // Leading decimal code and the text following it on the first line.
    static ref CODE_RE: Regex = Regex::new(r"^(\d+)[\s-]?(.*)$").unwrap();
}

/// A command reply split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Every line as received, in order.
    pub raw: Vec<String>,
    /// Leading numeric code of the first line.
    pub code: Option<u32>,
    /// Text of the first line after the code.
    pub message: String,
    /// Intermediate lines of a multi-line reply.
    pub body: Option<Vec<String>>,
    /// Last line of a multi-line reply.
    pub end_message: Option<String>,
    /// `code < 400`, or `None` when no code could be read.
    pub success: Option<bool>,
}

impl Reply {
    /// Parses the lines of a reply. Never fails: a missing code yields `code == None`.
    ///
    /// An empty input gives an empty message and no code.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Reply {
        let raw: Vec<String> = lines
            .iter()
            .map(|l| l.as_ref().trim_end_matches(&['\r', '\n'][..]).to_string())
            .collect();

        let first = raw.first().map(String::as_str).unwrap_or("");
        let (code, message) = match CODE_RE.captures(first) {
            Some(caps) => (caps[1].parse::<u32>().ok(), caps[2].to_string()),
            None => (None, first.to_string()),
        };

        let (body, end_message) = if raw.len() > 1 {
            (
                Some(raw[1..raw.len() - 1].to_vec()),
                raw.last().cloned(),
            )
        } else {
            (None, None)
        };

        Reply {
            code,
            message,
            body,
            end_message,
            success: code.map(status::is_success),
            raw,
        }
    }

    /// `true` only when a code was read and it is below 400.
    pub fn is_success(&self) -> bool {
        self.success.unwrap_or(false)
    }
}
