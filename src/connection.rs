//! Ways to open a logged-in control connection.
//!
//! Each constructor picks a strategy; [`Connection::open`] then runs the same
//! steps for all of them once the socket is up: login, transfer type, data
//! connection mode and the initial directory.

use std::fmt;

#[cfg(feature = "secure")]
use openssl::ssl::SslConnector;

use super::config::FtpConfig;
use super::ftp::FtpStream;
use super::types::Result;

pub const DEFAULT_PORT: u16 = 21;

const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous@";

/// How the control connection is protected.
#[derive(Clone)]
pub enum Security {
    Plain,
    /// Explicit FTPS: `AUTH TLS` right after the greeting.
    #[cfg(feature = "secure")]
    Tls(SslConnector),
}

impl fmt::Debug for Security {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Security::Plain => f.write_str("Plain"),
            #[cfg(feature = "secure")]
            Security::Tls(_) => f.write_str("Tls"),
        }
    }
}

/// Where and as whom to connect.
#[derive(Clone)]
pub struct Connection {
    host: String,
    port: u16,
    user: String,
    password: String,
    security: Security,
}

impl Connection {
    pub fn plain<S: Into<String>>(host: S, port: u16, user: S, password: S) -> Connection {
        Connection {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            security: Security::Plain,
        }
    }

    /// Logs in as `anonymous` with the conventional `anonymous@` password.
    pub fn anonymous<S: Into<String>>(host: S, port: u16) -> Connection {
        Connection::plain(host.into(), port, ANONYMOUS_USER.to_string(), ANONYMOUS_PASSWORD.to_string())
    }

    /// The certificate is checked against `host`.
    #[cfg(feature = "secure")]
    pub fn secure<S: Into<String>>(host: S, port: u16, user: S, password: S, connector: SslConnector) -> Connection {
        Connection {
            security: Security::Tls(connector),
            ..Connection::plain(host, port, user, password)
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn security(&self) -> &Security {
        &self.security
    }

    pub fn is_anonymous(&self) -> bool {
        self.user == ANONYMOUS_USER
    }

    /// Connects, secures the channel if asked to, then logs in.
    pub fn open(&self, config: &FtpConfig) -> Result<FtpStream> {
        info!("connecting to {}:{} as {}", self.host, self.port, self.user);
        let stream = FtpStream::connect_timeout((self.host.as_str(), self.port), config.timeout)?;
        let stream = match &self.security {
            Security::Plain => stream,
            #[cfg(feature = "secure")]
            Security::Tls(connector) => stream.into_secure(connector.clone(), &self.host)?,
        };
        self.after_connect(stream, config)
    }

    fn after_connect(&self, mut stream: FtpStream, config: &FtpConfig) -> Result<FtpStream> {
        stream.login(&self.user, &self.password)?;
        stream.transfer_type(config.file_type.clone())?;
        stream.set_mode(config.mode());
        stream.set_chunk_size(config.chunk_size);
        if let Some(directory) = &config.initial_directory {
            stream.cwd(directory)?;
        }
        debug!("{}:{} ready", self.host, self.port);
        Ok(stream)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"******")
            .field("security", &self.security)
            .finish()
    }
}
