//! FTP module.

use std::fs::{File, OpenOptions};
use std::io::{self, copy, BufRead, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::time::Duration;

use chrono::offset::TimeZone;
use chrono::{DateTime, NaiveDate, Utc};
#[cfg(feature = "secure")]
use openssl::ssl::SslConnector;
use regex::Regex;

use super::data_stream::DataStream;
use super::status;
use super::transport::{TransferDirection, TransferRequest, TransferStatus, Transport};
use super::types::{FileType, FtpError, Line, Result};

lazy_static! {
    // This regex extracts IP and Port details from PASV command response.
    // The regex looks for the pattern (h1,h2,h3,h4,p1,p2).
    static ref PORT_RE: Regex = Regex::new(r"\((\d+),(\d+),(\d+),(\d+),(\d+),(\d+)\)").unwrap();

    // This regex extracts modification time from MDTM command response.
    static ref MDTM_RE: Regex = Regex::new(r"\b(\d{4})(\d{2})(\d{2})(\d{2})(\d{2})(\d{2})\b").unwrap();

    // This regex extracts file size from SIZE command response.
    static ref SIZE_RE: Regex = Regex::new(r"\s+(\d+)\s*$").unwrap();
}

/// Bytes moved by each step of a non-blocking transfer unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

const TRANSFER_COMPLETE: [u32; 2] = [status::CLOSING_DATA_CONNECTION, status::REQUESTED_FILE_ACTION_OK];
const TRANSFER_STARTING: [u32; 2] = [status::ABOUT_TO_SEND, status::ALREADY_OPEN];

/// Who opens the data connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The client connects to the address given by `PASV`.
    Passive,
    /// The server connects back to the address given by `PORT`.
    Active,
}

#[cfg(feature = "secure")]
#[derive(Debug, Clone)]
struct TlsSetup {
    connector: SslConnector,
    domain: String,
}

/// A transfer started by `start_transfer` and driven by `continue_transfer`.
#[derive(Debug)]
struct PendingTransfer {
    direction: TransferDirection,
    data: DataStream,
    local: File,
    buffer: Vec<u8>,
}

impl PendingTransfer {
    /// Moves one chunk, `Ok(0)` once the source is exhausted.
    fn step(&mut self) -> io::Result<usize> {
        match self.direction {
            TransferDirection::Download => {
                let n = self.data.read(&mut self.buffer)?;
                self.local.write_all(&self.buffer[..n])?;
                Ok(n)
            }
            TransferDirection::Upload => {
                let n = self.local.read(&mut self.buffer)?;
                if n == 0 {
                    self.data.flush()?;
                } else {
                    self.data.write_all(&self.buffer[..n])?;
                }
                Ok(n)
            }
        }
    }
}

/// Stream to interface with the FTP server. This interface is only for the command stream.
#[derive(Debug)]
pub struct FtpStream {
    reader: BufReader<DataStream>,
    mode: Mode,
    data_timeout: Option<Duration>,
    chunk_size: usize,
    pending: Option<PendingTransfer>,
    position: u64,
    #[cfg(feature = "secure")]
    tls: Option<TlsSetup>,
}

impl FtpStream {
    /// Creates an FTP Stream.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<FtpStream> {
        let stream = TcpStream::connect(addr)?;
        FtpStream::greet(stream)
    }

    /// Creates an FTP Stream, giving up on each address after `timeout`.
    /// The timeout also applies to every read and write on the sockets.
    pub fn connect_timeout<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<FtpStream> {
        let mut last_error = None;
        for addr in addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    let mut ftp_stream = FtpStream::greet(stream)?;
                    ftp_stream.data_timeout = Some(timeout);
                    return Ok(ftp_stream);
                }
                Err(err) => last_error = Some(err),
            }
        }
        Err(FtpError::ConnectionError(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "could not resolve to any address")
        })))
    }

    fn greet(stream: TcpStream) -> Result<FtpStream> {
        let mut ftp_stream = FtpStream {
            reader: BufReader::new(DataStream::Tcp(stream)),
            mode: Mode::Passive,
            data_timeout: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            pending: None,
            position: 0,
            #[cfg(feature = "secure")]
            tls: None,
        };
        ftp_stream.read_response(status::READY)?;
        Ok(ftp_stream)
    }

    /// Switch to a secure mode if possible, using a provided SSL configuration.
    ///
    /// ## Example
    ///
    /// ```rust,no_run
    /// use ftp_toolkit::FtpStream;
    /// use openssl::ssl::{SslConnector, SslMethod};
    ///
    /// let connector = SslConnector::builder(SslMethod::tls()).unwrap().build();
    /// let ftp_stream = FtpStream::connect("127.0.0.1:21").unwrap();
    /// let mut ftp_stream = ftp_stream.into_secure(connector, "localhost").unwrap();
    /// ```
    #[cfg(feature = "secure")]
    pub fn into_secure(mut self, connector: SslConnector, domain: &str) -> Result<FtpStream> {
        // Ask the server to start securing data.
        self.write_str("AUTH TLS\r\n")?;
        self.read_response(status::AUTH_OK)?;
        let tcp = self.reader.into_inner().into_tcp_stream()?;
        let stream = connector
            .connect(domain, tcp)
            .map_err(|e| FtpError::SecureError(e.to_string()))?;

        let mut secured_ftp_stream = FtpStream {
            reader: BufReader::new(DataStream::Ssl(stream)),
            tls: Some(TlsSetup {
                connector,
                domain: domain.to_string(),
            }),
            ..self
        };
        // Set protection buffer size
        secured_ftp_stream.write_str("PBSZ 0\r\n")?;
        secured_ftp_stream.read_response(status::COMMAND_OK)?;
        // Change the level of data protection to Private
        secured_ftp_stream.write_str("PROT P\r\n")?;
        secured_ftp_stream.read_response(status::COMMAND_OK)?;
        Ok(secured_ftp_stream)
    }

    /// Switch to insecure mode. If the connection is already
    /// insecure does nothing.
    #[cfg(feature = "secure")]
    pub fn into_insecure(mut self) -> Result<FtpStream> {
        if self.tls.is_none() {
            return Ok(self);
        }
        // Ask the server to stop securing data
        self.write_str("CCC\r\n")?;
        self.read_response(status::COMMAND_OK)?;
        let tcp = self.reader.into_inner().into_tcp_stream()?;
        Ok(FtpStream {
            reader: BufReader::new(DataStream::Tcp(tcp)),
            tls: None,
            ..self
        })
    }

    /// Selects passive or active data connections.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Read and write timeout for the data connections.
    pub fn set_data_timeout(&mut self, timeout: Option<Duration>) {
        self.data_timeout = timeout;
    }

    /// Bytes moved by each `continue_transfer` call.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size.max(1);
    }

    /// Execute command which send data back in a separate stream.
    /// The preliminary reply (`open_codes`) has been read when this returns.
    fn data_command(&mut self, cmd: &str, open_codes: &[u32]) -> Result<DataStream> {
        let stream = match self.mode {
            Mode::Passive => {
                let addr = self.pasv()?;
                self.write_str(cmd)?;
                let stream = TcpStream::connect(addr)?;
                self.read_response_in(open_codes)?;
                stream
            }
            Mode::Active => {
                let listener = self.port()?;
                self.write_str(cmd)?;
                self.read_response_in(open_codes)?;
                let (stream, _) = listener.accept()?;
                stream
            }
        };
        let data_stream = self.wrap_data_stream(stream)?;
        data_stream.set_timeout(self.data_timeout)?;
        Ok(data_stream)
    }

    #[cfg(not(feature = "secure"))]
    fn wrap_data_stream(&self, stream: TcpStream) -> Result<DataStream> {
        Ok(DataStream::Tcp(stream))
    }

    #[cfg(feature = "secure")]
    fn wrap_data_stream(&self, stream: TcpStream) -> Result<DataStream> {
        match self.tls {
            Some(ref tls) => tls
                .connector
                .connect(&tls.domain, stream)
                .map(DataStream::Ssl)
                .map_err(|e| FtpError::SecureError(e.to_string())),
            None => Ok(DataStream::Tcp(stream)),
        }
    }

    /// Returns a reference to the underlying TcpStream.
    pub fn get_ref(&self) -> &TcpStream {
        self.reader.get_ref().get_ref()
    }

    /// Log in to the FTP server.
    pub fn login(&mut self, user: &str, password: &str) -> Result<()> {
        self.write_str(format!("USER {}\r\n", user))?;
        let Line(code, _) = self.read_response_in(&[status::LOGGED_IN, status::NEED_PASSWORD])?;
        if code == status::NEED_PASSWORD {
            self.write_str(format!("PASS {}\r\n", password))?;
            self.read_response(status::LOGGED_IN)?;
        }
        Ok(())
    }

    /// Change the current directory to the path specified.
    pub fn cwd(&mut self, path: &str) -> Result<()> {
        self.write_str(format!("CWD {}\r\n", path))?;
        self.read_response(status::REQUESTED_FILE_ACTION_OK).map(|_| ())
    }

    /// Move the current directory to the parent directory.
    pub fn cdup(&mut self) -> Result<()> {
        self.write_str("CDUP\r\n")?;
        self.read_response_in(&[status::COMMAND_OK, status::REQUESTED_FILE_ACTION_OK])
            .map(|_| ())
    }

    /// Gets the current directory
    pub fn pwd(&mut self) -> Result<String> {
        self.write_str("PWD\r\n")?;
        let Line(_, content) = self.read_response(status::PATH_CREATED)?;
        match (content.find('"'), content.rfind('"')) {
            (Some(begin), Some(end)) if begin < end => Ok(content[begin + 1..end].to_string()),
            _ => Err(FtpError::InvalidResponse(format!("Invalid PWD Response: {}", content))),
        }
    }

    /// This does nothing. This is usually just used to keep the connection open.
    pub fn noop(&mut self) -> Result<()> {
        self.write_str("NOOP\r\n")?;
        self.read_response(status::COMMAND_OK).map(|_| ())
    }

    /// This creates a new directory on the server.
    pub fn mkdir(&mut self, pathname: &str) -> Result<()> {
        self.write_str(format!("MKD {}\r\n", pathname))?;
        self.read_response_in(&[status::PATH_CREATED, status::REQUESTED_FILE_ACTION_OK])
            .map(|_| ())
    }

    /// Runs the PASV command.
    fn pasv(&mut self) -> Result<SocketAddr> {
        self.write_str("PASV\r\n")?;
        // PASV response format : 227 Entering Passive Mode (h1,h2,h3,h4,p1,p2).
        let Line(_, line) = self.read_response(status::PASSIVE_MODE)?;
        let invalid = || FtpError::InvalidResponse(format!("Invalid PASV response: {}", line));
        let caps = PORT_RE.captures(&line).ok_or_else(invalid)?;
        let mut numbers = [0u8; 6];
        for (i, number) in numbers.iter_mut().enumerate() {
            *number = caps[i + 1].parse().map_err(|_| invalid())?;
        }
        let port = (u16::from(numbers[4]) << 8) + u16::from(numbers[5]);
        let addr = format!("{}.{}.{}.{}:{}", numbers[0], numbers[1], numbers[2], numbers[3], port);
        Ok(SocketAddr::from_str(&addr)?)
    }

    /// Runs the PORT command on a fresh listener bound next to the control connection.
    fn port(&mut self) -> Result<TcpListener> {
        let ip = self.get_ref().local_addr()?.ip();
        let octets = match ip {
            IpAddr::V4(v4) => v4.octets(),
            IpAddr::V6(_) => {
                return Err(FtpError::FeatureUnsupported(
                    "active mode needs an IPv4 control connection".to_string(),
                ))
            }
        };
        let listener = TcpListener::bind((ip, 0))?;
        let port = listener.local_addr()?.port();
        self.write_str(format!(
            "PORT {},{},{},{},{},{}\r\n",
            octets[0],
            octets[1],
            octets[2],
            octets[3],
            port >> 8,
            port & 0xff
        ))?;
        self.read_response(status::COMMAND_OK)?;
        Ok(listener)
    }

    /// Sets the type of file to be transferred. That is the implementation
    /// of `TYPE` command.
    pub fn transfer_type(&mut self, file_type: FileType) -> Result<()> {
        self.write_str(format!("TYPE {}\r\n", file_type))?;
        self.read_response(status::COMMAND_OK).map(|_| ())
    }

    /// Quits the current FTP session.
    pub fn quit(&mut self) -> Result<()> {
        self.write_str("QUIT\r\n")?;
        self.read_response(status::CLOSING).map(|_| ())
    }

    /// Renames the file from_name to to_name
    pub fn rename(&mut self, from_name: &str, to_name: &str) -> Result<()> {
        self.write_str(format!("RNFR {}\r\n", from_name))?;
        self.read_response(status::REQUEST_FILE_PENDING)?;
        self.write_str(format!("RNTO {}\r\n", to_name))?;
        self.read_response(status::REQUESTED_FILE_ACTION_OK).map(|_| ())
    }

    /// Sets the byte offset the next `RETR`, `STOR` or `APPE` starts from.
    pub fn rest(&mut self, offset: u64) -> Result<()> {
        self.write_str(format!("REST {}\r\n", offset))?;
        self.read_response(status::REQUEST_FILE_PENDING).map(|_| ())
    }

    /// The implementation of `RETR` command where `filename` is the name of the file
    /// to download from FTP and `reader` is the function which operates with the
    /// data stream opened.
    ///
    /// ```no_run
    /// # use ftp_toolkit::{FtpStream, FtpError};
    /// # let mut conn = FtpStream::connect("127.0.0.1:21").unwrap();
    /// let text = conn.retr("retr.txt", |stream| {
    ///     let mut buf = String::new();
    ///     stream.read_to_string(&mut buf).map(|_| buf).map_err(FtpError::ConnectionError)
    /// }).unwrap();
    /// ```
    pub fn retr<F, T>(&mut self, filename: &str, reader: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Read) -> Result<T>,
    {
        let retr_command = format!("RETR {}\r\n", filename);
        let res = {
            let mut data_stream = BufReader::new(self.data_command(&retr_command, &TRANSFER_STARTING)?);
            reader(&mut data_stream)?
        };
        self.read_response_in(&TRANSFER_COMPLETE).map(|_| res)
    }

    /// Simple way to retr a file from the server. This stores the file in memory.
    pub fn simple_retr(&mut self, file_name: &str) -> Result<Cursor<Vec<u8>>> {
        self.retr(file_name, |reader| {
            let mut buffer = Vec::new();
            reader.read_to_end(&mut buffer)?;
            Ok(Cursor::new(buffer))
        })
    }

    /// Removes the remote pathname from the server.
    pub fn rmdir(&mut self, pathname: &str) -> Result<()> {
        self.write_str(format!("RMD {}\r\n", pathname))?;
        self.read_response(status::REQUESTED_FILE_ACTION_OK).map(|_| ())
    }

    /// Remove the remote file from the server.
    pub fn rm(&mut self, filename: &str) -> Result<()> {
        self.write_str(format!("DELE {}\r\n", filename))?;
        self.read_response(status::REQUESTED_FILE_ACTION_OK).map(|_| ())
    }

    /// Send `STOR` and return a writer to the file created on the server.
    /// The writer must be dropped and the closing reply read with
    /// `read_response_in` afterwards.
    pub fn put_with_stream(&mut self, filename: &str) -> Result<BufWriter<DataStream>> {
        let stor_command = format!("STOR {}\r\n", filename);
        Ok(BufWriter::new(self.data_command(&stor_command, &TRANSFER_STARTING)?))
    }

    fn upload_command<R: Read + ?Sized>(&mut self, command: &str, r: &mut R) -> Result<u64> {
        let written = {
            let mut data_stream = BufWriter::new(self.data_command(command, &TRANSFER_STARTING)?);
            let written = copy(r, &mut data_stream)?;
            data_stream.flush()?;
            written
        };
        self.read_response_in(&TRANSFER_COMPLETE).map(|_| written)
    }

    /// This stores a file on the server.
    pub fn put<R: Read>(&mut self, filename: &str, r: &mut R) -> Result<()> {
        self.upload_command(&format!("STOR {}\r\n", filename), r).map(|_| ())
    }

    /// Appends the content of `r` to a file on the server, creating it if needed.
    pub fn appe<R: Read>(&mut self, filename: &str, r: &mut R) -> Result<()> {
        self.upload_command(&format!("APPE {}\r\n", filename), r).map(|_| ())
    }

    /// Execute a command which returns list of strings in a separate stream
    fn list_command(&mut self, cmd: &str) -> Result<Vec<String>> {
        let mut raw = Vec::new();
        {
            let mut data_stream = self.data_command(cmd, &TRANSFER_STARTING)?;
            data_stream.read_to_end(&mut raw)?;
        }
        self.read_response_in(&TRANSFER_COMPLETE)?;
        Ok(String::from_utf8_lossy(&raw).lines().map(String::from).collect())
    }

    /// Execute `LIST` command which returns the detailed file listing in human readable format.
    /// If `pathname` is omited then the list of files in the current directory will be
    /// returned otherwise it will the list of files on `pathname`.
    pub fn list(&mut self, pathname: Option<&str>) -> Result<Vec<String>> {
        let command = pathname.map_or("LIST\r\n".to_string(), |path| format!("LIST {}\r\n", path));
        self.list_command(&command)
    }

    /// `LIST -R`: entries of every subdirectory, each block preceded by a
    /// `path:` line.
    pub fn list_recursive(&mut self, pathname: Option<&str>) -> Result<Vec<String>> {
        let command = pathname.map_or("LIST -R\r\n".to_string(), |path| format!("LIST -R {}\r\n", path));
        self.list_command(&command)
    }

    /// Execute `NLST` command which returns the list of file names only.
    /// If `pathname` is omited then the list of files in the current directory will be
    /// returned otherwise it will the list of files on `pathname`.
    pub fn nlst(&mut self, pathname: Option<&str>) -> Result<Vec<String>> {
        let command = pathname.map_or("NLST\r\n".to_string(), |path| format!("NLST {}\r\n", path));
        self.list_command(&command)
    }

    /// Retrieves the modification time of the file at `pathname` if it exists.
    /// In case the file does not exist `None` is returned.
    pub fn mdtm(&mut self, pathname: &str) -> Result<Option<DateTime<Utc>>> {
        self.write_str(format!("MDTM {}\r\n", pathname))?;
        let Line(_, content) = self.read_response(status::FILE)?;
        Ok(parse_mdtm(&content))
    }

    /// Retrieves the size of the file in bytes at `pathname` if it exists.
    /// In case the file does not exist `None` is returned.
    pub fn size(&mut self, pathname: &str) -> Result<Option<u64>> {
        self.write_str(format!("SIZE {}\r\n", pathname))?;
        let Line(_, content) = self.read_response(status::FILE)?;
        Ok(SIZE_RE.captures(&content).and_then(|caps| caps[1].parse().ok()))
    }

    /// Features advertised in the `FEAT` reply, one per line.
    pub fn feat(&mut self) -> Result<Vec<String>> {
        self.write_str("FEAT\r\n")?;
        let lines = self.read_lines()?;
        let code = reply_code(&lines[0])?;
        if code != status::SYSTEM {
            return Err(FtpError::UnexpectedResponse(Line(code, lines[lines.len() - 1].clone())));
        }
        Ok(lines
            .iter()
            .skip(1)
            .take(lines.len().saturating_sub(2))
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    /// Sends `command` as is and returns every line of the reply, without
    /// looking at the code.
    pub fn raw(&mut self, command: &str) -> Result<Vec<String>> {
        self.write_str(format!("{}\r\n", command))?;
        self.read_lines()
    }

    /// Opens the data connection and the local file for a transfer that is
    /// then moved chunk by chunk with `continue_transfer`.
    pub fn start_transfer(&mut self, request: TransferRequest) -> Result<TransferStatus> {
        if self.pending.is_some() {
            return Err(FtpError::OperationFailed("another transfer is in progress".to_string()));
        }
        self.transfer_type(request.file_type.clone())?;
        let source = match request.direction {
            TransferDirection::Download => None,
            TransferDirection::Upload => {
                let mut file = File::open(&request.local)?;
                file.seek(SeekFrom::Start(request.offset))?;
                Some(file)
            }
        };
        if request.offset > 0 {
            self.rest(request.offset)?;
        }
        let command = match request.direction {
            TransferDirection::Download => format!("RETR {}\r\n", request.remote),
            TransferDirection::Upload => format!("STOR {}\r\n", request.remote),
        };
        let data = self.data_command(&command, &TRANSFER_STARTING)?;
        // A download target is only opened once the server accepted RETR.
        let local = match source {
            Some(file) => file,
            None => match open_download_target(&request) {
                Ok(file) => file,
                Err(err) => {
                    drop(data);
                    if let Err(reply) = self.read_response_in(&TRANSFER_COMPLETE) {
                        debug!("aborted RETR {}: {}", request.remote, reply);
                    }
                    return Err(err.into());
                }
            },
        };
        self.position = request.offset;
        self.pending = Some(PendingTransfer {
            direction: request.direction,
            data,
            local,
            buffer: vec![0; self.chunk_size],
        });
        Ok(TransferStatus::MoreData)
    }

    /// Moves the next chunk of the transfer in progress.
    pub fn continue_transfer(&mut self) -> Result<TransferStatus> {
        let pending = self
            .pending
            .as_mut()
            .ok_or_else(|| FtpError::OperationFailed("no transfer in progress".to_string()))?;
        match pending.step() {
            Ok(0) => self.finish_transfer(None),
            Ok(n) => {
                self.position += n as u64;
                Ok(TransferStatus::MoreData)
            }
            Err(err) => self.finish_transfer(Some(err.to_string())),
        }
    }

    fn finish_transfer(&mut self, failure: Option<String>) -> Result<TransferStatus> {
        // Dropping the data connection tells the server an upload is complete.
        self.pending = None;
        match self.read_response_in(&TRANSFER_COMPLETE) {
            Ok(_) => Ok(failure.map_or(TransferStatus::Finished, TransferStatus::Failed)),
            Err(FtpError::UnexpectedResponse(line)) => {
                Ok(TransferStatus::Failed(failure.unwrap_or_else(|| line.to_string())))
            }
            Err(err) => Err(err),
        }
    }

    fn write_str<S: AsRef<str>>(&mut self, command: S) -> Result<()> {
        let command = command.as_ref();
        if command.starts_with("PASS ") {
            debug!("CMD PASS ******");
        } else {
            debug!("CMD {}", command.trim_end());
        }

        let stream = self.reader.get_mut();
        stream.write_all(command.as_bytes())?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(FtpError::ConnectionError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )));
        }
        let line = line.trim_end_matches(&['\r', '\n'][..]).to_string();
        debug!("FTP {}", line);
        Ok(line)
    }

    /// Reads one complete reply. A `xyz-` first line opens a multi-line reply
    /// that ends with the first line starting with `xyz `.
    fn read_lines(&mut self) -> Result<Vec<String>> {
        let first = self.read_line()?;
        let terminator = match first.get(0..4) {
            Some(head) if head.ends_with('-') && head[..3].bytes().all(|b| b.is_ascii_digit()) => {
                Some(format!("{} ", &head[..3]))
            }
            _ => None,
        };
        let mut lines = vec![first];
        if let Some(terminator) = terminator {
            loop {
                let line = self.read_line()?;
                let done = line.starts_with(&terminator) || line == terminator.trim_end();
                lines.push(line);
                if done {
                    break;
                }
            }
        }
        Ok(lines)
    }

    pub fn read_response(&mut self, expected_code: u32) -> Result<Line> {
        self.read_response_in(&[expected_code])
    }

    /// Retrieve a reply and check its code. The returned line is the last
    /// one of the reply.
    pub fn read_response_in(&mut self, expected_code: &[u32]) -> Result<Line> {
        let mut lines = self.read_lines()?;
        let code = reply_code(&lines[0])?;
        let line = Line(code, lines.pop().unwrap_or_default());
        if expected_code.contains(&code) {
            Ok(line)
        } else {
            Err(FtpError::UnexpectedResponse(line))
        }
    }
}

fn open_download_target(request: &TransferRequest) -> io::Result<File> {
    if request.offset > 0 {
        OpenOptions::new().append(true).open(&request.local)
    } else {
        File::create(&request.local)
    }
}

fn reply_code(line: &str) -> Result<u32> {
    line.get(0..3)
        .filter(|_| line.len() >= 4)
        .ok_or_else(|| FtpError::InvalidResponse("error: could not read reply code".to_string()))?
        .parse()
        .map_err(|err| FtpError::InvalidResponse(format!("error: could not parse reply code: {}", err)))
}

fn parse_mdtm(content: &str) -> Option<DateTime<Utc>> {
    let caps = MDTM_RE.captures(content)?;
    let field = |i: usize| caps[i].parse::<u32>().ok();
    let date = NaiveDate::from_ymd_opt(caps[1].parse().ok()?, field(2)?, field(3)?)?;
    let time = date.and_hms_opt(field(4)?, field(5)?, field(6)?)?;
    Some(Utc.from_utc_datetime(&time))
}

impl Transport for FtpStream {
    fn send_command(&mut self, command: &str) -> Result<Vec<String>> {
        self.raw(command)
    }

    fn list_directory(&mut self, path: &str, recursive: bool) -> Result<Vec<String>> {
        let path = Some(path).filter(|p| !p.is_empty());
        if recursive {
            self.list_recursive(path)
        } else {
            self.list(path)
        }
    }

    fn name_list(&mut self, path: &str) -> Result<Vec<String>> {
        self.nlst(Some(path).filter(|p| !p.is_empty()))
    }

    fn start_transfer(&mut self, request: TransferRequest) -> Result<TransferStatus> {
        FtpStream::start_transfer(self, request)
    }

    fn continue_transfer(&mut self) -> Result<TransferStatus> {
        FtpStream::continue_transfer(self)
    }

    fn transfer_position(&self) -> u64 {
        self.position
    }

    fn change_directory(&mut self, path: &str) -> Result<()> {
        self.cwd(path)
    }

    fn current_directory(&mut self) -> Result<String> {
        self.pwd()
    }

    fn parent_directory(&mut self) -> Result<()> {
        self.cdup()
    }

    fn create_directory(&mut self, path: &str) -> Result<()> {
        self.mkdir(path)
    }

    fn remove_file(&mut self, path: &str) -> Result<()> {
        self.rm(path)
    }

    fn remove_directory(&mut self, path: &str) -> Result<()> {
        self.rmdir(path)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        FtpStream::rename(self, from, to)
    }

    fn features(&mut self) -> Result<Vec<String>> {
        self.feat()
    }

    fn file_size(&mut self, path: &str) -> Result<Option<u64>> {
        self.size(path)
    }

    fn modification_time(&mut self, path: &str) -> Result<Option<DateTime<Utc>>> {
        self.mdtm(path)
    }

    fn set_transfer_type(&mut self, file_type: FileType) -> Result<()> {
        self.transfer_type(file_type)
    }

    fn retrieve(&mut self, path: &str, offset: u64, sink: &mut dyn Write) -> Result<u64> {
        if offset > 0 {
            self.rest(offset)?;
        }
        self.retr(path, |stream| Ok(copy(stream, sink)?))
    }

    fn store(&mut self, path: &str, offset: u64, source: &mut dyn Read) -> Result<u64> {
        if offset > 0 {
            self.rest(offset)?;
        }
        self.upload_command(&format!("STOR {}\r\n", path), source)
    }

    fn noop(&mut self) -> Result<()> {
        FtpStream::noop(self)
    }
}
