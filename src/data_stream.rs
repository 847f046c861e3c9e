#[cfg(feature = "secure")]
use openssl::ssl::SslStream;

use std::{
    io::{Read, Result, Write},
    net::TcpStream,
    time::Duration,
};

/// Data Stream used for communications
#[derive(Debug)]
pub enum DataStream {
    Tcp(TcpStream),
    #[cfg(feature = "secure")]
    Ssl(SslStream<TcpStream>),
}

#[cfg(feature = "secure")]
impl DataStream {
    /// Unwrap the stream into TcpStream. This method is only used in secure connection.
    pub fn into_tcp_stream(self) -> Result<TcpStream> {
        match self {
            DataStream::Tcp(stream) => Ok(stream),
            DataStream::Ssl(stream) => stream.get_ref().try_clone(),
        }
    }
}

impl DataStream {
    /// Returns a reference to the underlying TcpStream.
    pub fn get_ref(&self) -> &TcpStream {
        match self {
            DataStream::Tcp(stream) => stream,
            #[cfg(feature = "secure")]
            DataStream::Ssl(stream) => stream.get_ref(),
        }
    }

    /// Applies the same read and write timeout to the socket.
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        let socket = self.get_ref();
        socket.set_read_timeout(timeout)?;
        socket.set_write_timeout(timeout)
    }
}

impl Read for DataStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            DataStream::Tcp(stream) => stream.read(buf),
            #[cfg(feature = "secure")]
            DataStream::Ssl(stream) => stream.read(buf),
        }
    }
}

impl Write for DataStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match self {
            DataStream::Tcp(stream) => stream.write(buf),
            #[cfg(feature = "secure")]
            DataStream::Ssl(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self {
            DataStream::Tcp(stream) => stream.flush(),
            #[cfg(feature = "secure")]
            DataStream::Ssl(stream) => stream.flush(),
        }
    }
}
