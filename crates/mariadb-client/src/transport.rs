//! Byte-stream transport.
//!
//! A [`Transport`] owns one bidirectional stream and moves raw bytes; it
//! knows nothing about packets. [`Transport::open`] dials the endpoint of a
//! [`ClientConfig`]; [`Transport::new`] wraps any other `Read + Write`
//! stream, such as a TLS wrapper or an in-memory test double.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixStream;

use mariadb_core::Result;
use mariadb_core::error::{ConnectionError, ConnectionErrorKind, Error, IoError};

use crate::config::{ClientConfig, Endpoint};

/// A socket opened by [`Transport::open`].
#[derive(Debug)]
pub enum NetStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for NetStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            NetStream::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            NetStream::Unix(s) => s.read(buf),
        }
    }
}

impl Write for NetStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            NetStream::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            NetStream::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            NetStream::Tcp(s) => s.flush(),
            #[cfg(unix)]
            NetStream::Unix(s) => s.flush(),
        }
    }
}

/// Exclusive owner of one stream.
#[derive(Debug)]
pub struct Transport<S> {
    stream: Option<S>,
}

impl Transport<NetStream> {
    /// Connect to the configured endpoint.
    pub fn open(config: &ClientConfig) -> Result<Self> {
        let stream = match &config.endpoint {
            Endpoint::Tcp { host, port } => NetStream::Tcp(connect_tcp(host, *port, config)?),
            Endpoint::Socket(path) => open_socket(path, config)?,
        };
        tracing::debug!(endpoint = %config.endpoint, "transport opened");
        Ok(Self::new(stream))
    }
}

fn connect_tcp(host: &str, port: u16, config: &ClientConfig) -> Result<TcpStream> {
    let addrs: Vec<_> = (host, port)
        .to_socket_addrs()
        .map_err(|e| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::DnsResolution,
                message: format!("unknown server host '{}': {}", host, e),
                server: None,
                source: Some(Box::new(e)),
            })
        })?
        .collect();

    let mut last_err = None;
    for addr in &addrs {
        let attempt = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                stream.set_read_timeout(config.io_timeout)?;
                stream.set_write_timeout(config.io_timeout)?;
                return Ok(stream);
            }
            Err(e) => {
                tracing::trace!(%addr, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
        }
    }

    let Some(e) = last_err else {
        return Err(Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::DnsResolution,
            message: format!("server host '{}' resolved to no addresses", host),
            server: None,
            source: None,
        }));
    };
    let kind = if e.kind() == io::ErrorKind::ConnectionRefused {
        ConnectionErrorKind::Refused
    } else {
        ConnectionErrorKind::Connect
    };
    Err(Error::Connection(ConnectionError {
        kind,
        message: format!("can't connect to server on '{}:{}': {}", host, port, e),
        server: None,
        source: Some(Box::new(e)),
    }))
}

#[cfg(unix)]
fn open_socket(path: &std::path::Path, config: &ClientConfig) -> Result<NetStream> {
    let stream = UnixStream::connect(path).map_err(|e| {
        Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::LocalSocket,
            message: format!("can't connect through socket '{}': {}", path.display(), e),
            server: None,
            source: Some(Box::new(e)),
        })
    })?;
    stream.set_read_timeout(config.io_timeout)?;
    stream.set_write_timeout(config.io_timeout)?;
    Ok(NetStream::Unix(stream))
}

#[cfg(not(unix))]
fn open_socket(path: &std::path::Path, _config: &ClientConfig) -> Result<NetStream> {
    Err(Error::Unsupported(format!(
        "local socket '{}' is not available on this platform",
        path.display()
    )))
}

fn not_connected() -> Error {
    Error::Io(IoError {
        message: "transport is not connected".to_string(),
        source: io::Error::from(io::ErrorKind::NotConnected),
    })
}

impl<S> Transport<S> {
    /// Take ownership of an already-connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Release the stream. Calling it again is a no-op.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("transport closed");
        }
    }

    /// Give the stream back to the caller.
    pub fn into_inner(mut self) -> Option<S> {
        self.stream.take()
    }
}

impl<S: Read + Write> Transport<S> {
    /// Write all of `bytes` and flush.
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        stream
            .write_all(bytes)
            .and_then(|()| stream.flush())
            .map_err(|e| {
                Error::Io(IoError {
                    message: "failed to write to server".to_string(),
                    source: e,
                })
            })?;
        tracing::trace!(bytes = bytes.len(), "sent");
        Ok(())
    }

    /// Read exactly `len` bytes.
    pub fn receive(&mut self, len: usize) -> Result<Vec<u8>> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf).map_err(|e| {
            let message = if e.kind() == io::ErrorKind::UnexpectedEof {
                "server closed the connection"
            } else {
                "failed to read from server"
            };
            Error::Io(IoError {
                message: message.to_string(),
                source: e,
            })
        })?;
        tracing::trace!(bytes = len, "received");
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::net::TcpListener;

    #[derive(Default)]
    struct Loopback {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Loopback {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Loopback {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn send_and_receive_exact() {
        let stream = Loopback {
            input: Cursor::new(vec![1, 2, 3, 4, 5]),
            output: Vec::new(),
        };
        let mut transport = Transport::new(stream);
        transport.send(b"ping").unwrap();
        assert_eq!(transport.receive(2).unwrap(), vec![1, 2]);
        assert_eq!(transport.receive(3).unwrap(), vec![3, 4, 5]);
        let stream = transport.into_inner().unwrap();
        assert_eq!(stream.output, b"ping");
    }

    #[test]
    fn short_read_is_io_error() {
        let mut transport = Transport::new(Loopback {
            input: Cursor::new(vec![1]),
            output: Vec::new(),
        });
        let err = transport.receive(4).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn closed_transport_rejects_io() {
        let mut transport = Transport::new(Loopback::default());
        transport.close();
        transport.close();
        assert!(!transport.is_open());
        assert!(matches!(transport.send(b"x"), Err(Error::Io(_))));
        assert!(matches!(transport.receive(1), Err(Error::Io(_))));
    }

    #[test]
    fn lifecycle_works_for_any_stream_type() {
        struct Inert;

        let mut transport = Transport::new(Inert);
        assert!(transport.is_open());
        transport.close();
        assert!(!transport.is_open());
        assert!(transport.into_inner().is_none());
    }

    #[test]
    fn open_reaches_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = ClientConfig::new().host("127.0.0.1").port(port);
        let transport = Transport::open(&config).unwrap();
        assert!(transport.is_open());
    }

    #[test]
    fn refused_connection_is_connection_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = ClientConfig::new().host("127.0.0.1").port(port);
        match Transport::open(&config) {
            Err(Error::Connection(c)) => assert_eq!(c.kind, ConnectionErrorKind::Refused),
            other => panic!("expected refused connection, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn missing_socket_is_local_socket_error() {
        let config = ClientConfig::new().socket("/nonexistent/dir/mysql.sock");
        match Transport::open(&config) {
            Err(Error::Connection(c)) => assert_eq!(c.kind, ConnectionErrorKind::LocalSocket),
            other => panic!("expected socket error, got {other:?}"),
        }
    }
}
