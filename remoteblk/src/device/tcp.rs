/// std TCP transport for the remote adapter.
///
/// Bridges `std::net::TcpStream` to the `embedded-io` traits the adapter
/// reads and writes through, with a bounded socket timeout. Timeout
/// expiry surfaces as an I/O error, which the adapter reports as a failed
/// transfer — never as a bounds or encoding error.
use std::io;
use std::net::TcpStream;
use std::string::String;
use std::time::Duration;

use super::Transport;

/// Stream-per-request factory over std TCP.
pub struct TcpTransport {
    addr: String,
    timeout: Duration,
}

impl TcpTransport {
    /// `addr` is `host:port`; `timeout` bounds connect-side reads and
    /// writes on every stream handed out.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

impl Transport for TcpTransport {
    type Stream = TcpSocket;
    type Error = io::Error;

    fn connect(&mut self) -> Result<TcpSocket, io::Error> {
        let stream = TcpStream::connect(self.addr.as_str())?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        Ok(TcpSocket { inner: stream })
    }
}

/// A connected socket speaking the embedded-io traits.
pub struct TcpSocket {
    inner: TcpStream,
}

/// I/O error carried across the embedded-io boundary.
#[derive(Debug)]
pub struct SocketError(pub io::Error);

impl embedded_io::Error for SocketError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                embedded_io::ErrorKind::TimedOut
            }
            io::ErrorKind::ConnectionRefused => embedded_io::ErrorKind::ConnectionRefused,
            io::ErrorKind::ConnectionReset => embedded_io::ErrorKind::ConnectionReset,
            io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            io::ErrorKind::NotConnected => embedded_io::ErrorKind::NotConnected,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for TcpSocket {
    type Error = SocketError;
}

impl embedded_io::Read for TcpSocket {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SocketError> {
        io::Read::read(&mut self.inner, buf).map_err(SocketError)
    }
}

impl embedded_io::Write for TcpSocket {
    fn write(&mut self, buf: &[u8]) -> Result<usize, SocketError> {
        io::Write::write(&mut self.inner, buf).map_err(SocketError)
    }

    fn flush(&mut self) -> Result<(), SocketError> {
        io::Write::flush(&mut self.inner).map_err(SocketError)
    }
}
