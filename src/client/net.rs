//! The network stream under the SMTP dialogue: plain TCP or TLS over TCP,
//! with an in-place STARTTLS upgrade

use std::{
    io::{self, Read, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    time::Duration,
};

use native_tls::{HandshakeError, TlsStream};

use crate::{
    client::tls::TlsParameters,
    error::{self, Error, ErrorCode},
};

/// A stream between the client and the server
#[derive(Debug)]
pub(crate) enum NetworkStream {
    /// Plain TCP
    Plain(TcpStream),
    /// TLS over TCP
    Tls(Box<TlsStream<TcpStream>>),
    /// Placeholder held only while an upgrade is in flight
    Gone,
}

impl NetworkStream {
    /// Opens a TCP connection within the command timeout
    ///
    /// The first resolved address is the only one tried. `connect_timeout`
    /// performs the non-blocking connect, waits for writability and reads
    /// back `SO_ERROR`; an error the kernel parked on the socket after that
    /// is surfaced as a delayed connection failure.
    pub(crate) fn connect(host: &str, port: u16, timeout: Duration) -> Result<NetworkStream, Error> {
        let mut addresses = (host, port)
            .to_socket_addrs()
            .map_err(|e| error::step_with(ErrorCode::GetAddrInfo, e))?;
        let address = addresses
            .next()
            .ok_or_else(|| error::step(ErrorCode::HostResolution))?;

        let stream = TcpStream::connect_timeout(&address, timeout).map_err(|e| {
            if is_timeout(&e) {
                error::step_with(ErrorCode::ConnectTimeout, e)
            } else {
                error::step_with(ErrorCode::Connect, e)
            }
        })?;

        match stream.take_error() {
            Ok(None) => {}
            Ok(Some(e)) => return Err(error::step_with(ErrorCode::DelayedConnection, e)),
            Err(e) => return Err(error::step_with(ErrorCode::GetSocketOption, e)),
        }

        stream
            .set_read_timeout(Some(timeout))
            .and_then(|()| stream.set_write_timeout(Some(timeout)))
            .map_err(|e| error::step_with(ErrorCode::NonBlockingFlagSet, e))?;

        Ok(NetworkStream::Plain(stream))
    }

    /// Opens a connection and performs the TLS handshake before any SMTP
    /// byte is exchanged
    pub(crate) fn connect_tls(
        host: &str,
        port: u16,
        timeout: Duration,
        tls_parameters: &TlsParameters,
    ) -> Result<NetworkStream, Error> {
        let mut stream = Self::connect(host, port, timeout)?;
        stream.upgrade_tls(tls_parameters)?;
        Ok(stream)
    }

    /// Wraps the live socket in TLS in place; a no-op when already encrypted
    pub(crate) fn upgrade_tls(&mut self, tls_parameters: &TlsParameters) -> Result<(), Error> {
        match std::mem::replace(self, NetworkStream::Gone) {
            NetworkStream::Plain(stream) => {
                match tls_parameters
                    .connector
                    .connect(tls_parameters.domain(), stream)
                {
                    Ok(tls_stream) => {
                        *self = NetworkStream::Tls(Box::new(tls_stream));
                        Ok(())
                    }
                    Err(HandshakeError::Failure(e)) => {
                        Err(error::step_with(ErrorCode::TlsHandshake, e))
                    }
                    Err(HandshakeError::WouldBlock(_)) => {
                        Err(error::step(ErrorCode::TlsHandshake))
                    }
                }
            }
            other => {
                *self = other;
                Ok(())
            }
        }
    }

    /// Tells if the stream is currently encrypted
    pub(crate) fn is_encrypted(&self) -> bool {
        matches!(self, NetworkStream::Tls(_))
    }

    fn tcp_ref(&self) -> Option<&TcpStream> {
        match self {
            NetworkStream::Plain(stream) => Some(stream),
            NetworkStream::Tls(stream) => Some(stream.get_ref()),
            NetworkStream::Gone => None,
        }
    }

    /// Closes both directions of the socket; repeated calls are no-ops
    pub(crate) fn shutdown(&mut self) {
        if let Some(stream) = self.tcp_ref() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

impl Read for NetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            NetworkStream::Plain(stream) => stream.read(buf),
            NetworkStream::Tls(stream) => stream.read(buf),
            NetworkStream::Gone => Err(io::ErrorKind::NotConnected.into()),
        }
    }
}

impl Write for NetworkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            NetworkStream::Plain(stream) => stream.write(buf),
            NetworkStream::Tls(stream) => stream.write(buf),
            NetworkStream::Gone => Err(io::ErrorKind::NotConnected.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            NetworkStream::Plain(stream) => stream.flush(),
            NetworkStream::Tls(stream) => stream.flush(),
            NetworkStream::Gone => Err(io::ErrorKind::NotConnected.into()),
        }
    }
}

/// Read/write deadlines surface as `WouldBlock` on POSIX sockets and
/// `TimedOut` on Windows
pub(crate) fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::NetworkStream;
    use crate::error::ErrorCode;

    #[test]
    fn test_connect_unresolvable_host() {
        let err = NetworkStream::connect(
            "smtp.invalid.missive.test.",
            587,
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(
            err.error_code(),
            Some(ErrorCode::GetAddrInfo | ErrorCode::HostResolution)
        ));
    }

    #[test]
    fn test_connect_refused() {
        // Port 1 on loopback is almost certainly closed; a refused connect
        // must not be reported as a timeout.
        let err =
            NetworkStream::connect("127.0.0.1", 1, Duration::from_secs(2)).unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::Connect));
    }
}
