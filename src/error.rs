//! Error types and the closed error-code taxonomy
//!
//! Every step of the submission dialogue fails with its own [`ErrorCode`],
//! with a separate code where a timeout is distinguishable from a send or
//! receive failure. Unexpected server replies keep their SMTP status code and
//! are surfaced verbatim through [`Error::code`].

use std::{error::Error as StdError, fmt};

use crate::{response::Code, BoxError};

/// Error returned when constructing or reconfiguring a client with invalid
/// arguments, distinct from the runtime codes of [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The server name was empty or whitespace-only
    #[error("server name cannot be empty")]
    EmptyServerName,
}

/// The closed, stable error-code enumeration
///
/// Values are negative and never overlap SMTP status codes, so an `i32`
/// holding either kind is unambiguous. Codes are grouped by dialogue phase
/// with numbering gaps between groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// The platform socket library could not be started
    SocketStartup = -1,
    /// The server address could not be resolved
    GetAddrInfo = -2,
    /// The client socket could not be created
    SocketCreation = -3,
    /// The connection attempt failed outright
    Connect = -4,
    /// The connection attempt did not complete within the command timeout
    ConnectTimeout = -5,
    /// The socket file status flags could not be read
    NonBlockingFlagGet = -6,
    /// The socket could not be switched between blocking modes
    NonBlockingFlagSet = -7,
    /// A socket option could not be read
    GetSocketOption = -8,
    /// The connection failed after the socket became writable
    DelayedConnection = -9,
    /// The server host name could not be resolved to an address
    HostResolution = -10,

    /// The EHLO command could not be sent
    SendEhlo = -20,
    /// No reply to EHLO arrived within the command timeout
    SendEhloTimeout = -21,
    /// The TLS handshake with the server failed
    TlsHandshake = -22,

    /// The server rejected the authentication attempt
    Authentication = -30,
    /// The authentication dialogue timed out
    AuthenticationTimeout = -31,
    /// Credentials are set but the server offers no supported mechanism
    AuthMethodNotSupported = -32,

    /// The MAIL FROM command could not be sent
    MailFrom = -40,
    /// No reply to MAIL FROM arrived within the command timeout
    MailFromTimeout = -41,
    /// A RCPT TO command could not be sent
    RcptTo = -42,
    /// No reply to RCPT TO arrived within the command timeout
    RcptToTimeout = -43,

    /// The DATA command could not be sent
    Data = -50,
    /// No reply to DATA arrived within the command timeout
    DataTimeout = -51,
    /// The From header could not be sent
    HeaderFrom = -52,
    /// A To or Cc header could not be sent
    HeaderToCc = -53,
    /// The Subject header could not be sent
    HeaderSubject = -54,
    /// The Content-Type header could not be sent
    HeaderContentType = -55,
    /// The message body could not be sent
    Body = -56,
    /// A chunk of the message body could not be sent
    BodyPart = -57,
    /// The end-of-data sequence could not be sent
    EndData = -58,
    /// No reply to the end-of-data sequence arrived within the command timeout
    EndDataTimeout = -59,
    /// The QUIT command could not be sent
    Quit = -60,
}

impl ErrorCode {
    /// Maps a raw value back into the taxonomy
    pub fn from_code(code: i32) -> Option<ErrorCode> {
        ALL_CODES.iter().copied().find(|c| *c as i32 == code)
    }

    /// The stable human-readable message for this code
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::SocketStartup => "Unable to start the socket library",
            ErrorCode::GetAddrInfo => "Unable to resolve the server address",
            ErrorCode::SocketCreation => "Unable to create the client socket",
            ErrorCode::Connect => "Unable to connect to the server",
            ErrorCode::ConnectTimeout => "Time out while connecting to the server",
            ErrorCode::NonBlockingFlagGet => "Unable to read the socket file status flags",
            ErrorCode::NonBlockingFlagSet => "Unable to change the socket blocking mode",
            ErrorCode::GetSocketOption => "Unable to read the socket options",
            ErrorCode::DelayedConnection => "The connection failed after the socket became writable",
            ErrorCode::HostResolution => "Unable to resolve the server host name",
            ErrorCode::SendEhlo => "Unable to send the EHLO command",
            ErrorCode::SendEhloTimeout => "Time out while waiting for the EHLO reply",
            ErrorCode::TlsHandshake => "The TLS handshake with the server failed",
            ErrorCode::Authentication => "The server rejected the authentication attempt",
            ErrorCode::AuthenticationTimeout => "Time out during the authentication dialogue",
            ErrorCode::AuthMethodNotSupported => {
                "No supported authentication method is available on the server"
            }
            ErrorCode::MailFrom => "Unable to send the MAIL FROM command",
            ErrorCode::MailFromTimeout => "Time out while waiting for the MAIL FROM reply",
            ErrorCode::RcptTo => "Unable to send the RCPT TO command",
            ErrorCode::RcptToTimeout => "Time out while waiting for the RCPT TO reply",
            ErrorCode::Data => "Unable to send the DATA command",
            ErrorCode::DataTimeout => "Time out while waiting for the DATA reply",
            ErrorCode::HeaderFrom => "Unable to send the From header",
            ErrorCode::HeaderToCc => "Unable to send the To or Cc header",
            ErrorCode::HeaderSubject => "Unable to send the Subject header",
            ErrorCode::HeaderContentType => "Unable to send the Content-Type header",
            ErrorCode::Body => "Unable to send the message body",
            ErrorCode::BodyPart => "Unable to send a chunk of the message body",
            ErrorCode::EndData => "Unable to send the end-of-data sequence",
            ErrorCode::EndDataTimeout => "Time out while waiting for the end-of-data reply",
            ErrorCode::Quit => "Unable to send the QUIT command",
        }
    }

    /// Tells if this code reports an elapsed command timeout
    pub fn is_timeout(self) -> bool {
        matches!(
            self,
            ErrorCode::ConnectTimeout
                | ErrorCode::SendEhloTimeout
                | ErrorCode::AuthenticationTimeout
                | ErrorCode::MailFromTimeout
                | ErrorCode::RcptToTimeout
                | ErrorCode::DataTimeout
                | ErrorCode::EndDataTimeout
        )
    }
}

const ALL_CODES: &[ErrorCode] = &[
    ErrorCode::SocketStartup,
    ErrorCode::GetAddrInfo,
    ErrorCode::SocketCreation,
    ErrorCode::Connect,
    ErrorCode::ConnectTimeout,
    ErrorCode::NonBlockingFlagGet,
    ErrorCode::NonBlockingFlagSet,
    ErrorCode::GetSocketOption,
    ErrorCode::DelayedConnection,
    ErrorCode::HostResolution,
    ErrorCode::SendEhlo,
    ErrorCode::SendEhloTimeout,
    ErrorCode::TlsHandshake,
    ErrorCode::Authentication,
    ErrorCode::AuthenticationTimeout,
    ErrorCode::AuthMethodNotSupported,
    ErrorCode::MailFrom,
    ErrorCode::MailFromTimeout,
    ErrorCode::RcptTo,
    ErrorCode::RcptToTimeout,
    ErrorCode::Data,
    ErrorCode::DataTimeout,
    ErrorCode::HeaderFrom,
    ErrorCode::HeaderToCc,
    ErrorCode::HeaderSubject,
    ErrorCode::HeaderContentType,
    ErrorCode::Body,
    ErrorCode::BodyPart,
    ErrorCode::EndData,
    ErrorCode::EndDataTimeout,
    ErrorCode::Quit,
];

const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error code";

/// Resolves an error code to an owned human-readable message
///
/// Accepts any `i32`; values outside the taxonomy resolve to a fixed
/// "unknown" message.
pub fn error_message(code: i32) -> String {
    ErrorCode::from_code(code)
        .map(ErrorCode::message)
        .unwrap_or(UNKNOWN_ERROR_MESSAGE)
        .to_owned()
}

/// Resolves an error code into a caller-supplied buffer as a NUL-terminated
/// C string
///
/// Returns `-1` when the buffer is empty, `buffer.len() - 1` when the message
/// had to be truncated to fit, and `0` otherwise.
pub fn error_message_r(code: i32, buffer: &mut [u8]) -> i32 {
    if buffer.is_empty() {
        return -1;
    }
    let message = ErrorCode::from_code(code)
        .map(ErrorCode::message)
        .unwrap_or(UNKNOWN_ERROR_MESSAGE)
        .as_bytes();
    let capacity = buffer.len() - 1;
    if message.len() > capacity {
        buffer[..capacity].copy_from_slice(&message[..capacity]);
        buffer[capacity] = 0;
        capacity as i32
    } else {
        buffer[..message.len()].copy_from_slice(message);
        buffer[message.len()] = 0;
        0
    }
}

/// The errors that may occur while submitting a message
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
}

pub(crate) enum Kind {
    /// A step of the dialogue failed on the client side
    Step(ErrorCode),
    /// The server answered with an unexpected status code
    Smtp(Code),
    /// A server reply could not be parsed
    Response,
}

impl Error {
    fn new(kind: Kind, source: Option<BoxError>) -> Error {
        Error {
            inner: Box::new(Inner { kind, source }),
        }
    }

    /// The numeric surface of this error: the negative taxonomy value for a
    /// client-side step failure, the verbatim SMTP status code for an
    /// unexpected server reply, `-1` for an unparseable reply
    pub fn code(&self) -> i32 {
        match self.inner.kind {
            Kind::Step(code) => code as i32,
            Kind::Smtp(code) => i32::from(code.value()),
            Kind::Response => -1,
        }
    }

    /// The taxonomy code, when the failure happened on the client side
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self.inner.kind {
            Kind::Step(code) => Some(code),
            _ => None,
        }
    }

    /// The server status code, when the server replied unexpectedly
    pub fn smtp_code(&self) -> Option<Code> {
        match self.inner.kind {
            Kind::Smtp(code) => Some(code),
            _ => None,
        }
    }

    /// Tells if the error reports an elapsed command timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self.inner.kind, Kind::Step(code) if code.is_timeout())
    }

    /// The OS error number of the underlying socket failure, if any
    pub fn os_error(&self) -> Option<i32> {
        let mut source = StdError::source(self);
        while let Some(err) = source {
            if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
                return io_err.raw_os_error();
            }
            source = err.source();
        }
        None
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("missive::Error");
        match self.inner.kind {
            Kind::Step(code) => builder.field("code", &code),
            Kind::Smtp(code) => builder.field("smtp", &code.value()),
            Kind::Response => builder.field("kind", &"Response"),
        };
        if let Some(source) = &self.inner.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::Step(code) => write!(f, "{} ({})", code.message(), code as i32)?,
            Kind::Smtp(code) => write!(f, "unexpected server reply ({code})")?,
            Kind::Response => f.write_str("could not parse the server reply")?,
        }
        if let Some(source) = &self.inner.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| {
            let source: &(dyn StdError + 'static) = &**e;
            source
        })
    }
}

pub(crate) fn step(code: ErrorCode) -> Error {
    Error::new(Kind::Step(code), None)
}

pub(crate) fn step_with<E: Into<BoxError>>(code: ErrorCode, source: E) -> Error {
    Error::new(Kind::Step(code), Some(source.into()))
}

pub(crate) fn smtp(code: Code, text: Option<String>) -> Error {
    Error::new(Kind::Smtp(code), text.map(Into::into))
}

pub(crate) fn response<E: Into<BoxError>>(source: E) -> Error {
    Error::new(Kind::Response, Some(source.into()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_codes_are_negative_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for code in ALL_CODES {
            let value = *code as i32;
            assert!(value < 0, "{code:?} must be negative");
            assert!(seen.insert(value), "{code:?} value {value} is duplicated");
        }
    }

    #[test]
    fn test_from_code_round_trip() {
        for code in ALL_CODES {
            assert_eq!(ErrorCode::from_code(*code as i32), Some(*code));
        }
        assert_eq!(ErrorCode::from_code(0), None);
        assert_eq!(ErrorCode::from_code(-999), None);
        assert_eq!(ErrorCode::from_code(250), None);
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(ErrorCode::ConnectTimeout as i32),
            "Time out while connecting to the server"
        );
        assert_eq!(error_message(-999), "Unknown error code");
    }

    #[test]
    fn test_error_message_r_fits() {
        let mut buffer = [0u8; 64];
        let written = error_message_r(ErrorCode::Quit as i32, &mut buffer);
        assert_eq!(written, 0);
        let end = buffer.iter().position(|b| *b == 0).unwrap();
        assert_eq!(&buffer[..end], b"Unable to send the QUIT command");
    }

    #[test]
    fn test_error_message_r_truncates() {
        let mut buffer = [0u8; 8];
        let written = error_message_r(ErrorCode::Quit as i32, &mut buffer);
        assert_eq!(written, 7);
        assert_eq!(&buffer[..7], b"Unable ");
        assert_eq!(buffer[7], 0);
    }

    #[test]
    fn test_error_message_r_empty_buffer() {
        let mut buffer = [0u8; 0];
        assert_eq!(error_message_r(ErrorCode::Quit as i32, &mut buffer), -1);
    }

    #[test]
    fn test_error_code_surface() {
        let step_error = step(ErrorCode::MailFromTimeout);
        assert_eq!(step_error.code(), -41);
        assert_eq!(step_error.error_code(), Some(ErrorCode::MailFromTimeout));
        assert!(step_error.is_timeout());
        assert_eq!(step_error.smtp_code(), None);

        let smtp_error = smtp(Code::new(550), Some("no such user".to_owned()));
        assert_eq!(smtp_error.code(), 550);
        assert_eq!(smtp_error.error_code(), None);
        assert_eq!(smtp_error.smtp_code(), Some(Code::new(550)));
        assert!(!smtp_error.is_timeout());
    }

    #[test]
    fn test_error_display() {
        let error = step(ErrorCode::TlsHandshake);
        assert_eq!(
            error.to_string(),
            "The TLS handshake with the server failed (-22)"
        );

        let rejected = smtp(Code::new(550), Some("no such user".to_owned()));
        assert_eq!(
            rejected.to_string(),
            "unexpected server reply (550): no such user"
        );
    }
}
