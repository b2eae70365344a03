//! The SMTP submission client
//!
//! A [`SmtpClient`] targets one `host:port` and submits one message per
//! [`send_mail`](SmtpClient::send_mail) call. The three constructors differ
//! only in transport mode; the conversation engine behind them is shared.
//!
//! Each call opens a fresh session: connect, greeting, EHLO, the optional
//! STARTTLS upgrade, optional authentication, envelope, DATA and QUIT. The
//! transport is released on every exit path, and the full dialogue of the
//! last call stays readable through
//! [`communication_log`](SmtpClient::communication_log).

use std::time::Duration;

use crate::{
    authentication::Credentials,
    error::{ClientError, Error},
    message::Message,
};

mod comlog;
mod commands;
mod connection;
mod mime;
mod net;
mod tls;

use self::{comlog::CommunicationLog, connection::SmtpConnection, tls::TlsParameters};

/// How the connection to the server is secured
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum TransportMode {
    /// Plain TCP, no encryption at any point
    Cleartext,
    /// Start in cleartext and upgrade with STARTTLS when the server offers
    /// it; continue in cleartext when it does not
    Opportunistic,
    /// TLS handshake before any SMTP byte is exchanged; fails when the
    /// handshake fails
    Forced,
}

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// An SMTP submission client bound to one server
///
/// The client owns its credentials and communication log across calls; the
/// network connection and the negotiated capability set live only for the
/// duration of one [`send_mail`](SmtpClient::send_mail).
#[derive(Debug)]
pub struct SmtpClient {
    server_name: String,
    port: u16,
    command_timeout: Duration,
    mode: TransportMode,
    keep_raw_send: bool,
    credentials: Option<Credentials>,
    log: CommunicationLog,
    last_server_response: String,
    last_socket_errno: i32,
}

impl SmtpClient {
    /// Creates a cleartext client
    pub fn new<S: AsRef<str>>(server_name: S, port: u16) -> Result<SmtpClient, ClientError> {
        Self::with_mode(server_name.as_ref(), port, TransportMode::Cleartext)
    }

    /// Creates a client that upgrades with STARTTLS when the server offers it
    pub fn opportunistic<S: AsRef<str>>(
        server_name: S,
        port: u16,
    ) -> Result<SmtpClient, ClientError> {
        Self::with_mode(server_name.as_ref(), port, TransportMode::Opportunistic)
    }

    /// Creates a client performing the TLS handshake on connect
    pub fn forced_tls<S: AsRef<str>>(
        server_name: S,
        port: u16,
    ) -> Result<SmtpClient, ClientError> {
        Self::with_mode(server_name.as_ref(), port, TransportMode::Forced)
    }

    fn with_mode(
        server_name: &str,
        port: u16,
        mode: TransportMode,
    ) -> Result<SmtpClient, ClientError> {
        Ok(SmtpClient {
            server_name: validated_server_name(server_name)?,
            port,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            mode,
            keep_raw_send: false,
            credentials: None,
            log: CommunicationLog::new(),
            last_server_response: String::new(),
            last_socket_errno: 0,
        })
    }

    /// The configured server name
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// The configured server port
    pub fn server_port(&self) -> u16 {
        self.port
    }

    /// The per-command timeout
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// The configured transport mode
    pub fn transport_mode(&self) -> TransportMode {
        self.mode
    }

    /// The configured credentials, if any
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Tells if commands are fired without awaiting their replies
    pub fn keep_using_base_send_commands(&self) -> bool {
        self.keep_raw_send
    }

    /// Replaces the server name; fails on an empty or whitespace-only name
    pub fn set_server_name<S: AsRef<str>>(&mut self, server_name: S) -> Result<(), ClientError> {
        self.server_name = validated_server_name(server_name.as_ref())?;
        Ok(())
    }

    /// Replaces the server port
    pub fn set_server_port(&mut self, port: u16) {
        self.port = port;
    }

    /// Replaces the per-command timeout (default 5 seconds)
    pub fn set_command_timeout(&mut self, timeout: Duration) {
        self.command_timeout = timeout;
    }

    /// Replaces the credentials used for AUTH; the previous value is dropped
    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    /// Fires commands without awaiting their replies
    ///
    /// This is a diagnostic knob for callers driving the dialogue
    /// externally; a regular submission with this flag set cannot observe
    /// server rejections and must not be relied on for correctness.
    pub fn set_keep_using_base_send_commands(&mut self, keep: bool) {
        self.keep_raw_send = keep;
    }

    /// The transcript of the last `send_mail` dialogue
    ///
    /// Client commands are prefixed `c: `, server replies `s: `. AUTH
    /// commands appear redacted; credential bytes are never written here.
    pub fn communication_log(&self) -> &str {
        self.log.as_str()
    }

    /// The last reply received from the server, empty when none arrived
    pub fn last_server_response(&self) -> &str {
        &self.last_server_response
    }

    /// The OS error number of the last socket failure, `0` when none occurred
    pub fn last_socket_errno(&self) -> i32 {
        self.last_socket_errno
    }

    /// Submits one message
    ///
    /// On failure the returned [`Error`] carries either a negative code from
    /// the [`ErrorCode`](crate::ErrorCode) taxonomy or the verbatim SMTP
    /// status code of an unexpected server reply.
    pub fn send_mail(&mut self, message: &Message) -> Result<(), Error> {
        self.log.reset();
        self.last_server_response.clear();
        self.last_socket_errno = 0;

        let result = self.run_session(message);
        if let Err(e) = &result {
            if let Some(errno) = e.os_error() {
                self.last_socket_errno = errno;
            }
        }
        result
    }

    fn run_session(&mut self, message: &Message) -> Result<(), Error> {
        let tls_parameters = match self.mode {
            TransportMode::Cleartext => None,
            TransportMode::Opportunistic | TransportMode::Forced => {
                Some(TlsParameters::new(self.server_name.clone())?)
            }
        };

        let mut connection = SmtpConnection::open(
            &self.server_name,
            self.port,
            self.command_timeout,
            self.mode,
            self.keep_raw_send,
            tls_parameters.as_ref(),
            &mut self.log,
            &mut self.last_server_response,
        )?;
        connection.authenticate(self.credentials.as_ref())?;
        connection.send_envelope(message)?;
        connection.send_data(message)?;
        connection.quit()
        // Dropping the connection closes the transport on every exit path.
    }
}

fn validated_server_name(server_name: &str) -> Result<String, ClientError> {
    let trimmed = server_name.trim();
    if trimmed.is_empty() {
        return Err(ClientError::EmptyServerName);
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::{SmtpClient, TransportMode};
    use crate::{authentication::Credentials, error::ClientError};

    #[test]
    fn test_rejects_empty_server_name() {
        assert_eq!(
            SmtpClient::new("", 587).unwrap_err(),
            ClientError::EmptyServerName
        );
        assert_eq!(
            SmtpClient::new("   ", 587).unwrap_err(),
            ClientError::EmptyServerName
        );
        assert_eq!(
            SmtpClient::new("\t \r\n", 587).unwrap_err(),
            ClientError::EmptyServerName
        );
    }

    #[test]
    fn test_server_name_is_trimmed() {
        let client = SmtpClient::new("  smtp.example.com  ", 587).unwrap();
        assert_eq!(client.server_name(), "smtp.example.com");
    }

    #[test]
    fn test_set_server_name_validates_too() {
        let mut client = SmtpClient::new("smtp.example.com", 587).unwrap();
        assert_eq!(
            client.set_server_name("  "),
            Err(ClientError::EmptyServerName)
        );
        assert_eq!(client.server_name(), "smtp.example.com");

        client.set_server_name("mail.example.org").unwrap();
        assert_eq!(client.server_name(), "mail.example.org");
    }

    #[test]
    fn test_defaults() {
        let client = SmtpClient::new("smtp.example.com", 587).unwrap();
        assert_eq!(client.server_port(), 587);
        assert_eq!(client.command_timeout(), Duration::from_secs(5));
        assert_eq!(client.transport_mode(), TransportMode::Cleartext);
        assert!(!client.keep_using_base_send_commands());
        assert!(client.credentials().is_none());
        assert_eq!(client.communication_log(), "");
        assert_eq!(client.last_server_response(), "");
        assert_eq!(client.last_socket_errno(), 0);
    }

    #[test]
    fn test_constructors_set_the_mode() {
        assert_eq!(
            SmtpClient::opportunistic("h", 587).unwrap().transport_mode(),
            TransportMode::Opportunistic
        );
        assert_eq!(
            SmtpClient::forced_tls("h", 465).unwrap().transport_mode(),
            TransportMode::Forced
        );
    }

    #[test]
    fn test_set_credentials_replaces_previous() {
        let mut client = SmtpClient::new("smtp.example.com", 587).unwrap();
        client.set_credentials(Credentials::new("alice", "one"));
        client.set_credentials(Credentials::new("alice", "two"));
        assert_eq!(
            client.credentials(),
            Some(&Credentials::new("alice", "two"))
        );
    }

    #[test]
    fn test_setters() {
        let mut client = SmtpClient::new("smtp.example.com", 587).unwrap();
        client.set_server_port(2525);
        client.set_command_timeout(Duration::from_secs(1));
        client.set_keep_using_base_send_commands(true);
        assert_eq!(client.server_port(), 2525);
        assert_eq!(client.command_timeout(), Duration::from_secs(1));
        assert!(client.keep_using_base_send_commands());
    }
}
