//! The SMTP conversation engine
//!
//! One `SmtpConnection` lives for exactly one `send_mail` run. It drives the
//! greeting, EHLO, the optional STARTTLS upgrade followed by a second EHLO,
//! authentication, the envelope, the DATA phase and QUIT, mapping every step
//! to its own error code and writing both sides of the dialogue to the
//! communication log.

use std::{
    fmt::Display,
    io::{BufRead, BufReader, Write},
    time::Duration,
};

use crate::{
    authentication::{Credentials, Mechanism, DEFAULT_MECHANISMS},
    base64,
    client::{
        comlog::{escape_crlf, Channel, CommunicationLog},
        commands::{Data, Ehlo, Mail, Quit, Rcpt, Starttls},
        mime,
        net::{self, NetworkStream},
        tls::TlsParameters,
        TransportMode,
    },
    error::{self, Error, ErrorCode},
    extension::{Extension, ServerInfo},
    message::Message,
    response::{self, parse_response, Response},
};

const AUTH_PLAIN_REDACTED: &str = "AUTH PLAIN ***************\r\n";
const AUTH_LOGIN_REDACTED: &str = "AUTH LOGIN ***************\r\n";

pub(crate) struct SmtpConnection<'a> {
    stream: BufReader<NetworkStream>,
    server_info: ServerInfo,
    raw_send: bool,
    log: &'a mut CommunicationLog,
    last_response: &'a mut String,
}

impl<'a> SmtpConnection<'a> {
    /// Connects, checks the greeting, negotiates capabilities and, in
    /// opportunistic mode, upgrades to TLS when the server offers it
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn open(
        host: &str,
        port: u16,
        timeout: Duration,
        mode: TransportMode,
        raw_send: bool,
        tls_parameters: Option<&TlsParameters>,
        log: &'a mut CommunicationLog,
        last_response: &'a mut String,
    ) -> Result<SmtpConnection<'a>, Error> {
        log.append(
            Channel::Client,
            &format!("Trying to connect to {host} on port {port}"),
        );
        let stream = match (mode, tls_parameters) {
            (TransportMode::Forced, Some(tls)) => {
                NetworkStream::connect_tls(host, port, timeout, tls)?
            }
            (TransportMode::Forced, None) => return Err(error::step(ErrorCode::TlsHandshake)),
            _ => NetworkStream::connect(host, port, timeout)?,
        };

        let mut conn = SmtpConnection {
            stream: BufReader::new(stream),
            server_info: ServerInfo::default(),
            raw_send,
            log,
            last_response,
        };
        conn.check_greeting()?;
        conn.ehlo()?;
        if mode == TransportMode::Opportunistic && conn.can_starttls() {
            if let Some(tls) = tls_parameters {
                conn.starttls(tls)?;
            }
        }
        Ok(conn)
    }

    fn can_starttls(&self) -> bool {
        !self.stream.get_ref().is_encrypted()
            && self.server_info.supports_feature(Extension::StartTls)
    }

    fn check_greeting(&mut self) -> Result<(), Error> {
        let response = self.read_response(ErrorCode::Connect, ErrorCode::ConnectTimeout)?;
        if !response.has_code(response::SERVICE_READY) {
            self.close();
            return Err(unexpected_reply(&response));
        }
        self.log.append(Channel::Client, "Connected!");
        Ok(())
    }

    /// Sends EHLO and stores the advertised capability set
    fn ehlo(&mut self) -> Result<(), Error> {
        if let Some(response) =
            self.command(Ehlo, ErrorCode::SendEhlo, ErrorCode::SendEhloTimeout)?
        {
            if !response.has_code(response::ACTION_OK) {
                self.close();
                return Err(unexpected_reply(&response));
            }
            self.server_info = ServerInfo::from_response(&response);
            tracing::debug!("server {}", self.server_info);
        }
        Ok(())
    }

    fn starttls(&mut self, tls_parameters: &TlsParameters) -> Result<(), Error> {
        if let Some(response) =
            self.command(Starttls, ErrorCode::TlsHandshake, ErrorCode::TlsHandshake)?
        {
            if !response.has_code(response::SERVICE_READY) {
                self.close();
                return Err(unexpected_reply(&response));
            }
        }
        self.stream.get_mut().upgrade_tls(tls_parameters)?;
        tracing::debug!("connection encrypted");
        // Capabilities may differ over the secured stream
        self.ehlo()
    }

    /// Runs AUTH when credentials exist; absent credentials are not an error
    pub(crate) fn authenticate(
        &mut self,
        credentials: Option<&Credentials>,
    ) -> Result<(), Error> {
        let Some(credentials) = credentials else {
            return Ok(());
        };
        match self.server_info.get_auth_mechanism(DEFAULT_MECHANISMS) {
            Some(Mechanism::Plain) => self.auth_plain(credentials),
            Some(Mechanism::Login) => self.auth_login(credentials),
            _ => Err(error::step(ErrorCode::AuthMethodNotSupported)),
        }
    }

    fn auth_plain(&mut self, credentials: &Credentials) -> Result<(), Error> {
        self.log.append(Channel::Client, AUTH_PLAIN_REDACTED);
        let command = format!(
            "AUTH PLAIN {}\r\n",
            base64::encode(credentials.plain_token())
        );
        let response = self.dialogue_unlogged(
            command.as_bytes(),
            ErrorCode::Authentication,
            ErrorCode::AuthenticationTimeout,
        )?;
        self.expect_auth_success(response)
    }

    fn auth_login(&mut self, credentials: &Credentials) -> Result<(), Error> {
        self.log.append(Channel::Client, AUTH_LOGIN_REDACTED);
        let opening = self.dialogue_unlogged(
            b"AUTH LOGIN\r\n",
            ErrorCode::Authentication,
            ErrorCode::AuthenticationTimeout,
        )?;
        self.expect_challenge(opening)?;

        let username = format!("{}\r\n", base64::encode(credentials.username()));
        let challenged = self.dialogue_unlogged(
            username.as_bytes(),
            ErrorCode::Authentication,
            ErrorCode::AuthenticationTimeout,
        )?;
        self.expect_challenge(challenged)?;

        let password = format!("{}\r\n", base64::encode(credentials.password()));
        let outcome = self.dialogue_unlogged(
            password.as_bytes(),
            ErrorCode::Authentication,
            ErrorCode::AuthenticationTimeout,
        )?;
        self.expect_auth_success(outcome)
    }

    fn expect_challenge(&mut self, response: Option<Response>) -> Result<(), Error> {
        match response {
            None => Ok(()),
            Some(r) if r.has_code(response::SERVER_CHALLENGE) => Ok(()),
            Some(_) => {
                self.close();
                Err(error::step(ErrorCode::Authentication))
            }
        }
    }

    fn expect_auth_success(&mut self, response: Option<Response>) -> Result<(), Error> {
        match response {
            None => Ok(()),
            Some(r) if r.is_positive() => Ok(()),
            Some(_) => {
                self.close();
                Err(error::step(ErrorCode::Authentication))
            }
        }
    }

    /// MAIL FROM, then one RCPT TO per recipient in to, cc, bcc order
    pub(crate) fn send_envelope(&mut self, message: &Message) -> Result<(), Error> {
        let response = self.command(
            Mail::new(message.from().email()),
            ErrorCode::MailFrom,
            ErrorCode::MailFromTimeout,
        )?;
        self.expect(response, response::ACTION_OK)?;

        let recipients = message.to().iter().chain(message.cc()).chain(message.bcc());
        for address in recipients {
            let response = self.command(
                Rcpt::new(address.email()),
                ErrorCode::RcptTo,
                ErrorCode::RcptToTimeout,
            )?;
            self.expect(response, response::ACTION_OK)?;
        }
        Ok(())
    }

    /// DATA, headers, framed body and the end-of-data exchange
    pub(crate) fn send_data(&mut self, message: &Message) -> Result<(), Error> {
        let response = self.command(Data, ErrorCode::Data, ErrorCode::DataTimeout)?;
        self.expect(response, response::START_MAIL_INPUT)?;

        self.header(&mime::from_header(message.from()), ErrorCode::HeaderFrom)?;
        for address in message.to() {
            self.header(&mime::recipient_header("To", address), ErrorCode::HeaderToCc)?;
        }
        for address in message.cc() {
            self.header(&mime::recipient_header("Cc", address), ErrorCode::HeaderToCc)?;
        }
        // Bcc recipients got a RCPT TO but never a header line.
        self.header(&mime::subject_header(message.subject()), ErrorCode::HeaderSubject)?;
        self.header(&mime::content_type_header(), ErrorCode::HeaderContentType)?;

        let body_part = mime::body_part(message);
        self.log
            .append(Channel::Client, &String::from_utf8_lossy(&body_part));

        let payload = mime::data_payload(message);
        if payload.len() > mime::CHUNK_MAX_LENGTH {
            for chunk in payload.chunks(mime::CHUNK_MAX_LENGTH) {
                self.send_raw(chunk, ErrorCode::BodyPart)?;
            }
        } else {
            self.send_raw(&payload, ErrorCode::Body)?;
        }

        self.log.append(Channel::Client, mime::MESSAGE_ENDING);
        let response = self.dialogue_unlogged(
            mime::MESSAGE_ENDING.as_bytes(),
            ErrorCode::EndData,
            ErrorCode::EndDataTimeout,
        )?;
        self.expect(response, response::ACTION_OK)
    }

    /// QUIT never awaits a reply
    pub(crate) fn quit(&mut self) -> Result<(), Error> {
        self.log.append(Channel::Client, "QUIT\r\n");
        self.send_raw(Quit.to_string().as_bytes(), ErrorCode::Quit)
    }

    /// Logs and sends a command, then awaits the reply unless raw sends were
    /// requested
    fn command<C: Display>(
        &mut self,
        command: C,
        error_code: ErrorCode,
        timeout_code: ErrorCode,
    ) -> Result<Option<Response>, Error> {
        let wire = command.to_string();
        self.log.append(Channel::Client, &wire);
        self.dialogue_unlogged(wire.as_bytes(), error_code, timeout_code)
    }

    /// Send plus optional await; the caller has already logged the command,
    /// possibly in redacted form
    fn dialogue_unlogged(
        &mut self,
        wire: &[u8],
        error_code: ErrorCode,
        timeout_code: ErrorCode,
    ) -> Result<Option<Response>, Error> {
        self.send_raw(wire, error_code)?;
        if self.raw_send {
            return Ok(None);
        }
        self.read_response(error_code, timeout_code).map(Some)
    }

    /// A header line is logged and sent without awaiting a reply
    fn header(&mut self, line: &str, error_code: ErrorCode) -> Result<(), Error> {
        self.log.append(Channel::Client, line);
        self.send_raw(line.as_bytes(), error_code)
    }

    fn send_raw(&mut self, bytes: &[u8], error_code: ErrorCode) -> Result<(), Error> {
        let stream = self.stream.get_mut();
        let result = stream.write_all(bytes).and_then(|()| stream.flush());
        match result {
            Ok(()) => {
                tracing::debug!("Wrote: {}", escape_crlf(&String::from_utf8_lossy(bytes)));
                Ok(())
            }
            Err(e) => {
                self.close();
                Err(error::step_with(error_code, e))
            }
        }
    }

    /// Collects one complete, possibly multi-line reply under the read
    /// deadline set on the socket
    fn read_response(
        &mut self,
        error_code: ErrorCode,
        timeout_code: ErrorCode,
    ) -> Result<Response, Error> {
        let mut buffer = String::with_capacity(100);
        loop {
            let read = match self.stream.read_line(&mut buffer) {
                Ok(read) => read,
                Err(e) => {
                    self.close();
                    let code = if net::is_timeout(&e) {
                        timeout_code
                    } else {
                        error_code
                    };
                    return Err(error::step_with(code, e));
                }
            };
            if read == 0 {
                self.close();
                return Err(error::step(error_code));
            }
            match parse_response(&buffer) {
                Ok((_, response)) => {
                    let raw = buffer.strip_suffix("\r\n").unwrap_or(&buffer);
                    tracing::debug!("<< {}", escape_crlf(raw));
                    *self.last_response = raw.to_owned();
                    self.log.append(Channel::Server, raw);
                    return Ok(response);
                }
                Err(nom::Err::Incomplete(_)) => { /* read more */ }
                Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
                    self.close();
                    return Err(error::response(e.to_string()));
                }
            }
        }
    }

    fn expect(&mut self, response: Option<Response>, expected: u16) -> Result<(), Error> {
        match response {
            None => Ok(()),
            Some(r) if r.has_code(expected) => Ok(()),
            Some(r) => {
                self.close();
                Err(unexpected_reply(&r))
            }
        }
    }

    /// Idempotent transport teardown
    fn close(&mut self) {
        self.stream.get_mut().shutdown();
    }
}

impl Drop for SmtpConnection<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

/// The server answered with something other than the step's expected code;
/// its status code is carried to the caller verbatim
fn unexpected_reply(response: &Response) -> Error {
    let text: Vec<&str> = response.message().collect();
    error::smtp(
        response.code(),
        if text.is_empty() {
            None
        } else {
            Some(text.join("\n"))
        },
    )
}
