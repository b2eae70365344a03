//! The per-session communication log
//!
//! Every client command and server reply of a `send_mail` run is appended to
//! a growable text buffer, one entry per line, so that a failed submission
//! can be diagnosed after the fact. Entries carry a one-character channel
//! prefix: `c` for client, `s` for server.

/// Starting buffer capacity; the buffer grows by at least this much when full
const INITIAL_LOG_CAPACITY: usize = 4096;

/// Which side of the dialogue produced an entry
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) enum Channel {
    /// A command or note from this client
    Client,
    /// A reply received from the server
    Server,
}

impl Channel {
    fn prefix(self) -> &'static str {
        match self {
            Channel::Client => "c",
            Channel::Server => "s",
        }
    }
}

/// Append-only dialogue transcript
///
/// Client-channel payloads have their CRLF pairs rewritten to the literal
/// two-character sequences `\r\n` so each command stays on a single log
/// line. Server payloads are recorded verbatim.
#[derive(Debug)]
pub(crate) struct CommunicationLog {
    buffer: String,
}

impl CommunicationLog {
    pub(crate) fn new() -> CommunicationLog {
        CommunicationLog {
            buffer: String::with_capacity(INITIAL_LOG_CAPACITY),
        }
    }

    /// Empties the transcript at the start of a new session
    pub(crate) fn reset(&mut self) {
        self.buffer.clear();
    }

    pub(crate) fn append(&mut self, channel: Channel, payload: &str) {
        let payload = match channel {
            Channel::Client => escape_crlf(payload),
            Channel::Server => payload.to_owned(),
        };
        let needed = 1 + channel.prefix().len() + 2 + payload.len();
        if self.buffer.capacity() - self.buffer.len() < needed + 4 {
            self.buffer.reserve(needed + INITIAL_LOG_CAPACITY);
        }
        self.buffer.push('\n');
        self.buffer.push_str(channel.prefix());
        self.buffer.push_str(": ");
        self.buffer.push_str(&payload);
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.buffer
    }
}

/// Returns the string with every CRLF replaced by the escape `\r\n`
pub(crate) fn escape_crlf(string: &str) -> String {
    string.replace("\r\n", "\\r\\n")
}

#[cfg(test)]
mod test {
    use super::{escape_crlf, Channel, CommunicationLog};

    #[test]
    fn test_escape_crlf() {
        assert_eq!(escape_crlf("\r\n"), "\\r\\n");
        assert_eq!(escape_crlf("ehlo localhost\r\n"), "ehlo localhost\\r\\n");
        assert_eq!(
            escape_crlf("DATA\r\nSubject: hi\r\n"),
            "DATA\\r\\nSubject: hi\\r\\n"
        );
        assert_eq!(escape_crlf("no line ending"), "no line ending");
    }

    #[test]
    fn test_append_frames_entries() {
        let mut log = CommunicationLog::new();
        log.append(Channel::Client, "ehlo localhost\r\n");
        log.append(Channel::Server, "250 ok");
        assert_eq!(log.as_str(), "\nc: ehlo localhost\\r\\n\ns: 250 ok");
    }

    #[test]
    fn test_server_payload_is_verbatim() {
        let mut log = CommunicationLog::new();
        log.append(Channel::Server, "250-first\r\n250 last");
        assert_eq!(log.as_str(), "\ns: 250-first\r\n250 last");
    }

    #[test]
    fn test_reset_empties_the_transcript() {
        let mut log = CommunicationLog::new();
        log.append(Channel::Client, "QUIT\r\n");
        log.reset();
        assert_eq!(log.as_str(), "");
    }

    #[test]
    fn test_grows_past_initial_capacity() {
        let mut log = CommunicationLog::new();
        let line = "x".repeat(600);
        for _ in 0..10 {
            log.append(Channel::Client, &line);
        }
        assert_eq!(log.as_str().len(), 10 * (4 + line.len()));
    }
}
