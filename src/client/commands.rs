//! SMTP commands, rendered to their wire form through `Display`

use std::fmt::{self, Display, Formatter};

/// EHLO command
///
/// The argument is the literal `localhost`, matching what typical submission
/// setups expect from a client without a resolvable name of its own.
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub(crate) struct Ehlo;

impl Display for Ehlo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("ehlo localhost\r\n")
    }
}

/// STARTTLS command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub(crate) struct Starttls;

impl Display for Starttls {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("STARTTLS\r\n")
    }
}

/// MAIL command
#[derive(PartialEq, Eq, Clone, Debug)]
pub(crate) struct Mail<'a> {
    sender: &'a str,
}

impl<'a> Mail<'a> {
    pub(crate) fn new(sender: &'a str) -> Mail<'a> {
        Mail { sender }
    }
}

impl Display for Mail<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "MAIL FROM: <{}>\r\n", self.sender)
    }
}

/// RCPT command
#[derive(PartialEq, Eq, Clone, Debug)]
pub(crate) struct Rcpt<'a> {
    recipient: &'a str,
}

impl<'a> Rcpt<'a> {
    pub(crate) fn new(recipient: &'a str) -> Rcpt<'a> {
        Rcpt { recipient }
    }
}

impl Display for Rcpt<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RCPT TO: <{}>\r\n", self.recipient)
    }
}

/// DATA command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub(crate) struct Data;

impl Display for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("DATA\r\n")
    }
}

/// QUIT command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub(crate) struct Quit;

impl Display for Quit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("QUIT\r\n")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Ehlo.to_string(), "ehlo localhost\r\n");
        assert_eq!(Starttls.to_string(), "STARTTLS\r\n");
        assert_eq!(
            Mail::new("test@example.com").to_string(),
            "MAIL FROM: <test@example.com>\r\n"
        );
        assert_eq!(
            Rcpt::new("test@example.com").to_string(),
            "RCPT TO: <test@example.com>\r\n"
        );
        assert_eq!(Data.to_string(), "DATA\r\n");
        assert_eq!(Quit.to_string(), "QUIT\r\n");
    }
}
