//! Credentials and the SASL mechanisms advertised by submission servers.
//!
//! Only PLAIN and LOGIN can actually be driven with a username and password;
//! the remaining mechanisms are tracked so that an EHLO reply can be mapped
//! to a complete capability set.

use std::fmt::{self, Debug, Display, Formatter};

/// Mechanisms tried in order when the server offers several.
/// LOGIN comes last as it is deprecated.
pub(crate) const DEFAULT_MECHANISMS: &[Mechanism] = &[Mechanism::Plain, Mechanism::Login];

/// Username/password pair used for authentication
///
/// The password is kept out of `Debug` output and out of the communication
/// log.
#[derive(PartialEq, Eq, Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates a `Credentials` struct from a username and a password
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Credentials {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    pub(crate) fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// The RFC 4616 initial response: `NUL username NUL password`
    pub(crate) fn plain_token(&self) -> String {
        format!("\u{0}{}\u{0}{}", self.username, self.password)
    }
}

impl<U: Into<String>, P: Into<String>> From<(U, P)> for Credentials {
    fn from((username, password): (U, P)) -> Credentials {
        Credentials::new(username, password)
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// An authentication mechanism a server may advertise in its EHLO reply
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum Mechanism {
    /// PLAIN, [RFC 4616](https://tools.ietf.org/html/rfc4616)
    Plain,
    /// LOGIN, obsolete but still required by some providers
    Login,
    /// Non-standard XOAUTH2
    Xoauth2,
    /// Non-standard PLAIN-CLIENTTOKEN
    PlainClientToken,
    /// OAUTHBEARER, [RFC 7628](https://tools.ietf.org/html/rfc7628)
    OauthBearer,
    /// Non-standard XOAUTH, predecessor of XOAUTH2
    Xoauth,
}

impl Display for Mechanism {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mechanism::Plain => "PLAIN",
            Mechanism::Login => "LOGIN",
            Mechanism::Xoauth2 => "XOAUTH2",
            Mechanism::PlainClientToken => "PLAIN-CLIENTTOKEN",
            Mechanism::OauthBearer => "OAUTHBEARER",
            Mechanism::Xoauth => "XOAUTH",
        })
    }
}

impl Mechanism {
    /// Maps one token of an `AUTH` capability line; unknown tokens are ignored
    pub(crate) fn from_token(token: &str) -> Option<Mechanism> {
        match token {
            "PLAIN" => Some(Mechanism::Plain),
            "LOGIN" => Some(Mechanism::Login),
            "XOAUTH2" => Some(Mechanism::Xoauth2),
            "PLAIN-CLIENTTOKEN" => Some(Mechanism::PlainClientToken),
            "OAUTHBEARER" => Some(Mechanism::OauthBearer),
            "XOAUTH" => Some(Mechanism::Xoauth),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Credentials, Mechanism};
    use crate::base64;

    #[test]
    fn test_plain_token() {
        let credentials = Credentials::new("username", "password");
        assert_eq!(credentials.plain_token(), "\u{0}username\u{0}password");
    }

    #[test]
    fn test_plain_token_round_trip() {
        let credentials = Credentials::new("alice", "s3cret");
        let encoded = base64::encode(credentials.plain_token());
        let decoded = base64::decode(encoded).unwrap();
        assert_eq!(decoded, b"\0alice\0s3cret");
        assert_eq!(decoded.len(), 14);
    }

    #[test]
    fn test_debug_redacts_password() {
        let credentials = Credentials::new("alice", "wonderland");
        let debugged = format!("{credentials:?}");
        assert!(debugged.contains("alice"));
        assert!(!debugged.contains("wonderland"));
    }

    #[test]
    fn test_mechanism_from_token() {
        assert_eq!(Mechanism::from_token("PLAIN"), Some(Mechanism::Plain));
        assert_eq!(Mechanism::from_token("LOGIN"), Some(Mechanism::Login));
        assert_eq!(Mechanism::from_token("XOAUTH2"), Some(Mechanism::Xoauth2));
        assert_eq!(
            Mechanism::from_token("PLAIN-CLIENTTOKEN"),
            Some(Mechanism::PlainClientToken)
        );
        assert_eq!(
            Mechanism::from_token("OAUTHBEARER"),
            Some(Mechanism::OauthBearer)
        );
        assert_eq!(Mechanism::from_token("XOAUTH"), Some(Mechanism::Xoauth));
        assert_eq!(Mechanism::from_token("CRAM-MD5"), None);
        assert_eq!(Mechanism::from_token("plain"), None);
    }

    #[test]
    fn test_mechanism_display() {
        assert_eq!(Mechanism::Plain.to_string(), "PLAIN");
        assert_eq!(Mechanism::PlainClientToken.to_string(), "PLAIN-CLIENTTOKEN");
    }
}
