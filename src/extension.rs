//! ESMTP capabilities negotiated through the EHLO reply

use std::{
    collections::HashSet,
    fmt::{self, Display, Formatter},
};

use crate::{authentication::Mechanism, response::Response};

/// Supported ESMTP keywords
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum Extension {
    /// STARTTLS keyword
    ///
    /// Defined in [RFC 2487](https://tools.ietf.org/html/rfc2487)
    StartTls,
    /// AUTH mechanism
    Authentication(Mechanism),
}

impl Display for Extension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Extension::StartTls => f.write_str("STARTTLS"),
            Extension::Authentication(mechanism) => write!(f, "AUTH {mechanism}"),
        }
    }
}

/// What a server advertised about itself in its EHLO reply
///
/// Parsing the same reply twice yields equal capability sets; a reply
/// without an `AUTH` line yields an empty mechanism set.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct ServerInfo {
    /// Name given on the first line of the EHLO reply
    name: String,
    /// Features supported by the server and known to this client
    features: HashSet<Extension>,
}

impl Display for ServerInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.features.is_empty() {
            write!(f, "{} with no supported features", self.name)
        } else {
            write!(f, "{} with {:?}", self.name, self.features)
        }
    }
}

impl ServerInfo {
    /// Parses an EHLO reply into a `ServerInfo`
    pub fn from_response(response: &Response) -> ServerInfo {
        let name = response.first_word().unwrap_or_default();

        let mut features: HashSet<Extension> = HashSet::new();
        for line in response.message() {
            let mut split = line.split_whitespace();
            match split.next() {
                Some("STARTTLS") => {
                    features.insert(Extension::StartTls);
                }
                Some("AUTH") => {
                    for token in split {
                        if let Some(mechanism) = Mechanism::from_token(token) {
                            features.insert(Extension::Authentication(mechanism));
                        }
                    }
                }
                _ => (),
            }
        }

        ServerInfo {
            name: name.to_owned(),
            features,
        }
    }

    /// Checks if the server supports an ESMTP feature
    pub fn supports_feature(&self, keyword: Extension) -> bool {
        self.features.contains(&keyword)
    }

    /// Checks if the server advertised an authentication mechanism
    pub fn supports_auth_mechanism(&self, mechanism: Mechanism) -> bool {
        self.features.contains(&Extension::Authentication(mechanism))
    }

    /// Picks the first compatible mechanism from a preference list
    pub fn get_auth_mechanism(&self, mechanisms: &[Mechanism]) -> Option<Mechanism> {
        mechanisms
            .iter()
            .copied()
            .find(|mechanism| self.supports_auth_mechanism(*mechanism))
    }

    /// The name given in the EHLO reply
    pub fn name(&self) -> &str {
        &self.name
    }
}
