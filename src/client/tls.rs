//! TLS connector parameters
//!
//! One connector is built per session and drives both the TLS-on-connect
//! handshake and the mid-session STARTTLS upgrade.

use native_tls::{Protocol, TlsConnector};

use crate::error::{self, Error, ErrorCode};

/// Parameters for secure connections
#[derive(Clone, Debug)]
pub(crate) struct TlsParameters {
    pub(crate) connector: TlsConnector,
    /// The domain name expected in the certificate presented by the server
    domain: String,
}

impl TlsParameters {
    /// Builds a connector validating certificates against `domain`
    pub(crate) fn new(domain: String) -> Result<TlsParameters, Error> {
        let connector = TlsConnector::builder()
            .min_protocol_version(Some(Protocol::Tlsv12))
            .build()
            .map_err(|e| error::step_with(ErrorCode::TlsHandshake, e))?;
        Ok(TlsParameters { connector, domain })
    }

    pub(crate) fn domain(&self) -> &str {
        &self.domain
    }
}
