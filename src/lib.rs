//! Missive is an SMTP submission client. It connects to a mail submission
//! agent, authenticates when credentials are supplied, and transmits one
//! message (headers, body and attachments) per call. It provides:
//!
//! * Cleartext, opportunistic STARTTLS and TLS-on-connect transports
//! * AUTH PLAIN and AUTH LOGIN
//! * multipart/mixed framing with pre-encoded attachments
//! * A per-session communication log with credential redaction
//! * A stable, closed error-code taxonomy
//!
//! # Example
//!
//! ```rust,no_run
//! use missive::{Message, MessageAddress, SmtpClient};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let message = Message::builder()
//!     .from(MessageAddress::with_name("alice@example.com", "Alice"))
//!     .to(MessageAddress::new("bob@example.com"))
//!     .subject("Greetings")
//!     .body("Hello Bob!")
//!     .build()?;
//!
//! let mut client = SmtpClient::opportunistic("smtp.example.com", 587)?;
//! client.send_mail(&message)?;
//! println!("{}", client.communication_log());
//! # Ok(())
//! # }
//! ```

#![deny(
    missing_docs,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces,
    unsafe_code
)]

pub mod authentication;
mod base64;
pub mod client;
pub mod error;
pub mod extension;
pub mod message;
pub mod response;

pub use crate::{
    authentication::{Credentials, Mechanism},
    client::{SmtpClient, TransportMode},
    error::{error_message, error_message_r, ClientError, Error, ErrorCode},
    extension::{Extension, ServerInfo},
    message::{Attachment, Message, MessageAddress, MessageBuilder, MessageError},
    response::{Code, Response, Severity},
};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
