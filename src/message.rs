//! Message value types: addresses, attachments and the message builder
//!
//! A [`Message`] holds structured fields only; no parsing happens here. The
//! body and each attachment carry their MIME type as caller-supplied strings,
//! and attachment payloads arrive already base64-encoded.

/// An email address with an optional display name
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct MessageAddress {
    email: String,
    display_name: Option<String>,
}

impl MessageAddress {
    /// Creates an address without a display name
    pub fn new<E: Into<String>>(email: E) -> MessageAddress {
        MessageAddress {
            email: email.into(),
            display_name: None,
        }
    }

    /// Creates an address with a display name
    pub fn with_name<E: Into<String>, N: Into<String>>(email: E, name: N) -> MessageAddress {
        MessageAddress {
            email: email.into(),
            display_name: Some(name.into()),
        }
    }

    /// The bare email address
    pub fn email(&self) -> &str {
        &self.email
    }

    /// The display name, if one was given
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}

/// A pre-encoded attachment
///
/// The payload must already be base64-encoded (standard alphabet, no line
/// wrapping); it is written to the wire as-is.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Attachment {
    name: String,
    mime_type: String,
    content_base64: String,
}

impl Attachment {
    /// Creates an attachment from a file name, a MIME type and the
    /// base64-encoded payload
    pub fn new<N, M, C>(name: N, mime_type: M, content_base64: C) -> Attachment
    where
        N: Into<String>,
        M: Into<String>,
        C: Into<String>,
    {
        Attachment {
            name: name.into(),
            mime_type: mime_type.into(),
            content_base64: content_base64.into(),
        }
    }

    /// The attachment file name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attachment MIME type
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The base64-encoded payload
    pub fn content_base64(&self) -> &str {
        &self.content_base64
    }
}

/// Error returned by [`MessageBuilder::build`] on a structurally invalid
/// message
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// No sender address was given
    #[error("a message requires a sender address")]
    MissingFrom,
    /// No recipient was given in any of to, cc and bcc
    #[error("a message requires at least one recipient across to, cc and bcc")]
    NoRecipients,
}

/// A complete message ready for submission
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Message {
    from: MessageAddress,
    to: Vec<MessageAddress>,
    cc: Vec<MessageAddress>,
    bcc: Vec<MessageAddress>,
    subject: String,
    body_mime_type: String,
    body: Vec<u8>,
    attachments: Vec<Attachment>,
}

impl Message {
    /// Starts building a message
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// The sender address
    pub fn from(&self) -> &MessageAddress {
        &self.from
    }

    /// The To recipients, in insertion order
    pub fn to(&self) -> &[MessageAddress] {
        &self.to
    }

    /// The Cc recipients, in insertion order
    pub fn cc(&self) -> &[MessageAddress] {
        &self.cc
    }

    /// The Bcc recipients, in insertion order
    ///
    /// Bcc addresses receive a `RCPT TO` command but never appear in the
    /// message headers.
    pub fn bcc(&self) -> &[MessageAddress] {
        &self.bcc
    }

    /// The subject line
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The MIME type of the body part
    pub fn body_mime_type(&self) -> &str {
        &self.body_mime_type
    }

    /// The raw body bytes
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The attachments, in insertion order
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}

/// Builder for [`Message`]
///
/// ```rust
/// use missive::{Message, MessageAddress};
///
/// let message = Message::builder()
///     .from(MessageAddress::with_name("alice@example.com", "Alice"))
///     .to(MessageAddress::new("bob@example.com"))
///     .subject("Hello")
///     .body("How are you?")
///     .build()
///     .unwrap();
/// ```
#[derive(Default, Clone, Debug)]
pub struct MessageBuilder {
    from: Option<MessageAddress>,
    to: Vec<MessageAddress>,
    cc: Vec<MessageAddress>,
    bcc: Vec<MessageAddress>,
    subject: String,
    body_mime_type: Option<String>,
    body: Vec<u8>,
    attachments: Vec<Attachment>,
}

impl MessageBuilder {
    /// Creates an empty builder
    pub fn new() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// Sets the sender address
    pub fn from(mut self, address: MessageAddress) -> Self {
        self.from = Some(address);
        self
    }

    /// Adds a To recipient
    pub fn to(mut self, address: MessageAddress) -> Self {
        self.to.push(address);
        self
    }

    /// Adds a Cc recipient
    pub fn cc(mut self, address: MessageAddress) -> Self {
        self.cc.push(address);
        self
    }

    /// Adds a Bcc recipient
    pub fn bcc(mut self, address: MessageAddress) -> Self {
        self.bcc.push(address);
        self
    }

    /// Sets the subject line
    pub fn subject<S: Into<String>>(mut self, subject: S) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the MIME type of the body part, `text/plain` by default
    pub fn body_mime_type<M: Into<String>>(mut self, mime_type: M) -> Self {
        self.body_mime_type = Some(mime_type.into());
        self
    }

    /// Sets the body
    pub fn body<B: Into<Vec<u8>>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// Adds an attachment
    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Builds the message, validating its structure
    pub fn build(self) -> Result<Message, MessageError> {
        let from = self.from.ok_or(MessageError::MissingFrom)?;
        if self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty() {
            return Err(MessageError::NoRecipients);
        }
        Ok(Message {
            from,
            to: self.to,
            cc: self.cc,
            bcc: self.bcc,
            subject: self.subject,
            body_mime_type: self
                .body_mime_type
                .unwrap_or_else(|| "text/plain".to_owned()),
            body: self.body,
            attachments: self.attachments,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_build_minimal() {
        let message = Message::builder()
            .from(MessageAddress::new("alice@example.com"))
            .to(MessageAddress::new("bob@example.com"))
            .build()
            .unwrap();

        assert_eq!(message.from().email(), "alice@example.com");
        assert_eq!(message.to().len(), 1);
        assert_eq!(message.subject(), "");
        assert_eq!(message.body_mime_type(), "text/plain");
        assert!(message.body().is_empty());
        assert!(message.attachments().is_empty());
    }

    #[test]
    fn test_build_requires_from() {
        let result = Message::builder()
            .to(MessageAddress::new("bob@example.com"))
            .build();
        assert_eq!(result.unwrap_err(), MessageError::MissingFrom);
    }

    #[test]
    fn test_build_requires_a_recipient() {
        let result = Message::builder()
            .from(MessageAddress::new("alice@example.com"))
            .build();
        assert_eq!(result.unwrap_err(), MessageError::NoRecipients);
    }

    #[test]
    fn test_bcc_only_is_a_valid_recipient_set() {
        let message = Message::builder()
            .from(MessageAddress::new("alice@example.com"))
            .bcc(MessageAddress::new("hidden@example.com"))
            .build()
            .unwrap();
        assert!(message.to().is_empty());
        assert_eq!(message.bcc().len(), 1);
    }

    #[test]
    fn test_recipient_order_is_preserved() {
        let message = Message::builder()
            .from(MessageAddress::new("alice@example.com"))
            .to(MessageAddress::new("first@example.com"))
            .to(MessageAddress::new("second@example.com"))
            .cc(MessageAddress::new("third@example.com"))
            .build()
            .unwrap();

        let to: Vec<&str> = message.to().iter().map(MessageAddress::email).collect();
        assert_eq!(to, ["first@example.com", "second@example.com"]);
        assert_eq!(message.cc()[0].email(), "third@example.com");
    }
}
