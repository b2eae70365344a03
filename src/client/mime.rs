//! multipart/mixed framing of the DATA payload
//!
//! Header lines are emitted one at a time by the connection; this module
//! renders them, plus the body part and attachment parts separated by the
//! fixed `sep` boundary. Anything larger than [`CHUNK_MAX_LENGTH`] is
//! transmitted in fixed-size slices.

use crate::message::{Attachment, Message, MessageAddress};

/// The multipart boundary, appearing as `--sep` between parts and `--sep--`
/// at closure
pub(crate) const PART_BOUNDARY: &str = "sep";

/// Upper bound of a single body send
pub(crate) const CHUNK_MAX_LENGTH: usize = 512;

/// The end-of-data sequence terminating the DATA phase
pub(crate) const MESSAGE_ENDING: &str = "\r\n.\r\n";

/// `From` header line; the display name is always quoted, empty when unset
pub(crate) fn from_header(address: &MessageAddress) -> String {
    format!(
        "From: \"{}\" <{}>\r\n",
        address.display_name().unwrap_or_default(),
        address.email()
    )
}

/// A single `To` or `Cc` header line
pub(crate) fn recipient_header(field: &str, address: &MessageAddress) -> String {
    format!("{}: {}\r\n", field, address.email())
}

pub(crate) fn subject_header(subject: &str) -> String {
    format!("Subject: {subject}\r\n")
}

/// The top-level `Content-Type` header, followed by the blank line that
/// separates headers from the first part
pub(crate) fn content_type_header() -> String {
    format!("Content-Type: multipart/mixed; boundary={PART_BOUNDARY}\r\n\r\n")
}

/// The body part: opening boundary, part headers and the raw body bytes
pub(crate) fn body_part(message: &Message) -> Vec<u8> {
    let mut part = format!(
        "--{PART_BOUNDARY}\r\nContent-Type: {}; charset=UTF-8\r\n\r\n",
        message.body_mime_type()
    )
    .into_bytes();
    part.extend_from_slice(message.body());
    part.extend_from_slice(b"\r\n");
    part
}

/// All attachment parts; each payload is written as-is with no CRLF between
/// the base64 text and the next boundary
pub(crate) fn attachments_text(attachments: &[Attachment]) -> String {
    let mut text = String::new();
    for attachment in attachments {
        text.push_str(&format!(
            "\r\n--{PART_BOUNDARY}\r\nContent-Type: {}; file=\"{}\"\r\n\
             Content-Disposition: Inline; filename=\"{}\"\r\n\
             Content-Transfer-Encoding: base64\r\n\r\n{}",
            attachment.mime_type(),
            attachment.name(),
            attachment.name(),
            attachment.content_base64()
        ));
    }
    text
}

/// The complete DATA payload after the headers: body part, attachment parts
/// and the closing boundary
pub(crate) fn data_payload(message: &Message) -> Vec<u8> {
    let mut payload = body_part(message);
    payload.extend_from_slice(attachments_text(message.attachments()).as_bytes());
    payload.extend_from_slice(format!("\r\n--{PART_BOUNDARY}--").as_bytes());
    payload
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::{Attachment, Message, MessageAddress};

    fn sample_message() -> Message {
        Message::builder()
            .from(MessageAddress::with_name("alice@example.com", "Alice"))
            .to(MessageAddress::new("bob@example.com"))
            .subject("Hello")
            .body("How are you?")
            .build()
            .unwrap()
    }

    #[test]
    fn test_from_header() {
        assert_eq!(
            from_header(&MessageAddress::with_name("alice@example.com", "Alice")),
            "From: \"Alice\" <alice@example.com>\r\n"
        );
        assert_eq!(
            from_header(&MessageAddress::new("alice@example.com")),
            "From: \"\" <alice@example.com>\r\n"
        );
    }

    #[test]
    fn test_recipient_and_subject_headers() {
        assert_eq!(
            recipient_header("To", &MessageAddress::new("bob@example.com")),
            "To: bob@example.com\r\n"
        );
        assert_eq!(
            recipient_header("Cc", &MessageAddress::new("carol@example.com")),
            "Cc: carol@example.com\r\n"
        );
        assert_eq!(subject_header("Hello"), "Subject: Hello\r\n");
    }

    #[test]
    fn test_content_type_header() {
        assert_eq!(
            content_type_header(),
            "Content-Type: multipart/mixed; boundary=sep\r\n\r\n"
        );
    }

    #[test]
    fn test_body_part() {
        assert_eq!(
            body_part(&sample_message()),
            b"--sep\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\nHow are you?\r\n"
        );
    }

    #[test]
    fn test_data_payload_without_attachments() {
        assert_eq!(
            data_payload(&sample_message()),
            b"--sep\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\nHow are you?\r\n\r\n--sep--"
        );
    }

    #[test]
    fn test_data_payload_with_attachment() {
        let message = Message::builder()
            .from(MessageAddress::new("alice@example.com"))
            .to(MessageAddress::new("bob@example.com"))
            .body("see attached")
            .attachment(Attachment::new("notes.txt", "text/plain", "aGVsbG8="))
            .build()
            .unwrap();

        let expected = concat!(
            "--sep\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\nsee attached\r\n",
            "\r\n--sep\r\nContent-Type: text/plain; file=\"notes.txt\"\r\n",
            "Content-Disposition: Inline; filename=\"notes.txt\"\r\n",
            "Content-Transfer-Encoding: base64\r\n\r\naGVsbG8=",
            "\r\n--sep--",
        );
        assert_eq!(data_payload(&message), expected.as_bytes());
    }

    #[test]
    fn test_chunked_payload_concatenation_is_identical() {
        let message = Message::builder()
            .from(MessageAddress::new("alice@example.com"))
            .to(MessageAddress::new("bob@example.com"))
            .body("x".repeat(2000))
            .attachment(Attachment::new("blob.bin", "application/octet-stream", "QQ==".repeat(750)))
            .build()
            .unwrap();

        let payload = data_payload(&message);
        assert!(payload.len() > CHUNK_MAX_LENGTH);

        let chunks: Vec<&[u8]> = payload.chunks(CHUNK_MAX_LENGTH).collect();
        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.len(), CHUNK_MAX_LENGTH);
        }
        assert!(chunks.last().unwrap().len() <= CHUNK_MAX_LENGTH);

        let reassembled: Vec<u8> = chunks.concat();
        assert_eq!(reassembled, payload);
    }
}
