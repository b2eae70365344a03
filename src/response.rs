//! SMTP reply parsing: a mandatory 3-digit return code followed by optional
//! text, possibly spread over several `NNN-` continuation lines.

use std::{
    fmt::{Display, Formatter},
    result,
    str::FromStr,
};

use nom::{
    bytes::streaming::{tag, take_until, take_while_m_n},
    character::streaming::one_of,
    combinator::map_res,
    sequence::terminated,
    IResult,
};

use crate::error::{self, Error};

/// `220` service ready
pub(crate) const SERVICE_READY: u16 = 220;
/// `250` requested action okay, completed
pub(crate) const ACTION_OK: u16 = 250;
/// `334` server challenge during AUTH
pub(crate) const SERVER_CHALLENGE: u16 = 334;
/// `354` start mail input
pub(crate) const START_MAIL_INPUT: u16 = 354;

/// First digit of a reply code, indicating severity
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Severity {
    /// 2yz
    PositiveCompletion,
    /// 3yz
    PositiveIntermediate,
    /// 4yz
    TransientNegativeCompletion,
    /// 5yz
    PermanentNegativeCompletion,
}

/// A 3-digit SMTP reply code
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct Code(u16);

impl Code {
    /// Wraps a raw reply code
    pub fn new(value: u16) -> Code {
        Code(value)
    }

    /// The raw numeric value
    pub fn value(self) -> u16 {
        self.0
    }

    /// Severity class of the code, if it has one
    pub fn severity(self) -> Option<Severity> {
        match self.0 / 100 {
            2 => Some(Severity::PositiveCompletion),
            3 => Some(Severity::PositiveIntermediate),
            4 => Some(Severity::TransientNegativeCompletion),
            5 => Some(Severity::PermanentNegativeCompletion),
            _ => None,
        }
    }

    /// Tells if the code announces success (2yz or 3yz)
    pub fn is_positive(self) -> bool {
        matches!(
            self.severity(),
            Some(Severity::PositiveCompletion | Severity::PositiveIntermediate)
        )
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

impl From<Code> for u16 {
    fn from(code: Code) -> Self {
        code.0
    }
}

/// A complete SMTP reply, with separated code and text lines
///
/// Continuation lines of a multi-line reply are collected into `message`,
/// one entry per line, stripped of their code and continuation marker.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Response {
    code: Code,
    message: Vec<String>,
}

impl FromStr for Response {
    type Err = Error;

    fn from_str(s: &str) -> result::Result<Response, Error> {
        parse_response(s)
            .map(|(_, r)| r)
            .map_err(|e| error::response(e.to_owned()))
    }
}

impl Response {
    /// Creates a new `Response`
    pub fn new(code: Code, message: Vec<String>) -> Response {
        Response { code, message }
    }

    /// Reply code
    pub fn code(&self) -> Code {
        self.code
    }

    /// Tells if the reply is positive
    pub fn is_positive(&self) -> bool {
        self.code.is_positive()
    }

    /// Tests code equality against a raw value
    pub fn has_code(&self, code: u16) -> bool {
        self.code.0 == code
    }

    /// Reply text, one element per line
    pub fn message(&self) -> impl Iterator<Item = &str> {
        self.message.iter().map(String::as_str)
    }

    /// First word of the first text line, if any
    pub fn first_word(&self) -> Option<&str> {
        self.message
            .first()
            .and_then(|line| line.split_whitespace().next())
    }
}

/// Extracts the leading 3-digit return code of a raw reply buffer.
///
/// Returns `-1` when the buffer holds fewer than three bytes or does not
/// begin with three ASCII digits.
pub fn extract_return_code(reply: &str) -> i32 {
    match reply.as_bytes() {
        [a, b, c, ..] if a.is_ascii_digit() && b.is_ascii_digit() && c.is_ascii_digit() => {
            i32::from(a - b'0') * 100 + i32::from(b - b'0') * 10 + i32::from(c - b'0')
        }
        _ => -1,
    }
}

// Parsers (multi-line framing per RFC 5321 §4.2.1)

fn parse_code(i: &str) -> IResult<&str, Code> {
    map_res(
        take_while_m_n(3, 3, |c: char| c.is_ascii_digit()),
        |digits: &str| digits.parse::<u16>().map(Code::new),
    )(i)
}

/// One reply line: a code, the `-`/` ` continuation marker and the text up
/// to its CRLF
fn reply_line(i: &str) -> IResult<&str, (Code, char, &str)> {
    let (i, code) = parse_code(i)?;
    let (i, separator) = one_of("- ")(i)?;
    let (i, text) = terminated(take_until("\r\n"), tag("\r\n"))(i)?;
    Ok((i, (code, separator, text)))
}

pub(crate) fn parse_response(input: &str) -> IResult<&str, Response> {
    let mut rest = input;
    let mut reply_code = None;
    let mut message = Vec::new();
    loop {
        let (after, (code, separator, text)) = reply_line(rest)?;
        // Every line of a multi-line reply must carry the same code.
        if *reply_code.get_or_insert(code) != code {
            return Err(nom::Err::Failure(nom::error::Error::new(
                rest,
                nom::error::ErrorKind::Verify,
            )));
        }
        message.push(text.to_owned());
        rest = after;
        if separator == ' ' {
            return Ok((rest, Response { code, message }));
        }
    }
}
