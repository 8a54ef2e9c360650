//! Header field collection and field-line parsing.
//!
//! # Responsibilities
//! - Recognise CRLF-terminated field lines incrementally
//! - Validate field names against the RFC 7230 token grammar
//! - Store values case-insensitively, merging repeated names with `", "`
//!
//! # Design Decisions
//! - Entries keep insertion order so serialization is deterministic
//! - The first spelling of a name is kept for the wire; lookups ignore case
//! - Repeated names always merge (no special casing of `Set-Cookie`)

use std::fmt;

use thiserror::Error;

use super::find_crlf;

/// Error produced while parsing a single field line.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("field line has no ':' separator")]
    MissingSeparator,

    #[error("whitespace between field name and ':'")]
    SpaceBeforeColon,

    #[error("invalid field name {0:?}")]
    InvalidName(String),

    #[error("field value is not valid UTF-8")]
    InvalidValue,
}

/// An ordered, case-insensitive collection of header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse as many complete field lines from `data` as possible.
    ///
    /// Returns the number of bytes consumed and whether the empty line that
    /// ends the header block was reached (its CRLF is included in the count).
    /// A malformed line fails the whole call and leaves `self` untouched.
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool), HeaderError> {
        let mut parsed = Vec::new();
        let mut read = 0;
        let done = loop {
            let Some(idx) = find_crlf(&data[read..]) else {
                break false;
            };
            if idx == 0 {
                read += 2;
                break true;
            }

            parsed.push(parse_field_line(&data[read..read + idx])?);
            read += idx + 2;
        };

        for (name, value) in parsed {
            self.set(name, value);
        }
        Ok((read, done))
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Set `name`, appending to any existing value with `", "`.
    pub fn set(&mut self, name: impl Into<String>, value: impl AsRef<str>) {
        let name = name.into();
        match self.position(&name) {
            Some(i) => {
                let existing = &mut self.entries[i].1;
                existing.push_str(", ");
                existing.push_str(value.as_ref());
            }
            None => self.entries.push((name, value.as_ref().to_string())),
        }
    }

    /// Set `name`, discarding any existing value.
    pub fn replace(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Remove `name`, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, value)` pairs in the order names were first set.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn for_each(&self, mut f: impl FnMut(&str, &str)) {
        for (name, value) in self.iter() {
            f(name, value);
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

/// Renders the field lines exactly as they go on the wire, without the
/// terminating blank line.
impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{}: {}\r\n", name, value)?;
        }
        Ok(())
    }
}

fn parse_field_line(line: &[u8]) -> Result<(&str, &str), HeaderError> {
    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or(HeaderError::MissingSeparator)?;
    let (raw_name, raw_value) = (&line[..colon], &line[colon + 1..]);

    if raw_name.ends_with(b" ") {
        return Err(HeaderError::SpaceBeforeColon);
    }

    let start = raw_name.iter().take_while(|&&b| b == b' ').count();
    let name = &raw_name[start..];
    let invalid_name = || HeaderError::InvalidName(String::from_utf8_lossy(name).into_owned());
    if name.is_empty() || !name.iter().all(|&b| is_tchar(b)) {
        return Err(invalid_name());
    }

    let name = std::str::from_utf8(name).map_err(|_| invalid_name())?;
    let value = std::str::from_utf8(raw_value).map_err(|_| HeaderError::InvalidValue)?;
    Ok((name, value.trim()))
}

/// RFC 7230 `tchar`.
pub fn is_tchar(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'^' | b'_' | b'`' | b'|' | b'~' | b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_header() {
        let mut headers = Headers::new();
        let data = b"Host: localhost:42069\r\n\r\n";
        let (n, done) = headers.parse(data).unwrap();

        assert_eq!(headers.get("Host"), Some("localhost:42069"));
        assert_eq!(n, 25);
        assert!(done);
    }

    #[test]
    fn merges_repeated_headers() {
        let mut headers = Headers::new();
        let data = b"Host: localhost:42069\r\nfoo: fighters\r\nfoo:  are the best        \r\n\r\n";
        let (n, done) = headers.parse(data).unwrap();

        assert_eq!(headers.get("host"), Some("localhost:42069"));
        assert_eq!(headers.get("foo"), Some("fighters, are the best"));
        assert_eq!(n, 68);
        assert!(done);
    }

    #[test]
    fn trims_value_whitespace() {
        let mut headers = Headers::new();
        let data = b"Host: localhost:42069\r\nfoo: fighters        \r\n\r\n";
        let (n, done) = headers.parse(data).unwrap();

        assert_eq!(headers.get("foo"), Some("fighters"));
        assert_eq!(n, 48);
        assert!(done);
    }

    #[test]
    fn accepts_leading_space_before_name() {
        let mut headers = Headers::new();
        let (_, done) = headers.parse(b"   Host: example.com\r\n\r\n").unwrap();
        assert!(done);
        assert_eq!(headers.get("host"), Some("example.com"));
    }

    #[test]
    fn rejects_space_before_colon() {
        let mut headers = Headers::new();
        let err = headers
            .parse(b"       Host : localhost:42069       \r\n\r\n")
            .unwrap_err();
        assert_eq!(err, HeaderError::SpaceBeforeColon);
    }

    #[test]
    fn rejects_non_token_characters() {
        let mut headers = Headers::new();
        let data = "      H\u{a9}st: localhost:42069       \r\n\r\n".as_bytes();
        assert!(matches!(headers.parse(data), Err(HeaderError::InvalidName(_))));

        let mut headers = Headers::new();
        let data = b"      Ho st: localhost:42069       \r\n\r\n";
        assert!(matches!(headers.parse(data), Err(HeaderError::InvalidName(_))));

        let mut headers = Headers::new();
        assert!(headers.parse(b"X-\x01Bad: v\r\n\r\n").is_err());
    }

    #[test]
    fn rejects_missing_separator_and_empty_name() {
        let mut headers = Headers::new();
        assert_eq!(
            headers.parse(b"NoColonHere\r\n\r\n").unwrap_err(),
            HeaderError::MissingSeparator
        );
        assert!(matches!(
            headers.parse(b": value\r\n\r\n"),
            Err(HeaderError::InvalidName(_))
        ));
    }

    #[test]
    fn failed_parse_keeps_nothing_from_the_call() {
        let mut headers = Headers::new();
        headers.set("Host", "example.com");

        let err = headers
            .parse(b"Accept: */*\r\nhost: other\r\nBad Name: x\r\n\r\n")
            .unwrap_err();
        assert!(matches!(err, HeaderError::InvalidName(_)));
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("host"), Some("example.com"));
        assert!(!headers.contains("accept"));
    }

    #[test]
    fn waits_for_complete_line() {
        let mut headers = Headers::new();
        assert_eq!(headers.parse(b"Host: local").unwrap(), (0, false));
        assert!(headers.is_empty());

        let (n, done) = headers.parse(b"Host: a\r\nAccept: */").unwrap();
        assert_eq!(n, 9);
        assert!(!done);
        assert_eq!(headers.get("host"), Some("a"));
        assert!(!headers.contains("accept"));
    }

    #[test]
    fn set_merges_in_order() {
        let mut headers = Headers::new();
        headers.set("X", "a");
        headers.set("x", "b");
        assert_eq!(headers.get("X"), Some("a, b"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.set("Content-Length", "5");
        assert_eq!(headers.get("content-length"), Some("5"));
        assert_eq!(headers.get("CONTENT-LENGTH"), Some("5"));
    }

    #[test]
    fn replace_and_remove() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");
        headers.replace("content-type", "text/html");
        assert_eq!(headers.get("Content-Type"), Some("text/html"));

        assert_eq!(headers.remove("CONTENT-TYPE").as_deref(), Some("text/html"));
        assert!(headers.remove("content-type").is_none());
        assert!(headers.is_empty());
    }

    #[test]
    fn display_keeps_first_spelling_and_order() {
        let mut headers = Headers::new();
        headers.set("Content-Length", "13");
        headers.set("Content-Type", "text/plain");
        headers.set("content-length", "14");

        assert_eq!(
            headers.to_string(),
            "Content-Length: 13, 14\r\nContent-Type: text/plain\r\n"
        );

        let mut seen = Vec::new();
        headers.for_each(|n, v| seen.push(format!("{}={}", n, v)));
        assert_eq!(seen, ["Content-Length=13, 14", "Content-Type=text/plain"]);
    }
}
