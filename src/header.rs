use crate::constants;
use bytes::BytesMut;
use http::header::{HeaderMap, HeaderName, HeaderValue};

/// Accumulates the header block of the current part.
///
/// The scratch buffer holds one header name or value at a time and is capped at
/// [`MAX_HEADER_FIELD_SIZE`](constants::MAX_HEADER_FIELD_SIZE) bytes.
#[derive(Debug)]
pub(crate) struct HeaderParser {
    buf: BytesMut,
    name: Option<HeaderName>,
    headers: HeaderMap,
    count: usize,
}

impl HeaderParser {
    pub(crate) fn new() -> Self {
        HeaderParser {
            buf: BytesMut::with_capacity(constants::MAX_HEADER_FIELD_SIZE),
            name: None,
            headers: HeaderMap::new(),
            count: 0,
        }
    }

    /// Pushes a header name byte, lower-casing it.
    pub(crate) fn push_name(&mut self, byte: u8) -> crate::Result<()> {
        self.push(byte.to_ascii_lowercase())
    }

    pub(crate) fn push_value(&mut self, byte: u8) -> crate::Result<()> {
        self.push(byte)
    }

    fn push(&mut self, byte: u8) -> crate::Result<()> {
        if self.buf.len() >= constants::MAX_HEADER_FIELD_SIZE {
            return Err(crate::Error::HeaderTooLarge {
                limit: constants::MAX_HEADER_FIELD_SIZE,
            });
        }

        self.buf.extend_from_slice(&[byte]);
        Ok(())
    }

    pub(crate) fn finish_name(&mut self) -> crate::Result<()> {
        let raw = self.buf.split();
        let trimmed = raw.trim_ascii();

        let name = HeaderName::from_bytes(trimmed).map_err(|err| crate::Error::DecodeHeaderName {
            name: String::from_utf8_lossy(trimmed).into_owned(),
            cause: err.into(),
        })?;

        self.name = Some(name);
        Ok(())
    }

    /// Completes the current header line and returns it for the `Header` event.
    pub(crate) fn finish_value(&mut self) -> crate::Result<(HeaderName, HeaderValue)> {
        let raw = self.buf.split().freeze();

        let value = HeaderValue::from_maybe_shared(raw.clone()).map_err(|err| crate::Error::DecodeHeaderValue {
            value: raw.to_vec(),
            cause: err.into(),
        })?;

        let name = match self.name.take() {
            Some(name) => name,
            None => {
                return Err(crate::Error::UnexpectedByte {
                    stage: "header value",
                    byte: constants::LF,
                })
            }
        };

        self.count += 1;
        if self.count > constants::MAX_HEADERS {
            return Err(crate::Error::TooManyHeaders {
                limit: constants::MAX_HEADERS,
            });
        }

        self.headers.insert(name.clone(), value.clone());
        Ok((name, value))
    }

    /// Hands over the finished header block and resets for the next part.
    pub(crate) fn take_headers(&mut self) -> HeaderMap {
        self.buf.clear();
        self.name = None;
        self.count = 0;
        std::mem::take(&mut self.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header;

    fn feed_line(parser: &mut HeaderParser, name: &str, value: &str) -> crate::Result<(HeaderName, HeaderValue)> {
        for b in name.bytes() {
            parser.push_name(b)?;
        }
        parser.finish_name()?;
        for b in value.bytes() {
            parser.push_value(b)?;
        }
        parser.finish_value()
    }

    #[test]
    fn test_names_are_lower_cased() {
        let mut parser = HeaderParser::new();
        let (name, value) = feed_line(&mut parser, "Content-Type", "text/plain").unwrap();

        assert_eq!(name, header::CONTENT_TYPE);
        assert_eq!(value, "text/plain");

        let headers = parser.take_headers();
        assert_eq!(headers.get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn test_last_write_wins() {
        let mut parser = HeaderParser::new();
        feed_line(&mut parser, "X-Thing", "one").unwrap();
        feed_line(&mut parser, "x-thing", "two").unwrap();

        let headers = parser.take_headers();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("x-thing").unwrap(), "two");
        assert!(parser.take_headers().is_empty());
    }

    #[test]
    fn test_field_cap() {
        let mut parser = HeaderParser::new();
        for _ in 0..constants::MAX_HEADER_FIELD_SIZE {
            parser.push_name(b'a').unwrap();
        }
        assert_eq!(
            parser.push_name(b'a'),
            Err(crate::Error::HeaderTooLarge {
                limit: constants::MAX_HEADER_FIELD_SIZE
            })
        );
    }

    #[test]
    fn test_header_count_cap() {
        let mut parser = HeaderParser::new();
        for idx in 0..constants::MAX_HEADERS {
            feed_line(&mut parser, &format!("x-{}", idx), "v").unwrap();
        }
        assert_eq!(
            feed_line(&mut parser, "x-last", "v"),
            Err(crate::Error::TooManyHeaders {
                limit: constants::MAX_HEADERS
            })
        );
    }

    #[test]
    fn test_invalid_name() {
        let mut parser = HeaderParser::new();
        assert!(matches!(
            feed_line(&mut parser, "bad name", "v"),
            Err(crate::Error::DecodeHeaderName { .. })
        ));
    }
}
