use std::fmt::{self, Debug, Display, Formatter};
use std::io;

use http::StatusCode;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur while parsing a multipart stream.
///
/// Every error is fatal for the [`Multipart`](crate::Multipart) instance that
/// produced it. Use [`Error::is_overflow`] or [`Error::status_code`] to decide
/// how to answer the request.
#[non_exhaustive]
pub enum Error {
    /// The `Content-Type` header is not `multipart/form-data`.
    NoMultipart,

    /// Failed to convert the `Content-Type` to [`mime::Mime`] type.
    DecodeContentType(mime::FromStrError),

    /// No boundary found in `Content-Type` header.
    NoBoundary,

    /// The boundary contains a byte that can never appear in a delimiter line.
    InvalidBoundary,

    /// A byte arrived that has no valid transition in the current stage.
    UnexpectedByte { stage: &'static str, byte: u8 },

    /// Failed to decode the field's raw header name to
    /// [`HeaderName`](http::header::HeaderName) type.
    DecodeHeaderName { name: String, cause: BoxError },

    /// Failed to decode the field's raw header value to
    /// [`HeaderValue`](http::header::HeaderValue) type.
    DecodeHeaderValue { value: Vec<u8>, cause: BoxError },

    /// A part's header block had no `Content-Disposition` header.
    NoContentDisposition,

    /// A header name or value exceeded the header buffer.
    HeaderTooLarge { limit: usize },

    /// A part carried more headers than allowed.
    TooManyHeaders { limit: usize },

    /// An unknown field is detected when multipart
    /// [`constraints`](crate::Constraints::allowed_fields) are added.
    UnknownField { field_name: String },

    /// The input ended before the closing boundary.
    IncompleteStream,

    /// Bytes other than a single CRLF followed the closing boundary.
    TrailingData,

    /// The incoming field size exceeded the maximum limit.
    FieldSizeExceeded { limit: u64, field_name: String },

    /// The incoming stream size exceeded the maximum limit.
    StreamSizeExceeded { limit: u64 },

    /// The storage could not open a file for an uploaded part.
    SinkOpen(io::Error),

    /// Writing a part's body to its file failed.
    SinkWrite(io::Error),

    /// Flushing and closing a part's file failed.
    SinkClose(io::Error),

    /// Stream read failed.
    StreamReadFailed(BoxError),

    /// Failed to decode the field data as `JSON` in
    /// [`part.json()`](crate::Part::json) method.
    #[cfg(feature = "json")]
    #[cfg_attr(nightly, doc(cfg(feature = "json")))]
    DecodeJson(serde_json::Error),
}

impl Error {
    /// Returns `true` for errors caused by input exceeding a size limit.
    ///
    /// Those map to `413 Payload Too Large` rather than `400 Bad Request`.
    pub fn is_overflow(&self) -> bool {
        matches!(
            self,
            Error::HeaderTooLarge { .. }
                | Error::TooManyHeaders { .. }
                | Error::FieldSizeExceeded { .. }
                | Error::StreamSizeExceeded { .. }
        )
    }

    /// Returns `true` when the failure came from the storage side.
    pub fn is_sink_error(&self) -> bool {
        matches!(self, Error::SinkOpen(_) | Error::SinkWrite(_) | Error::SinkClose(_))
    }

    /// The response status a server would answer this error with.
    pub fn status_code(&self) -> StatusCode {
        if self.is_overflow() {
            StatusCode::PAYLOAD_TOO_LARGE
        } else if self.is_sink_error() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::BAD_REQUEST
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoMultipart => write!(f, "Content-Type is not multipart/form-data"),
            Error::DecodeContentType(e) => write!(f, "failed to convert Content-Type to `mime::Mime` type: {}", e),
            Error::NoBoundary => write!(f, "multipart boundary not found in Content-Type"),
            Error::InvalidBoundary => write!(f, "multipart boundary contains a line break"),
            Error::UnexpectedByte { stage, byte } => {
                write!(f, "unexpected byte {:?} while reading {}", char::from(*byte), stage)
            }
            Error::DecodeHeaderName { name, cause } => {
                write!(f, "failed to decode field's raw header name: {:?} {}", name, cause)
            }
            Error::DecodeHeaderValue { cause, .. } => write!(f, "failed to decode field's raw header value: {}", cause),
            Error::NoContentDisposition => write!(f, "part received without a Content-Disposition header"),
            Error::HeaderTooLarge { limit } => write!(f, "part header exceeded the maximum size: {} bytes", limit),
            Error::TooManyHeaders { limit } => write!(f, "part exceeded the maximum number of headers: {}", limit),
            Error::UnknownField { field_name } => write!(f, "unknown field received: {:?}", field_name),
            Error::IncompleteStream => write!(f, "incomplete multipart stream"),
            Error::TrailingData => write!(f, "unexpected data after the closing boundary"),
            Error::FieldSizeExceeded { limit, field_name } => write!(
                f,
                "field {:?} exceeded the maximum size limit: {} bytes",
                field_name, limit
            ),
            Error::StreamSizeExceeded { limit } => {
                write!(f, "stream size exceeded the maximum limit: {} bytes", limit)
            }
            Error::SinkOpen(e) => write!(f, "failed to open upload file: {}", e),
            Error::SinkWrite(e) => write!(f, "failed to write upload file: {}", e),
            Error::SinkClose(e) => write!(f, "failed to close upload file: {}", e),
            Error::StreamReadFailed(e) => write!(f, "stream read failed: {}", e),
            #[cfg(feature = "json")]
            Error::DecodeJson(e) => write!(f, "failed to decode field data as JSON: {}", e),
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::DecodeContentType(e) => Some(e),
            Error::DecodeHeaderName { cause, .. } | Error::DecodeHeaderValue { cause, .. } => Some(&**cause),
            Error::SinkOpen(e) | Error::SinkWrite(e) | Error::SinkClose(e) => Some(e),
            Error::StreamReadFailed(e) => Some(&**e),
            #[cfg(feature = "json")]
            Error::DecodeJson(e) => Some(e),
            _ => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code() {
        assert_eq!(Error::HeaderTooLarge { limit: 200 }.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            Error::StreamSizeExceeded { limit: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(Error::NoBoundary.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::UnexpectedByte { stage: "boundary", byte: b'x' }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::SinkWrite(io::Error::new(io::ErrorKind::Other, "disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display() {
        let err = Error::UnexpectedByte { stage: "header value", byte: b'x' };
        assert_eq!(err.to_string(), "unexpected byte 'x' while reading header value");
        assert_eq!(
            Error::FieldSizeExceeded { limit: 4, field_name: "a".to_owned() }.to_string(),
            "field \"a\" exceeded the maximum size limit: 4 bytes"
        );
    }
}
