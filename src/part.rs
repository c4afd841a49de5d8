use http::header::{self, HeaderMap, HeaderName, HeaderValue};
#[cfg(feature = "json")]
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// The decoded content of a part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartValue {
    /// A field without `filename`, decoded to text.
    Text(String),
    /// A file part, streamed to the given path.
    File(PathBuf),
}

/// A completed part of a `multipart/form-data` message.
///
/// # Examples
///
/// ```
/// use parted::{Event, Multipart, PartValue};
///
/// let mut multipart = Multipart::new("X-BOUNDARY").unwrap();
/// multipart.write(b"--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n");
/// multipart.end(None);
///
/// while let Some(event) = multipart.next_event() {
///     if let Event::Part(part) = event {
///         assert_eq!(part.name(), "my_text_field");
///         assert_eq!(part.value(), &PartValue::Text("abcd".to_owned()));
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Part {
    pub(crate) name: String,
    pub(crate) file_name: Option<String>,
    pub(crate) content_type: Option<mime::Mime>,
    pub(crate) headers: HeaderMap,
    pub(crate) index: usize,
    pub(crate) value: PartValue,
}

impl Part {
    /// The field name found in the
    /// [`Content-Disposition`](https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Content-Disposition)
    /// header, empty when the header carried no `name`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file name found in the `Content-Disposition` header.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Get the content type of the part.
    pub fn content_type(&self) -> Option<&mime::Mime> {
        self.content_type.as_ref()
    }

    /// Get a map of headers as [`HeaderMap`].
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Position of the part in the message, starting at zero.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn value(&self) -> &PartValue {
        &self.value
    }

    pub fn into_value(self) -> PartValue {
        self.value
    }

    /// The decoded text of a non-file part.
    pub fn text(&self) -> Option<&str> {
        match self.value {
            PartValue::Text(ref text) => Some(text),
            PartValue::File(_) => None,
        }
    }

    /// The path a file part was stored at.
    pub fn path(&self) -> Option<&Path> {
        match self.value {
            PartValue::File(ref path) => Some(path),
            PartValue::Text(_) => None,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.value, PartValue::File(_))
    }

    /// The `Content-Transfer-Encoding` the client declared, if any. The body is
    /// stored as received.
    pub fn transfer_encoding(&self) -> Option<&HeaderValue> {
        self.headers.get("content-transfer-encoding")
    }

    /// Try to deserialize a text part as JSON.
    ///
    /// # Optional
    ///
    /// This requires the optional `json` feature to be enabled.
    #[cfg(feature = "json")]
    #[cfg_attr(nightly, doc(cfg(feature = "json")))]
    pub fn json<T: DeserializeOwned>(&self) -> crate::Result<T> {
        match self.value {
            PartValue::Text(ref text) => serde_json::from_str(text).map_err(crate::Error::DecodeJson),
            PartValue::File(ref path) => {
                let file = std::fs::File::open(path).map_err(crate::Error::SinkOpen)?;
                serde_json::from_reader(std::io::BufReader::new(file)).map_err(crate::Error::DecodeJson)
            }
        }
    }

    pub(crate) fn parse_content_type(headers: &HeaderMap) -> Option<mime::Mime> {
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<mime::Mime>().ok())
    }
}

/// Everything a [`Multipart`](crate::Multipart) reports while parsing.
#[derive(Debug)]
pub enum Event {
    /// A header line of the part currently being read.
    Header { name: HeaderName, value: HeaderValue },
    /// A part finished. Parts are reported in the order they appear.
    Part(Part),
    /// Parsing failed. No further events follow.
    Error(crate::Error),
    /// The message was fully parsed and every file was closed. No further events follow.
    End,
}
