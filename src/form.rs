use crate::part::{Event, Part};
use crate::Multipart;
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use std::path::Path;
#[cfg(feature = "tokio-io")]
use tokio::io::AsyncRead;
#[cfg(feature = "tokio-io")]
use tokio_util::io::ReaderStream;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every part of a fully parsed message, in the order they were sent.
///
/// Lookups by name return the last part with that name.
#[derive(Debug, Default)]
pub struct Form {
    parts: Vec<Part>,
}

impl Form {
    /// Returns the last part named `name`.
    pub fn get(&self, name: &str) -> Option<&Part> {
        self.parts.iter().rev().find(|part| part.name() == name)
    }

    /// Returns the text of the last part named `name`, if it is a text part.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|part| part.text())
    }

    /// Returns the stored path of the last part named `name`, if it is a file part.
    pub fn file(&self, name: &str) -> Option<&Path> {
        self.get(name).and_then(|part| part.path())
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    fn accept(&mut self, event: Event) -> crate::Result<()> {
        match event {
            Event::Part(part) => self.parts.push(part),
            Event::Error(err) => return Err(err),
            Event::Header { .. } | Event::End => {}
        }
        Ok(())
    }
}

impl Multipart {
    /// Reads a whole body from a stream of chunks and collects its parts.
    ///
    /// Resolves once every file part has been closed. A failing stream destroys
    /// the parser and yields [`Error::StreamReadFailed`](crate::Error::StreamReadFailed).
    ///
    /// # Examples
    ///
    /// ```
    /// use bytes::Bytes;
    /// use futures_util::stream;
    /// use parted::Multipart;
    /// use std::convert::Infallible;
    ///
    /// # async fn run() {
    /// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
    /// let stream = stream::iter(data.as_bytes().chunks(4).map(|chunk| Ok::<_, Infallible>(Bytes::copy_from_slice(chunk))));
    ///
    /// let form = Multipart::new("X-BOUNDARY").unwrap().parse_stream(stream).await.unwrap();
    /// assert_eq!(form.text("my_text_field"), Some("abcd"));
    /// # }
    /// # tokio::runtime::Runtime::new().unwrap().block_on(run());
    /// ```
    pub async fn parse_stream<S, O, E>(mut self, stream: S) -> crate::Result<Form>
    where
        S: Stream<Item = Result<O, E>>,
        O: Into<Bytes>,
        E: Into<BoxError>,
    {
        futures_util::pin_mut!(stream);

        let mut form = Form::default();

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => {
                    let chunk: Bytes = chunk.into();
                    self.write(&chunk);
                }
                Err(err) => {
                    self.destroy();
                    return Err(crate::Error::StreamReadFailed(err.into()));
                }
            }

            while let Some(event) = self.next_event() {
                form.accept(event)?;
            }
        }

        self.end(None);

        while let Some(event) = self.next().await {
            form.accept(event)?;
        }

        Ok(form)
    }

    /// Reads a whole body from an [`AsyncRead`] and collects its parts.
    ///
    /// # Optional
    ///
    /// This requires the optional `tokio-io` feature to be enabled.
    #[cfg(feature = "tokio-io")]
    #[cfg_attr(nightly, doc(cfg(feature = "tokio-io")))]
    pub async fn parse_reader<R: AsyncRead>(self, reader: R) -> crate::Result<Form> {
        self.parse_stream(ReaderStream::new(reader)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::io;

    #[tokio::test]
    async fn test_parse_stream() {
        let data = "--X\r\nContent-Disposition: form-data; name=a\r\n\r\none\r\n--X\r\nContent-Disposition: form-data; name=a\r\n\r\ntwo\r\n--X\r\nContent-Disposition: form-data; name=b\r\n\r\nthree\r\n--X--\r\n";
        let stream = stream::iter(data.bytes().map(|b| Ok::<_, io::Error>(vec![b])));

        let form = Multipart::new("X").unwrap().parse_stream(stream).await.unwrap();

        assert_eq!(form.len(), 3);
        assert_eq!(form.text("a"), Some("two"));
        assert_eq!(form.text("b"), Some("three"));
        assert_eq!(form.file("a"), None);
        assert!(form.get("c").is_none());
        assert_eq!(form.parts()[0].text(), Some("one"));
    }

    #[tokio::test]
    async fn test_parse_stream_read_error() {
        let chunks: Vec<Result<&'static [u8], io::Error>> = vec![
            Ok(b"--X\r\nContent-Disposition: form-data; name=a\r\n\r\n"),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];

        let res = Multipart::new("X").unwrap().parse_stream(stream::iter(chunks)).await;
        assert!(matches!(res, Err(crate::Error::StreamReadFailed(_))));
    }

    #[tokio::test]
    async fn test_parse_stream_underflow() {
        let chunks = vec![Ok::<_, io::Error>("--X\r\nContent-Disposition: form-data; name=a\r\n\r\nabc")];

        let res = Multipart::new("X").unwrap().parse_stream(stream::iter(chunks)).await;
        assert_eq!(res.unwrap_err(), crate::Error::IncompleteStream);
    }
}
