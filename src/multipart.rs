use crate::constants;
use crate::constraints::Constraints;
use crate::content_disposition::ContentDisposition;
use crate::header::HeaderParser;
use crate::part::{Event, Part, PartValue};
use crate::sink::{DiskStorage, PartSink, Storage, TextSink};
use crate::state::Stage;
use crate::tracker::CompletionTracker;
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use futures_util::task::noop_waker_ref;
use http::header::HeaderMap;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

/// Represents the implementation of `multipart/form-data` formatted data.
///
/// Body chunks are pushed in with [`write`](Multipart::write) and the input is
/// closed with [`end`](Multipart::end). Chunks may be of any size, down to a
/// single byte. Results come out as [`Event`]s, either one at a time through
/// [`next_event`](Multipart::next_event) or through the [`Stream`]
/// implementation, which also waits for file parts to be flushed.
///
/// Text parts are decoded in memory. Parts carrying a `filename` are streamed
/// to a [`Storage`], [`DiskStorage`] in the system temporary directory by
/// default.
///
/// # Examples
///
/// ```
/// use parted::{Event, Multipart};
///
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
/// let mut multipart = Multipart::new("X-BOUNDARY").unwrap();
///
/// for chunk in data.as_bytes().chunks(3) {
///     multipart.write(chunk);
/// }
/// multipart.end(None);
///
/// let mut texts = Vec::new();
/// while let Some(event) = multipart.next_event() {
///     match event {
///         Event::Part(part) => texts.push(part.text().unwrap().to_owned()),
///         Event::Error(err) => panic!("{}", err),
///         _ => {}
///     }
/// }
/// assert_eq!(texts, ["abcd"]);
/// ```
pub struct Multipart {
    key: Bytes,
    stage: Stage,
    headers: HeaderParser,
    current: Option<OpenPart>,
    tracker: CompletionTracker,
    storage: Box<dyn Storage>,
    constraints: Constraints,
    events: VecDeque<Event>,
    written: u64,
    next_part_idx: usize,
    input_closed: bool,
    finished: bool,
    waker: Option<Waker>,
}

struct OpenPart {
    name: String,
    file_name: Option<String>,
    content_type: Option<mime::Mime>,
    headers: HeaderMap,
    index: usize,
    size: u64,
    size_limit: u64,
    sink: PartSink,
}

impl Multipart {
    /// Construct a new `Multipart` instance for the given boundary.
    pub fn new<B: Into<String>>(boundary: B) -> crate::Result<Multipart> {
        Multipart::with_constraints(boundary, Constraints::default())
    }

    /// Construct a new `Multipart` instance with the given boundary and [`Constraints`].
    pub fn with_constraints<B: Into<String>>(boundary: B, constraints: Constraints) -> crate::Result<Multipart> {
        let boundary = boundary.into();

        if boundary.is_empty() {
            return Err(crate::Error::NoBoundary);
        }
        if boundary.bytes().any(|b| b == constants::CR || b == constants::LF) {
            return Err(crate::Error::InvalidBoundary);
        }

        Ok(Multipart {
            key: Bytes::from(constants::boundary_key(&boundary)),
            stage: Stage::Preamble,
            headers: HeaderParser::new(),
            current: None,
            tracker: CompletionTracker::new(),
            storage: Box::new(DiskStorage::default()),
            constraints,
            events: VecDeque::new(),
            written: 0,
            next_part_idx: 0,
            input_closed: false,
            finished: false,
            waker: None,
        })
    }

    /// Construct a new `Multipart` instance from a `Content-Type` header value.
    ///
    /// Fails before any byte is processed when the header names no boundary.
    pub fn from_content_type<T: AsRef<str>>(content_type: T, constraints: Constraints) -> crate::Result<Multipart> {
        let boundary = crate::parse_boundary(content_type)?;
        Multipart::with_constraints(boundary, constraints)
    }

    /// Sets where file parts are written.
    pub fn storage<S: Storage + 'static>(mut self, storage: S) -> Multipart {
        self.storage = Box::new(storage);
        self
    }

    /// Feeds the next chunk of the body.
    ///
    /// Returns `false` once the parser no longer accepts input, after an error
    /// or [`destroy`](Multipart::destroy). The error itself is delivered as
    /// [`Event::Error`]; on `false` the caller should stop reading the request.
    pub fn write(&mut self, chunk: &[u8]) -> bool {
        if self.stage == Stage::Failed || self.input_closed {
            return false;
        }

        if let Err(err) = self.parse(chunk) {
            self.fail(err);
        }

        self.wake();
        self.stage != Stage::Failed
    }

    /// Closes the input, optionally with a last chunk.
    ///
    /// If the closing boundary has not been seen, this fails with
    /// [`Error::IncompleteStream`](crate::Error::IncompleteStream).
    pub fn end(&mut self, chunk: Option<&[u8]>) -> bool {
        if let Some(chunk) = chunk {
            self.write(chunk);
        }

        if self.stage == Stage::Failed || self.input_closed {
            return false;
        }

        self.input_closed = true;

        if !self.stage.in_epilogue() {
            self.fail(crate::Error::IncompleteStream);
        } else {
            self.try_finish();
        }

        self.wake();
        self.stage != Stage::Failed
    }

    /// Stops parsing without emitting any further event.
    ///
    /// The open file, if any, is closed by dropping its sink. Content already
    /// written stays where it is.
    pub fn destroy(&mut self) {
        debug!("multipart parser destroyed in {}", self.stage.describe());

        self.stage = Stage::Failed;
        self.finished = true;
        self.current = None;
        self.tracker.clear();
        self.events.clear();
        self.wake();
    }

    /// Returns the next event that is ready without waiting.
    ///
    /// File closes that already completed are taken into account, so with
    /// [`DiskStorage`] this yields every event including [`Event::End`].
    pub fn next_event(&mut self) -> Option<Event> {
        let mut cx = Context::from_waker(noop_waker_ref());

        match self.poll_next_unpin(&mut cx) {
            Poll::Ready(event) => event,
            Poll::Pending => None,
        }
    }

    /// Number of file parts whose close has not completed yet.
    pub fn pending(&self) -> usize {
        self.tracker.pending()
    }

    /// Body bytes handed to part sinks so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Returns `true` once [`Event::End`] or [`Event::Error`] was produced, or
    /// the parser was destroyed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn parse(&mut self, chunk: &[u8]) -> crate::Result<()> {
        let mut idx = 0;

        while idx < chunk.len() {
            if self.stage == Stage::Body {
                match memchr::memchr(constants::CR, &chunk[idx..]) {
                    Some(offset) => {
                        self.write_body(&chunk[idx..idx + offset])?;
                        self.stage = Stage::MatchingBoundary { pos: 1 };
                        idx += offset + 1;
                    }
                    None => {
                        self.write_body(&chunk[idx..])?;
                        idx = chunk.len();
                    }
                }
                continue;
            }

            if self.step(chunk[idx])? {
                idx += 1;
            }
        }

        Ok(())
    }

    /// Runs one transition. Returns `false` when the byte must be processed
    /// again in the new stage.
    fn step(&mut self, byte: u8) -> crate::Result<bool> {
        match self.stage {
            Stage::Preamble => match byte {
                constants::CR => self.stage = Stage::PreambleBoundary { pos: 1 },
                constants::DASH => self.stage = Stage::PreambleBoundary { pos: 3 },
                _ => {}
            },
            Stage::PreambleBoundary { pos } => {
                if byte != self.key[pos] {
                    self.stage = Stage::Preamble;
                    return Ok(false);
                }
                self.stage = self.advance(pos, |pos| Stage::PreambleBoundary { pos });
            }
            Stage::MatchingBoundary { pos } => {
                if byte != self.key[pos] {
                    let key = self.key.clone();
                    self.write_body(&key[..pos])?;
                    self.stage = Stage::Body;
                    return Ok(false);
                }
                self.stage = self.advance(pos, |pos| Stage::MatchingBoundary { pos });
            }
            Stage::BoundaryEnd => match byte {
                constants::CR => self.stage = Stage::BoundaryCr,
                constants::DASH => self.stage = Stage::BoundaryDash,
                _ => return Err(self.unexpected(byte)),
            },
            Stage::BoundaryCr => match byte {
                constants::LF => {
                    self.finish_part();
                    self.stage = Stage::HeaderLineStart;
                }
                _ => return Err(self.unexpected(byte)),
            },
            Stage::BoundaryDash => match byte {
                constants::DASH => {
                    trace!("closing boundary found");
                    self.finish_part();
                    self.stage = Stage::Epilogue;
                }
                _ => return Err(self.unexpected(byte)),
            },
            Stage::HeaderLineStart => match byte {
                constants::CR => self.stage = Stage::HeaderBlockCr,
                _ => {
                    self.stage = Stage::HeaderName;
                    return Ok(false);
                }
            },
            Stage::HeaderName => match byte {
                constants::COLON => {
                    self.headers.finish_name()?;
                    self.stage = Stage::HeaderValueStart;
                }
                constants::CR | constants::LF => return Err(self.unexpected(byte)),
                _ => self.headers.push_name(byte)?,
            },
            Stage::HeaderValueStart => {
                self.stage = Stage::HeaderValue;
                if byte != constants::SPACE {
                    return Ok(false);
                }
            }
            Stage::HeaderValue => match byte {
                constants::CR => self.stage = Stage::HeaderValueCr,
                _ => self.headers.push_value(byte)?,
            },
            Stage::HeaderValueCr => match byte {
                constants::LF => {
                    let (name, value) = self.headers.finish_value()?;
                    self.events.push_back(Event::Header { name, value });
                    self.stage = Stage::HeaderLineStart;
                }
                _ => return Err(self.unexpected(byte)),
            },
            Stage::HeaderBlockCr => match byte {
                constants::LF => {
                    self.open_part()?;
                    self.stage = Stage::Body;
                }
                _ => return Err(self.unexpected(byte)),
            },
            Stage::Epilogue => match byte {
                constants::CR => self.stage = Stage::EpilogueCr,
                _ => return Err(crate::Error::TrailingData),
            },
            Stage::EpilogueCr => match byte {
                constants::LF => self.stage = Stage::EpilogueDone,
                _ => return Err(crate::Error::TrailingData),
            },
            Stage::EpilogueDone => return Err(crate::Error::TrailingData),
            // Handled in bulk by `parse`.
            Stage::Body => {}
            Stage::Failed => {}
        }

        Ok(true)
    }

    fn advance(&self, pos: usize, matching: impl FnOnce(usize) -> Stage) -> Stage {
        if pos + 1 == self.key.len() {
            Stage::BoundaryEnd
        } else {
            matching(pos + 1)
        }
    }

    fn unexpected(&self, byte: u8) -> crate::Error {
        crate::Error::UnexpectedByte {
            stage: self.stage.describe(),
            byte,
        }
    }

    fn open_part(&mut self) -> crate::Result<()> {
        let headers = self.headers.take_headers();
        let disposition = ContentDisposition::parse(&headers).ok_or(crate::Error::NoContentDisposition)?;
        let name = disposition.field_name.unwrap_or_default();

        if !self.constraints.is_it_allowed(&name) {
            return Err(crate::Error::UnknownField { field_name: name });
        }

        let content_type = Part::parse_content_type(&headers);

        // An empty filename is what browsers send for a file input left blank.
        let sink = match disposition.file_name.as_deref() {
            Some(file_name) if !file_name.is_empty() => {
                let file = self.storage.open(&name, file_name).map_err(crate::Error::SinkOpen)?;
                PartSink::File(file)
            }
            _ => {
                let charset = content_type
                    .as_ref()
                    .and_then(|mime| mime.get_param(mime::CHARSET))
                    .map(|charset| charset.as_str());
                PartSink::Text(TextSink::for_charset(charset))
            }
        };

        let index = self.next_part_idx;
        self.next_part_idx += 1;

        debug!("part {} opened: {:?}", index, name);

        self.current = Some(OpenPart {
            size_limit: self.constraints.size_limit.extract_size_limit_for(&name),
            name,
            file_name: disposition.file_name,
            content_type,
            headers,
            index,
            size: 0,
            sink,
        });

        Ok(())
    }

    fn write_body(&mut self, bytes: &[u8]) -> crate::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }

        let part = match self.current.as_mut() {
            Some(part) => part,
            None => return Ok(()),
        };

        let len = bytes.len() as u64;

        self.written += len;
        if self.written > self.constraints.size_limit.whole_stream {
            return Err(crate::Error::StreamSizeExceeded {
                limit: self.constraints.size_limit.whole_stream,
            });
        }

        part.size += len;
        if part.size > part.size_limit {
            return Err(crate::Error::FieldSizeExceeded {
                limit: part.size_limit,
                field_name: part.name.clone(),
            });
        }

        part.sink.write(bytes)
    }

    /// Hands the open part's sink over: text is finished in place, files are
    /// closed and tracked until the close completes.
    fn finish_part(&mut self) {
        let part = match self.current.take() {
            Some(part) => part,
            None => return,
        };

        let value = match part.sink {
            PartSink::Text(text) => PartValue::Text(text.finish()),
            PartSink::File(file) => {
                let path = file.path().to_path_buf();
                self.tracker.track(path.clone(), file.close());
                PartValue::File(path)
            }
        };

        debug!("part {} finished: {:?}, {} bytes", part.index, part.name, part.size);

        self.events.push_back(Event::Part(Part {
            name: part.name,
            file_name: part.file_name,
            content_type: part.content_type,
            headers: part.headers,
            index: part.index,
            value,
        }));
    }

    fn try_finish(&mut self) {
        if !self.finished && self.input_closed && self.stage.in_epilogue() && self.tracker.pending() == 0 {
            trace!("multipart message complete, {} body bytes", self.written);
            self.finished = true;
            self.events.push_back(Event::End);
        }
    }

    fn fail(&mut self, err: crate::Error) {
        if self.finished {
            return;
        }

        debug!("multipart parsing failed in {}: {}", self.stage.describe(), err);

        self.stage = Stage::Failed;
        self.finished = true;
        self.current = None;
        self.tracker.clear();
        self.events.push_back(Event::Error(err));
    }

    fn wake(&mut self) {
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }
}

impl Stream for Multipart {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if let Some(event) = this.events.pop_front() {
                return Poll::Ready(Some(event));
            }

            if this.finished {
                return Poll::Ready(None);
            }

            match this.tracker.poll_closed(cx) {
                Poll::Ready(Some((_path, Ok(())))) => {
                    trace!("upload closed: {}", _path.display());
                    this.try_finish();
                }
                Poll::Ready(Some((_, Err(err)))) => this.fail(crate::Error::SinkClose(err)),
                Poll::Ready(None) | Poll::Pending => {
                    this.waker = Some(cx.waker().clone());
                    return Poll::Pending;
                }
            }
        }
    }
}
