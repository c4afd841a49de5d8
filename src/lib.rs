//! An incremental, push-driven parser for `multipart/form-data` request bodies.
//!
//! Chunks of the body are handed to [`Multipart::write`] as they arrive, in
//! whatever sizes the transport produces, and the input is closed with
//! [`Multipart::end`]. The boundary is matched byte by byte, so a delimiter
//! split across any number of chunks is still recognised and nothing is
//! buffered beyond the current header line. Text fields are decoded in memory;
//! parts with a `filename` are streamed to a [`Storage`].
//!
//! Results are reported as [`Event`]s. [`Event::End`] is only produced after
//! every uploaded file has been flushed and closed.
//!
//! # Examples
//!
//! ```
//! use parted::{Constraints, Multipart};
//! use bytes::Bytes;
//! use std::convert::Infallible;
//! use futures_util::stream::once;
//!
//! # async fn run() {
//! let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
//! let stream = once(async move { Result::<Bytes, Infallible>::Ok(Bytes::from(data)) });
//!
//! let multipart = Multipart::from_content_type("multipart/form-data; boundary=X-BOUNDARY", Constraints::new()).unwrap();
//! let form = multipart.parse_stream(stream).await.unwrap();
//!
//! assert_eq!(form.text("my_text_field"), Some("abcd"));
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(run());
//! ```
//!
//! ## Feature flags
//!
//! * `json`: adds [`Part::json`].
//! * `tokio-io`: adds [`TokioStorage`] and [`Multipart::parse_reader`].
//! * `log`: logs parser progress through the [`log`](https://docs.rs/log) crate.

#![cfg_attr(nightly, feature(doc_cfg))]

pub use bytes;
pub use constraints::Constraints;
pub use error::Error;
pub use form::Form;
pub use multipart::Multipart;
pub use part::{Event, Part, PartValue};
pub use sink::{DiskStorage, FileSink, Storage};
pub use size_limit::SizeLimit;
#[cfg(feature = "tokio-io")]
#[cfg_attr(nightly, doc(cfg(feature = "tokio-io")))]
pub use tokio_storage::TokioStorage;

#[cfg(feature = "log")]
macro_rules! trace {
    ($($t:tt)*) => (::log::trace!($($t)*));
}

#[cfg(feature = "log")]
macro_rules! debug {
    ($($t:tt)*) => (::log::debug!($($t)*));
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($t:tt)*) => {};
}

#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($t:tt)*) => {};
}

mod constants;
mod constraints;
mod content_disposition;
mod error;
mod form;
mod header;
mod helpers;
mod multipart;
mod part;
mod sink;
mod size_limit;
mod state;
#[cfg(feature = "tokio-io")]
mod tokio_storage;
mod tracker;

/// A Result type often returned from methods that can have `parted` errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Parses the `Content-Type` header to extract the boundary value.
///
/// # Examples
///
/// ```
/// let content_type = "multipart/form-data; boundary=ABCDEFG";
///
/// assert_eq!(parted::parse_boundary(content_type), Ok("ABCDEFG".to_owned()));
/// ```
pub fn parse_boundary<T: AsRef<str>>(content_type: T) -> Result<String> {
    let content_type = content_type.as_ref();
    let essence = content_type.split(';').next().unwrap_or_default().trim();

    let m = essence.parse::<mime::Mime>().map_err(Error::DecodeContentType)?;

    if !(m.type_() == mime::MULTIPART_FORM_DATA.type_() && m.subtype() == mime::MULTIPART_FORM_DATA.subtype()) {
        return Err(Error::NoMultipart);
    }

    helpers::param(content_type, "boundary")
        .filter(|boundary| !boundary.is_empty())
        .map(|boundary| boundary.into_owned())
        .ok_or(Error::NoBoundary)
}
