use encoding_rs::{CoderResult, Decoder, Encoding, UTF_8};
use futures_util::future::{self, BoxFuture};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A destination for the body of a file part.
///
/// `write` must not block the parser: implementations either write
/// synchronously to a buffered handle or queue the bytes. `close` flushes
/// whatever is outstanding; the parser keeps scanning input while the returned
/// future is pending and only reports the end of the message after it resolves.
pub trait FileSink: Send {
    /// Where the part's content ends up.
    fn path(&self) -> &Path;

    /// Appends body bytes.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flushes and closes the file.
    fn close(self: Box<Self>) -> BoxFuture<'static, io::Result<()>>;
}

/// Opens a [`FileSink`] for every part that carries a `filename`.
///
/// Where files go and how they are named is up to the implementation.
pub trait Storage: Send {
    /// Opens a sink for the field `field_name`, whose client-side file name was `file_name`.
    fn open(&mut self, field_name: &str, file_name: &str) -> io::Result<Box<dyn FileSink>>;
}

static UPLOAD_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Builds `<root>/<millis>_<n>_<name>` where `name` is at most the first ten
/// characters of the client file name's last path component.
pub(crate) fn upload_path(root: &Path, file_name: &str) -> PathBuf {
    let base = file_name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let short: String = base
        .chars()
        .filter(|c| !c.is_control() && *c != ':')
        .take(10)
        .collect();

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let seq = UPLOAD_COUNTER.fetch_add(1, Ordering::Relaxed);

    root.join(format!("{}_{}_{}", millis, seq, short.trim_start_matches('.')))
}

/// Stores uploads as plain files under a root directory using blocking
/// buffered writes.
///
/// The directory must already exist.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Stores files under `root`.
    pub fn new<P: Into<PathBuf>>(root: P) -> DiskStorage {
        DiskStorage { root: root.into() }
    }

    /// Root directory uploads are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for DiskStorage {
    /// Uses the system temporary directory.
    fn default() -> Self {
        DiskStorage::new(std::env::temp_dir())
    }
}

impl Storage for DiskStorage {
    fn open(&mut self, _field_name: &str, file_name: &str) -> io::Result<Box<dyn FileSink>> {
        let path = upload_path(&self.root, file_name);
        let file = File::create(&path)?;

        Ok(Box::new(DiskFile {
            path,
            writer: BufWriter::new(file),
        }))
    }
}

struct DiskFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink for DiskFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, io::Result<()>> {
        let DiskFile { writer, .. } = *self;
        let res = writer
            .into_inner()
            .map_err(|err| err.into_error())
            .and_then(|file| file.sync_all());
        Box::pin(future::ready(res))
    }
}

/// Decodes a text part incrementally, keeping multi-byte sequences that are
/// split between chunks.
pub(crate) struct TextSink {
    decoder: Decoder,
    text: String,
}

impl TextSink {
    pub(crate) fn new(encoding: &'static Encoding) -> Self {
        TextSink {
            decoder: encoding.new_decoder(),
            text: String::new(),
        }
    }

    pub(crate) fn for_charset(charset: Option<&str>) -> Self {
        let encoding = charset
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        TextSink::new(encoding)
    }

    pub(crate) fn write(&mut self, bytes: &[u8]) {
        self.decode(bytes, false);
    }

    pub(crate) fn finish(mut self) -> String {
        self.decode(&[], true);
        self.text
    }

    fn decode(&mut self, mut src: &[u8], last: bool) {
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(src.len())
                .unwrap_or(src.len() + 16);
            self.text.reserve(needed);

            let (result, read, _) = self.decoder.decode_to_string(src, &mut self.text, last);
            src = &src[read..];

            match result {
                CoderResult::InputEmpty => return,
                CoderResult::OutputFull => continue,
            }
        }
    }
}

/// Where the body of the part being read goes.
pub(crate) enum PartSink {
    Text(TextSink),
    File(Box<dyn FileSink>),
}

impl PartSink {
    pub(crate) fn write(&mut self, bytes: &[u8]) -> crate::Result<()> {
        match self {
            PartSink::Text(text) => {
                text.write(bytes);
                Ok(())
            }
            PartSink::File(file) => file.write(bytes).map_err(crate::Error::SinkWrite),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    #[test]
    fn test_text_sink_split_multibyte() {
        let input = "héllo 你好 wörld".as_bytes();

        for split in 0..input.len() {
            let mut sink = TextSink::for_charset(None);
            sink.write(&input[..split]);
            sink.write(&input[split..]);
            assert_eq!(sink.finish(), "héllo 你好 wörld");
        }

        let mut sink = TextSink::for_charset(Some("utf-8"));
        for b in input {
            sink.write(std::slice::from_ref(b));
        }
        assert_eq!(sink.finish(), "héllo 你好 wörld");
    }

    #[test]
    fn test_text_sink_charset() {
        let mut sink = TextSink::for_charset(Some("iso-8859-1"));
        sink.write(&[0x63, 0x61, 0x66, 0xe9]);
        assert_eq!(sink.finish(), "café");

        let mut sink = TextSink::for_charset(Some("no-such-charset"));
        sink.write(b"plain");
        assert_eq!(sink.finish(), "plain");
    }

    #[test]
    fn test_upload_path() {
        let root = Path::new("/uploads");

        let path = upload_path(root, "../../etc/passwd");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(path.starts_with(root));
        assert!(name.ends_with("_passwd"));

        let path = upload_path(root, "C:\\Users\\me\\a-very-long-file-name.png");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("_a-very-lon"));

        assert_ne!(upload_path(root, "same.txt"), upload_path(root, "same.txt"));
    }

    #[test]
    fn test_disk_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = DiskStorage::new(dir.path());

        let mut sink = storage.open("file", "hello.txt").unwrap();
        let path = sink.path().to_path_buf();
        sink.write(b"hello ").unwrap();
        sink.write(b"world").unwrap();
        sink.close().now_or_never().unwrap().unwrap();

        assert!(path.starts_with(dir.path()));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
    }
}
