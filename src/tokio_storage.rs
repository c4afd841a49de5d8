use crate::sink::{upload_path, FileSink, Storage};
use bytes::Bytes;
use futures_util::future::{BoxFuture, FutureExt};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Stores uploads under a root directory with a tokio writer task per file.
///
/// `write` only queues the bytes, so parsing never waits on the disk. Must be
/// used from within a tokio runtime.
///
/// # Optional
///
/// This requires the optional `tokio-io` feature to be enabled.
#[derive(Debug, Clone)]
pub struct TokioStorage {
    root: PathBuf,
}

impl TokioStorage {
    /// Stores files under `root`, which must already exist.
    pub fn new<P: Into<PathBuf>>(root: P) -> TokioStorage {
        TokioStorage { root: root.into() }
    }
}

impl Storage for TokioStorage {
    fn open(&mut self, _field_name: &str, file_name: &str) -> io::Result<Box<dyn FileSink>> {
        let path = upload_path(&self.root, file_name);
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(write_queued(path.clone(), rx));

        Ok(Box::new(TokioFile { path, tx, task }))
    }
}

async fn write_queued(path: PathBuf, mut rx: mpsc::UnboundedReceiver<Bytes>) -> io::Result<()> {
    let mut file = File::create(&path).await?;

    while let Some(bytes) = rx.recv().await {
        file.write_all(&bytes).await?;
    }

    file.flush().await?;
    file.sync_all().await
}

struct TokioFile {
    path: PathBuf,
    tx: mpsc::UnboundedSender<Bytes>,
    task: JoinHandle<io::Result<()>>,
}

impl FileSink for TokioFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        // The writer task only hangs up after a failed write; its error surfaces on close.
        if self.tx.send(Bytes::copy_from_slice(bytes)).is_err() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "upload writer stopped"));
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, io::Result<()>> {
        let TokioFile { tx, task, .. } = *self;
        drop(tx);

        async move {
            match task.await {
                Ok(res) => res,
                Err(err) => Err(io::Error::new(io::ErrorKind::Other, err)),
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = TokioStorage::new(dir.path());

        let mut sink = storage.open("file", "upload.bin").unwrap();
        let path = sink.path().to_path_buf();
        for chunk in [&b"abc"[..], b"def", b"\r\n\x00\xff"] {
            sink.write(chunk).unwrap();
        }
        sink.close().await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"abcdef\r\n\x00\xff");
    }
}
