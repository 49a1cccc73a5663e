use crate::datecode::{DateBounds, FilenameConvention};
use crate::error::{Error, Result};
use crate::listing::list_files_with;
use crate::print_bytes;
use log::*;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::io::ReaderStream;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

enum State {
    /// nothing polled yet
    Unresolved,
    Resolving(BoxFuture<Result<Vec<PathBuf>>>),
    Opening {
        index: usize,
        fut: BoxFuture<io::Result<File>>,
    },
    Streaming {
        index: usize,
        file: File,
    },
    Exhausted,
    Failed,
}

/// Externally visible lifecycle of a [`FileListReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unresolved,
    Resolving,
    /// reading (or opening) the file at this index of the resolved list
    Streaming(usize),
    Exhausted,
    Failed,
}

/// Reads the date-coded files of a directory as one continuous byte stream.
///
/// The file list is resolved on the first read, exactly once. Files are then
/// opened one at a time in list order; at most one handle is open, and it is
/// released when the file is exhausted, on error, or when the reader is dropped.
///
/// Any open or read failure ends the stream: the error is returned once
/// (with its original [`io::ErrorKind`]) and every later read returns EOF.
pub struct FileListReader {
    directory: PathBuf,
    bounds: DateBounds,
    convention: FilenameConvention,
    files: Option<Vec<PathBuf>>,
    bytes_read: u64,
    state: State,
}

impl FileListReader {
    pub fn new(directory: impl Into<PathBuf>, bounds: DateBounds) -> Self {
        Self::with_convention(directory, bounds, FilenameConvention::default())
    }

    pub fn with_convention(
        directory: impl Into<PathBuf>,
        bounds: DateBounds,
        convention: FilenameConvention,
    ) -> Self {
        FileListReader {
            directory: directory.into(),
            bounds,
            convention,
            files: None,
            bytes_read: 0,
            state: State::Unresolved,
        }
    }

    /// Skips directory listing and streams exactly `files`, in the given order.
    pub fn with_files(directory: impl Into<PathBuf>, files: Vec<PathBuf>) -> Self {
        let mut r = Self::new(directory, DateBounds::unbounded());
        r.files = Some(files);
        r
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn bounds(&self) -> &DateBounds {
        &self.bounds
    }

    /// The resolved file list, once the first read has resolved it.
    pub fn files(&self) -> Option<&[PathBuf]> {
        self.files.as_deref()
    }

    /// Number of bytes handed out so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn phase(&self) -> Phase {
        match &self.state {
            State::Unresolved => Phase::Unresolved,
            State::Resolving(_) => Phase::Resolving,
            State::Opening { index, .. } | State::Streaming { index, .. } => {
                Phase::Streaming(*index)
            }
            State::Exhausted => Phase::Exhausted,
            State::Failed => Phase::Failed,
        }
    }

    /// Pull-based chunk stream over this reader, reading about `chunk_size` bytes per chunk.
    pub fn into_chunk_stream(self, chunk_size: usize) -> ReaderStream<Self> {
        ReaderStream::with_capacity(self, chunk_size)
    }

    fn open_at(&mut self, index: usize) {
        // replacing the state drops the previous handle, if any
        let path = self.files.as_ref().and_then(|f| f.get(index)).cloned();
        self.state = match path {
            Some(path) => {
                debug!("opening {}", path.display());
                State::Opening {
                    index,
                    fut: Box::pin(File::open(path)),
                }
            }
            None => {
                debug!(
                    "end of stream after {} files, {}",
                    index,
                    print_bytes(self.bytes_read as f64)
                );
                State::Exhausted
            }
        };
    }

    fn path_at(&self, index: usize) -> PathBuf {
        self.files
            .as_ref()
            .and_then(|f| f.get(index))
            .cloned()
            .unwrap_or_default()
    }

    #[cfg(test)]
    fn holds_handle(&self) -> bool {
        matches!(self.state, State::Opening { .. } | State::Streaming { .. })
    }

    fn fail(&mut self, e: Error) -> Poll<io::Result<()>> {
        warn!("{}", e);
        self.state = State::Failed;
        Poll::Ready(Err(e.into()))
    }
}

impl AsyncRead for FileListReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            // an empty read would look like the end of the current file
            return Poll::Ready(Ok(()));
        }
        loop {
            match &mut this.state {
                State::Unresolved => {
                    if this.files.is_some() {
                        this.open_at(0);
                    } else {
                        debug!("resolving file list in {}", this.directory.display());
                        let directory = this.directory.clone();
                        let bounds = this.bounds.clone();
                        let convention = this.convention.clone();
                        this.state = State::Resolving(Box::pin(async move {
                            list_files_with(directory, &bounds, &convention).await
                        }));
                    }
                }
                State::Resolving(fut) => match ready!(fut.as_mut().poll(cx)) {
                    Ok(files) => {
                        this.files = Some(files);
                        this.open_at(0);
                    }
                    Err(e) => return this.fail(e),
                },
                State::Opening { index, fut } => {
                    let index = *index;
                    match ready!(fut.as_mut().poll(cx)) {
                        Ok(file) => this.state = State::Streaming { index, file },
                        Err(source) => {
                            let path = this.path_at(index);
                            return this.fail(Error::FileOpen { path, source });
                        }
                    }
                }
                State::Streaming { index, file } => {
                    let index = *index;
                    let before = buf.filled().len();
                    match ready!(Pin::new(file).poll_read(cx, buf)) {
                        Ok(()) => {
                            let n = buf.filled().len() - before;
                            if n > 0 {
                                this.bytes_read += n as u64;
                                return Poll::Ready(Ok(()));
                            }
                            trace!("file {} exhausted", index);
                            this.open_at(index + 1);
                        }
                        Err(source) => {
                            let path = this.path_at(index);
                            return this.fail(Error::FileRead { path, source });
                        }
                    }
                }
                State::Exhausted | State::Failed => return Poll::Ready(Ok(())),
            }
        }
    }
}
