//! Rewindable request bodies.
//!
//! An upload stream is the body of a request as it was handed to the
//! network layer. It may already have been consumed by the time a consumer
//! looks at it, so consumers seek back to the start before reading.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

/// A seekable request body.
pub trait UploadStream: Read + Seek {
    /// Number of bytes that can be read from the current position.
    fn available(&mut self) -> io::Result<u64>;
}

impl<T: AsRef<[u8]>> UploadStream for Cursor<T> {
    fn available(&mut self) -> io::Result<u64> {
        let len = self.get_ref().as_ref().len() as u64;
        Ok(len.saturating_sub(self.position()))
    }
}

/// Bodies spooled to disk.
impl UploadStream for File {
    fn available(&mut self) -> io::Result<u64> {
        let len = self.metadata()?.len();
        let pos = self.stream_position()?;
        Ok(len.saturating_sub(pos))
    }
}

impl<S: UploadStream + ?Sized> UploadStream for Box<S> {
    fn available(&mut self) -> io::Result<u64> {
        (**self).available()
    }
}

/// Rewind a stream to its first byte.
pub fn rewind<S: UploadStream + ?Sized>(stream: &mut S) -> io::Result<()> {
    stream.seek(SeekFrom::Start(0)).map(|_| ())
}
