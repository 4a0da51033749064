//! Built-in sourcers, renderers, and error handlers.
//!
//! These cover the common wiring (serve a directory, copy bytes through, log
//! or fall back on failures) and double as reference implementations of the
//! capability contracts.

mod dir;
mod handlers;
mod memory;
mod passthrough;

pub use dir::{DirCollection, DirSourcer};
pub use handlers::{ChainErrorHandler, FallbackErrorHandler, LogErrorHandler};
pub use memory::{MemoryCollection, MemorySourcer};
pub use passthrough::PassthroughRenderer;

use std::io::{Cursor, Read};

use folio_shared::Result;

use crate::{File, FileInfo};

/// An in-memory file handle, used for collection entries and listings.
pub(crate) struct BytesFile {
    info: FileInfo,
    content: Cursor<Vec<u8>>,
}

impl BytesFile {
    pub(crate) fn new(name: impl Into<String>, content: Vec<u8>, is_dir: bool) -> Self {
        Self {
            info: FileInfo {
                name: name.into(),
                size: Some(content.len() as u64),
                is_dir,
            },
            content: Cursor::new(content),
        }
    }

    /// Build a directory listing: one entry per line, directories end in `/`.
    pub(crate) fn listing(name: impl Into<String>, mut entries: Vec<String>) -> Self {
        entries.sort();
        let mut body = entries.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        Self::new(name, body.into_bytes(), true)
    }
}

impl Read for BytesFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.content.read(buf)
    }
}

impl File for BytesFile {
    fn info(&self) -> FileInfo {
        self.info.clone()
    }

    fn rewind(&mut self) -> Result<()> {
        self.content.set_position(0);
        Ok(())
    }
}
