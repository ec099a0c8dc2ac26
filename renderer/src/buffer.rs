use std::collections::VecDeque;
use std::io::{self, Write};

use memchr::memchr;

use crate::error::FlattenError;

/// An ordered, append-only chain of immutable byte chunks.
///
/// The total size is kept alongside the chunks and updated with every
/// insertion and removal, so `len()` never walks the chain.
#[derive(Debug, Default, Clone)]
pub struct BufferChain {
    chunks: VecDeque<Box<[u8]>>,
    size: usize,
}

impl BufferChain {
    pub fn new() -> Self {
        BufferChain::default()
    }

    /// Total number of bytes across all chunks.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Append a copy of `bytes` as a new chunk.
    pub fn append(&mut self, bytes: &[u8]) {
        self.push_chunk(Box::from(bytes));
    }

    /// Append `bytes` without copying.
    pub fn append_owned(&mut self, bytes: Vec<u8>) {
        self.push_chunk(bytes.into_boxed_slice());
    }

    pub fn append_str(&mut self, s: &str) {
        self.append(s.as_bytes());
    }

    /// Move every chunk of `other` to the end of `self`, leaving `other` empty.
    pub fn append_chain(&mut self, other: &mut BufferChain) {
        self.size += other.size;
        self.chunks.append(&mut other.chunks);
        other.size = 0;
    }

    fn push_chunk(&mut self, chunk: Box<[u8]>) {
        if chunk.is_empty() {
            return;
        }
        self.size += chunk.len();
        self.chunks.push_back(chunk);
    }

    pub fn front(&self) -> Option<&[u8]> {
        self.chunks.front().map(|c| &c[..])
    }

    pub fn back(&self) -> Option<&[u8]> {
        self.chunks.back().map(|c| &c[..])
    }

    pub fn pop_front(&mut self) -> Option<Box<[u8]>> {
        let chunk = self.chunks.pop_front()?;
        self.size -= chunk.len();
        Some(chunk)
    }

    pub fn pop_back(&mut self) -> Option<Box<[u8]>> {
        let chunk = self.chunks.pop_back()?;
        self.size -= chunk.len();
        Some(chunk)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> {
        self.chunks.iter().map(|c| &c[..])
    }

    /// Concatenate all chunks into one contiguous buffer of `len()` bytes.
    pub fn flatten_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Concatenate into a `String`.
    ///
    /// Content with an embedded NUL byte or invalid UTF-8 is rejected, never
    /// truncated. Use `flatten_bytes` for binary content.
    pub fn flatten_string(&self) -> Result<String, FlattenError> {
        let bytes = self.flatten_bytes();
        if let Some(offset) = memchr(0, &bytes) {
            return Err(FlattenError::EmbeddedNul { offset });
        }
        String::from_utf8(bytes).map_err(|e| FlattenError::InvalidUtf8 {
            offset: e.utf8_error().valid_up_to(),
        })
    }

    /// Write every chunk, in order, to `out`.
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<usize> {
        for chunk in &self.chunks {
            out.write_all(chunk)?;
        }
        out.flush()?;
        Ok(self.size)
    }
}

impl From<&str> for BufferChain {
    fn from(s: &str) -> Self {
        let mut chain = BufferChain::new();
        chain.append_str(s);
        chain
    }
}

impl Extend<Vec<u8>> for BufferChain {
    fn extend<I: IntoIterator<Item = Vec<u8>>>(&mut self, iter: I) {
        for bytes in iter {
            self.append_owned(bytes);
        }
    }
}
