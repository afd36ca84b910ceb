//! ByteReader - bounds-checked sequential binary input.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;

use crate::util::{Error, Result};

#[derive(Debug)]
enum Source {
    Memory(Arc<Vec<u8>>),
    Mmap(Mmap),
}

impl Source {
    fn as_slice(&self) -> &[u8] {
        match self {
            Self::Memory(v) => v,
            Self::Mmap(m) => m,
        }
    }
}

/// Sequential binary input with position tracking over an in-memory buffer
/// or a memory-mapped file.
#[derive(Debug)]
pub struct ByteReader {
    source: Source,
    pos: usize,
}

impl ByteReader {
    /// Read from an owned byte buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            source: Source::Memory(Arc::new(bytes)),
            pos: 0,
        }
    }

    /// Memory-map a file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        // Safety: file is opened read-only; concurrent truncation is the
        // caller's misuse, same as the writer side of this format.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
        Ok(Self {
            source: Source::Mmap(mmap),
            pos: 0,
        })
    }

    /// Current read position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos as u64
    }

    /// Total stream length.
    #[inline]
    pub fn len(&self) -> u64 {
        self.source.as_slice().len() as u64
    }

    /// Remaining unread bytes.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.len() - self.pos()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.source.as_slice().is_empty()
    }

    fn take(&mut self, len: usize) -> Result<&[u8]> {
        let data = self.source.as_slice();
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= data.len())
            .ok_or(Error::UnexpectedEof(self.pos as u64))?;
        let slice = &data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read exactly `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        Ok(self.take(len)?.to_vec())
    }

    /// Read exactly `buf.len()` bytes into a caller buffer.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let slice = self.take(buf.len())?;
        buf.copy_from_slice(slice);
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8(bytes)?)
    }
}
