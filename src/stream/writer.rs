//! ByteWriter - position-tracked, append-only binary output.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::util::Result;

enum Sink {
    File(BufWriter<File>),
    Memory(Vec<u8>),
}

/// Sequential binary output with position tracking.
///
/// Writes are append-only; the FBOM format never rewrites in place.
pub struct ByteWriter {
    sink: Sink,
    pos: u64,
}

impl ByteWriter {
    /// Create a writer backed by a file, truncating any existing content.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            sink: Sink::File(BufWriter::with_capacity(512 * 1024, file)),
            pos: 0,
        })
    }

    /// Create an in-memory writer.
    pub fn memory() -> Self {
        Self {
            sink: Sink::Memory(Vec::new()),
            pos: 0,
        }
    }

    /// Current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Write raw bytes and advance the position.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        match &mut self.sink {
            Sink::File(w) => w.write_all(data)?,
            Sink::Memory(v) => v.extend_from_slice(data),
        }
        self.pos += data.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        match &mut self.sink {
            Sink::File(w) => w.write_u8(value)?,
            Sink::Memory(v) => v.push(value),
        }
        self.pos += 1;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        match &mut self.sink {
            Sink::File(w) => w.write_u16::<LittleEndian>(value)?,
            Sink::Memory(v) => v.extend_from_slice(&value.to_le_bytes()),
        }
        self.pos += 2;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        match &mut self.sink {
            Sink::File(w) => w.write_u32::<LittleEndian>(value)?,
            Sink::Memory(v) => v.extend_from_slice(&value.to_le_bytes()),
        }
        self.pos += 4;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        match &mut self.sink {
            Sink::File(w) => w.write_u64::<LittleEndian>(value)?,
            Sink::Memory(v) => v.extend_from_slice(&value.to_le_bytes()),
        }
        self.pos += 8;
        Ok(())
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_u32(value.len() as u32)?;
        self.write_bytes(value.as_bytes())
    }

    /// Flush buffered output.
    pub fn flush(&mut self) -> Result<()> {
        if let Sink::File(w) = &mut self.sink {
            w.flush()?;
        }
        Ok(())
    }

    /// Consume the writer, returning the bytes of an in-memory sink.
    /// File-backed writers return an empty vector after flushing.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        self.flush()?;
        match self.sink {
            Sink::Memory(v) => Ok(v),
            Sink::File(_) => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_writer_position() {
        let mut w = ByteWriter::memory();
        w.write_u8(0xAB).unwrap();
        w.write_u32(0x01020304).unwrap();
        w.write_string("ab").unwrap();
        assert_eq!(w.pos(), 1 + 4 + 4 + 2);

        let bytes = w.into_bytes().unwrap();
        assert_eq!(bytes[0], 0xAB);
        // little-endian u32
        assert_eq!(&bytes[1..5], &[0x04, 0x03, 0x02, 0x01]);
        // length-prefixed string
        assert_eq!(&bytes[5..9], &[2, 0, 0, 0]);
        assert_eq!(&bytes[9..], b"ab");
    }

    #[test]
    fn test_file_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        {
            let mut w = ByteWriter::create(&path).unwrap();
            w.write_u64(42).unwrap();
            w.flush().unwrap();
        }
        assert_eq!(std::fs::read(&path).unwrap(), 42u64.to_le_bytes());
    }
}
