//! Archive collaborator: compression of byte payloads.
//!
//! Compressed payloads are framed as `[uncompressed_size: u64 LE][zlib]` so
//! the reader can size its output buffer up front.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::util::{Error, Result};

/// Largest uncompressed size a frame may declare (1 GiB). The length field
/// arrives from untrusted input and is checked before any allocation.
const MAX_UNCOMPRESSED_SIZE: u64 = 1 << 30;

/// A compressed payload plus its original size.
pub struct Archive {
    compressed: Vec<u8>,
    uncompressed_size: u64,
}

impl Archive {
    /// Framed bytes as stored on the wire.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.compressed.len());
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&self.compressed);
        out
    }

    #[inline]
    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }

    #[inline]
    pub fn compressed_size(&self) -> usize {
        self.compressed.len()
    }
}

/// Accumulates bytes and compresses them into an [`Archive`].
#[derive(Default)]
pub struct ArchiveBuilder {
    buffer: Vec<u8>,
    level: u32,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            level: 6,
        }
    }

    /// Compression level 0-9.
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.min(9);
        self
    }

    /// Append bytes to the pending payload.
    pub fn append(&mut self, data: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(data);
        self
    }

    /// Compress the accumulated payload.
    pub fn build(self) -> Result<Archive> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(&self.buffer)
            .map_err(|e| Error::Compression(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| Error::Compression(e.to_string()))?;
        Ok(Archive {
            compressed,
            uncompressed_size: self.buffer.len() as u64,
        })
    }
}

/// Decompress a framed payload produced by [`ArchiveBuilder::build`].
///
/// Payloads declare compression explicitly on the wire, so a malformed frame
/// here is corruption and reported as such, never passed through.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 8 {
        return Err(Error::Compression(format!(
            "compressed frame too short: {} bytes",
            data.len()
        )));
    }

    let declared = u64::from_le_bytes([
        data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
    ]);
    if declared > MAX_UNCOMPRESSED_SIZE {
        return Err(Error::Compression(format!(
            "frame declares {declared} uncompressed bytes, limit is {MAX_UNCOMPRESSED_SIZE}"
        )));
    }
    let uncompressed_size = declared as usize;

    // cap the decoder at declared + 1 so an over-long stream is caught by
    // the length check below instead of ballooning memory
    let mut decoder = ZlibDecoder::new(&data[8..]).take(declared + 1);
    let mut out = Vec::with_capacity(uncompressed_size);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Compression(e.to_string()))?;

    if out.len() != uncompressed_size {
        return Err(Error::Compression(format!(
            "decompressed {} bytes, frame declared {}",
            out.len(),
            uncompressed_size
        )));
    }
    Ok(out)
}
