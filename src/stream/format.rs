//! FBOM wire format constants.

/// Magic bytes at the start of an FBOM stream.
pub const FBOM_MAGIC: &[u8; 4] = b"FBOM";

/// Size of the stream header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Offset of the version in the header.
pub const VERSION_OFFSET: usize = 4;

/// Payload form: raw byte payload.
pub const PAYLOAD_BYTES: u8 = 0x00;

/// Payload form: a nested object encoding.
pub const PAYLOAD_OBJECT: u8 = 0x01;

/// Payload form: an element-typed array of values.
pub const PAYLOAD_ARRAY: u8 = 0x02;

/// Current FBOM format version.
pub const CURRENT_VERSION: u16 = 1;

/// Block tag: an object library follows.
pub const TAG_LIBRARY: u8 = 0x4C;

/// Block tag: end of stream.
pub const TAG_END: u8 = 0x00;

/// Object marker: a fully-encoded object follows.
pub const OBJ_INLINE: u8 = 0x01;

/// Object marker: a back-reference index into the static-data table follows.
pub const OBJ_BACKREF: u8 = 0x02;

/// Library location flag: objects stored in this stream.
pub const LIB_LOCATION_INLINE: u8 = 0x00;

/// Library location flag: objects stored in a sibling file.
pub const LIB_LOCATION_EXTERNAL: u8 = 0x01;

/// Data payload flag: bytes are archive-compressed.
pub const PAYLOAD_FLAG_COMPRESSED: u8 = 1 << 0;

/// Default payload size above which the writer compresses, in bytes.
pub const DEFAULT_COMPRESSION_THRESHOLD: u64 = 512;

/// Check that a library location flag is one of the known values.
#[inline]
pub const fn is_valid_location(flag: u8) -> bool {
    matches!(flag, LIB_LOCATION_INLINE | LIB_LOCATION_EXTERNAL)
}

/// Check that an object marker is one of the known values.
#[inline]
pub const fn is_valid_object_marker(marker: u8) -> bool {
    matches!(marker, OBJ_INLINE | OBJ_BACKREF)
}
