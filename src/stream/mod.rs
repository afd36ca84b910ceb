//! Low-level binary stream layer: wire constants and byte I/O.

pub mod format;
mod reader;
mod writer;

pub use reader::ByteReader;
pub use writer::ByteWriter;
