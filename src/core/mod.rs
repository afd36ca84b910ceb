//! Core object model: types, values, objects, arrays, digests, compression.
//!
//! This module provides:
//! - [`FbomType`] / [`FbomKind`] - on-disk type descriptions
//! - [`FbomData`] - the atomic unit of serialized state
//! - [`FbomObject`] - a typed node with properties and children
//! - [`FbomArray`] - homogeneous value sequence
//! - [`UniqueId`] - content digests for static-data deduplication
//! - [`Archive`] / [`ArchiveBuilder`] - payload compression

mod archive;
mod array;
mod data;
mod library;
mod object;
mod ty;
mod unique_id;

pub use archive::{decompress, Archive, ArchiveBuilder};
pub use array::FbomArray;
pub use data::{FbomData, DATA_FLAG_COMPRESSED};
pub use library::{FbomObjectLibrary, LibraryLocation};
pub use object::{AnyHandle, FbomObject, OBJECT_FLAG_KEEP_UNIQUE};
pub use ty::{FbomKind, FbomType, TYPE_FLAG_STATIC_DATA};
pub use unique_id::{compute_digest, object_digest, UniqueId};

pub(crate) use data::FbomValue;
