//! # FBOM
//!
//! Binary object-model serialization: typed object trees with static-data
//! deduplication, UUID-addressed object libraries (inline or paged to
//! external files), payload compression, and a marshal registry that maps
//! wire object types to native Rust types.
//!
//! ## Modules
//!
//! - [`util`] - Errors and POD scalar support
//! - [`core`] - Object model (FbomType, FbomData, FbomObject, FbomArray),
//!   content digests, compression
//! - [`stream`] - Low-level little-endian byte I/O and wire constants
//! - [`marshal`] - Marshal traits, registry, class-description marshaling
//! - [`writer`] - FbomWriter session
//! - [`reader`] - FbomReader session
//!
//! ## Example
//!
//! ```ignore
//! use fbom::prelude::*;
//!
//! let registry = Arc::new(MarshalRegistry::new());
//! registry.register_class(scene_description())?;
//!
//! let mut writer = FbomWriter::new(Arc::clone(&registry));
//! writer.append(&scene)?;
//! writer.write_to_path("scene.fbom")?;
//!
//! let mut reader = FbomReader::new(registry);
//! let result = reader.load_path("scene.fbom")?;
//! let scene: Arc<Scene> = result.first_deserialized().unwrap();
//! ```

pub mod core;
pub mod marshal;
pub mod reader;
pub mod stream;
pub mod util;
pub mod writer;

// Re-export commonly used types
pub use util::{Error, FbomPod, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        FbomArray, FbomData, FbomKind, FbomObject, FbomObjectLibrary, FbomType, LibraryLocation,
    };
    pub use crate::marshal::{
        ClassDescription, DeserializeContext, Marshal, MarshalRegistry, SerializeContext,
        TypedMarshal,
    };
    pub use crate::reader::{FbomLoadResult, FbomReader, FbomReaderConfig};
    pub use crate::util::{Error, FbomPod, Result};
    pub use crate::writer::{FbomWriter, FbomWriterConfig};
}
