//! FbomWriter - serializes object trees into FBOM streams.
//!
//! A writer session marshals native roots into [`FbomObject`] trees grouped
//! in object libraries, then emits header, library blocks and an end marker
//! through an append-only [`ByteWriter`]. Structurally identical subtrees
//! collapse into one emitted copy plus back-references via the per-stream
//! static-data table.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::core::{
    ArchiveBuilder, FbomData, FbomObject, FbomObjectLibrary, FbomType, FbomValue,
    LibraryLocation, UniqueId,
};
use crate::marshal::{MarshalRegistry, SerializeContext};
use crate::stream::format::{
    CURRENT_VERSION, DEFAULT_COMPRESSION_THRESHOLD, FBOM_MAGIC, HEADER_SIZE,
    LIB_LOCATION_EXTERNAL, LIB_LOCATION_INLINE, OBJ_BACKREF, OBJ_INLINE, PAYLOAD_ARRAY,
    PAYLOAD_BYTES, PAYLOAD_FLAG_COMPRESSED, PAYLOAD_OBJECT, TAG_END, TAG_LIBRARY,
};
use crate::stream::ByteWriter;
use crate::util::{Error, Result};

fn default_compression_threshold() -> u64 {
    DEFAULT_COMPRESSION_THRESHOLD
}

/// Writer configuration, JSON round-trippable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FbomWriterConfig {
    /// Toggle the static-data deduplication pass.
    pub enable_static_data: bool,
    /// Compress payloads at or above the threshold.
    pub compress_static_data: bool,
    /// Payload size in bytes above which compression kicks in.
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: u64,
}

impl Default for FbomWriterConfig {
    fn default() -> Self {
        Self {
            enable_static_data: true,
            compress_static_data: false,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
        }
    }
}

/// FBOM stream writer session.
///
/// Not safe for concurrent use; run independent sessions on independent
/// threads instead.
pub struct FbomWriter {
    registry: Arc<MarshalRegistry>,
    config: FbomWriterConfig,
    libraries: Vec<FbomObjectLibrary>,
}

impl FbomWriter {
    /// Create a writer with default configuration and one inline library.
    pub fn new(registry: Arc<MarshalRegistry>) -> Self {
        Self::with_config(registry, FbomWriterConfig::default())
    }

    pub fn with_config(registry: Arc<MarshalRegistry>, config: FbomWriterConfig) -> Self {
        Self {
            registry,
            config,
            libraries: vec![FbomObjectLibrary::new(LibraryLocation::Inline)],
        }
    }

    #[inline]
    pub fn config(&self) -> &FbomWriterConfig {
        &self.config
    }

    /// UUID of the library currently receiving roots.
    pub fn current_library_uuid(&self) -> Uuid {
        self.current().uuid()
    }

    /// Start a new library; subsequent roots go into it. Returns its UUID.
    pub fn begin_library(&mut self, location: LibraryLocation) -> Uuid {
        let library = FbomObjectLibrary::new(location);
        let uuid = library.uuid();
        self.libraries.push(library);
        uuid
    }

    fn current(&self) -> &FbomObjectLibrary {
        self.libraries.last().expect("writer always has a library")
    }

    fn current_mut(&mut self) -> &mut FbomObjectLibrary {
        self.libraries.last_mut().expect("writer always has a library")
    }

    /// Marshal a native root into the current library.
    ///
    /// The marshal runs eagerly, so a failing root surfaces here and leaves
    /// previously appended roots untouched.
    pub fn append<T: Send + Sync + 'static>(&mut self, native: &T) -> Result<()> {
        let object = SerializeContext::new(&self.registry).serialize_instance(native)?;
        self.current_mut().push(object);
        Ok(())
    }

    /// Append a pre-built object tree to the current library.
    pub fn append_object(&mut self, object: FbomObject) {
        self.current_mut().push(object);
    }

    /// Emit the stream. Fails if any library is externally paged, since
    /// those need a base directory; use [`write_to_path`](Self::write_to_path).
    pub fn write(&mut self, out: &mut ByteWriter) -> Result<()> {
        if self
            .libraries
            .iter()
            .any(|l| l.location() == LibraryLocation::External)
        {
            return Err(Error::invalid(
                "stream contains external libraries; write_to_path is required",
            ));
        }
        self.write_stream(out, None)
    }

    /// Emit the stream to a file, flushing externally-paged libraries to
    /// sibling files next to it.
    pub fn write_to_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut out = ByteWriter::create(path)?;
        self.write_stream(&mut out, Some(base))?;
        out.flush()
    }

    fn write_stream(&self, out: &mut ByteWriter, base: Option<&Path>) -> Result<()> {
        write_header(out)?;
        let mut session = EmitSession::new(&self.config);

        for library in &self.libraries {
            match library.location() {
                LibraryLocation::Inline => {
                    session.emit_library_block(out, library)?;
                }
                LibraryLocation::External => {
                    let base = base.ok_or_else(|| {
                        Error::invalid("external library without a base directory")
                    })?;
                    let file_name = library.external_file_name();

                    out.write_u8(TAG_LIBRARY)?;
                    out.write_bytes(library.uuid().as_bytes())?;
                    out.write_u8(LIB_LOCATION_EXTERNAL)?;
                    out.write_string(&file_name)?;

                    self.write_external_file(&base.join(&file_name), library)?;
                }
            }
        }

        out.write_u8(TAG_END)
    }

    /// An external library file is a complete standalone stream with its
    /// own static-data table, so it can be loaded on its own.
    fn write_external_file(&self, path: &Path, library: &FbomObjectLibrary) -> Result<()> {
        let mut out = ByteWriter::create(path)?;
        write_header(&mut out)?;
        let mut session = EmitSession::new(&self.config);
        session.emit_library_block(&mut out, library)?;
        out.write_u8(TAG_END)?;
        out.flush()
    }

    /// Number of distinct subtrees the static-data table would hold for the
    /// pending libraries. Diagnostic only.
    pub fn num_pending_roots(&self) -> usize {
        self.libraries.iter().map(|l| l.len()).sum()
    }
}

fn write_header(out: &mut ByteWriter) -> Result<()> {
    out.write_bytes(FBOM_MAGIC)?;
    out.write_u16(CURRENT_VERSION)?;
    let reserved = [0u8; HEADER_SIZE - 6];
    out.write_bytes(&reserved)
}

/// Per-stream emit state: the static-data table and index counter.
///
/// Index assignment is pre-order at emission start, mirrored exactly by the
/// reader's parsed-object table.
pub(crate) struct EmitSession<'a> {
    config: &'a FbomWriterConfig,
    static_data: HashMap<UniqueId, u32>,
    next_index: u32,
}

impl<'a> EmitSession<'a> {
    pub(crate) fn new(config: &'a FbomWriterConfig) -> Self {
        Self {
            config,
            static_data: HashMap::new(),
            next_index: 0,
        }
    }

    fn emit_library_block(
        &mut self,
        out: &mut ByteWriter,
        library: &FbomObjectLibrary,
    ) -> Result<()> {
        out.write_u8(TAG_LIBRARY)?;
        out.write_bytes(library.uuid().as_bytes())?;
        out.write_u8(LIB_LOCATION_INLINE)?;
        out.write_u32(library.len() as u32)?;
        for object in library.objects() {
            self.emit_object(out, object)?;
        }
        Ok(())
    }

    fn emit_object(&mut self, out: &mut ByteWriter, object: &FbomObject) -> Result<()> {
        if self.config.enable_static_data && !object.is_keep_unique() {
            let id = object.unique_id();
            if let Some(&index) = self.static_data.get(&id) {
                debug!(index, ty = %object.object_type(), "static data hit");
                out.write_u8(OBJ_BACKREF)?;
                return out.write_u32(index);
            }
            self.static_data.insert(id, self.next_index);
        }
        // every inline object takes a slot so reader indices stay in lockstep
        self.next_index += 1;

        out.write_u8(OBJ_INLINE)?;
        write_type(out, object.object_type())?;
        out.write_u8(object.flags())?;

        out.write_u32(object.num_properties() as u32)?;
        for (name, data) in object.properties() {
            out.write_string(name)?;
            self.emit_data(out, data)?;
        }

        out.write_u32(object.num_children() as u32)?;
        for child in object.children() {
            self.emit_object(out, child)?;
        }
        Ok(())
    }

    fn emit_data(&mut self, out: &mut ByteWriter, data: &FbomData) -> Result<()> {
        write_type(out, data.ty())?;
        match data.value() {
            FbomValue::Unset => {
                out.write_u8(PAYLOAD_BYTES)?;
                out.write_u8(0)?;
                out.write_u64(0)
            }
            FbomValue::Bytes(bytes) => {
                out.write_u8(PAYLOAD_BYTES)?;
                let compress = data.is_compressed()
                    || (self.config.compress_static_data
                        && bytes.len() as u64 >= self.config.compression_threshold);
                if compress {
                    let mut builder = ArchiveBuilder::new();
                    builder.append(bytes);
                    let framed = builder.build()?.into_bytes();
                    out.write_u8(PAYLOAD_FLAG_COMPRESSED)?;
                    out.write_u64(framed.len() as u64)?;
                    out.write_bytes(&framed)
                } else {
                    out.write_u8(0)?;
                    out.write_u64(bytes.len() as u64)?;
                    out.write_bytes(bytes)
                }
            }
            FbomValue::Object(object) => {
                out.write_u8(PAYLOAD_OBJECT)?;
                self.emit_object(out, object)
            }
            FbomValue::Array(array) => {
                out.write_u8(PAYLOAD_ARRAY)?;
                write_type(out, array.element_type())?;
                out.write_u32(array.len() as u32)?;
                for value in array.iter() {
                    self.emit_data(out, value)?;
                }
                Ok(())
            }
        }
    }
}

pub(crate) fn write_type(out: &mut ByteWriter, ty: &FbomType) -> Result<()> {
    out.write_u8(ty.kind as u8)?;
    out.write_u8(ty.flags)?;
    out.write_u64(ty.size)?;
    out.write_string(&ty.name)?;
    match ty.extends.as_deref() {
        Some(parent) => {
            out.write_u8(1)?;
            write_type(out, parent)?;
        }
        None => out.write_u8(0)?,
    }
    match ty.element() {
        Some(element) => {
            out.write_u8(1)?;
            write_type(out, element)
        }
        None => out.write_u8(0),
    }
}
