//! FbomReader - parses FBOM streams and rebuilds native instances.
//!
//! A reader session runs in passes: validate the header, parse library
//! blocks into [`FbomObject`] trees (resolving static-data back-references
//! by emission index), lazily load externally-paged libraries through the
//! UUID-keyed cache, then deserialize bottom-up so parent marshals find
//! their children already built.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::{
    decompress, FbomArray, FbomData, FbomObject, FbomObjectLibrary, FbomType, FbomValue,
    LibraryLocation, DATA_FLAG_COMPRESSED,
};
use crate::marshal::{DeserializeContext, MarshalRegistry};
use crate::stream::format::{
    is_valid_location, is_valid_object_marker, CURRENT_VERSION, FBOM_MAGIC, HEADER_SIZE,
    LIB_LOCATION_INLINE, OBJ_BACKREF, PAYLOAD_ARRAY, PAYLOAD_BYTES, PAYLOAD_FLAG_COMPRESSED,
    PAYLOAD_OBJECT, TAG_END, TAG_LIBRARY,
};
use crate::stream::ByteReader;
use crate::util::{Error, Result};

/// Reader configuration, JSON round-trippable.
///
/// The external-data cache is session state and stays out of the JSON
/// surface.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FbomReaderConfig {
    /// Skip-and-log objects and libraries that fail to load instead of
    /// aborting the session.
    pub continue_on_external_load_error: bool,
    /// Directory against which external library file names resolve.
    pub base_path: PathBuf,
    /// Parsed external libraries keyed by UUID; one disk read per UUID per
    /// session.
    #[serde(skip)]
    pub external_data_cache: HashMap<Uuid, Arc<Vec<FbomObject>>>,
}

/// Provider of external library file contents. Injectable for tests.
pub trait ExternalSource: Send + Sync {
    fn load(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Default filesystem-backed source.
pub struct FsExternalSource;

impl ExternalSource for FsExternalSource {
    fn load(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })
    }
}

/// Result of one load session.
#[derive(Debug)]
pub struct FbomLoadResult {
    libraries: Vec<FbomObjectLibrary>,
    skipped: usize,
}

impl FbomLoadResult {
    #[inline]
    pub fn libraries(&self) -> &[FbomObjectLibrary] {
        &self.libraries
    }

    /// Look up a library by UUID.
    pub fn library(&self, uuid: Uuid) -> Option<&FbomObjectLibrary> {
        self.libraries.iter().find(|l| l.uuid() == uuid)
    }

    /// All root objects across libraries, in stream order.
    pub fn roots(&self) -> impl Iterator<Item = &FbomObject> {
        self.libraries.iter().flat_map(|l| l.objects().iter())
    }

    /// First root whose deserialized native instance is a `T`.
    pub fn first_deserialized<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.roots().find_map(|o| o.deserialized::<T>())
    }

    /// Number of objects and libraries skipped under the error-tolerant
    /// policy.
    #[inline]
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// FBOM stream reader session.
///
/// Not safe for concurrent use; run independent sessions on independent
/// threads instead.
pub struct FbomReader {
    registry: Arc<MarshalRegistry>,
    config: FbomReaderConfig,
    source: Arc<dyn ExternalSource>,
    loading: HashSet<Uuid>,
}

impl FbomReader {
    pub fn new(registry: Arc<MarshalRegistry>) -> Self {
        Self::with_config(registry, FbomReaderConfig::default())
    }

    pub fn with_config(registry: Arc<MarshalRegistry>, config: FbomReaderConfig) -> Self {
        Self {
            registry,
            config,
            source: Arc::new(FsExternalSource),
            loading: HashSet::new(),
        }
    }

    /// Replace the external file source (tests use a counting stub).
    pub fn with_external_source(mut self, source: Arc<dyn ExternalSource>) -> Self {
        self.source = source;
        self
    }

    #[inline]
    pub fn config(&self) -> &FbomReaderConfig {
        &self.config
    }

    /// Load a stream from an in-memory buffer.
    pub fn load_bytes(&mut self, bytes: Vec<u8>) -> Result<FbomLoadResult> {
        let mut reader = ByteReader::from_bytes(bytes);
        let base = self.config.base_path.clone();
        self.load_reader(&mut reader, base)
    }

    /// Load a stream from a file (memory-mapped). When the configured
    /// `base_path` is empty, external references resolve against the
    /// stream's own directory.
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<FbomLoadResult> {
        let path = path.as_ref();
        let mut reader = ByteReader::open(path)?;
        let base = if self.config.base_path.as_os_str().is_empty() {
            path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf()
        } else {
            self.config.base_path.clone()
        };
        self.load_reader(&mut reader, base)
    }

    fn load_reader(
        &mut self,
        reader: &mut ByteReader,
        base: PathBuf,
    ) -> Result<FbomLoadResult> {
        let raw = parse_stream(reader)?;
        let mut skipped = 0usize;

        // resolve external references before the deserialize pass
        let mut libraries = Vec::with_capacity(raw.len());
        for library in raw {
            match library {
                RawLibrary::Inline(lib) => libraries.push(lib),
                RawLibrary::External { uuid, file_name } => {
                    match self.resolve_external(uuid, &file_name, &base) {
                        Ok(objects) => {
                            let mut lib =
                                FbomObjectLibrary::with_uuid(uuid, LibraryLocation::External);
                            lib.objects_mut().extend(objects.iter().cloned());
                            libraries.push(lib);
                        }
                        Err(e) if self.config.continue_on_external_load_error => {
                            warn!(%uuid, error = %e, "skipping external library");
                            skipped += 1;
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        // deserialize bottom-up so parents can fetch built children
        let mut ctx = DeserializeContext::new(&self.registry);
        for library in &mut libraries {
            for object in library.objects_mut() {
                deserialize_tree(
                    &self.registry,
                    &mut ctx,
                    object,
                    self.config.continue_on_external_load_error,
                    &mut skipped,
                )?;
            }
        }

        Ok(FbomLoadResult { libraries, skipped })
    }

    fn resolve_external(
        &mut self,
        uuid: Uuid,
        file_name: &str,
        base: &Path,
    ) -> Result<Arc<Vec<FbomObject>>> {
        if let Some(cached) = self.config.external_data_cache.get(&uuid) {
            debug!(%uuid, "external library cache hit");
            return Ok(Arc::clone(cached));
        }
        if !self.loading.insert(uuid) {
            return Err(Error::ExternalLoad {
                uuid,
                reason: "cyclic external library reference".to_string(),
            });
        }
        let result = self.load_external_file(uuid, file_name, base);
        self.loading.remove(&uuid);

        let objects = result?;
        self.config
            .external_data_cache
            .insert(uuid, Arc::clone(&objects));
        Ok(objects)
    }

    fn load_external_file(
        &mut self,
        uuid: Uuid,
        file_name: &str,
        base: &Path,
    ) -> Result<Arc<Vec<FbomObject>>> {
        let path = base.join(file_name);
        let bytes = self.source.load(&path).map_err(|e| Error::ExternalLoad {
            uuid,
            reason: e.to_string(),
        })?;

        let mut reader = ByteReader::from_bytes(bytes);
        let raw = parse_stream(&mut reader).map_err(|e| Error::ExternalLoad {
            uuid,
            reason: e.to_string(),
        })?;

        let mut objects = Vec::new();
        for library in raw {
            match library {
                RawLibrary::Inline(lib) => {
                    let mut lib = lib;
                    objects.append(lib.objects_mut());
                }
                RawLibrary::External {
                    uuid: nested,
                    file_name,
                } => {
                    let nested_objects = self.resolve_external(nested, &file_name, base)?;
                    objects.extend(nested_objects.iter().cloned());
                }
            }
        }
        Ok(Arc::new(objects))
    }
}

fn deserialize_tree(
    registry: &MarshalRegistry,
    ctx: &mut DeserializeContext<'_>,
    object: &mut FbomObject,
    continue_on_error: bool,
    skipped: &mut usize,
) -> Result<()> {
    for child in object.children_mut() {
        deserialize_tree(registry, ctx, child, continue_on_error, skipped)?;
    }
    match registry.resolve(object.object_type()) {
        Ok(marshal) => match marshal.deserialize(ctx, object) {
            Ok(handle) => object.set_deserialized(handle),
            Err(e) if continue_on_error => {
                warn!(ty = %object.object_type(), error = %e, "skipping object");
                *skipped += 1;
            }
            Err(e) => return Err(e),
        },
        Err(Error::UnknownObjectType(name)) if continue_on_error => {
            warn!(%name, "skipping object with unknown type");
            *skipped += 1;
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

enum RawLibrary {
    Inline(FbomObjectLibrary),
    External { uuid: Uuid, file_name: String },
}

fn parse_stream(reader: &mut ByteReader) -> Result<Vec<RawLibrary>> {
    let magic = reader.read_bytes(FBOM_MAGIC.len())?;
    if magic != FBOM_MAGIC {
        return Err(Error::InvalidMagic);
    }
    let version = reader.read_u16()?;
    if version == 0 || version > CURRENT_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }
    // reserved header tail
    reader.read_bytes(HEADER_SIZE - FBOM_MAGIC.len() - 2)?;

    let mut session = ParseSession::default();
    let mut libraries = Vec::new();
    loop {
        let tag = reader.read_u8()?;
        match tag {
            TAG_END => break,
            TAG_LIBRARY => libraries.push(parse_library(reader, &mut session)?),
            other => {
                return Err(Error::invalid(format!(
                    "unknown block tag 0x{other:02X} at position {}",
                    reader.pos() - 1
                )))
            }
        }
    }
    Ok(libraries)
}

fn parse_library(reader: &mut ByteReader, session: &mut ParseSession) -> Result<RawLibrary> {
    let mut uuid_bytes = [0u8; 16];
    reader.read_into(&mut uuid_bytes)?;
    let uuid = Uuid::from_bytes(uuid_bytes);

    let location = reader.read_u8()?;
    if !is_valid_location(location) {
        return Err(Error::invalid(format!(
            "unknown library location flag 0x{location:02X}"
        )));
    }
    if location == LIB_LOCATION_INLINE {
        let count = reader.read_u32()? as usize;
        let mut library = FbomObjectLibrary::with_uuid(uuid, LibraryLocation::Inline);
        for _ in 0..count {
            library.push(session.parse_object(reader)?);
        }
        Ok(RawLibrary::Inline(library))
    } else {
        let file_name = reader.read_string()?;
        Ok(RawLibrary::External { uuid, file_name })
    }
}

/// Per-stream parse state: the emission-ordered object table that
/// back-references index into. Slots are reserved pre-order to mirror the
/// writer's index assignment exactly.
#[derive(Default)]
struct ParseSession {
    table: Vec<Option<FbomObject>>,
}

impl ParseSession {
    fn parse_object(&mut self, reader: &mut ByteReader) -> Result<FbomObject> {
        let marker = reader.read_u8()?;
        if !is_valid_object_marker(marker) {
            return Err(Error::invalid(format!(
                "unknown object marker 0x{marker:02X}"
            )));
        }
        if marker == OBJ_BACKREF {
            let index = reader.read_u32()? as usize;
            return match self.table.get(index) {
                Some(Some(object)) => Ok(object.clone()),
                _ => Err(Error::invalid(format!(
                    "back-reference to un-emitted object index {index}"
                ))),
            };
        }

        let index = self.table.len();
        self.table.push(None);

        let ty = parse_type(reader)?;
        let flags = reader.read_u8()?;
        let mut object = FbomObject::new(ty);
        object.set_flags(flags);

        let num_properties = reader.read_u32()?;
        for _ in 0..num_properties {
            let name = reader.read_string()?;
            let data = self.parse_data(reader)?;
            object.set_property(name, data);
        }

        let num_children = reader.read_u32()?;
        for _ in 0..num_children {
            let child = self.parse_object(reader)?;
            object.add_child(child);
        }

        self.table[index] = Some(object.clone());
        Ok(object)
    }

    fn parse_data(&mut self, reader: &mut ByteReader) -> Result<FbomData> {
        let ty = parse_type(reader)?;
        let form = reader.read_u8()?;
        match form {
            PAYLOAD_BYTES => {
                let flags = reader.read_u8()?;
                let len = reader.read_u64()? as usize;
                let bytes = reader.read_bytes(len)?;
                if !ty.is_valid() {
                    return Ok(FbomData::unset());
                }
                let (bytes, data_flags) = if flags & PAYLOAD_FLAG_COMPRESSED != 0 {
                    (decompress(&bytes)?, DATA_FLAG_COMPRESSED)
                } else {
                    (bytes, 0)
                };
                Ok(FbomData::from_parts(
                    ty,
                    FbomValue::Bytes(Arc::new(bytes)),
                    data_flags,
                ))
            }
            PAYLOAD_OBJECT => {
                let object = self.parse_object(reader)?;
                Ok(FbomData::from_object(object))
            }
            PAYLOAD_ARRAY => {
                let element = parse_type(reader)?;
                let count = reader.read_u32()? as usize;
                let mut array = FbomArray::new(element);
                for _ in 0..count {
                    array.push(self.parse_data(reader)?)?;
                }
                Ok(FbomData::from_array(array))
            }
            other => Err(Error::invalid(format!(
                "unknown payload form 0x{other:02X}"
            ))),
        }
    }
}

fn parse_type(reader: &mut ByteReader) -> Result<FbomType> {
    use crate::core::FbomKind;

    let code = reader.read_u8()?;
    let kind = FbomKind::from_u8(code);
    if kind == FbomKind::Unset && code != 0 {
        return Err(Error::invalid(format!("unknown type kind code {code}")));
    }
    let flags = reader.read_u8()?;
    let size = reader.read_u64()?;
    let name = reader.read_string()?;

    let extends = if reader.read_u8()? != 0 {
        Some(Box::new(parse_type(reader)?))
    } else {
        None
    };
    let element = if reader.read_u8()? != 0 {
        Some(Box::new(parse_type(reader)?))
    } else {
        None
    };

    Ok(FbomType {
        kind,
        name,
        size,
        flags,
        extends,
        element,
    })
}
