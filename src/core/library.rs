//! Object libraries: UUID-addressed groups of root objects.

use std::fmt;

use uuid::Uuid;

use crate::core::FbomObject;

/// Where a library's objects live relative to the main stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LibraryLocation {
    /// Objects stored inline in the enclosing stream.
    #[default]
    Inline,
    /// Objects paged out to a sibling file, referenced by UUID.
    External,
}

/// A UUID-addressed, ordered group of root-level objects stored together.
///
/// Created at writer-session start and persisted at flush; the reader
/// rebuilds one per library block it parses.
#[derive(Clone)]
pub struct FbomObjectLibrary {
    uuid: Uuid,
    location: LibraryLocation,
    objects: Vec<FbomObject>,
}

impl FbomObjectLibrary {
    /// Create an empty library with a fresh UUID.
    pub fn new(location: LibraryLocation) -> Self {
        Self::with_uuid(Uuid::new_v4(), location)
    }

    /// Create an empty library with a known UUID.
    pub fn with_uuid(uuid: Uuid, location: LibraryLocation) -> Self {
        Self {
            uuid,
            location,
            objects: Vec::new(),
        }
    }

    #[inline]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    #[inline]
    pub fn location(&self) -> LibraryLocation {
        self.location
    }

    #[inline]
    pub fn objects(&self) -> &[FbomObject] {
        &self.objects
    }

    pub(crate) fn objects_mut(&mut self) -> &mut Vec<FbomObject> {
        &mut self.objects
    }

    /// Append a root-level object.
    pub fn push(&mut self, object: FbomObject) {
        self.objects.push(object);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Conventional sibling file name for an externally-paged library.
    pub fn external_file_name(&self) -> String {
        format!("{}.fbom", self.uuid)
    }
}

impl fmt::Debug for FbomObjectLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FbomObjectLibrary")
            .field("uuid", &self.uuid)
            .field("location", &self.location)
            .field("objects", &self.objects.len())
            .finish()
    }
}
