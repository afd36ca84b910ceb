//! FbomObject - a named, typed node in the serialized tree.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::util::{Error, Result};

use super::data::FbomData;
use super::ty::FbomType;
use super::unique_id::{self, UniqueId};

/// Object flag: never merge this object with a structurally-identical one
/// during static-data deduplication.
pub const OBJECT_FLAG_KEEP_UNIQUE: u8 = 1 << 0;

/// Shared handle to a deserialized native instance.
pub type AnyHandle = Arc<dyn Any + Send + Sync>;

/// One serialized instance: an object type, an insertion-ordered property
/// table and an ordered list of owned child objects.
///
/// The `deserialized` handle is a back-reference set during a reader's
/// second pass so parent marshals can retrieve already-built children. It is
/// never serialized and is excluded from equality.
#[derive(Clone, Default)]
pub struct FbomObject {
    object_type: FbomType,
    flags: u8,
    properties: Vec<(String, FbomData)>,
    children: Vec<FbomObject>,
    deserialized: Option<AnyHandle>,
}

impl FbomObject {
    /// Create an object of the given wire type.
    pub fn new(object_type: FbomType) -> Self {
        Self {
            object_type,
            flags: 0,
            properties: Vec::new(),
            children: Vec::new(),
            deserialized: None,
        }
    }

    #[inline]
    pub fn object_type(&self) -> &FbomType {
        &self.object_type
    }

    #[inline]
    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub(crate) fn set_flags(&mut self, flags: u8) {
        self.flags = flags;
    }

    /// Returns true if this object must keep its independent identity
    /// (excluded from deduplication).
    #[inline]
    pub fn is_keep_unique(&self) -> bool {
        self.flags & OBJECT_FLAG_KEEP_UNIQUE != 0
    }

    /// Mark this object as excluded from deduplication.
    pub fn keep_unique(mut self) -> Self {
        self.flags |= OBJECT_FLAG_KEEP_UNIQUE;
        self
    }

    /// Insert or overwrite a property, preserving first-insertion order.
    pub fn set_property(&mut self, name: impl Into<String>, data: FbomData) {
        let name = name.into();
        if let Some(slot) = self.properties.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = data;
        } else {
            self.properties.push((name, data));
        }
    }

    /// Look up a property by name. Absence is not an error.
    pub fn property(&self, name: &str) -> Option<&FbomData> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d)
    }

    /// Look up a property that must be present.
    pub fn expect_property(&self, name: &str) -> Result<&FbomData> {
        self.property(name)
            .ok_or_else(|| Error::PropertyNotFound(name.to_string()))
    }

    /// Insertion-ordered view of the property table.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &FbomData)> {
        self.properties.iter().map(|(n, d)| (n.as_str(), d))
    }

    #[inline]
    pub fn num_properties(&self) -> usize {
        self.properties.len()
    }

    /// Append a child object.
    pub fn add_child(&mut self, child: FbomObject) {
        self.children.push(child);
    }

    /// Append a child object excluded from deduplication.
    pub fn add_child_unique(&mut self, child: FbomObject) {
        self.children.push(child.keep_unique());
    }

    #[inline]
    pub fn children(&self) -> &[FbomObject] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [FbomObject] {
        &mut self.children
    }

    #[inline]
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Find the first child whose declared type is or extends the named
    /// type. Children arrive in arbitrary declaration order, so lookups go
    /// by type, never by position.
    pub fn child_of_type(&self, type_name: &str) -> Option<&FbomObject> {
        self.children
            .iter()
            .find(|c| c.object_type.is_or_extends(type_name))
    }

    /// All children whose declared type is or extends the named type.
    pub fn children_of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = &'a FbomObject> {
        self.children
            .iter()
            .filter(move |c| c.object_type.is_or_extends(type_name))
    }

    /// Content-derived unique ID over type, properties and children.
    ///
    /// Two structurally identical subtrees produce the same ID, which is
    /// what lets the writer collapse them into one static-data slot.
    pub fn unique_id(&self) -> UniqueId {
        unique_id::object_digest(self)
    }

    /// The native instance rebuilt from this object, if a reader's
    /// deserialize pass has run.
    pub fn deserialized_handle(&self) -> Option<&AnyHandle> {
        self.deserialized.as_ref()
    }

    /// Typed access to the deserialized native instance.
    pub fn deserialized<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.deserialized
            .as_ref()
            .and_then(|h| Arc::clone(h).downcast::<T>().ok())
    }

    pub(crate) fn set_deserialized(&mut self, handle: AnyHandle) {
        self.deserialized = Some(handle);
    }
}

impl PartialEq for FbomObject {
    fn eq(&self, other: &Self) -> bool {
        // deserialized handle is session state, not content
        self.object_type == other.object_type
            && self.flags == other.flags
            && self.properties == other.properties
            && self.children == other.children
    }
}

impl fmt::Debug for FbomObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FbomObject")
            .field("type", &self.object_type)
            .field("properties", &self.properties.len())
            .field("children", &self.children.len())
            .finish()
    }
}
