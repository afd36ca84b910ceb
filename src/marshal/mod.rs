//! Marshal contracts: converting between native instances and FBOM objects.
//!
//! A marshal binds one native Rust type to one wire type name. Marshals are
//! held in a [`MarshalRegistry`] populated by explicit registration calls;
//! there is no static-initialization magic, the host decides what is
//! registered and when.

mod class;
mod registry;

use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::sync::Arc;

use crate::core::{AnyHandle, FbomObject, FbomType};
use crate::util::{Error, Result};

pub use class::{ClassDescription, ClassDescriptionBuilder, ClassInstanceMarshal};
pub use registry::MarshalRegistry;

/// Object-safe marshal contract used by the writer and reader.
///
/// Most implementations go through [`TypedMarshal`], which handles the
/// `Any` downcasts.
pub trait Marshal: Send + Sync {
    /// The wire type this marshal produces and consumes.
    fn object_type(&self) -> FbomType;

    /// The native runtime type this marshal binds to.
    fn native_type_id(&self) -> TypeId;

    /// Name of the native type, for diagnostics.
    fn native_type_name(&self) -> &'static str;

    /// Flatten a native instance into properties and children of `out`.
    ///
    /// No partial application: on error the output object is discarded by
    /// the caller, never half-populated into the stream.
    fn serialize(
        &self,
        native: &dyn Any,
        ctx: &mut SerializeContext<'_>,
        out: &mut FbomObject,
    ) -> Result<()>;

    /// Rebuild a native instance from a parsed object.
    ///
    /// Children have already been deserialized bottom-up; retrieve them with
    /// [`FbomObject::child_of_type`] and [`FbomObject::deserialized`], never
    /// by positional index.
    fn deserialize(
        &self,
        ctx: &mut DeserializeContext<'_>,
        object: &FbomObject,
    ) -> Result<AnyHandle>;
}

/// Typed marshal contract. Implement this; the registry wraps it into the
/// object-safe [`Marshal`] form.
pub trait TypedMarshal: Send + Sync + 'static {
    type Native: Send + Sync + 'static;

    /// The wire type this marshal produces and consumes.
    fn object_type(&self) -> FbomType;

    fn serialize(
        &self,
        native: &Self::Native,
        ctx: &mut SerializeContext<'_>,
        out: &mut FbomObject,
    ) -> Result<()>;

    fn deserialize(
        &self,
        ctx: &mut DeserializeContext<'_>,
        object: &FbomObject,
    ) -> Result<Self::Native>;
}

pub(crate) struct TypedAdapter<M>(pub(crate) M);

impl<M: TypedMarshal> Marshal for TypedAdapter<M> {
    fn object_type(&self) -> FbomType {
        self.0.object_type()
    }

    fn native_type_id(&self) -> TypeId {
        TypeId::of::<M::Native>()
    }

    fn native_type_name(&self) -> &'static str {
        std::any::type_name::<M::Native>()
    }

    fn serialize(
        &self,
        native: &dyn Any,
        ctx: &mut SerializeContext<'_>,
        out: &mut FbomObject,
    ) -> Result<()> {
        let native = native
            .downcast_ref::<M::Native>()
            .ok_or_else(|| Error::mismatch(std::any::type_name::<M::Native>(), "other native type"))?;
        self.0.serialize(native, ctx, out)
    }

    fn deserialize(
        &self,
        ctx: &mut DeserializeContext<'_>,
        object: &FbomObject,
    ) -> Result<AnyHandle> {
        let native = self.0.deserialize(ctx, object)?;
        Ok(Arc::new(native))
    }
}

/// Per-session serialization state handed to marshals.
///
/// Tracks instances currently being flattened so a cyclic native graph is
/// reported as [`Error::CircularReference`] instead of recursing forever.
/// Shared acyclic substructure is serialized by value and collapsed on disk
/// by the writer's static-data table.
pub struct SerializeContext<'a> {
    registry: &'a MarshalRegistry,
    in_flight: HashSet<(TypeId, usize)>,
}

impl<'a> SerializeContext<'a> {
    pub fn new(registry: &'a MarshalRegistry) -> Self {
        Self {
            registry,
            in_flight: HashSet::new(),
        }
    }

    #[inline]
    pub fn registry(&self) -> &MarshalRegistry {
        self.registry
    }

    /// Serialize a native instance into a standalone object, resolving its
    /// marshal by native type.
    pub fn serialize_instance<T: Send + Sync + 'static>(
        &mut self,
        native: &T,
    ) -> Result<FbomObject> {
        let marshal = self
            .registry
            .by_native_type(TypeId::of::<T>())
            .ok_or(Error::NoMarshalForNativeType(std::any::type_name::<T>()))?;

        let key = (TypeId::of::<T>(), native as *const T as usize);
        if !self.in_flight.insert(key) {
            return Err(Error::CircularReference(
                marshal.object_type().name.clone(),
            ));
        }

        let mut object = FbomObject::new(marshal.object_type());
        let result = marshal.serialize(native as &dyn Any, self, &mut object);
        self.in_flight.remove(&key);
        result?;
        Ok(object)
    }

    /// Serialize a native instance and append it as a child of `parent`.
    pub fn serialize_child<T: Send + Sync + 'static>(
        &mut self,
        parent: &mut FbomObject,
        native: &T,
    ) -> Result<()> {
        let child = self.serialize_instance(native)?;
        parent.add_child(child);
        Ok(())
    }

    /// Like [`serialize_child`](Self::serialize_child), with the child
    /// excluded from static-data deduplication.
    pub fn serialize_child_unique<T: Send + Sync + 'static>(
        &mut self,
        parent: &mut FbomObject,
        native: &T,
    ) -> Result<()> {
        let child = self.serialize_instance(native)?;
        parent.add_child_unique(child);
        Ok(())
    }
}

/// Per-session deserialization state handed to marshals.
pub struct DeserializeContext<'a> {
    registry: &'a MarshalRegistry,
}

impl<'a> DeserializeContext<'a> {
    pub fn new(registry: &'a MarshalRegistry) -> Self {
        Self { registry }
    }

    #[inline]
    pub fn registry(&self) -> &MarshalRegistry {
        self.registry
    }

    /// Deserialize an object embedded in a property value (as opposed to a
    /// child, which the reader has already processed bottom-up).
    pub fn deserialize_instance(&mut self, object: &FbomObject) -> Result<AnyHandle> {
        let marshal = self.registry.resolve(object.object_type())?;
        marshal.deserialize(self, object)
    }

    /// Typed convenience over [`deserialize_instance`](Self::deserialize_instance).
    pub fn deserialize_as<T: Send + Sync + 'static>(
        &mut self,
        object: &FbomObject,
    ) -> Result<Arc<T>> {
        self.deserialize_instance(object)?
            .downcast::<T>()
            .map_err(|_| Error::mismatch(std::any::type_name::<T>(), &object.object_type().name))
    }
}
