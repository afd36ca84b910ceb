//! Process-wide marshal registry.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::FbomType;
use crate::util::{Error, Result};

use super::{ClassDescription, ClassInstanceMarshal, Marshal, TypedAdapter, TypedMarshal};

#[derive(Default)]
struct Inner {
    by_name: HashMap<String, Arc<dyn Marshal>>,
    by_native: HashMap<TypeId, Arc<dyn Marshal>>,
}

/// Registry mapping wire type names and native type IDs to marshals.
///
/// Populated by explicit `register` calls during startup; read-mostly
/// afterwards, so lookups take a read lock only. Registering two marshals
/// for the same wire name or the same native type is a configuration error
/// reported as [`Error::MarshalCollision`].
#[derive(Default)]
pub struct MarshalRegistry {
    inner: RwLock<Inner>,
}

impl MarshalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed marshal.
    pub fn register<M: TypedMarshal>(&self, marshal: M) -> Result<()> {
        self.register_dyn(Arc::new(TypedAdapter(marshal)))
    }

    /// Register a class description under a generic class-instance marshal.
    pub fn register_class<T: Default + Send + Sync + 'static>(
        &self,
        description: ClassDescription<T>,
    ) -> Result<()> {
        self.register(ClassInstanceMarshal::new(description))
    }

    /// Register an already-boxed marshal.
    pub fn register_dyn(&self, marshal: Arc<dyn Marshal>) -> Result<()> {
        let name = marshal.object_type().name;
        let native = marshal.native_type_id();

        let mut inner = self.inner.write();
        if inner.by_name.contains_key(&name) {
            return Err(Error::MarshalCollision(name));
        }
        if inner.by_native.contains_key(&native) {
            return Err(Error::MarshalCollision(
                marshal.native_type_name().to_string(),
            ));
        }
        inner.by_name.insert(name, Arc::clone(&marshal));
        inner.by_native.insert(native, marshal);
        Ok(())
    }

    /// Look up a marshal by exact wire type name.
    pub fn by_name(&self, name: &str) -> Option<Arc<dyn Marshal>> {
        self.inner.read().by_name.get(name).map(Arc::clone)
    }

    /// Look up a marshal by native type.
    pub fn by_native_type(&self, type_id: TypeId) -> Option<Arc<dyn Marshal>> {
        self.inner.read().by_native.get(&type_id).map(Arc::clone)
    }

    /// Resolve a marshal for a wire type: exact name first, then each
    /// parent along the extends chain. There is no byte-copy fallback for
    /// unregistered types; resolution fails loudly.
    pub fn resolve(&self, ty: &FbomType) -> Result<Arc<dyn Marshal>> {
        let inner = self.inner.read();
        if let Some(marshal) = inner.by_name.get(&ty.name) {
            return Ok(Arc::clone(marshal));
        }
        let mut parent = ty.extends.as_deref();
        while let Some(p) = parent {
            if let Some(marshal) = inner.by_name.get(&p.name) {
                return Ok(Arc::clone(marshal));
            }
            parent = p.extends.as_deref();
        }
        Err(Error::UnknownObjectType(ty.name.clone()))
    }

    /// Number of registered marshals.
    pub fn len(&self) -> usize {
        self.inner.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
