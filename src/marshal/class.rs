//! Class descriptions: declare-once field lists for generic marshaling.
//!
//! A [`ClassDescription`] is an ordered list of (field name, getter, setter,
//! wire type) tuples built through an explicit builder. The
//! [`ClassInstanceMarshal`] wrapping it serializes declared fields
//! automatically, which is the fallback for types that do not need a
//! hand-written marshal.

use crate::core::{FbomData, FbomObject, FbomType};
use crate::util::{Error, Result};

use super::{DeserializeContext, SerializeContext, TypedMarshal};

type Getter<T> = Box<dyn Fn(&T) -> Result<FbomData> + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, &FbomData) -> Result<()> + Send + Sync>;

struct FieldDescriptor<T> {
    name: String,
    wire_type: FbomType,
    get: Getter<T>,
    set: Setter<T>,
}

/// Ordered field descriptors for one native type.
pub struct ClassDescription<T> {
    object_type: FbomType,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T> ClassDescription<T> {
    /// Start building a description for the given wire type name.
    pub fn builder(name: impl Into<String>) -> ClassDescriptionBuilder<T> {
        ClassDescriptionBuilder {
            object_type: FbomType::object(name),
            fields: Vec::new(),
        }
    }

    #[inline]
    pub fn object_type(&self) -> &FbomType {
        &self.object_type
    }

    #[inline]
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }
}

/// Builder for [`ClassDescription`].
pub struct ClassDescriptionBuilder<T> {
    object_type: FbomType,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T> ClassDescriptionBuilder<T> {
    /// Set the parent wire type for "is or extends" checks.
    pub fn extends(mut self, parent: FbomType) -> Self {
        self.object_type = self.object_type.with_extends(parent);
        self
    }

    /// Declare a field with its wire type and accessors.
    pub fn field(
        mut self,
        name: impl Into<String>,
        wire_type: FbomType,
        get: impl Fn(&T) -> Result<FbomData> + Send + Sync + 'static,
        set: impl Fn(&mut T, &FbomData) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            wire_type,
            get: Box::new(get),
            set: Box::new(set),
        });
        self
    }

    pub fn build(self) -> ClassDescription<T> {
        ClassDescription {
            object_type: self.object_type,
            fields: self.fields,
        }
    }
}

/// Generic marshal over a [`ClassDescription`].
///
/// Serialization writes every declared field in declaration order.
/// Deserialization starts from `T::default()` and applies the fields that
/// are present, propagating the first accessor error; absent fields keep
/// their defaults (optional-field semantics).
pub struct ClassInstanceMarshal<T> {
    description: ClassDescription<T>,
}

impl<T> ClassInstanceMarshal<T> {
    pub fn new(description: ClassDescription<T>) -> Self {
        Self { description }
    }
}

impl<T: Default + Send + Sync + 'static> TypedMarshal for ClassInstanceMarshal<T> {
    type Native = T;

    fn object_type(&self) -> FbomType {
        self.description.object_type.clone()
    }

    fn serialize(
        &self,
        native: &T,
        _ctx: &mut SerializeContext<'_>,
        out: &mut FbomObject,
    ) -> Result<()> {
        for field in &self.description.fields {
            let data = (field.get)(native)?;
            // a getter drifting from its declared wire type is a descriptor
            // bug, caught here rather than at read time
            let ty = data.ty();
            if !ty.matches(&field.wire_type) && !ty.is_or_extends(&field.wire_type.name) {
                return Err(Error::mismatch(&field.wire_type, ty));
            }
            out.set_property(field.name.clone(), data);
        }
        Ok(())
    }

    fn deserialize(
        &self,
        _ctx: &mut DeserializeContext<'_>,
        object: &FbomObject,
    ) -> Result<T> {
        let mut native = T::default();
        for field in &self.description.fields {
            if let Some(data) = object.property(&field.name) {
                (field.set)(&mut native, data)?;
            }
        }
        Ok(native)
    }
}
