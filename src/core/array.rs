//! FbomArray - an ordered, homogeneously-typed sequence of values.

use std::fmt;

use crate::util::{Error, Result};

use super::data::FbomData;
use super::ty::FbomType;

/// An ordered sequence of [`FbomData`] sharing one declared element type.
///
/// Every pushed element must be type-compatible with the element type;
/// pushing anything else is a `TypeMismatch`, not a silent coercion.
#[derive(Clone, PartialEq)]
pub struct FbomArray {
    element_type: FbomType,
    values: Vec<FbomData>,
}

impl FbomArray {
    /// Create an empty array of the given element type.
    pub fn new(element_type: FbomType) -> Self {
        Self {
            element_type,
            values: Vec::new(),
        }
    }

    /// Build an array from values, validating each against the element type.
    pub fn from_values(
        element_type: FbomType,
        values: impl IntoIterator<Item = FbomData>,
    ) -> Result<Self> {
        let mut array = Self::new(element_type);
        for value in values {
            array.push(value)?;
        }
        Ok(array)
    }

    #[inline]
    pub fn element_type(&self) -> &FbomType {
        &self.element_type
    }

    /// Append a value after checking element-type compatibility.
    pub fn push(&mut self, value: FbomData) -> Result<()> {
        let ty = value.ty();
        let compatible = ty.matches(&self.element_type)
            || ty.is_or_extends(&self.element_type.name);
        if !compatible {
            return Err(Error::mismatch(&self.element_type, ty));
        }
        self.values.push(value);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&FbomData> {
        self.values.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FbomData> {
        self.values.iter()
    }
}

impl fmt::Debug for FbomArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FbomArray({}[{}])", self.element_type, self.values.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FbomKind;

    #[test]
    fn test_push_compatible() {
        let mut array = FbomArray::new(FbomType::primitive(FbomKind::Int32));
        array.push(FbomData::from_i32(1)).unwrap();
        array.push(FbomData::from_i32(2)).unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array.get(1).unwrap().read_i32().unwrap(), 2);
    }

    #[test]
    fn test_push_mismatch() {
        let mut array = FbomArray::new(FbomType::primitive(FbomKind::Int32));
        let err = array.push(FbomData::from_f32(1.0)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert!(array.is_empty());
    }

    #[test]
    fn test_extends_compatible() {
        use crate::core::FbomObject;

        let light = FbomType::object("Light");
        let spot = FbomType::object("SpotLight").with_extends(light.clone());

        let mut array = FbomArray::new(light);
        array
            .push(FbomData::from_object(FbomObject::new(spot)))
            .unwrap();
        assert_eq!(array.len(), 1);
    }
}
