//! FbomData - the atomic unit of serialized state.

use std::fmt;
use std::sync::Arc;

use crate::util::{Error, FbomPod, Result};

use super::array::FbomArray;
use super::object::FbomObject;
use super::ty::{FbomKind, FbomType};

/// Data flag: payload is stored compressed on the wire.
pub const DATA_FLAG_COMPRESSED: u8 = 1 << 0;

/// Value payload of an [`FbomData`].
///
/// Primitive scalars, strings, struct blobs and POD sequences are all byte
/// payloads interpreted through the declared type; large buffers are shared
/// behind `Arc` so back-reference clones stay cheap.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum FbomValue {
    Unset,
    Bytes(Arc<Vec<u8>>),
    Object(Box<FbomObject>),
    Array(Box<FbomArray>),
}

/// A tagged value: a declared [`FbomType`] plus its payload.
///
/// Every typed accessor checks the declared type first and fails with
/// [`Error::TypeMismatch`] instead of reinterpreting bytes. Accessors never
/// partially overwrite caller buffers on failure.
#[derive(Clone, PartialEq)]
pub struct FbomData {
    ty: FbomType,
    value: FbomValue,
    flags: u8,
}

impl FbomData {
    /// An unset value. `is_valid()` returns false.
    pub fn unset() -> Self {
        Self {
            ty: FbomType::unset(),
            value: FbomValue::Unset,
            flags: 0,
        }
    }

    pub(crate) fn from_parts(ty: FbomType, value: FbomValue, flags: u8) -> Self {
        Self { ty, value, flags }
    }

    /// Build from a raw byte payload and an explicit type.
    pub fn from_bytes(ty: FbomType, bytes: Vec<u8>) -> Self {
        Self {
            ty,
            value: FbomValue::Bytes(Arc::new(bytes)),
            flags: 0,
        }
    }

    pub fn from_bool(v: bool) -> Self {
        Self::from_bytes(FbomType::primitive(FbomKind::Bool), vec![v as u8])
    }

    /// Build from any POD scalar (ints, floats).
    pub fn from_pod<T: FbomPod>(v: T) -> Self {
        Self::from_bytes(FbomType::of::<T>(), bytemuck::bytes_of(&v).to_vec())
    }

    pub fn from_i8(v: i8) -> Self {
        Self::from_pod(v)
    }

    pub fn from_i16(v: i16) -> Self {
        Self::from_pod(v)
    }

    pub fn from_i32(v: i32) -> Self {
        Self::from_pod(v)
    }

    pub fn from_i64(v: i64) -> Self {
        Self::from_pod(v)
    }

    pub fn from_u8(v: u8) -> Self {
        Self::from_pod(v)
    }

    pub fn from_u16(v: u16) -> Self {
        Self::from_pod(v)
    }

    pub fn from_u32(v: u32) -> Self {
        Self::from_pod(v)
    }

    pub fn from_u64(v: u64) -> Self {
        Self::from_pod(v)
    }

    pub fn from_f32(v: f32) -> Self {
        Self::from_pod(v)
    }

    pub fn from_f64(v: f64) -> Self {
        Self::from_pod(v)
    }

    pub fn from_string(v: impl Into<String>) -> Self {
        Self::from_bytes(FbomType::string(), v.into().into_bytes())
    }

    pub fn from_name(v: impl Into<String>) -> Self {
        Self::from_bytes(FbomType::name(), v.into().into_bytes())
    }

    pub fn from_byte_buffer(bytes: Vec<u8>) -> Self {
        Self::from_bytes(FbomType::byte_buffer(), bytes)
    }

    /// Build from a fixed-layout POD struct.
    pub fn from_struct<T: bytemuck::Pod>(name: impl Into<String>, v: &T) -> Self {
        Self::from_bytes(FbomType::struct_of::<T>(name), bytemuck::bytes_of(v).to_vec())
    }

    /// Build a homogeneous sequence from a POD slice.
    pub fn from_sequence<T: FbomPod>(values: &[T]) -> Self {
        Self::from_bytes(
            FbomType::sequence(FbomType::of::<T>()),
            bytemuck::cast_slice(values).to_vec(),
        )
    }

    pub fn from_object(object: FbomObject) -> Self {
        Self {
            ty: object.object_type().clone(),
            value: FbomValue::Object(Box::new(object)),
            flags: 0,
        }
    }

    pub fn from_array(array: FbomArray) -> Self {
        Self {
            ty: FbomType::sequence(array.element_type().clone()),
            value: FbomValue::Array(Box::new(array)),
            flags: 0,
        }
    }

    /// Mark the payload for compression on write.
    pub fn mark_compressed(mut self) -> Self {
        self.flags |= DATA_FLAG_COMPRESSED;
        self
    }

    /// Returns true if the payload is flagged for compressed storage.
    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.flags & DATA_FLAG_COMPRESSED != 0
    }

    #[inline]
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// The declared type of this value.
    #[inline]
    pub fn ty(&self) -> &FbomType {
        &self.ty
    }

    /// Returns true unless this is the unset value.
    #[inline]
    pub fn is_valid(&self) -> bool {
        !matches!(self.value, FbomValue::Unset)
    }

    pub(crate) fn value(&self) -> &FbomValue {
        &self.value
    }

    fn expect_bytes(&self, expected: &FbomType) -> Result<&[u8]> {
        if !self.ty.matches(expected) {
            return Err(Error::mismatch(expected, &self.ty));
        }
        match &self.value {
            FbomValue::Bytes(b) => Ok(b),
            _ => Err(Error::mismatch(expected, &self.ty)),
        }
    }

    fn expect_kind_bytes(&self, kind: FbomKind) -> Result<&[u8]> {
        if self.ty.kind != kind {
            return Err(Error::mismatch(kind, &self.ty));
        }
        match &self.value {
            FbomValue::Bytes(b) => Ok(b),
            _ => Err(Error::mismatch(kind, &self.ty)),
        }
    }

    pub fn read_bool(&self) -> Result<bool> {
        let bytes = self.expect_bytes(&FbomType::primitive(FbomKind::Bool))?;
        Ok(bytes.first().copied().unwrap_or(0) != 0)
    }

    /// Read any POD scalar after checking the declared type.
    pub fn read_pod<T: FbomPod>(&self) -> Result<T> {
        let expected = FbomType::of::<T>();
        let bytes = self.expect_bytes(&expected)?;
        if bytes.len() != T::SIZE {
            return Err(Error::invalid(format!(
                "{} payload has {} bytes, expected {}",
                expected,
                bytes.len(),
                T::SIZE
            )));
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn read_i8(&self) -> Result<i8> {
        self.read_pod()
    }

    pub fn read_i16(&self) -> Result<i16> {
        self.read_pod()
    }

    pub fn read_i32(&self) -> Result<i32> {
        self.read_pod()
    }

    pub fn read_i64(&self) -> Result<i64> {
        self.read_pod()
    }

    pub fn read_u8(&self) -> Result<u8> {
        self.read_pod()
    }

    pub fn read_u16(&self) -> Result<u16> {
        self.read_pod()
    }

    pub fn read_u32(&self) -> Result<u32> {
        self.read_pod()
    }

    pub fn read_u64(&self) -> Result<u64> {
        self.read_pod()
    }

    pub fn read_f32(&self) -> Result<f32> {
        self.read_pod()
    }

    pub fn read_f64(&self) -> Result<f64> {
        self.read_pod()
    }

    pub fn read_string(&self) -> Result<String> {
        let bytes = self.expect_kind_bytes(FbomKind::String)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    pub fn read_name(&self) -> Result<String> {
        let bytes = self.expect_kind_bytes(FbomKind::Name)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    pub fn read_byte_buffer(&self) -> Result<&[u8]> {
        self.expect_kind_bytes(FbomKind::ByteBuffer)
    }

    /// Copy exactly `out.len()` bytes from a byte-buffer payload.
    /// The output buffer is untouched on any failure.
    pub fn read_bytes(&self, out: &mut [u8]) -> Result<()> {
        let bytes = self.expect_kind_bytes(FbomKind::ByteBuffer)?;
        if bytes.len() < out.len() {
            return Err(Error::invalid(format!(
                "byte_buffer payload has {} bytes, caller asked for {}",
                bytes.len(),
                out.len()
            )));
        }
        out.copy_from_slice(&bytes[..out.len()]);
        Ok(())
    }

    /// Read a fixed-layout POD struct after checking name and size.
    pub fn read_struct<T: bytemuck::Pod>(&self, name: &str) -> Result<T> {
        let expected = FbomType::struct_of::<T>(name);
        if self.ty.kind != FbomKind::Struct
            || self.ty.name != expected.name
            || self.ty.size != expected.size
        {
            return Err(Error::mismatch(&expected, &self.ty));
        }
        let bytes = match &self.value {
            FbomValue::Bytes(b) => b,
            _ => return Err(Error::mismatch(&expected, &self.ty)),
        };
        if bytes.len() != std::mem::size_of::<T>() {
            return Err(Error::invalid(format!(
                "struct {} payload has {} bytes, expected {}",
                name,
                bytes.len(),
                std::mem::size_of::<T>()
            )));
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Number of homogeneous elements in a sequence payload.
    ///
    /// Used by callers to size destination buffers before a bulk read.
    pub fn num_elements(&self, element: &FbomType) -> Result<usize> {
        if self.ty.kind != FbomKind::Sequence {
            return Err(Error::mismatch(FbomKind::Sequence, &self.ty));
        }
        let declared = self
            .ty
            .element()
            .ok_or_else(|| Error::invalid("sequence type without element type"))?;
        if !declared.matches(element) {
            return Err(Error::mismatch(element, declared));
        }
        match &self.value {
            FbomValue::Bytes(b) => {
                if element.size == 0 {
                    return Err(Error::invalid("element type has no fixed size"));
                }
                Ok(b.len() / element.size as usize)
            }
            FbomValue::Array(a) => Ok(a.len()),
            _ => Err(Error::mismatch(FbomKind::Sequence, &self.ty)),
        }
    }

    /// Bulk-read a POD sequence payload into a vector.
    pub fn read_elements<T: FbomPod>(&self) -> Result<Vec<T>> {
        let element = FbomType::of::<T>();
        let count = self.num_elements(&element)?;
        let bytes = match &self.value {
            FbomValue::Bytes(b) => b,
            _ => return Err(Error::mismatch(FbomKind::Sequence, &self.ty)),
        };
        let mut out = Vec::with_capacity(count);
        for chunk in bytes.chunks_exact(T::SIZE) {
            out.push(bytemuck::pod_read_unaligned(chunk));
        }
        Ok(out)
    }

    /// Access a nested object payload.
    pub fn as_object(&self) -> Result<&FbomObject> {
        match &self.value {
            FbomValue::Object(o) => Ok(o),
            _ => Err(Error::mismatch(FbomKind::Object, &self.ty)),
        }
    }

    /// Access a nested array payload.
    pub fn as_array(&self) -> Result<&FbomArray> {
        match &self.value {
            FbomValue::Array(a) => Ok(a),
            _ => Err(Error::mismatch(FbomKind::Sequence, &self.ty)),
        }
    }
}

impl Default for FbomData {
    fn default() -> Self {
        Self::unset()
    }
}

impl fmt::Debug for FbomData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            FbomValue::Unset => write!(f, "FbomData(unset)"),
            FbomValue::Bytes(b) => write!(f, "FbomData({}, {} bytes)", self.ty, b.len()),
            FbomValue::Object(o) => write!(f, "FbomData(object {})", o.object_type().name),
            FbomValue::Array(a) => {
                write!(f, "FbomData({}[{}])", a.element_type(), a.len())
            }
        }
    }
}
