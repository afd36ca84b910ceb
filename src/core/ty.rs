//! FbomType - describes a value's on-disk type.

use std::fmt;

use crate::util::FbomPod;

/// Fundamental kind of an FBOM value.
///
/// Primitive kinds have a fixed size and well-defined binary representation.
/// `Struct`, `Sequence` and `Object` kinds carry extra shape information on
/// the enclosing [`FbomType`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum FbomKind {
    /// Unset/invalid type
    #[default]
    Unset = 0,
    /// Boolean (stored as u8: 0 = false, non-zero = true)
    Bool = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    Uint8 = 6,
    Uint16 = 7,
    Uint32 = 8,
    Uint64 = 9,
    Float32 = 10,
    Float64 = 11,
    /// UTF-8 string
    String = 12,
    /// Interned identifier, stored as UTF-8
    Name = 13,
    /// Opaque byte buffer
    ByteBuffer = 14,
    /// Fixed-layout struct blob; layout identified by type name + size
    Struct = 15,
    /// Homogeneous sequence; element type on the enclosing FbomType
    Sequence = 16,
    /// Nested serialized object
    Object = 17,
}

impl FbomKind {
    /// Returns the fixed size in bytes of one value of this kind,
    /// or 0 for variable-sized kinds.
    #[inline]
    pub const fn num_bytes(self) -> u64 {
        match self {
            Self::Bool | Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Int64 | Self::Uint64 | Self::Float64 => 8,
            _ => 0,
        }
    }

    /// Returns the canonical name of this kind.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::Name => "name",
            Self::ByteBuffer => "byte_buffer",
            Self::Struct => "struct",
            Self::Sequence => "sequence",
            Self::Object => "object",
        }
    }

    /// Convert from the wire code. Unknown codes map to `Unset`.
    pub const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Bool,
            2 => Self::Int8,
            3 => Self::Int16,
            4 => Self::Int32,
            5 => Self::Int64,
            6 => Self::Uint8,
            7 => Self::Uint16,
            8 => Self::Uint32,
            9 => Self::Uint64,
            10 => Self::Float32,
            11 => Self::Float64,
            12 => Self::String,
            13 => Self::Name,
            14 => Self::ByteBuffer,
            15 => Self::Struct,
            16 => Self::Sequence,
            17 => Self::Object,
            _ => Self::Unset,
        }
    }

    /// Returns true for fixed-size scalar kinds.
    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.num_bytes() != 0
    }
}

impl fmt::Display for FbomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Type flag: values of this type participate in static-data deduplication.
pub const TYPE_FLAG_STATIC_DATA: u8 = 1 << 0;

/// Describes the on-disk type of an FBOM value.
///
/// For primitive and struct kinds, `name` + `size` + the extends chain
/// uniquely identify the wire layout. Object and sequence kinds carry an
/// element/extends reference instead of a meaningful fixed size.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FbomType {
    pub kind: FbomKind,
    /// Type name: canonical for primitives, user-supplied for struct/object.
    pub name: String,
    /// Byte width of one value; 0 if variable.
    pub size: u64,
    pub flags: u8,
    /// Parent type for "is or extends" checks (object/struct kinds).
    pub extends: Option<Box<FbomType>>,
    /// Element type for sequence kinds.
    pub element: Option<Box<FbomType>>,
}

impl FbomType {
    /// Unset/invalid type.
    pub fn unset() -> Self {
        Self::primitive(FbomKind::Unset)
    }

    /// A primitive type of the given kind.
    pub fn primitive(kind: FbomKind) -> Self {
        Self {
            kind,
            name: kind.name().to_string(),
            size: kind.num_bytes(),
            flags: 0,
            extends: None,
            element: None,
        }
    }

    /// The primitive type matching a native POD scalar.
    pub fn of<T: FbomPod>() -> Self {
        Self::primitive(T::KIND)
    }

    /// A UTF-8 string type (variable size).
    pub fn string() -> Self {
        Self::primitive(FbomKind::String)
    }

    /// A name/identifier type (variable size).
    pub fn name() -> Self {
        Self::primitive(FbomKind::Name)
    }

    /// An opaque byte buffer type (variable size).
    pub fn byte_buffer() -> Self {
        Self::primitive(FbomKind::ByteBuffer)
    }

    /// A fixed-layout struct type with the given name and byte width.
    pub fn strukt(name: impl Into<String>, size: u64) -> Self {
        Self {
            kind: FbomKind::Struct,
            name: name.into(),
            size,
            flags: 0,
            extends: None,
            element: None,
        }
    }

    /// The struct type of a native POD struct.
    pub fn struct_of<T: bytemuck::Pod>(name: impl Into<String>) -> Self {
        Self::strukt(name, std::mem::size_of::<T>() as u64)
    }

    /// A homogeneous sequence of the given element type.
    pub fn sequence(element: FbomType) -> Self {
        Self {
            kind: FbomKind::Sequence,
            name: format!("{}[]", element.name),
            size: 0,
            flags: 0,
            extends: None,
            element: Some(Box::new(element)),
        }
    }

    /// An object type naming a marshal contract, e.g. "Light".
    pub fn object(name: impl Into<String>) -> Self {
        Self {
            kind: FbomKind::Object,
            name: name.into(),
            size: 0,
            flags: 0,
            extends: None,
            element: None,
        }
    }

    /// Set the parent type for "is or extends" checks.
    pub fn with_extends(mut self, parent: FbomType) -> Self {
        self.extends = Some(Box::new(parent));
        self
    }

    /// Set type flags.
    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    /// Returns true if this type is valid (not unset).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.kind != FbomKind::Unset
    }

    /// Returns true if this type is the named type or extends it.
    pub fn is_or_extends(&self, name: &str) -> bool {
        if self.name == name {
            return true;
        }
        let mut parent = self.extends.as_deref();
        while let Some(ty) = parent {
            if ty.name == name {
                return true;
            }
            parent = ty.extends.as_deref();
        }
        false
    }

    /// Returns true if this type matches another for wire purposes:
    /// same kind, name and size.
    pub fn matches(&self, other: &FbomType) -> bool {
        self.kind == other.kind && self.name == other.name && self.size == other.size
    }

    /// Element type of a sequence, if this is one.
    pub fn element(&self) -> Option<&FbomType> {
        self.element.as_deref()
    }
}

impl Default for FbomType {
    fn default() -> Self {
        Self::unset()
    }
}

impl fmt::Debug for FbomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FbomKind::Struct => write!(f, "struct {}({})", self.name, self.size),
            FbomKind::Object => write!(f, "object {}", self.name),
            FbomKind::Sequence => write!(f, "{}", self.name),
            _ => write!(f, "{}", self.name),
        }
    }
}

impl fmt::Display for FbomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_sizes() {
        assert_eq!(FbomKind::Bool.num_bytes(), 1);
        assert_eq!(FbomKind::Int32.num_bytes(), 4);
        assert_eq!(FbomKind::Float64.num_bytes(), 8);
        assert_eq!(FbomKind::String.num_bytes(), 0);
        assert_eq!(FbomKind::Object.num_bytes(), 0);
    }

    #[test]
    fn test_kind_codes_roundtrip() {
        for code in 0..=17u8 {
            let kind = FbomKind::from_u8(code);
            assert_eq!(kind as u8, code);
        }
        assert_eq!(FbomKind::from_u8(200), FbomKind::Unset);
    }

    #[test]
    fn test_is_or_extends() {
        let light = FbomType::object("Light");
        let spot = FbomType::object("SpotLight").with_extends(light.clone());

        assert!(light.is_or_extends("Light"));
        assert!(spot.is_or_extends("SpotLight"));
        assert!(spot.is_or_extends("Light"));
        assert!(!light.is_or_extends("SpotLight"));
        assert!(!spot.is_or_extends("Camera"));
    }

    #[test]
    fn test_sequence_type() {
        let seq = FbomType::sequence(FbomType::primitive(FbomKind::Float32));
        assert_eq!(seq.kind, FbomKind::Sequence);
        assert_eq!(seq.element().unwrap().kind, FbomKind::Float32);
        assert_eq!(seq.name, "float32[]");
    }

    #[test]
    fn test_struct_type() {
        #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
        #[repr(C)]
        struct Extent {
            w: u32,
            h: u32,
            d: u32,
        }

        let ty = FbomType::struct_of::<Extent>("Extent");
        assert_eq!(ty.kind, FbomKind::Struct);
        assert_eq!(ty.size, 12);
        assert!(ty.is_valid());
    }
}
