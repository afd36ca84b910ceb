//! POD bindings between native Rust types and FBOM primitive kinds.

use bytemuck::{Pod, Zeroable};

use crate::core::FbomKind;

/// Trait for native types that map 1:1 onto an FBOM primitive kind.
///
/// Used by the typed accessors on `FbomData` and by homogeneous sequence
/// payloads. Struct-typed payloads only need `bytemuck::Pod`; this trait is
/// for scalars with a fixed wire kind.
pub trait FbomPod: Pod + Zeroable + Copy + Default {
    /// The corresponding FBOM primitive kind.
    const KIND: FbomKind;

    /// Size of this type in bytes.
    const SIZE: usize = std::mem::size_of::<Self>();
}

impl FbomPod for u8 {
    const KIND: FbomKind = FbomKind::Uint8;
}

impl FbomPod for i8 {
    const KIND: FbomKind = FbomKind::Int8;
}

impl FbomPod for u16 {
    const KIND: FbomKind = FbomKind::Uint16;
}

impl FbomPod for i16 {
    const KIND: FbomKind = FbomKind::Int16;
}

impl FbomPod for u32 {
    const KIND: FbomKind = FbomKind::Uint32;
}

impl FbomPod for i32 {
    const KIND: FbomKind = FbomKind::Int32;
}

impl FbomPod for u64 {
    const KIND: FbomKind = FbomKind::Uint64;
}

impl FbomPod for i64 {
    const KIND: FbomKind = FbomKind::Int64;
}

impl FbomPod for f32 {
    const KIND: FbomKind = FbomKind::Float32;
}

impl FbomPod for f64 {
    const KIND: FbomKind = FbomKind::Float64;
}

/// Boolean with guaranteed 1-byte storage for wire payloads.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Bool(u8);

impl Bool {
    pub const TRUE: Self = Self(1);
    pub const FALSE: Self = Self(0);

    #[inline]
    pub const fn new(v: bool) -> Self {
        Self(v as u8)
    }

    #[inline]
    pub const fn get(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Bool {
    #[inline]
    fn from(v: bool) -> Self {
        Self::new(v)
    }
}

impl From<Bool> for bool {
    #[inline]
    fn from(v: Bool) -> Self {
        v.get()
    }
}

impl std::fmt::Debug for Bool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl FbomPod for Bool {
    const KIND: FbomKind = FbomKind::Bool;
}
