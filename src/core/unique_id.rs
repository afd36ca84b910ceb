//! Content-derived unique IDs for static-data deduplication.
//!
//! IDs are 128-bit digests over an object's type, property table and
//! children, computed bottom-up. Structurally identical subtrees collapse to
//! the same ID; structurally different subtrees differ within the digest's
//! collision-resistance bound.

use md5::{Digest, Md5};

use super::data::{FbomData, FbomValue};
use super::object::FbomObject;
use super::ty::FbomType;

/// 128-bit content digest used as a static-data key.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug)]
pub struct UniqueId(pub [u8; 16]);

impl UniqueId {
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// Compute the digest of raw bytes.
#[inline]
pub fn compute_digest(data: &[u8]) -> UniqueId {
    let mut hasher = Md5::new();
    hasher.update(data);
    UniqueId(hasher.finalize().into())
}

fn hash_type(hasher: &mut Md5, ty: &FbomType) {
    hasher.update([ty.kind as u8]);
    hasher.update((ty.name.len() as u32).to_le_bytes());
    hasher.update(ty.name.as_bytes());
    hasher.update(ty.size.to_le_bytes());
    if let Some(parent) = ty.extends.as_deref() {
        hasher.update([1u8]);
        hash_type(hasher, parent);
    } else {
        hasher.update([0u8]);
    }
    if let Some(element) = ty.element() {
        hasher.update([1u8]);
        hash_type(hasher, element);
    } else {
        hasher.update([0u8]);
    }
}

fn hash_data(hasher: &mut Md5, data: &FbomData) {
    hash_type(hasher, data.ty());
    // storage flags change the wire form, so they are content
    hasher.update([data.flags()]);
    match data.value() {
        FbomValue::Unset => hasher.update([0u8]),
        FbomValue::Bytes(bytes) => {
            hasher.update([1u8]);
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes.as_slice());
        }
        FbomValue::Object(object) => {
            hasher.update([2u8]);
            hasher.update(object_digest(object).as_bytes());
        }
        FbomValue::Array(array) => {
            hasher.update([3u8]);
            hash_type(hasher, array.element_type());
            hasher.update((array.len() as u32).to_le_bytes());
            for value in array.iter() {
                hash_data(hasher, value);
            }
        }
    }
}

/// Digest of a whole object subtree.
///
/// The KEEP_UNIQUE flag is identity, not content, and stays out of the
/// digest; the writer bypasses the dedup table for flagged objects instead.
pub fn object_digest(object: &FbomObject) -> UniqueId {
    let mut hasher = Md5::new();
    hash_type(&mut hasher, object.object_type());
    hasher.update((object.num_properties() as u32).to_le_bytes());
    for (name, data) in object.properties() {
        hasher.update((name.len() as u32).to_le_bytes());
        hasher.update(name.as_bytes());
        hash_data(&mut hasher, data);
    }
    hasher.update((object.num_children() as u32).to_le_bytes());
    for child in object.children() {
        hasher.update(object_digest(child).as_bytes());
    }
    UniqueId(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FbomType;

    #[test]
    fn test_digest_deterministic() {
        let a = compute_digest(b"hello");
        let b = compute_digest(b"hello");
        let c = compute_digest(b"hellp");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_object_digest_includes_children() {
        let mut a = FbomObject::new(FbomType::object("Node"));
        let b = a.clone();
        a.add_child(FbomObject::new(FbomType::object("Node")));
        assert_ne!(object_digest(&a), object_digest(&b));
    }

    #[test]
    fn test_data_flags_are_content() {
        let mut a = FbomObject::new(FbomType::object("Node"));
        a.set_property("blob", FbomData::from_byte_buffer(vec![0u8; 16]));

        let mut b = FbomObject::new(FbomType::object("Node"));
        b.set_property(
            "blob",
            FbomData::from_byte_buffer(vec![0u8; 16]).mark_compressed(),
        );

        // differing storage flags must not collapse into one dedup slot
        assert_ne!(object_digest(&a), object_digest(&b));
    }

    #[test]
    fn test_object_digest_property_order_matters() {
        let mut a = FbomObject::new(FbomType::object("Node"));
        a.set_property("x", FbomData::from_i32(1));
        a.set_property("y", FbomData::from_i32(2));

        let mut b = FbomObject::new(FbomType::object("Node"));
        b.set_property("y", FbomData::from_i32(2));
        b.set_property("x", FbomData::from_i32(1));

        assert_ne!(object_digest(&a), object_digest(&b));
    }
}
