//! Static-data deduplication behavior on the wire and through the reader.

use std::sync::Arc;

use fbom::core::{FbomData, FbomObject, FbomType};
use fbom::marshal::MarshalRegistry;
use fbom::reader::{FbomReader, FbomReaderConfig};
use fbom::stream::ByteWriter;
use fbom::writer::{FbomWriter, FbomWriterConfig};

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

fn tolerant_reader(registry: Arc<MarshalRegistry>) -> FbomReader {
    FbomReader::with_config(
        registry,
        FbomReaderConfig {
            continue_on_external_load_error: true,
            ..Default::default()
        },
    )
}

fn payload_node(payload: &str) -> FbomObject {
    let mut node = FbomObject::new(FbomType::object("Node"));
    node.set_property("payload", FbomData::from_string(payload));
    node
}

fn write_to_memory(writer: &mut FbomWriter) -> Vec<u8> {
    let mut out = ByteWriter::memory();
    writer.write(&mut out).unwrap();
    out.into_bytes().unwrap()
}

#[test]
fn identical_subtrees_stored_once() {
    let registry = Arc::new(MarshalRegistry::new());
    let mut writer = FbomWriter::new(Arc::clone(&registry));
    writer.append_object(payload_node("dedup-me"));
    writer.append_object(payload_node("dedup-me"));
    writer.append_object(payload_node("dedup-me"));

    let bytes = write_to_memory(&mut writer);
    assert_eq!(count_occurrences(&bytes, b"dedup-me"), 1);

    // the reader still materializes every root
    let mut reader = tolerant_reader(registry);
    let result = reader.load_bytes(bytes).unwrap();
    let roots: Vec<_> = result.roots().collect();
    assert_eq!(roots.len(), 3);
    assert_eq!(roots[0], roots[1]);
    assert_eq!(roots[1], roots[2]);
    assert_eq!(
        roots[2].property("payload").unwrap().read_string().unwrap(),
        "dedup-me"
    );
}

#[test]
fn shared_child_collapses_across_parents() {
    let registry = Arc::new(MarshalRegistry::new());
    let mut writer = FbomWriter::new(Arc::clone(&registry));

    let shared = payload_node("shared-child");
    for parent_name in ["left", "right"] {
        let mut parent = FbomObject::new(FbomType::object("Node"));
        parent.set_property("payload", FbomData::from_string(parent_name));
        parent.add_child(shared.clone());
        writer.append_object(parent);
    }

    let bytes = write_to_memory(&mut writer);
    assert_eq!(count_occurrences(&bytes, b"shared-child"), 1);

    let mut reader = tolerant_reader(registry);
    let result = reader.load_bytes(bytes).unwrap();
    for root in result.roots() {
        let child = root.child_of_type("Node").unwrap();
        assert_eq!(
            child.property("payload").unwrap().read_string().unwrap(),
            "shared-child"
        );
    }
}

#[test]
fn keep_unique_objects_stay_independent() {
    let registry = Arc::new(MarshalRegistry::new());
    let mut writer = FbomWriter::new(Arc::clone(&registry));
    writer.append_object(payload_node("keep-me").keep_unique());
    writer.append_object(payload_node("keep-me").keep_unique());

    let bytes = write_to_memory(&mut writer);
    assert_eq!(count_occurrences(&bytes, b"keep-me"), 2);

    let mut reader = tolerant_reader(registry);
    let result = reader.load_bytes(bytes).unwrap();
    assert_eq!(result.roots().count(), 2);
    for root in result.roots() {
        assert!(root.is_keep_unique());
    }
}

#[test]
fn dedup_disabled_writes_every_copy() {
    let registry = Arc::new(MarshalRegistry::new());
    let config = FbomWriterConfig {
        enable_static_data: false,
        ..Default::default()
    };
    let mut writer = FbomWriter::with_config(registry, config);
    writer.append_object(payload_node("twice"));
    writer.append_object(payload_node("twice"));

    let bytes = write_to_memory(&mut writer);
    assert_eq!(count_occurrences(&bytes, b"twice"), 2);
}

#[test]
fn marked_payload_roundtrips_compressed() {
    let registry = Arc::new(MarshalRegistry::new());
    let mut writer = FbomWriter::new(Arc::clone(&registry));

    let blob = vec![7u8; 2048];
    let mut obj = FbomObject::new(FbomType::object("Node"));
    obj.set_property(
        "blob",
        FbomData::from_byte_buffer(blob.clone()).mark_compressed(),
    );
    writer.append_object(obj);

    let bytes = write_to_memory(&mut writer);
    // 2048 repeated bytes must not appear verbatim
    assert!(bytes.len() < blob.len());

    let mut reader = tolerant_reader(registry);
    let result = reader.load_bytes(bytes).unwrap();
    let back = result.roots().next().unwrap().property("blob").unwrap();
    assert!(back.is_compressed());
    assert_eq!(back.read_byte_buffer().unwrap(), blob.as_slice());
}

#[test]
fn threshold_compression_preserves_values() {
    let registry = Arc::new(MarshalRegistry::new());
    let config = FbomWriterConfig {
        enable_static_data: true,
        compress_static_data: true,
        compression_threshold: 64,
    };
    let mut writer = FbomWriter::with_config(Arc::clone(&registry), config);

    let values: Vec<f32> = (0..512).map(|i| i as f32 * 0.5).collect();
    let mut obj = FbomObject::new(FbomType::object("Node"));
    obj.set_property("values", FbomData::from_sequence(&values));
    obj.set_property("small", FbomData::from_string("tiny"));
    writer.append_object(obj);

    let bytes = write_to_memory(&mut writer);
    // sub-threshold payloads are stored plain
    assert_eq!(count_occurrences(&bytes, b"tiny"), 1);

    let mut reader = tolerant_reader(registry);
    let result = reader.load_bytes(bytes).unwrap();
    let root = result.roots().next().unwrap();
    assert_eq!(
        root.property("values").unwrap().read_elements::<f32>().unwrap(),
        values
    );
    assert_eq!(
        root.property("small").unwrap().read_string().unwrap(),
        "tiny"
    );
}
