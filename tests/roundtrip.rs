//! End-to-end write/load round-trips over in-memory streams.

use std::sync::Arc;

use fbom::core::{FbomData, FbomObject, FbomType};
use fbom::marshal::{DeserializeContext, MarshalRegistry, SerializeContext, TypedMarshal};
use fbom::reader::FbomReader;
use fbom::stream::ByteWriter;
use fbom::util::{Error, Result};
use fbom::writer::FbomWriter;

fn write_to_memory(writer: &mut FbomWriter) -> Vec<u8> {
    let mut out = ByteWriter::memory();
    writer.write(&mut out).unwrap();
    out.into_bytes().unwrap()
}

/// Marshal that carries no native state; used where only the object tree
/// round-trip is under test.
struct ProbeMarshal(&'static str);

impl TypedMarshal for ProbeMarshal {
    type Native = ();

    fn object_type(&self) -> FbomType {
        FbomType::object(self.0)
    }

    fn serialize(
        &self,
        _native: &(),
        _ctx: &mut SerializeContext<'_>,
        _out: &mut FbomObject,
    ) -> Result<()> {
        Ok(())
    }

    fn deserialize(&self, _ctx: &mut DeserializeContext<'_>, _object: &FbomObject) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Debug, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct Extent {
    width: u32,
    height: u32,
    depth: u32,
}

#[test]
fn roundtrip_all_primitive_kinds() {
    let registry = Arc::new(MarshalRegistry::new());
    registry.register(ProbeMarshal("Probe")).unwrap();

    let mut obj = FbomObject::new(FbomType::object("Probe"));
    obj.set_property("b", FbomData::from_bool(true));
    obj.set_property("i8", FbomData::from_i8(-8));
    obj.set_property("i16", FbomData::from_i16(-1600));
    obj.set_property("i32", FbomData::from_i32(i32::MIN));
    obj.set_property("i64", FbomData::from_i64(i64::MAX));
    obj.set_property("u8", FbomData::from_u8(200));
    obj.set_property("u16", FbomData::from_u16(u16::MAX));
    obj.set_property("u32", FbomData::from_u32(0xDEAD_BEEF));
    obj.set_property("u64", FbomData::from_u64(u64::MAX - 1));
    obj.set_property("f32", FbomData::from_f32(-1.5e-8));
    obj.set_property("f64", FbomData::from_f64(std::f64::consts::PI));
    obj.set_property("s", FbomData::from_string("héllo"));
    obj.set_property("n", FbomData::from_name("root"));
    obj.set_property("buf", FbomData::from_byte_buffer(vec![0, 1, 2, 255]));
    obj.set_property("seq", FbomData::from_sequence(&[1.0f32, 2.0, 3.0]));
    obj.set_property(
        "extent",
        FbomData::from_struct("Extent", &Extent { width: 64, height: 64, depth: 1 }),
    );

    let mut writer = FbomWriter::new(Arc::clone(&registry));
    writer.append_object(obj.clone());
    let bytes = write_to_memory(&mut writer);

    let mut reader = FbomReader::new(registry);
    let result = reader.load_bytes(bytes).unwrap();
    assert_eq!(result.libraries().len(), 1);
    let back = &result.libraries()[0].objects()[0];

    // bit-for-bit equality over the whole property table
    assert_eq!(back, &obj);
    assert_eq!(back.property("b").unwrap().read_bool().unwrap(), true);
    assert_eq!(back.property("i32").unwrap().read_i32().unwrap(), i32::MIN);
    assert_eq!(
        back.property("f64").unwrap().read_f64().unwrap().to_bits(),
        std::f64::consts::PI.to_bits()
    );
    assert_eq!(back.property("s").unwrap().read_string().unwrap(), "héllo");
    assert_eq!(
        back.property("seq").unwrap().read_elements::<f32>().unwrap(),
        vec![1.0, 2.0, 3.0]
    );
    assert_eq!(
        back.property("extent").unwrap().read_struct::<Extent>("Extent").unwrap(),
        Extent { width: 64, height: 64, depth: 1 }
    );
}

#[test]
fn roundtrip_texture_descriptor() {
    // a fixed-layout resource description must survive bit-exact
    #[derive(Clone, Copy, PartialEq, Debug, bytemuck::Pod, bytemuck::Zeroable)]
    #[repr(C)]
    struct TextureDesc {
        texture_type: u32,
        format: u32,
        extent: Extent,
        num_layers: u32,
        num_faces: u32,
    }

    let desc = TextureDesc {
        texture_type: 2,
        format: 5,
        extent: Extent { width: 64, height: 64, depth: 1 },
        num_layers: 1,
        num_faces: 1,
    };

    let registry = Arc::new(MarshalRegistry::new());
    registry.register(ProbeMarshal("Texture")).unwrap();

    let mut obj = FbomObject::new(FbomType::object("Texture"));
    obj.set_property("desc", FbomData::from_struct("TextureDesc", &desc));

    let mut writer = FbomWriter::new(Arc::clone(&registry));
    writer.append_object(obj);
    let bytes = write_to_memory(&mut writer);

    let mut reader = FbomReader::new(registry);
    let result = reader.load_bytes(bytes).unwrap();
    let back = result.libraries()[0].objects()[0]
        .expect_property("desc")
        .unwrap()
        .read_struct::<TextureDesc>("TextureDesc")
        .unwrap();
    assert_eq!(back, desc);
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Camera {
    fov: f32,
    near: f32,
    far: f32,
}

struct CameraMarshal;

impl TypedMarshal for CameraMarshal {
    type Native = Camera;

    fn object_type(&self) -> FbomType {
        FbomType::object("Camera")
    }

    fn serialize(
        &self,
        native: &Camera,
        _ctx: &mut SerializeContext<'_>,
        out: &mut FbomObject,
    ) -> Result<()> {
        out.set_property("fov", FbomData::from_f32(native.fov));
        out.set_property("near", FbomData::from_f32(native.near));
        out.set_property("far", FbomData::from_f32(native.far));
        Ok(())
    }

    fn deserialize(&self, _ctx: &mut DeserializeContext<'_>, object: &FbomObject) -> Result<Camera> {
        Ok(Camera {
            fov: object.expect_property("fov")?.read_f32()?,
            near: object.expect_property("near")?.read_f32()?,
            far: object.expect_property("far")?.read_f32()?,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Node {
    name: String,
}

struct NodeMarshal;

impl TypedMarshal for NodeMarshal {
    type Native = Node;

    fn object_type(&self) -> FbomType {
        FbomType::object("Node")
    }

    fn serialize(
        &self,
        native: &Node,
        _ctx: &mut SerializeContext<'_>,
        out: &mut FbomObject,
    ) -> Result<()> {
        out.set_property("name", FbomData::from_name(&native.name));
        Ok(())
    }

    fn deserialize(&self, _ctx: &mut DeserializeContext<'_>, object: &FbomObject) -> Result<Node> {
        Ok(Node {
            name: object.expect_property("name")?.read_name()?,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Scene {
    root: Node,
    camera: Camera,
}

struct SceneMarshal;

impl TypedMarshal for SceneMarshal {
    type Native = Scene;

    fn object_type(&self) -> FbomType {
        FbomType::object("Scene")
    }

    fn serialize(
        &self,
        native: &Scene,
        ctx: &mut SerializeContext<'_>,
        out: &mut FbomObject,
    ) -> Result<()> {
        ctx.serialize_child(out, &native.root)?;
        ctx.serialize_child(out, &native.camera)?;
        Ok(())
    }

    fn deserialize(&self, _ctx: &mut DeserializeContext<'_>, object: &FbomObject) -> Result<Scene> {
        // children come back in arbitrary order; look them up by type
        let root = object
            .child_of_type("Node")
            .and_then(|o| o.deserialized::<Node>())
            .ok_or_else(|| Error::invalid("scene has no deserialized root node"))?;
        let camera = object
            .child_of_type("Camera")
            .and_then(|o| o.deserialized::<Camera>())
            .ok_or_else(|| Error::invalid("scene has no deserialized camera"))?;
        Ok(Scene {
            root: (*root).clone(),
            camera: (*camera).clone(),
        })
    }
}

fn scene_registry() -> Arc<MarshalRegistry> {
    let registry = Arc::new(MarshalRegistry::new());
    registry.register(SceneMarshal).unwrap();
    registry.register(NodeMarshal).unwrap();
    registry.register(CameraMarshal).unwrap();
    registry
}

#[test]
fn roundtrip_scene_graph() {
    let scene = Scene {
        root: Node {
            name: "root".to_string(),
        },
        camera: Camera {
            fov: 60.0,
            near: 0.1,
            far: 1000.0,
        },
    };

    let registry = scene_registry();
    let mut writer = FbomWriter::new(Arc::clone(&registry));
    writer.append(&scene).unwrap();
    let bytes = write_to_memory(&mut writer);

    let mut reader = FbomReader::new(registry);
    let result = reader.load_bytes(bytes).unwrap();
    assert_eq!(result.skipped(), 0);

    let back: Arc<Scene> = result.first_deserialized().unwrap();
    assert_eq!(*back, scene);

    // the intermediate tree also carries handles on the children
    let root_obj = result.roots().next().unwrap();
    let camera = root_obj
        .child_of_type("Camera")
        .and_then(|o| o.deserialized::<Camera>())
        .unwrap();
    assert_eq!(camera.fov, 60.0);
}

#[test]
fn append_without_marshal_fails_eagerly() {
    struct Unregistered;

    let registry = Arc::new(MarshalRegistry::new());
    let mut writer = FbomWriter::new(registry);
    let err = writer.append(&Unregistered).unwrap_err();
    assert!(matches!(err, Error::NoMarshalForNativeType(_)));
    assert_eq!(writer.num_pending_roots(), 0);
}

#[test]
fn duplicate_wire_type_registration_is_rejected() {
    struct OtherCamera;

    struct OtherCameraMarshal;

    impl TypedMarshal for OtherCameraMarshal {
        type Native = OtherCamera;

        fn object_type(&self) -> FbomType {
            FbomType::object("Camera")
        }

        fn serialize(
            &self,
            _native: &OtherCamera,
            _ctx: &mut SerializeContext<'_>,
            _out: &mut FbomObject,
        ) -> Result<()> {
            Ok(())
        }

        fn deserialize(
            &self,
            _ctx: &mut DeserializeContext<'_>,
            _object: &FbomObject,
        ) -> Result<OtherCamera> {
            Ok(OtherCamera)
        }
    }

    let registry = MarshalRegistry::new();
    registry.register(CameraMarshal).unwrap();
    let err = registry.register(OtherCameraMarshal).unwrap_err();
    assert!(matches!(err, Error::MarshalCollision(_)));

    // the first registration stays intact
    assert!(registry.resolve(&FbomType::object("Camera")).is_ok());
}

#[test]
fn circular_reference_is_typed_error() {
    #[derive(Default)]
    struct Knot {
        id: u32,
    }

    struct KnotMarshal;

    impl TypedMarshal for KnotMarshal {
        type Native = Knot;

        fn object_type(&self) -> FbomType {
            FbomType::object("Knot")
        }

        fn serialize(
            &self,
            native: &Knot,
            ctx: &mut SerializeContext<'_>,
            out: &mut FbomObject,
        ) -> Result<()> {
            out.set_property("id", FbomData::from_u32(native.id));
            // a self-referential graph re-enters its own serialization
            ctx.serialize_child(out, native)
        }

        fn deserialize(
            &self,
            _ctx: &mut DeserializeContext<'_>,
            _object: &FbomObject,
        ) -> Result<Knot> {
            Ok(Knot::default())
        }
    }

    let registry = Arc::new(MarshalRegistry::new());
    registry.register(KnotMarshal).unwrap();

    let mut writer = FbomWriter::new(registry);
    let err = writer.append(&Knot { id: 7 }).unwrap_err();
    assert!(matches!(err, Error::CircularReference(name) if name == "Knot"));
    // the failed root never lands in the library
    assert_eq!(writer.num_pending_roots(), 0);
}

#[test]
fn unknown_object_type_fails_loud_by_default() {
    let registry = Arc::new(MarshalRegistry::new());
    let mut writer = FbomWriter::new(Arc::clone(&registry));
    writer.append_object(FbomObject::new(FbomType::object("Mystery")));
    let bytes = write_to_memory(&mut writer);

    let mut reader = FbomReader::new(registry);
    let err = reader.load_bytes(bytes).unwrap_err();
    assert!(matches!(err, Error::UnknownObjectType(name) if name == "Mystery"));
}

#[test]
fn unknown_object_type_skipped_when_tolerant() {
    use fbom::reader::FbomReaderConfig;

    let registry = Arc::new(MarshalRegistry::new());
    let mut writer = FbomWriter::new(Arc::clone(&registry));
    writer.append_object(FbomObject::new(FbomType::object("Mystery")));
    let bytes = write_to_memory(&mut writer);

    let config = FbomReaderConfig {
        continue_on_external_load_error: true,
        ..Default::default()
    };
    let mut reader = FbomReader::with_config(registry, config);
    let result = reader.load_bytes(bytes).unwrap();

    // object tree survives, just without a native instance
    assert_eq!(result.skipped(), 1);
    let root = result.roots().next().unwrap();
    assert_eq!(root.object_type().name, "Mystery");
    assert!(root.deserialized_handle().is_none());
}

#[test]
fn resolve_via_extends_chain() {
    let scene = Scene {
        root: Node {
            name: "root".to_string(),
        },
        camera: Camera::default(),
    };

    let registry = scene_registry();
    let mut writer = FbomWriter::new(Arc::clone(&registry));
    writer.append(&scene).unwrap();

    // a subtype of Node lands in the same stream; only Node is registered
    let group = FbomObject::new(
        FbomType::object("GroupNode").with_extends(FbomType::object("Node")),
    );
    let mut group = group;
    group.set_property("name", FbomData::from_name("group"));
    writer.append_object(group);

    let bytes = write_to_memory(&mut writer);
    let mut reader = FbomReader::new(registry);
    let result = reader.load_bytes(bytes).unwrap();
    assert_eq!(result.skipped(), 0);

    let group_obj = result
        .roots()
        .find(|o| o.object_type().name == "GroupNode")
        .unwrap();
    let node = group_obj.deserialized::<Node>().unwrap();
    assert_eq!(node.name, "group");
}
