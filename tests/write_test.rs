//! Tests for writing packages and reading them back

use std::io::Cursor;

use threemf::model::production::{BuildAttr, ComponentAttr, ItemAttr, ObjectAttr};
use threemf::model::{Slice, SliceObjectAttr, SlicePolygon, SliceSegment, TextureType, Vertex2D};
use threemf::{
    Attachment, Beam, BeamLattice, BuildItem, ChildModel, ColorGroup, Component, ExtensionRegistry,
    Mesh, MeshBuilder, MetadataEntry, Model, Object, ParserConfig, SliceStack, Texture2D,
    Texture2DGroup, Tex2Coord, Triangle, Unit, Vertex,
};

fn tetrahedron() -> Mesh {
    let mut mesh = Mesh::new();
    let mut builder = MeshBuilder::new(&mut mesh);
    let a = builder.add_vertex(Vertex::new(0.0, 0.0, 0.0));
    let b = builder.add_vertex(Vertex::new(10.0, 0.0, 0.0));
    let c = builder.add_vertex(Vertex::new(0.0, 10.0, 0.0));
    let d = builder.add_vertex(Vertex::new(0.0, 0.0, 10.0));
    builder.add_triangle(a, c, b);
    builder.add_triangle(a, b, d);
    builder.add_triangle(b, c, d);
    builder.add_triangle(c, a, d);
    mesh
}

fn write(model: &Model) -> Vec<u8> {
    let registry = ExtensionRegistry::with_default_extensions();
    model
        .to_writer(Cursor::new(Vec::new()), &registry)
        .expect("model should be written")
        .into_inner()
}

fn read(data: Vec<u8>) -> Model {
    let (model, diagnostics) = Model::from_reader(Cursor::new(data)).expect("package should be read");
    assert!(diagnostics.is_empty(), "{}", diagnostics);
    model
}

/// A model touching the core and the materials, slice and beam lattice extensions
fn rich_model() -> Model {
    let mut model = Model::new();
    model.unit = Unit::Centimeter;
    model.language = "en-US".to_string();
    model.metadata.push(MetadataEntry::new("Title", "Round trip"));
    model.metadata.push(MetadataEntry::new("Designer", "threemf"));

    model.attachments.push(Attachment {
        path: "/3D/Texture/wood.png".to_string(),
        content_type: "image/png".to_string(),
        data: vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a],
    });
    let mut colors = ColorGroup::new(1);
    colors.colors.push((255, 0, 0, 255));
    colors.colors.push((0, 128, 255, 200));
    model.resources.push_asset(colors);
    model
        .resources
        .push_asset(Texture2D::new(2, "/3D/Texture/wood.png", TextureType::Png));
    let mut coords = Texture2DGroup::new(3, 2);
    coords.tex2coords.push(Tex2Coord::new(0.0, 0.0));
    coords.tex2coords.push(Tex2Coord::new(1.0, 0.5));
    coords.tex2coords.push(Tex2Coord::new(0.25, 1.0));
    model.resources.push_asset(coords);

    let mut stack = SliceStack::new(4, 0.0);
    let mut slice = Slice::new(0.1);
    slice.vertices.push(Vertex2D::new(0.0, 0.0));
    slice.vertices.push(Vertex2D::new(5.0, 0.0));
    slice.vertices.push(Vertex2D::new(0.0, 5.0));
    let mut polygon = SlicePolygon::new(0);
    for v2 in [1, 2, 0] {
        polygon.segments.push(SliceSegment::new(v2));
    }
    slice.polygons.push(polygon);
    stack.slices.push(slice);
    model.resources.push_asset(stack);

    let mut mesh = tetrahedron();
    mesh.triangles[0] = Triangle::with_properties(0, 2, 1, 3, [0, 1, 2]);
    let mut object = Object::with_mesh(5, mesh);
    object.name = "textured".to_string();
    object.pid = Some(1);
    object.pindex = Some(0);
    object.any_attr.push(Box::new(SliceObjectAttr {
        slicestackid: 4,
        ..Default::default()
    }));
    model.resources.objects.push(object);

    let mut lattice = BeamLattice::new(0.5, 0.01);
    lattice.beams.push(Beam::new(0, 1, 0.5));
    let mut tapered = Beam::new(1, 3, 0.8);
    tapered.r2 = 0.3;
    lattice.beams.push(tapered);
    let mut frame = tetrahedron();
    frame.triangles.clear();
    frame.any.push(Box::new(lattice));
    model.resources.objects.push(Object::with_mesh(6, frame));

    model.resources.objects.push(Object::with_components(
        7,
        vec![
            Component::new(5),
            Component::with_transform(6, [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 20.0, 0.0, 0.0]),
        ],
    ));
    model.build.items.push(BuildItem::new(7));
    model
}

#[test]
fn test_write_minimal_model() {
    let mut model = Model::new();
    model.resources.objects.push(Object::with_mesh(1, tetrahedron()));
    model.build.items.push(BuildItem::new(1));

    let data = write(&model);
    assert!(!data.is_empty(), "Written buffer should not be empty");

    let parsed = read(data);
    assert_eq!(parsed, model);
}

#[test]
fn test_roundtrip_rich_model() {
    let model = rich_model();
    let registry = ExtensionRegistry::with_default_extensions();
    assert!(model.validate(&registry).is_ok());

    let first = read(write(&model));
    assert_eq!(first.unit, Unit::Centimeter);
    assert_eq!(first.get_metadata("Designer"), Some("threemf"));
    assert_eq!(first.resources.assets.len(), 4);
    assert_eq!(first.resources.objects.len(), 3);
    assert_eq!(first.attachments, model.attachments);
    assert_eq!(first.resources, model.resources);
    assert_eq!(first.build, model.build);
    assert!(first.validate(&registry).is_ok());

    // Relationships recorded by the first read are written back unchanged
    let second = read(write(&first));
    assert_eq!(second, first);
}

#[test]
fn test_roundtrip_child_documents() {
    let mut model = Model::new();
    let mut child = ChildModel::default();
    let mut part = Object::with_mesh(1, tetrahedron());
    part.any_attr.push(Box::new(ObjectAttr {
        uuid: "3b0b2ee5-8f22-4f1b-9f53-8f1bd1a0c2a1".to_string(),
    }));
    child.resources.objects.push(part);
    model.children.insert("/3D/part.model".to_string(), child);

    let mut component = Component::new(1);
    component.any_attr.push(Box::new(ComponentAttr {
        uuid: "7ac1c0a4-6b42-4a3e-8a4f-0f58a1f31e02".to_string(),
        path: "/3D/part.model".to_string(),
    }));
    let mut assembly = Object::with_components(2, vec![component]);
    assembly.any_attr.push(Box::new(ObjectAttr {
        uuid: "d2b4d3e9-1c5e-4a6f-bf0e-6a4f1f0b7c11".to_string(),
    }));
    model.resources.objects.push(assembly);

    model.build.any_attr.push(Box::new(BuildAttr {
        uuid: "8f4a0b2d-5e7c-4d1a-9b3e-2c6f7a8d9e10".to_string(),
    }));
    let mut item = BuildItem::new(2);
    item.any_attr.push(Box::new(ItemAttr {
        uuid: "c1d2e3f4-a5b6-4c7d-8e9f-0a1b2c3d4e5f".to_string(),
        path: String::new(),
    }));
    model.build.items.push(item);

    let registry = ExtensionRegistry::with_default_extensions();
    assert!(model.validate(&registry).is_ok());

    let first = read(write(&model));
    assert_eq!(first.children.len(), 1);
    assert_eq!(
        first.children["/3D/part.model"].resources,
        model.children["/3D/part.model"].resources
    );
    assert_eq!(first.resources, model.resources);
    assert!(
        first
            .relationships
            .iter()
            .any(|rel| rel.path == "/3D/part.model"),
        "root document should reference its child"
    );
    assert!(first.validate(&registry).is_ok());

    let second = read(write(&first));
    assert_eq!(second, first);
}

#[test]
fn test_sequential_decoding_matches_parallel() {
    let mut model = rich_model();
    for path in ["/3D/a.model", "/3D/b.model", "/3D/c.model"] {
        let mut child = ChildModel::default();
        child.resources.objects.push(Object::with_mesh(1, tetrahedron()));
        model.children.insert(path.to_string(), child);
    }
    let data = write(&model);

    let parallel = read(data.clone());
    let config = ParserConfig::new().with_parallel(false);
    let (sequential, diagnostics) =
        Model::from_reader_with_config(Cursor::new(data), config).unwrap();
    assert!(diagnostics.is_empty());
    assert_eq!(sequential, parallel);
    assert_eq!(
        parallel.children.keys().collect::<Vec<_>>(),
        vec!["/3D/a.model", "/3D/b.model", "/3D/c.model"]
    );
}

#[test]
fn test_write_to_file() {
    let model = rich_model();
    let registry = ExtensionRegistry::with_default_extensions();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rich.3mf");
    model.write_to_file(&path, &registry).unwrap();

    let file = std::fs::File::open(&path).unwrap();
    let (parsed, diagnostics) = Model::from_reader(file).unwrap();
    assert!(diagnostics.is_empty());
    assert_eq!(parsed.resources, model.resources);
}

#[test]
fn test_written_package_layout() {
    let data = write(&rich_model());
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    for expected in [
        "[Content_Types].xml",
        "_rels/.rels",
        "3D/3dmodel.model",
        "3D/_rels/3dmodel.model.rels",
        "3D/Texture/wood.png",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing {}", expected);
    }

    let mut content_types = String::new();
    std::io::Read::read_to_string(
        &mut archive.by_name("[Content_Types].xml").unwrap(),
        &mut content_types,
    )
    .unwrap();
    assert!(content_types.contains(r#"Extension="png" ContentType="image/png""#));
}

#[test]
fn test_write_fails_for_unregistered_extension() {
    let model = rich_model();
    let registry = ExtensionRegistry::new();
    assert!(model.to_writer(Cursor::new(Vec::new()), &registry).is_err());
}
