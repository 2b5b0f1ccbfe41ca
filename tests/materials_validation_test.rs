//! Validation of Materials & Properties resources through the public API

use threemf::model::{MATERIAL_NAMESPACE, TextureType};
use threemf::{
    Attachment, BaseMaterial, BaseMaterialGroup, BlendMethod, ChildModel, ColorGroup, Composite,
    CompositeMaterials, ExtensionDecl, ExtensionRegistry, Model, Multi, MultiProperties,
    Tex2Coord, Texture2D, Texture2DGroup,
};

fn materials_model() -> Model {
    let mut model = Model::new();
    model.add_extension(ExtensionDecl::new(MATERIAL_NAMESPACE, "m", false));
    model
}

fn validate(model: &Model) -> Vec<String> {
    model
        .validate(&ExtensionRegistry::with_default_extensions())
        .expect_err("validation should fail")
        .messages()
}

fn base_materials(id: u32) -> BaseMaterialGroup {
    let mut group = BaseMaterialGroup::new(id);
    group.materials.push(BaseMaterial::new("a", (1, 0, 0, 0)));
    group.materials.push(BaseMaterial::new("b", (0, 1, 0, 0)));
    group
}

fn composite(id: u32, matid: u32, matindices: Vec<u32>) -> CompositeMaterials {
    let mut group = CompositeMaterials::new(id, matid, matindices);
    group.composites.push(Composite::new(vec![1.0, 2.0]));
    group
}

fn multi(id: u32, pids: Vec<u32>, pindices: Vec<u32>) -> MultiProperties {
    let mut group = MultiProperties::new(id, pids);
    group.multis.push(Multi::new(pindices));
    group
}

fn colors(id: u32, colors: Vec<(u8, u8, u8, u8)>) -> ColorGroup {
    let mut group = ColorGroup::new(id);
    group.colors = colors;
    group
}

fn texture_group(id: u32, texid: u32) -> Texture2DGroup {
    let mut group = Texture2DGroup::new(id, texid);
    group.tex2coords.push(Tex2Coord::new(0.0, 0.0));
    group
}

#[test]
fn test_child_documents() {
    let mut model = materials_model();
    let mut other = ChildModel::default();
    other.resources.push_asset(ColorGroup::new(1));
    model.children.insert("/other.model".to_string(), other);
    let mut that = ChildModel::default();
    that.resources.push_asset(MultiProperties::new(2, Vec::new()));
    model.children.insert("/that.model".to_string(), that);

    assert_eq!(
        validate(&model),
        vec![
            "/other.model@Resources@ColorGroup#0: resource properties must not be empty",
            "/that.model@Resources@MultiProperties#0: required field 'pids' is missing",
            "/that.model@Resources@MultiProperties#0: there must be one fewer blend method than pids",
            "/that.model@Resources@MultiProperties#0: resource properties must not be empty",
        ]
    );
}

#[test]
fn test_multi_properties() {
    let mut model = materials_model();
    let resources = &mut model.resources;
    resources.push_asset(MultiProperties::new(4, Vec::new()));
    resources.push_asset(multi(5, vec![4, 100], Vec::new()));
    resources.push_asset(base_materials(1));
    resources.push_asset(colors(6, vec![(1, 0, 0, 0), (2, 3, 4, 5)]));
    resources.push_asset(composite(3, 1, vec![0, 1]));
    resources.push_asset(multi(2, vec![1, 6], vec![1, 0]));
    resources.push_asset(multi(7, vec![1, 6], vec![1, 3]));
    resources.push_asset(multi(8, vec![6, 1, 6], Vec::new()));
    resources.push_asset(multi(9, vec![1, 3], Vec::new()));

    assert_eq!(
        validate(&model),
        vec![
            "Resources@MultiProperties#0: required field 'pids' is missing",
            "Resources@MultiProperties#0: there must be one fewer blend method than pids",
            "Resources@MultiProperties#0: resource properties must not be empty",
            "Resources@MultiProperties#1: multiproperties must not reference another multiproperties",
            "Resources@MultiProperties#1: referenced resource does not exist",
            "Resources@MultiProperties#6@Multi#0: index is out of bounds",
            "Resources@MultiProperties#7: base materials or composite materials may only appear as the first pid",
            "Resources@MultiProperties#7: multiproperties may reference at most one color group",
            "Resources@MultiProperties#8: base materials or composite materials may only appear as the first pid",
        ]
    );
}

#[test]
fn test_blend_methods_count() {
    let blended = |blendmethods: Vec<BlendMethod>| {
        let mut model = materials_model();
        model.resources.push_asset(base_materials(1));
        model.resources.push_asset(colors(2, vec![(255, 0, 0, 255)]));
        let mut group = multi(3, vec![1, 2], vec![1, 0]);
        group.blendmethods = blendmethods;
        model.resources.push_asset(group);
        model
    };

    assert_eq!(
        validate(&blended(vec![BlendMethod::Mix, BlendMethod::Multiply])),
        vec!["Resources@MultiProperties#2: there must be one fewer blend method than pids"]
    );
    let registry = ExtensionRegistry::with_default_extensions();
    assert!(blended(vec![BlendMethod::Multiply]).validate(&registry).is_ok());
    assert!(blended(Vec::new()).validate(&registry).is_ok());
}

#[test]
fn test_missing_texture_part() {
    let mut model = materials_model();
    model.resources.push_asset(Texture2D {
        id: 1,
        ..Default::default()
    });
    model
        .resources
        .push_asset(Texture2D::new(2, "/a.png", TextureType::Png));

    assert_eq!(
        validate(&model),
        vec![
            "Resources@Texture2D#0: required field 'path' is missing",
            "Resources@Texture2D#0: required field 'contenttype' is missing",
            "Resources@Texture2D#1: texture path must reference an attached package part",
        ]
    );
}

#[test]
fn test_texture_groups() {
    let mut model = materials_model();
    model.attachments.push(Attachment {
        path: "/a.png".to_string(),
        ..Default::default()
    });
    let resources = &mut model.resources;
    resources.push_asset(Texture2D::new(1, "/A.png", TextureType::Png));
    resources.push_asset(Texture2DGroup::new(2, 0));
    resources.push_asset(texture_group(3, 1));
    resources.push_asset(texture_group(4, 2));
    resources.push_asset(texture_group(5, 100));

    assert_eq!(
        validate(&model),
        vec![
            "Resources@Texture2DGroup#1: required field 'texid' is missing",
            "Resources@Texture2DGroup#1: resource properties must not be empty",
            "Resources@Texture2DGroup#3: texid must reference a texture2d resource",
            "Resources@Texture2DGroup#4: texid must reference a texture2d resource",
        ]
    );
}

#[test]
fn test_color_groups() {
    let mut model = materials_model();
    let resources = &mut model.resources;
    resources.push_asset(ColorGroup::new(1));
    resources.push_asset(colors(2, vec![(1, 0, 0, 0), (2, 3, 4, 5)]));
    resources.push_asset(colors(3, vec![(1, 0, 0, 0), (0, 0, 0, 0)]));

    assert_eq!(
        validate(&model),
        vec![
            "Resources@ColorGroup#0: resource properties must not be empty",
            "Resources@ColorGroup#2@RGBA#1: required field 'color' is missing",
        ]
    );
}

#[test]
fn test_composite_materials() {
    let mut model = materials_model();
    let resources = &mut model.resources;
    resources.push_asset(base_materials(1));
    resources.push_asset(CompositeMaterials::new(2, 0, Vec::new()));
    resources.push_asset(composite(3, 1, vec![0, 1]));
    resources.push_asset(composite(4, 1, vec![100, 100]));
    resources.push_asset(composite(5, 2, vec![0, 1]));
    resources.push_asset(composite(6, 100, vec![0, 1]));

    assert_eq!(
        validate(&model),
        vec![
            "Resources@CompositeMaterials#1: required field 'matid' is missing",
            "Resources@CompositeMaterials#1: required field 'matindices' is missing",
            "Resources@CompositeMaterials#1: resource properties must not be empty",
            "Resources@CompositeMaterials#3: index is out of bounds",
            "Resources@CompositeMaterials#4: matid must reference a base materials group",
            "Resources@CompositeMaterials#5: referenced resource does not exist",
        ]
    );
}

#[test]
fn test_valid_materials_pass() {
    let mut model = materials_model();
    model.attachments.push(Attachment {
        path: "/3D/Texture/a.png".to_string(),
        content_type: "image/png".to_string(),
        data: vec![0x89, b'P', b'N', b'G'],
    });
    let resources = &mut model.resources;
    resources.push_asset(base_materials(1));
    resources.push_asset(colors(2, vec![(255, 0, 0, 255)]));
    resources.push_asset(Texture2D::new(3, "/3D/Texture/a.png", TextureType::Png));
    resources.push_asset(texture_group(4, 3));
    resources.push_asset(composite(5, 1, vec![0, 1]));
    resources.push_asset(multi(6, vec![1, 2], vec![1, 0]));

    let result = model.validate(&ExtensionRegistry::with_default_extensions());
    assert!(result.is_ok(), "{:?}", result.err().map(|e| e.messages()));
}
