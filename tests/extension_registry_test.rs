//! Tests for the extension registry and for plugging in a custom extension

use std::io::Cursor;
use std::sync::Arc;

use threemf::extension::{ExtensionHandler, ExtensionRegistry, NodeMut, XmlAttr, XmlName};
use threemf::model::{
    Asset, AttrMarshaler, BEAM_LATTICE_NAMESPACE, MATERIAL_NAMESPACE, PRODUCTION_NAMESPACE,
    SLICE_NAMESPACE,
};
use threemf::parser::{DecodeContext, ElementDecoder, push_asset};
use threemf::writer::XmlEncoder;
use threemf::{
    BuildItem, Diagnostics, DiagnosticsResult, Mesh, Model, Object, ParserConfig, Triangle, Vertex,
};

const COLORTAG_NAMESPACE: &str = "urn:example:colortag";

#[derive(Debug, thiserror::Error)]
enum ColorTagError {
    #[error("color tag must not be empty")]
    EmptyTag,
    #[error("palette must have a name")]
    UnnamedPalette,
}

/// Attribute payload: `ct:tag="..."` on objects
#[derive(Debug, Clone, PartialEq)]
struct ColorTag(String);

impl AttrMarshaler for ColorTag {
    fn namespace(&self) -> &str {
        COLORTAG_NAMESPACE
    }

    fn marshal_attrs(&self) -> Vec<XmlAttr> {
        vec![XmlAttr::new(
            XmlName::new(COLORTAG_NAMESPACE, "tag"),
            self.0.clone(),
        )]
    }
}

/// Resource: `<ct:palette id="..." name="..."/>`
#[derive(Debug, Clone, PartialEq, Default)]
struct Palette {
    id: u32,
    name: String,
}

impl Asset for Palette {
    fn id(&self) -> u32 {
        self.id
    }

    fn kind(&self) -> &'static str {
        "Palette"
    }

    fn namespace(&self) -> &str {
        COLORTAG_NAMESPACE
    }

    fn marshal(&self, x: &mut XmlEncoder) -> threemf::Result<()> {
        let mut elem = x.element(COLORTAG_NAMESPACE, "palette")?;
        elem.push_attribute(("id", self.id.to_string().as_str()));
        if !self.name.is_empty() {
            elem.push_attribute(("name", self.name.as_str()));
        }
        x.empty(elem)
    }
}

#[derive(Default)]
struct PaletteDecoder {
    palette: Palette,
}

impl ElementDecoder for PaletteDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        for attr in attrs.iter().filter(|a| a.name.space.is_empty()) {
            match attr.name.local.as_str() {
                "id" => self.palette.id = attr.value.parse().unwrap_or_default(),
                "name" => self.palette.name = attr.value.clone(),
                _ => {}
            }
        }
        Ok(())
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        push_asset(parent, std::mem::take(&mut self.palette));
        Ok(())
    }
}

struct ColorTagHandler;

impl ExtensionHandler for ColorTagHandler {
    fn namespace(&self) -> &str {
        COLORTAG_NAMESPACE
    }

    fn local_name(&self) -> &str {
        "ct"
    }

    fn new_element_decoder(
        &self,
        parent: NodeMut<'_>,
        name: &str,
    ) -> Option<Box<dyn ElementDecoder>> {
        match (parent, name) {
            (NodeMut::Resources(_), "palette") => Some(Box::new(PaletteDecoder::default())),
            _ => None,
        }
    }

    fn decode_attribute(&self, parent: NodeMut<'_>, attr: &XmlAttr) -> DiagnosticsResult {
        if let NodeMut::Object(object) = parent {
            if attr.name.local == "tag" {
                object.any_attr.push(Box::new(ColorTag(attr.value.clone())));
            }
        }
        Ok(())
    }

    fn validate_asset(&self, _model: &Model, _path: &str, asset: &dyn Asset) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        if let Some(palette) = asset.as_any().downcast_ref::<Palette>() {
            if palette.name.is_empty() {
                errs.add(ColorTagError::UnnamedPalette);
            }
        }
        errs.into_result()
    }

    fn validate_object(&self, _model: &Model, _path: &str, object: &Object) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        if object.any_attr.get::<ColorTag>().is_some_and(|tag| tag.0.is_empty()) {
            errs.add(ColorTagError::EmptyTag);
        }
        errs.into_result()
    }
}

fn custom_registry() -> Arc<ExtensionRegistry> {
    let registry = ExtensionRegistry::with_default_extensions();
    registry.register(Arc::new(ColorTagHandler));
    Arc::new(registry)
}

fn triangle_mesh() -> Mesh {
    let mut mesh = Mesh::new();
    mesh.vertices.push(Vertex::new(0.0, 0.0, 0.0));
    mesh.vertices.push(Vertex::new(1.0, 0.0, 0.0));
    mesh.vertices.push(Vertex::new(0.0, 1.0, 0.0));
    mesh.triangles.push(Triangle::new(0, 1, 2));
    mesh
}

#[test]
fn test_default_registry_namespaces() {
    let registry = ExtensionRegistry::with_default_extensions();
    let mut expected = vec![
        BEAM_LATTICE_NAMESPACE.to_string(),
        MATERIAL_NAMESPACE.to_string(),
        PRODUCTION_NAMESPACE.to_string(),
        SLICE_NAMESPACE.to_string(),
    ];
    expected.sort();
    assert_eq!(registry.namespaces(), expected);
    assert_eq!(registry.len(), 4);
    assert!(ExtensionRegistry::new().is_empty());
}

#[test]
#[should_panic]
fn test_duplicate_registration_panics() {
    let registry = ExtensionRegistry::new();
    registry.register(Arc::new(ColorTagHandler));
    registry.register(Arc::new(ColorTagHandler));
}

#[test]
fn test_try_register_reports_duplicates() {
    let registry = ExtensionRegistry::new();
    assert!(registry.try_register(Arc::new(ColorTagHandler)).is_ok());
    assert!(registry.try_register(Arc::new(ColorTagHandler)).is_err());
    assert!(registry.contains(COLORTAG_NAMESPACE));
    assert_eq!(registry.get(COLORTAG_NAMESPACE).unwrap().local_name(), "ct");
}

#[test]
fn test_custom_extension_round_trip() {
    let registry = custom_registry();

    let mut model = Model::new();
    model.resources.push_asset(Palette {
        id: 1,
        name: "warm".to_string(),
    });
    let mut object = Object::with_mesh(2, triangle_mesh());
    object.any_attr.push(Box::new(ColorTag("crimson".to_string())));
    model.resources.objects.push(object);
    model.build.items.push(BuildItem::new(2));
    assert!(model.validate(&registry).is_ok());

    let xml = String::from_utf8(model.encode_part(&registry).unwrap()).unwrap();
    assert!(xml.contains(r#"xmlns:ct="urn:example:colortag""#));
    assert!(xml.contains(r#"<ct:palette id="1" name="warm"/>"#));
    assert!(xml.contains(r#"ct:tag="crimson""#));

    let data = model
        .to_writer(Cursor::new(Vec::new()), &registry)
        .unwrap()
        .into_inner();
    let config = ParserConfig::new().with_registry(registry.clone());
    let (decoded, diagnostics) = Model::from_reader_with_config(Cursor::new(data), config).unwrap();
    assert!(diagnostics.is_empty(), "{}", diagnostics);
    assert_eq!(decoded.resources, model.resources);
    assert_eq!(
        decoded.resources.objects[0].any_attr.get::<ColorTag>(),
        Some(&ColorTag("crimson".to_string()))
    );
}

#[test]
fn test_custom_extension_is_skipped_without_handler() {
    let registry = custom_registry();
    let mut model = Model::new();
    model.resources.push_asset(Palette {
        id: 1,
        name: "warm".to_string(),
    });
    let mut object = Object::with_mesh(2, triangle_mesh());
    object.any_attr.push(Box::new(ColorTag("crimson".to_string())));
    model.resources.objects.push(object);
    let xml = model.encode_part(&registry).unwrap();

    let mut decoded = Model::new();
    let diagnostics = decoded
        .decode_part(
            &xml,
            "/3D/3dmodel.model",
            true,
            &ExtensionRegistry::with_default_extensions(),
        )
        .unwrap();
    assert!(diagnostics.is_empty());
    assert!(decoded.resources.assets.is_empty());
    assert!(decoded.resources.objects[0].any_attr.is_empty());
}

#[test]
fn test_custom_extension_validation() {
    let registry = custom_registry();
    let mut model = Model::new();
    model.resources.push_asset(Palette {
        id: 1,
        ..Default::default()
    });
    let mut object = Object::with_mesh(2, triangle_mesh());
    object.any_attr.push(Box::new(ColorTag(String::new())));
    model.resources.objects.push(object);

    let messages = model.validate(&registry).unwrap_err().messages();
    assert_eq!(
        messages,
        vec![
            "Resources@Palette#0: palette must have a name",
            "Resources@Object#0: color tag must not be empty",
        ]
    );
}

#[test]
fn test_payload_lookup_returns_first_match() {
    let mut object = Object::new(1);
    object.any_attr.push(Box::new(ColorTag("first".to_string())));
    object.any_attr.push(Box::new(ColorTag("second".to_string())));
    assert_eq!(object.any_attr.len(), 2);
    assert_eq!(object.any_attr.get::<ColorTag>().unwrap().0, "first");
}

const GADGET_NAMESPACE: &str = "urn:example:gadget";

/// Resource of an extension whose handler has no validation hooks
#[derive(Debug, Clone, PartialEq, Default)]
struct Gadget {
    id: u32,
}

impl Asset for Gadget {
    fn id(&self) -> u32 {
        self.id
    }

    fn kind(&self) -> &'static str {
        "Gadget"
    }

    fn namespace(&self) -> &str {
        GADGET_NAMESPACE
    }

    fn marshal(&self, x: &mut XmlEncoder) -> threemf::Result<()> {
        let mut elem = x.element(GADGET_NAMESPACE, "gadget")?;
        elem.push_attribute(("id", self.id.to_string().as_str()));
        x.empty(elem)
    }
}

struct GadgetHandler;

impl ExtensionHandler for GadgetHandler {
    fn namespace(&self) -> &str {
        GADGET_NAMESPACE
    }

    fn local_name(&self) -> &str {
        "g"
    }
}

fn model_with_gadget(id: u32) -> Model {
    let mut model = Model::new();
    model.resources.push_asset(Gadget { id });
    model.resources.objects.push(Object::with_mesh(2, triangle_mesh()));
    model.build.items.push(BuildItem::new(2));
    model
}

#[test]
fn test_asset_without_id_is_reported_by_core() {
    let registry = ExtensionRegistry::with_default_extensions();
    registry.register(Arc::new(GadgetHandler));
    let expected = vec!["Resources@Gadget#0: resource id must be a positive integer"];

    let messages = model_with_gadget(0).validate(&registry).unwrap_err().messages();
    assert_eq!(messages, expected);
    assert!(model_with_gadget(1).validate(&registry).is_ok());

    // Reported even when nothing handles the namespace
    let messages = model_with_gadget(0)
        .validate(&ExtensionRegistry::new())
        .unwrap_err()
        .messages();
    assert_eq!(messages, expected);
}

#[test]
fn test_asset_without_id_is_reported_once() {
    let mut model = Model::new();
    let mut colors = threemf::ColorGroup::new(0);
    colors.colors.push((255, 0, 0, 255));
    model.resources.push_asset(colors);

    let messages = model
        .validate(&ExtensionRegistry::with_default_extensions())
        .unwrap_err()
        .messages();
    assert_eq!(
        messages,
        vec!["Resources@ColorGroup#0: resource id must be a positive integer"]
    );
}
