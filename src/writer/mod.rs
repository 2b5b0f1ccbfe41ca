//! XML writing for 3MF model files
//!
//! This module serializes a [`Model`] back into 3MF documents. Core entities are
//! written here and in `core`; assets and extension payloads write themselves
//! through [`XmlEncoder`], which qualifies their names with the prefix chosen
//! for their namespace.

pub(crate) mod beam_lattice;
pub(crate) mod core;
pub(crate) mod material;
mod package;
pub(crate) mod slice;

pub use package::write_package;

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write as IoWrite;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::debug;

use crate::error::{Error, Result};
use crate::extension::{ExtensionDecl, ExtensionRegistry, XmlAttr};
use crate::model::{
    AnyAttr, AnyElement, Build, CORE_NAMESPACE, Color, MetadataEntry, Model, Resources, Transform,
};

/// Streaming XML writer with namespace-aware element naming
///
/// Created by the document writer with a prefix for every namespace the
/// document uses; extensions call [`qualified`](Self::qualified) to name their
/// elements.
pub struct XmlEncoder {
    writer: Writer<Vec<u8>>,
    /// Prefix per namespace URI
    prefixes: BTreeMap<String, String>,
}

impl XmlEncoder {
    fn new(prefixes: BTreeMap<String, String>) -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
            prefixes,
        }
    }

    fn into_inner(self) -> Vec<u8> {
        self.writer.into_inner()
    }

    /// `local` qualified with the prefix of `namespace`
    ///
    /// Core names and unqualified attribute names are returned unprefixed.
    pub fn qualified(&self, namespace: &str, local: &str) -> Result<String> {
        if namespace.is_empty() || namespace == CORE_NAMESPACE {
            return Ok(local.to_string());
        }
        match self.prefixes.get(namespace) {
            Some(prefix) => Ok(format!("{}:{}", prefix, local)),
            None => Err(Error::Unsupported(format!(
                "namespace '{}' has no prefix",
                namespace
            ))),
        }
    }

    /// Start tag named `local` in `namespace`
    pub fn element(&self, namespace: &str, local: &str) -> Result<BytesStart<'static>> {
        Ok(BytesStart::new(self.qualified(namespace, local)?))
    }

    pub fn write_event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::xml_write(format!("Failed to write XML event: {}", e)))
    }

    pub fn start(&mut self, elem: BytesStart<'_>) -> Result<()> {
        self.write_event(Event::Start(elem))
    }

    pub fn empty(&mut self, elem: BytesStart<'_>) -> Result<()> {
        self.write_event(Event::Empty(elem))
    }

    /// End tag for a start tag written by [`start`](Self::start)
    pub fn end(&mut self, elem: &BytesStart<'_>) -> Result<()> {
        let name = String::from_utf8_lossy(elem.name().as_ref()).into_owned();
        self.write_event(Event::End(BytesEnd::new(name)))
    }

    pub fn text(&mut self, text: &str) -> Result<()> {
        self.write_event(Event::Text(BytesText::new(text)))
    }

    /// Append a namespaced attribute to `elem`
    pub fn push_attr(&self, elem: &mut BytesStart<'_>, attr: &XmlAttr) -> Result<()> {
        let name = self.qualified(&attr.name.space, &attr.name.local)?;
        elem.push_attribute((name.as_str(), attr.value.as_str()));
        Ok(())
    }

    /// Append the attributes of every payload in `attrs`
    pub fn push_any_attr(&self, elem: &mut BytesStart<'_>, attrs: &AnyAttr) -> Result<()> {
        for payload in attrs.iter() {
            for attr in payload.marshal_attrs() {
                self.push_attr(elem, &attr)?;
            }
        }
        Ok(())
    }

    /// Let every payload in `any` write its elements
    pub fn write_any_elements(&mut self, any: &AnyElement) -> Result<()> {
        for payload in any.iter() {
            payload.marshal(self)?;
        }
        Ok(())
    }
}

/// `#RRGGBBAA`
pub(crate) fn format_color(color: Color) -> String {
    format!(
        "#{:02X}{:02X}{:02X}{:02X}",
        color.0, color.1, color.2, color.3
    )
}

pub(crate) fn format_transform(transform: &Transform) -> String {
    format_list(transform.iter())
}

/// Space-separated values
pub(crate) fn format_list<T: ToString>(values: impl Iterator<Item = T>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

/// Namespaces used by the payloads and assets of one document
pub(crate) fn used_namespaces(resources: &Resources, build: Option<&Build>) -> BTreeSet<String> {
    fn add_attrs(attrs: &AnyAttr, used: &mut BTreeSet<String>) {
        for payload in attrs.iter() {
            used.insert(payload.namespace().to_string());
        }
    }

    let mut used = BTreeSet::new();
    for asset in &resources.assets {
        used.insert(asset.namespace().to_string());
    }
    for object in &resources.objects {
        add_attrs(&object.any_attr, &mut used);
        if let Some(mesh) = &object.mesh {
            add_attrs(&mesh.any_attr, &mut used);
            for payload in mesh.any.iter() {
                used.insert(payload.namespace().to_string());
            }
        }
        for component in &object.components {
            add_attrs(&component.any_attr, &mut used);
        }
    }
    if let Some(build) = build {
        add_attrs(&build.any_attr, &mut used);
        for item in &build.items {
            add_attrs(&item.any_attr, &mut used);
        }
    }
    used.remove(CORE_NAMESPACE);
    used
}

/// Declarations to write: the model's own, plus one per used namespace
///
/// Used namespaces the model does not declare take their prefix from the
/// registry; a namespace known to neither cannot be written.
fn declarations(
    model: &Model,
    used: BTreeSet<String>,
    registry: &ExtensionRegistry,
) -> Result<Vec<ExtensionDecl>> {
    let mut decls: BTreeMap<String, ExtensionDecl> = model
        .extensions
        .iter()
        .filter(|(namespace, _)| namespace.as_str() != CORE_NAMESPACE)
        .map(|(namespace, decl)| (namespace.clone(), decl.clone()))
        .collect();
    for namespace in used {
        if decls.contains_key(&namespace) {
            continue;
        }
        match registry.get(&namespace) {
            Some(handler) => {
                decls.insert(namespace, ExtensionDecl::from_handler(handler.as_ref()));
            }
            None => {
                return Err(Error::Unsupported(format!(
                    "no prefix known for namespace '{}'",
                    namespace
                )));
            }
        }
    }
    Ok(decls.into_values().collect())
}

fn write_metadata(x: &mut XmlEncoder, entry: &MetadataEntry) -> Result<()> {
    let mut elem = BytesStart::new("metadata");
    elem.push_attribute(("name", entry.name.as_str()));
    if let Some(meta_type) = &entry.meta_type {
        elem.push_attribute(("type", meta_type.as_str()));
    }
    if let Some(preserve) = entry.preserve {
        elem.push_attribute(("preserve", if preserve { "1" } else { "0" }));
    }
    if entry.value.is_empty() {
        return x.empty(elem);
    }
    x.start(elem.borrow())?;
    x.text(&entry.value)?;
    x.end(&elem)
}

/// Write a `<metadatagroup>` if there are entries
pub(crate) fn write_metadata_group(x: &mut XmlEncoder, metadata: &[MetadataEntry]) -> Result<()> {
    if metadata.is_empty() {
        return Ok(());
    }
    let elem = BytesStart::new("metadatagroup");
    x.start(elem.borrow())?;
    for entry in metadata {
        write_metadata(x, entry)?;
    }
    x.end(&elem)
}

fn write_resources(x: &mut XmlEncoder, resources: &Resources) -> Result<()> {
    let elem = BytesStart::new("resources");
    x.start(elem.borrow())?;
    for asset in &resources.assets {
        asset.marshal(x)?;
    }
    for object in &resources.objects {
        core::write_object(x, object)?;
    }
    x.end(&elem)
}

/// The root document of a model, or a child document
enum Document<'a> {
    Root,
    Child(&'a Resources),
}

fn write_document<W: IoWrite>(
    model: &Model,
    document: Document<'_>,
    registry: &ExtensionRegistry,
    mut writer: W,
) -> Result<()> {
    let (resources, build) = match document {
        Document::Root => (&model.resources, Some(&model.build)),
        Document::Child(resources) => (resources, None),
    };
    let decls = declarations(model, used_namespaces(resources, build), registry)?;
    let prefixes = decls
        .iter()
        .map(|decl| (decl.namespace.clone(), decl.local_name.clone()))
        .collect();
    let mut x = XmlEncoder::new(prefixes);

    x.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut model_elem = BytesStart::new("model");
    model_elem.push_attribute(("unit", model.unit.as_str()));
    if !model.language.is_empty() {
        model_elem.push_attribute(("xml:lang", model.language.as_str()));
    }
    model_elem.push_attribute(("xmlns", CORE_NAMESPACE));
    for decl in &decls {
        let name = format!("xmlns:{}", decl.local_name);
        model_elem.push_attribute((name.as_str(), decl.namespace.as_str()));
    }
    let required: Vec<&str> = decls
        .iter()
        .filter(|decl| decl.is_required)
        .map(|decl| decl.local_name.as_str())
        .collect();
    if !required.is_empty() {
        model_elem.push_attribute(("requiredextensions", required.join(" ").as_str()));
    }
    if build.is_some() && !model.thumbnail.is_empty() {
        model_elem.push_attribute(("thumbnail", model.thumbnail.as_str()));
    }
    x.start(model_elem.borrow())?;

    if let Some(build) = build {
        for entry in &model.metadata {
            write_metadata(&mut x, entry)?;
        }
        write_resources(&mut x, resources)?;
        core::write_build(&mut x, build)?;
    } else {
        write_resources(&mut x, resources)?;
    }

    x.end(&model_elem)?;
    writer.write_all(&x.into_inner())?;
    Ok(())
}

/// Write the root document of a model to XML
///
/// Serializes a Model struct to 3MF-compliant XML.
/// This generates the 3dmodel.model file content.
pub fn write_model_xml<W: IoWrite>(
    model: &Model,
    registry: &ExtensionRegistry,
    writer: W,
) -> Result<()> {
    write_document(model, Document::Root, registry, writer)
}

/// Write the child document at `path` to XML
pub fn write_child_xml<W: IoWrite>(
    model: &Model,
    path: &str,
    registry: &ExtensionRegistry,
    writer: W,
) -> Result<()> {
    let child = model
        .children
        .get(path)
        .ok_or_else(|| Error::MissingFile(path.to_string()))?;
    write_document(model, Document::Child(&child.resources), registry, writer)
}

/// Encode the root document into a buffer
pub fn encode_part(model: &Model, registry: &ExtensionRegistry) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_model_xml(model, registry, &mut buffer)?;
    debug!(path = model.path_or_default(), bytes = buffer.len(), "encoded model part");
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        BaseMaterial, BaseMaterialGroup, BuildItem, ChildModel, Mesh, Object, Triangle, Vertex,
    };

    #[test]
    fn test_write_minimal_model() {
        let model = Model::new();
        let registry = ExtensionRegistry::new();

        let xml = String::from_utf8(encode_part(&model, &registry).unwrap()).unwrap();
        assert!(xml.contains("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<model"));
        assert!(xml.contains("unit=\"millimeter\""));
        assert!(xml.contains("<resources"));
        assert!(xml.contains("<build"));
        assert!(!xml.contains("requiredextensions"));
    }

    #[test]
    fn test_write_model_with_metadata() {
        let mut model = Model::new();
        model.metadata.push(MetadataEntry::new("Title", "Test & Model"));
        model.metadata.push(MetadataEntry::new("Designer", "threemf"));

        let xml = String::from_utf8(encode_part(&model, &ExtensionRegistry::new()).unwrap())
            .unwrap();
        assert!(xml.contains("<metadata name=\"Title\">Test &amp; Model</metadata>"));
        assert!(xml.contains("<metadata name=\"Designer\">threemf</metadata>"));
    }

    #[test]
    fn test_write_model_with_simple_mesh() {
        let mut model = Model::new();

        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::new(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::new(10.5, 0.0, 0.0));
        mesh.vertices.push(Vertex::new(5.0, 10.0, 0.0));
        mesh.triangles.push(Triangle::with_properties(0, 1, 2, 5, [0, 0, 0]));

        let mut group = BaseMaterialGroup::new(5);
        group
            .materials
            .push(BaseMaterial::new("Red Plastic", (255, 0, 0, 255)));
        model.resources.push_asset(group);
        model.resources.objects.push(Object::with_mesh(1, mesh));
        model.build.items.push(BuildItem::new(1));

        let xml = String::from_utf8(encode_part(&model, &ExtensionRegistry::new()).unwrap())
            .unwrap();
        assert!(xml.contains("<basematerials id=\"5\">"));
        assert!(xml.contains("displaycolor=\"#FF0000FF\""));
        assert!(xml.contains("<object id=\"1\">"));
        assert!(xml.contains("<vertex x=\"10.5\" y=\"0\" z=\"0\"/>"));
        assert!(xml.contains("v1=\"0\" v2=\"1\" v3=\"2\" pid=\"5\" p1=\"0\" p2=\"0\" p3=\"0\""));
        assert!(xml.contains("<item objectid=\"1\"/>"));
    }

    #[test]
    fn test_unknown_namespace_is_unsupported() {
        let mut model = Model::new();
        model.resources.push_asset(crate::model::ColorGroup::new(1));

        let err = encode_part(&model, &ExtensionRegistry::new()).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));

        let registry = ExtensionRegistry::with_default_extensions();
        let xml = String::from_utf8(encode_part(&model, &registry).unwrap()).unwrap();
        assert!(xml.contains(
            "xmlns:m=\"http://schemas.microsoft.com/3dmanufacturing/material/2015/02\""
        ));
        assert!(xml.contains("<m:colorgroup id=\"1\"/>"));
    }

    #[test]
    fn test_declared_prefix_and_required_extensions() {
        let mut model = Model::new();
        model.add_extension(ExtensionDecl::new(
            crate::model::MATERIAL_NAMESPACE,
            "mat",
            true,
        ));
        model.add_extension(ExtensionDecl::new("urn:vendor:ext", "v", false));
        model.resources.push_asset(crate::model::ColorGroup::new(1));

        let xml = String::from_utf8(encode_part(&model, &ExtensionRegistry::new()).unwrap())
            .unwrap();
        assert!(xml.contains("xmlns:v=\"urn:vendor:ext\""));
        assert!(xml.contains("requiredextensions=\"mat\""));
        assert!(xml.contains("<mat:colorgroup"));
    }

    #[test]
    fn test_write_child_document() {
        let mut model = Model::new();
        model.metadata.push(MetadataEntry::new("Title", "root only"));
        let mut child = ChildModel::default();
        child.resources.objects.push(Object::with_mesh(3, Mesh::new()));
        model.children.insert("/3D/other.model".to_string(), child);

        let mut buffer = Vec::new();
        write_child_xml(&model, "/3D/other.model", &ExtensionRegistry::new(), &mut buffer)
            .unwrap();
        let xml = String::from_utf8(buffer).unwrap();
        assert!(xml.contains("<object id=\"3\">"));
        assert!(!xml.contains("<build"));
        assert!(!xml.contains("root only"));

        assert!(
            write_child_xml(&model, "/3D/none.model", &ExtensionRegistry::new(), Vec::new())
                .is_err()
        );
    }
}
