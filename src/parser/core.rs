//! Decoders for the core 3MF vocabulary

use std::mem;

use tracing::warn;

use crate::error::{Diagnostics, DiagnosticsResult, ModelError, Segment};
use crate::extension::{ExtensionDecl, NodeMut, XmlAttr, XmlName};
use crate::model::{
    BaseMaterial, BaseMaterialGroup, Build, BuildItem, CORE_NAMESPACE, Component, Mesh,
    MetadataEntry, Model, Object, ObjectType, Resources, Triangle, Unit, Vertex,
};

use super::{
    DecodeContext, ElementDecoder, XML_NAMESPACE, XMLNS_NAMESPACE, parse_attr, parse_bool,
    parse_color, parse_enum_attr, parse_opt_attr, parse_transform,
};

fn is_core(name: &XmlName, local: &str) -> bool {
    name.is(CORE_NAMESPACE, local)
}

/// Owner of the model while a document is decoded; parent of `<model>`
pub(crate) struct TopLevelDecoder {
    model: Model,
}

impl TopLevelDecoder {
    pub(crate) fn new(model: Model) -> Self {
        Self { model }
    }

    pub(crate) fn into_model(self) -> Model {
        self.model
    }
}

impl ElementDecoder for TopLevelDecoder {
    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_core(name, "model") {
            Some(Box::new(ModelDecoder::default()))
        } else {
            None
        }
    }

    fn node(&mut self) -> NodeMut<'_> {
        NodeMut::Model(&mut self.model)
    }
}

#[derive(Default)]
struct ModelDecoder {
    model: Model,
}

impl ModelDecoder {
    fn require(&mut self, ctx: &DecodeContext<'_>, prefix: &str, errs: &mut Diagnostics) {
        let decl = self
            .model
            .extensions
            .values_mut()
            .find(|decl| decl.local_name == prefix);
        let Some(decl) = decl else {
            warn!(prefix, "requiredextensions names an undeclared prefix");
            errs.add(ModelError::RequiredExtension(prefix.to_string()));
            return;
        };
        decl.is_required = true;
        if !ctx.registry.contains(&decl.namespace) {
            warn!(namespace = %decl.namespace, "required extension is not supported");
            errs.add(ModelError::RequiredExtension(decl.namespace.clone()));
        }
    }
}

impl ElementDecoder for ModelDecoder {
    fn start(
        &mut self,
        ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        if let NodeMut::Model(model) = parent.node() {
            self.model = mem::take(model);
        }
        let mut errs = Diagnostics::new();
        let mut required = None;
        for attr in attrs {
            let name = &attr.name;
            if name.space == XMLNS_NAMESPACE {
                if !name.local.is_empty() && attr.value != CORE_NAMESPACE {
                    self.model
                        .add_extension(ExtensionDecl::new(&attr.value, &name.local, false));
                }
            } else if name.space.is_empty() {
                match name.local.as_str() {
                    "unit" => {
                        self.model.unit = parse_enum_attr(attr, false, &mut errs, Unit::parse)
                    }
                    "thumbnail" => self.model.thumbnail = attr.value.clone(),
                    "requiredextensions" => required = Some(attr.value.as_str()),
                    _ => {}
                }
            } else if name.is(XML_NAMESPACE, "lang") {
                self.model.language = attr.value.clone();
            } else {
                errs.merge(ctx.decode_attribute(NodeMut::Model(&mut self.model), attr));
            }
        }
        if let Some(required) = required {
            for prefix in required.split_whitespace() {
                self.require(ctx, prefix, &mut errs);
            }
        }
        errs.into_result()
    }

    fn child(&mut self, ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if name.space != CORE_NAMESPACE {
            return ctx.extension_decoder(NodeMut::Model(&mut self.model), name);
        }
        match name.local.as_str() {
            "resources" => Some(Box::new(ResourcesDecoder::default())),
            "build" if ctx.is_root => Some(Box::new(BuildDecoder::default())),
            "metadata" if ctx.is_root => {
                Some(Box::new(MetadataDecoder::new(self.model.metadata.len())))
            }
            _ => None,
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let NodeMut::Model(model) = parent.node() {
            *model = mem::take(&mut self.model);
        }
        Ok(())
    }

    fn node(&mut self) -> NodeMut<'_> {
        NodeMut::Model(&mut self.model)
    }
}

#[derive(Default)]
struct ResourcesDecoder {
    resources: Resources,
}

impl ElementDecoder for ResourcesDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        _attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        if let NodeMut::Model(model) = parent.node() {
            self.resources = mem::take(&mut model.resources);
        }
        Ok(())
    }

    fn child(&mut self, ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if name.space != CORE_NAMESPACE {
            return ctx.extension_decoder(NodeMut::Resources(&mut self.resources), name);
        }
        match name.local.as_str() {
            "object" => Some(Box::new(ObjectDecoder::new(self.resources.objects.len()))),
            "basematerials" => Some(Box::new(BaseMaterialsDecoder::new(
                self.resources.assets.len(),
            ))),
            _ => None,
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let NodeMut::Model(model) = parent.node() {
            model.resources = mem::take(&mut self.resources);
        }
        Ok(())
    }

    fn node(&mut self) -> NodeMut<'_> {
        NodeMut::Resources(&mut self.resources)
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::named("Resources"))
    }
}

struct BaseMaterialsDecoder {
    group: BaseMaterialGroup,
    index: usize,
}

impl BaseMaterialsDecoder {
    fn new(index: usize) -> Self {
        Self {
            group: BaseMaterialGroup::default(),
            index,
        }
    }
}

impl ElementDecoder for BaseMaterialsDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        for attr in attrs {
            if attr.name.space.is_empty() && attr.name.local == "id" {
                self.group.id = parse_attr(attr, true, &mut errs);
            }
        }
        errs.into_result()
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_core(name, "base") {
            Some(Box::new(BaseDecoder {
                index: self.group.materials.len(),
            }))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let NodeMut::Resources(resources) = parent.node() {
            resources.push_asset(mem::take(&mut self.group));
        }
        Ok(())
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("BaseMaterials", self.index))
    }
}

struct BaseDecoder {
    index: usize,
}

impl ElementDecoder for BaseDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        let mut material = BaseMaterial::new("", (0, 0, 0, 0));
        for attr in attrs {
            if !attr.name.space.is_empty() {
                continue;
            }
            match attr.name.local.as_str() {
                "name" => material.name = attr.value.clone(),
                "displaycolor" => {
                    material.displaycolor =
                        parse_enum_attr(attr, true, &mut errs, parse_color)
                }
                _ => {}
            }
        }
        if let Some(group) = parent.as_any_mut().downcast_mut::<BaseMaterialsDecoder>() {
            group.group.materials.push(material);
        }
        errs.into_result()
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Base", self.index))
    }
}

struct ObjectDecoder {
    object: Object,
    index: usize,
}

impl ObjectDecoder {
    fn new(index: usize) -> Self {
        Self {
            object: Object::default(),
            index,
        }
    }
}

impl ElementDecoder for ObjectDecoder {
    fn start(
        &mut self,
        ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        for attr in attrs {
            if !attr.name.space.is_empty() {
                errs.merge(ctx.decode_attribute(NodeMut::Object(&mut self.object), attr));
                continue;
            }
            let object = &mut self.object;
            match attr.name.local.as_str() {
                "id" => object.id = parse_attr(attr, true, &mut errs),
                "name" => object.name = attr.value.clone(),
                "partnumber" => object.partnumber = attr.value.clone(),
                "thumbnail" => object.thumbnail = attr.value.clone(),
                "pid" => object.pid = parse_opt_attr(attr, false, &mut errs),
                "pindex" => object.pindex = parse_opt_attr(attr, false, &mut errs),
                "type" => {
                    object.object_type = parse_enum_attr(attr, false, &mut errs, ObjectType::parse)
                }
                _ => {}
            }
        }
        errs.into_result()
    }

    fn child(&mut self, ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if name.space != CORE_NAMESPACE {
            return ctx.extension_decoder(NodeMut::Object(&mut self.object), name);
        }
        match name.local.as_str() {
            "mesh" => Some(Box::new(MeshDecoder::default())),
            "components" => Some(Box::new(ComponentsDecoder::default())),
            "metadatagroup" => Some(Box::new(MetadataGroupDecoder::default())),
            _ => None,
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let NodeMut::Resources(resources) = parent.node() {
            resources.objects.push(mem::take(&mut self.object));
        }
        Ok(())
    }

    fn node(&mut self) -> NodeMut<'_> {
        NodeMut::Object(&mut self.object)
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Object", self.index))
    }
}

#[derive(Default)]
struct MeshDecoder {
    mesh: Mesh,
}

impl ElementDecoder for MeshDecoder {
    fn start(
        &mut self,
        ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        for attr in attrs.iter().filter(|a| !a.name.space.is_empty()) {
            errs.merge(ctx.decode_attribute(NodeMut::Mesh(&mut self.mesh), attr));
        }
        errs.into_result()
    }

    fn child(&mut self, ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if name.space != CORE_NAMESPACE {
            return ctx.extension_decoder(NodeMut::Mesh(&mut self.mesh), name);
        }
        match name.local.as_str() {
            "vertices" => Some(Box::new(VerticesDecoder::default())),
            "triangles" => Some(Box::new(TrianglesDecoder::default())),
            _ => None,
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let NodeMut::Object(object) = parent.node() {
            object.mesh = Some(mem::take(&mut self.mesh));
        }
        Ok(())
    }

    fn node(&mut self) -> NodeMut<'_> {
        NodeMut::Mesh(&mut self.mesh)
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::named("Mesh"))
    }
}

#[derive(Default)]
struct VerticesDecoder {
    vertices: Vec<Vertex>,
}

impl ElementDecoder for VerticesDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        _attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        if let NodeMut::Mesh(mesh) = parent.node() {
            self.vertices = mem::take(&mut mesh.vertices);
        }
        Ok(())
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_core(name, "vertex") {
            Some(Box::new(VertexDecoder {
                index: self.vertices.len(),
            }))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let NodeMut::Mesh(mesh) = parent.node() {
            mesh.vertices = mem::take(&mut self.vertices);
        }
        Ok(())
    }
}

struct VertexDecoder {
    index: usize,
}

impl ElementDecoder for VertexDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        let mut vertex = Vertex::default();
        for attr in attrs.iter().filter(|a| a.name.space.is_empty()) {
            match attr.name.local.as_str() {
                "x" => vertex.x = parse_attr(attr, true, &mut errs),
                "y" => vertex.y = parse_attr(attr, true, &mut errs),
                "z" => vertex.z = parse_attr(attr, true, &mut errs),
                _ => {}
            }
        }
        if let Some(vertices) = parent.as_any_mut().downcast_mut::<VerticesDecoder>() {
            vertices.vertices.push(vertex);
        }
        errs.into_result()
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Vertex", self.index))
    }
}

#[derive(Default)]
struct TrianglesDecoder {
    triangles: Vec<Triangle>,
}

impl ElementDecoder for TrianglesDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        _attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        if let NodeMut::Mesh(mesh) = parent.node() {
            self.triangles = mem::take(&mut mesh.triangles);
        }
        Ok(())
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_core(name, "triangle") {
            Some(Box::new(TriangleDecoder {
                index: self.triangles.len(),
            }))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let NodeMut::Mesh(mesh) = parent.node() {
            mesh.triangles = mem::take(&mut self.triangles);
        }
        Ok(())
    }
}

struct TriangleDecoder {
    index: usize,
}

impl ElementDecoder for TriangleDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        let mut triangle = Triangle::default();
        for attr in attrs.iter().filter(|a| a.name.space.is_empty()) {
            match attr.name.local.as_str() {
                "v1" => triangle.v1 = parse_attr(attr, true, &mut errs),
                "v2" => triangle.v2 = parse_attr(attr, true, &mut errs),
                "v3" => triangle.v3 = parse_attr(attr, true, &mut errs),
                "pid" => triangle.pid = parse_opt_attr(attr, false, &mut errs),
                "p1" => triangle.p1 = parse_opt_attr(attr, false, &mut errs),
                "p2" => triangle.p2 = parse_opt_attr(attr, false, &mut errs),
                "p3" => triangle.p3 = parse_opt_attr(attr, false, &mut errs),
                _ => {}
            }
        }
        if let Some(triangles) = parent.as_any_mut().downcast_mut::<TrianglesDecoder>() {
            triangles.triangles.push(triangle);
        }
        errs.into_result()
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Triangle", self.index))
    }
}

#[derive(Default)]
struct ComponentsDecoder {
    components: Vec<Component>,
}

impl ElementDecoder for ComponentsDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        _attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        if let NodeMut::Object(object) = parent.node() {
            self.components = mem::take(&mut object.components);
        }
        Ok(())
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_core(name, "component") {
            Some(Box::new(ComponentDecoder {
                index: self.components.len(),
            }))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let NodeMut::Object(object) = parent.node() {
            object.components = mem::take(&mut self.components);
        }
        Ok(())
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::named("Components"))
    }
}

struct ComponentDecoder {
    index: usize,
}

impl ElementDecoder for ComponentDecoder {
    fn start(
        &mut self,
        ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        let mut component = Component::default();
        for attr in attrs {
            if !attr.name.space.is_empty() {
                errs.merge(ctx.decode_attribute(NodeMut::Component(&mut component), attr));
                continue;
            }
            match attr.name.local.as_str() {
                "objectid" => component.objectid = parse_attr(attr, true, &mut errs),
                "transform" => {
                    component.transform = parse_transform_attr(attr, &mut errs);
                }
                _ => {}
            }
        }
        if let Some(components) = parent.as_any_mut().downcast_mut::<ComponentsDecoder>() {
            components.components.push(component);
        }
        errs.into_result()
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Component", self.index))
    }
}

fn parse_transform_attr(attr: &XmlAttr, errs: &mut Diagnostics) -> Option<[f64; 12]> {
    let transform = parse_transform(&attr.value);
    if transform.is_none() {
        errs.add(ModelError::parse_attr("transform", false));
    }
    transform
}

#[derive(Default)]
struct BuildDecoder {
    build: Build,
}

impl ElementDecoder for BuildDecoder {
    fn start(
        &mut self,
        ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        if let NodeMut::Model(model) = parent.node() {
            self.build = mem::take(&mut model.build);
        }
        let mut errs = Diagnostics::new();
        for attr in attrs.iter().filter(|a| !a.name.space.is_empty()) {
            errs.merge(ctx.decode_attribute(NodeMut::Build(&mut self.build), attr));
        }
        errs.into_result()
    }

    fn child(&mut self, ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_core(name, "item") {
            Some(Box::new(ItemDecoder::new(self.build.items.len())))
        } else {
            ctx.extension_decoder(NodeMut::Build(&mut self.build), name)
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let NodeMut::Model(model) = parent.node() {
            model.build = mem::take(&mut self.build);
        }
        Ok(())
    }

    fn node(&mut self) -> NodeMut<'_> {
        NodeMut::Build(&mut self.build)
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::named("Build"))
    }
}

struct ItemDecoder {
    item: BuildItem,
    index: usize,
}

impl ItemDecoder {
    fn new(index: usize) -> Self {
        Self {
            item: BuildItem::default(),
            index,
        }
    }
}

impl ElementDecoder for ItemDecoder {
    fn start(
        &mut self,
        ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        for attr in attrs {
            if !attr.name.space.is_empty() {
                errs.merge(ctx.decode_attribute(NodeMut::Item(&mut self.item), attr));
                continue;
            }
            match attr.name.local.as_str() {
                "objectid" => self.item.objectid = parse_attr(attr, true, &mut errs),
                "transform" => self.item.transform = parse_transform_attr(attr, &mut errs),
                "partnumber" => self.item.partnumber = attr.value.clone(),
                _ => {}
            }
        }
        errs.into_result()
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_core(name, "metadatagroup") {
            Some(Box::new(MetadataGroupDecoder::default()))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let NodeMut::Build(build) = parent.node() {
            build.items.push(mem::take(&mut self.item));
        }
        Ok(())
    }

    fn node(&mut self) -> NodeMut<'_> {
        NodeMut::Item(&mut self.item)
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Item", self.index))
    }
}

/// `<metadatagroup>` of an object or build item
#[derive(Default)]
struct MetadataGroupDecoder {
    metadata: Vec<MetadataEntry>,
}

impl ElementDecoder for MetadataGroupDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        _attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        match parent.node() {
            NodeMut::Object(object) => self.metadata = mem::take(&mut object.metadata),
            NodeMut::Item(item) => self.metadata = mem::take(&mut item.metadata),
            _ => {}
        }
        Ok(())
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_core(name, "metadata") {
            Some(Box::new(MetadataDecoder::new(self.metadata.len())))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        match parent.node() {
            NodeMut::Object(object) => object.metadata = mem::take(&mut self.metadata),
            NodeMut::Item(item) => item.metadata = mem::take(&mut self.metadata),
            _ => {}
        }
        Ok(())
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::named("MetadataGroup"))
    }
}

struct MetadataDecoder {
    entry: MetadataEntry,
    index: usize,
}

impl MetadataDecoder {
    fn new(index: usize) -> Self {
        Self {
            entry: MetadataEntry::default(),
            index,
        }
    }
}

impl ElementDecoder for MetadataDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        for attr in attrs.iter().filter(|a| a.name.space.is_empty()) {
            match attr.name.local.as_str() {
                "name" => self.entry.name = attr.value.clone(),
                "type" => self.entry.meta_type = Some(attr.value.clone()),
                "preserve" => {
                    self.entry.preserve = parse_bool(&attr.value);
                    if self.entry.preserve.is_none() {
                        errs.add(ModelError::parse_attr("preserve", false));
                    }
                }
                _ => {}
            }
        }
        errs.into_result()
    }

    fn text(&mut self, text: &str) {
        self.entry.value.push_str(text);
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        let mut entry = mem::take(&mut self.entry);
        let trimmed = entry.value.trim();
        if trimmed.len() != entry.value.len() {
            entry.value = trimmed.to_string();
        }
        if let NodeMut::Model(model) = parent.node() {
            model.metadata.push(entry);
        } else if let Some(group) = parent.as_any_mut().downcast_mut::<MetadataGroupDecoder>() {
            group.metadata.push(entry);
        }
        Ok(())
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Metadata", self.index))
    }
}
