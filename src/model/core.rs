//! Core 3MF types and structures

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::error::Result;
use crate::extension::ExtensionDecl;
use crate::writer::XmlEncoder;

use super::any::{AnyAttr, AnyElement, AsAny, boxed_slice_eq};

/// Namespace of the 3MF core
pub const CORE_NAMESPACE: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";
/// Namespace of the Materials & Properties extension
pub const MATERIAL_NAMESPACE: &str =
    "http://schemas.microsoft.com/3dmanufacturing/material/2015/02";
/// Namespace of the Production extension
pub const PRODUCTION_NAMESPACE: &str =
    "http://schemas.microsoft.com/3dmanufacturing/production/2015/06";
/// Namespace of the Slice extension
pub const SLICE_NAMESPACE: &str = "http://schemas.microsoft.com/3dmanufacturing/slice/2015/07";
/// Namespace of the Beam Lattice extension
pub const BEAM_LATTICE_NAMESPACE: &str =
    "http://schemas.microsoft.com/3dmanufacturing/beamlattice/2017/02";

/// Path of the root document when a model does not name one
pub const DEFAULT_MODEL_PATH: &str = "/3D/3dmodel.model";

/// 3MF extensions bundled with this crate
///
/// Third-party extensions are not listed here; they are identified by their
/// namespace string alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    /// Core 3MF (always required)
    Core,
    /// Materials & Properties Extension
    Material,
    /// Production Extension
    Production,
    /// Slice Extension
    Slice,
    /// Beam Lattice Extension
    BeamLattice,
}

impl Extension {
    /// Get the namespace URI for this extension
    pub fn namespace(&self) -> &'static str {
        match self {
            Extension::Core => CORE_NAMESPACE,
            Extension::Material => MATERIAL_NAMESPACE,
            Extension::Production => PRODUCTION_NAMESPACE,
            Extension::Slice => SLICE_NAMESPACE,
            Extension::BeamLattice => BEAM_LATTICE_NAMESPACE,
        }
    }

    /// Get extension from namespace URI
    pub fn from_namespace(namespace: &str) -> Option<Self> {
        match namespace {
            CORE_NAMESPACE => Some(Extension::Core),
            MATERIAL_NAMESPACE => Some(Extension::Material),
            PRODUCTION_NAMESPACE => Some(Extension::Production),
            SLICE_NAMESPACE => Some(Extension::Slice),
            BEAM_LATTICE_NAMESPACE => Some(Extension::BeamLattice),
            _ => None,
        }
    }

    /// Conventional XML prefix for this extension
    pub fn prefix(&self) -> &'static str {
        match self {
            Extension::Core => "",
            Extension::Material => "m",
            Extension::Production => "p",
            Extension::Slice => "s",
            Extension::BeamLattice => "b",
        }
    }
}

/// 4x3 affine transformation, 12 values in row-major order
///
/// Format: `[m00 m01 m02 m10 m11 m12 m20 m21 m22 tx ty tz]`
pub type Transform = [f64; 12];

/// RGBA color, one byte per channel
pub type Color = (u8, u8, u8, u8);

/// Unit of measurement of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    Micron,
    #[default]
    Millimeter,
    Centimeter,
    Inch,
    Foot,
    Meter,
}

impl Unit {
    /// Parse the XML spelling of a unit
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "micron" => Some(Unit::Micron),
            "millimeter" => Some(Unit::Millimeter),
            "centimeter" => Some(Unit::Centimeter),
            "inch" => Some(Unit::Inch),
            "foot" => Some(Unit::Foot),
            "meter" => Some(Unit::Meter),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Micron => "micron",
            Unit::Millimeter => "millimeter",
            Unit::Centimeter => "centimeter",
            Unit::Inch => "inch",
            Unit::Foot => "foot",
            Unit::Meter => "meter",
        }
    }
}

/// Type of 3D object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectType {
    /// A standard model object
    #[default]
    Model,
    /// Other types
    Other,
    /// A support structure
    Support,
    /// A solid support structure
    SolidSupport,
    /// A surface object
    Surface,
}

impl ObjectType {
    /// Parse the XML spelling of an object type
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "model" => Some(ObjectType::Model),
            "other" => Some(ObjectType::Other),
            "support" => Some(ObjectType::Support),
            "solidsupport" => Some(ObjectType::SolidSupport),
            "surface" => Some(ObjectType::Surface),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Model => "model",
            ObjectType::Other => "other",
            ObjectType::Support => "support",
            ObjectType::SolidSupport => "solidsupport",
            ObjectType::Surface => "surface",
        }
    }
}

/// A resource identified by a document-unique numeric ID
///
/// Assets form an open set: base material groups are the core kind, every
/// extension contributes its own. Concrete types are recovered through
/// `asset.as_any().downcast_ref::<T>()`.
pub trait Asset: AsAny + Debug + Send + Sync {
    /// Resource ID, unique within the owning document
    fn id(&self) -> u32;

    /// Kind name, used as the diagnostic path segment
    fn kind(&self) -> &'static str;

    /// Namespace that owns this kind of asset
    fn namespace(&self) -> &str;

    /// Number of addressable properties, for assets that are property groups
    fn property_count(&self) -> Option<usize> {
        None
    }

    /// Write this asset as a child of `<resources>`
    fn marshal(&self, x: &mut XmlEncoder) -> Result<()>;
}

/// A vertex in 3D space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Vertex {
    /// Create a new vertex
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A triangle defined by three vertex indices
///
/// Property attributes are kept exactly as written. An absent `pid` means the
/// object default applies; absent `p2`/`p3` mean "same as `p1`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Triangle {
    /// Index of first vertex
    pub v1: u32,
    /// Index of second vertex
    pub v2: u32,
    /// Index of third vertex
    pub v3: u32,
    /// Property group ID
    pub pid: Option<u32>,
    /// Property index for vertex 1
    pub p1: Option<u32>,
    /// Property index for vertex 2
    pub p2: Option<u32>,
    /// Property index for vertex 3
    pub p3: Option<u32>,
}

impl Triangle {
    /// Create a new triangle without properties
    pub fn new(v1: u32, v2: u32, v3: u32) -> Self {
        Self {
            v1,
            v2,
            v3,
            ..Default::default()
        }
    }

    /// Create a new triangle with a property group and per-corner indices
    pub fn with_properties(v1: u32, v2: u32, v3: u32, pid: u32, p: [u32; 3]) -> Self {
        Self {
            v1,
            v2,
            v3,
            pid: Some(pid),
            p1: Some(p[0]),
            p2: Some(p[1]),
            p3: Some(p[2]),
        }
    }

    pub fn indices(&self) -> [u32; 3] {
        [self.v1, self.v2, self.v3]
    }

    /// Per-corner property indices with the `p2`/`p3` defaults applied
    pub fn property_indices(&self) -> Option<[u32; 3]> {
        self.p1.map(|p1| [p1, self.p2.unwrap_or(p1), self.p3.unwrap_or(p1)])
    }
}

/// A 3D mesh containing vertices and triangles
#[derive(Debug, Default, PartialEq)]
pub struct Mesh {
    /// List of vertices
    pub vertices: Vec<Vertex>,
    /// List of triangles
    pub triangles: Vec<Triangle>,
    /// Extension attributes on `<mesh>`
    pub any_attr: AnyAttr,
    /// Extension elements inside `<mesh>`, such as beam lattices
    pub any: AnyElement,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new mesh with pre-allocated capacity
    ///
    /// This is useful for performance when the number of vertices and triangles
    /// is known in advance, as it avoids multiple reallocations.
    pub fn with_capacity(vertices: usize, triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            triangles: Vec::with_capacity(triangles),
            ..Default::default()
        }
    }
}

/// A component that references another object with optional transformation
///
/// The referenced object lives in the current document unless an extension
/// attribute supplies another document path (see [`Component::object_path`]).
#[derive(Debug, Default, PartialEq)]
pub struct Component {
    /// ID of the referenced object
    pub objectid: u32,
    /// Optional 4x3 transformation matrix
    pub transform: Option<Transform>,
    /// Extension attributes on `<component>`
    pub any_attr: AnyAttr,
}

impl Component {
    /// Create a new component with the given object reference
    pub fn new(objectid: u32) -> Self {
        Self {
            objectid,
            ..Default::default()
        }
    }

    /// Create a new component with a transformation matrix
    pub fn with_transform(objectid: u32, transform: Transform) -> Self {
        Self {
            objectid,
            transform: Some(transform),
            ..Default::default()
        }
    }

    /// Document holding the referenced object, or `default` when no extension says
    pub fn object_path<'a>(&'a self, default: &'a str) -> &'a str {
        self.any_attr.object_path().unwrap_or(default)
    }
}

/// A 3D object that is either a mesh or an assembly of components
#[derive(Debug, Default, PartialEq)]
pub struct Object {
    /// Object ID
    pub id: u32,
    /// Object name
    pub name: String,
    /// Part number
    pub partnumber: String,
    /// Thumbnail part path
    pub thumbnail: String,
    /// Type of object
    pub object_type: ObjectType,
    /// Default property group ID
    pub pid: Option<u32>,
    /// Default property index within `pid`
    pub pindex: Option<u32>,
    /// Metadata entries from `<metadatagroup>`
    pub metadata: Vec<MetadataEntry>,
    /// Mesh data, for mesh objects
    pub mesh: Option<Mesh>,
    /// Components, for assemblies
    pub components: Vec<Component>,
    /// Extension attributes on `<object>`
    pub any_attr: AnyAttr,
}

impl Object {
    /// Create a new object
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Create a new mesh object
    pub fn with_mesh(id: u32, mesh: Mesh) -> Self {
        Self {
            id,
            mesh: Some(mesh),
            ..Default::default()
        }
    }

    /// Create a new assembly object
    pub fn with_components(id: u32, components: Vec<Component>) -> Self {
        Self {
            id,
            components,
            ..Default::default()
        }
    }
}

/// A single base material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseMaterial {
    /// Material name
    pub name: String,
    /// Display color
    pub displaycolor: Color,
}

impl BaseMaterial {
    pub fn new(name: impl Into<String>, displaycolor: Color) -> Self {
        Self {
            name: name.into(),
            displaycolor,
        }
    }
}

/// Group of base materials, the core property group
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BaseMaterialGroup {
    /// Resource ID
    pub id: u32,
    /// Materials addressed by property index
    pub materials: Vec<BaseMaterial>,
}

impl BaseMaterialGroup {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            materials: Vec::new(),
        }
    }
}

impl Asset for BaseMaterialGroup {
    fn id(&self) -> u32 {
        self.id
    }

    fn kind(&self) -> &'static str {
        "BaseMaterials"
    }

    fn namespace(&self) -> &str {
        CORE_NAMESPACE
    }

    fn property_count(&self) -> Option<usize> {
        Some(self.materials.len())
    }

    fn marshal(&self, x: &mut XmlEncoder) -> Result<()> {
        crate::writer::core::write_base_materials(x, self)
    }
}

/// Resources of one document: assets and objects, each in document order
#[derive(Debug, Default)]
pub struct Resources {
    /// Property groups and extension resources
    pub assets: Vec<Box<dyn Asset>>,
    /// Objects
    pub objects: Vec<Object>,
}

impl Resources {
    /// Create a new empty resources section
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowest positive ID not used by any asset or object
    ///
    /// IDs are collected together with 0 and sorted; the first position whose value
    /// differs from the position is free. With no gap the result is one past the
    /// largest ID.
    pub fn unused_id(&self) -> u32 {
        let mut ids: Vec<u32> = std::iter::once(0)
            .chain(self.assets.iter().map(|a| a.id()))
            .chain(self.objects.iter().map(|o| o.id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        for (expected, id) in (0u32..).zip(ids.iter().copied()) {
            if expected != id {
                return expected;
            }
        }
        ids.last().map_or(1, |last| last.saturating_add(1))
    }

    /// Asset with the given ID
    pub fn find_asset(&self, id: u32) -> Option<&dyn Asset> {
        self.assets.iter().find(|a| a.id() == id).map(|a| a.as_ref())
    }

    /// Object with the given ID
    pub fn find_object(&self, id: u32) -> Option<&Object> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Asset with the given ID, if it is a `T`
    pub fn find<T: Asset>(&self, id: u32) -> Option<&T> {
        self.find_asset(id)
            .and_then(|a| a.as_any().downcast_ref::<T>())
    }

    /// Append an asset
    pub fn push_asset(&mut self, asset: impl Asset) {
        self.assets.push(Box::new(asset));
    }
}

impl PartialEq for Resources {
    fn eq(&self, other: &Self) -> bool {
        boxed_slice_eq(&self.assets, &other.assets) && self.objects == other.objects
    }
}

/// An item to be built, referencing an object
#[derive(Debug, Default, PartialEq)]
pub struct BuildItem {
    /// Reference to object ID
    pub objectid: u32,
    /// Optional transformation matrix
    pub transform: Option<Transform>,
    /// Part number
    pub partnumber: String,
    /// Metadata entries from `<metadatagroup>`
    pub metadata: Vec<MetadataEntry>,
    /// Extension attributes on `<item>`
    pub any_attr: AnyAttr,
}

impl BuildItem {
    /// Create a new build item
    pub fn new(objectid: u32) -> Self {
        Self {
            objectid,
            ..Default::default()
        }
    }

    /// Document holding the referenced object, or `default` when no extension says
    pub fn object_path<'a>(&'a self, default: &'a str) -> &'a str {
        self.any_attr.object_path().unwrap_or(default)
    }
}

/// Build section specifying which objects to manufacture
#[derive(Debug, Default, PartialEq)]
pub struct Build {
    /// List of items to build
    pub items: Vec<BuildItem>,
    /// Extension attributes on `<build>`
    pub any_attr: AnyAttr,
}

impl Build {
    /// Create a new empty build section
    pub fn new() -> Self {
        Self::default()
    }
}

/// Metadata entry
///
/// Metadata elements contain a required `name` attribute and text content value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataEntry {
    /// Name of the metadata entry, possibly prefixed
    pub name: String,
    /// Value of the metadata entry
    pub value: String,
    /// Declared value type
    pub meta_type: Option<String>,
    /// Preservation flag
    pub preserve: Option<bool>,
}

impl MetadataEntry {
    /// Create a new metadata entry
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Default::default()
        }
    }
}

/// A raw package part carried alongside the model, e.g. a texture
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attachment {
    /// Absolute part name, e.g. `/3D/Texture/wood.png`
    pub path: String,
    /// MIME content type
    pub content_type: String,
    pub data: Vec<u8>,
}

/// An OPC relationship from a part to another part
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Relationship {
    /// Absolute target part name
    pub path: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Relationship identifier, unique within its source part
    pub id: String,
}

/// Resources and relationships of a non-root document
#[derive(Debug, Default, PartialEq)]
pub struct ChildModel {
    pub resources: Resources,
    pub relationships: Vec<Relationship>,
}

/// Complete 3MF model: the root document plus its child documents
#[derive(Debug, Default, PartialEq)]
pub struct Model {
    /// Path of the root document; empty means [`DEFAULT_MODEL_PATH`]
    pub path: String,
    /// Unit of measurement
    pub unit: Unit,
    /// Language tag (`xml:lang`)
    pub language: String,
    /// Thumbnail part path of the model
    pub thumbnail: String,
    /// Extensions declared by the root document, keyed by namespace
    pub extensions: BTreeMap<String, ExtensionDecl>,
    /// Metadata entries
    pub metadata: Vec<MetadataEntry>,
    /// Resources of the root document
    pub resources: Resources,
    /// Items to manufacture
    pub build: Build,
    /// Non-model parts carried with the package
    pub attachments: Vec<Attachment>,
    /// Child documents keyed by absolute part name
    pub children: BTreeMap<String, ChildModel>,
    /// Package-level relationships other than the start part
    pub root_relationships: Vec<Relationship>,
    /// Relationships of the root document
    pub relationships: Vec<Relationship>,
}

impl Model {
    /// Create a new empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the root document, applying the default
    pub fn path_or_default(&self) -> &str {
        if self.path.is_empty() {
            DEFAULT_MODEL_PATH
        } else {
            &self.path
        }
    }

    /// Whether `path` names the root document
    pub fn is_root_path(&self, path: &str) -> bool {
        path.is_empty() || path == self.path_or_default()
    }

    /// Declare an extension, replacing any previous declaration of its namespace
    pub fn add_extension(&mut self, decl: ExtensionDecl) {
        self.extensions.insert(decl.namespace.clone(), decl);
    }

    /// Resources of the document at `path`
    pub fn find_resources(&self, path: &str) -> Option<&Resources> {
        if self.is_root_path(path) {
            Some(&self.resources)
        } else {
            self.children.get(path).map(|child| &child.resources)
        }
    }

    /// Asset `id` of the document at `path`
    pub fn find_asset(&self, path: &str, id: u32) -> Option<&dyn Asset> {
        self.find_resources(path).and_then(|r| r.find_asset(id))
    }

    /// Object `id` of the document at `path`
    pub fn find_object(&self, path: &str, id: u32) -> Option<&Object> {
        self.find_resources(path).and_then(|r| r.find_object(id))
    }

    /// Get metadata value by name
    pub fn get_metadata(&self, name: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value.as_str())
    }
}
