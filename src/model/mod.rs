//! Data structures representing 3MF models

pub mod any;
pub mod beam_lattice;
mod core;
pub mod material;
pub mod production;
pub mod slice;

// Re-export all public types from core module
pub use self::core::{
    Asset, Attachment, BEAM_LATTICE_NAMESPACE, BaseMaterial, BaseMaterialGroup, Build, BuildItem,
    CORE_NAMESPACE, ChildModel, Color, Component, DEFAULT_MODEL_PATH, Extension,
    MATERIAL_NAMESPACE, Mesh, MetadataEntry, Model, Object, ObjectType, PRODUCTION_NAMESPACE,
    Relationship, Resources, SLICE_NAMESPACE, Transform, Triangle, Unit, Vertex,
};

pub use self::any::{AnyAttr, AnyElement, AsAny, AttrMarshaler, ElementMarshaler};

// Re-export the materials extension types
pub use material::{
    BlendMethod, ColorGroup, Composite, CompositeMaterials, FilterMode, MaterialError, Multi,
    MultiProperties, Tex2Coord, Texture2D, Texture2DGroup, TextureType, TileStyle,
};

// Re-export the slice extension types
pub use slice::{
    MeshResolution, Slice, SliceError, SliceObjectAttr, SlicePolygon, SliceRef, SliceSegment,
    SliceStack, Vertex2D,
};

// Re-export the beam lattice extension types
pub use beam_lattice::{Beam, BeamCapMode, BeamLattice, BeamLatticeError, BeamSet, ClipMode};
