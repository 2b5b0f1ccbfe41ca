//! Slice extension types

use thiserror::Error;

use crate::error::Result;
use crate::extension::{XmlAttr, XmlName};
use crate::writer::XmlEncoder;

use super::any::AttrMarshaler;
use super::core::{Asset, SLICE_NAMESPACE};

/// Causes reported by the slice validator
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceError {
    #[error("a slice stack must contain either slices or slice references")]
    SlicesAndRefs,
    #[error("a slice reference must point into another document")]
    SliceRefSamePart,
    #[error("a referenced slice stack must not contain slice references")]
    SliceRefRef,
    #[error("the referenced resource is not a slice stack")]
    NonSliceStack,
    #[error("the first slice must not be below the bottom of the stack")]
    SmallTopZ,
    #[error("slice heights must increase monotonically")]
    NoMonotonic,
    #[error("a slice with polygons needs at least two vertices")]
    InsufficientVertices,
    #[error("a polygon needs at least one segment")]
    InsufficientSegments,
}

/// A 2D vertex with x, y coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex2D {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Vertex2D {
    /// Create a new 2D vertex
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A segment in a slice polygon
///
/// As with triangles, an absent `p2` means "same as `p1`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SliceSegment {
    /// Second vertex index (first is implied by startv or previous segment)
    pub v2: u32,
    /// Property group ID
    pub pid: Option<u32>,
    pub p1: Option<u32>,
    pub p2: Option<u32>,
}

impl SliceSegment {
    /// Create a new slice segment
    pub fn new(v2: u32) -> Self {
        Self {
            v2,
            ..Default::default()
        }
    }
}

/// A closed polygon of a slice
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SlicePolygon {
    /// Index of the start vertex
    pub startv: u32,
    /// Segments in drawing order
    pub segments: Vec<SliceSegment>,
}

impl SlicePolygon {
    pub fn new(startv: u32) -> Self {
        Self {
            startv,
            segments: Vec::new(),
        }
    }
}

/// One layer of a slice stack
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Slice {
    /// Top Z of the layer
    pub ztop: f64,
    pub vertices: Vec<Vertex2D>,
    pub polygons: Vec<SlicePolygon>,
}

impl Slice {
    pub fn new(ztop: f64) -> Self {
        Self {
            ztop,
            ..Default::default()
        }
    }
}

/// Reference to a slice stack in another document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SliceRef {
    /// ID of the referenced slice stack
    pub slicestackid: u32,
    /// Document holding the referenced slice stack
    pub slicepath: String,
}

impl SliceRef {
    pub fn new(slicestackid: u32, slicepath: impl Into<String>) -> Self {
        Self {
            slicestackid,
            slicepath: slicepath.into(),
        }
    }
}

/// Slice stack resource
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SliceStack {
    /// Resource ID
    pub id: u32,
    /// Bottom Z of the stack
    pub zbottom: f64,
    pub slices: Vec<Slice>,
    pub slice_refs: Vec<SliceRef>,
}

impl SliceStack {
    pub fn new(id: u32, zbottom: f64) -> Self {
        Self {
            id,
            zbottom,
            ..Default::default()
        }
    }
}

impl Asset for SliceStack {
    fn id(&self) -> u32 {
        self.id
    }

    fn kind(&self) -> &'static str {
        "SliceStack"
    }

    fn namespace(&self) -> &str {
        SLICE_NAMESPACE
    }

    fn marshal(&self, x: &mut XmlEncoder) -> Result<()> {
        crate::writer::slice::write_slice_stack(x, self)
    }
}

/// Resolution of the mesh relative to the slices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeshResolution {
    #[default]
    FullRes,
    LowRes,
}

impl MeshResolution {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fullres" => Some(MeshResolution::FullRes),
            "lowres" => Some(MeshResolution::LowRes),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MeshResolution::FullRes => "fullres",
            MeshResolution::LowRes => "lowres",
        }
    }
}

/// `s:slicestackid` and `s:meshresolution` on `<object>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SliceObjectAttr {
    pub slicestackid: u32,
    pub meshresolution: MeshResolution,
}

impl AttrMarshaler for SliceObjectAttr {
    fn namespace(&self) -> &str {
        SLICE_NAMESPACE
    }

    fn marshal_attrs(&self) -> Vec<XmlAttr> {
        let mut attrs = vec![XmlAttr::new(
            XmlName::new(SLICE_NAMESPACE, "slicestackid"),
            self.slicestackid.to_string(),
        )];
        if self.meshresolution != MeshResolution::FullRes {
            attrs.push(XmlAttr::new(
                XmlName::new(SLICE_NAMESPACE, "meshresolution"),
                self.meshresolution.as_str().to_string(),
            ));
        }
        attrs
    }
}
