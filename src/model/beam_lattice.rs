//! Beam Lattice extension types

use thiserror::Error;

use crate::error::Result;
use crate::writer::XmlEncoder;

use super::any::ElementMarshaler;
use super::core::BEAM_LATTICE_NAMESPACE;

/// Causes reported by the beam lattice decoder and validator
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeamLatticeError {
    #[error("a beam lattice may only be added to objects of type model or solidsupport")]
    LatticeObjType,
    #[error("a clipping mesh is required when the clipping mode is not none")]
    LatticeClippedNoMesh,
    #[error("clipping and representation meshes must be model meshes without a beam lattice")]
    LatticeInvalidMesh,
    #[error("a beam must connect two distinct vertices")]
    LatticeSameVertex,
    #[error("r2 must not be defined if r1 is not defined")]
    LatticeBeamR2,
}

/// Cap mode for beam lattice ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeamCapMode {
    /// Sphere cap (rounded ends)
    #[default]
    Sphere,
    /// Hemisphere cap (half sphere at end)
    Hemisphere,
    /// Butt cap (flat ends)
    Butt,
}

impl BeamCapMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sphere" => Some(BeamCapMode::Sphere),
            "hemisphere" => Some(BeamCapMode::Hemisphere),
            "butt" => Some(BeamCapMode::Butt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BeamCapMode::Sphere => "sphere",
            BeamCapMode::Hemisphere => "hemisphere",
            BeamCapMode::Butt => "butt",
        }
    }
}

/// How the lattice is clipped by its clipping mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipMode {
    #[default]
    None,
    Inside,
    Outside,
}

impl ClipMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(ClipMode::None),
            "inside" => Some(ClipMode::Inside),
            "outside" => Some(ClipMode::Outside),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClipMode::None => "none",
            ClipMode::Inside => "inside",
            ClipMode::Outside => "outside",
        }
    }
}

/// A single beam in a beam lattice structure
///
/// Radii and caps are stored resolved: values the document omits are filled from
/// the lattice defaults while decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beam {
    /// Index of the first vertex
    pub v1: u32,
    /// Index of the second vertex
    pub v2: u32,
    /// Radius at the first vertex
    pub r1: f64,
    /// Radius at the second vertex
    pub r2: f64,
    /// Cap at the first vertex
    pub cap1: BeamCapMode,
    /// Cap at the second vertex
    pub cap2: BeamCapMode,
}

impl Beam {
    /// Create a beam with uniform radius and sphere caps
    pub fn new(v1: u32, v2: u32, radius: f64) -> Self {
        Self {
            v1,
            v2,
            r1: radius,
            r2: radius,
            cap1: BeamCapMode::Sphere,
            cap2: BeamCapMode::Sphere,
        }
    }
}

/// Named group of beams
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BeamSet {
    pub name: String,
    pub identifier: String,
    /// Indices into the lattice's beams
    pub refs: Vec<u32>,
}

/// Beam lattice attached to a mesh
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BeamLattice {
    /// Clipping mode
    pub clipping_mode: ClipMode,
    /// Object ID of the clipping mesh
    pub clipping_mesh_id: Option<u32>,
    /// Object ID of the representation mesh
    pub representation_mesh_id: Option<u32>,
    pub beams: Vec<Beam>,
    pub beam_sets: Vec<BeamSet>,
    /// Minimum beam length
    pub min_length: f64,
    /// Default beam radius
    pub radius: f64,
    /// Default cap mode
    pub cap_mode: BeamCapMode,
}

impl BeamLattice {
    /// Create an empty lattice with the given default radius and minimum length
    pub fn new(radius: f64, min_length: f64) -> Self {
        Self {
            radius,
            min_length,
            ..Default::default()
        }
    }
}

impl ElementMarshaler for BeamLattice {
    fn namespace(&self) -> &str {
        BEAM_LATTICE_NAMESPACE
    }

    fn marshal(&self, x: &mut XmlEncoder) -> Result<()> {
        crate::writer::beam_lattice::write_beam_lattice(x, self)
    }
}
