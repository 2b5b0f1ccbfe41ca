//! Materials & Properties extension types

use thiserror::Error;

use crate::error::Result;
use crate::writer::XmlEncoder;
use crate::writer::material as write;

use super::core::{Asset, Color, MATERIAL_NAMESPACE};

/// Causes reported by the materials validator
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialError {
    #[error("texid must reference a texture2d resource")]
    TextureReference,
    #[error("texture path must reference an attached package part")]
    MissingTexturePart,
    #[error("there must be one fewer blend method than pids")]
    MultiBlend,
    #[error("base materials or composite materials may only appear as the first pid")]
    MaterialMulti,
    #[error("multiproperties must not reference another multiproperties")]
    MultiRefMulti,
    #[error("multiproperties may reference at most one color group")]
    MultiColors,
    #[error("matid must reference a base materials group")]
    CompositeBase,
}

/// Color group
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColorGroup {
    /// Color group ID
    pub id: u32,
    /// List of colors in this group
    pub colors: Vec<Color>,
}

impl ColorGroup {
    /// Create a new color group
    pub fn new(id: u32) -> Self {
        Self {
            id,
            colors: Vec::new(),
        }
    }
}

impl Asset for ColorGroup {
    fn id(&self) -> u32 {
        self.id
    }

    fn kind(&self) -> &'static str {
        "ColorGroup"
    }

    fn namespace(&self) -> &str {
        MATERIAL_NAMESPACE
    }

    fn property_count(&self) -> Option<usize> {
        Some(self.colors.len())
    }

    fn marshal(&self, x: &mut XmlEncoder) -> Result<()> {
        write::write_color_group(x, self)
    }
}

/// Image format of a 2D texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureType {
    Png,
    Jpeg,
}

impl TextureType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image/png" => Some(TextureType::Png),
            "image/jpeg" => Some(TextureType::Jpeg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextureType::Png => "image/png",
            TextureType::Jpeg => "image/jpeg",
        }
    }
}

/// Texture wrapping behaviour outside `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileStyle {
    #[default]
    Wrap,
    Mirror,
    Clamp,
    None,
}

impl TileStyle {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wrap" => Some(TileStyle::Wrap),
            "mirror" => Some(TileStyle::Mirror),
            "clamp" => Some(TileStyle::Clamp),
            "none" => Some(TileStyle::None),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TileStyle::Wrap => "wrap",
            TileStyle::Mirror => "mirror",
            TileStyle::Clamp => "clamp",
            TileStyle::None => "none",
        }
    }
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Auto,
    Linear,
    Nearest,
}

impl FilterMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(FilterMode::Auto),
            "linear" => Some(FilterMode::Linear),
            "nearest" => Some(FilterMode::Nearest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Auto => "auto",
            FilterMode::Linear => "linear",
            FilterMode::Nearest => "nearest",
        }
    }
}

/// 2D texture resource
///
/// The image itself is a package attachment addressed by `path`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Texture2D {
    /// Texture ID
    pub id: u32,
    /// Part name of the image
    pub path: String,
    /// Image format; `None` when absent or unrecognized
    pub contenttype: Option<TextureType>,
    /// Tile style in U direction
    pub tilestyleu: TileStyle,
    /// Tile style in V direction
    pub tilestylev: TileStyle,
    /// Filter mode
    pub filter: FilterMode,
}

impl Texture2D {
    pub fn new(id: u32, path: impl Into<String>, contenttype: TextureType) -> Self {
        Self {
            id,
            path: path.into(),
            contenttype: Some(contenttype),
            ..Default::default()
        }
    }
}

impl Asset for Texture2D {
    fn id(&self) -> u32 {
        self.id
    }

    fn kind(&self) -> &'static str {
        "Texture2D"
    }

    fn namespace(&self) -> &str {
        MATERIAL_NAMESPACE
    }

    fn marshal(&self, x: &mut XmlEncoder) -> Result<()> {
        write::write_texture2d(x, self)
    }
}

/// Texture coordinate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tex2Coord {
    /// U coordinate
    pub u: f32,
    /// V coordinate
    pub v: f32,
}

impl Tex2Coord {
    pub fn new(u: f32, v: f32) -> Self {
        Self { u, v }
    }
}

/// Group of texture coordinates into one texture
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Texture2DGroup {
    /// Group ID
    pub id: u32,
    /// ID of the referenced [`Texture2D`]
    pub texid: u32,
    /// Coordinates addressed by property index
    pub tex2coords: Vec<Tex2Coord>,
}

impl Texture2DGroup {
    pub fn new(id: u32, texid: u32) -> Self {
        Self {
            id,
            texid,
            tex2coords: Vec::new(),
        }
    }
}

impl Asset for Texture2DGroup {
    fn id(&self) -> u32 {
        self.id
    }

    fn kind(&self) -> &'static str {
        "Texture2DGroup"
    }

    fn namespace(&self) -> &str {
        MATERIAL_NAMESPACE
    }

    fn property_count(&self) -> Option<usize> {
        Some(self.tex2coords.len())
    }

    fn marshal(&self, x: &mut XmlEncoder) -> Result<()> {
        write::write_texture2d_group(x, self)
    }
}

/// Mixing ratios of one composite
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composite {
    /// One value per entry of `matindices`
    pub values: Vec<f32>,
}

impl Composite {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// Composite materials mixing entries of one base materials group
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositeMaterials {
    /// Group ID
    pub id: u32,
    /// ID of the base materials group being mixed
    pub matid: u32,
    /// Indices into the base materials group
    pub matindices: Vec<u32>,
    /// Composites addressed by property index
    pub composites: Vec<Composite>,
}

impl CompositeMaterials {
    pub fn new(id: u32, matid: u32, matindices: Vec<u32>) -> Self {
        Self {
            id,
            matid,
            matindices,
            composites: Vec::new(),
        }
    }
}

impl Asset for CompositeMaterials {
    fn id(&self) -> u32 {
        self.id
    }

    fn kind(&self) -> &'static str {
        "CompositeMaterials"
    }

    fn namespace(&self) -> &str {
        MATERIAL_NAMESPACE
    }

    fn property_count(&self) -> Option<usize> {
        Some(self.composites.len())
    }

    fn marshal(&self, x: &mut XmlEncoder) -> Result<()> {
        write::write_composite_materials(x, self)
    }
}

/// Blend method for multi-properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMethod {
    /// Linear mix interpolation
    #[default]
    Mix,
    /// Multiplicative blending
    Multiply,
}

impl BlendMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mix" => Some(BlendMethod::Mix),
            "multiply" => Some(BlendMethod::Multiply),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlendMethod::Mix => "mix",
            BlendMethod::Multiply => "multiply",
        }
    }
}

/// Multi element combining multiple property indices
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Multi {
    /// Property indices corresponding to pids in parent group
    pub pindices: Vec<u32>,
}

impl Multi {
    /// Create a new multi element
    pub fn new(pindices: Vec<u32>) -> Self {
        Self { pindices }
    }
}

/// Multi-properties group
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultiProperties {
    /// Multi-properties group ID
    pub id: u32,
    /// Property group IDs to layer and blend
    pub pids: Vec<u32>,
    /// Blend methods between consecutive layers
    pub blendmethods: Vec<BlendMethod>,
    /// List of multi elements
    pub multis: Vec<Multi>,
}

impl MultiProperties {
    /// Create a new multi-properties group
    pub fn new(id: u32, pids: Vec<u32>) -> Self {
        Self {
            id,
            pids,
            blendmethods: Vec::new(),
            multis: Vec::new(),
        }
    }
}

impl Asset for MultiProperties {
    fn id(&self) -> u32 {
        self.id
    }

    fn kind(&self) -> &'static str {
        "MultiProperties"
    }

    fn namespace(&self) -> &str {
        MATERIAL_NAMESPACE
    }

    fn property_count(&self) -> Option<usize> {
        Some(self.multis.len())
    }

    fn marshal(&self, x: &mut XmlEncoder) -> Result<()> {
        write::write_multi_properties(x, self)
    }
}
