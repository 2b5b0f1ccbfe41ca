//! # threemf
//!
//! An extensible implementation of the 3MF (3D Manufacturing Format) file format.
//!
//! A 3MF file is a ZIP-based container following the Open Packaging Conventions
//! (OPC), holding one root model document, optional child documents and
//! attachments such as textures.
//!
//! ## Features
//!
//! - Streaming decoding of model documents with positioned, non-fatal diagnostics
//! - Encoding back to XML and to complete packages
//! - Validation of core rules and extension rules, reported all at once
//! - An open extension registry: Materials & Properties, Production, Slice and
//!   Beam Lattice are bundled, other namespaces can be plugged in
//!
//! ## Example
//!
//! ```no_run
//! use std::fs::File;
//! use threemf::Model;
//! use threemf::extension::ExtensionRegistry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("model.3mf")?;
//! let (model, diagnostics) = Model::from_reader(file)?;
//! for diagnostic in &diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//!
//! println!("Model contains {} objects", model.resources.objects.len());
//! model.validate(&ExtensionRegistry::with_default_extensions())?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod extension;
pub mod extensions;
pub mod mesh_builder;
pub mod model;
pub mod opc;
pub mod parser;
mod validator;
pub mod writer;

pub use error::{Diagnostic, Diagnostics, DiagnosticsResult, Error, ModelError, Result, Segment};
pub use extension::{ExtensionDecl, ExtensionHandler, ExtensionRegistry};
pub use mesh_builder::MeshBuilder;
pub use model::{
    Asset, Attachment, BaseMaterial, BaseMaterialGroup, Beam, BeamCapMode, BeamLattice, BeamSet,
    BlendMethod, Build, BuildItem, ChildModel, ClipMode, ColorGroup, Component, Composite,
    CompositeMaterials, FilterMode, MetadataEntry, Mesh, Model, Multi, MultiProperties, Object,
    ObjectType, Relationship, Resources, Slice, SliceStack, Tex2Coord, Texture2D, Texture2DGroup,
    TileStyle, Triangle, Unit, Vertex,
};
pub use parser::ParserConfig;

use std::io::{Read, Seek, Write};

impl Model {
    /// Read a 3MF package with the default configuration
    ///
    /// The default configuration registers every bundled extension and decodes
    /// child documents in parallel.
    ///
    /// # Returns
    ///
    /// The decoded model together with the diagnostics collected while decoding.
    /// Only malformed packages or documents are errors.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use threemf::Model;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let (model, diagnostics) = Model::from_reader(File::open("model.3mf")?)?;
    /// assert!(diagnostics.is_empty());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<(Self, Diagnostics)> {
        Self::from_reader_with_config(reader, ParserConfig::default())
    }

    /// Read a 3MF package with a custom configuration
    pub fn from_reader_with_config<R: Read + Seek>(
        reader: R,
        config: ParserConfig,
    ) -> Result<(Self, Diagnostics)> {
        parser::read_package(reader, &config)
    }

    /// Decode one model document into this model
    ///
    /// The root document fills the model itself; any other document becomes the
    /// child model at `path`.
    pub fn decode_part(
        &mut self,
        xml: &[u8],
        path: &str,
        is_root: bool,
        registry: &ExtensionRegistry,
    ) -> Result<Diagnostics> {
        parser::decode_part(self, xml, path, is_root, registry)
    }

    /// Encode the root document to XML
    pub fn encode_part(&self, registry: &ExtensionRegistry) -> Result<Vec<u8>> {
        writer::encode_part(self, registry)
    }

    /// Write the model as a 3MF package
    ///
    /// # Example
    ///
    /// ```
    /// use std::io::Cursor;
    /// use threemf::{ExtensionRegistry, Model};
    ///
    /// let model = Model::new();
    /// let registry = ExtensionRegistry::with_default_extensions();
    /// let cursor = model.to_writer(Cursor::new(Vec::new()), &registry).unwrap();
    /// assert!(!cursor.into_inner().is_empty());
    /// ```
    pub fn to_writer<W: Write + Seek>(&self, writer: W, registry: &ExtensionRegistry) -> Result<W> {
        writer::write_package(self, writer, registry)
    }

    /// Write the model as a 3MF package to a file
    pub fn write_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
        registry: &ExtensionRegistry,
    ) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.to_writer(file, registry)?;
        Ok(())
    }

    /// Check the model against the core rules and the rules of every extension
    /// in use
    ///
    /// All problems are collected; `Err` carries the complete list.
    pub fn validate(&self, registry: &ExtensionRegistry) -> DiagnosticsResult {
        validator::validate_model(self, registry)
    }
}
