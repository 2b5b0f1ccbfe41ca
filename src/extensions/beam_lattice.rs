//! Beam Lattice extension handler implementation

use crate::error::DiagnosticsResult;
use crate::extension::{ExtensionHandler, NodeMut};
use crate::model::{Extension, Model, Object};
use crate::parser::{ElementDecoder, new_beam_lattice_decoder};
use crate::validator::beam_lattice;

/// Extension handler for the Beam Lattice extension
///
/// A lattice lives inside `<mesh>` and is kept in the mesh's extension
/// elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeamLatticeExtensionHandler;

impl ExtensionHandler for BeamLatticeExtensionHandler {
    fn namespace(&self) -> &str {
        Extension::BeamLattice.namespace()
    }

    fn local_name(&self) -> &str {
        Extension::BeamLattice.prefix()
    }

    fn new_element_decoder(
        &self,
        parent: NodeMut<'_>,
        name: &str,
    ) -> Option<Box<dyn ElementDecoder>> {
        new_beam_lattice_decoder(parent, name)
    }

    fn validate_object(&self, model: &Model, path: &str, object: &Object) -> DiagnosticsResult {
        beam_lattice::validate_object(model, path, object)
    }
}
