//! Material extension handler implementation

use crate::error::DiagnosticsResult;
use crate::extension::{ExtensionHandler, NodeMut};
use crate::model::{Asset, Extension, Model};
use crate::parser::{ElementDecoder, new_material_decoder};
use crate::validator::material;

/// Extension handler for the Materials & Properties extension
///
/// Decodes and validates the property groups of the extension:
/// - color groups
/// - 2D textures and texture coordinate groups
/// - composite materials
/// - multi-properties
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use threemf::extensions::MaterialExtensionHandler;
/// use threemf::extension::ExtensionRegistry;
///
/// let registry = ExtensionRegistry::new();
/// registry.register(Arc::new(MaterialExtensionHandler));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialExtensionHandler;

impl ExtensionHandler for MaterialExtensionHandler {
    fn namespace(&self) -> &str {
        Extension::Material.namespace()
    }

    fn local_name(&self) -> &str {
        Extension::Material.prefix()
    }

    fn new_element_decoder(
        &self,
        parent: NodeMut<'_>,
        name: &str,
    ) -> Option<Box<dyn ElementDecoder>> {
        new_material_decoder(parent, name)
    }

    fn validate_asset(&self, model: &Model, path: &str, asset: &dyn Asset) -> DiagnosticsResult {
        material::validate_asset(model, path, asset)
    }
}
