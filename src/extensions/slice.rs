//! Slice extension handler implementation

use crate::error::DiagnosticsResult;
use crate::extension::{ExtensionHandler, NodeMut, XmlAttr};
use crate::model::{Asset, Extension, Model, Object};
use crate::parser::{ElementDecoder, decode_slice_attribute, new_slice_decoder};
use crate::validator::slice;

/// Extension handler for the Slice extension
///
/// Slice stacks are resources; objects point at them through
/// `s:slicestackid`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SliceExtensionHandler;

impl ExtensionHandler for SliceExtensionHandler {
    fn namespace(&self) -> &str {
        Extension::Slice.namespace()
    }

    fn local_name(&self) -> &str {
        Extension::Slice.prefix()
    }

    fn new_element_decoder(
        &self,
        parent: NodeMut<'_>,
        name: &str,
    ) -> Option<Box<dyn ElementDecoder>> {
        new_slice_decoder(parent, name)
    }

    fn decode_attribute(&self, parent: NodeMut<'_>, attr: &XmlAttr) -> DiagnosticsResult {
        decode_slice_attribute(parent, attr)
    }

    fn validate_asset(&self, model: &Model, path: &str, asset: &dyn Asset) -> DiagnosticsResult {
        slice::validate_asset(model, path, asset)
    }

    fn validate_object(&self, model: &Model, path: &str, object: &Object) -> DiagnosticsResult {
        slice::validate_object(model, path, object)
    }
}
