//! Production extension handler implementation

use crate::error::DiagnosticsResult;
use crate::extension::{ExtensionHandler, NodeMut, XmlAttr};
use crate::model::{Extension, Model, Object};
use crate::parser::decode_production_attribute;
use crate::validator::production;

/// Extension handler for the Production extension
///
/// The extension only adds attributes to core elements: UUIDs on the build,
/// items, objects and components, and a document path on items and components.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductionExtensionHandler;

impl ExtensionHandler for ProductionExtensionHandler {
    fn namespace(&self) -> &str {
        Extension::Production.namespace()
    }

    fn local_name(&self) -> &str {
        Extension::Production.prefix()
    }

    fn decode_attribute(&self, parent: NodeMut<'_>, attr: &XmlAttr) -> DiagnosticsResult {
        decode_production_attribute(parent, attr)
    }

    fn validate_object(&self, model: &Model, path: &str, object: &Object) -> DiagnosticsResult {
        production::validate_object(model, path, object)
    }

    fn validate_model(&self, model: &Model) -> DiagnosticsResult {
        production::validate_model(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PRODUCTION_NAMESPACE;

    #[test]
    fn test_identity() {
        let handler = ProductionExtensionHandler;
        assert_eq!(handler.namespace(), PRODUCTION_NAMESPACE);
        assert_eq!(handler.local_name(), "p");
    }

    #[test]
    fn test_empty_build_needs_uuid() {
        let handler = ProductionExtensionHandler;
        let messages = handler
            .validate_model(&Model::new())
            .unwrap_err()
            .messages();
        assert_eq!(messages, vec!["Build: required field 'UUID' is missing"]);
    }
}
