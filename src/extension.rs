//! Extension registry and dispatch contract
//!
//! A 3MF document mixes the core vocabulary with elements and attributes from any
//! number of extensions. Each extension is implemented by an [`ExtensionHandler`]
//! registered under its namespace URI. The decoder, encoder and validator consult
//! the [`ExtensionRegistry`] whenever they meet a namespace that is not core.
//!
//! Namespaces without a handler are foreign: their content is skipped while
//! decoding and is never an error.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{DiagnosticsResult, Error, Result};
use crate::model::{Asset, Build, BuildItem, Component, Mesh, Model, Object, Resources};
use crate::parser::ElementDecoder;

/// A namespace-qualified XML name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct XmlName {
    /// Namespace URI; empty for unqualified attributes
    pub space: String,
    pub local: String,
}

impl XmlName {
    pub fn new(space: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            space: space.into(),
            local: local.into(),
        }
    }

    /// Whether this name is `local` in namespace `space`
    pub fn is(&self, space: &str, local: &str) -> bool {
        self.space == space && self.local == local
    }
}

/// An attribute with a resolved name and unescaped value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlAttr {
    pub name: XmlName,
    pub value: String,
}

impl XmlAttr {
    pub fn new(name: XmlName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// A core entity offered to an extension while it is being decoded
///
/// Handlers match on the variant they extend and ignore the rest.
pub enum NodeMut<'a> {
    Model(&'a mut Model),
    Resources(&'a mut Resources),
    Object(&'a mut Object),
    Mesh(&'a mut Mesh),
    Component(&'a mut Component),
    Build(&'a mut Build),
    Item(&'a mut BuildItem),
    /// An element that extensions cannot decorate
    Other,
}

/// An extension as declared by a document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionDecl {
    /// Namespace URI
    pub namespace: String,
    /// Prefix bound to the namespace in the document
    pub local_name: String,
    /// Whether the prefix appears in `requiredextensions`
    pub is_required: bool,
}

impl ExtensionDecl {
    pub fn new(
        namespace: impl Into<String>,
        local_name: impl Into<String>,
        is_required: bool,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
            is_required,
        }
    }

    /// The declaration a handler would write by default
    pub fn from_handler(handler: &dyn ExtensionHandler) -> Self {
        Self::new(handler.namespace(), handler.local_name(), handler.required())
    }
}

/// Handler trait for 3MF extensions
///
/// This trait defines the interface that all extension handlers must implement.
/// Only the identity methods are mandatory; every hook defaults to doing nothing.
///
/// # Example
///
/// ```ignore
/// struct ColorTagHandler;
///
/// impl ExtensionHandler for ColorTagHandler {
///     fn namespace(&self) -> &str {
///         "urn:example:colortag"
///     }
///
///     fn local_name(&self) -> &str {
///         "ct"
///     }
///
///     fn decode_attribute(&self, parent: NodeMut<'_>, attr: &XmlAttr) -> DiagnosticsResult {
///         if let NodeMut::Object(object) = parent {
///             object.any_attr.push(Box::new(ColorTag(attr.value.clone())));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait ExtensionHandler: Send + Sync {
    /// Namespace URI owned by this extension
    fn namespace(&self) -> &str;

    /// Preferred XML prefix
    fn local_name(&self) -> &str;

    /// Whether documents using this extension must list it as required
    fn required(&self) -> bool {
        false
    }

    /// Decoder for an element of this namespace found under `parent`
    ///
    /// # Arguments
    ///
    /// * `parent` - The core entity being decoded
    /// * `name` - Local name of the element
    ///
    /// # Returns
    ///
    /// * `Some(decoder)` to decode the element
    /// * `None` to skip the element and its subtree
    fn new_element_decoder(
        &self,
        _parent: NodeMut<'_>,
        _name: &str,
    ) -> Option<Box<dyn ElementDecoder>> {
        None
    }

    /// Decode an attribute of this namespace found on a core element
    fn decode_attribute(&self, _parent: NodeMut<'_>, _attr: &XmlAttr) -> DiagnosticsResult {
        Ok(())
    }

    /// Validate an asset owned by this namespace
    ///
    /// # Arguments
    ///
    /// * `model` - The complete model, for cross-references
    /// * `path` - Document the asset belongs to
    /// * `asset` - The asset to check
    ///
    /// Returned diagnostics are positioned relative to the asset.
    fn validate_asset(&self, _model: &Model, _path: &str, _asset: &dyn Asset) -> DiagnosticsResult {
        Ok(())
    }

    /// Validate the extension data of an object
    ///
    /// Called for every object of every document when the extension is in use.
    /// Returned diagnostics are positioned relative to the object.
    fn validate_object(
        &self,
        _model: &Model,
        _path: &str,
        _object: &Object,
    ) -> DiagnosticsResult {
        Ok(())
    }

    /// Validate model-wide constraints, once per model
    fn validate_model(&self, _model: &Model) -> DiagnosticsResult {
        Ok(())
    }
}

/// Registry for extension handlers
///
/// The table is guarded by a read-write lock: it is written while handlers are
/// registered and only read afterwards, so a registry can be shared between
/// threads behind an `Arc`.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use threemf::extension::ExtensionRegistry;
///
/// let registry = ExtensionRegistry::new();
/// registry.register(Arc::new(ColorTagHandler));
/// assert!(registry.contains("urn:example:colortag"));
/// ```
#[derive(Default)]
pub struct ExtensionRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn ExtensionHandler>>>,
}

impl ExtensionRegistry {
    /// Create a new empty extension registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the bundled Materials, Production, Slice and Beam
    /// Lattice handlers
    pub fn with_default_extensions() -> Self {
        crate::extensions::create_default_registry()
    }

    /// Register an extension handler
    ///
    /// # Panics
    ///
    /// Registering a namespace twice, or a handler with an empty namespace, is a
    /// programming error and panics. Use [`try_register`](Self::try_register) to get
    /// a `Result` instead.
    pub fn register(&self, handler: Arc<dyn ExtensionHandler>) {
        if let Err(err) = self.try_register(handler) {
            panic!("{}", err);
        }
    }

    /// Register an extension handler, failing on an empty or taken namespace
    pub fn try_register(&self, handler: Arc<dyn ExtensionHandler>) -> Result<()> {
        let namespace = handler.namespace().to_string();
        if namespace.is_empty() {
            return Err(Error::InvalidExtension(format!(
                "handler '{}' has an empty namespace",
                handler.local_name()
            )));
        }
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(&namespace) {
            return Err(Error::DuplicateExtension(namespace));
        }
        handlers.insert(namespace, handler);
        Ok(())
    }

    /// Get the handler for `namespace`
    pub fn get(&self, namespace: &str) -> Option<Arc<dyn ExtensionHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(namespace)
            .cloned()
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(namespace)
    }

    /// Registered namespaces, sorted
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        namespaces.sort();
        namespaces
    }

    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("namespaces", &self.namespaces())
            .finish()
    }
}
