//! Validation logic for 3MF models
//!
//! Validation runs on a fully assembled model and never stops early: every
//! problem found is appended to the returned [`Diagnostics`]. Checks are split
//! between the core rules in this module's `core` submodule and the hooks of
//! the extension handlers that are in use by the model.
//!
//! Child documents are validated first, in sorted path order, and their
//! diagnostics carry the document path as prefix. The root document follows.

pub(crate) mod beam_lattice;
pub(crate) mod core;
pub(crate) mod material;
pub(crate) mod production;
pub(crate) mod slice;

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Diagnostics, DiagnosticsResult, Segment};
use crate::extension::{ExtensionHandler, ExtensionRegistry};
use crate::model::{Build, Model, Resources};
use crate::writer::used_namespaces;

/// Validate a model against the core rules and every extension in use
pub(crate) fn validate_model(model: &Model, registry: &ExtensionRegistry) -> DiagnosticsResult {
    let handlers = active_handlers(model, registry);
    let mut diagnostics = Diagnostics::new();

    for (path, child) in &model.children {
        let found = validate_document(model, path, &child.resources, None, &handlers);
        diagnostics.extend(found.in_document(path));
    }

    let root = model.path_or_default();
    diagnostics.extend(validate_document(
        model,
        root,
        &model.resources,
        Some(&model.build),
        &handlers,
    ));
    for handler in &handlers {
        diagnostics.merge(handler.validate_model(model));
    }

    debug!(
        problems = diagnostics.len(),
        extensions = handlers.len(),
        "validated model"
    );
    diagnostics.into_result()
}

/// Handlers whose namespace is declared by the model or used by any document
fn active_handlers(model: &Model, registry: &ExtensionRegistry) -> Vec<Arc<dyn ExtensionHandler>> {
    let mut namespaces: BTreeSet<String> = model.extensions.keys().cloned().collect();
    namespaces.extend(used_namespaces(&model.resources, Some(&model.build)));
    for child in model.children.values() {
        namespaces.extend(used_namespaces(&child.resources, None));
    }
    namespaces
        .iter()
        .filter_map(|namespace| registry.get(namespace))
        .collect()
}

fn validate_document(
    model: &Model,
    path: &str,
    resources: &Resources,
    build: Option<&Build>,
    handlers: &[Arc<dyn ExtensionHandler>],
) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    let mut ids = core::IdTracker::default();

    let mut found = Diagnostics::new();
    for (index, asset) in resources.assets.iter().enumerate() {
        let mut errs = core::validate_asset(asset.as_ref(), &mut ids);
        if let Some(handler) = handlers.iter().find(|h| h.namespace() == asset.namespace()) {
            errs.merge(handler.validate_asset(model, path, asset.as_ref()));
        }
        found.extend(errs.wrap(Segment::indexed(asset.kind(), index)));
    }
    for (index, object) in resources.objects.iter().enumerate() {
        let mut errs = core::validate_object(model, path, object, &mut ids);
        for handler in handlers {
            errs.merge(handler.validate_object(model, path, object));
        }
        found.extend(errs.wrap(Segment::indexed("Object", index)));
    }
    diagnostics.extend(found.wrap(Segment::named("Resources")));

    if let Some(build) = build {
        diagnostics.extend(core::validate_build(model, path, build).wrap(Segment::named("Build")));
    }
    diagnostics
}
