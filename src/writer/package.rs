//! Package assembly: every document, attachment and relationship of a model

use std::collections::HashSet;
use std::io::{Seek, Write};

use tracing::debug;

use crate::error::Result;
use crate::extension::ExtensionRegistry;
use crate::model::{Model, Relationship};
use crate::opc::{MODEL_CONTENT_TYPE, MODEL_REL_TYPE, PackageWriter, TEXTURE_REL_TYPE};

use super::{encode_part, write_child_xml};

fn relationship(path: &str, rel_type: &str) -> Relationship {
    Relationship {
        path: path.to_string(),
        rel_type: rel_type.to_string(),
        id: String::new(),
    }
}

/// Write `model` as a complete 3MF package
///
/// Relationships the model does not record are added: the package points at
/// the root document, the root document at every child document, and at every
/// attachment no other relationship targets.
pub fn write_package<W: Write + Seek>(
    model: &Model,
    writer: W,
    registry: &ExtensionRegistry,
) -> Result<W> {
    let root = model.path_or_default();
    let mut package = PackageWriter::new(writer);

    let mut root_rels = vec![relationship(root, MODEL_REL_TYPE)];
    root_rels.extend(
        model
            .root_relationships
            .iter()
            .filter(|rel| !(rel.rel_type == MODEL_REL_TYPE && rel.path == root))
            .cloned(),
    );
    package.add_relationships("", &root_rels)?;

    package.add_part(root, MODEL_CONTENT_TYPE, &encode_part(model, registry)?)?;
    for (path, child) in &model.children {
        let mut buffer = Vec::new();
        write_child_xml(model, path, registry, &mut buffer)?;
        package.add_part(path, MODEL_CONTENT_TYPE, &buffer)?;
        package.add_relationships(path, &child.relationships)?;
    }

    let mut model_rels = model.relationships.clone();
    let mut targeted: HashSet<&str> = root_rels
        .iter()
        .chain(&model.relationships)
        .chain(model.children.values().flat_map(|c| &c.relationships))
        .map(|rel| rel.path.as_str())
        .collect();
    for path in model.children.keys() {
        if targeted.insert(path.as_str()) {
            model_rels.push(relationship(path, MODEL_REL_TYPE));
        }
    }
    for attachment in &model.attachments {
        if targeted.insert(attachment.path.as_str()) {
            model_rels.push(relationship(&attachment.path, TEXTURE_REL_TYPE));
        }
    }
    package.add_relationships(root, &model_rels)?;

    for attachment in &model.attachments {
        package.add_part(&attachment.path, &attachment.content_type, &attachment.data)?;
    }

    debug!(
        children = model.children.len(),
        attachments = model.attachments.len(),
        "wrote package"
    );
    package.finish()
}
