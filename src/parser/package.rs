//! Decoding of a complete 3MF package
//!
//! The start part is found through the package relationships. Model
//! relationships of the start part name the child documents, which are decoded
//! before the root; texture relationships and any configured relationship types
//! name attachments.

use std::collections::BTreeSet;
use std::io::{Read, Seek};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::error::{Diagnostics, Error, Result};
use crate::extension::ExtensionRegistry;
use crate::model::{Attachment, ChildModel, DEFAULT_MODEL_PATH, Model, Relationship};
use crate::opc::{MODEL_REL_TYPE, Package, TEXTURE_REL_TYPE, THUMBNAIL_REL_TYPE};

use super::{decode_child, decode_part};

/// Configuration for decoding 3MF packages
///
/// # Example
///
/// ```
/// use threemf::ParserConfig;
///
/// let config = ParserConfig::new()
///     .with_parallel(false)
///     .with_attachment_relationship("urn:example:printticket");
/// assert!(!config.parallel());
/// ```
#[derive(Clone)]
pub struct ParserConfig {
    registry: Arc<ExtensionRegistry>,
    attachment_relationships: Vec<String>,
    parallel: bool,
    strict: bool,
}

impl std::fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserConfig")
            .field("registry", &self.registry)
            .field("attachment_relationships", &self.attachment_relationships)
            .field("parallel", &self.parallel)
            .field("strict", &self.strict)
            .finish()
    }
}

impl ParserConfig {
    /// Default registry, parallel child decoding, diagnostics returned to the caller
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ExtensionRegistry::with_default_extensions()),
            attachment_relationships: Vec::new(),
            parallel: true,
            strict: false,
        }
    }

    /// Decode with `registry` instead of the bundled extensions
    pub fn with_registry(mut self, registry: Arc<ExtensionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Also load the targets of relationships of type `rel_type` as attachments
    pub fn with_attachment_relationship(mut self, rel_type: impl Into<String>) -> Self {
        self.attachment_relationships.push(rel_type.into());
        self
    }

    /// Decode child documents on scoped threads
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Fail with [`Error::Diagnostics`] when decoding reports any diagnostic
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn registry(&self) -> &Arc<ExtensionRegistry> {
        &self.registry
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    fn is_attachment(&self, rel_type: &str) -> bool {
        rel_type == TEXTURE_REL_TYPE
            || rel_type == THUMBNAIL_REL_TYPE
            || self.attachment_relationships.iter().any(|r| r == rel_type)
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Load the attachment targets of `relationships` that are not loaded yet
fn collect_attachments<R: Read + Seek>(
    package: &mut Package<R>,
    config: &ParserConfig,
    relationships: &[Relationship],
    attachments: &mut Vec<Attachment>,
) -> Result<()> {
    for rel in relationships {
        if !config.is_attachment(&rel.rel_type) || attachments.iter().any(|a| a.path == rel.path) {
            continue;
        }
        if !package.has_part(&rel.path) {
            warn!(path = %rel.path, rel_type = %rel.rel_type, "relationship points at a missing part");
            continue;
        }
        let data = package.read_part(&rel.path)?;
        let content_type = package
            .content_type(&rel.path)
            .unwrap_or_default()
            .to_string();
        attachments.push(Attachment {
            path: rel.path.clone(),
            content_type,
            data,
        });
    }
    Ok(())
}

/// Number of threads used to decode `jobs` child documents
fn worker_count(jobs: usize) -> usize {
    let available = std::thread::available_parallelism().map_or(1, usize::from);
    available.min(jobs).max(1)
}

/// Decode child documents, in parallel when configured
///
/// Results are returned sorted by path; the first failure is returned as is.
fn decode_children(
    parts: Vec<(String, Vec<u8>)>,
    config: &ParserConfig,
) -> Result<Vec<(String, ChildModel, Diagnostics)>> {
    let registry = config.registry.as_ref();
    let results = Mutex::new(Vec::with_capacity(parts.len()));

    if config.parallel && parts.len() > 1 {
        let chunk_size = parts.len().div_ceil(worker_count(parts.len()));
        debug!(parts = parts.len(), chunk_size, "decoding child documents in parallel");
        std::thread::scope(|scope| {
            for chunk in parts.chunks(chunk_size) {
                let results = &results;
                scope.spawn(move || {
                    for (path, xml) in chunk {
                        let outcome = decode_child(xml, path, registry);
                        results
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push((path.clone(), outcome));
                    }
                });
            }
        });
    } else {
        for (path, xml) in &parts {
            let outcome = decode_child(xml, path, registry);
            results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((path.clone(), outcome));
        }
    }

    let mut results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
        .into_iter()
        .map(|(path, outcome)| outcome.map(|(child, diagnostics)| (path, child, diagnostics)))
        .collect()
}

/// Read a 3MF package into a model
///
/// Returns the model together with every diagnostic reported while decoding,
/// children first in path order, then the root.
pub fn read_package<R: Read + Seek>(
    reader: R,
    config: &ParserConfig,
) -> Result<(Model, Diagnostics)> {
    let mut package = Package::open(reader)?;

    let mut root_relationships = package.relationships("")?;
    let start = root_relationships
        .iter()
        .position(|rel| rel.rel_type == MODEL_REL_TYPE)
        .ok_or_else(|| Error::MissingFile("3D model relationship not found".to_string()))?;
    let root_path = root_relationships.remove(start).path;
    if !package.has_part(&root_path) {
        return Err(Error::MissingFile(root_path));
    }
    debug!(path = %root_path, "found start part");

    let mut model = Model::new();
    if root_path != DEFAULT_MODEL_PATH {
        model.path = root_path.clone();
    }
    model.relationships = package.relationships(&root_path)?;

    let mut attachments = Vec::new();
    collect_attachments(&mut package, config, &root_relationships, &mut attachments)?;
    collect_attachments(&mut package, config, &model.relationships, &mut attachments)?;

    let mut seen = BTreeSet::new();
    let mut child_parts = Vec::new();
    let mut child_relationships = Vec::new();
    for rel in &model.relationships {
        if rel.rel_type != MODEL_REL_TYPE || rel.path == root_path || !seen.insert(rel.path.clone())
        {
            continue;
        }
        if !package.has_part(&rel.path) {
            warn!(path = %rel.path, "model relationship points at a missing part");
            continue;
        }
        let relationships = package.relationships(&rel.path)?;
        collect_attachments(&mut package, config, &relationships, &mut attachments)?;
        child_parts.push((rel.path.clone(), package.read_part(&rel.path)?));
        child_relationships.push((rel.path.clone(), relationships));
    }
    debug!(
        children = child_parts.len(),
        attachments = attachments.len(),
        "discovered package parts"
    );

    model.root_relationships = root_relationships;
    model.attachments = attachments;

    let mut diagnostics = Diagnostics::new();
    for (path, mut child, child_diagnostics) in decode_children(child_parts, config)? {
        if let Some(pos) = child_relationships.iter().position(|(p, _)| *p == path) {
            child.relationships = child_relationships.swap_remove(pos).1;
        }
        model.children.insert(path, child);
        diagnostics.extend(child_diagnostics);
    }

    let xml = package.read_part(&root_path)?;
    diagnostics.extend(decode_part(
        &mut model,
        &xml,
        &root_path,
        true,
        &config.registry,
    )?);

    if config.strict && !diagnostics.is_empty() {
        return Err(Error::Diagnostics(diagnostics));
    }
    Ok((model, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
  <Default Extension="png" ContentType="image/png"/>
</Types>"#;

    const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;

    const MODEL_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/a.model" Id="rel1" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
  <Relationship Target="/3D/b.model" Id="rel2" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
  <Relationship Target="Texture/wood.png" Id="rel3" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dtexture"/>
  <Relationship Target="/3D/Texture/missing.png" Id="rel4" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dtexture"/>
</Relationships>"#;

    const ROOT_MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" xmlns:p="http://schemas.microsoft.com/3dmanufacturing/production/2015/06">
  <resources>
    <object id="1">
      <components>
        <component objectid="5" p:path="/3D/a.model"/>
      </components>
    </object>
  </resources>
  <build>
    <item objectid="1"/>
  </build>
</model>"#;

    const CHILD_A: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources>
    <object id="5" type="bad"><mesh><vertices/><triangles/></mesh></object>
  </resources>
</model>"#;

    const CHILD_B: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources>
    <object id="6" pid="x"><mesh><vertices/><triangles/></mesh></object>
  </resources>
</model>"#;

    fn build_package(child_b: &str) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let parts = [
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", ROOT_RELS.as_bytes()),
            ("3D/_rels/3dmodel.model.rels", MODEL_RELS.as_bytes()),
            ("3D/3dmodel.model", ROOT_MODEL.as_bytes()),
            ("3D/a.model", CHILD_A.as_bytes()),
            ("3D/b.model", child_b.as_bytes()),
            ("3D/Texture/wood.png", b"\x89PNG".as_slice()),
        ];
        for (name, data) in parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_worker_count_is_bounded() {
        let available = std::thread::available_parallelism().map_or(1, usize::from);
        assert_eq!(worker_count(0), 1);
        assert_eq!(worker_count(1), 1);
        assert_eq!(worker_count(500), available.min(500));
    }

    #[test]
    fn test_many_children_decode_in_path_order() {
        let parts: Vec<(String, Vec<u8>)> = (0..200)
            .map(|i| {
                let xml = format!(
                    r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"><resources><object id="{}"><mesh><vertices/><triangles/></mesh></object></resources></model>"#,
                    i + 1
                );
                (format!("/3D/part{:03}.model", i), xml.into_bytes())
            })
            .collect();

        let parallel = decode_children(parts.clone(), &ParserConfig::new()).unwrap();
        let sequential =
            decode_children(parts, &ParserConfig::new().with_parallel(false)).unwrap();
        assert_eq!(parallel.len(), 200);
        for (i, (path, child, diagnostics)) in parallel.iter().enumerate() {
            assert_eq!(path, &format!("/3D/part{:03}.model", i));
            assert_eq!(child.resources.objects[0].id, i as u32 + 1);
            assert!(diagnostics.is_empty());
        }
        let paths = |decoded: &[(String, ChildModel, Diagnostics)]| {
            decoded.iter().map(|(path, ..)| path.clone()).collect::<Vec<_>>()
        };
        assert_eq!(paths(&parallel[..]), paths(&sequential[..]));
    }

    #[test]
    fn test_read_package_with_children() {
        for parallel in [true, false] {
            let config = ParserConfig::new().with_parallel(parallel);
            let (model, diagnostics) =
                read_package(Cursor::new(build_package(CHILD_B)), &config).unwrap();

            assert_eq!(model.path, "");
            assert_eq!(model.children.len(), 2);
            assert_eq!(model.find_object("/3D/a.model", 5).unwrap().id, 5);
            assert_eq!(model.find_object("/3D/b.model", 6).unwrap().id, 6);
            assert_eq!(model.relationships.len(), 4);

            assert_eq!(model.attachments.len(), 1);
            assert_eq!(model.attachments[0].path, "/3D/Texture/wood.png");
            assert_eq!(model.attachments[0].content_type, "image/png");

            assert_eq!(
                diagnostics.messages(),
                vec![
                    "/3D/a.model@Resources@Object#0: optional attribute 'type' has an invalid value",
                    "/3D/b.model@Resources@Object#0: optional attribute 'pid' has an invalid value",
                ]
            );
        }
    }

    #[test]
    fn test_strict_mode_fails_on_diagnostics() {
        let config = ParserConfig::new().with_strict(true);
        let err = read_package(Cursor::new(build_package(CHILD_B)), &config).unwrap_err();
        match err {
            Error::Diagnostics(diagnostics) => assert_eq!(diagnostics.len(), 2),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_malformed_child_is_fatal() {
        let config = ParserConfig::new();
        let result = read_package(Cursor::new(build_package("<model><resources>")), &config);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_start_part() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();
        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(ROOT_RELS.as_bytes()).unwrap();
        let data = zip.finish().unwrap().into_inner();

        let err = read_package(Cursor::new(data), &ParserConfig::new()).unwrap_err();
        assert!(matches!(err, Error::MissingFile(path) if path == "/3D/3dmodel.model"));
    }
}
