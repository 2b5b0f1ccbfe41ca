//! OPC (Open Packaging Conventions) handling for 3MF files
//!
//! 3MF files are ZIP archives following the OPC standard, containing
//! various parts including the main 3D model file and relationships.
//!
//! Part names are absolute (`/3D/3dmodel.model`). Inside the archive they are
//! stored without the leading slash; inside relationship targets they may be
//! percent-encoded.

use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{Error, Result};
use crate::model::Relationship;

/// Content types file path
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// Relationships file path
pub const RELS_PATH: &str = "_rels/.rels";

/// 3D model relationship type
pub const MODEL_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";

/// Texture relationship type
pub const TEXTURE_REL_TYPE: &str =
    "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dtexture";

/// Thumbnail relationship type (OPC standard)
pub const THUMBNAIL_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail";

/// Content type of 3D model parts
pub const MODEL_CONTENT_TYPE: &str = "application/vnd.ms-package.3dmanufacturing-3dmodel+xml";

/// Content type of relationship parts
pub const RELS_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";

const CONTENT_TYPES_NAMESPACE: &str =
    "http://schemas.openxmlformats.org/package/2006/content-types";
const RELS_NAMESPACE: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Name of a part inside the ZIP archive
fn zip_name(part: &str) -> &str {
    part.strip_prefix('/').unwrap_or(part)
}

/// Extension of a part name, lowercased
fn part_extension(part: &str) -> Option<String> {
    let file = part.rsplit('/').next()?;
    file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Part holding the relationships of `source`; an empty source is the package
pub fn rels_path(source: &str) -> String {
    let source = zip_name(source);
    if source.is_empty() {
        return RELS_PATH.to_string();
    }
    match source.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", source),
    }
}

/// Resolve a relationship target against the part that owns the relationship
///
/// Percent-encoded targets are decoded; targets that fail to decode are used
/// as written.
pub fn resolve_target(source: &str, target: &str) -> String {
    let target = urlencoding::decode(target)
        .map(|t| t.into_owned())
        .unwrap_or_else(|_| target.to_string());
    if target.starts_with('/') {
        return normalize(&target);
    }
    let base = match zip_name(source).rsplit_once('/') {
        Some((dir, _)) => format!("/{}/", dir),
        None => "/".to_string(),
    };
    normalize(&format!("{}{}", base, target))
}

/// Collapse `.` and `..` segments of an absolute part name
fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Percent-encode each segment of a part name for use as a relationship target
fn encode_target(part: &str) -> String {
    part.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Validate an OPC part name
///
/// Part names must not contain:
/// - Fragment identifiers (#)
/// - Query strings (?)
/// - Empty path segments
/// - Segments ending with "."
fn validate_part_name(part_name: &str) -> Result<()> {
    if part_name.contains('#') || part_name.contains('?') {
        return Err(Error::InvalidFormat(format!(
            "Part name cannot contain a fragment or query: {}",
            part_name
        )));
    }
    for segment in zip_name(part_name).split('/') {
        if segment.is_empty() {
            return Err(Error::InvalidFormat(format!(
                "Part name cannot contain empty path segments: {}",
                part_name
            )));
        }
        if segment.ends_with('.') {
            return Err(Error::InvalidFormat(format!(
                "Part name segments cannot end with '.': {}",
                part_name
            )));
        }
    }
    Ok(())
}

fn attr_str(value: &[u8]) -> Result<String> {
    std::str::from_utf8(value)
        .map(str::to_string)
        .map_err(|e| Error::InvalidXml(e.to_string()))
}

/// Content type mappings of a package
#[derive(Debug, Default)]
struct ContentTypes {
    /// Keyed by lowercased extension
    defaults: BTreeMap<String, String>,
    /// Keyed by lowercased part name with leading slash
    overrides: BTreeMap<String, String>,
}

impl ContentTypes {
    fn parse(content: &[u8]) -> Result<Self> {
        let mut types = ContentTypes::default();
        let mut reader = Reader::from_reader(content);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Empty(ref e) | Event::Start(ref e) => {
                    let local = e.local_name();
                    let mut key = None;
                    let mut content_type = None;
                    for attr in e.attributes() {
                        let attr = attr?;
                        match attr.key.as_ref() {
                            b"Extension" | b"PartName" => key = Some(attr_str(&attr.value)?),
                            b"ContentType" => content_type = Some(attr_str(&attr.value)?),
                            _ => {}
                        }
                    }
                    if let (Some(key), Some(ct)) = (key, content_type) {
                        match local.as_ref() {
                            b"Default" => {
                                types.defaults.insert(key.to_ascii_lowercase(), ct);
                            }
                            b"Override" => {
                                let part = format!("/{}", zip_name(&key)).to_ascii_lowercase();
                                types.overrides.insert(part, ct);
                            }
                            _ => {}
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(types)
    }

    fn lookup(&self, part: &str) -> Option<&str> {
        let key = format!("/{}", zip_name(part)).to_ascii_lowercase();
        if let Some(ct) = self.overrides.get(&key) {
            return Some(ct);
        }
        part_extension(part).and_then(|ext| self.defaults.get(&ext).map(String::as_str))
    }
}

/// Represents an OPC package (3MF file) opened for reading
pub struct Package<R: Read> {
    archive: ZipArchive<R>,
    content_types: ContentTypes,
}

impl<R: Read + Seek> Package<R> {
    /// Open a 3MF package from a reader
    ///
    /// The archive must contain `[Content_Types].xml` and `_rels/.rels`.
    pub fn open(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        for required in [CONTENT_TYPES_PATH, RELS_PATH] {
            if archive.by_name(required).is_err() {
                return Err(Error::InvalidFormat(format!(
                    "Missing required file: {}",
                    required
                )));
            }
        }
        let mut content = Vec::new();
        archive.by_name(CONTENT_TYPES_PATH)?.read_to_end(&mut content)?;
        let content_types = ContentTypes::parse(&content)?;
        Ok(Self {
            archive,
            content_types,
        })
    }

    /// Check if a part exists in the archive
    pub fn has_part(&mut self, part: &str) -> bool {
        self.archive.by_name(zip_name(part)).is_ok()
    }

    /// Read a part as binary data
    pub fn read_part(&mut self, part: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(zip_name(part))
            .map_err(|_| Error::MissingFile(part.to_string()))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        Ok(content)
    }

    /// Content type of a part, from an override or the extension default
    pub fn content_type(&self, part: &str) -> Option<&str> {
        self.content_types.lookup(part)
    }

    /// Relationships whose source is `source`; an empty source is the package
    ///
    /// A source without a relationships part has no relationships. Targets are
    /// returned as absolute part names.
    pub fn relationships(&mut self, source: &str) -> Result<Vec<Relationship>> {
        let rels = rels_path(source);
        if self.archive.by_name(&rels).is_err() {
            return Ok(Vec::new());
        }
        let mut content = Vec::new();
        self.archive.by_name(&rels)?.read_to_end(&mut content)?;

        let mut reader = Reader::from_reader(content.as_slice());
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut relationships = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Empty(ref e) | Event::Start(ref e)
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    let mut relationship = Relationship::default();
                    let mut target = None;
                    for attr in e.attributes() {
                        let attr = attr?;
                        match attr.key.as_ref() {
                            b"Target" => target = Some(attr_str(&attr.value)?),
                            b"Type" => relationship.rel_type = attr_str(&attr.value)?,
                            b"Id" => relationship.id = attr_str(&attr.value)?,
                            _ => {}
                        }
                    }
                    if let Some(target) = target {
                        relationship.path = resolve_target(source, &target);
                        validate_part_name(&relationship.path)?;
                        relationships.push(relationship);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(relationships)
    }

    /// Get the number of files in the archive
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Check if the archive is empty
    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }
}

/// Writer producing a 3MF package
///
/// Content types are collected while parts are added and written by
/// [`finish`](Self::finish).
pub struct PackageWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    content_types: ContentTypes,
}

impl<W: Write + Seek> PackageWriter<W> {
    pub fn new(writer: W) -> Self {
        let mut content_types = ContentTypes::default();
        content_types
            .defaults
            .insert("rels".to_string(), RELS_CONTENT_TYPE.to_string());
        content_types
            .defaults
            .insert("model".to_string(), MODEL_CONTENT_TYPE.to_string());
        Self {
            zip: ZipWriter::new(writer),
            content_types,
        }
    }

    fn register_content_type(&mut self, part: &str, content_type: &str) {
        let content_type = if content_type.is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            content_type
        };
        match part_extension(part) {
            Some(ext) => match self.content_types.defaults.get(&ext) {
                Some(existing) if existing == content_type => {}
                Some(_) => {
                    self.content_types
                        .overrides
                        .insert(format!("/{}", zip_name(part)), content_type.to_string());
                }
                None => {
                    self.content_types
                        .defaults
                        .insert(ext, content_type.to_string());
                }
            },
            None => {
                self.content_types
                    .overrides
                    .insert(format!("/{}", zip_name(part)), content_type.to_string());
            }
        }
    }

    /// Add a part with its content type
    pub fn add_part(&mut self, part: &str, content_type: &str, data: &[u8]) -> Result<()> {
        validate_part_name(part)?;
        self.register_content_type(part, content_type);
        self.zip
            .start_file(zip_name(part), SimpleFileOptions::default())
            .map_err(|e| Error::xml_write(format!("Failed to create part {}: {}", part, e)))?;
        self.zip.write_all(data)?;
        Ok(())
    }

    /// Add the relationships part of `source`; an empty source is the package
    ///
    /// Relationships without an id are numbered `rel0`, `rel1`, ...
    pub fn add_relationships(&mut self, source: &str, rels: &[Relationship]) -> Result<()> {
        if rels.is_empty() {
            return Ok(());
        }
        let mut xml = Writer::new_with_indent(Vec::new(), b' ', 2);
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| Error::xml_write(e.to_string()))?;
        let mut root = BytesStart::new("Relationships");
        root.push_attribute(("xmlns", RELS_NAMESPACE));
        xml.write_event(Event::Start(root))
            .map_err(|e| Error::xml_write(e.to_string()))?;
        for (i, rel) in rels.iter().enumerate() {
            let id = if rel.id.is_empty() {
                format!("rel{}", i)
            } else {
                rel.id.clone()
            };
            let mut elem = BytesStart::new("Relationship");
            elem.push_attribute(("Target", encode_target(&rel.path).as_str()));
            elem.push_attribute(("Id", id.as_str()));
            elem.push_attribute(("Type", rel.rel_type.as_str()));
            xml.write_event(Event::Empty(elem))
                .map_err(|e| Error::xml_write(e.to_string()))?;
        }
        xml.write_event(Event::End(BytesEnd::new("Relationships")))
            .map_err(|e| Error::xml_write(e.to_string()))?;

        self.zip
            .start_file(rels_path(source), SimpleFileOptions::default())
            .map_err(|e| Error::xml_write(format!("Failed to create relationships file: {}", e)))?;
        self.zip.write_all(&xml.into_inner())?;
        Ok(())
    }

    /// Write `[Content_Types].xml` and finish the archive
    pub fn finish(mut self) -> Result<W> {
        let mut xml = Writer::new_with_indent(Vec::new(), b' ', 2);
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| Error::xml_write(e.to_string()))?;
        let mut root = BytesStart::new("Types");
        root.push_attribute(("xmlns", CONTENT_TYPES_NAMESPACE));
        xml.write_event(Event::Start(root))
            .map_err(|e| Error::xml_write(e.to_string()))?;
        for (ext, ct) in &self.content_types.defaults {
            let mut elem = BytesStart::new("Default");
            elem.push_attribute(("Extension", ext.as_str()));
            elem.push_attribute(("ContentType", ct.as_str()));
            xml.write_event(Event::Empty(elem))
                .map_err(|e| Error::xml_write(e.to_string()))?;
        }
        for (part, ct) in &self.content_types.overrides {
            let mut elem = BytesStart::new("Override");
            elem.push_attribute(("PartName", part.as_str()));
            elem.push_attribute(("ContentType", ct.as_str()));
            xml.write_event(Event::Empty(elem))
                .map_err(|e| Error::xml_write(e.to_string()))?;
        }
        xml.write_event(Event::End(BytesEnd::new("Types")))
            .map_err(|e| Error::xml_write(e.to_string()))?;

        self.zip
            .start_file(CONTENT_TYPES_PATH, SimpleFileOptions::default())
            .map_err(|e| Error::xml_write(format!("Failed to create Content_Types file: {}", e)))?;
        self.zip.write_all(&xml.into_inner())?;

        let writer = self
            .zip
            .finish()
            .map_err(|e| Error::xml_write(format!("Failed to finalize ZIP archive: {}", e)))?;
        Ok(writer)
    }
}
