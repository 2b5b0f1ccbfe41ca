//! Error types for 3MF decoding, encoding and validation
//!
//! Two families of errors live here:
//!
//! - [`Error`] is terminal: the package or XML stream could not be processed at all.
//!   Every variant carries an error code for categorization.
//! - [`Diagnostic`] is positional: a single field or reference problem found while
//!   decoding or validating, tagged with the entity path it was found at. Diagnostics
//!   are aggregated into [`Diagnostics`] and never abort processing.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and archive errors
//! - **E2xxx**: XML parsing and structure errors
//! - **E3xxx**: Model errors
//! - **E4xxx**: Unsupported features and configuration errors

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for 3MF operations
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a hook that reports positioned problems instead of failing
pub type DiagnosticsResult = std::result::Result<(), Diagnostics>;

/// Terminal error type for 3MF operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    ///
    /// **Error Code**: E1001
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Corrupted ZIP file
    /// - Unsupported compression method
    /// - Truncated archive
    #[error("[E1002] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Missing required part in the package
    ///
    /// **Error Code**: E1003
    ///
    /// **Common Causes**:
    /// - No relationship points at a 3D model part
    /// - A relationship points at a part that is not in the archive
    #[error("[E1003] Missing required file: {0}")]
    MissingFile(String),

    /// XML parsing error
    ///
    /// **Error Code**: E2001
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error
    ///
    /// **Error Code**: E2002
    #[error("[E2002] XML attribute error: {0}")]
    XmlAttr(String),

    /// Invalid XML structure
    ///
    /// **Error Code**: E2003
    ///
    /// **Common Causes**:
    /// - Unbalanced or truncated documents
    /// - Non UTF-8 content
    /// - DTD declarations
    #[error("[E2003] Invalid XML structure: {0}")]
    InvalidXml(String),

    /// Invalid OPC packaging
    ///
    /// **Error Code**: E2004
    #[error("[E2004] Invalid 3MF format: {0}")]
    InvalidFormat(String),

    /// XML writing error
    ///
    /// **Error Code**: E2005
    #[error("[E2005] XML writing error: {0}")]
    XmlWrite(String),

    /// Diagnostics promoted to a terminal error
    ///
    /// **Error Code**: E3001
    ///
    /// Only produced when the caller opts into strict decoding.
    #[error("[E3001] Invalid model: {0}")]
    Diagnostics(#[from] Diagnostics),

    /// Unsupported feature
    ///
    /// **Error Code**: E4001
    ///
    /// **Common Causes**:
    /// - Encoding a namespace that neither the model nor the registry can name
    #[error("[E4001] Unsupported feature: {0}")]
    Unsupported(String),

    /// Extension handler that cannot be registered
    ///
    /// **Error Code**: E4002
    #[error("[E4002] Invalid extension handler: {0}")]
    InvalidExtension(String),

    /// Extension registration conflict
    ///
    /// **Error Code**: E4003
    #[error("[E4003] Extension already registered: {0}")]
    DuplicateExtension(String),
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl Error {
    /// Create an XmlWrite error
    ///
    /// # Arguments
    /// * `message` - Description of the writing error
    pub fn xml_write(message: String) -> Self {
        Error::XmlWrite(message)
    }
}

/// Causes reported by the core decoder and validator
///
/// The `Display` text of each variant is the message part of a diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// An attribute value could not be parsed
    #[error("{} attribute '{name}' has an invalid value", required_label(.required))]
    ParseAttr {
        /// Local name of the attribute
        name: String,
        /// Whether the attribute is required by its schema
        required: bool,
    },
    /// A required field has no value
    #[error("required field '{name}' is missing")]
    MissingField {
        /// Name of the field as it appears in XML
        name: String,
    },
    #[error("resource id must be a positive integer")]
    MissingId,
    #[error("resource properties must not be empty")]
    EmptyResourceProps,
    #[error("referenced resource does not exist")]
    MissingResource,
    #[error("index is out of bounds")]
    IndexOutOfBounds,
    #[error("resource id is already used in this document")]
    DuplicatedId,
    #[error("triangle vertex indices must be distinct")]
    DuplicatedIndices,
    #[error("object must contain either a mesh or components")]
    InvalidObject,
    #[error("component references its own object")]
    RecursiveComponent,
    #[error("only the root document may reference other documents")]
    ReferenceInNonRoot,
    #[error("build items must not reference objects of type other")]
    OtherItem,
    /// A namespace listed in `requiredextensions` has no registered handler
    #[error("required extension '{0}' is not supported")]
    RequiredExtension(String),
}

impl ModelError {
    /// Shorthand for [`ModelError::ParseAttr`]
    pub fn parse_attr(name: impl Into<String>, required: bool) -> Self {
        ModelError::ParseAttr {
            name: name.into(),
            required,
        }
    }

    /// Shorthand for [`ModelError::MissingField`]
    pub fn missing_field(name: impl Into<String>) -> Self {
        ModelError::MissingField { name: name.into() }
    }
}

fn required_label(required: &bool) -> &'static str {
    if *required { "required" } else { "optional" }
}

/// One step of an entity path, such as `Resources` or `Object#2`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Kind name of the entity
    pub kind: &'static str,
    /// Position within the parent collection, for repeated entities
    pub index: Option<usize>,
}

impl Segment {
    /// A segment for a container entity that appears once
    pub fn named(kind: &'static str) -> Self {
        Self { kind, index: None }
    }

    /// A segment for the `index`-th entity of a collection
    pub fn indexed(kind: &'static str, index: usize) -> Self {
        Self {
            kind,
            index: Some(index),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}#{}", self.kind, index),
            None => f.write_str(self.kind),
        }
    }
}

/// A positioned, non-fatal problem
///
/// Renders as `[<document>@]<Segment>@<Segment>: <message>`. The document prefix is
/// only present for child documents.
#[derive(Debug)]
pub struct Diagnostic {
    /// Child document the problem was found in; `None` for the root document
    pub document: Option<String>,
    /// Entity path, outermost first
    pub path: Vec<Segment>,
    error: Box<dyn std::error::Error + Send + Sync>,
}

impl Diagnostic {
    /// Wrap a cause with an empty path
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            document: None,
            path: Vec::new(),
            error: Box::new(error),
        }
    }

    /// Prepend `segment` to the entity path
    pub fn wrap(mut self, segment: Segment) -> Self {
        self.path.insert(0, segment);
        self
    }

    /// Attribute the diagnostic to a child document
    pub fn in_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// The underlying cause
    pub fn error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.error.as_ref()
    }

    /// Downcast the cause to a concrete error type
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.error.downcast_ref::<E>()
    }

    /// The entity path without the message, e.g. `Resources@Object#1`
    pub fn location(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.path.len() + 1);
        if let Some(document) = &self.document {
            parts.push(document.clone());
        }
        parts.extend(self.path.iter().map(Segment::to_string));
        parts.join("@")
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self.location();
        if location.is_empty() {
            write!(f, "{}", self.error)
        } else {
            write!(f, "{}: {}", location, self.error)
        }
    }
}

impl std::error::Error for Diagnostic {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

/// An ordered list of diagnostics
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positioned diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Append a cause with an empty path
    pub fn add<E>(&mut self, error: E)
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.items.push(Diagnostic::new(error));
    }

    /// Append a cause located at `segment`
    pub fn add_at<E>(&mut self, segment: Segment, error: E)
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.items.push(Diagnostic::new(error).wrap(segment));
    }

    /// Append every diagnostic of `other`
    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Append the diagnostics of a hook outcome, if any
    pub fn merge(&mut self, outcome: DiagnosticsResult) {
        if let Err(other) = outcome {
            self.extend(other);
        }
    }

    /// Prepend `segment` to the path of every diagnostic
    pub fn wrap(self, segment: Segment) -> Self {
        Self {
            items: self.items.into_iter().map(|d| d.wrap(segment)).collect(),
        }
    }

    /// Attribute every diagnostic to a child document
    pub fn in_document(self, document: &str) -> Self {
        Self {
            items: self
                .items
                .into_iter()
                .map(|d| d.in_document(document))
                .collect(),
        }
    }

    /// `Ok(())` when empty, otherwise `Err(self)`
    pub fn into_result(self) -> DiagnosticsResult {
        if self.items.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// Rendered messages, in order
    pub fn messages(&self) -> Vec<String> {
        self.items.iter().map(Diagnostic::to_string).collect()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            items: vec![diagnostic],
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.items.len() {
            0 => f.write_str("no diagnostics"),
            1 => write!(f, "{}", self.items[0]),
            n => {
                write!(f, "{} problems found", n)?;
                for item in &self.items {
                    write!(f, "\n  {}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Diagnostics {}
