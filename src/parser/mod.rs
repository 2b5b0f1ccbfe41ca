//! Streaming decoder for 3MF model documents
//!
//! A document is decoded in a single forward pass over quick-xml events. Every
//! open element is represented by an [`ElementDecoder`] on an explicit stack:
//!
//! - on a start tag the top decoder is asked for a child decoder; elements nobody
//!   claims are skipped together with their subtree
//! - character data goes to the top decoder
//! - on an end tag the top decoder hands its finished value to its parent and is
//!   popped
//!
//! Core decoders delegate elements and attributes of other namespaces to the
//! handler registered for that namespace, see [`crate::extension`].
//!
//! Problems with individual values never stop decoding. They are returned as
//! [`Diagnostics`] positioned by the segments of the decoders on the stack, e.g.
//! `Resources@ColorGroup#1@RGBA#0: ...`.

mod beam_lattice;
mod core;
mod material;
mod package;
mod production;
mod slice;

use std::any::Any;
use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, trace};

use crate::error::{Diagnostics, DiagnosticsResult, Error, ModelError, Result, Segment};
use crate::extension::{ExtensionHandler, ExtensionRegistry, NodeMut, XmlAttr, XmlName};
use crate::model::{Asset, CORE_NAMESPACE, ChildModel, Color, Model, Transform};

pub use package::{ParserConfig, read_package};

pub(crate) use self::beam_lattice::new_beam_lattice_decoder;
pub(crate) use self::material::new_material_decoder;
pub(crate) use self::production::decode_production_attribute;
pub(crate) use self::slice::{decode_slice_attribute, new_slice_decoder};

/// Namespace of `xmlns` declarations
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
/// Namespace of the `xml:` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Default buffer capacity for XML parsing (4KB)
const XML_BUFFER_CAPACITY: usize = 4096;

/// Per-document decoding state shared with every decoder
pub struct DecodeContext<'a> {
    pub registry: &'a ExtensionRegistry,
    /// Part name of the document being decoded
    pub path: &'a str,
    /// Whether the document is the root model
    pub is_root: bool,
}

impl<'a> DecodeContext<'a> {
    pub fn new(registry: &'a ExtensionRegistry, path: &'a str, is_root: bool) -> Self {
        Self {
            registry,
            path,
            is_root,
        }
    }

    /// Handler registered for `namespace`
    pub fn handler(&self, namespace: &str) -> Option<Arc<dyn ExtensionHandler>> {
        self.registry.get(namespace)
    }

    /// Decoder for a non-core element, if an extension claims it
    pub fn extension_decoder(
        &self,
        parent: NodeMut<'_>,
        name: &XmlName,
    ) -> Option<Box<dyn ElementDecoder>> {
        if name.space.is_empty() || name.space == CORE_NAMESPACE {
            return None;
        }
        self.handler(&name.space)?
            .new_element_decoder(parent, &name.local)
    }

    /// Offer a namespaced attribute of a core element to its extension
    ///
    /// Attributes of unregistered namespaces are ignored.
    pub fn decode_attribute(&self, parent: NodeMut<'_>, attr: &XmlAttr) -> DiagnosticsResult {
        if attr.name.space == XMLNS_NAMESPACE || attr.name.space == XML_NAMESPACE {
            return Ok(());
        }
        match self.handler(&attr.name.space) {
            Some(handler) => handler.decode_attribute(parent, attr),
            None => Ok(()),
        }
    }
}

/// Downcasting support for element decoders
pub trait DecoderAny: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> DecoderAny for T {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Decoder for one XML element
///
/// A decoder owns the value it is building and hands it to its parent in
/// [`end`](Self::end). Children reach their parent either through
/// [`node`](Self::node) or by downcasting it with `as_any_mut`.
pub trait ElementDecoder: DecoderAny {
    /// Called once with the element's attributes
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        _attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        Ok(())
    }

    /// Called for every chunk of character data
    fn text(&mut self, _text: &str) {}

    /// Decoder for a child element; `None` skips the child's subtree
    fn child(
        &mut self,
        _ctx: &DecodeContext<'_>,
        _name: &XmlName,
    ) -> Option<Box<dyn ElementDecoder>> {
        None
    }

    /// Called at the end tag; hand the finished value to `parent` here
    fn end(&mut self, _ctx: &DecodeContext<'_>, _parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        Ok(())
    }

    /// The core entity under construction, offered to extensions
    fn node(&mut self) -> NodeMut<'_> {
        NodeMut::Other
    }

    /// Path segment of this element in diagnostics
    fn segment(&self) -> Option<Segment> {
        None
    }
}

/// Prefix bindings of the open elements
#[derive(Default)]
struct Namespaces {
    bindings: Vec<(String, String)>,
    scopes: Vec<usize>,
}

impl Namespaces {
    fn push_scope(&mut self) {
        self.scopes.push(self.bindings.len());
    }

    fn pop_scope(&mut self) {
        if let Some(len) = self.scopes.pop() {
            self.bindings.truncate(len);
        }
    }

    fn bind(&mut self, prefix: &str, uri: &str) {
        self.bindings.push((prefix.to_string(), uri.to_string()));
    }

    fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// Resolve a qualified name
    ///
    /// Unprefixed attributes have no namespace. An unbound prefix is kept as the
    /// namespace so that no handler can match it.
    fn qualify(&self, qname: &str, is_element: bool) -> XmlName {
        match qname.split_once(':') {
            Some((prefix, local)) => {
                let space = self.resolve(prefix).unwrap_or(prefix);
                XmlName::new(space, local)
            }
            None if is_element => XmlName::new(self.resolve("").unwrap_or(""), qname),
            None => XmlName::new("", qname),
        }
    }
}

/// The stack machine for one document
struct StreamDecoder<'c> {
    ctx: &'c DecodeContext<'c>,
    top: core::TopLevelDecoder,
    stack: Vec<Box<dyn ElementDecoder>>,
    namespaces: Namespaces,
    diagnostics: Diagnostics,
}

fn current<'s>(
    top: &'s mut core::TopLevelDecoder,
    stack: &'s mut [Box<dyn ElementDecoder>],
) -> &'s mut dyn ElementDecoder {
    match stack.last_mut() {
        Some(decoder) => &mut **decoder,
        None => top,
    }
}

impl<'c> StreamDecoder<'c> {
    fn new(ctx: &'c DecodeContext<'c>, model: Model) -> Self {
        Self {
            ctx,
            top: core::TopLevelDecoder::new(model),
            stack: Vec::new(),
            namespaces: Namespaces::default(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Handle a start tag; returns false if the element is to be skipped
    fn open(&mut self, e: &BytesStart<'_>) -> Result<bool> {
        let qname = std::str::from_utf8(e.name().as_ref())
            .map_err(|err| Error::InvalidXml(err.to_string()))?
            .to_string();

        self.namespaces.push_scope();
        let mut attrs = Vec::new();
        let mut plain = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|err| Error::InvalidXml(err.to_string()))?;
            let value = unescape_value(&attr.value)?;
            if key == "xmlns" {
                self.namespaces.bind("", &value);
                attrs.push(XmlAttr::new(XmlName::new(XMLNS_NAMESPACE, ""), value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                self.namespaces.bind(prefix, &value);
                attrs.push(XmlAttr::new(XmlName::new(XMLNS_NAMESPACE, prefix), value));
            } else {
                plain.push((key.to_string(), value));
            }
        }
        for (key, value) in plain {
            attrs.push(XmlAttr::new(self.namespaces.qualify(&key, false), value));
        }
        let name = self.namespaces.qualify(&qname, true);

        let ctx = self.ctx;
        let child = current(&mut self.top, &mut self.stack).child(ctx, &name);
        let Some(mut child) = child else {
            trace!(element = %qname, document = ctx.path, "skipping unknown element");
            self.namespaces.pop_scope();
            return Ok(false);
        };

        let outcome = child.start(ctx, &attrs, current(&mut self.top, &mut self.stack));
        self.stack.push(child);
        if let Err(diagnostics) = outcome {
            let diagnostics = self.position(diagnostics);
            self.diagnostics.extend(diagnostics);
        }
        Ok(true)
    }

    /// Handle an end tag of a decoded element
    fn close(&mut self) -> Result<()> {
        let Some(mut decoder) = self.stack.pop() else {
            return Err(Error::InvalidXml("unbalanced end tag".to_string()));
        };
        let ctx = self.ctx;
        let outcome = decoder.end(ctx, current(&mut self.top, &mut self.stack));
        self.namespaces.pop_scope();
        if let Err(mut diagnostics) = outcome {
            if let Some(segment) = decoder.segment() {
                diagnostics = diagnostics.wrap(segment);
            }
            let diagnostics = self.position(diagnostics);
            self.diagnostics.extend(diagnostics);
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        current(&mut self.top, &mut self.stack).text(text);
    }

    /// Prefix diagnostics with the segments of the open elements
    fn position(&self, mut diagnostics: Diagnostics) -> Diagnostics {
        for decoder in self.stack.iter().rev() {
            if let Some(segment) = decoder.segment() {
                diagnostics = diagnostics.wrap(segment);
            }
        }
        if !self.ctx.is_root {
            diagnostics = diagnostics.in_document(self.ctx.path);
        }
        diagnostics
    }

    fn run(mut self, xml: &[u8]) -> Result<(Model, Diagnostics)> {
        // Untrimmed: entity references split character data into several events
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::with_capacity(XML_BUFFER_CAPACITY);
        let mut skip_buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    if !self.open(e)? {
                        skip_subtree(&mut reader, &mut skip_buf)?;
                    }
                }
                Event::Empty(ref e) => {
                    if self.open(e)? {
                        self.close()?;
                    }
                }
                Event::End(_) => self.close()?,
                Event::Text(ref t) => {
                    let raw =
                        std::str::from_utf8(t).map_err(|err| Error::InvalidXml(err.to_string()))?;
                    let text = quick_xml::escape::unescape(raw)
                        .map_err(|err| Error::InvalidXml(err.to_string()))?;
                    self.text(&text);
                }
                Event::CData(ref c) => {
                    let text =
                        std::str::from_utf8(c).map_err(|err| Error::InvalidXml(err.to_string()))?;
                    self.text(text);
                }
                Event::GeneralRef(ref r) => {
                    let name =
                        std::str::from_utf8(r).map_err(|err| Error::InvalidXml(err.to_string()))?;
                    let text = resolve_entity(name).ok_or_else(|| {
                        Error::InvalidXml(format!("unknown entity reference '&{};'", name))
                    })?;
                    self.text(&text);
                }
                Event::DocType(_) => {
                    // DTD declarations are not allowed (security risk)
                    return Err(Error::InvalidXml(
                        "DTD declarations are not allowed in 3MF files".to_string(),
                    ));
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !self.stack.is_empty() {
            return Err(Error::InvalidXml("unexpected end of document".to_string()));
        }
        Ok((self.top.into_model(), self.diagnostics))
    }
}

/// Consume events up to and including the end tag matching an open start tag
fn skip_subtree(reader: &mut Reader<&[u8]>, buf: &mut Vec<u8>) -> Result<()> {
    let mut depth = 1usize;
    loop {
        match reader.read_event_into(buf)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    buf.clear();
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(Error::InvalidXml("unexpected end of document".to_string()));
            }
            _ => {}
        }
        buf.clear();
    }
}

fn unescape_value(raw: &[u8]) -> Result<String> {
    let raw = std::str::from_utf8(raw).map_err(|err| Error::InvalidXml(err.to_string()))?;
    let value =
        quick_xml::escape::unescape(raw).map_err(|err| Error::XmlAttr(err.to_string()))?;
    Ok(value.into_owned())
}

fn resolve_entity(name: &str) -> Option<Cow<'static, str>> {
    let predefined = match name {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "apos" => "'",
        "quot" => "\"",
        _ => {
            let code = match name.strip_prefix("#x") {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => name.strip_prefix('#')?.parse::<u32>().ok()?,
            };
            return char::from_u32(code).map(|c| Cow::Owned(c.to_string()));
        }
    };
    Some(Cow::Borrowed(predefined))
}

/// Decode one document into `model`
///
/// The root document is decoded into the model itself; any other document is
/// decoded into a fresh graph whose resources become the child model at `path`.
///
/// # Arguments
///
/// * `model` - The model to fill
/// * `xml` - Document content
/// * `path` - Part name of the document
/// * `is_root` - Whether this is the root document
/// * `registry` - Handlers for extension namespaces
///
/// # Returns
///
/// * `Ok(diagnostics)` - the document was decoded; `diagnostics` lists the values
///   that could not be parsed
/// * `Err(...)` - the XML itself is malformed
pub fn decode_part(
    model: &mut Model,
    xml: &[u8],
    path: &str,
    is_root: bool,
    registry: &ExtensionRegistry,
) -> Result<Diagnostics> {
    debug!(path, is_root, "decoding model part");
    let ctx = DecodeContext::new(registry, path, is_root);
    let diagnostics = if is_root {
        let (decoded, diagnostics) = StreamDecoder::new(&ctx, std::mem::take(model)).run(xml)?;
        *model = decoded;
        diagnostics
    } else {
        let (decoded, diagnostics) = StreamDecoder::new(&ctx, Model::new()).run(xml)?;
        let child = model.children.entry(path.to_string()).or_insert_with(ChildModel::default);
        child.resources = decoded.resources;
        diagnostics
    };
    debug!(path, diagnostics = diagnostics.len(), "decoded model part");
    Ok(diagnostics)
}

/// Decode a non-root document into a standalone child model
pub(crate) fn decode_child(
    xml: &[u8],
    path: &str,
    registry: &ExtensionRegistry,
) -> Result<(ChildModel, Diagnostics)> {
    let ctx = DecodeContext::new(registry, path, false);
    let (decoded, diagnostics) = StreamDecoder::new(&ctx, Model::new()).run(xml)?;
    let child = ChildModel {
        resources: decoded.resources,
        relationships: Vec::new(),
    };
    Ok((child, diagnostics))
}

/// Append a finished asset to the `<resources>` decoder `parent`
pub fn push_asset(parent: &mut dyn ElementDecoder, asset: impl Asset) {
    if let NodeMut::Resources(resources) = parent.node() {
        resources.push_asset(asset);
    }
}

/// Parse an attribute value, reporting a diagnostic on failure
pub fn parse_opt_attr<T: FromStr>(
    attr: &XmlAttr,
    required: bool,
    errs: &mut Diagnostics,
) -> Option<T> {
    match attr.value.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            errs.add(ModelError::parse_attr(attr.name.local.as_str(), required));
            None
        }
    }
}

/// Parse an attribute value, falling back to the type's default on failure
pub fn parse_attr<T: FromStr + Default>(
    attr: &XmlAttr,
    required: bool,
    errs: &mut Diagnostics,
) -> T {
    parse_opt_attr(attr, required, errs).unwrap_or_default()
}

/// Parse a whitespace-separated list; any bad entry invalidates the whole list
pub fn parse_list_attr<T: FromStr>(
    attr: &XmlAttr,
    required: bool,
    errs: &mut Diagnostics,
) -> Vec<T> {
    match parse_list(&attr.value) {
        Some(values) => values,
        None => {
            errs.add(ModelError::parse_attr(attr.name.local.as_str(), required));
            Vec::new()
        }
    }
}

/// Parse an enumerated attribute with `parse`, reporting a diagnostic on failure
pub fn parse_enum_attr<T: Default>(
    attr: &XmlAttr,
    required: bool,
    errs: &mut Diagnostics,
    parse: impl Fn(&str) -> Option<T>,
) -> T {
    match parse(&attr.value) {
        Some(value) => value,
        None => {
            errs.add(ModelError::parse_attr(attr.name.local.as_str(), required));
            T::default()
        }
    }
}

pub(crate) fn parse_list<T: FromStr>(s: &str) -> Option<Vec<T>> {
    s.split_whitespace().map(|v| v.parse::<T>().ok()).collect()
}

/// Parse a 4x3 transform of exactly twelve numbers
pub(crate) fn parse_transform(s: &str) -> Option<Transform> {
    let values: Vec<f64> = parse_list(s)?;
    values.try_into().ok()
}

/// Parse color from hex string format (#RRGGBB or #RRGGBBAA)
pub(crate) fn parse_color(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        6 => Some((channel(0)?, channel(2)?, channel(4)?, 255)),
        8 => Some((channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
        _ => None,
    }
}

pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}
