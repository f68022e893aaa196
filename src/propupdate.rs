//! Streaming parser for the body of a `PROPPATCH` request.
//!
//! The body is a `DAV:propertyupdate` document:
//!
//! ```text
//! <D:propertyupdate xmlns:D="DAV:" xmlns:Z="http://example.com/ns/">
//!   <D:set>
//!     <D:prop><Z:author>Bob</Z:author></D:prop>
//!   </D:set>
//!   <D:remove>
//!     <D:prop><Z:copyright/></D:prop>
//!   </D:remove>
//! </D:propertyupdate>
//! ```
//!
//! It is read as a stream of xml events and turned into a flat list of
//! [`PropertyOperation`]s, in document order. Elements are classified by
//! their depth only: depth 1 is the `set` / `remove` container, depth 3 the
//! property itself, and anything deeper is the (structured) value of the
//! property, which is re-serialized into a string.
//!
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use bytes::Buf;
use http::StatusCode;
use xml::attribute::OwnedAttribute;
use xml::name::OwnedName;
use xml::reader::{ParserConfig, XmlEvent};

use crate::errors::{DavError, DavResult};

pub(crate) const NS_DAV_URI: &str = "DAV:";

/// Set or remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropMode {
    Set,
    Remove,
}

/// One property update from a `PROPPATCH` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyOperation {
    /// Local name of the property element.
    pub name: String,
    /// Namespace URI, empty if the element was not in a namespace.
    pub namespace: String,
    pub mode: PropMode,
    /// The serialized content of the property element. Always `Some`
    /// for `PropMode::Set` (possibly empty), `None` for `PropMode::Remove`.
    pub value: Option<String>,
    /// Outcome. `200 OK` until the update has been applied.
    pub status: StatusCode,
}

impl PropertyOperation {
    fn new(namespace: String, name: String, mode: PropMode) -> PropertyOperation {
        PropertyOperation {
            name,
            namespace,
            mode,
            value: match mode {
                PropMode::Set => Some(String::new()),
                PropMode::Remove => None,
            },
            status: StatusCode::OK,
        }
    }

    /// Properties in the `DAV:` namespace are live properties.
    pub fn is_live(&self) -> bool {
        self.namespace == NS_DAV_URI
    }
}

/// Result of parsing a `PROPPATCH` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyUpdate {
    /// False if the document was not well-formed, or if an element
    /// name could not be resolved to a namespace.
    pub success: bool,
    pub operations: Vec<PropertyOperation>,
}

impl PropertyUpdate {
    fn failed() -> PropertyUpdate {
        PropertyUpdate {
            success: false,
            operations: Vec::new(),
        }
    }

    /// The operations, or `XmlParseError` if parsing failed.
    pub fn into_result(self) -> DavResult<Vec<PropertyOperation>> {
        if self.success {
            Ok(self.operations)
        } else {
            Err(DavError::XmlParseError)
        }
    }
}

/// The parser state machine.
///
/// Feed it xml events with `start_element`, `characters` and
/// `end_element`, then call `finish`. Normally you would use one of
/// [`parse_reader`], [`parse_chunks`] or [`parse_file`] instead.
#[derive(Debug)]
pub struct PropUpdateReader {
    depth: usize,
    mode: Option<PropMode>,
    current: Option<PropertyOperation>,
    operations: Vec<PropertyOperation>,
    success: bool,
}

impl Default for PropUpdateReader {
    fn default() -> Self {
        PropUpdateReader::new()
    }
}

// Split an element name into (namespace, local name). A prefixed name
// that did not resolve to a namespace has no valid qualified name.
fn qualified_name(name: &OwnedName) -> Option<(String, String)> {
    let namespace = name.namespace.clone().unwrap_or_default();
    if name.prefix.is_some() && namespace.is_empty() {
        return None;
    }
    Some((namespace, name.local_name.clone()))
}

fn attribute_name(name: &OwnedName) -> String {
    match name.prefix {
        Some(ref prefix) => format!("{}:{}", prefix, name.local_name),
        None => name.local_name.clone(),
    }
}

impl PropUpdateReader {
    pub fn new() -> PropUpdateReader {
        PropUpdateReader {
            depth: 0,
            mode: None,
            current: None,
            operations: Vec::new(),
            success: true,
        }
    }

    pub fn start_element(&mut self, name: &OwnedName, attributes: &[OwnedAttribute]) {
        let (namespace, tag) = match qualified_name(name) {
            Some(qn) => qn,
            None => {
                debug!("proppatch: no namespace for element {:?}", name.local_name);
                self.success = false;
                (String::new(), name.local_name.clone())
            }
        };

        match self.depth {
            1 => {
                self.mode = match tag.as_str() {
                    "set" => Some(PropMode::Set),
                    "remove" => Some(PropMode::Remove),
                    _ => {
                        debug!("proppatch: ignoring unknown container {tag:?}");
                        None
                    }
                };
            }
            3 => {
                if let Some(mode) = self.mode {
                    self.current = Some(PropertyOperation::new(namespace, tag, mode));
                }
            }
            d if d >= 4 => {
                if let Some(value) = self.current.as_mut().and_then(|c| c.value.as_mut()) {
                    value.push('<');
                    value.push_str(&tag);
                    for attr in attributes {
                        value.push(' ');
                        value.push_str(&attribute_name(&attr.name));
                        value.push_str("=\"");
                        value.push_str(&htmlescape::encode_minimal(&attr.value));
                        value.push('"');
                    }
                    value.push('>');
                }
            }
            _ => {}
        }
        self.depth += 1;
    }

    pub fn characters(&mut self, data: &str) {
        if let Some(value) = self.current.as_mut().and_then(|c| c.value.as_mut()) {
            value.push_str(data);
        }
    }

    pub fn end_element(&mut self, name: &OwnedName) {
        if self.depth == 0 {
            self.success = false;
            return;
        }
        self.depth -= 1;
        if self.depth >= 4 {
            if let Some(value) = self.current.as_mut().and_then(|c| c.value.as_mut()) {
                value.push_str("</");
                value.push_str(&name.local_name);
                value.push('>');
            }
        } else if self.depth == 3 {
            if let Some(op) = self.current.take() {
                self.operations.push(op);
            }
        }
    }

    /// Record a failure of the underlying xml parser.
    pub fn fail(&mut self) {
        self.success = false;
    }

    pub fn finish(self) -> PropertyUpdate {
        let mut success = self.success;
        if self.depth != 0 {
            debug!("proppatch: document ended at depth {}", self.depth);
            success = false;
        }
        PropertyUpdate {
            success,
            operations: self.operations,
        }
    }
}

fn parser_config() -> ParserConfig {
    ParserConfig::new()
        .trim_whitespace(false)
        .whitespace_to_characters(true)
        .cdata_to_characters(true)
        .ignore_comments(true)
        .coalesce_characters(true)
}

/// Parse a `PROPPATCH` body from a reader.
///
/// An input without a single byte of data is an empty, successful update.
/// Anything else must be a complete, well-formed document.
pub fn parse_reader<R: Read>(reader: R) -> PropertyUpdate {
    let mut reader = BufReader::new(reader);
    match reader.fill_buf() {
        Ok([]) => return PropUpdateReader::new().finish(),
        Ok(_) => {}
        Err(e) => {
            debug!("proppatch: read error: {e}");
            return PropertyUpdate::failed();
        }
    }

    let mut state = PropUpdateReader::new();
    let mut events = parser_config().create_reader(reader);
    loop {
        match events.next() {
            Ok(XmlEvent::StartElement {
                name, attributes, ..
            }) => state.start_element(&name, &attributes),
            Ok(XmlEvent::EndElement { name }) => state.end_element(&name),
            Ok(XmlEvent::Characters(data))
            | Ok(XmlEvent::CData(data))
            | Ok(XmlEvent::Whitespace(data)) => state.characters(&data),
            Ok(XmlEvent::EndDocument) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("proppatch: xml error: {e}");
                state.fail();
                break;
            }
        }
    }
    state.finish()
}

// Presents a sequence of buffers as one continuous reader.
struct ChunkReader<I, B> {
    chunks: I,
    current: Option<B>,
}

impl<I, B> Read for ChunkReader<I, B>
where
    I: Iterator<Item = B>,
    B: Buf,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if let Some(chunk) = self.current.as_mut() {
                if chunk.has_remaining() {
                    let n = std::cmp::min(buf.len(), chunk.remaining());
                    chunk.copy_to_slice(&mut buf[..n]);
                    return Ok(n);
                }
            }
            match self.chunks.next() {
                Some(chunk) => self.current = Some(chunk),
                None => return Ok(0),
            }
        }
    }
}

/// Parse a `PROPPATCH` body that arrives as a sequence of chunks,
/// for example lines. Chunk boundaries may fall anywhere, even
/// inside a tag.
pub fn parse_chunks<I, B>(chunks: I) -> PropertyUpdate
where
    I: IntoIterator<Item = B>,
    B: Buf,
{
    parse_reader(ChunkReader {
        chunks: chunks.into_iter(),
        current: None,
    })
}

/// Parse a `PROPPATCH` body stored in a file.
///
/// If the file cannot be opened the update fails without operations.
pub fn parse_file(path: impl AsRef<Path>) -> PropertyUpdate {
    match File::open(path.as_ref()) {
        Ok(file) => parse_reader(file),
        Err(e) => {
            debug!("proppatch: cannot open {:?}: {}", path.as_ref(), e);
            PropertyUpdate::failed()
        }
    }
}
