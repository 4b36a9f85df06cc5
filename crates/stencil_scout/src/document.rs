//! Diagram documents as element trees
//!
//! Draw.io files are XML whose cells live in `mxCell` elements, with all the
//! interesting data carried in attributes. The scanner only needs a few things
//! from a tree, captured by [`DocumentNode`]; [`XmlElement`] is the in-memory
//! implementation built by [`Document::load`].

use crate::error::{Result, ScoutError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read-only view of one node in a document tree.
pub trait DocumentNode: Sized {
    /// Tag name, e.g. `mxCell`
    fn tag(&self) -> &str;

    /// Attributes in document order
    fn attributes(&self) -> &[(String, String)];

    /// Direct children in document order
    fn children(&self) -> &[Self];

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child with the given tag
    fn find_child(&self, tag: &str) -> Option<&Self> {
        self.children().iter().find(|c| c.tag() == tag)
    }

    /// This node and every descendant, pre-order, in document order.
    fn descendants(&self) -> Descendants<'_, Self> {
        Descendants { stack: vec![self] }
    }
}

/// Pre-order walk over a node and its descendants
pub struct Descendants<'a, N> {
    stack: Vec<&'a N>,
}

impl<'a, N: DocumentNode> Iterator for Descendants<'a, N> {
    type Item = &'a N;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

/// An XML element with its attributes and child elements. Text content is not kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }
}

impl DocumentNode for XmlElement {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

/// A parsed diagram document
#[derive(Debug, Clone)]
pub struct Document {
    root: XmlElement,
}

impl Document {
    /// Read and parse a document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScoutError::DocumentNotFound(path.to_path_buf())
            } else {
                ScoutError::Io(e)
            }
        })?;
        let text = String::from_utf8(bytes).map_err(|e| ScoutError::Encoding {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let root = parse_xml(&text).map_err(|message| ScoutError::DocumentParse {
            path: path.to_path_buf(),
            message,
        })?;
        debug!(path = %path.display(), root = %root.tag, "Parsed document");

        Ok(Self { root })
    }

    /// Parse a document held in memory.
    pub fn parse_str(text: &str) -> Result<Self> {
        let root = parse_xml(text).map_err(|message| ScoutError::DocumentParse {
            path: PathBuf::from("<memory>"),
            message,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }
}

/// Build an element tree from XML text.
fn parse_xml(text: &str) -> std::result::Result<XmlElement, String> {
    let text = text.trim_start_matches('\u{feff}').trim();
    let mut reader = Reader::from_str(text);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("{} at byte {}", e, reader.buffer_position()))?;

        match event {
            Event::Start(start) => {
                stack.push(element_from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "closing tag without an open element".to_string())?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unexpected end of document inside <{}>", open.tag));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn element_from_start(start: &BytesStart<'_>) -> std::result::Result<XmlElement, String> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::new(tag);

    for attr in start.attributes() {
        let attr = attr.map_err(|e| format!("invalid attribute in <{}>: {}", element.tag, e))?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| format!("invalid attribute value for {}: {}", name, e))?
            .into_owned();
        element.attributes.push((name, value));
    }

    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> std::result::Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(format!("unexpected second root element <{}>", element.tag)),
    }
}
