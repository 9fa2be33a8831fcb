//! Minimal document tree assembled from the quick-xml event stream.
//!
//! The checklist formats carry provenance in XML comments at specific
//! nesting levels, so the tree keeps comments attached to their enclosing
//! element (document-level comments live on the document itself). Child
//! elements are always a list; callers state cardinality explicitly through
//! [`Element::child`] vs [`Element::children`] instead of guessing from the
//! instance at hand.
//!
//! Namespace prefixes are stripped from element and attribute names. Text
//! is entity-decoded and trimmed; CDATA is folded into text verbatim.

use std::collections::HashMap;

use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::errors::ParseError;

#[derive(Debug, Clone, Default)]
pub(crate) struct Element {
    pub name: String,
    pub attrs: HashMap<String, String>,
    pub text: String,
    pub children: Vec<Element>,
    /// Comments that appeared directly inside this element.
    pub comments: Vec<String>,
}

impl Element {
    /// First child element with the given (namespace-stripped) name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements with the given name, in document order.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text content of the first child with the given name, if that child
    /// exists. An existing-but-empty child yields `Some("")`.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub(crate) struct Document {
    pub root: Option<Element>,
    /// Comments outside the root element (prologue and epilogue).
    pub comments: Vec<String>,
}

impl Document {
    /// The root element, provided it carries the expected name.
    pub fn root_named(&self, name: &str) -> Option<&Element> {
        self.root.as_ref().filter(|r| r.name == name)
    }
}

fn xml_err(e: impl std::fmt::Display) -> ParseError {
    ParseError::Xml(e.to_string())
}

fn local(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

fn decode_text(raw: &str) -> String {
    match unescape(raw) {
        Ok(cow) => cow.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Parse a complete document into a tree. Fails only on tokenizer-level
/// errors (unbalanced tags, bad syntax); structural expectations are the
/// callers' business.
pub(crate) fn parse_document(data: &str) -> Result<Document, ParseError> {
    let mut reader = Reader::from_str(data);
    let mut doc = Document::default();
    let mut stack: Vec<Element> = Vec::new();

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(start) => {
                let element = open_element(&start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&start)?;
                attach(&mut doc, &mut stack, element);
            }
            Event::End(_) => {
                if let Some(mut element) = stack.pop() {
                    element.text = element.text.trim().to_string();
                    attach(&mut doc, &mut stack, element);
                }
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    let raw = String::from_utf8_lossy(text.as_ref()).into_owned();
                    top.text.push_str(&decode_text(&raw));
                }
            }
            Event::CData(cdata) => {
                if let Some(top) = stack.last_mut() {
                    top.text
                        .push_str(&String::from_utf8_lossy(cdata.as_ref()));
                }
            }
            Event::Comment(comment) => {
                let body = String::from_utf8_lossy(comment.as_ref()).into_owned();
                match stack.last_mut() {
                    Some(top) => top.comments.push(body),
                    None => doc.comments.push(body),
                }
            }
            Event::GeneralRef(entity) => {
                if let Some(top) = stack.last_mut() {
                    let name = String::from_utf8_lossy(entity.as_ref()).into_owned();
                    top.text.push_str(&resolve_entity(&name));
                }
            }
            Event::Eof => break,
            // declaration, doctype, processing instructions
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ParseError::Xml("unclosed element".to_string()));
    }
    Ok(doc)
}

fn open_element(start: &quick_xml::events::BytesStart<'_>) -> Result<Element, ParseError> {
    let mut element = Element {
        name: local(start.local_name().as_ref()),
        ..Element::default()
    };
    for attr in start.attributes() {
        let attr = attr.map_err(xml_err)?;
        let key = local(attr.key.local_name().as_ref());
        let value = decode_text(&String::from_utf8_lossy(attr.value.as_ref()));
        element.attrs.insert(key, value);
    }
    Ok(element)
}

/// Resolve a general entity reference (the text between `&` and `;`).
/// Unknown entities are kept as written.
fn resolve_entity(name: &str) -> String {
    match name {
        "amp" => return "&".to_string(),
        "lt" => return "<".to_string(),
        "gt" => return ">".to_string(),
        "quot" => return "\"".to_string(),
        "apos" => return "'".to_string(),
        _ => {}
    }
    let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok()
    } else {
        None
    };
    match code.and_then(char::from_u32) {
        Some(c) => c.to_string(),
        None => format!("&{name};"),
    }
}

fn attach(doc: &mut Document, stack: &mut Vec<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if doc.root.is_none() {
                doc.root = Some(element);
            }
        }
    }
}
