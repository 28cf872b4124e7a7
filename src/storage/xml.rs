//! Minimal XML element tree
//!
//! Both input formats are small documents that are easiest to handle as a
//! tree: the mindmap outline and the novelWriter project index. Parsing and
//! pretty-printing go through `quick-xml`; output is indented by two spaces
//! and ends with a newline. The declaration uses single quotes and empty
//! elements are written as `<tag />`, the way novelWriter writes them.

use std::io::Write;

use quick_xml::events::attributes::AttrError;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

const DECLARATION: &str = "<?xml version='1.0' encoding='utf-8'?>\n";

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("Malformed XML: {0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("Malformed XML attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("Unbalanced XML: unexpected closing tag")]
    Unbalanced,

    #[error("XML document has no root element")]
    NoRoot,

    #[error("Failed to write XML: {0}")]
    Io(#[from] std::io::Error),
}

/// A child of an element
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder-style text setter; empty text leaves the element empty
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.children.push(XmlNode::Text(text));
        }
        self
    }

    /// Sets an attribute, replacing an existing value in place
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Returns an attribute value
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Appends a child element
    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Iterates over child elements
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// Returns the first child element with the given name
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// Iterates over child elements with the given name
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.elements().filter(move |e| e.name == name)
    }

    /// Returns the element's own text, without descendants
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Returns the concatenated text of the element and all descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Parses a document and returns its root element
    pub fn parse(source: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(source);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(Self::from_start(&start)?),
                Event::Empty(start) => {
                    let element = Self::from_start(&start)?;
                    Self::attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or(XmlError::Unbalanced)?;
                    Self::attach(&mut stack, &mut root, element);
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(text.unescape()?.into_owned()));
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                        parent.children.push(XmlNode::Text(text));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(XmlError::Unbalanced);
        }
        root.ok_or(XmlError::NoRoot)
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let mut element = Self::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            element.attributes.push((key, value));
        }
        Ok(element)
    }

    fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
        match stack.last_mut() {
            Some(parent) => parent.push(element),
            None => {
                if root.is_none() {
                    *root = Some(element);
                }
            }
        }
    }

    /// Renders the element as a pretty-printed document with declaration
    pub fn to_document(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.get_mut().write_all(DECLARATION.as_bytes())?;
        self.write_to(&mut writer)?;

        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), XmlError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            // Trailing space inside the tag gives `<tag />`
            let mut content = String::from_utf8_lossy(&start).into_owned();
            content.push(' ');
            let empty = BytesStart::from_content(content, self.name.len());
            writer.write_event(Event::Empty(empty))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                XmlNode::Element(e) => e.write_to(writer)?,
                XmlNode::Text(t) => {
                    writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(t.as_str()))))?
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nested_document() {
        let doc = r#"<?xml version="1.0"?>
<map version="1.0.1">
  <node TEXT="Root">
    <icon BUILTIN="gohome"/>
    <node TEXT="Child &amp; more"/>
  </node>
</map>"#;

        let root = XmlElement::parse(doc).unwrap();
        assert_eq!(root.name, "map");
        assert_eq!(root.attr("version"), Some("1.0.1"));

        let node = root.find("node").unwrap();
        assert_eq!(node.attr("TEXT"), Some("Root"));
        assert_eq!(node.find("icon").unwrap().attr("BUILTIN"), Some("gohome"));
        assert_eq!(node.find_all("node").count(), 1);
        assert_eq!(node.find("node").unwrap().attr("TEXT"), Some("Child & more"));
    }

    #[test]
    fn text_content_includes_descendants() {
        let doc = "<richcontent TYPE=\"NOTE\"><html><body><p>One</p><p>Two &#160;three</p></body></html></richcontent>";
        let root = XmlElement::parse(doc).unwrap();

        assert_eq!(root.text_content(), "OneTwo \u{a0}three");
        assert_eq!(root.text(), "");
    }

    #[test]
    fn malformed_document_is_rejected() {
        assert!(XmlElement::parse("<map><node></map>").is_err());
        assert!(XmlElement::parse("<map>").is_err());
        assert!(XmlElement::parse("").is_err());
    }

    #[test]
    fn set_attr_replaces_in_place() {
        let mut e = XmlElement::new("content").with_attr("a", "1").with_attr("b", "2");
        e.set_attr("a", "3");

        assert_eq!(e.attributes, vec![("a".into(), "3".into()), ("b".into(), "2".into())]);
    }

    #[test]
    fn document_is_indented_with_two_spaces() {
        let mut root = XmlElement::new("novelWriterXML").with_attr("fileVersion", "1.5");
        let mut project = XmlElement::new("project");
        project.push(XmlElement::new("name").with_text("Tom's A & B"));
        project.push(XmlElement::new("author").with_text(""));
        project.push(XmlElement::new("meta").with_attr("handle", "abc"));
        root.push(project);

        let text = root.to_document().unwrap();
        let expected = "<?xml version='1.0' encoding='utf-8'?>\n\
<novelWriterXML fileVersion=\"1.5\">\n  \
<project>\n    \
<name>Tom's A &amp; B</name>\n    \
<author />\n    \
<meta handle=\"abc\" />\n  \
</project>\n\
</novelWriterXML>\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn written_document_parses_back() {
        let mut root = XmlElement::new("content").with_attr("count", "1");
        root.push(XmlElement::new("item").with_attr("handle", "abc\"def"));

        let parsed = XmlElement::parse(&root.to_document().unwrap()).unwrap();
        assert_eq!(parsed.attr("count"), Some("1"));
        assert_eq!(parsed.find("item").unwrap().attr("handle"), Some("abc\"def"));
        assert_eq!(parsed.find("item").unwrap().name, "item");
    }
}
