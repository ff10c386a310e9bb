//! XMLTV document model
//!
//! Blocks are built as small owned element trees and only turned into bytes
//! once, when the whole guide is serialized through `quick-xml`'s indenting
//! writer. Text and attribute values are escaped by the writer.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

use crate::errors::AppResult;

pub const SOURCE_INFO_URL: &str = "http://tvlistings.gracenote.com/";
pub const SOURCE_INFO_NAME: &str = "zap2it";
pub const GENERATOR_INFO_NAME: &str = "zap2it-GuideScraping";
pub const GENERATOR_INFO_URL: &str = "daniel@widrick.net";

const DOCTYPE: &str = r#"tv SYSTEM "xmltv.dtd""#;

/// A single XML element with attributes, optional text and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Element holding only a text node
    pub fn text_element<N: Into<String>, T: Into<String>>(name: N, text: T) -> Self {
        Self::new(name).with_text(text)
    }

    pub fn with_attr<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_text<T: Into<String>>(mut self, text: T) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// Children with the given element name, in document order
    pub fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> AppResult<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.text.is_none() && self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if let Some(text) = &self.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for child in &self.children {
            child.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

/// The guide being assembled: channel blocks, then programme blocks
///
/// Both sections keep insertion order, so the output follows first-seen
/// order across fetches.
#[derive(Debug, Clone, Default)]
pub struct GuideDocument {
    channels: Vec<XmlElement>,
    programmes: Vec<XmlElement>,
}

impl GuideDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_channel(&mut self, channel: XmlElement) {
        self.channels.push(channel);
    }

    pub fn push_programme(&mut self, programme: XmlElement) {
        self.programmes.push(programme);
    }

    pub fn channels(&self) -> &[XmlElement] {
        &self.channels
    }

    pub fn programmes(&self) -> &[XmlElement] {
        &self.programmes
    }

    /// Serialize as a pretty-printed UTF-8 XMLTV document
    pub fn to_xml(&self) -> AppResult<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::DocType(BytesText::from_escaped(DOCTYPE)))?;

        let mut root = BytesStart::new("tv");
        root.push_attribute(("source-info-url", SOURCE_INFO_URL));
        root.push_attribute(("source-info-name", SOURCE_INFO_NAME));
        root.push_attribute(("generator-info-name", GENERATOR_INFO_NAME));
        root.push_attribute(("generator-info-url", GENERATOR_INFO_URL));
        writer.write_event(Event::Start(root))?;

        for element in self.channels.iter().chain(self.programmes.iter()) {
            element.write_to(&mut writer)?;
        }

        writer.write_event(Event::End(BytesEnd::new("tv")))?;

        let mut xml = writer.into_inner();
        xml.push(b'\n');
        Ok(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(document: &GuideDocument) -> String {
        String::from_utf8(document.to_xml().unwrap()).unwrap()
    }

    #[test]
    fn test_empty_document_has_prolog_and_root() {
        let xml = render(&GuideDocument::new());
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<!DOCTYPE tv SYSTEM \"xmltv.dtd\">"));
        assert!(xml.contains("source-info-name=\"zap2it\""));
        assert!(xml.contains("generator-info-url=\"daniel@widrick.net\""));
        assert!(xml.trim_end().ends_with("</tv>"));
    }

    #[test]
    fn test_channels_precede_programmes() {
        let mut document = GuideDocument::new();
        document.push_programme(XmlElement::new("programme").with_attr("channel", "1"));
        document.push_channel(XmlElement::new("channel").with_attr("id", "1"));

        let xml = render(&document);
        let channel = xml.find("<channel id=\"1\"/>").unwrap();
        let programme = xml.find("<programme channel=\"1\"/>").unwrap();
        assert!(channel < programme);
    }

    #[test]
    fn test_text_and_attributes_are_escaped() {
        let mut document = GuideDocument::new();
        document.push_programme(
            XmlElement::new("programme")
                .with_attr("channel", "a\"b")
                .with_child(XmlElement::text_element("title", "Law & Order <SVU>")),
        );

        let xml = render(&document);
        assert!(xml.contains("channel=\"a&quot;b\""));
        assert!(xml.contains("<title>Law &amp; Order &lt;SVU&gt;</title>"));
    }

    #[test]
    fn test_output_is_indented() {
        let mut document = GuideDocument::new();
        document.push_channel(
            XmlElement::new("channel")
                .with_attr("id", "1")
                .with_child(XmlElement::text_element("display-name", "4 WNBC")),
        );

        let xml = render(&document);
        assert!(xml.contains(
            "\n  <channel id=\"1\">\n    <display-name>4 WNBC</display-name>\n  </channel>"
        ));
    }

    #[test]
    fn test_element_accessors() {
        let element = XmlElement::new("programme")
            .with_attr("start", "202405011800 +0000")
            .with_child(XmlElement::text_element("category", "News"))
            .with_child(XmlElement::text_element("category", "Talk"))
            .with_child(XmlElement::new("New"));

        assert_eq!(element.attribute("start"), Some("202405011800 +0000"));
        assert_eq!(element.attribute("stop"), None);
        let categories: Vec<_> = element
            .children_named("category")
            .filter_map(XmlElement::text)
            .collect();
        assert_eq!(categories, vec!["News", "Talk"]);
        assert_eq!(element.children().len(), 3);
    }
}
