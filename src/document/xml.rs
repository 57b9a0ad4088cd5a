//! Thin helpers over `quick_xml` shared by both document formats

use std::borrow::Cow;

use quick_xml::Writer;
use quick_xml::events::{
    BytesCData,
    BytesDecl,
    BytesEnd,
    BytesStart,
    BytesText,
    Event,
};

use super::DocumentError;

/// In-memory document writer.
pub(super) type XmlWriter = Writer<Vec<u8>>;

/// Creates an indenting writer with the XML declaration already written.
pub(super) fn new_writer() -> Result<XmlWriter, DocumentError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    Ok(writer)
}

/// Writes one event, mapping the writer error.
fn write(writer: &mut XmlWriter, event: Event<'_>) -> Result<(), DocumentError> {
    writer.write_event(event).map_err(|e| DocumentError::Encode(e.to_string()))
}

/// Writes an opening tag.
pub(super) fn start(
    writer: &mut XmlWriter,
    name: &str,
    attributes: &[(&str, &str)],
) -> Result<(), DocumentError> {
    write(writer, Event::Start(BytesStart::new(name).with_attributes(attributes.iter().copied())))
}

/// Writes a closing tag.
pub(super) fn end(writer: &mut XmlWriter, name: &str) -> Result<(), DocumentError> {
    write(writer, Event::End(BytesEnd::new(name)))
}

/// Writes `<name attrs>text</name>`.
///
/// Empty text is written as a self-closing tag so that indentation never
/// ends up inside the element.
pub(super) fn text_element(
    writer: &mut XmlWriter,
    name: &str,
    attributes: &[(&str, &str)],
    text: &str,
) -> Result<(), DocumentError> {
    let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
    if text.is_empty() {
        return write(writer, Event::Empty(element));
    }
    write(writer, Event::Start(element))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    end(writer, name)
}

/// Reads an attribute by qualified name, unescaping its value.
pub(super) fn attribute(
    element: &BytesStart<'_>,
    name: &str,
) -> Result<Option<String>, DocumentError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| DocumentError::format(e.to_string()))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr.unescape_value().map_err(|e| DocumentError::format(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Reads an attribute that the format requires.
pub(super) fn required_attribute(
    element: &BytesStart<'_>,
    name: &str,
) -> Result<String, DocumentError> {
    attribute(element, name)?.ok_or_else(|| {
        DocumentError::format(format!(
            "<{}> is missing the '{name}' attribute",
            String::from_utf8_lossy(element.name().as_ref())
        ))
    })
}

/// Language attribute, accepting both `xml:lang` and a bare `lang`.
pub(super) fn language_attribute(element: &BytesStart<'_>) -> Result<Option<String>, DocumentError> {
    match attribute(element, "xml:lang")? {
        Some(lang) => Ok(Some(lang)),
        None => attribute(element, "lang"),
    }
}

/// Character data with entities resolved.
pub(super) fn unescape_text(text: &BytesText<'_>) -> Result<String, DocumentError> {
    text.unescape().map(Cow::into_owned).map_err(|e| DocumentError::format(e.to_string()))
}

/// Raw `CDATA` content.
pub(super) fn cdata_text(cdata: &BytesCData<'_>) -> String {
    String::from_utf8_lossy(cdata).into_owned()
}

/// Element name without namespace prefix.
pub(super) fn local_name(element: &BytesStart<'_>) -> Vec<u8> {
    element.local_name().as_ref().to_vec()
}
