//! XLIFF 1.2 translation memory (one target language per file, with approval)

use quick_xml::Reader;
use quick_xml::events::{
    BytesStart,
    Event,
};

use super::DocumentError;
use super::xml;
use crate::store::{
    ENGLISH,
    EntryStore,
    Translation,
    TranslationEntry,
};

/// Default namespace of XLIFF 1.2.
const XLIFF_NAMESPACE: &str = "urn:oasis:names:tc:xliff:document:1.2";
/// `from` of the note holding the tooltip text.
const TOOLTIP_NOTE: &str = "tooltip";
/// `from` of the note holding the shortcut key text.
const SHORTCUT_NOTE: &str = "shortcut";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XliffDocument {
    /// `original` attribute of `<file>`, the application id.
    pub original: String,
    /// Stored in `product-version`; XLIFF has no `x-appversion`.
    pub app_version: Option<String>,
    pub source_language: String,
    pub target_language: String,
    pub units: Vec<XliffUnit>,
}

impl Default for XliffDocument {
    fn default() -> Self {
        Self {
            original: String::new(),
            app_version: None,
            source_language: ENGLISH.to_string(),
            target_language: ENGLISH.to_string(),
            units: Vec::new(),
        }
    }
}

/// A `<trans-unit>`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XliffUnit {
    pub id: String,
    pub source: String,
    pub target: Option<String>,
    pub approved: bool,
    pub comment: Option<String>,
    pub tooltip_text: Option<String>,
    pub shortcut_key_text: Option<String>,
    pub dynamic: bool,
}

impl XliffDocument {
    /// Builds the file for `language`; approval flags are carried per unit.
    #[must_use]
    pub fn from_entry_store(
        store: &EntryStore,
        original: &str,
        language: &str,
        app_version: Option<&str>,
    ) -> Self {
        let units = store
            .entries_sorted()
            .into_iter()
            .map(|entry| {
                let translation = (language != ENGLISH)
                    .then(|| entry.translation(language))
                    .flatten()
                    .filter(|t| t.is_translated());
                XliffUnit {
                    id: entry.id().to_string(),
                    source: entry.english_text.clone(),
                    target: translation.map(|t| t.text.clone()),
                    approved: translation.is_some_and(|t| t.approved),
                    comment: entry.comment.clone(),
                    tooltip_text: entry.tooltip_text.clone(),
                    shortcut_key_text: entry.shortcut_key_text.clone(),
                    dynamic: entry.dynamic,
                }
            })
            .collect();
        Self {
            original: original.to_string(),
            app_version: app_version.map(ToString::to_string),
            source_language: ENGLISH.to_string(),
            target_language: language.to_string(),
            units,
        }
    }

    #[must_use]
    pub fn to_entry_store(&self) -> EntryStore {
        let foreign_target = self.target_language != ENGLISH;
        self.units
            .iter()
            .map(|unit| {
                let mut entry = TranslationEntry::new(unit.id.clone(), unit.source.clone());
                entry.comment.clone_from(&unit.comment);
                entry.tooltip_text.clone_from(&unit.tooltip_text);
                entry.shortcut_key_text.clone_from(&unit.shortcut_key_text);
                entry.dynamic = unit.dynamic;
                if foreign_target && let Some(target) = &unit.target {
                    entry.translations.insert(
                        self.target_language.clone(),
                        Translation::new(target.clone(), unit.approved),
                    );
                }
                entry
            })
            .collect()
    }

    pub fn encode(&self) -> Result<Vec<u8>, DocumentError> {
        let mut writer = xml::new_writer()?;
        xml::start(&mut writer, "xliff", &[("version", "1.2"), ("xmlns", XLIFF_NAMESPACE)])?;

        let mut file_attributes = vec![
            ("original", self.original.as_str()),
            ("source-language", self.source_language.as_str()),
            ("target-language", self.target_language.as_str()),
            ("datatype", "plaintext"),
        ];
        if let Some(version) = &self.app_version {
            file_attributes.push(("product-version", version.as_str()));
        }
        xml::start(&mut writer, "file", &file_attributes)?;
        xml::start(&mut writer, "body", &[])?;
        for unit in &self.units {
            self.write_unit(&mut writer, unit)?;
        }
        xml::end(&mut writer, "body")?;
        xml::end(&mut writer, "file")?;
        xml::end(&mut writer, "xliff")?;
        Ok(writer.into_inner())
    }

    /// Writes one `<trans-unit>`.
    fn write_unit(&self, writer: &mut xml::XmlWriter, unit: &XliffUnit) -> Result<(), DocumentError> {
        let mut attributes = vec![("id", unit.id.as_str())];
        if unit.approved {
            attributes.push(("approved", "yes"));
        }
        if unit.dynamic {
            attributes.push(("dynamic", "yes"));
        }
        xml::start(writer, "trans-unit", &attributes)?;
        xml::text_element(
            writer,
            "source",
            &[("xml:lang", self.source_language.as_str())],
            &unit.source,
        )?;
        if let Some(target) = &unit.target {
            xml::text_element(
                writer,
                "target",
                &[("xml:lang", self.target_language.as_str())],
                target,
            )?;
        }
        if let Some(comment) = &unit.comment {
            xml::text_element(writer, "note", &[], comment)?;
        }
        if let Some(tooltip) = &unit.tooltip_text {
            xml::text_element(writer, "note", &[("from", TOOLTIP_NOTE)], tooltip)?;
        }
        if let Some(shortcut) = &unit.shortcut_key_text {
            xml::text_element(writer, "note", &[("from", SHORTCUT_NOTE)], shortcut)?;
        }
        xml::end(writer, "trans-unit")
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut parser = Parser::default();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => parser.start(&e)?,
                Ok(Event::Empty(e)) => {
                    parser.start(&e)?;
                    parser.end(&xml::local_name(&e))?;
                }
                Ok(Event::End(e)) => parser.end(e.local_name().as_ref())?,
                Ok(Event::Text(e)) => parser.text(&xml::unescape_text(&e)?),
                Ok(Event::CData(e)) => parser.text(&xml::cdata_text(&e)),
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(DocumentError::format(format!(
                        "XML error at byte {}: {e}",
                        reader.buffer_position()
                    )));
                }
            }
            buf.clear();
        }

        parser.finish()
    }
}

/// XLIFF boolean attribute value.
fn is_yes(value: Option<&str>) -> bool {
    matches!(value, Some("yes" | "true"))
}

/// Element whose text content is being collected.
#[derive(Debug)]
enum Capture {
    /// `<source>`
    Source,
    /// `<target>`
    Target,
    /// `<note>` with its `from`
    Note(Option<String>),
}

/// Event-driven XLIFF reader state.
#[derive(Debug, Default)]
struct Parser {
    /// Document built so far
    document: XliffDocument,
    /// `<xliff>` was opened
    seen_root: bool,
    /// `<file>` was opened
    seen_file: bool,
    /// Open element count
    depth: usize,
    /// Open `<trans-unit>`
    unit: Option<XliffUnit>,
    /// Element whose text is collected
    capture: Option<Capture>,
    /// Collected text
    text: String,
}

impl Parser {
    /// Handles an opening or self-closing tag.
    fn start(&mut self, element: &BytesStart<'_>) -> Result<(), DocumentError> {
        self.depth += 1;
        match element.local_name().as_ref() {
            b"xliff" => self.seen_root = true,
            b"file" => {
                if self.seen_file {
                    return Err(DocumentError::format("only one <file> per document is supported"));
                }
                self.seen_file = true;
                self.document.original = xml::attribute(element, "original")?.unwrap_or_default();
                if let Some(source) = xml::attribute(element, "source-language")? {
                    self.document.source_language = source;
                }
                self.document.target_language = xml::attribute(element, "target-language")?
                    .unwrap_or_else(|| self.document.source_language.clone());
                self.document.app_version = xml::attribute(element, "product-version")?;
            }
            b"trans-unit" => {
                let id = xml::required_attribute(element, "id")?;
                let approved = is_yes(xml::attribute(element, "approved")?.as_deref());
                let dynamic = is_yes(xml::attribute(element, "dynamic")?.as_deref());
                self.unit = Some(XliffUnit { id, approved, dynamic, ..XliffUnit::default() });
            }
            b"source" if self.unit.is_some() => self.begin_capture(Capture::Source),
            b"target" if self.unit.is_some() => self.begin_capture(Capture::Target),
            b"note" if self.unit.is_some() => {
                let from = xml::attribute(element, "from")?;
                self.begin_capture(Capture::Note(from));
            }
            _ => {}
        }
        Ok(())
    }

    /// Starts collecting text for `capture`.
    fn begin_capture(&mut self, capture: Capture) {
        self.text.clear();
        self.capture = Some(capture);
    }

    /// Appends character data while capturing.
    fn text(&mut self, text: &str) {
        if self.capture.is_some() {
            self.text.push_str(text);
        }
    }

    /// Handles a closing tag.
    fn end(&mut self, name: &[u8]) -> Result<(), DocumentError> {
        self.depth = self.depth.saturating_sub(1);
        match name {
            b"trans-unit" => {
                let unit = self
                    .unit
                    .take()
                    .ok_or_else(|| DocumentError::format("</trans-unit> without matching start"))?;
                self.document.units.push(unit);
            }
            b"source" | b"target" | b"note" => self.finish_capture(),
            _ => {}
        }
        Ok(())
    }

    /// Stores the collected text where the capture points.
    fn finish_capture(&mut self) {
        let (Some(capture), Some(unit)) = (self.capture.take(), self.unit.as_mut()) else {
            return;
        };
        let text = std::mem::take(&mut self.text);
        match capture {
            Capture::Source => unit.source = text,
            Capture::Target => unit.target = Some(text),
            Capture::Note(from) => match from.as_deref() {
                Some(TOOLTIP_NOTE) => unit.tooltip_text = Some(text),
                Some(SHORTCUT_NOTE) => unit.shortcut_key_text = Some(text),
                _ => unit.comment = Some(text),
            },
        }
    }

    /// Checks the document was complete.
    fn finish(self) -> Result<XliffDocument, DocumentError> {
        if !self.seen_root {
            return Err(DocumentError::format("missing <xliff> root element"));
        }
        if !self.seen_file {
            return Err(DocumentError::format("missing <file> element"));
        }
        if self.depth != 0 {
            return Err(DocumentError::format("unexpected end of document"));
        }
        Ok(self.document)
    }
}
