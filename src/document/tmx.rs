//! TMX 1.4 translation memory (many languages per unit, no approval state)

use std::collections::BTreeMap;

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

/// Header property carrying the application version.
const APP_VERSION_PROP: &str = "x-appversion";
/// Unit property marking a runtime-registered string.
const DYNAMIC_PROP: &str = "x-dynamic";
/// Unit property holding the tooltip text.
const TOOLTIP_PROP: &str = "x-tooltip";
/// Unit property holding the shortcut key text.
const SHORTCUT_PROP: &str = "x-shortcut";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TmxDocument {
    pub app_version: Option<String>,
    pub units: Vec<TmxUnit>,
}

/// A `<tu>`: one id with a text per language.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TmxUnit {
    pub id: String,
    pub comment: Option<String>,
    pub tooltip_text: Option<String>,
    pub shortcut_key_text: Option<String>,
    pub dynamic: bool,
    /// Language code → segment text. `en` is the source.
    pub variants: BTreeMap<String, String>,
}

impl TmxDocument {
    /// Builds the document for one language file; `en` is always included.
    #[must_use]
    pub fn from_entry_store(store: &EntryStore, language: &str, app_version: Option<&str>) -> Self {
        let units = store
            .entries_sorted()
            .into_iter()
            .map(|entry| {
                let mut variants = BTreeMap::new();
                if !entry.english_text.is_empty() {
                    variants.insert(ENGLISH.to_string(), entry.english_text.clone());
                }
                if language != ENGLISH
                    && let Some(translation) = entry.translation(language)
                    && translation.is_translated()
                {
                    variants.insert(language.to_string(), translation.text.clone());
                }
                TmxUnit {
                    id: entry.id().to_string(),
                    comment: entry.comment.clone(),
                    tooltip_text: entry.tooltip_text.clone(),
                    shortcut_key_text: entry.shortcut_key_text.clone(),
                    dynamic: entry.dynamic,
                    variants,
                }
            })
            .collect();
        Self { app_version: app_version.map(ToString::to_string), units }
    }

    /// Every non-empty translation is treated as approved.
    #[must_use]
    pub fn to_entry_store(&self) -> EntryStore {
        self.units
            .iter()
            .map(|unit| {
                let english = unit.variants.get(ENGLISH).cloned().unwrap_or_default();
                let mut entry = TranslationEntry::new(unit.id.clone(), english);
                entry.comment.clone_from(&unit.comment);
                entry.tooltip_text.clone_from(&unit.tooltip_text);
                entry.shortcut_key_text.clone_from(&unit.shortcut_key_text);
                entry.dynamic = unit.dynamic;
                for (language, text) in &unit.variants {
                    if language != ENGLISH {
                        entry
                            .translations
                            .insert(language.clone(), Translation::new(text.clone(), !text.is_empty()));
                    }
                }
                entry
            })
            .collect()
    }

    pub fn encode(&self) -> Result<Vec<u8>, DocumentError> {
        let mut writer = xml::new_writer()?;
        xml::start(&mut writer, "tmx", &[("version", "1.4")])?;
        xml::start(
            &mut writer,
            "header",
            &[
                ("creationtool", env!("CARGO_PKG_NAME")),
                ("creationtoolversion", env!("CARGO_PKG_VERSION")),
                ("segtype", "block"),
                ("o-tmf", "tm-l10n"),
                ("adminlang", ENGLISH),
                ("srclang", ENGLISH),
                ("datatype", "plaintext"),
            ],
        )?;
        if let Some(version) = &self.app_version {
            xml::text_element(&mut writer, "prop", &[("type", APP_VERSION_PROP)], version)?;
        }
        xml::end(&mut writer, "header")?;

        xml::start(&mut writer, "body", &[])?;
        for unit in &self.units {
            write_unit(&mut writer, unit)?;
        }
        xml::end(&mut writer, "body")?;
        xml::end(&mut writer, "tmx")?;
        Ok(writer.into_inner())
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

/// Writes one `<tu>`.
fn write_unit(writer: &mut xml::XmlWriter, unit: &TmxUnit) -> Result<(), DocumentError> {
    xml::start(writer, "tu", &[("tuid", unit.id.as_str())])?;
    if let Some(comment) = &unit.comment {
        xml::text_element(writer, "note", &[], comment)?;
    }
    if unit.dynamic {
        xml::text_element(writer, "prop", &[("type", DYNAMIC_PROP)], "true")?;
    }
    if let Some(tooltip) = &unit.tooltip_text {
        xml::text_element(writer, "prop", &[("type", TOOLTIP_PROP)], tooltip)?;
    }
    if let Some(shortcut) = &unit.shortcut_key_text {
        xml::text_element(writer, "prop", &[("type", SHORTCUT_PROP)], shortcut)?;
    }
    for (language, text) in &unit.variants {
        xml::start(writer, "tuv", &[("xml:lang", language.as_str())])?;
        xml::text_element(writer, "seg", &[], text)?;
        xml::end(writer, "tuv")?;
    }
    xml::end(writer, "tu")
}

/// Element whose text content is being collected.
#[derive(Debug)]
enum Capture {
    /// `<note>` of a unit
    Note,
    /// `<prop>` with its `type`
    Prop(String),
    /// `<seg>` of a variant
    Seg,
}

/// Event-driven TMX reader state.
#[derive(Debug, Default)]
struct Parser {
    /// Document built so far
    document: TmxDocument,
    /// `<tmx>` was opened
    seen_root: bool,
    /// Open element count
    depth: usize,
    /// Inside `<header>`
    in_header: bool,
    /// Open `<tu>`
    unit: Option<TmxUnit>,
    /// Language of the open `<tuv>`
    variant_language: Option<String>,
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
            b"tmx" => self.seen_root = true,
            b"header" => self.in_header = true,
            b"tu" => {
                let id = xml::required_attribute(element, "tuid")?;
                self.unit = Some(TmxUnit { id, ..TmxUnit::default() });
            }
            b"tuv" => {
                let language = xml::language_attribute(element)?
                    .ok_or_else(|| DocumentError::format("<tuv> is missing 'xml:lang'"))?;
                self.variant_language = Some(language);
            }
            b"note" if self.unit.is_some() => self.begin_capture(Capture::Note),
            b"seg" if self.variant_language.is_some() => self.begin_capture(Capture::Seg),
            b"prop" => {
                let kind = xml::attribute(element, "type")?.unwrap_or_default();
                self.begin_capture(Capture::Prop(kind));
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
            b"header" => self.in_header = false,
            b"tu" => {
                let unit = self
                    .unit
                    .take()
                    .ok_or_else(|| DocumentError::format("</tu> without matching <tu>"))?;
                self.document.units.push(unit);
            }
            b"tuv" => self.variant_language = None,
            b"note" | b"seg" | b"prop" => self.finish_capture(),
            _ => {}
        }
        Ok(())
    }

    /// Stores the collected text where the capture points.
    fn finish_capture(&mut self) {
        let Some(capture) = self.capture.take() else {
            return;
        };
        let text = std::mem::take(&mut self.text);
        match capture {
            Capture::Prop(kind) if self.in_header => {
                if kind == APP_VERSION_PROP {
                    self.document.app_version = Some(text);
                }
            }
            Capture::Prop(kind) => {
                if let Some(unit) = self.unit.as_mut() {
                    match kind.as_str() {
                        DYNAMIC_PROP => unit.dynamic = text.trim() == "true",
                        TOOLTIP_PROP => unit.tooltip_text = Some(text),
                        SHORTCUT_PROP => unit.shortcut_key_text = Some(text),
                        _ => {}
                    }
                }
            }
            Capture::Note => {
                if let Some(unit) = self.unit.as_mut() {
                    unit.comment = Some(text);
                }
            }
            Capture::Seg => {
                if let (Some(unit), Some(language)) =
                    (self.unit.as_mut(), self.variant_language.clone())
                {
                    unit.variants.insert(language, text);
                }
            }
        }
    }

    /// Checks the document was complete.
    fn finish(self) -> Result<TmxDocument, DocumentError> {
        if !self.seen_root {
            return Err(DocumentError::format("missing <tmx> root element"));
        }
        if self.depth != 0 {
            return Err(DocumentError::format("unexpected end of document"));
        }
        Ok(self.document)
    }
}
