//! XML → Formular Population.
//!
//! Das Quelldokument wird mit quick-xml gestreamt. Jedes Element wird erst
//! in dem Moment aufgelöst, in dem der Reader es erreicht: die k-te lebende
//! Instanz mit diesem Tag unter dem aufgelösten Elternfeld, sonst wird das
//! passende Add-Control aktiviert, sonst wird der Knoten übersprungen.
//! Dadurch existieren Instanzen, die ein früheres Geschwister erst
//! materialisiert hat, bereits wenn spätere Elemente sie brauchen.

use std::fmt;

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{Error, Result};
use crate::form::FieldId;
use crate::session::FormSession;
use crate::FastHashMap;

/// Ergebnis einer Population.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateReport {
    /// Gesetzte Text- und Attributwerte.
    pub applied: usize,
    /// Durch Add-Controls materialisierte Instanzen.
    pub materialized: usize,
    pub skipped: Vec<SkippedNode>,
}

impl PopulateReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Ein Quellknoten ohne passendes Formularfeld.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedNode {
    /// Position im Quelldokument (`/ead/archdesc[1]/bogus[1]`, Attribute mit `/@name`).
    pub xpath: String,
    pub reason: String,
}

impl fmt::Display for SkippedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.xpath, self.reason)
    }
}

/// Offenes Quellelement.
struct Frame {
    /// None = Element (oder ein Vorfahre) wurde übersprungen.
    field: Option<FieldId>,
    xpath: String,
    /// Bisher gesehene Kinder pro Tag-Name.
    counts: FastHashMap<String, usize>,
    /// Laufendes Textsegment.
    text: String,
    /// Text vor dem ersten Kindelement; Some sobald ein Kind geöffnet wurde.
    lead: Option<String>,
    /// Text hinter aufgelösten Kindfeldern, in Dokumentreihenfolge.
    tails: Vec<(FieldId, String)>,
    /// Zuletzt aufgelöstes Kindfeld, neue Instanzen folgen direkt dahinter.
    last: Option<FieldId>,
}

impl Frame {
    fn new(field: Option<FieldId>, xpath: String) -> Self {
        Self {
            field,
            xpath,
            counts: FastHashMap::default(),
            text: String::new(),
            lead: None,
            tails: Vec::new(),
            last: None,
        }
    }

    /// Schließt das laufende Textsegment ab (vor einem Kind oder am Ende).
    ///
    /// Text hinter einem übersprungenen Kind hängt am zuletzt aufgelösten.
    fn end_segment(&mut self) {
        let segment = std::mem::take(&mut self.text);
        if self.lead.is_none() {
            self.lead = Some(segment);
            return;
        }
        match self.last {
            Some(last) => match self.tails.last_mut() {
                Some((id, tail)) if *id == last => tail.push_str(&segment),
                _ => self.tails.push((last, segment)),
            },
            None => {
                if let Some(lead) = self.lead.as_mut() {
                    lead.push_str(&segment);
                }
            }
        }
    }

    /// Mixed-Content-Segmente: außen getrimmt, innen unverändert.
    ///
    /// Besteht alles nur aus Whitespace (eingerückte Kinder), bleibt nichts.
    fn into_segments(mut self) -> (String, Vec<(FieldId, String)>) {
        self.end_segment();
        let mut lead = self.lead.unwrap_or_default();
        let mut tails = self.tails;
        if lead.trim().is_empty() && tails.iter().all(|(_, t)| t.trim().is_empty()) {
            return (String::new(), Vec::new());
        }
        lead = lead.trim_start().to_string();
        match tails.last_mut() {
            Some((_, tail)) => tail.truncate(tail.trim_end().len()),
            None => lead.truncate(lead.trim_end().len()),
        }
        (lead, tails)
    }
}

impl<'s> FormSession<'s> {
    /// Befüllt das Formular aus einem XML-Dokument.
    ///
    /// Unbekannte Elemente und Attribute werden übersprungen und im Report
    /// gelistet. Bei einem Parse-Fehler bleiben bereits gesetzte Werte erhalten.
    ///
    /// # Beispiel
    ///
    /// ```
    /// use xsdform::{FormOptions, FormSession};
    /// use xsdform::xsd::parse_xsd;
    ///
    /// let schema = parse_xsd(r#"
    ///     <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    ///         <xs:element name="list">
    ///             <xs:complexType><xs:sequence>
    ///                 <xs:element name="item" type="xs:string" maxOccurs="unbounded"/>
    ///             </xs:sequence></xs:complexType>
    ///         </xs:element>
    ///     </xs:schema>
    /// "#).unwrap();
    ///
    /// let mut session = FormSession::generate(&schema, FormOptions::default()).unwrap();
    /// let report = session.populate("<list><item>a</item><item>b</item></list>").unwrap();
    /// assert_eq!(report.materialized, 1);
    /// assert_eq!(report.applied, 2);
    /// ```
    pub fn populate(&mut self, xml: &str) -> Result<PopulateReport> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<Frame> = Vec::new();
        let mut report = PopulateReport::default();
        let mut seen_root = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    self.open(&e, &mut stack, &mut report, &mut seen_root)?;
                }
                Ok(Event::Empty(e)) => {
                    self.open(&e, &mut stack, &mut report, &mut seen_root)?;
                    self.close(&mut stack, &mut report);
                }
                Ok(Event::End(_)) => self.close(&mut stack, &mut report),
                Ok(Event::Text(e)) => {
                    if let Some(frame) = stack.last_mut() {
                        let raw = std::str::from_utf8(&e)
                            .map_err(|er| Error::XmlParseError(er.to_string()))?;
                        let text = unescape(raw).map_err(|er| Error::XmlParseError(er.to_string()))?;
                        frame.text.push_str(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(frame) = stack.last_mut() {
                        let raw = std::str::from_utf8(&e)
                            .map_err(|er| Error::XmlParseError(er.to_string()))?;
                        frame.text.push_str(raw);
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    let name = std::str::from_utf8(&e)
                        .map_err(|er| Error::XmlParseError(er.to_string()))?;
                    let resolved = resolve_reference(name).ok_or_else(|| {
                        Error::XmlParseError(format!("unknown entity reference '&{name};'"))
                    })?;
                    if let Some(frame) = stack.last_mut() {
                        frame.text.push_str(&resolved);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(Error::XmlParseError(format!(
                        "parse XML error at {}: {e}",
                        reader.error_position()
                    )));
                }
            }
        }

        if !stack.is_empty() {
            return Err(Error::XmlParseError("unexpected end of document".into()));
        }
        if !seen_root {
            return Err(Error::XmlParseError("document has no root element".into()));
        }
        log::debug!(
            "populated {} values, materialized {} instances, skipped {}",
            report.applied,
            report.materialized,
            report.skipped.len()
        );
        Ok(report)
    }

    fn open(
        &mut self,
        e: &BytesStart<'_>,
        stack: &mut Vec<Frame>,
        report: &mut PopulateReport,
        seen_root: &mut bool,
    ) -> Result<()> {
        let name = std::str::from_utf8(e.local_name().as_ref())
            .map_err(|er| Error::XmlParseError(er.to_string()))?
            .to_string();

        let (field, xpath) = match stack.last_mut() {
            None => {
                if *seen_root {
                    return Err(Error::XmlParseError(format!(
                        "second root element '{name}'"
                    )));
                }
                *seen_root = true;
                let root = self.root()?;
                let expected = self.field(root)?.xmlname.clone();
                if name != expected {
                    return Err(Error::RootMismatch { expected, found: name });
                }
                (Some(root), format!("/{name}"))
            }
            Some(parent) => {
                parent.end_segment();
                let count = parent.counts.entry(name.clone()).or_default();
                *count += 1;
                let nth = *count;
                let xpath = format!("{}/{name}[{nth}]", parent.xpath);
                let field = match parent.field {
                    Some(p) => self.resolve_child(p, &name, nth, parent.last, &xpath, report),
                    None => None,
                };
                if field.is_some() {
                    parent.last = field;
                }
                (field, xpath)
            }
        };

        if let Some(id) = field {
            if let Ok(node) = self.field_mut(id) {
                node.keep_empty = true;
                node.tail.clear();
            }
            self.apply_attributes(id, e, &xpath, report)?;
        }

        stack.push(Frame::new(field, xpath));
        Ok(())
    }

    fn close(&mut self, stack: &mut Vec<Frame>, report: &mut PopulateReport) {
        let Some(frame) = stack.pop() else { return };
        let Some(id) = frame.field else { return };
        if frame.lead.is_none() {
            let text = frame.text.trim();
            if !text.is_empty() {
                self.apply_text(id, text, &frame.xpath, report);
            }
            return;
        }

        let xpath = frame.xpath.clone();
        let (lead, tails) = frame.into_segments();
        let has_text_slot = self.field(id).is_ok_and(|n| n.text);
        if !has_text_slot {
            if !lead.is_empty() || !tails.is_empty() {
                let element = self.field(id).map(|n| n.xmlname.clone()).unwrap_or_default();
                skip(report, xpath, Error::NoTextContent(element).to_string());
            }
            return;
        }
        if !lead.is_empty() {
            self.apply_text(id, &lead, &xpath, report);
        }
        for (child, tail) in tails {
            if tail.is_empty() {
                continue;
            }
            if let Ok(node) = self.field_mut(child) {
                node.tail = tail;
                report.applied += 1;
            }
        }
    }

    fn apply_text(&mut self, id: FieldId, text: &str, xpath: &str, report: &mut PopulateReport) {
        let Ok(node) = self.field(id) else { return };
        if node.disabled && node.value == text {
            return;
        }
        match self.set_value(id, text) {
            Ok(()) => report.applied += 1,
            Err(e) => skip(report, xpath.to_string(), e.to_string()),
        }
    }

    /// k-te Instanz, sonst Add-Control aktivieren und die neue Instanz
    /// hinter `after` (dem zuletzt aufgelösten Geschwister) einfügen.
    fn resolve_child(
        &mut self,
        parent: FieldId,
        name: &str,
        nth: usize,
        after: Option<FieldId>,
        xpath: &str,
        report: &mut PopulateReport,
    ) -> Option<FieldId> {
        if let Some(id) = self.tree.nth_child(parent, name, nth) {
            return Some(id);
        }
        let Some(control) = self.find_add_control(parent, name) else {
            skip(report, xpath.to_string(), "no form field for element".into());
            return None;
        };
        match self.add_after(control, after) {
            Ok(Some(id)) => {
                report.materialized += 1;
                Some(id)
            }
            Ok(None) => {
                skip(report, xpath.to_string(), "occurrence limit reached or excluded by choice".into());
                None
            }
            Err(e) => {
                skip(report, xpath.to_string(), e.to_string());
                None
            }
        }
    }

    fn apply_attributes(
        &mut self,
        id: FieldId,
        e: &BytesStart<'_>,
        xpath: &str,
        report: &mut PopulateReport,
    ) -> Result<()> {
        for attr in e.attributes().with_checks(false) {
            let attr = attr.map_err(|er| Error::XmlParseError(er.to_string()))?;
            let key = attr.key.as_ref();
            if key == b"xmlns" || key.starts_with(b"xmlns:") {
                continue;
            }
            let local = std::str::from_utf8(attr.key.local_name().as_ref())
                .map_err(|er| Error::XmlParseError(er.to_string()))?
                .to_string();
            let name = match attr.key.prefix() {
                None => local,
                Some(p) if p.as_ref() == b"xml" => format!("xml:{local}"),
                Some(_) => {
                    log::debug!("namespaced attribute '{}' ignored", String::from_utf8_lossy(key));
                    continue;
                }
            };
            let raw = std::str::from_utf8(attr.value.as_ref())
                .map_err(|er| Error::XmlParseError(er.to_string()))?;
            let value = unescape(raw).map_err(|er| Error::XmlParseError(er.to_string()))?;

            let existing = self.field(id).ok().and_then(|n| n.attribute(&name)).map(|a| (a.disabled, a.value == value));
            match existing {
                None => skip(report, format!("{xpath}/@{name}"), "no form field for attribute".into()),
                Some((true, true)) => {
                    if let Ok(Some(attr)) = self.field_mut(id).map(|n| n.attribute_mut(&name)) {
                        attr.implied = false;
                    }
                }
                Some(_) => match self.set_attribute(id, &name, value.as_ref()) {
                    Ok(()) => report.applied += 1,
                    Err(e) => skip(report, format!("{xpath}/@{name}"), e.to_string()),
                },
            }
        }
        Ok(())
    }
}

fn skip(report: &mut PopulateReport, xpath: String, reason: String) {
    log::warn!("skipped {xpath}: {reason}");
    report.skipped.push(SkippedNode { xpath, reason });
}

/// Vordefinierte Entities und Zeichenreferenzen (`#65`, `#x41`).
fn resolve_reference(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    resolve_predefined_entity(name).map(str::to_string)
}
