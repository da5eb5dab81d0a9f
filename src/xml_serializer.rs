//! Formular → XML Serialisierung.
//!
//! Traversiert den Formular-Baum in Dokumentreihenfolge und schreibt pro
//! Feld ein Element mit seinem `xmlname`, die nicht-leeren Attribute und
//! den Textwert. Add-Controls erzeugen nichts.
//!
//! Drei APIs:
//! - `form_to_xml()`: gibt XML als String zurueck (Convenience).
//! - `form_to_pretty_xml()`: wie oben, mit Einrueckung (2 Spaces).
//! - `form_to_xml_writer()`: streamt XML direkt in `impl Write`.
//!
//! Vor dem Schreiben wird geprueft, ob Felder als ungueltig markiert sind;
//! dann wird nichts geschrieben (`Error::ValidationFailed`).

use std::io::Write;

use crate::error::Error;
use crate::form::{FieldId, FieldNode};
use crate::session::FormSession;
use crate::Result;

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Serialisiert das Formular als XML-String.
pub fn form_to_xml(session: &FormSession<'_>) -> Result<String> {
    let mut buf = Vec::new();
    form_to_xml_writer(session, &mut buf, None)?;
    String::from_utf8(buf).map_err(|_| Error::IoError("XML output is not valid UTF-8".into()))
}

/// Serialisiert das Formular als pretty-printed XML-String (2 Spaces Einzug).
pub fn form_to_pretty_xml(session: &FormSession<'_>) -> Result<String> {
    let mut buf = Vec::new();
    form_to_xml_writer(session, &mut buf, Some(2))?;
    String::from_utf8(buf).map_err(|_| Error::IoError("XML output is not valid UTF-8".into()))
}

/// Serialisiert das Formular direkt in einen Writer.
///
/// `indent = Some(n)` rueckt Kind-Elemente um `n` Spaces pro Ebene ein.
pub fn form_to_xml_writer(
    session: &FormSession<'_>,
    writer: impl Write,
    indent: Option<usize>,
) -> Result<()> {
    check_valid(session)?;
    let root = session.root()?;
    let mut ser = FormXmlSerializer { session, writer, indent };
    w(&mut ser.writer, XML_DECL)?;
    if ser.indent.is_some() {
        w(&mut ser.writer, "\n")?;
    }
    ser.write_element(root, 0)?;
    if ser.indent.is_some() {
        w(&mut ser.writer, "\n")?;
    }
    ser.writer.flush().map_err(io_err)
}

/// Ob ein Feld (bzw. sein Teilbaum) serialisiert wird.
///
/// Ein Element erscheint, wenn es Wurzel oder Pflicht ist, aus einem
/// Quelldokument stammt, oder Inhalt hat (Text, Attribut oder ein
/// serialisiertes Kind). Leere optionale Instanzen entfallen.
pub fn is_emitted(session: &FormSession<'_>, id: FieldId) -> bool {
    let tree = session.tree();
    let Some(node) = tree.get(id) else {
        return false;
    };
    if node.is_add_control() {
        return false;
    }
    tree.root() == Some(id)
        || node.required
        || node.keep_empty
        || has_own_content(node)
        || node.children().iter().any(|&c| {
            is_emitted(session, c) || tree.get(c).is_some_and(|n| !n.tail.trim().is_empty())
        })
}

fn has_own_content(node: &FieldNode) -> bool {
    (node.text && !node.value.trim().is_empty()) || node.attributes.iter().any(|a| a.is_emitted())
}

/// Bricht ab, wenn `validate()` Felder markiert hat.
fn check_valid(session: &FormSession<'_>) -> Result<()> {
    let invalid = session.invalid_fields();
    if invalid.is_empty() {
        return Ok(());
    }
    let tree = session.tree();
    let paths = invalid
        .into_iter()
        .filter_map(|id| {
            let node = tree.get(id)?;
            let xpath = tree.locator(id)?.xpath;
            Some(if node.invalid {
                vec![xpath]
            } else {
                node.attributes
                    .iter()
                    .filter(|a| a.invalid)
                    .map(|a| format!("{xpath}/@{}", a.name))
                    .collect()
            })
        })
        .flatten()
        .collect();
    Err(Error::ValidationFailed(paths))
}

// ============================================================================
// Hilfsfunktionen
// ============================================================================

/// io::Error → Error Konvertierung.
fn io_err(e: std::io::Error) -> Error {
    Error::IoError(e.to_string())
}

/// Schreibt einen String als Bytes in den Writer.
#[inline]
fn w(writer: &mut impl Write, s: &str) -> Result<()> {
    writer.write_all(s.as_bytes()).map_err(io_err)
}

/// XML-Escaping mit memchr3: grosse Bloecke ohne Escape-Zeichen werden in
/// einem Stueck geschrieben.
fn write_escaped(
    writer: &mut impl Write,
    s: &str,
    needle: [u8; 3],
    replacement: [&[u8]; 3],
) -> Result<()> {
    let bytes = s.as_bytes();
    let mut start = 0;
    while let Some(offset) = memchr::memchr3(needle[0], needle[1], needle[2], &bytes[start..]) {
        let pos = start + offset;
        writer.write_all(&bytes[start..pos]).map_err(io_err)?;
        let idx = needle.iter().position(|&n| n == bytes[pos]).unwrap_or(0);
        writer.write_all(replacement[idx]).map_err(io_err)?;
        start = pos + 1;
    }
    writer.write_all(&bytes[start..]).map_err(io_err)
}

/// Text-Inhalt: & < > → &amp; &lt; &gt;
fn write_escaped_text(writer: &mut impl Write, s: &str) -> Result<()> {
    write_escaped(writer, s, [b'&', b'<', b'>'], [b"&amp;", b"&lt;", b"&gt;"])
}

/// Attribut-Werte: & < " → &amp; &lt; &quot;
fn write_escaped_attr(writer: &mut impl Write, s: &str) -> Result<()> {
    write_escaped(writer, s, [b'&', b'<', b'"'], [b"&amp;", b"&lt;", b"&quot;"])
}

// ============================================================================
// FormXmlSerializer
// ============================================================================

struct FormXmlSerializer<'a, 's, W: Write> {
    session: &'a FormSession<'s>,
    writer: W,
    indent: Option<usize>,
}

impl<W: Write> FormXmlSerializer<'_, '_, W> {
    fn write_indent(&mut self, depth: usize) -> Result<()> {
        if let Some(width) = self.indent {
            w(&mut self.writer, "\n")?;
            for _ in 0..depth * width {
                w(&mut self.writer, " ")?;
            }
        }
        Ok(())
    }

    fn write_element(&mut self, id: FieldId, depth: usize) -> Result<()> {
        let session = self.session;
        let tree = session.tree();
        let Some(node) = tree.get(id) else {
            return Ok(());
        };

        w(&mut self.writer, "<")?;
        w(&mut self.writer, &node.xmlname)?;
        if depth == 0
            && let Some(ns) = session.root_namespace()
        {
            w(&mut self.writer, " xmlns=\"")?;
            write_escaped_attr(&mut self.writer, ns)?;
            w(&mut self.writer, "\"")?;
        }
        for attr in node.attributes.iter().filter(|a| a.is_emitted()) {
            w(&mut self.writer, " ")?;
            w(&mut self.writer, &attr.name)?;
            w(&mut self.writer, "=\"")?;
            write_escaped_attr(&mut self.writer, &attr.value)?;
            w(&mut self.writer, "\"")?;
        }

        // (Kind, wird geschrieben, Text dahinter)
        let parts: Vec<(FieldId, bool, &str)> = node
            .children()
            .iter()
            .filter_map(|&c| {
                let child = tree.get(c)?;
                if child.is_add_control() {
                    return None;
                }
                let emitted = is_emitted(session, c);
                (emitted || !child.tail.is_empty()).then_some((c, emitted, child.tail.as_str()))
            })
            .collect();
        let has_text = node.text && !node.value.is_empty();
        // Mixed Content bleibt kompakt, sonst verschiebt sich der Text.
        let compact = has_text || parts.iter().any(|&(_, _, tail)| !tail.is_empty());

        if parts.is_empty() && !has_text {
            return w(&mut self.writer, "/>");
        }
        w(&mut self.writer, ">")?;
        if has_text {
            write_escaped_text(&mut self.writer, &node.value)?;
        }
        for &(child, emitted, tail) in &parts {
            if emitted {
                if !compact {
                    self.write_indent(depth + 1)?;
                }
                self.write_element(child, depth + 1)?;
            }
            write_escaped_text(&mut self.writer, tail)?;
        }
        if !compact && !parts.is_empty() {
            self.write_indent(depth)?;
        }
        w(&mut self.writer, "</")?;
        w(&mut self.writer, &node.xmlname)?;
        w(&mut self.writer, ">")
    }
}
