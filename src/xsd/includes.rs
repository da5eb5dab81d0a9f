//! Datei-basiertes Laden mit `xs:include` / `xs:import` Auflösung.
//!
//! Alle eingebundenen Schemas landen in derselben [`Schema`]-Arena; globale
//! Namen werden per Local-Name indiziert (erste Definition gewinnt).

use std::path::{Path, PathBuf};

use roxmltree::Node;

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::FastHashSet;

use super::{convert_global, parse_document, schema_root, xs_children};

/// Parsed ein XSD-Dokument von Platte mit Include/Import-Auflösung.
///
/// Relative Pfade in `schemaLocation` werden vom Verzeichnis des jeweiligen
/// Schemas aufgelöst. Zirkuläre Includes werden erkannt und übersprungen,
/// entfernte Locations (`http://...`) werden mit Warnung ignoriert.
///
/// # Beispiel
///
/// ```no_run
/// use std::path::Path;
/// use xsdform::xsd::parse_xsd_file;
///
/// let schema = parse_xsd_file(Path::new("ead3.xsd")).unwrap();
/// ```
pub fn parse_xsd_file(xsd_path: &Path) -> Result<Schema> {
    let mut ctx = IncludeContext { schema: Schema::new(None), loaded: FastHashSet::default() };
    ctx.load(xsd_path)?;
    Ok(ctx.schema)
}

/// Ladezustand über alle eingebundenen Dateien.
struct IncludeContext {
    schema: Schema,
    /// Bereits geladene Dateien (kanonische Pfade).
    loaded: FastHashSet<PathBuf>,
}

impl IncludeContext {
    fn load(&mut self, schema_path: &Path) -> Result<()> {
        let canonical = schema_path.canonicalize().map_err(|e| {
            Error::XsdParseError(format!(
                "Cannot resolve schema path '{}': {e}",
                schema_path.display()
            ))
        })?;

        // Bereits besucht? → Skip
        if !self.loaded.insert(canonical.clone()) {
            log::debug!("schema '{}' already loaded", canonical.display());
            return Ok(());
        }

        let content = std::fs::read_to_string(&canonical).map_err(|e| {
            Error::XsdParseError(format!("Cannot read schema '{}': {e}", schema_path.display()))
        })?;

        let doc = parse_document(&content)?;
        let root = schema_root(&doc)?;
        self.schema
            .set_target_namespace(root.attribute("targetNamespace").map(str::to_string));

        let schema_dir = canonical.parent().unwrap_or(Path::new(".")).to_path_buf();

        for child in xs_children(root) {
            match child.tag_name().name() {
                "include" | "import" | "redefine" => self.load_location(&child, &schema_dir)?,
                _ => convert_global(&mut self.schema, child)?,
            }
        }

        Ok(())
    }

    fn load_location(&mut self, node: &Node, schema_dir: &Path) -> Result<()> {
        let Some(location) = node.attribute("schemaLocation") else {
            log::debug!("xs:{} without schemaLocation skipped", node.tag_name().name());
            return Ok(());
        };
        if is_remote(location) {
            log::warn!("remote schemaLocation '{location}' skipped");
            return Ok(());
        }
        self.load(&schema_dir.join(location))
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}
