//! Form generation options.
//!
//! Ersetzt die früher global gelesene Sprachauswahl und die fest codierte
//! Ignore-Liste durch explizite Parameter.
//!
//! # Beispiel
//!
//! ```
//! use xsdform::options::FormOptions;
//!
//! let opts = FormOptions::default()
//!     .with_language("sv")
//!     .with_ignored_type("formattedNoteType")
//!     .with_root_element("ead");
//!
//! assert_eq!(opts.language(), Some("sv"));
//! assert!(opts.is_ignored("formattedNoteType"));
//! assert_eq!(opts.root_element(), Some("ead"));
//! ```

use crate::{Error, Result};

/// Namespace des EAD3-Schemas.
pub const EAD3_NS: &str = "http://ead3.archivists.org/schema/";

/// Default depth limit for mandatory recursion.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default upper bound for instances materialized from one `minOccurs`.
pub const DEFAULT_MAX_INSTANCES: u32 = 1000;

/// Options controlling how a schema is turned into a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormOptions {
    pub(crate) language: Option<String>,
    pub(crate) ignored_types: Vec<String>,
    pub(crate) root_element: Option<String>,
    pub(crate) root_namespace: Option<String>,
    pub(crate) strict: bool,
    pub(crate) max_depth: usize,
    pub(crate) max_instances: u32,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            language: None,
            ignored_types: Vec::new(),
            root_element: None,
            root_namespace: None,
            strict: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_instances: DEFAULT_MAX_INSTANCES,
        }
    }
}

impl FormOptions {
    /// Preset für EAD3: Root `ead` im EAD3-Namespace.
    pub fn ead3() -> Self {
        Self::default()
            .with_root_element("ead")
            .with_root_namespace(EAD3_NS)
    }

    // --- Getter ---

    /// UI language used to pick `xs:documentation` labels.
    pub fn language(&self) -> Option<&str> { self.language.as_deref() }
    /// Type, group and attributeGroup names skipped by the walker.
    pub fn ignored_types(&self) -> &[String] { &self.ignored_types }
    /// Global element the form is built for (None = first global element).
    pub fn root_element(&self) -> Option<&str> { self.root_element.as_deref() }
    /// Namespace declared on the serialized root (None = schema targetNamespace).
    pub fn root_namespace(&self) -> Option<&str> { self.root_namespace.as_deref() }
    /// Unresolved references abort generation instead of being collected.
    pub fn strict(&self) -> bool { self.strict }
    /// Maximum nesting level of instantiated fields.
    pub fn max_depth(&self) -> usize { self.max_depth }
    /// Maximum `minOccurs` the walker materializes up front.
    pub fn max_instances(&self) -> u32 { self.max_instances }

    /// Prüft ob ein Typname auf der Ignore-Liste steht.
    pub fn is_ignored(&self, type_name: &str) -> bool {
        self.ignored_types.iter().any(|t| t == type_name)
    }

    // --- Builder-Setter (Fluent API) ---

    /// Setzt die UI-Sprache.
    pub fn with_language(mut self, lang: impl Into<String>) -> Self { self.language = Some(lang.into()); self }
    /// Fügt einen Typnamen zur Ignore-Liste hinzu.
    pub fn with_ignored_type(mut self, name: impl Into<String>) -> Self { self.ignored_types.push(name.into()); self }
    /// Ersetzt die Ignore-Liste.
    pub fn with_ignored_types(mut self, names: Vec<String>) -> Self { self.ignored_types = names; self }
    /// Setzt das Root-Element.
    pub fn with_root_element(mut self, name: impl Into<String>) -> Self { self.root_element = Some(name.into()); self }
    /// Setzt den Root-Namespace.
    pub fn with_root_namespace(mut self, ns: impl Into<String>) -> Self { self.root_namespace = Some(ns.into()); self }
    /// Aktiviert Strict-Modus.
    pub fn with_strict(mut self) -> Self { self.strict = true; self }
    /// Setzt das Tiefenlimit.
    pub fn with_max_depth(mut self, depth: usize) -> Self { self.max_depth = depth; self }
    /// Setzt das Instanzlimit pro Element.
    pub fn with_max_instances(mut self, limit: u32) -> Self { self.max_instances = limit; self }

    // --- Mutable Setter ---

    /// Setzt die UI-Sprache.
    pub fn set_language(&mut self, lang: Option<String>) { self.language = lang; }
    /// Setzt Strict-Modus.
    pub fn set_strict(&mut self, val: bool) { self.strict = val; }
    /// Setzt den Root-Namespace.
    pub fn set_root_namespace(&mut self, ns: Option<String>) { self.root_namespace = ns; }

    /// Validates the option combination.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidOptions` if `max_depth` or `max_instances` is
    /// zero, or if an ignored type name or the root element name is empty.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::InvalidOptions("max_depth must be greater than zero".into()));
        }
        if self.max_instances == 0 {
            return Err(Error::InvalidOptions("max_instances must be greater than zero".into()));
        }
        if self.ignored_types.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::InvalidOptions("ignored type names must not be empty".into()));
        }
        if self.root_element.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(Error::InvalidOptions("root element name must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = FormOptions::default();
        assert_eq!(opts.language(), None);
        assert!(opts.ignored_types().is_empty());
        assert!(!opts.strict());
        assert_eq!(opts.max_depth(), DEFAULT_MAX_DEPTH);
        assert_eq!(opts.max_instances(), DEFAULT_MAX_INSTANCES);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn ead3_preset() {
        let opts = FormOptions::ead3();
        assert_eq!(opts.root_element(), Some("ead"));
        assert_eq!(opts.root_namespace(), Some(EAD3_NS));
    }

    #[test]
    fn zero_depth_rejected() {
        let err = FormOptions::default().with_max_depth(0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidOptions(_)));
    }

    #[test]
    fn zero_instance_limit_rejected() {
        let err = FormOptions::default().with_max_instances(0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidOptions(_)));
    }

    #[test]
    fn empty_ignored_name_rejected() {
        let err = FormOptions::default().with_ignored_type(" ").validate().unwrap_err();
        assert!(matches!(err, Error::InvalidOptions(_)));
    }

    #[test]
    fn mutable_setters() {
        let mut opts = FormOptions::default();
        opts.set_language(Some("en".into()));
        opts.set_strict(true);
        assert_eq!(opts.language(), Some("en"));
        assert!(opts.strict());
    }
}
