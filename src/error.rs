//! Central error types for the schema-driven form generator.
//!
//! Fehler-Taxonomie:
//! - Schema-Auflösung (`UnresolvedReference`, `RecursionLimit`, `OccursLimit`): betrifft nur
//!   einen Zweig, wird als Diagnose in der Session gesammelt.
//! - Validierung beim Serialisieren (`ValidationFailed`): kein Teil-Dokument.
//! - Netzwerk (`Network`): rohe Fehlermeldung, kein Retry.
//! - Population (`XmlParseError`, `RootMismatch`): bereits gesetzte Werte bleiben.

use core::fmt;

/// Art einer benannten Schema-Referenz (für `UnresolvedReference`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `type="..."` oder `base="..."`.
    Type,
    /// `<xs:group ref="..."/>`.
    Group,
    /// `<xs:attributeGroup ref="..."/>`.
    AttributeGroup,
    /// `<xs:element ref="..."/>`.
    Element,
    /// `<xs:attribute ref="..."/>`.
    Attribute,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Type => "type",
            Self::Group => "group",
            Self::AttributeGroup => "attributeGroup",
            Self::Element => "element",
            Self::Attribute => "attribute",
        })
    }
}

/// All errors raised while loading schemas, building and editing forms.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// XSD parsing failed.
    XsdParseError(String),
    /// XML parsing of a source document failed.
    XmlParseError(String),
    /// A named type/group/attributeGroup/element/attribute is not defined.
    ///
    /// Nur der betroffene Zweig wird übersprungen.
    UnresolvedReference { kind: ReferenceKind, name: String },
    /// Mandatory recursion exceeded the configured depth.
    RecursionLimit { element: String, depth: usize },
    /// `minOccurs` asks for more mandatory instances than the configured limit.
    OccursLimit { element: String, min: u32, limit: u32 },
    /// The schema declares no global element to build a form from.
    NoRootElement,
    /// The requested root element is not a global element of the schema.
    UnknownRootElement(String),
    /// A `FieldId` does not name a live field.
    UnknownField(u32),
    /// `add` was called on a field that is not an add control.
    NotAnAddControl(String),
    /// The field is not governed by an add control and cannot be removed.
    NotRemovable(String),
    /// Removing would drop the occurrence count below `minOccurs`.
    BelowMinOccurs { element: String, min: u32 },
    /// The field has no text slot (pure fieldset or add control).
    NoTextContent(String),
    /// The element has no attribute sub-field of that name.
    UnknownAttribute { element: String, attribute: String },
    /// The field or attribute is disabled (e.g. a fixed value).
    FieldDisabled(String),
    /// A select received a value outside its enumeration.
    InvalidOption { element: String, value: String },
    /// Required fields are still flagged invalid; nothing was serialized.
    ValidationFailed(Vec<String>),
    /// The source document's root does not match the form root.
    RootMismatch { expected: String, found: String },
    /// Invalid `FormOptions`.
    InvalidOptions(String),
    /// An IO error while reading input or writing XML.
    IoError(String),
    /// Fetching or storing over HTTP failed.
    Network(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XsdParseError(msg) => write!(f, "XSD parse error: {msg}"),
            Self::XmlParseError(msg) => write!(f, "XML parse error: {msg}"),
            Self::UnresolvedReference { kind, name } => {
                write!(f, "unresolved {kind} reference '{name}'")
            }
            Self::RecursionLimit { element, depth } => {
                write!(f, "recursion limit {depth} reached while expanding '{element}'")
            }
            Self::OccursLimit { element, min, limit } => {
                write!(f, "'{element}' requires {min} instances, limit is {limit}")
            }
            Self::NoRootElement => write!(f, "schema declares no global element"),
            Self::UnknownRootElement(name) => write!(f, "root element '{name}' is not declared globally"),
            Self::UnknownField(id) => write!(f, "unknown form field #{id}"),
            Self::NotAnAddControl(name) => write!(f, "field '{name}' is not an add control"),
            Self::NotRemovable(name) => write!(f, "field '{name}' cannot be removed"),
            Self::BelowMinOccurs { element, min } => {
                write!(f, "removing '{element}' would violate minOccurs={min}")
            }
            Self::NoTextContent(name) => write!(f, "field '{name}' has no text content"),
            Self::UnknownAttribute { element, attribute } => {
                write!(f, "element '{element}' has no attribute '{attribute}'")
            }
            Self::FieldDisabled(name) => write!(f, "field '{name}' is disabled"),
            Self::InvalidOption { element, value } => {
                write!(f, "value '{value}' is not an allowed option of '{element}'")
            }
            Self::ValidationFailed(fields) => {
                if fields.is_empty() {
                    write!(f, "form has invalid fields")
                } else {
                    write!(f, "form has invalid fields: {}", fields.join(", "))
                }
            }
            Self::RootMismatch { expected, found } => {
                write!(f, "document root '{found}' does not match form root '{expected}'")
            }
            Self::InvalidOptions(msg) => write!(f, "invalid options: {msg}"),
            Self::IoError(msg) => write!(f, "IO error: {msg}"),
            Self::Network(msg) => write!(f, "network error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Erstellt einen `UnresolvedReference` Fehler.
    pub fn unresolved(kind: ReferenceKind, name: impl Into<String>) -> Self {
        Self::UnresolvedReference { kind, name: name.into() }
    }

    /// Ob der Fehler nur einen Schema-Zweig betrifft (Diagnose statt Abbruch).
    pub fn is_branch_local(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedReference { .. } | Self::RecursionLimit { .. } | Self::OccursLimit { .. }
        )
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
