//! xsdform – XML-Schema getriebener Formular-Generator
//!
//! Aus einem XSD wird ein virtueller Formular-Baum erzeugt, der editiert,
//! als XML serialisiert und aus bestehenden XML-Dokumenten befüllt werden kann.
//!
//! # Beispiel
//!
//! ```
//! use xsdform::{FormOptions, FormSession, form_to_xml};
//! use xsdform::xsd::parse_xsd;
//!
//! let schema = parse_xsd(r#"
//!     <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
//!         <xs:element name="did">
//!             <xs:complexType>
//!                 <xs:sequence>
//!                     <xs:element name="unittitle" type="xs:string"/>
//!                     <xs:element name="note" type="xs:string" minOccurs="0"/>
//!                 </xs:sequence>
//!             </xs:complexType>
//!         </xs:element>
//!     </xs:schema>
//! "#).unwrap();
//!
//! let mut session = FormSession::generate(&schema, FormOptions::default()).unwrap();
//! let title = session.find("unittitle").unwrap();
//! session.set_value(title, "Fonds A").unwrap();
//!
//! let xml = form_to_xml(&session).unwrap();
//! assert!(xml.ends_with("<did><unittitle>Fonds A</unittitle></did>"));
//! ```

pub mod error;
pub mod form;
pub mod interaction;
pub mod locator;
pub mod options;
pub mod populate;
#[cfg(feature = "remote")]
pub mod remote;
mod render;
pub mod schema;
pub mod session;
mod walker;
pub mod xml_serializer;
pub mod xsd;

pub use error::{Error, ReferenceKind, Result};

/// HashMap mit ahash (schneller, nicht DoS-resistent, nur für interne Datenstrukturen).
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// HashSet mit ahash.
pub(crate) type FastHashSet<K> = hashbrown::HashSet<K, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Schema
pub use schema::{MaxOccurs, Occurs, Schema, SchemaKind, SchemaNode, SchemaNodeId};
pub use xsd::{parse_xsd, parse_xsd_file};

// Public API: Formular
pub use form::{AttributeField, ChoiceGroupId, ChoiceTag, FieldId, FieldKind, FieldNode, FormTree};
pub use interaction::OccurrenceState;
pub use locator::Locator;
pub use options::FormOptions;
pub use session::FormSession;

// Public API: XML
pub use populate::{PopulateReport, SkippedNode};
pub use xml_serializer::{form_to_pretty_xml, form_to_xml, form_to_xml_writer};
