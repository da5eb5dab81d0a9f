//! XSD Schema Loader.
//!
//! Parsed XML Schema (XSD) Dokumente via `roxmltree` in die
//! [`Schema`]-Arena. Das Schema wird einmal geladen und danach nur noch
//! gelesen (Lebensdauer = Editier-Session).
//!
//! # Scope
//!
//! - element, complexType, simpleType, sequence, choice, all, group,
//!   attribute, attributeGroup, simpleContent, complexContent, extension,
//!   restriction, enumeration, any, anyAttribute
//! - `xs:annotation`: Dokumentation pro Sprache, Hinweise
//!   `<disabled>`/`<hidden>`/`<noinputfield>`
//!
//! # Out of Scope
//!
//! - Identity Constraints (key/keyref/unique), Notations
//! - Facetten außer `enumeration`
//!
//! **Hinweis:** `xs:include`/`xs:import` werden nur über [`parse_xsd_file()`]
//! aufgelöst.

mod includes;

pub use includes::parse_xsd_file;

use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{Error, Result};
use crate::schema::{
    Documentation, MaxOccurs, Occurs, Schema, SchemaKind, SchemaNode, SchemaNodeId, TypeRef,
    XML_NS, XS_NS,
};

/// Maximale Größe eines XSD-Dokuments (16 MiB).
const MAX_XSD_SIZE: usize = 16 * 1024 * 1024;

/// Parsed ein XSD-Dokument zu einem [`Schema`].
///
/// # Beispiel
///
/// ```
/// use xsdform::xsd::parse_xsd;
///
/// let xsd = r#"
///     <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
///         <xs:element name="title" type="xs:string"/>
///     </xs:schema>
/// "#;
///
/// let schema = parse_xsd(xsd).unwrap();
/// assert!(schema.global_element("title").is_some());
/// ```
pub fn parse_xsd(xsd_content: &str) -> Result<Schema> {
    let doc = parse_document(xsd_content)?;
    let root = schema_root(&doc)?;

    let mut schema = Schema::new(None);
    schema.set_target_namespace(root.attribute("targetNamespace").map(str::to_string));

    for child in xs_children(root) {
        match child.tag_name().name() {
            "include" | "import" | "redefine" => {
                log::warn!(
                    "xs:{} '{}' ignored (use parse_xsd_file to resolve schema locations)",
                    child.tag_name().name(),
                    child.attribute("schemaLocation").unwrap_or("")
                );
            }
            _ => convert_global(&mut schema, child)?,
        }
    }

    Ok(schema)
}

/// Parsed den XML-Text eines XSD mit Größenbeschränkung.
pub(crate) fn parse_document(xsd_content: &str) -> Result<Document<'_>> {
    if xsd_content.len() > MAX_XSD_SIZE {
        return Err(Error::XsdParseError(format!(
            "XSD document too large: {} bytes (max {} bytes)",
            xsd_content.len(),
            MAX_XSD_SIZE
        )));
    }

    let xml_opts = ParsingOptions { allow_dtd: true, ..Default::default() };
    Document::parse_with_options(xsd_content, xml_opts)
        .map_err(|e| Error::XsdParseError(format!("XML: {e}")))
}

/// Prüft ob root ein xs:schema Element ist (Name UND Namespace).
pub(crate) fn schema_root<'a, 'input>(doc: &'a Document<'input>) -> Result<Node<'a, 'input>> {
    let root = doc.root_element();
    if root.tag_name().name() != "schema" || root.tag_name().namespace() != Some(XS_NS) {
        return Err(Error::XsdParseError("Root element must be xs:schema".to_string()));
    }
    Ok(root)
}

/// Element-Kinder im XSD-Namespace.
pub(crate) fn xs_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(|n| n.is_element() && n.tag_name().namespace() == Some(XS_NS))
}

/// Konvertiert eine Top-Level-Komponente und registriert sie global.
pub(crate) fn convert_global(schema: &mut Schema, node: Node) -> Result<()> {
    if node.tag_name().name() == "annotation" {
        return Ok(());
    }
    let root = schema.root();
    if let Some(id) = convert_node(schema, node, root)?
        && !schema.register_global(id)
    {
        log::debug!(
            "global xs:{} '{}' not registered (unnamed or duplicate)",
            node.tag_name().name(),
            node.attribute("name").unwrap_or("")
        );
    }
    Ok(())
}

fn convert_node(schema: &mut Schema, node: Node, parent: SchemaNodeId) -> Result<Option<SchemaNodeId>> {
    let Some(kind) = SchemaKind::from_local_name(node.tag_name().name()) else {
        log::debug!("skipping unsupported xs:{}", node.tag_name().name());
        return Ok(None);
    };

    let mut sn = SchemaNode::new(kind);
    sn.name = node.attribute("name").map(str::to_string);
    sn.type_ref = node.attribute("type").map(|v| resolve_qname(v, &node)).transpose()?;
    sn.reference = node.attribute("ref").map(|v| resolve_qname(v, &node)).transpose()?;
    sn.base = node.attribute("base").map(|v| resolve_qname(v, &node)).transpose()?;
    sn.occurs = parse_occurs(&node)?;
    sn.fixed = node.attribute("fixed").map(str::to_string);
    sn.default = node.attribute("default").map(str::to_string);
    sn.value = node.attribute("value").map(str::to_string);
    match node.attribute("use") {
        Some("required") => sn.required = true,
        Some("prohibited") => sn.prohibited = true,
        _ => {}
    }
    sn.mixed = matches!(node.attribute("mixed"), Some("true" | "1"));

    let id = schema.push(sn, parent);

    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().namespace() != Some(XS_NS) {
            continue;
        }
        if child.tag_name().name() == "annotation" {
            read_annotation(schema.node_mut(id), child);
        } else {
            convert_node(schema, child, id)?;
        }
    }

    Ok(Some(id))
}

/// Liest Dokumentation und Hinweis-Tags aus einer `xs:annotation`.
fn read_annotation(target: &mut SchemaNode, annotation: Node) {
    for node in annotation.descendants().filter(|n| n.is_element()) {
        let name = node.tag_name().name();
        if node.tag_name().namespace() == Some(XS_NS) {
            if name == "documentation" {
                let raw: String = node
                    .descendants()
                    .filter(|n| n.is_text())
                    .filter_map(|n| n.text())
                    .collect();
                let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
                target.documentation.push(Documentation {
                    lang: node.attribute((XML_NS, "lang")).map(str::to_string),
                    text,
                });
            }
            continue;
        }
        match name.to_ascii_lowercase().as_str() {
            "disabled" => target.hints.disabled = true,
            "hidden" => target.hints.hidden = true,
            "noinputfield" => target.hints.no_input_field = true,
            _ => {}
        }
    }
}

/// Löst einen QName-String aus Attributwerten auf (type, ref, base).
///
/// Der Prefix "xml" ist implizit immer definiert. Unprefixed Namen erhalten
/// den Default-Namespace des Knotens; ist das der XSD-Namespace, gilt der
/// Name als Built-in.
fn resolve_qname(qname_str: &str, node: &Node) -> Result<TypeRef> {
    if let Some((prefix, local)) = qname_str.split_once(':') {
        if prefix == "xml" {
            return Ok(TypeRef { local_name: local.to_string(), namespace: Some(XML_NS.to_string()) });
        }
        let ns = node.lookup_namespace_uri(Some(prefix)).ok_or_else(|| {
            Error::XsdParseError(format!("Unknown prefix '{prefix}' in '{qname_str}'"))
        })?;
        Ok(TypeRef { local_name: local.to_string(), namespace: Some(ns.to_string()) })
    } else {
        Ok(TypeRef {
            local_name: qname_str.to_string(),
            namespace: node.lookup_namespace_uri(None).map(str::to_string),
        })
    }
}

/// Parsed minOccurs/maxOccurs Attribute (fehlend = nicht deklariert).
fn parse_occurs(node: &Node) -> Result<Occurs> {
    let min = match node.attribute("minOccurs") {
        Some(s) => Some(s.trim().parse::<u32>().map_err(|_| {
            Error::XsdParseError(format!("Invalid minOccurs: {s}"))
        })?),
        None => None,
    };

    let max = match node.attribute("maxOccurs").map(str::trim) {
        Some("unbounded") => Some(MaxOccurs::Unbounded),
        Some(s) => Some(
            s.parse()
                .map(MaxOccurs::Bounded)
                .map_err(|_| Error::XsdParseError(format!("Invalid maxOccurs: {s}")))?,
        ),
        None => None,
    };

    let occurs = Occurs { min, max };
    if let MaxOccurs::Bounded(max_val) = occurs.max_or_default()
        && occurs.min_or_default() > max_val
        && occurs.is_declared()
    {
        return Err(Error::XsdParseError(format!(
            "minOccurs ({}) cannot be greater than maxOccurs ({max_val})",
            occurs.min_or_default()
        )));
    }

    Ok(occurs)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Leeres Schema parsen.
    #[test]
    fn parse_empty_schema() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#;
        let schema = parse_xsd(xsd).unwrap();
        assert!(schema.is_empty());
        assert_eq!(schema.global_elements().count(), 0);
    }

    /// Ungültiges XML gibt Fehler.
    #[test]
    fn parse_invalid_xml_returns_error() {
        let err = parse_xsd("<xs:schema><not-closed>").unwrap_err();
        assert!(matches!(err, Error::XsdParseError(_)));
    }

    #[test]
    fn parse_non_schema_root_returns_error() {
        let err = parse_xsd("<root/>").unwrap_err();
        assert!(err.to_string().contains("xs:schema"), "{err}");
    }

    #[test]
    fn target_namespace_recorded() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                                targetNamespace="http://ead3.archivists.org/schema/"/>"#;
        let schema = parse_xsd(xsd).unwrap();
        assert_eq!(schema.target_namespace(), Some("http://ead3.archivists.org/schema/"));
    }

    #[test]
    fn globals_are_indexed() {
        let xsd = r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="ead" type="eadType"/>
                <xs:complexType name="eadType"><xs:sequence/></xs:complexType>
                <xs:simpleType name="yesNo">
                    <xs:restriction base="xs:token">
                        <xs:enumeration value="yes"/>
                        <xs:enumeration value="no"/>
                    </xs:restriction>
                </xs:simpleType>
                <xs:group name="m.desc"><xs:sequence/></xs:group>
                <xs:attributeGroup name="a.common"/>
                <xs:attribute name="lang" type="xs:string"/>
            </xs:schema>
        "#;
        let schema = parse_xsd(xsd).unwrap();
        assert!(schema.global_element("ead").is_some());
        assert!(schema.complex_type("eadType").is_some());
        assert!(schema.group("m.desc").is_some());
        assert!(schema.attribute_group("a.common").is_some());
        assert!(schema.global_attribute("lang").is_some());
        let yes_no = schema.simple_type("yesNo").unwrap();
        assert_eq!(schema.enumeration_values(yes_no), vec!["yes", "no"]);
    }

    #[test]
    fn builtin_types_resolved_by_prefix_and_default_namespace() {
        let xsd = r#"
            <schema xmlns="http://www.w3.org/2001/XMLSchema">
                <element name="a" type="string"/>
            </schema>
        "#;
        let schema = parse_xsd(xsd).unwrap();
        let a = schema.global_element("a").unwrap();
        assert!(schema.node(a).type_ref.as_ref().unwrap().is_builtin());

        let xsd = r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:t="urn:t">
                <xs:element name="a" type="t:local"/>
            </xs:schema>
        "#;
        let schema = parse_xsd(xsd).unwrap();
        let a = schema.global_element("a").unwrap();
        let type_ref = schema.node(a).type_ref.clone().unwrap();
        assert!(!type_ref.is_builtin());
        assert_eq!(type_ref.local_name, "local");
    }

    #[test]
    fn unknown_prefix_is_error() {
        let xsd = r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="a" type="nope:t"/>
            </xs:schema>
        "#;
        let err = parse_xsd(xsd).unwrap_err();
        assert!(err.to_string().contains("nope"), "{err}");
    }

    #[test]
    fn occurs_parsed_and_validated() {
        let xsd = r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="a">
                    <xs:complexType>
                        <xs:sequence>
                            <xs:element name="b" minOccurs="0" maxOccurs="unbounded"/>
                            <xs:element name="c"/>
                        </xs:sequence>
                    </xs:complexType>
                </xs:element>
            </xs:schema>
        "#;
        let schema = parse_xsd(xsd).unwrap();
        let a = schema.global_element("a").unwrap();
        let ct = schema.child_of_kind(a, SchemaKind::ComplexType).unwrap();
        let seq = schema.child_of_kind(ct, SchemaKind::Sequence).unwrap();
        let kids: Vec<_> = schema.children(seq).map(|(_, n)| n.occurs).collect();
        assert_eq!(kids[0], Occurs::new(0, MaxOccurs::Unbounded));
        assert_eq!(kids[1], Occurs::default());

        let bad = r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="a" minOccurs="3" maxOccurs="2"/>
            </xs:schema>
        "#;
        assert!(parse_xsd(bad).is_err());
    }

    #[test]
    fn annotation_documentation_and_hints() {
        let xsd = r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="recordid" type="xs:string">
                    <xs:annotation>
                        <xs:documentation xml:lang="sv">Post-id</xs:documentation>
                        <xs:documentation xml:lang="en">
                            Record
                            identifier
                        </xs:documentation>
                        <xs:appinfo><Hidden/><disabled/></xs:appinfo>
                    </xs:annotation>
                </xs:element>
            </xs:schema>
        "#;
        let schema = parse_xsd(xsd).unwrap();
        let id = schema.global_element("recordid").unwrap();
        assert_eq!(schema.label(id, Some("sv")), Some("Post-id"));
        assert_eq!(schema.label(id, Some("en")), Some("Record identifier"));
        let hints = schema.node(id).hints;
        assert!(hints.hidden);
        assert!(hints.disabled);
        assert!(!hints.no_input_field);
        // Annotation wird nicht als Kind-Knoten abgelegt
        assert_eq!(schema.children(id).count(), 0);
    }

    #[test]
    fn attribute_use_and_fixed() {
        let xsd = r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="t">
                    <xs:attribute name="audience" use="required"/>
                    <xs:attribute name="old" use="prohibited"/>
                    <xs:attribute name="version" fixed="3"/>
                    <xs:attribute ref="xml:lang"/>
                </xs:complexType>
            </xs:schema>
        "#;
        let schema = parse_xsd(xsd).unwrap();
        let t = schema.complex_type("t").unwrap();
        let attrs: Vec<_> = schema.children(t).map(|(_, n)| n.clone()).collect();
        assert!(attrs[0].required);
        assert!(attrs[1].prohibited);
        assert_eq!(attrs[2].fixed.as_deref(), Some("3"));
        assert!(attrs[3].reference.as_ref().unwrap().is_xml_namespace());
    }

    #[test]
    fn include_ignored_for_string_input() {
        let xsd = r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:include schemaLocation="other.xsd"/>
                <xs:element name="a" type="xs:string"/>
            </xs:schema>
        "#;
        let schema = parse_xsd(xsd).unwrap();
        assert!(schema.global_element("a").is_some());
    }
}
