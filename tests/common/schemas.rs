// Gemeinsame Test-Schemas (via include! eingebunden).

/// Kleines EAD-ähnliches Schema: Pflicht- und optionale Elemente, Wiederholung,
/// Choice, Mixed Content, Enumerationen, AttributeGroups und xml:lang.
#[allow(dead_code)]
const EAD_LIKE_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           targetNamespace="http://ead3.archivists.org/schema/"
           elementFormDefault="qualified">
    <xs:import namespace="http://www.w3.org/XML/1998/namespace"/>

    <xs:simpleType name="av.level">
        <xs:restriction base="xs:token">
            <xs:enumeration value="fonds"/>
            <xs:enumeration value="series"/>
            <xs:enumeration value="file"/>
        </xs:restriction>
    </xs:simpleType>

    <xs:attributeGroup name="a.common">
        <xs:attribute name="id" type="xs:ID"/>
        <xs:attribute ref="xml:lang"/>
    </xs:attributeGroup>

    <xs:complexType name="pType" mixed="true">
        <xs:sequence>
            <xs:element name="emph" type="xs:string" minOccurs="0" maxOccurs="unbounded"/>
        </xs:sequence>
        <xs:attributeGroup ref="a.common"/>
    </xs:complexType>

    <xs:complexType name="unittitleType">
        <xs:simpleContent>
            <xs:extension base="xs:string">
                <xs:attributeGroup ref="a.common"/>
            </xs:extension>
        </xs:simpleContent>
    </xs:complexType>

    <xs:group name="m.date">
        <xs:choice>
            <xs:element name="unitdate" type="xs:string"/>
            <xs:element name="unitdatestructured">
                <xs:complexType>
                    <xs:sequence>
                        <xs:element name="daterange">
                            <xs:complexType>
                                <xs:sequence>
                                    <xs:element name="fromdate" type="xs:string"/>
                                    <xs:element name="todate" type="xs:string" minOccurs="0"/>
                                </xs:sequence>
                            </xs:complexType>
                        </xs:element>
                    </xs:sequence>
                </xs:complexType>
            </xs:element>
            <xs:element name="datenote" type="xs:string" maxOccurs="unbounded"/>
        </xs:choice>
    </xs:group>

    <xs:complexType name="didType">
        <xs:sequence>
            <xs:element name="unittitle" type="unittitleType" minOccurs="1" maxOccurs="1">
                <xs:annotation>
                    <xs:documentation xml:lang="en">Title</xs:documentation>
                    <xs:documentation xml:lang="sv">Titel</xs:documentation>
                </xs:annotation>
            </xs:element>
            <xs:element name="unitid" type="xs:string" minOccurs="0" maxOccurs="unbounded"/>
            <xs:group ref="m.date" minOccurs="0"/>
        </xs:sequence>
    </xs:complexType>

    <xs:element name="ead">
        <xs:complexType>
            <xs:sequence>
                <xs:element name="archdesc">
                    <xs:complexType>
                        <xs:sequence>
                            <xs:element name="did" type="didType"/>
                            <xs:element name="scopecontent" minOccurs="0">
                                <xs:complexType>
                                    <xs:sequence>
                                        <xs:element name="p" type="pType" maxOccurs="unbounded"/>
                                    </xs:sequence>
                                </xs:complexType>
                            </xs:element>
                        </xs:sequence>
                        <xs:attribute name="level" type="av.level" use="required"/>
                    </xs:complexType>
                </xs:element>
            </xs:sequence>
            <xs:attributeGroup ref="a.common"/>
        </xs:complexType>
    </xs:element>
</xs:schema>
"#;

/// Choice aus `date` und `dateRange` (jeweils maxOccurs=1).
#[allow(dead_code)]
const DATE_CHOICE_XSD: &str = r#"
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="event">
        <xs:complexType>
            <xs:choice>
                <xs:element name="date" type="xs:string" maxOccurs="1"/>
                <xs:element name="dateRange" type="xs:string" maxOccurs="1"/>
            </xs:choice>
        </xs:complexType>
    </xs:element>
</xs:schema>
"#;

/// Normalisiert XML für strukturelle Vergleiche: Elemente, sortierte
/// Attribute und getrimmter Text, ohne Whitespace zwischen Elementen.
#[allow(dead_code)]
fn canonical(xml: &str) -> String {
    fn walk(node: roxmltree::Node, out: &mut String) {
        if node.is_element() {
            out.push('<');
            out.push_str(node.tag_name().name());
            let mut attrs: Vec<(String, String)> = node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect();
            attrs.sort();
            for (k, v) in attrs {
                out.push_str(&format!(" {k}={v:?}"));
            }
            out.push('>');
            for child in node.children() {
                walk(child, out);
            }
            out.push_str("</>");
        } else if node.is_text() {
            let text = node.text().unwrap_or_default().trim();
            if !text.is_empty() {
                out.push_str(text);
            }
        }
    }
    let doc = roxmltree::Document::parse(xml).expect("well-formed XML");
    let mut out = String::new();
    walk(doc.root_element(), &mut out);
    out
}
