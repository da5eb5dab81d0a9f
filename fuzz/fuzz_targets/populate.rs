#![no_main]
use libfuzzer_sys::fuzz_target;
use xsdform::{FormOptions, FormSession};

const XSD: &str = r#"
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="c">
        <xs:complexType mixed="true">
            <xs:sequence>
                <xs:element name="head" type="xs:string" minOccurs="0"/>
                <xs:choice maxOccurs="unbounded">
                    <xs:element name="p" type="xs:string"/>
                    <xs:element name="c" type="xs:anyType"/>
                </xs:choice>
            </xs:sequence>
            <xs:attribute name="level">
                <xs:simpleType>
                    <xs:restriction base="xs:token">
                        <xs:enumeration value="fonds"/>
                        <xs:enumeration value="file"/>
                    </xs:restriction>
                </xs:simpleType>
            </xs:attribute>
        </xs:complexType>
    </xs:element>
</xs:schema>
"#;

fuzz_target!(|data: &[u8]| {
    let Ok(xml) = std::str::from_utf8(data) else { return };
    let Ok(schema) = xsdform::xsd::parse_xsd(XSD) else { return };
    let Ok(mut session) = FormSession::generate(&schema, FormOptions::default()) else { return };
    if session.populate(xml).is_ok() {
        let _ = xsdform::form_to_xml(&session);
    }
});
