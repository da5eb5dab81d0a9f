//! Integration tests for the form → XML serializer.

use xsdform::xsd::parse_xsd;
use xsdform::{form_to_pretty_xml, form_to_xml, form_to_xml_writer, Error, FormOptions, FormSession};

include!("common/schemas.rs");

const EAD_NS: &str = "http://ead3.archivists.org/schema/";

#[test]
fn empty_form_emits_required_skeleton_only() {
    let schema = parse_xsd(EAD_LIKE_XSD).unwrap();
    let session = FormSession::generate(&schema, FormOptions::default()).unwrap();
    let xml = form_to_xml(&session).unwrap();
    assert_eq!(
        xml,
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><ead xmlns="{EAD_NS}"><archdesc><did><unittitle/></did></archdesc></ead>"#
        )
    );
}

#[test]
fn optional_instance_appears_once_filled() {
    let schema = parse_xsd(EAD_LIKE_XSD).unwrap();
    let mut session = FormSession::generate(&schema, FormOptions::default()).unwrap();
    let did = session.find("did").unwrap();
    let control = session.find_add_control(did, "unitid").unwrap();
    let unitid = session.add(control).unwrap().unwrap();

    let xml = form_to_xml(&session).unwrap();
    assert!(!xml.contains("unitid"), "{xml}");

    session.set_value(unitid, "HO-7").unwrap();
    let xml = form_to_xml(&session).unwrap();
    assert_eq!(xml.matches("<unitid>HO-7</unitid>").count(), 1, "{xml}");
    assert_eq!(xml.matches("unitid").count(), 2, "{xml}");
}

#[test]
fn added_instance_with_mandatory_child_is_emitted() {
    let schema = parse_xsd(EAD_LIKE_XSD).unwrap();
    let mut session = FormSession::generate(&schema, FormOptions::default()).unwrap();
    let archdesc = session.find("archdesc").unwrap();
    let control = session.find_add_control(archdesc, "scopecontent").unwrap();
    session.add(control).unwrap().unwrap();
    let xml = form_to_xml(&session).unwrap();
    assert!(xml.contains("<scopecontent><p/></scopecontent>"), "{xml}");

    let p = session.find("p").unwrap();
    session.set_attribute(p, "xml:lang", "de").unwrap();
    let xml = form_to_xml(&session).unwrap();
    assert!(xml.contains(r#"<scopecontent><p xml:lang="de"/></scopecontent>"#), "{xml}");
}

#[test]
fn invalid_required_fields_block_output() {
    let schema = parse_xsd(EAD_LIKE_XSD).unwrap();
    let mut session = FormSession::generate(&schema, FormOptions::default()).unwrap();
    let flagged = session.validate();
    assert_eq!(flagged.len(), 2);

    let err = form_to_xml(&session).unwrap_err();
    assert_eq!(
        err,
        Error::ValidationFailed(vec![
            "/ead/archdesc[1]/@level".into(),
            "/ead/archdesc[1]/did[1]/unittitle[1]".into(),
        ])
    );

    let mut sink = Vec::new();
    assert!(form_to_xml_writer(&session, &mut sink, None).is_err());
    assert!(sink.is_empty(), "nothing written on validation failure");

    let archdesc = session.find("archdesc").unwrap();
    let title = session.find("unittitle").unwrap();
    session.set_attribute(archdesc, "level", "series").unwrap();
    session.set_value(title, "Harbour Office").unwrap();
    assert!(session.invalid_fields().is_empty());
    assert!(form_to_xml(&session).is_ok());
}

#[test]
fn select_rejects_unknown_option() {
    let schema = parse_xsd(EAD_LIKE_XSD).unwrap();
    let mut session = FormSession::generate(&schema, FormOptions::default()).unwrap();
    let archdesc = session.find("archdesc").unwrap();
    let err = session.set_attribute(archdesc, "level", "box").unwrap_err();
    assert!(matches!(err, Error::InvalidOption { .. }), "{err:?}");
}

#[test]
fn pretty_output_and_namespace_override() {
    let schema = parse_xsd(EAD_LIKE_XSD).unwrap();
    let mut session =
        FormSession::generate(&schema, FormOptions::default().with_root_namespace("urn:local")).unwrap();
    let title = session.find("unittitle").unwrap();
    session.set_value(title, "A & B").unwrap();

    let xml = form_to_pretty_xml(&session).unwrap();
    let expected = concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<ead xmlns=\"urn:local\">\n",
        "  <archdesc>\n",
        "    <did>\n",
        "      <unittitle>A &amp; B</unittitle>\n",
        "    </did>\n",
        "  </archdesc>\n",
        "</ead>\n",
    );
    assert_eq!(xml, expected);
}

#[test]
fn writer_output_matches_string_output() {
    let schema = parse_xsd(EAD_LIKE_XSD).unwrap();
    let session = FormSession::generate(&schema, FormOptions::ead3()).unwrap();
    let mut buf = Vec::new();
    form_to_xml_writer(&session, &mut buf, Some(2)).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), form_to_pretty_xml(&session).unwrap());
}
