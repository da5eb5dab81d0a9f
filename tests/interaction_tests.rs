//! Add/Remove und Choice-Exklusivität.

use xsdform::xsd::parse_xsd;
use xsdform::{Error, FieldId, FormOptions, FormSession, OccurrenceState};

include!("common/schemas.rs");

fn control(session: &FormSession, parent: &str, name: &str) -> FieldId {
    let parent = session.find(parent).expect(parent);
    session.find_add_control(parent, name).expect(name)
}

fn disabled(session: &FormSession, id: FieldId) -> bool {
    session.field(id).unwrap().disabled
}

#[test]
fn date_choice_excludes_and_releases_alternative() {
    let schema = parse_xsd(DATE_CHOICE_XSD).unwrap();
    let mut session = FormSession::generate(&schema, FormOptions::default()).unwrap();
    let date = control(&session, "event", "date");
    let range = control(&session, "event", "dateRange");
    assert!(!disabled(&session, date));
    assert!(!disabled(&session, range));

    let instance = session.add(date).unwrap().expect("date added");
    assert!(disabled(&session, range), "dateRange excluded while date is present");
    assert!(disabled(&session, date), "date at maxOccurs=1");
    assert_eq!(session.add(range).unwrap(), None);

    session.remove(instance).unwrap();
    assert!(!disabled(&session, range));
    assert!(!disabled(&session, date));
    assert!(session.add(range).unwrap().is_some());
    assert!(disabled(&session, date));
}

#[test]
fn add_at_max_is_idempotent() {
    let schema = parse_xsd(DATE_CHOICE_XSD).unwrap();
    let mut session = FormSession::generate(&schema, FormOptions::default()).unwrap();
    let date = control(&session, "event", "date");
    session.add(date).unwrap().unwrap();
    assert_eq!(session.occurrence_state(date).unwrap(), OccurrenceState::AtMax);

    let before = session.tree().outline();
    let len = session.tree().len();
    for _ in 0..3 {
        assert_eq!(session.add(date).unwrap(), None);
    }
    assert_eq!(session.tree().outline(), before);
    assert_eq!(session.tree().len(), len);
}

#[test]
fn bounded_alternatives_disabled_unbounded_stays_enabled() {
    let schema = parse_xsd(EAD_LIKE_XSD).unwrap();
    let mut session = FormSession::generate(&schema, FormOptions::default()).unwrap();
    let unitdate = control(&session, "did", "unitdate");
    let structured = control(&session, "did", "unitdatestructured");
    let datenote = control(&session, "did", "datenote");

    session.add(unitdate).unwrap().unwrap();
    assert!(disabled(&session, unitdate));
    assert!(disabled(&session, structured));
    assert!(!disabled(&session, datenote), "unbounded alternative stays usable");
    assert!(session.field(datenote).unwrap().excluded);
}

#[test]
fn activated_alternative_expands_nested_content() {
    let schema = parse_xsd(EAD_LIKE_XSD).unwrap();
    let mut session = FormSession::generate(&schema, FormOptions::default()).unwrap();
    let structured = control(&session, "did", "unitdatestructured");
    session.add(structured).unwrap().unwrap();

    let from = session.find("fromdate").expect("mandatory child materialized");
    assert!(session.field(from).unwrap().required);
    assert!(session.find("todate").is_none());
    let todate = control(&session, "daterange", "todate");
    assert_eq!(session.occurrence_state(todate).unwrap(), OccurrenceState::NotInstantiated);
}

#[test]
fn repeated_mandatory_element_respects_min_occurs() {
    let schema = parse_xsd(EAD_LIKE_XSD).unwrap();
    let mut session = FormSession::generate(&schema, FormOptions::default()).unwrap();
    let scope = control(&session, "archdesc", "scopecontent");
    session.add(scope).unwrap().unwrap();

    let p_control = control(&session, "scopecontent", "p");
    let first = session.instances(p_control).unwrap()[0];
    assert!(!session.is_removable(first));
    assert_eq!(
        session.remove(first).unwrap_err(),
        Error::BelowMinOccurs { element: "p".into(), min: 1 }
    );

    let second = session.add(p_control).unwrap().unwrap();
    assert!(!session.field(second).unwrap().required);
    assert_eq!(session.occurrence_state(p_control).unwrap(), OccurrenceState::BelowMax);
    session.remove(first).unwrap();
    assert_eq!(session.instances(p_control).unwrap(), vec![second]);
    assert!(!session.tree().contains(first));
}

#[test]
fn instances_are_placed_before_their_control() {
    let schema = parse_xsd(EAD_LIKE_XSD).unwrap();
    let mut session = FormSession::generate(&schema, FormOptions::default()).unwrap();
    let unitid = control(&session, "did", "unitid");
    let a = session.add(unitid).unwrap().unwrap();
    let b = session.add(unitid).unwrap().unwrap();

    let did = session.find("did").unwrap();
    let kids = session.tree().children(did);
    let pos = |id: FieldId| kids.iter().position(|&k| k == id).unwrap();
    assert!(pos(a) < pos(b));
    assert_eq!(pos(b) + 1, pos(unitid));
}

#[test]
fn removing_subtree_drops_descendants() {
    let schema = parse_xsd(EAD_LIKE_XSD).unwrap();
    let mut session = FormSession::generate(&schema, FormOptions::default()).unwrap();
    let scope = control(&session, "archdesc", "scopecontent");
    let instance = session.add(scope).unwrap().unwrap();
    let len = session.tree().len();
    assert!(len > 0);

    session.remove(instance).unwrap();
    assert!(session.find("p").is_none());
    assert!(session.tree().len() < len);
    assert_eq!(session.occurrence_state(scope).unwrap(), OccurrenceState::NotInstantiated);
}
