use lexsync_types::{ChangeEvent, DocumentWork, EntityReference, EventId, WorkKind};
use pretty_assertions::assert_eq;
use serde_json::json;

fn make_reference() -> EntityReference {
    EntityReference::new("book", "42")
}

// ── EventId ───────────────────────────────────────────────────────

#[test]
fn event_id_unique() {
    let a = EventId::new();
    let b = EventId::new();
    assert_ne!(a, b);
}

#[test]
fn event_id_display_roundtrip() {
    let id = EventId::new();
    let parsed: EventId = id.to_string().parse().unwrap();
    assert_eq!(id, parsed);
}

// ── WorkKind serde ────────────────────────────────────────────────

#[test]
fn work_kind_serializes_snake_case() {
    assert_eq!(
        serde_json::to_string(&WorkKind::AddOrUpdate).unwrap(),
        "\"add_or_update\""
    );
    assert_eq!(serde_json::to_string(&WorkKind::Delete).unwrap(), "\"delete\"");
}

#[test]
fn work_kind_display_matches_wire_names() {
    assert_eq!(WorkKind::Add.to_string(), "add");
    assert_eq!(WorkKind::AddOrUpdate.to_string(), "add_or_update");
    assert_eq!(WorkKind::Delete.to_string(), "delete");
}

// ── ChangeEvent ───────────────────────────────────────────────────

#[test]
fn add_or_update_event_carries_document() {
    let event = ChangeEvent::add_or_update(make_reference(), json!({"title": "Dune"}));

    assert_eq!(event.kind, WorkKind::AddOrUpdate);
    assert_eq!(event.reference, make_reference());
    assert_eq!(event.document, Some(json!({"title": "Dune"})));
}

#[test]
fn delete_event_has_no_document() {
    let event = ChangeEvent::delete(make_reference());

    assert_eq!(event.kind, WorkKind::Delete);
    assert_eq!(event.document, None);
}

#[test]
fn event_bytes_roundtrip() {
    let event = ChangeEvent::add_or_update(make_reference(), json!({"title": "Dune", "year": 1965}));

    let bytes = event.to_bytes().unwrap();
    let parsed = ChangeEvent::from_bytes(&bytes).unwrap();

    assert_eq!(event, parsed);
}

#[test]
fn event_from_bytes_rejects_garbage() {
    assert!(ChangeEvent::from_bytes(b"not json").is_err());
}

#[test]
fn event_json_uses_snake_case_kind_tag() {
    let event = ChangeEvent::delete(make_reference());
    let value: serde_json::Value = serde_json::from_slice(&event.to_bytes().unwrap()).unwrap();
    assert_eq!(value["kind"], "delete");
    assert_eq!(value["reference"]["type_name"], "book");
}

// ── ChangeEvent → DocumentWork ────────────────────────────────────

#[test]
fn event_converts_to_work() {
    let event = ChangeEvent::add_or_update(make_reference(), json!({"title": "Dune"}));
    let expected_document = event.document.clone();

    let work = DocumentWork::from(event);

    assert_eq!(work.kind, WorkKind::AddOrUpdate);
    assert_eq!(work.reference, make_reference());
    assert_eq!(work.document, expected_document);
}

#[test]
fn delete_event_converts_to_delete_work() {
    let work = DocumentWork::from(ChangeEvent::delete(make_reference()));
    assert_eq!(work, DocumentWork::delete(make_reference()));
}
