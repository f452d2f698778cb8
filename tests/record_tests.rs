/// Record instance tests
///
/// Construction, defaults, dirty tracking, accessors, and serialization.
/// Run with: cargo test --test record_tests
use std::sync::{Arc, Mutex};

use modelkit::{AttrDef, ModelBuilder, ModelError, ModelType, Observable, Value, ValueType, attrs};
use uuid::Uuid;

fn book() -> Arc<ModelType> {
    ModelBuilder::new("book")
        .attr("id", AttrDef::new().primary().of_type(ValueType::Number))
        .unwrap()
        .attr("title", AttrDef::new().of_type(ValueType::Text))
        .unwrap()
        .attr("status", AttrDef::new().default_value("draft"))
        .unwrap()
        .build()
}

#[test]
fn defaults_apply_only_when_absent() {
    let book = book();

    let fresh = book.create(attrs!());
    assert_eq!(fresh.get("status"), Some(Value::Text("draft".into())));

    let given = book.create(attrs! { "status" => "live" });
    assert_eq!(given.get("status"), Some(Value::Text("live".into())));
    assert!(!given.is_dirty());
}

#[test]
fn computed_defaults_produce_per_instance_values() {
    let model = ModelBuilder::new("session")
        .attr("token", AttrDef::new().default_with(|| Value::from(Uuid::new_v4().to_string())))
        .unwrap()
        .build();

    let a = model.create(attrs!());
    let b = model.create(attrs!());
    assert!(a.get("token").is_some_and(|t| !t.is_null()));
    assert_ne!(a.get("token"), b.get("token"));
}

#[test]
fn construction_marks_nothing_dirty() {
    let book = book();
    let record = book.create(attrs! { "id" => 1, "title" => "Dune" });
    assert!(!record.is_dirty());
    assert!(record.changed().is_empty());
}

#[test]
fn construction_ignores_undeclared_keys() {
    let book = book();
    let record = book.create(attrs! { "id" => 1, "bogus" => "x" });
    assert_eq!(record.raw("bogus"), None);
    // The values map holds exactly the declared keys.
    assert_eq!(record.attrs().len(), 3);
}

#[test]
fn set_tracks_each_attribute_once_in_change_order() {
    let book = book();
    let mut record = book.create(attrs! { "id" => 1 });

    record.set("title", "Dune").unwrap();
    record.set("status", "live").unwrap();
    record.set("title", "Dune Messiah").unwrap();

    assert_eq!(record.dirty_attrs(), &["title".to_string(), "status".to_string()]);
    assert_eq!(
        record.changed(),
        attrs! { "title" => "Dune Messiah", "status" => "live" }
    );
}

#[test]
fn setting_the_current_value_is_a_silent_noop() {
    let book = book();
    let mut record = book.create(attrs! { "title" => "Dune" });

    let changes = Arc::new(Mutex::new(0));
    {
        let changes = changes.clone();
        record.on("change", move |_| *changes.lock().unwrap() += 1);
    }

    record.set("title", "Dune").unwrap();
    assert!(!record.is_dirty());
    assert_eq!(*changes.lock().unwrap(), 0);
}

#[test]
fn change_events_fire_type_level_then_instance_level() {
    let book = book();
    let record = book.create(attrs!());

    let order = Arc::new(Mutex::new(Vec::new()));
    for (label, name) in [
        ("model change", "change"),
        ("model change:title", "change:title"),
    ] {
        let order = order.clone();
        book.on(name, move |_| order.lock().unwrap().push(label));
    }
    for (label, name) in [
        ("record change", "change"),
        ("record change:title", "change:title"),
    ] {
        let order = order.clone();
        record.on(name, move |_| order.lock().unwrap().push(label));
    }

    let mut record = record;
    record.set("title", "Dune").unwrap();

    assert_eq!(
        *order.lock().unwrap(),
        vec![
            "model change",
            "model change:title",
            "record change",
            "record change:title",
        ]
    );
}

#[test]
fn change_event_carries_value_and_previous() {
    let book = book();
    let mut record = book.create(attrs! { "title" => "Dune" });

    let seen = Arc::new(Mutex::new(None));
    {
        let seen = seen.clone();
        record.on("change:title", move |event| {
            if let modelkit::Event::Change { value, previous, .. } = event {
                *seen.lock().unwrap() = Some((value.clone(), previous.clone()));
            }
        });
    }

    record.set("title", "Dune Messiah").unwrap();
    let (value, previous) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(value, Value::Text("Dune Messiah".into()));
    assert_eq!(previous, Value::Text("Dune".into()));
}

#[test]
fn bulk_set_emits_setting_before_changes_and_skips_unknown_keys() {
    let book = book();
    let mut record = book.create(attrs!());

    let order = Arc::new(Mutex::new(Vec::new()));
    {
        let order = order.clone();
        record.on("setting", move |_| order.lock().unwrap().push("setting"));
    }
    {
        let order = order.clone();
        record.on("change", move |_| order.lock().unwrap().push("change"));
    }

    record
        .set_all(attrs! { "title" => "Dune", "bogus" => "x" })
        .unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["setting", "change"]);
    assert_eq!(record.raw("bogus"), None);
    assert_eq!(record.get_text("title").as_deref(), Some("Dune"));
}

#[test]
fn unknown_attribute_set_is_an_error() {
    let book = book();
    let mut record = book.create(attrs!());
    let err = record.set("bogus", 1).unwrap_err();
    assert!(matches!(err, ModelError::UnknownAttribute { .. }));
    assert_eq!(
        err.to_string(),
        "Unknown attribute 'bogus' for model 'Book'"
    );
}

#[test]
fn custom_getter_replaces_raw_read() {
    let model = ModelBuilder::new("user")
        .attr("first", AttrDef::new())
        .unwrap()
        .attr(
            "shout",
            AttrDef::new().get_with(|record| {
                Value::from(record.get_text("first").unwrap_or_default().to_uppercase())
            }),
        )
        .unwrap()
        .build();

    let record = model.create(attrs! { "first" => "alex" });
    assert_eq!(record.get_text("shout").as_deref(), Some("ALEX"));
    assert_eq!(record.raw("shout"), Some(&Value::Null));
}

#[test]
fn primary_requires_a_declared_key() {
    let model = ModelBuilder::new("note")
        .attr("body", AttrDef::new())
        .unwrap()
        .build();
    let record = model.create(attrs!());
    assert!(matches!(record.primary(), Err(ModelError::NoPrimaryKey)));
    assert_eq!(
        record.primary().unwrap_err().to_string(),
        "Primary key has not been defined."
    );
}

#[test]
fn is_new_reflects_primary_key_presence() {
    let book = book();
    assert!(book.create(attrs!()).is_new().unwrap());
    assert!(!book.create(attrs! { "id" => 1 }).is_new().unwrap());
    // Integer zero is a real key, unlike in loosely-typed model layers.
    assert!(!book.create(attrs! { "id" => 0 }).is_new().unwrap());
}

#[test]
fn serialization_covers_enumerable_attributes_only() {
    let model = ModelBuilder::new("account")
        .attr("id", AttrDef::new().primary())
        .unwrap()
        .attr("email", AttrDef::new())
        .unwrap()
        .attr("password_hash", AttrDef::new().filtered())
        .unwrap()
        .build();

    let mut record = model.create(attrs! {
        "id" => 1,
        "email" => "a@example.com",
        "password_hash" => "sssh",
    });
    record
        .extras_mut()
        .insert("transient".into(), Value::Bool(true));

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "id": 1, "email": "a@example.com" })
    );
}

#[test]
fn extras_are_caller_owned() {
    let book = book();
    let mut record = book.create(attrs!());
    record.extras_mut().insert("attempts".into(), Value::Integer(2));
    assert_eq!(record.extras().get("attempts"), Some(&Value::Integer(2)));
    assert!(!record.is_dirty());
}

#[test]
fn has_checks_the_schema_not_the_value() {
    let book = book();
    let record = book.create(attrs!());
    assert!(record.has("title"));
    assert!(!record.has("bogus"));
}
