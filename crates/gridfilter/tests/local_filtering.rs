//! Integration tests for local filtering.
//!
//! These tests drive a coordinator the way a hosting view does: render filter
//! headers, report input through the metadata callbacks, and read the rows the
//! in-memory data view keeps visible.

use std::sync::{Arc, Mutex};

use gridfilter_rs::{
    ColumnDefinition, CurrentFilter, FilterCoordinator, FilterOptions, FilterSettings, Formatter,
    InputEvent, MemoryDataView, MemoryGrid, Operator, TextElement,
};
use serde_json::{json, Value};

fn gender_formatter() -> Formatter {
    Formatter::new(|args| match args.value.and_then(Value::as_str) {
        Some("male") => json!("M"),
        Some("female") => json!("F"),
        _ => json!(""),
    })
}

fn columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("firstName", "firstName"),
        ColumnDefinition::new("lastName", "lastName"),
        ColumnDefinition::new("age", "age"),
        ColumnDefinition::new("gender", "gender").with_formatter(gender_formatter(), true),
        ColumnDefinition::new("zip", "zip").with_query_field("address.zip"),
    ]
}

fn rows() -> Vec<Value> {
    let john = json!({
        "id": 0, "firstName": "John", "lastName": "Doe", "age": 26,
        "gender": "male", "address": { "zip": 123456 }
    });
    let jane = json!({
        "id": 1, "firstName": "Jane", "lastName": "Doe", "age": 28,
        "gender": "female", "address": { "zip": 222222 }
    });
    let detail = json!({ "id": 2, "__isPadding": true, "__parent": john.clone() });
    vec![john, jane, detail]
}

fn setup(options: FilterOptions) -> (FilterCoordinator, Arc<MemoryDataView>) {
    let coordinator = FilterCoordinator::new(options);
    let view = Arc::new(MemoryDataView::new(rows()));
    coordinator.init(Arc::new(MemoryGrid::new(columns())));
    coordinator.bind(view.clone()).expect("bind should succeed");
    (coordinator, view)
}

fn type_into(coordinator: &FilterCoordinator, column_id: &str, text: &str) {
    let column = columns()
        .into_iter()
        .find(|c| c.id == column_id)
        .expect("unknown column");
    let metadata = coordinator
        .on_header_rendered(&column, Arc::new(TextElement::new()))
        .expect("column should be filterable");
    metadata.notify(Some(&InputEvent::key_up(text)));
}

#[test]
fn test_nested_query_field_and_detail_rows() {
    let (coordinator, view) = setup(FilterOptions::local());

    type_into(&coordinator, "zip", "123456");

    // The detail row belongs to John and follows its parent.
    assert_eq!(view.visible_indices(), vec![0, 2]);
}

#[test]
fn test_formatter_output_is_filtered() {
    let (coordinator, view) = setup(FilterOptions::local());

    type_into(&coordinator, "gender", "F");

    assert_eq!(view.visible_indices(), vec![1]);
}

#[test]
fn test_wildcard_forms_agree() {
    for text in ["Jo*", "*ohn", "*oh*"] {
        let (coordinator, view) = setup(FilterOptions::local());
        type_into(&coordinator, "firstName", text);
        assert_eq!(view.visible_indices(), vec![0, 2], "input {text}");
    }
}

#[test]
fn test_presets_from_settings() {
    let settings: FilterSettings = toml::from_str(
        r#"
        [[presets]]
        columnId = "lastName"
        operator = "EQ"
        searchTerms = ["Doe"]

        [[presets]]
        columnId = "age"
        operator = "GT"
        searchTerms = [27]
        "#,
    )
    .expect("settings should parse");

    let (coordinator, view) = setup(FilterOptions::from_settings(settings, None));

    assert_eq!(view.visible_indices(), vec![1]);
    assert_eq!(
        coordinator.current_local_filters(),
        vec![
            CurrentFilter::new("lastName", Operator::Equal, vec![json!("Doe")]),
            CurrentFilter::new("age", Operator::GreaterThan, vec![json!(27)]),
        ]
    );
}

#[test]
fn test_filter_changed_payload_serializes() {
    let (coordinator, _view) = setup(FilterOptions::local());
    let payloads = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&payloads);
    coordinator.on_filter_changed(move |filters| {
        sink.lock()
            .unwrap()
            .push(serde_json::to_value(filters).unwrap());
    });

    type_into(&coordinator, "age", ">=28");

    assert_eq!(
        payloads.lock().unwrap().last().unwrap(),
        &json!([{ "columnId": "age", "operator": "EQ", "searchTerms": [">=28"] }])
    );
}

#[test]
fn test_clear_all_then_filter_again() {
    let (coordinator, view) = setup(FilterOptions::local());
    type_into(&coordinator, "firstName", "Jane");
    assert_eq!(view.visible_indices(), vec![1]);

    coordinator.clear_filters();
    assert_eq!(view.visible_indices(), vec![0, 1, 2]);

    coordinator
        .filters_metadata()
        .into_iter()
        .find(|m| m.column_id() == "firstName")
        .expect("metadata should survive a clear")
        .notify(Some(&InputEvent::change("John")));
    assert_eq!(view.visible_indices(), vec![0, 2]);
}
