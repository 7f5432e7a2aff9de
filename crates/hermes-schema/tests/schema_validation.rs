//! End-to-end schema validation over wire-decoded parameters.

use hermes_core::{params, wire, ErrorCategory, HermesError, Value};
use hermes_schema::{Field, FieldType, Schema};

fn person_schema() -> Schema {
    let address = Schema::builder()
        .field(Field::string("city").required())
        .field(Field::string("zip").check("match?", ["^[0-9]{4,5}$"]))
        .build()
        .unwrap();

    Schema::builder()
        .strict(true)
        .field(Field::string("name").required())
        .field(Field::integer("age").required().check("between?", [0, 120]))
        .field(Field::boolean("admin").default(false))
        .field(Field::array("roles").of(FieldType::Symbol))
        .field(Field::hash("address").schema(address))
        .build()
        .unwrap()
}

#[test]
fn test_wire_query_validates_to_typed_values() {
    let schema = Schema::builder()
        .field(Field::integer("page").default(1))
        .field(Field::array("ids").of(FieldType::Integer))
        .field(Field::datetime("since"))
        .build()
        .unwrap();

    let raw = wire::decode("ids[]=3&ids[]=5&since=2024-05-01");
    let typed = schema.validate(&raw).unwrap();

    assert_eq!(typed["page"], Value::from(1));
    assert_eq!(typed["ids"], Value::from(vec![3, 5]));
    assert!(matches!(typed["since"], Value::DateTime(_)));
}

#[test]
fn test_age_out_of_range() {
    let schema = Schema::builder()
        .field(Field::integer("age").check("between?", [0, 120]))
        .build()
        .unwrap();

    let err = schema.validate(&wire::decode("age=121")).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert_eq!(err.to_string(), "age failed between?(0,120) validation");

    let ok = schema.validate(&wire::decode("age=120")).unwrap();
    assert_eq!(ok["age"], Value::from(120));
}

#[test]
fn test_missing_fields_are_checked_before_types() {
    let err = person_schema()
        .validate(&params! { "age" => "abc" })
        .unwrap_err();
    assert_eq!(err.to_string(), "missing required parameters: name");
}

#[test]
fn test_unexpected_fields_reported_together() {
    let err = person_schema()
        .validate(&params! { "name" => "a", "age" => "3", "b" => "1", "a" => "2" })
        .unwrap_err();
    assert_eq!(err.to_string(), "unexpected parameters: b, a");

    if let HermesError::Validation { field_errors, .. } = err {
        let fields = field_errors.unwrap().fields;
        assert!(fields.contains_key("a"));
        assert!(fields.contains_key("b"));
    } else {
        panic!("expected a validation error");
    }
}

#[test]
fn test_nested_error_path() {
    let err = person_schema()
        .validate(&wire::decode("name=a&age=3&address[city]=Oslo&address[zip]=x"))
        .unwrap_err();
    assert_eq!(err.to_string(), "address[zip] failed match?(^[0-9]{4,5}$) validation");
}

#[test]
fn test_validated_output_validates_to_itself() {
    let schema = person_schema();
    let typed = schema
        .validate(&wire::decode("name=ann&age=33&admin=TRUE&address[city]=Oslo"))
        .unwrap();

    assert_eq!(typed["admin"], Value::Boolean(true));
    assert_eq!(schema.validate(&typed).unwrap(), typed);
}

#[test]
fn test_wire_rendering_of_typed_output_validates_again() {
    let schema = person_schema();
    let typed = schema
        .validate(&wire::decode("name=ann&age=33&address[city]=Oslo"))
        .unwrap();

    let round_tripped = wire::decode(&wire::encode(&typed));
    assert_eq!(schema.validate(&round_tripped).unwrap(), typed);
}

#[test]
fn test_use_schema_overrides_earlier_declaration() {
    let base = Schema::builder()
        .field(Field::integer("limit").default(10))
        .build()
        .unwrap();

    let schema = Schema::builder()
        .field(Field::integer("limit").default(50))
        .use_schema(&base)
        .build()
        .unwrap();

    assert_eq!(schema.fields().len(), 1);
    assert_eq!(schema.validate(&params! {}).unwrap()["limit"], Value::from(10));
}
