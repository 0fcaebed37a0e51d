use super::*;
use crate::codec::{EnumEncoding, EnumInfo};
use crate::converter::IntListConverter;
use crate::value::{FromValue, ToValue};

const STATUS: EnumInfo = EnumInfo {
    type_name: "Status",
    variants: &["Active", "Retired"],
};

#[derive(Debug, Default, Clone, PartialEq)]
struct Person {
    id: i64,
    name: String,
    status: String,
    scores: Vec<i32>,
    nick: String,
}

impl Person {
    fn nick(&self) -> String {
        self.nick.clone()
    }
}

fn id() -> PropertyDef<Person> {
    PropertyDef::field(
        "id",
        DataType::BigInt,
        |p| p.id.to_value(),
        |p, v| {
            p.id = FromValue::from_value(v)?;
            Ok(())
        },
    )
}

fn name() -> PropertyDef<Person> {
    PropertyDef::field(
        "name",
        DataType::Text,
        |p| p.name.to_value(),
        |p, v| {
            p.name = FromValue::from_value(v)?;
            Ok(())
        },
    )
}

fn status() -> PropertyDef<Person> {
    PropertyDef::field(
        "status",
        DataType::Text,
        |p| p.status.to_value(),
        |p, v| {
            p.status = FromValue::from_value(v)?;
            Ok(())
        },
    )
}

fn scores() -> PropertyDef<Person> {
    PropertyDef::field(
        "scores",
        DataType::Text,
        |p| p.scores.to_value(),
        |p, v| {
            p.scores = FromValue::from_value(v)?;
            Ok(())
        },
    )
}

fn nick_read_only() -> PropertyDef<Person> {
    PropertyDef::accessor("nick", DataType::Text, |p| p.nick().to_value(), None)
}

fn person_builder() -> DescriptorBuilder<Person> {
    DescriptorBuilder::new("Person")
        .property(id().primary_key().generated())
        .property(name())
}

#[test]
fn defaults_come_from_type_and_member_names() {
    let descriptor = person_builder().build().unwrap();
    assert_eq!(descriptor.table(), "Person");
    let columns: Vec<_> = descriptor.properties().map(Property::name).collect();
    assert_eq!(columns, ["id", "name"]);
    assert_eq!(descriptor.meta().primary_key_names(), ["id"]);
    assert_eq!(descriptor.meta().generated_column_names(), ["id"]);
    assert_eq!(descriptor.meta().insert_columns(), ["name"]);
    assert_eq!(descriptor.meta().select_columns(), "id,name");
}

#[test]
fn simple_type_name_strips_path_and_generics() {
    assert_eq!(simple_type_name::<Person>(), "Person");
    assert_eq!(simple_type_name::<Vec<String>>(), "Vec");
    assert_eq!(DescriptorBuilder::<Person>::for_type().type_name(), "Person");
}

#[test]
fn schema_qualifies_table() {
    let descriptor = person_builder()
        .table("people")
        .schema("crm")
        .build()
        .unwrap();
    assert_eq!(descriptor.table(), "crm.people");

    let descriptor = person_builder().table("  ").build().unwrap();
    assert_eq!(descriptor.table(), "Person");
}

#[test]
fn transient_members_are_skipped() {
    let descriptor = person_builder()
        .property(status().transient())
        .build()
        .unwrap();
    assert!(descriptor.property("status").is_none());
    assert_eq!(descriptor.meta().columns().len(), 2);
}

#[test]
fn duplicate_member_is_rejected() {
    let err = person_builder().property(name()).build().unwrap_err();
    assert!(matches!(
        err,
        NormError::DuplicateProperty { ref column, type_name: "Person" } if column == "name"
    ));
}

#[test]
fn duplicate_column_is_rejected() {
    let err = person_builder()
        .property(status().column("name"))
        .build()
        .unwrap_err();
    assert!(matches!(err, NormError::DuplicateProperty { ref column, .. } if column == "name"));
}

#[test]
fn column_order_reorders_and_drops() {
    let descriptor = person_builder()
        .property(status())
        .column_order(["name", " id "])
        .build()
        .unwrap();
    let columns: Vec<_> = descriptor.properties().map(Property::name).collect();
    assert_eq!(columns, ["name", "id"]);
    assert!(descriptor.property("status").is_none());
}

#[test]
fn column_order_repeating_a_name_is_rejected() {
    let err = person_builder()
        .column_order(["id", "name", "id"])
        .build()
        .unwrap_err();
    assert!(matches!(err, NormError::DuplicateProperty { ref column, .. } if column == "id"));
}

#[test]
fn codecs_decide_the_column_type() {
    let descriptor = person_builder()
        .property(status().enumerated(STATUS, EnumEncoding::Ordinal))
        .property(scores().converter(std::sync::Arc::new(IntListConverter)))
        .build()
        .unwrap();
    let meta = descriptor.meta();
    assert_eq!(meta.column("status").unwrap().data_type, DataType::Integer);
    assert_eq!(meta.column("scores").unwrap().data_type, DataType::Text);
}

#[test]
fn values_are_encoded_through_codecs() {
    let descriptor = person_builder()
        .property(status().enumerated(STATUS, EnumEncoding::Ordinal))
        .property(scores().converter(std::sync::Arc::new(IntListConverter)))
        .build()
        .unwrap();
    let person = Person {
        id: 3,
        name: "bob".into(),
        status: "Retired".into(),
        scores: vec![1, 2],
        ..Default::default()
    };
    assert_eq!(
        descriptor.insert_args(&person).unwrap(),
        vec![
            Value::Text("bob".into()),
            Value::I32(1),
            Value::Text("1,2".into()),
        ]
    );
    assert_eq!(
        descriptor.update_args(&person).unwrap().last(),
        Some(&Value::I64(3))
    );
    assert_eq!(descriptor.key_args(&person).unwrap(), vec![Value::I64(3)]);
}

#[test]
fn put_value_decodes_and_writes() {
    let descriptor = person_builder()
        .property(status().enumerated(STATUS, EnumEncoding::Ordinal))
        .build()
        .unwrap();
    let mut person = Person::default();
    descriptor
        .put_value(&mut person, "status", Value::I64(0))
        .unwrap();
    assert_eq!(person.status, "Active");
    descriptor
        .put_value(&mut person, "name", Value::Text("ann".into()))
        .unwrap();
    assert_eq!(person.name, "ann");
}

#[test]
fn strict_and_lenient_lookup() {
    let descriptor = person_builder().build().unwrap();
    let mut person = Person::default();
    let err = descriptor
        .put_value(&mut person, "age", Value::I32(4))
        .unwrap_err();
    assert_eq!(err.to_string(), "No such field: age");
    assert!(
        !descriptor
            .put_value_lenient(&mut person, "age", Value::I32(4))
            .unwrap()
    );
    assert!(descriptor.get_value(&person, "age").is_err());
}

#[test]
fn type_mismatch_names_the_column() {
    let descriptor = person_builder().build().unwrap();
    let mut person = Person::default();
    let err = descriptor
        .put_value(&mut person, "name", Value::I64(1))
        .unwrap_err();
    assert!(matches!(err, NormError::Decode { ref column, .. } if column == "name"));
}

#[test]
fn read_only_accessor_is_read_but_never_written() {
    let descriptor = person_builder()
        .property(nick_read_only())
        .build()
        .unwrap();
    let mut person = Person {
        nick: "bobby".into(),
        ..Default::default()
    };
    assert_eq!(
        descriptor.get_value(&person, "nick").unwrap(),
        Value::Text("bobby".into())
    );
    descriptor
        .put_value(&mut person, "nick", Value::Text("rob".into()))
        .unwrap();
    assert_eq!(person.nick, "bobby");
}

#[test]
fn single_generated_key_goes_to_first_target() {
    let descriptor = person_builder().build().unwrap();
    let mut person = Person::default();
    let keys = Row::from_pairs([("GENERATED_KEY", Value::U64(42))]);
    let written = descriptor
        .populate_generated_keys(&mut person, &keys, &[])
        .unwrap();
    assert_eq!(written, 1);
    assert_eq!(person.id, 42);
}

#[test]
fn wide_key_rows_match_by_label() {
    let descriptor = DescriptorBuilder::new("Person")
        .property(id().primary_key().generated())
        .property(name().generated())
        .build()
        .unwrap();
    let mut person = Person::default();
    let keys = Row::from_pairs([
        ("NAME", Value::Text("gen".into())),
        ("id", Value::I32(9)),
    ]);
    let written = descriptor
        .populate_generated_keys(&mut person, &keys, &[])
        .unwrap();
    assert_eq!(written, 2);
    assert_eq!(person.id, 9);
    assert_eq!(person.name, "gen");
}

#[test]
fn no_keys_no_writes() {
    let descriptor = person_builder().build().unwrap();
    let mut person = Person::default();
    let empty = Row::from_pairs(Vec::<(String, Value)>::new());
    assert_eq!(
        descriptor
            .populate_generated_keys(&mut person, &empty, &[])
            .unwrap(),
        0
    );
}

#[test]
fn column_values_over_a_map() {
    let mut map = IndexMap::new();
    map.insert("name".to_string(), Value::Text("x".into()));
    assert_eq!(map.column_value("name").unwrap(), Value::Text("x".into()));
    assert!(matches!(
        map.column_value("id"),
        Err(NormError::NoSuchProperty { .. })
    ));
}
