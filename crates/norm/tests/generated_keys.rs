//! Round trip: create the table, insert with a generated key, read back.

mod common;

use common::{Script, row};
use norm::prelude::*;
use norm::ExecOutcome;

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[orm(table = "people")]
struct Person {
    #[orm(id, generated)]
    id: i64,
    #[orm(nullable = false, length = 64)]
    name: String,
    age: Option<i32>,
    #[orm(transient)]
    scratch: String,
}

#[test]
fn create_insert_select() {
    let script = Script::new();
    let db = Database::new(script.provider(), DatabaseConfig::new());

    db.create_table::<Person>().unwrap();

    script.push_outcome(ExecOutcome::affected(1).with_keys(row([("GENERATED_KEY", Value::U64(1))])));
    let mut bob = Person {
        name: "bob".to_string(),
        scratch: "not stored".to_string(),
        ..Default::default()
    };
    let result = db.insert(&mut bob).unwrap();
    assert_eq!(result.rows_affected, 1);
    assert_eq!(bob.id, 1);

    script.push_rows(vec![row([
        ("id", Value::I64(1)),
        ("name", Value::Text("bob".into())),
        ("age", Value::Null),
    ])]);
    let people: Vec<Person> = db.where_clause("name=?").bind("bob").results().unwrap();
    assert_eq!(
        people,
        vec![Person {
            id: 1,
            name: "bob".to_string(),
            age: None,
            scratch: String::new(),
        }]
    );

    assert_eq!(
        script.statements(),
        [
            "create table people (id bigint auto_increment,name varchar(64) not null,age integer, primary key (id))",
            "insert into people (name,age) values (?,?)",
            "select id,name,age from people where name=?",
        ]
    );
}

#[test]
fn unknown_result_columns_are_ignored() {
    let script = Script::new();
    let db = Database::new(script.provider(), DatabaseConfig::new());
    script.push_rows(vec![row([
        ("id", Value::I64(4)),
        ("name", Value::Text("ann".into())),
        ("created_by", Value::Text("import".into())),
    ])]);
    let ann: Option<Person> = db.sql("select * from people").first().unwrap();
    let ann = ann.unwrap();
    assert_eq!(ann.id, 4);
    assert_eq!(ann.name, "ann");
    assert_eq!(ann.age, None);
}

#[test]
fn mistyped_column_reports_its_name() {
    let script = Script::new();
    let db = Database::new(script.provider(), DatabaseConfig::new());
    script.push_rows(vec![row([("age", Value::Text("old".into()))])]);
    let err = db.results::<Person>().unwrap_err();
    assert!(matches!(err, NormError::Decode { ref column, .. } if column == "age"));
}

#[test]
fn keys_can_be_matched_by_name() {
    let script = Script::new();
    let db = Database::new(script.provider(), DatabaseConfig::new());
    script.push_outcome(ExecOutcome::affected(1).with_keys(row([
        ("ID", Value::I32(12)),
        ("xmin", Value::I64(99)),
    ])));
    let mut carl = Person {
        name: "carl".to_string(),
        ..Default::default()
    };
    db.query().generated_keys(["id"]).insert(&mut carl).unwrap();
    assert_eq!(carl.id, 12);
}

#[test]
fn no_keys_reported_leaves_record_alone() {
    let script = Script::new();
    let db = Database::new(script.provider(), DatabaseConfig::new());
    let mut dan = Person {
        id: 5,
        name: "dan".to_string(),
        ..Default::default()
    };
    let result = db.insert(&mut dan).unwrap();
    assert!(result.generated_keys.is_none());
    assert_eq!(dan.id, 5);
}
