use super::*;
use crate::descriptor::ColumnMeta;
use indexmap::IndexMap;

fn column(name: &str, data_type: DataType) -> ColumnMeta {
    ColumnMeta {
        name: name.to_string(),
        member: "",
        data_type,
        primary_key: false,
        generated: false,
        constraints: None,
    }
}

fn key(name: &str) -> ColumnMeta {
    ColumnMeta {
        primary_key: true,
        generated: true,
        ..column(name, DataType::Integer)
    }
}

/// `t (id integer key generated, name text)`
fn person() -> TableMeta {
    TableMeta::new(
        "Person",
        "t".to_string(),
        vec![key("id"), column("name", DataType::Text)],
    )
}

fn values(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn spec() -> QuerySpec {
    QuerySpec::new()
}

#[test]
fn standard_insert_update_delete() {
    let d = StandardDialect;
    let meta = person();
    assert_eq!(
        d.insert_sql(&meta, &spec()).unwrap(),
        "insert into t (name) values (?)"
    );
    assert_eq!(
        d.update_sql(&meta, &spec()).unwrap(),
        "update t set name=? where id=?"
    );
    assert_eq!(d.delete_sql(&meta, &spec()).unwrap(), "delete from t where id=?");
}

#[test]
fn argument_order_follows_the_sql() {
    let d = StandardDialect;
    let meta = person();
    let record = values(&[("id", Value::I64(5)), ("name", Value::Text("bob".into()))]);
    assert_eq!(
        d.insert_args(&meta, &record).unwrap(),
        vec![Value::Text("bob".into())]
    );
    assert_eq!(
        d.update_args(&meta, &record).unwrap(),
        vec![Value::Text("bob".into()), Value::I64(5)]
    );
    assert_eq!(d.delete_args(&meta, &record).unwrap(), vec![Value::I64(5)]);
}

#[test]
fn composite_keys_are_joined_with_and() {
    let meta = TableMeta::new(
        "Membership",
        "members".to_string(),
        vec![
            ColumnMeta {
                primary_key: true,
                ..column("group_id", DataType::BigInt)
            },
            ColumnMeta {
                primary_key: true,
                ..column("user_id", DataType::BigInt)
            },
            column("role", DataType::Text),
        ],
    );
    let d = StandardDialect;
    assert_eq!(
        d.insert_sql(&meta, &spec()).unwrap(),
        "insert into members (group_id,user_id,role) values (?,?,?)"
    );
    assert_eq!(
        d.update_sql(&meta, &spec()).unwrap(),
        "update members set role=? where group_id=? and user_id=?"
    );
    assert_eq!(
        d.delete_sql(&meta, &spec()).unwrap(),
        "delete from members where group_id=? and user_id=?"
    );
    assert_eq!(
        d.create_table_sql(&meta, &spec()).unwrap(),
        "create table members (group_id bigint,user_id bigint,role varchar(255), primary key (group_id,user_id))"
    );
}

#[test]
fn keyless_update_and_delete_fail() {
    let meta = TableMeta::new("Log", "log".to_string(), vec![column("line", DataType::Text)]);
    let d = StandardDialect;
    let record = values(&[("line", Value::Text("x".into()))]);
    for err in [
        d.update_sql(&meta, &spec()).unwrap_err(),
        d.update_args(&meta, &record).unwrap_err(),
        d.delete_sql(&meta, &spec()).unwrap_err(),
        d.delete_args(&meta, &record).unwrap_err(),
    ] {
        assert!(matches!(err, NormError::MissingPrimaryKey { type_name: "Log", .. }));
    }
}

#[test]
fn table_override_applies_to_every_statement() {
    let d = StandardDialect;
    let meta = person();
    let spec = QuerySpec {
        table: Some("archive".to_string()),
        ..QuerySpec::default()
    };
    assert_eq!(
        d.insert_sql(&meta, &spec).unwrap(),
        "insert into archive (name) values (?)"
    );
    assert_eq!(
        d.select_sql(Some(&meta), &spec).unwrap(),
        "select id,name from archive"
    );
}

#[test]
fn select_with_where_and_order() {
    let d = StandardDialect;
    let meta = person();
    let spec = QuerySpec {
        where_clause: Some("name=?".to_string()),
        order_by: Some("id desc".to_string()),
        ..QuerySpec::default()
    };
    assert_eq!(
        d.select_sql(Some(&meta), &spec).unwrap(),
        "select id,name from t where name=? order by id desc"
    );
}

#[test]
fn select_without_mapping_needs_a_table() {
    let d = StandardDialect;
    let err = d.select_sql(None, &spec()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Mapping error: You must specify a table name with the table() method."
    );
    let spec = QuerySpec {
        table: Some("t".to_string()),
        ..QuerySpec::default()
    };
    assert_eq!(d.select_sql(None, &spec).unwrap(), "select * from t");
}

#[test]
fn literal_sql_wins() {
    let d = StandardDialect;
    let spec = QuerySpec {
        sql: Some("select count(*) from t".to_string()),
        table: Some("ignored".to_string()),
        ..QuerySpec::default()
    };
    assert_eq!(
        d.select_sql(Some(&person()), &spec).unwrap(),
        "select count(*) from t"
    );
}

#[test]
fn delete_where_requires_table() {
    let d = StandardDialect;
    assert!(d.delete_where_sql(&spec()).is_err());
    let spec = QuerySpec {
        table: Some("t".to_string()),
        where_clause: Some("id>?".to_string()),
        ..QuerySpec::default()
    };
    assert_eq!(d.delete_where_sql(&spec).unwrap(), "delete from t where id>?");
}

#[test]
fn standard_create_table() {
    assert_eq!(
        StandardDialect.create_table_sql(&person(), &spec()).unwrap(),
        "create table t (id integer auto_increment,name varchar(255), primary key (id))"
    );
}

#[test]
fn column_definitions_follow_constraints() {
    let d = StandardDialect;
    let mut email = column("email", DataType::Text);
    email.constraints = Some(ColumnConstraints::new().length(80).unique(true).nullable(false));
    assert_eq!(d.column_definition(&email), "email varchar(80) unique not null");

    let mut price = column("price", DataType::Decimal);
    price.constraints = Some(ColumnConstraints::new().precision(12).scale(4));
    assert_eq!(d.column_definition(&price), "price decimal(12,4)");

    let mut raw = column("doc", DataType::Text);
    raw.constraints = Some(ColumnConstraints::new().definition("json not null"));
    assert_eq!(d.column_definition(&raw), "doc json not null");

    assert_eq!(
        d.column_definition(&column("at", DataType::DateTime)),
        "at datetime"
    );
    assert_eq!(
        d.column_definition(&column("ok", DataType::Boolean)),
        "ok varchar(255)"
    );
}

#[test]
fn standard_has_no_upsert() {
    let meta = person();
    let err = StandardDialect.upsert_sql(&meta, &spec()).unwrap_err();
    assert!(err.is_unsupported());
    assert_eq!(
        err.to_string(),
        "Operation 'upsert' is not supported by the standard dialect"
    );
    assert!(StandardDialect.upsert_args(&meta, &values(&[])).is_err());
}

#[test]
fn mysql_upsert_repeats_insert_arguments() {
    let d = MySqlDialect;
    let meta = person();
    assert_eq!(
        d.upsert_sql(&meta, &spec()).unwrap(),
        "insert into t (name) values (?) on duplicate key update name=?"
    );
    let record = values(&[("id", Value::I64(1)), ("name", Value::Text("bob".into()))]);
    assert_eq!(
        d.upsert_args(&meta, &record).unwrap(),
        vec![Value::Text("bob".into()), Value::Text("bob".into())]
    );
}

#[test]
fn postgres_uses_serial_and_native_types() {
    let d = PostgresDialect;
    assert_eq!(
        d.create_table_sql(&person(), &spec()).unwrap(),
        "create table t (id serial,name varchar(255), primary key (id))"
    );
    assert_eq!(d.column_definition(&column("ok", DataType::Boolean)), "ok boolean");
    assert_eq!(
        d.column_definition(&column("score", DataType::Double)),
        "score double precision"
    );
    assert_eq!(
        d.column_definition(&column("at", DataType::DateTime)),
        "at timestamp"
    );
    assert!(d.upsert_sql(&person(), &spec()).is_err());
}

#[test]
fn dialect_kind_parsing() {
    assert_eq!("MySQL".parse::<DialectKind>().unwrap(), DialectKind::MySql);
    assert_eq!("pg".parse::<DialectKind>().unwrap(), DialectKind::Postgres);
    assert_eq!("".parse::<DialectKind>().unwrap(), DialectKind::Standard);
    assert!("oracle".parse::<DialectKind>().is_err());
    assert_eq!(DialectKind::MySql.to_string(), "mysql");
    assert_eq!(DialectKind::Postgres.into_dialect().name(), "postgres");
}
