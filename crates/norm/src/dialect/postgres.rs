use super::SqlDialect;
use crate::descriptor::{ColumnConstraints, ColumnMeta, DataType};

/// PostgreSQL: generated columns are `serial`, and the type names Postgres
/// lacks are mapped to its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn column_definition(&self, column: &ColumnMeta) -> String {
        let defaults = ColumnConstraints::default();
        let constraints = column.constraints.as_ref().unwrap_or(&defaults);
        if let Some(definition) = &constraints.definition {
            return format!("{} {definition}", column.name);
        }

        let mut def = if column.generated {
            format!("{} serial", column.name)
        } else {
            format!(
                "{} {}",
                column.name,
                self.column_type(column.data_type, constraints)
            )
        };
        if constraints.unique {
            def.push_str(" unique");
        }
        if !constraints.nullable {
            def.push_str(" not null");
        }
        def
    }

    fn column_type(&self, data_type: DataType, constraints: &ColumnConstraints) -> String {
        match data_type {
            DataType::Integer => "integer".to_string(),
            DataType::BigInt => "bigint".to_string(),
            DataType::Double => "double precision".to_string(),
            DataType::Float => "real".to_string(),
            DataType::Decimal => {
                format!("decimal({},{})", constraints.precision, constraints.scale)
            }
            DataType::DateTime => "timestamp".to_string(),
            DataType::Boolean => "boolean".to_string(),
            DataType::Text => format!("varchar({})", constraints.length),
        }
    }
}
