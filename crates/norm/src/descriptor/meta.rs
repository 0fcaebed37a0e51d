use super::property::ColumnMeta;

/// A statement with the table name left out, rendered per call so a query's
/// table override can be substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTemplate {
    head: &'static str,
    tail: String,
}

impl SqlTemplate {
    fn new(head: &'static str, tail: String) -> Self {
        Self { head, tail }
    }

    pub fn render(&self, table: &str) -> String {
        let mut sql = String::with_capacity(self.head.len() + table.len() + self.tail.len());
        sql.push_str(self.head);
        sql.push_str(table);
        sql.push_str(&self.tail);
        sql
    }
}

/// The record-type independent half of a descriptor.
///
/// Dialects only ever see this: column names, types, key designations and the
/// statement fragments precomputed from them.
#[derive(Debug, Clone)]
pub struct TableMeta {
    type_name: &'static str,
    table: String,
    columns: Vec<ColumnMeta>,
    primary_key_names: Vec<String>,
    generated_column_names: Vec<String>,
    insert_columns: Vec<String>,
    update_columns: Vec<String>,
    select_columns: String,
    insert_template: Option<SqlTemplate>,
    update_template: Option<SqlTemplate>,
    delete_template: Option<SqlTemplate>,
    upsert_assignments: String,
}

impl TableMeta {
    pub(crate) fn new(type_name: &'static str, table: String, columns: Vec<ColumnMeta>) -> Self {
        let primary_key_names: Vec<String> = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        let generated_column_names: Vec<String> = columns
            .iter()
            .filter(|c| c.generated)
            .map(|c| c.name.clone())
            .collect();
        let insert_columns: Vec<String> = columns
            .iter()
            .filter(|c| !c.generated)
            .map(|c| c.name.clone())
            .collect();
        let update_columns: Vec<String> = columns
            .iter()
            .filter(|c| !c.generated && !c.primary_key)
            .map(|c| c.name.clone())
            .collect();

        let select_columns = if columns.is_empty() {
            "*".to_string()
        } else {
            columns
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(",")
        };

        let insert_template = (!insert_columns.is_empty()).then(|| {
            let placeholders = vec!["?"; insert_columns.len()].join(",");
            SqlTemplate::new(
                "insert into ",
                format!(" ({}) values ({placeholders})", insert_columns.join(",")),
            )
        });

        let key_predicate = primary_key_names
            .iter()
            .map(|k| format!("{k}=?"))
            .collect::<Vec<_>>()
            .join(" and ");

        let upsert_assignments = assignments(&insert_columns);

        let update_template = (!primary_key_names.is_empty() && !update_columns.is_empty())
            .then(|| {
                SqlTemplate::new(
                    "update ",
                    format!(" set {} where {key_predicate}", assignments(&update_columns)),
                )
            });

        let delete_template = (!primary_key_names.is_empty())
            .then(|| SqlTemplate::new("delete from ", format!(" where {key_predicate}")));

        Self {
            type_name,
            table,
            columns,
            primary_key_names,
            generated_column_names,
            insert_columns,
            update_columns,
            select_columns,
            insert_template,
            update_template,
            delete_template,
            upsert_assignments,
        }
    }

    /// Rust type the descriptor was built from (simple name).
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Resolved table name, schema-qualified if a schema was declared.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key_names(&self) -> &[String] {
        &self.primary_key_names
    }

    pub fn generated_column_names(&self) -> &[String] {
        &self.generated_column_names
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key_names.is_empty()
    }

    /// Columns written by an insert (everything but generated columns).
    pub fn insert_columns(&self) -> &[String] {
        &self.insert_columns
    }

    /// Columns written by an update (no keys, no generated columns).
    pub fn update_columns(&self) -> &[String] {
        &self.update_columns
    }

    /// Comma separated column list, or `*` when no columns are mapped.
    pub fn select_columns(&self) -> &str {
        &self.select_columns
    }

    pub fn insert_template(&self) -> Option<&SqlTemplate> {
        self.insert_template.as_ref()
    }

    pub fn update_template(&self) -> Option<&SqlTemplate> {
        self.update_template.as_ref()
    }

    pub fn delete_template(&self) -> Option<&SqlTemplate> {
        self.delete_template.as_ref()
    }

    /// `a=?,b=?` over the insert columns.
    pub fn upsert_assignments(&self) -> &str {
        &self.upsert_assignments
    }
}

fn assignments(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("{c}=?"))
        .collect::<Vec<_>>()
        .join(",")
}
