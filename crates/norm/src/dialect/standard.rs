use super::SqlDialect;

/// Plain SQL. Has no upsert.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDialect;

impl SqlDialect for StandardDialect {
    fn name(&self) -> &'static str {
        "standard"
    }
}
