//! Declared field-to-column mapping for every persisted entity.
//!
//! `infra::schema_guard` checks these tables once at startup against both the
//! SeaORM entity definitions and the live database, so drift between code and
//! schema is reported before the first request instead of on first use.

/// One persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Field name on the domain model.
    pub field: &'static str,
    pub column: &'static str,
    pub nullable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableMapping {
    pub table: &'static str,
    pub columns: &'static [ColumnSpec],
}

impl TableMapping {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.column == name)
    }
}

const fn col(field: &'static str, column: &'static str) -> ColumnSpec {
    ColumnSpec {
        field,
        column,
        nullable: false,
    }
}

pub const EMPLOYEES: TableMapping = TableMapping {
    table: "employees",
    columns: &[
        col("id", "id"),
        col("first_name", "first_name"),
        col("last_name", "last_name"),
        col("email", "email"),
        col("created_at", "created_at"),
        col("updated_at", "updated_at"),
    ],
};

pub const ALL: &[TableMapping] = &[EMPLOYEES];
