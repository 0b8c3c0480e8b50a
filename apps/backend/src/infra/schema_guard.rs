//! Startup check that the declared mapping, the SeaORM entities and the live
//! schema agree on columns and nullability.
//!
//! Runs once while building `AppState`. Any drift is a `Config` error so the
//! process refuses to serve instead of failing on first use.

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, EntityName, IdenStatic,
    Iterable, Statement,
};
use tracing::{error, info};

use crate::entities::employees;
use crate::entities::mapping::{TableMapping, ALL};
use crate::error::AppError;

/// A column as seen by one side of the comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedColumn {
    pub name: String,
    pub nullable: bool,
}

impl ObservedColumn {
    pub fn new(name: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            nullable,
        }
    }
}

fn entity_columns(table: &str) -> Option<Vec<ObservedColumn>> {
    if table == employees::Entity.table_name() {
        return Some(
            employees::Column::iter()
                .map(|c| ObservedColumn::new(c.as_str(), c.def().is_null()))
                .collect(),
        );
    }
    None
}

async fn live_columns(
    conn: &DatabaseConnection,
    table: &str,
) -> Result<Vec<ObservedColumn>, AppError> {
    let backend = conn.get_database_backend();
    let stmt = match backend {
        DatabaseBackend::Postgres => Statement::from_sql_and_values(
            backend,
            "SELECT column_name::text AS name, \
                    CASE WHEN is_nullable = 'YES' THEN 1 ELSE 0 END AS nullable \
             FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1",
            [table.into()],
        ),
        DatabaseBackend::Sqlite => Statement::from_sql_and_values(
            backend,
            "SELECT name, CASE WHEN \"notnull\" = 0 AND pk = 0 THEN 1 ELSE 0 END AS nullable \
             FROM pragma_table_info(?)",
            [table.into()],
        ),
        DatabaseBackend::MySql => {
            return Err(AppError::config("schema verification does not support MySQL"));
        }
    };

    let rows = conn
        .query_all(stmt)
        .await
        .map_err(|e| AppError::config(format!("failed to read columns of '{table}': {e}")))?;

    rows.iter()
        .map(|row| {
            let name: String = row.try_get("", "name")?;
            let nullable: i32 = row.try_get("", "nullable")?;
            Ok(ObservedColumn::new(name, nullable != 0))
        })
        .collect::<Result<Vec<_>, sea_orm::DbErr>>()
        .map_err(|e| AppError::config(format!("failed to decode columns of '{table}': {e}")))
}

/// Every mismatch between the declared mapping and one observed column set.
/// `source` names the observed side in the messages.
pub fn compare_columns(
    mapping: &TableMapping,
    source: &str,
    observed: &[ObservedColumn],
) -> Vec<String> {
    let mut drift = Vec::new();

    if observed.is_empty() {
        drift.push(format!("{source}: table '{}' not found", mapping.table));
        return drift;
    }

    for spec in mapping.columns {
        match observed.iter().find(|c| c.name == spec.column) {
            None => drift.push(format!(
                "{source}: column '{}.{}' (field '{}') is missing",
                mapping.table, spec.column, spec.field
            )),
            Some(col) if col.nullable != spec.nullable => drift.push(format!(
                "{source}: column '{}.{}' nullable={} but mapping declares nullable={}",
                mapping.table, spec.column, col.nullable, spec.nullable
            )),
            Some(_) => {}
        }
    }

    // Unmapped nullable columns are harmless; unmapped NOT NULL ones break inserts.
    for col in observed {
        if mapping.column(&col.name).is_none() && !col.nullable {
            drift.push(format!(
                "{source}: NOT NULL column '{}.{}' is not mapped",
                mapping.table, col.name
            ));
        }
    }

    drift
}

/// Check every mapped table against its entity and the live database.
pub async fn verify_schema(conn: &DatabaseConnection) -> Result<(), AppError> {
    let mut drift = Vec::new();

    for mapping in ALL {
        match entity_columns(mapping.table) {
            Some(cols) => drift.extend(compare_columns(mapping, "entity", &cols)),
            None => drift.push(format!("entity: no entity for table '{}'", mapping.table)),
        }

        let live = live_columns(conn, mapping.table).await?;
        drift.extend(compare_columns(mapping, "database", &live));
    }

    if drift.is_empty() {
        info!(tables = ALL.len(), "schema_check=ok");
        return Ok(());
    }

    for line in &drift {
        error!(drift = %line, "schema_check=drift");
    }
    Err(AppError::config(format!(
        "schema does not match mapping: {}",
        drift.join("; ")
    )))
}
