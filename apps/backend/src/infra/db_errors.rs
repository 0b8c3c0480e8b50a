//! SeaORM -> DomainError translation.
//!
//! Repositories convert `sea_orm::DbErr` into `DomainError` here; handlers then
//! map `DomainError` to `AppError` via `From`.

use sea_orm::{ConnAcquireErr, DbErr, RuntimeErr};
use tracing::{error, warn};

use crate::errors::domain::{ConflictKind, DomainError, InfraErrorKind, NotFoundKind};
use crate::logging::pii::Redacted;
use crate::trace_ctx;

/// Constraint names and `table.column` pairs that identify the email uniqueness rule.
const EMAIL_UNIQUE_MARKERS: &[&str] = &["idx_employees_email_unique", "employees.email"];

fn mentions_sqlstate(msg: &str, code: &str) -> bool {
    msg.contains(code) || msg.contains(&format!("SQLSTATE({code})"))
}

fn is_unique_violation(msg: &str) -> bool {
    mentions_sqlstate(msg, "23505")
        || msg.contains("duplicate key value violates unique constraint")
        || msg.contains("UNIQUE constraint failed")
}

/// Which domain conflict a unique violation represents, if we recognise it.
fn unique_conflict_kind(msg: &str) -> Option<ConflictKind> {
    EMAIL_UNIQUE_MARKERS
        .iter()
        .any(|marker| msg.contains(marker))
        .then_some(ConflictKind::UniqueEmail)
}

fn is_timeout(msg: &str) -> bool {
    let lower = msg.to_ascii_lowercase();
    lower.contains("timed out") || lower.contains("timeout") || mentions_sqlstate(msg, "57014")
}

fn is_unavailable(e: &DbErr, msg: &str) -> bool {
    match e {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(RuntimeErr::SqlxError(_)) | DbErr::Query(RuntimeErr::SqlxError(_)) => {
            let lower = msg.to_ascii_lowercase();
            lower.contains("connection refused")
                || lower.contains("connection reset")
                || lower.contains("broken pipe")
                || lower.contains("pool closed")
                || mentions_sqlstate(msg, "57P01")
                || mentions_sqlstate(msg, "08006")
        }
        _ => false,
    }
}

/// Translate a `DbErr` into a `DomainError` with sanitized, PII-safe detail.
pub fn map_db_err(e: DbErr) -> DomainError {
    let error_msg = e.to_string();
    let trace_id = trace_ctx::trace_id();

    if let DbErr::RecordNotFound(_) = e {
        return DomainError::not_found(NotFoundKind::Other("Record".into()), "Record not found");
    }

    if let DbErr::Type(_) | DbErr::Json(_) = e {
        error!(trace_id = %trace_id, raw_error = %Redacted(&error_msg), "Stored row could not be decoded");
        return DomainError::infra(InfraErrorKind::DataCorruption, "Stored data is corrupt");
    }

    if let DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) = e {
        warn!(trace_id = %trace_id, "Connection pool exhausted");
        return DomainError::infra(
            InfraErrorKind::Timeout,
            "Timed out waiting for a database connection",
        );
    }

    if is_unavailable(&e, &error_msg) {
        warn!(trace_id = %trace_id, raw_error = %Redacted(&error_msg), "Database unavailable");
        return DomainError::infra(InfraErrorKind::DbUnavailable, "Database unavailable");
    }

    if is_unique_violation(&error_msg) {
        warn!(trace_id = %trace_id, raw_error = %Redacted(&error_msg), "Unique constraint violation");
        return match unique_conflict_kind(&error_msg) {
            Some(ConflictKind::UniqueEmail) => {
                DomainError::conflict(ConflictKind::UniqueEmail, "Email already exists")
            }
            _ => DomainError::conflict(
                ConflictKind::Other("Unique".into()),
                "Unique constraint violation",
            ),
        };
    }

    if mentions_sqlstate(&error_msg, "23502") || error_msg.contains("NOT NULL constraint failed") {
        warn!(trace_id = %trace_id, raw_error = %Redacted(&error_msg), "Not-null constraint violation");
        return DomainError::validation_other("Required column missing");
    }

    if mentions_sqlstate(&error_msg, "23514") || error_msg.contains("CHECK constraint failed") {
        warn!(trace_id = %trace_id, raw_error = %Redacted(&error_msg), "Check constraint violation");
        return DomainError::validation_other("Check constraint violation");
    }

    if is_timeout(&error_msg) {
        warn!(trace_id = %trace_id, raw_error = %Redacted(&error_msg), "Database timeout");
        return DomainError::infra(InfraErrorKind::Timeout, "Database timeout");
    }

    error!(trace_id = %trace_id, raw_error = %Redacted(&error_msg), "Unhandled database error");
    DomainError::infra(
        InfraErrorKind::Other("DbErr".into()),
        "Database operation failed",
    )
}

impl From<DbErr> for DomainError {
    fn from(e: DbErr) -> Self {
        map_db_err(e)
    }
}
