use std::fmt;

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};

use crate::error::AppError;
use crate::errors::ErrorCode;

/// Employee id taken from the `{id}` path segment. Must parse as a positive `i64`.
///
/// Existence is not checked here; the service reports `EMPLOYEE_NOT_FOUND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmployeeId(pub i64);

impl EmployeeId {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let id = raw.trim().parse::<i64>().map_err(|_| {
            AppError::bad_request(
                ErrorCode::InvalidEmployeeId,
                format!("Invalid employee id: {raw}"),
            )
        })?;

        if id <= 0 {
            return Err(AppError::bad_request(
                ErrorCode::InvalidEmployeeId,
                format!("Employee id must be positive, got: {id}"),
            ));
        }

        Ok(EmployeeId(id))
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromRequest for EmployeeId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = match req.match_info().get("id") {
            Some(raw) => EmployeeId::parse(raw),
            None => Err(AppError::bad_request(
                ErrorCode::InvalidEmployeeId,
                "Missing employee id parameter",
            )),
        };
        ready(result)
    }
}
