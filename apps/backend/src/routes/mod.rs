use actix_web::{web, HttpRequest, HttpResponse};

use crate::error::AppError;
use crate::errors::ErrorCode;

pub mod employees;
pub mod health;

/// Register every route. `main` and the test app builder share this so tests
/// exercise the same paths the server exposes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Banner and health: /, /health
    health::configure_routes(cfg);

    // Employee CRUD: /api/employees/**
    cfg.service(web::scope("/api/employees").configure(employees::configure_routes));
}

/// Problem-details 404 for paths no route matches.
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, AppError> {
    Err(AppError::not_found(
        ErrorCode::NotFound,
        format!("No route for {}", req.path()),
    ))
}
