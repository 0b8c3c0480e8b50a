use actix_web::error::QueryPayloadError;
use actix_web::http::header::LOCATION;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::employees::{EmployeeInput, ListParams};
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::extractors::{EmployeeId, ValidatedJson};
use crate::repos::employees::Employee;
use crate::state::app_state::AppState;

pub const DELETED_MESSAGE: &str = "Employee deleted successfully";

/// Body for create and update. Fields are optional so a missing field is
/// reported by validation rather than as a JSON type error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl From<EmployeeRequest> for EmployeeInput {
    fn from(r: EmployeeRequest) -> Self {
        EmployeeInput {
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Employee> for EmployeeResponse {
    fn from(e: Employee) -> Self {
        Self {
            id: e.id,
            first_name: e.first_name,
            last_name: e.last_name,
            email: e.email,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl From<ListQuery> for ListParams {
    fn from(q: ListQuery) -> Self {
        ListParams {
            email: q.email,
            first_name: q.first_name,
            last_name: q.last_name,
            limit: q.limit,
            offset: q.offset,
        }
    }
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::invalid(ErrorCode::InvalidQuery, format!("Invalid query string: {err}")).into()
}

async fn create_employee(
    app_state: web::Data<AppState>,
    body: ValidatedJson<EmployeeRequest>,
) -> Result<HttpResponse, AppError> {
    let employee = app_state
        .employees()
        .create(body.into_inner().into())
        .await?;

    Ok(HttpResponse::Created()
        .insert_header((LOCATION, format!("/api/employees/{}", employee.id)))
        .json(EmployeeResponse::from(employee)))
}

async fn list_employees(
    app_state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let employees = app_state.employees().list(query.into_inner().into()).await?;
    let body: Vec<EmployeeResponse> = employees.into_iter().map(EmployeeResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

async fn get_employee(
    app_state: web::Data<AppState>,
    id: EmployeeId,
) -> Result<HttpResponse, AppError> {
    let employee = app_state.employees().get(id.0).await?;
    Ok(HttpResponse::Ok().json(EmployeeResponse::from(employee)))
}

async fn update_employee(
    app_state: web::Data<AppState>,
    id: EmployeeId,
    body: ValidatedJson<EmployeeRequest>,
) -> Result<HttpResponse, AppError> {
    let employee = app_state
        .employees()
        .update(id.0, body.into_inner().into())
        .await?;
    Ok(HttpResponse::Ok().json(EmployeeResponse::from(employee)))
}

async fn delete_employee(
    app_state: web::Data<AppState>,
    id: EmployeeId,
) -> Result<HttpResponse, AppError> {
    app_state.employees().delete(id.0).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: DELETED_MESSAGE.to_string(),
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(query_error))
        .service(
            web::resource("")
                .route(web::post().to(create_employee))
                .route(web::get().to(list_employees)),
        )
        .service(
            web::resource("/{id}")
                .route(web::get().to(get_employee))
                .route(web::put().to(update_employee))
                .route(web::delete().to(delete_employee)),
        );
}
