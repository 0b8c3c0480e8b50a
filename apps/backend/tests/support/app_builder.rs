use actix_http::Request;
use actix_web::body::BoxBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web, App, Error};
use employee_api::middleware::{RequestTrace, StructuredLogger, TraceSpan};
use employee_api::routes;
use employee_api::state::app_state::AppState;

/// Build a test service wired exactly like `main`: same middleware order,
/// same routes, same problem-details fallback for unknown paths.
pub async fn create_test_app(
    state: AppState,
) -> impl Service<Request, Response = ServiceResponse<BoxBody>, Error = Error> {
    let data = web::Data::new(state);

    test::init_service(
        App::new()
            .wrap(StructuredLogger)
            .wrap(TraceSpan)
            .wrap(RequestTrace)
            .app_data(data)
            .configure(routes::configure)
            .default_service(web::to(routes::not_found)),
    )
    .await
}
