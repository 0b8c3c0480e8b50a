use std::future::{ready, Ready};
use std::time::Instant;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::StatusCode;
use actix_web::{Error as ActixError, HttpMessage};
use futures_util::future::LocalBoxFuture;
use tracing::{error, info, warn};

use super::request_trace::TraceId;

/// Emits one `request_completed` event per request with method, path, status
/// and latency. Level follows the status class.
pub struct StructuredLogger;

impl<S, B> Transform<S, ServiceRequest> for StructuredLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type InitError = ();
    type Transform = StructuredLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(StructuredLoggerMiddleware { service }))
    }
}

pub struct StructuredLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for StructuredLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let line = AccessLine::begin(&req);
        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;
            let status = match &result {
                Ok(res) => res.status(),
                Err(err) => err.as_response_error().status_code(),
            };
            line.finish(status);
            result
        })
    }
}

/// Request fields captured before the inner service consumes the request.
struct AccessLine {
    started: Instant,
    method: String,
    path: String,
    trace_id: String,
}

impl AccessLine {
    fn begin(req: &ServiceRequest) -> Self {
        let trace_id = req
            .extensions()
            .get::<TraceId>()
            .map(|t| t.0.clone())
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            started: Instant::now(),
            method: req.method().to_string(),
            path: req.path().to_string(),
            trace_id,
        }
    }

    fn finish(self, status: StatusCode) {
        let Self {
            started,
            method,
            path,
            trace_id,
        } = self;
        let code = status.as_u16();
        let duration_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

        match status.as_u16() / 100 {
            5 => error!(http.method = %method, url.path = %path, http.status_code = code, duration_us, trace_id = %trace_id, "request_completed"),
            4 => warn!(http.method = %method, url.path = %path, http.status_code = code, duration_us, trace_id = %trace_id, "request_completed"),
            _ => info!(http.method = %method, url.path = %path, http.status_code = code, duration_us, trace_id = %trace_id, "request_completed"),
        }
    }
}
