//! Log capture: handler events inherit the request span, every request gets
//! one access line, and emails never reach the log output in clear text.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock};

use actix_web::http::StatusCode;
use actix_web::{test, web, App, HttpResponse};
use employee_api::middleware::{RequestTrace, StructuredLogger, TraceSpan};
use employee_api::routes;
use serde_json::{json, Value};
use serial_test::serial;
use tracing::info;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::Registry;

use crate::support::{fast_policy, state_with_repo, MemoryEmployeeRepository};

/// Appends JSON lines to a shared buffer.
#[derive(Clone)]
struct BufWriter(Arc<Mutex<Vec<u8>>>);

impl Write for BufWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Installs the capturing subscriber once for the binary and returns its buffer.
fn captured() -> Arc<Mutex<Vec<u8>>> {
    static BUF: OnceLock<Arc<Mutex<Vec<u8>>>> = OnceLock::new();
    BUF.get_or_init(|| {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let make_writer = {
            let buf = buf.clone();
            move || BufWriter(buf.clone())
        };
        let subscriber = Registry::default().with(
            fmt::Layer::default()
                .json()
                .with_span_list(true)
                .with_current_span(true)
                .with_ansi(false)
                .with_writer(make_writer),
        );
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
        buf
    })
    .clone()
}

fn drain_lines(buf: &Arc<Mutex<Vec<u8>>>) -> Vec<Value> {
    let bytes = std::mem::take(&mut *buf.lock().unwrap());
    String::from_utf8(bytes)
        .expect("utf8")
        .lines()
        .filter_map(|l| serde_json::from_str::<Value>(l).ok())
        .collect()
}

fn message(v: &Value) -> &str {
    v.get("fields")
        .and_then(|f| f.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn header_trace_id(resp: &actix_web::dev::ServiceResponse) -> String {
    resp.headers()
        .get("x-trace-id")
        .expect("x-trace-id header present")
        .to_str()
        .unwrap()
        .to_string()
}

#[actix_web::test]
#[serial]
async fn handler_logs_are_in_request_span_with_trace_id() {
    let buf = captured();
    drain_lines(&buf);

    let app = test::init_service(
        App::new()
            .wrap(StructuredLogger)
            .wrap(TraceSpan)
            .wrap(RequestTrace)
            .route(
                "/ping",
                web::get().to(|| async {
                    info!("inside handler");
                    HttpResponse::Ok().finish()
                }),
            ),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
    assert!(resp.status().is_success());
    let trace_id = header_trace_id(&resp);

    let lines = drain_lines(&buf);
    let handler_line = lines
        .iter()
        .find(|v| message(v).contains("inside handler"))
        .expect("did not capture handler log line");

    let in_span = handler_line
        .get("spans")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .any(|s| {
            s.get("name").and_then(Value::as_str) == Some("request")
                && s.get("trace_id").and_then(Value::as_str) == Some(trace_id.as_str())
        });
    assert!(in_span, "handler log did not inherit trace_id via the request span");
}

#[actix_web::test]
#[serial]
async fn access_line_carries_status_and_trace_id() {
    let buf = captured();
    drain_lines(&buf);

    let repo = Arc::new(MemoryEmployeeRepository::new());
    let data = web::Data::new(state_with_repo(repo, fast_policy()).await);
    let app = test::init_service(
        App::new()
            .wrap(StructuredLogger)
            .wrap(TraceSpan)
            .wrap(RequestTrace)
            .app_data(data)
            .configure(routes::configure),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/employees/404").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let trace_id = header_trace_id(&resp);

    let lines = drain_lines(&buf);
    let access: Vec<_> = lines
        .iter()
        .filter(|v| message(v) == "request_completed")
        .collect();
    assert_eq!(access.len(), 1, "{lines:?}");

    let line = access[0];
    assert_eq!(line["level"], "WARN");
    assert_eq!(line["fields"]["http.status_code"], 404);
    assert_eq!(line["fields"]["trace_id"], trace_id.as_str());
    assert_eq!(line["fields"]["url.path"], "/api/employees/404");
}

#[actix_web::test]
#[serial]
async fn emails_are_masked_in_logs() {
    let buf = captured();
    drain_lines(&buf);

    let repo = Arc::new(MemoryEmployeeRepository::new());
    let data = web::Data::new(state_with_repo(repo, fast_policy()).await);
    let app = test::init_service(
        App::new()
            .wrap(StructuredLogger)
            .wrap(TraceSpan)
            .wrap(RequestTrace)
            .app_data(data)
            .configure(routes::configure),
    )
    .await;

    let body = json!({"firstName": "Pii", "lastName": "Check", "email": "secret.person@example.com"});
    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let req = test::TestRequest::post()
            .uri("/api/employees")
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), expected);
    }

    let raw = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
    assert!(raw.contains("employee created"), "{raw}");
    assert!(!raw.contains("secret.person@example.com"), "{raw}");
    assert!(raw.contains("s***@example.com"), "{raw}");
}
