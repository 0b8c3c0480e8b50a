use actix_web::{web, App, HttpServer};
use employee_api::config::db::RuntimeEnv;
use employee_api::middleware::{RequestTrace, StructuredLogger, TraceSpan};
use employee_api::{build_state, routes, telemetry, AppConfig};
use tracing::{error, info, warn};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Environment variables are provided by the runtime (compose env_file,
    // systemd EnvironmentFile, or a sourced .env in local development).
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let app_state = match build_state()
        .with_env(RuntimeEnv::Prod)
        .with_db(config.db_kind)
        .run_migrations(config.run_migrations)
        .with_call_policy(config.call_policy())
        .build()
        .await
    {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to build application state");
            std::process::exit(1);
        }
    };

    let (host, port) = config.bind_addr();
    info!(host = %host, port, workers = config.workers, db_kind = ?config.db_kind, "starting employee-api");

    let data = web::Data::new(app_state.clone());

    HttpServer::new(move || {
        App::new()
            .wrap(StructuredLogger)
            .wrap(TraceSpan)
            .wrap(RequestTrace)
            .app_data(data.clone())
            .configure(routes::configure)
            .default_service(web::to(routes::not_found))
    })
    .workers(config.workers)
    .bind((host.as_str(), port))?
    .run()
    .await?;

    info!("server stopped, closing database pool");
    if let Err(e) = app_state.close().await {
        warn!(error = %e, "failed to close database pool");
    }
    Ok(())
}
