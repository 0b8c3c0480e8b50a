pub mod app;

pub use db_infra::db;

pub use app::AppConfig;
