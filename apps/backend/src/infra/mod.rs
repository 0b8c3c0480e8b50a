//! Infrastructure layer - database bootstrap, state building, schema and error translation.

pub mod db;
pub mod db_errors;
pub mod schema_guard;
pub mod state;
