pub mod core;

pub use core::{build_admin_pool, connect, connect_once, orchestrate_migration, run_migration};
