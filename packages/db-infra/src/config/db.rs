use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sea_orm::DatabaseBackend;

use crate::error::DbInfraError;

/// RFC 3986 unreserved characters stay as-is in the userinfo part.
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Runtime profile the process runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    Prod,
    /// Test profile - database names must end in `_test`
    Test,
}

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Postgres,
    SqliteFile,
    SqliteMemory,
}

impl FromStr for DbKind {
    type Err = DbInfraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(DbKind::Postgres),
            "sqlite-file" | "sqlite_file" | "sqlite" => Ok(DbKind::SqliteFile),
            "sqlite-memory" | "sqlite_memory" | "memory" => Ok(DbKind::SqliteMemory),
            other => Err(DbInfraError::config(format!(
                "unknown database kind '{other}' (expected postgres | sqlite-file | sqlite-memory)"
            ))),
        }
    }
}

impl From<DbKind> for DatabaseBackend {
    fn from(kind: DbKind) -> Self {
        match kind {
            DbKind::Postgres => DatabaseBackend::Postgres,
            DbKind::SqliteFile | DbKind::SqliteMemory => DatabaseBackend::Sqlite,
        }
    }
}

/// Which credentials a pool connects with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbOwner {
    /// Application-level access (limited permissions)
    App,
    /// Owner-level access (full permissions for migrations)
    Owner,
}

/// Network connection parameters for a server-backed database.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ConnParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Where a pool points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    Postgres(ConnParams),
    SqliteFile(PathBuf),
    SqliteMemory,
}

impl DbTarget {
    pub fn kind(&self) -> DbKind {
        match self {
            DbTarget::Postgres(_) => DbKind::Postgres,
            DbTarget::SqliteFile(_) => DbKind::SqliteFile,
            DbTarget::SqliteMemory => DbKind::SqliteMemory,
        }
    }

    /// Connection URL understood by SeaORM / sqlx. Credentials are percent-encoded.
    pub fn url(&self) -> String {
        match self {
            DbTarget::Postgres(p) => format!(
                "postgres://{}:{}@{}:{}/{}",
                utf8_percent_encode(&p.username, USERINFO),
                utf8_percent_encode(&p.password, USERINFO),
                p.host,
                p.port,
                p.database
            ),
            DbTarget::SqliteFile(path) => format!("sqlite://{}?mode=rwc", path.display()),
            DbTarget::SqliteMemory => "sqlite::memory:".to_string(),
        }
    }

    /// URL with the password masked, safe for logs.
    pub fn redacted_url(&self) -> String {
        sanitize_db_url(&self.url())
    }
}

/// Pool sizing and timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

impl PoolSettings {
    /// Defaults per profile and engine. In-memory SQLite is pinned to one
    /// connection because every connection opens a separate database.
    pub fn defaults(env: RuntimeEnv, kind: DbKind) -> Self {
        let max_connections = match (kind, env) {
            (DbKind::SqliteMemory, _) => 1,
            (DbKind::SqliteFile, _) => 4,
            (DbKind::Postgres, RuntimeEnv::Test) => 4,
            (DbKind::Postgres, RuntimeEnv::Prod) => (num_cpus::get() as u32 * 2).max(4),
        };
        Self {
            max_connections,
            min_connections: 1,
            acquire_timeout: Duration::from_millis(5_000),
            connect_timeout: Duration::from_millis(5_000),
            idle_timeout: Duration::from_secs(300),
        }
    }

    /// Defaults overridden by `DB_MAX_CONNECTIONS`, `DB_MIN_CONNECTIONS`,
    /// `DB_ACQUIRE_TIMEOUT_MS`, `DB_CONNECT_TIMEOUT_MS` and `DB_IDLE_TIMEOUT_SECS`.
    pub fn from_env(env: RuntimeEnv, kind: DbKind) -> Result<Self, DbInfraError> {
        let mut settings = Self::defaults(env, kind);

        if let Some(v) = parse_var::<u32>("DB_MAX_CONNECTIONS")? {
            settings.max_connections = v;
        }
        if let Some(v) = parse_var::<u32>("DB_MIN_CONNECTIONS")? {
            settings.min_connections = v;
        }
        if let Some(v) = parse_var::<u64>("DB_ACQUIRE_TIMEOUT_MS")? {
            settings.acquire_timeout = Duration::from_millis(v);
        }
        if let Some(v) = parse_var::<u64>("DB_CONNECT_TIMEOUT_MS")? {
            settings.connect_timeout = Duration::from_millis(v);
        }
        if let Some(v) = parse_var::<u64>("DB_IDLE_TIMEOUT_SECS")? {
            settings.idle_timeout = Duration::from_secs(v);
        }

        settings.normalize(kind)
    }

    fn normalize(mut self, kind: DbKind) -> Result<Self, DbInfraError> {
        if kind == DbKind::SqliteMemory {
            self.max_connections = 1;
            self.min_connections = 1;
        }
        if self.max_connections == 0 {
            return Err(DbInfraError::config("DB_MAX_CONNECTIONS must be at least 1"));
        }
        if self.min_connections > self.max_connections {
            self.min_connections = self.max_connections;
        }
        Ok(self)
    }
}

/// Everything needed to open a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub env: RuntimeEnv,
    pub target: DbTarget,
    pub pool: PoolSettings,
}

impl DbConfig {
    /// Reads the target and pool settings from the environment.
    pub fn from_env(env: RuntimeEnv, kind: DbKind, owner: DbOwner) -> Result<Self, DbInfraError> {
        validate_db_config(env, kind)?;
        let target = match kind {
            DbKind::Postgres => DbTarget::Postgres(conn_params(env, owner)?),
            DbKind::SqliteFile => DbTarget::SqliteFile(sqlite_file_path(env)?),
            DbKind::SqliteMemory => DbTarget::SqliteMemory,
        };
        Ok(Self {
            env,
            target,
            pool: PoolSettings::from_env(env, kind)?,
        })
    }

    /// Config for an explicit target (test harness, tools).
    pub fn for_target(env: RuntimeEnv, target: DbTarget) -> Self {
        let kind = target.kind();
        let pool = PoolSettings::defaults(env, kind);
        Self { env, target, pool }
    }

    pub fn kind(&self) -> DbKind {
        self.target.kind()
    }
}

/// Validates profile rules that do not depend on reachability.
pub fn validate_db_config(env: RuntimeEnv, kind: DbKind) -> Result<(), DbInfraError> {
    if kind == DbKind::Postgres {
        db_name(env)?;
    }
    Ok(())
}

/// Connection URL for a profile/engine/owner triple.
pub fn make_conn_spec(env: RuntimeEnv, kind: DbKind, owner: DbOwner) -> Result<String, DbInfraError> {
    Ok(DbConfig::from_env(env, kind, owner)?.target.url())
}

/// Connection parameters from `POSTGRES_HOST`, `POSTGRES_PORT`, the profile
/// database name and the owner's credentials.
pub fn conn_params(env: RuntimeEnv, owner: DbOwner) -> Result<ConnParams, DbInfraError> {
    let (username, password) = credentials(owner)?;
    Ok(ConnParams {
        host: host(),
        port: port()?,
        database: db_name(env)?,
        username,
        password,
    })
}

/// Session statements applied once a pool is open.
pub fn build_session_statements(kind: DbKind) -> Vec<String> {
    match kind {
        DbKind::SqliteFile | DbKind::SqliteMemory => vec![
            "PRAGMA foreign_keys = ON;".to_string(),
            "PRAGMA busy_timeout = 5000;".to_string(),
        ],
        DbKind::Postgres => vec!["SET timezone = 'UTC';".to_string()],
    }
}

/// Masks the password in a connection URL.
pub fn sanitize_db_url(url: &str) -> String {
    let Some((auth_part, host_part)) = url.rsplit_once('@') else {
        return url.to_string();
    };
    match auth_part.rfind(':') {
        Some(colon_pos) if auth_part[..colon_pos].contains("//") => {
            format!("{}:***@{}", &auth_part[..colon_pos], host_part)
        }
        _ => url.to_string(),
    }
}

fn host() -> String {
    env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string())
}

fn port() -> Result<u16, DbInfraError> {
    Ok(parse_var::<u16>("POSTGRES_PORT")?.unwrap_or(5432))
}

fn db_name(env: RuntimeEnv) -> Result<String, DbInfraError> {
    match env {
        RuntimeEnv::Prod => must_var("PROD_DB"),
        RuntimeEnv::Test => {
            let db_name = must_var("TEST_DB")?;
            if !db_name.ends_with("_test") {
                return Err(DbInfraError::config(format!(
                    "Test profile requires database name to end with '_test', but got: '{db_name}'"
                )));
            }
            Ok(db_name)
        }
    }
}

fn credentials(owner: DbOwner) -> Result<(String, String), DbInfraError> {
    match owner {
        DbOwner::App => Ok((must_var("APP_DB_USER")?, must_var("APP_DB_PASSWORD")?)),
        DbOwner::Owner => Ok((must_var("DB_OWNER_USER")?, must_var("DB_OWNER_PASSWORD")?)),
    }
}

fn sqlite_file_path(env: RuntimeEnv) -> Result<PathBuf, DbInfraError> {
    let dir = env::var("SQLITE_DB_DIR").unwrap_or_else(|_| "./data".to_string());
    let file = match env {
        RuntimeEnv::Prod => "employees.db",
        RuntimeEnv::Test => "employees_test.db",
    };
    std::fs::create_dir_all(&dir).map_err(|e| {
        DbInfraError::config(format!("failed to create SQLite directory '{dir}': {e}"))
    })?;
    Ok(PathBuf::from(dir).join(file))
}

fn must_var(name: &str) -> Result<String, DbInfraError> {
    env::var(name).map_err(|_| {
        DbInfraError::config(format!("Required environment variable '{name}' is not set"))
    })
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, DbInfraError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            DbInfraError::config(format!("environment variable '{name}' has invalid value '{raw}'"))
        }),
        Err(_) => Ok(None),
    }
}
