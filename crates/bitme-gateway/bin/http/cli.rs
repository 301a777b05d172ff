use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "BITME_GATEWAY_LISTEN_ADDR";
pub const STORAGE_BACKEND_ENV: &str = "BITME_GATEWAY_STORAGE_BACKEND";
pub const POSTGRES_DSN_ENV: &str = "BITME_GATEWAY_POSTGRES_DSN";
pub const MAX_CONNS_ENV: &str = "BITME_GATEWAY_MAX_CONNS";
pub const MIN_CONNS_ENV: &str = "BITME_GATEWAY_MIN_CONNS";
pub const MAX_CONN_LIFETIME_ENV: &str = "BITME_GATEWAY_MAX_CONN_LIFETIME_SECS";
pub const MAX_CONN_IDLE_TIME_ENV: &str = "BITME_GATEWAY_MAX_CONN_IDLE_TIME_SECS";
pub const ACQUIRE_TIMEOUT_ENV: &str = "BITME_GATEWAY_ACQUIRE_TIMEOUT_SECS";
pub const INIT_SCHEMA_ENV: &str = "BITME_GATEWAY_INIT_SCHEMA";
pub const STRICT_RESOLVE_ENV: &str = "BITME_GATEWAY_STRICT_RESOLVE";
pub const SHORT_CODE_LENGTH_ENV: &str = "BITME_GATEWAY_SHORT_CODE_LENGTH";
pub const ADMIN_CODE_LENGTH_ENV: &str = "BITME_GATEWAY_ADMIN_CODE_LENGTH";
pub const LOG_FORMAT_ENV: &str = "BITME_GATEWAY_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_CONN_LIFETIME_SECS: u64 = 1800;
pub const DEFAULT_MAX_CONN_IDLE_TIME_SECS: u64 = 600;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SHORT_CODE_LENGTH: usize = 6;
pub const DEFAULT_ADMIN_CODE_LENGTH: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "postgres")]
    Postgres,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "bitme-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = POSTGRES_DSN_ENV, required_if_eq("storage", "postgres"))]
    pub postgres_dsn: Option<String>,

    #[arg(long, env = MAX_CONNS_ENV, default_value_t = bitme_storage::pool::DEFAULT_MAX_CONNS)]
    pub max_conns: u32,

    #[arg(long, env = MIN_CONNS_ENV, default_value_t = bitme_storage::pool::DEFAULT_MIN_CONNS)]
    pub min_conns: u32,

    #[arg(long, env = MAX_CONN_LIFETIME_ENV, default_value_t = DEFAULT_MAX_CONN_LIFETIME_SECS)]
    pub max_conn_lifetime_secs: u64,

    #[arg(long, env = MAX_CONN_IDLE_TIME_ENV, default_value_t = DEFAULT_MAX_CONN_IDLE_TIME_SECS)]
    pub max_conn_idle_time_secs: u64,

    #[arg(long, env = ACQUIRE_TIMEOUT_ENV, default_value_t = DEFAULT_ACQUIRE_TIMEOUT_SECS)]
    pub acquire_timeout_secs: u64,

    /// Create the bitme schema on startup if it is missing.
    #[arg(long, env = INIT_SCHEMA_ENV)]
    pub init_schema: bool,

    /// Answer lookups of unknown keys with an error instead of zero values.
    #[arg(long, env = STRICT_RESOLVE_ENV)]
    pub strict_resolve: bool,

    #[arg(long, env = SHORT_CODE_LENGTH_ENV, default_value_t = DEFAULT_SHORT_CODE_LENGTH)]
    pub short_code_length: usize,

    #[arg(long, env = ADMIN_CODE_LENGTH_ENV, default_value_t = DEFAULT_ADMIN_CODE_LENGTH)]
    pub admin_code_length: usize,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}
