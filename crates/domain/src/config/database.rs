/// Connection parameters for the relational store.
///
/// The store is backed by SQLite; `name` is interpreted as the database
/// file path. `host`/`user`/`pass`/`port` are still read from their `DB_*`
/// environment variables for forward compatibility with a networked
/// backend, but the SQLite adapter does not use them.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub user: String,
    pub pass: String,
    pub name: String,
    pub port: u16,
    pub pool_connection_limit: u32,
    pub pool_acquire_timeout_ms: u64,
    pub pool_connect_timeout_ms: u64,
    pub query_retry_count: u32,
    pub query_retry_delay_ms: u64,
}
