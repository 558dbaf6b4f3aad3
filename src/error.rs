use thiserror::Error;

/// Errors surfaced by the registry, database and configuration layers.
///
/// Every variant carries a human-readable message; connection-test failures
/// end up verbatim in the aggregated test report.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection failed: {0}")]
    Connection(#[from] reqwest::Error),

    /// JSON-RPC level error returned by an otherwise reachable server.
    #[error("server error: {0}")]
    Server(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}
