use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] diesel::result::Error),

    #[cfg(feature = "postgres")]
    #[error("PostgreSQL connection error: {0}")]
    PgConnection(#[from] diesel::ConnectionError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unsupported store: {0}")]
    UnsupportedStore(String),
}
