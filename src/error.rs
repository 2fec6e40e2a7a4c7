//! Error types for the receipt courier.

/// Top-level error type for a courier run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Roster loading and lookup errors.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("Failed to read roster {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Roster {path} is missing required column \"{column}\"")]
    MissingColumn { path: String, column: String },
}

/// Outbound delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to build message for {recipient}: {reason}")]
    Build { recipient: String, reason: String },

    #[error("Failed to read attachment {path}: {source}")]
    Attachment {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// Result type alias for the courier.
pub type Result<T> = std::result::Result<T, Error>;
