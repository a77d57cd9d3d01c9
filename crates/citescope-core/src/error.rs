use thiserror::Error;

/// All errors that can occur in citescope-core.
#[derive(Debug, Error)]
pub enum CitescopeError {
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Directory does not exist: {0}")]
    DirectoryNotFound(String),

    #[error("No records found under: {0}")]
    NoRecords(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Exit codes used by the `citescope` binary.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    SeedFailed = 2,
    InvalidArgs = 3,
    FileSystemError = 4,
    NetworkError = 6,
}

pub type Result<T> = std::result::Result<T, CitescopeError>;
