use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    UnknownBackend(String),
    DirectoryDoesNotExist(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::UnknownBackend(e) => write!(f, "Unknown storage backend: {}", e),
            ConfigError::DirectoryDoesNotExist(e) => write!(f, "Directory error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum StorageError {
    /// The underlying persistence mechanism could not be opened at all.
    BackendUnavailable(String),
    /// A single record exceeds the byte capacity even with the store emptied.
    PayloadTooLarge { required: u64, available: u64 },
    /// The backend rejected the final write even after the emergency fallback.
    PersistenceExhausted,
    /// A stored payload could not be decoded back into playable bytes.
    MalformedPayload(String),
    /// The referenced record id does not exist.
    NotFound,
    ReadFailed,
    WriteFailed,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::BackendUnavailable(e) => write!(f, "Storage backend unavailable: {}", e),
            StorageError::PayloadTooLarge { required, available } => write!(
                f,
                "Video too large to store: {} byte(s) required, {} byte(s) available",
                required, available
            ),
            StorageError::PersistenceExhausted => {
                write!(f, "Storage rejected the write even after emergency cleanup")
            }
            StorageError::MalformedPayload(e) => write!(f, "Malformed video payload: {}", e),
            StorageError::NotFound => write!(f, "Video not found"),
            StorageError::ReadFailed => write!(f, "Storage read failed"),
            StorageError::WriteFailed => write!(f, "Storage write failed"),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    StorageError(StorageError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::StorageError(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<StorageError> for ControllerError {
    fn from(err: StorageError) -> Self {
        ControllerError::StorageError(err)
    }
}
