use thiserror::Error;

/// Canonical error type for split planning and its collaborators.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity was not found in the metadata store or key-value store.
    #[error("{entity} `{id}` was not found")]
    NotFound {
        /// Entity type name (e.g. `"table meta"`).
        entity: &'static str,
        /// Identifier of the missing entity.
        id: String,
    },

    /// Entity already exists and cannot be created again.
    #[error("{entity} `{id}` already exists")]
    AlreadyExists {
        /// Entity type name (e.g. `"snapshot"`).
        entity: &'static str,
        /// Identifier that conflicts.
        id: String,
    },

    /// Table metadata is present but cannot be used to plan a query.
    #[error("invalid table meta for `{table}`: {message}")]
    InvalidTableMeta {
        /// Qualified `schema:table` name.
        table: String,
        /// What is wrong with the metadata.
        message: String,
    },

    /// Configuration value is missing or out of range.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Human-readable explanation of the problem.
        message: String,
    },

    /// Alphabet range string could not be parsed.
    #[error("invalid character range `{input}`: {message}")]
    InvalidRange {
        /// The offending range text.
        input: String,
        /// Why it was rejected.
        message: String,
    },

    /// A condition value could not be converted to its column type.
    #[error("cannot coerce `{value}` on column `{column}` to {target}")]
    Coercion {
        /// Column the condition applies to.
        column: String,
        /// Rendered source value.
        value: String,
        /// Target column type name.
        target: &'static str,
    },

    /// Snapshot could not be created after exhausting retries.
    #[error("snapshot `{snapshot}` failed after {attempts} attempts: {message}")]
    SnapshotFailed {
        /// Generated snapshot name.
        snapshot: String,
        /// Number of attempts made (initial attempt included).
        attempts: u32,
        /// Last error reported by the store.
        message: String,
    },

    /// Key-value store reported an error.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Unexpected internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable details for debugging purposes.
        message: String,
    },

    /// I/O error occurred while reading metadata files.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error occurred.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error occurred.
    #[error("deserialization error: {0}")]
    DeserializationError(String),
}

impl CoreError {
    /// Creates a `NotFound` variant.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates an `AlreadyExists` variant.
    #[must_use]
    pub fn already_exists(entity: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.into(),
        }
    }

    /// Creates an `InvalidTableMeta` variant.
    #[must_use]
    pub fn invalid_table_meta(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTableMeta {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates an `InvalidConfig` variant.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an `InvalidRange` variant.
    #[must_use]
    pub fn invalid_range(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRange {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Creates an `Internal` variant.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true for errors caused by configuration rather than data or I/O.
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. } | Self::InvalidRange { .. })
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_eof() || err.is_syntax() || err.is_data() {
            Self::DeserializationError(err.to_string())
        } else {
            Self::SerializationError(err.to_string())
        }
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        Self::invalid_config(err.to_string())
    }
}

/// Convenient result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
