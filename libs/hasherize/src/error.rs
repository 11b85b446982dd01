use crate::transform::BoxError;

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Decode met a key that has no field descriptor in the target type.
    #[error("field '{field}' is not configured for {type_name}")]
    UnconfiguredField { type_name: String, field: String },

    #[error("type {0} is not registered")]
    UnregisteredType(String),

    #[error("{type_name} cannot read declared field '{field}'")]
    UnreadableField { type_name: String, field: String },

    #[error("missing field '{0}'")]
    MissingField(String),

    #[error("field '{field}': expected {expected}")]
    TypeMismatch { field: String, expected: String },

    #[error("transform for field '{field}' failed: {source}")]
    Transform { field: String, source: BoxError },

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("nesting deeper than {0} levels")]
    DepthExceeded(usize),

    #[error("{0}")]
    Custom(String),
}

impl HashError {
    /// Free-form error for reconstruction strategies.
    pub fn custom(msg: impl Into<String>) -> Self {
        HashError::Custom(msg.into())
    }

    pub(crate) fn mismatch(field: impl Into<String>, expected: impl Into<String>) -> Self {
        HashError::TypeMismatch {
            field: field.into(),
            expected: expected.into(),
        }
    }

    /// Add context to the error.
    ///
    /// Message-carrying variants get the context prepended. Structured
    /// variants are returned as-is so callers can still match on them.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            HashError::Config(msg) => HashError::Config(format!("{ctx}: {msg}")),
            HashError::Custom(msg) => HashError::Custom(format!("{ctx}: {msg}")),
            HashError::MissingField(field) => HashError::MissingField(format!("{ctx}.{field}")),
            other => other,
        }
    }
}
