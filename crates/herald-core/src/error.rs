//! Error types for herald operations.
//!
//! Errors carry a structured [`ErrorCode`] and map onto a coarse
//! [`ErrorKind`] so callers can tell unsupported rule features apart from
//! authoring mistakes and from storage failures.

use thiserror::Error;

/// Result type alias for herald operations.
pub type HeraldResult<T> = Result<T, HeraldError>;

/// Main error type for all herald operations.
#[derive(Error, Debug)]
pub enum HeraldError {
    /// A rule uses a feature that is declared but not evaluable.
    #[error("Unsupported feature ({feature}): {message}")]
    UnsupportedFeature {
        feature: &'static str,
        message: String,
        code: ErrorCode,
    },

    /// A rule is authored incorrectly for the event it was evaluated against.
    #[error("Malformed rule: {message}")]
    MalformedRule {
        message: String,
        code: ErrorCode,
        notification_type: Option<String>,
    },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation { message: String, code: ErrorCode },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parse error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error taxonomy used by the rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFeature,
    MalformedRule,
    DependencyFailure,
    Other,
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Rule features (FEAT_xxx)
    FeatDelayedRule,
    FeatPropertyOperator,
    FeatLogicOperator,
    FeatEmbeddedConditions,

    // Rule authoring (RULE_xxx)
    RuleUnresolvedPath,
    RuleInvalidOperand,
    RuleMissingField,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FeatDelayedRule => "FEAT_001",
            ErrorCode::FeatPropertyOperator => "FEAT_002",
            ErrorCode::FeatLogicOperator => "FEAT_003",
            ErrorCode::FeatEmbeddedConditions => "FEAT_004",
            ErrorCode::RuleUnresolvedPath => "RULE_001",
            ErrorCode::RuleInvalidOperand => "RULE_002",
            ErrorCode::RuleMissingField => "RULE_003",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl HeraldError {
    /// Create an unsupported feature error.
    pub fn unsupported(feature: &'static str, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            feature,
            message: message.into(),
            code,
        }
    }

    /// Create a malformed rule error.
    pub fn malformed_rule(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::MalformedRule {
            message: message.into(),
            code,
            notification_type: None,
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
        }
    }

    /// Create a validation error for a required field that is absent.
    pub fn missing_field(field: &str) -> Self {
        Self::Validation {
            message: format!("missing required field: {}", field),
            code: ErrorCode::ValMissingField,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create a database error for an unreachable or poisoned connection.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbConnectionFailed,
            source: None,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Attach the offending rule's notification type to a malformed rule error.
    pub fn for_rule(self, rule_notification_type: &str) -> Self {
        match self {
            Self::MalformedRule { message, code, .. } => Self::MalformedRule {
                message,
                code,
                notification_type: Some(rule_notification_type.to_string()),
            },
            other => other,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedFeature { code, .. } => *code,
            Self::MalformedRule { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::Database { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Classify this error into the rule engine taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFeature { .. } => ErrorKind::UnsupportedFeature,
            Self::MalformedRule { .. } => ErrorKind::MalformedRule,
            Self::Database { .. } => ErrorKind::DependencyFailure,
            _ => ErrorKind::Other,
        }
    }
}

impl From<rusqlite::Error> for HeraldError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}
