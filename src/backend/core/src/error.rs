//! Error type shared by every conversion.
//!
//! [`JobwireError`] pairs a stable [`ErrorCode`] with a message that is safe
//! to hand back to API clients and, when it applies, the definition key that
//! was rejected. Edges log it with [`JobwireError::log`] and render it as an
//! [`ErrorResponse`].
//!
//! ```rust,ignore
//! use jobwire_core::error::ErrorResponse;
//!
//! if let Err(error) = pop_trigger(data) {
//!     error.log();
//!     let body = ErrorResponse::from(&error);
//! }
//! ```

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Result of every fallible Jobwire operation.
pub type Result<T> = std::result::Result<T, JobwireError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Stable, machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The `trigger` tag names no known kind
    UnsupportedTrigger,
    /// Trigger arguments that cannot build a trigger
    InvalidTrigger,

    InvalidDate,
    TypeMismatch,
    InvalidInput,
    MissingRequiredField,

    /// A character with no single-byte encoding
    EncodingError,
    SerializationError,

    ConfigurationError,

    InternalError,
}

impl ErrorCode {
    /// Numeric form; the leading digits group codes by category.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::UnsupportedTrigger => 1000,
            Self::InvalidTrigger => 1001,
            Self::InvalidDate => 1100,
            Self::TypeMismatch => 1101,
            Self::InvalidInput => 1102,
            Self::MissingRequiredField => 1103,
            Self::EncodingError => 2200,
            Self::SerializationError => 2201,
            Self::ConfigurationError => 5000,
            Self::InternalError => 9000,
        }
    }

    /// Group name used as a log field and metric label.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::UnsupportedTrigger | Self::InvalidTrigger => "trigger",
            Self::InvalidDate
            | Self::TypeMismatch
            | Self::InvalidInput
            | Self::MissingRequiredField => "input",
            Self::EncodingError | Self::SerializationError => "encoding",
            Self::ConfigurationError => "configuration",
            Self::InternalError => "internal",
        }
    }

    pub const fn severity(&self) -> ErrorSeverity {
        match self {
            Self::EncodingError => ErrorSeverity::Medium,
            Self::SerializationError | Self::ConfigurationError => ErrorSeverity::High,
            Self::InternalError => ErrorSeverity::Critical,
            _ => ErrorSeverity::Low,
        }
    }

    /// HTTP status an API adapter answers with: caller mistakes are 400.
    pub const fn http_status(&self) -> u16 {
        match self.severity() {
            ErrorSeverity::Low | ErrorSeverity::Medium => 400,
            ErrorSeverity::High | ErrorSeverity::Critical => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How loudly an error is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Rejected definitions, unparseable dates
    Low,
    /// Data that cannot be represented on the wire
    Medium,
    /// Broken configuration
    High,
    Critical,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// What was rejected, for clients that want more than the message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Offending key of the definition or trigger arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Values explaining the rejection, by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, serde_json::Value>,
}

/// Error returned by every Jobwire operation.
#[derive(Error, Debug)]
#[error("{message} [{code}]")]
pub struct JobwireError {
    code: ErrorCode,
    message: String,
    details: ErrorDetails,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl JobwireError {
    /// Build an error and count it in `jobwire_errors_total`.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        counter!(
            "jobwire_errors_total",
            "code" => code.to_string(),
            "category" => code.category(),
        )
        .increment(1);

        Self {
            code,
            message: message.into(),
            details: ErrorDetails::default(),
            source: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn unsupported_trigger(name: impl fmt::Display) -> Self {
        let name = name.to_string();
        Self::new(
            ErrorCode::UnsupportedTrigger,
            format!("Trigger {} is not supported.", name),
        )
        .on_field("trigger")
        .with_context("trigger", name)
    }

    pub fn invalid_trigger(field: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTrigger, message).on_field(field)
    }

    pub fn invalid_date(text: &str) -> Self {
        Self::new(ErrorCode::InvalidDate, format!("Unknown date format: {:?}", text))
            .with_context("text", text)
    }

    /// `field` held a `found` where an `expected` belongs.
    pub fn type_mismatch(field: &str, expected: &str, found: &str) -> Self {
        Self::new(
            ErrorCode::TypeMismatch,
            format!("{} must be {}, got {}", field, expected, found),
        )
        .on_field(field)
        .with_context("expected", expected)
        .with_context("found", found)
    }

    /// `ch` at `index` has no Latin-1 byte.
    pub fn encoding(ch: char, index: usize) -> Self {
        Self::new(
            ErrorCode::EncodingError,
            format!(
                "'latin-1' codec can't encode character {:?} (U+{:04X}) in position {}",
                ch, ch as u32, index
            ),
        )
        .with_context("position", index)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("Missing required field: {}", field),
        )
        .on_field(field)
    }

    /// Attach the rejected key.
    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        self.details.field = Some(field.into());
        self
    }

    /// Attach a named value; values that do not serialize are dropped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.details.context.insert(key.into(), value);
        }
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Message without the code suffix.
    pub fn user_message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.code.severity()
    }

    /// Emit one event at a level matching the severity.
    ///
    /// Rejected input is a debug event; it is the caller's mistake, not ours.
    pub fn log(&self) {
        let code = self.code.to_string();
        let field = self.details.field.as_deref().unwrap_or("-");

        match self.severity() {
            ErrorSeverity::Low => {
                debug!(code = %code, field, reason = %self.message, "Rejected job data");
            }
            ErrorSeverity::Medium => {
                warn!(
                    code = %code,
                    context = ?self.details.context,
                    reason = %self.message,
                    "Job data cannot be represented"
                );
            }
            ErrorSeverity::High | ErrorSeverity::Critical => {
                error!(
                    code = %code,
                    category = self.code.category(),
                    reason = %self.message,
                    source = ?self.source,
                    "Jobwire failure"
                );
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Response Body
// ═══════════════════════════════════════════════════════════════════════════════

/// Serializable error body for API clients and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub numeric_code: u32,
    pub status: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl From<&JobwireError> for ErrorResponse {
    fn from(error: &JobwireError) -> Self {
        Self {
            code: error.code,
            numeric_code: error.code.numeric_code(),
            status: error.code.http_status(),
            message: error.message.clone(),
            field: error.details.field.clone(),
            context: error.details.context.clone(),
        }
    }
}

impl From<config::ConfigError> for JobwireError {
    fn from(error: config::ConfigError) -> Self {
        JobwireError::new(
            ErrorCode::ConfigurationError,
            "Configuration could not be loaded",
        )
        .with_source(error)
    }
}
