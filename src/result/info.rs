//! Structured failure payloads: [`ErrorCode`], [`ErrorInfo`] and the application's
//! own [`AppError`] hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Closed classification of failures, serialized as its string value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // validation
    ValidationError,
    MissingField,
    InvalidFormat,
    // persistence
    NotFound,
    Duplicate,
    DatabaseError,
    ConstraintViolation,
    Conflict,
    // AI and external calls
    AiError,
    RateLimited,
    ParsingError,
    AiUnavailable,
    ExternalServiceError,
    Timeout,
    NetworkError,
    // system
    InternalError,
    ConfigurationError,
    PermissionDenied,
    Unauthorized,
    // business
    BusinessRuleViolation,
    InsufficientStock,
    QuotaExceeded,
}

/// Concern an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Persistence,
    External,
    System,
    Business,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 22] = [
        ErrorCode::ValidationError,
        ErrorCode::MissingField,
        ErrorCode::InvalidFormat,
        ErrorCode::NotFound,
        ErrorCode::Duplicate,
        ErrorCode::DatabaseError,
        ErrorCode::ConstraintViolation,
        ErrorCode::Conflict,
        ErrorCode::AiError,
        ErrorCode::RateLimited,
        ErrorCode::ParsingError,
        ErrorCode::AiUnavailable,
        ErrorCode::ExternalServiceError,
        ErrorCode::Timeout,
        ErrorCode::NetworkError,
        ErrorCode::InternalError,
        ErrorCode::ConfigurationError,
        ErrorCode::PermissionDenied,
        ErrorCode::Unauthorized,
        ErrorCode::BusinessRuleViolation,
        ErrorCode::InsufficientStock,
        ErrorCode::QuotaExceeded,
    ];

    /// The wire value, e.g. `"NOT_FOUND"`.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::MissingField => "MISSING_FIELD",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Duplicate => "DUPLICATE",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::ConstraintViolation => "CONSTRAINT_VIOLATION",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::AiError => "AI_ERROR",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::ParsingError => "PARSING_ERROR",
            ErrorCode::AiUnavailable => "AI_UNAVAILABLE",
            ErrorCode::ExternalServiceError => "EXTERNAL_SERVICE_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::BusinessRuleViolation => "BUSINESS_RULE_VIOLATION",
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorCode::QuotaExceeded => "QUOTA_EXCEEDED",
        }
    }

    pub const fn category(self) -> ErrorCategory {
        match self {
            ErrorCode::ValidationError | ErrorCode::MissingField | ErrorCode::InvalidFormat => {
                ErrorCategory::Validation
            }
            ErrorCode::NotFound
            | ErrorCode::Duplicate
            | ErrorCode::DatabaseError
            | ErrorCode::ConstraintViolation
            | ErrorCode::Conflict => ErrorCategory::Persistence,
            ErrorCode::AiError
            | ErrorCode::RateLimited
            | ErrorCode::ParsingError
            | ErrorCode::AiUnavailable
            | ErrorCode::ExternalServiceError
            | ErrorCode::Timeout
            | ErrorCode::NetworkError => ErrorCategory::External,
            ErrorCode::InternalError
            | ErrorCode::ConfigurationError
            | ErrorCode::PermissionDenied
            | ErrorCode::Unauthorized => ErrorCategory::System,
            ErrorCode::BusinessRuleViolation
            | ErrorCode::InsufficientStock
            | ErrorCode::QuotaExceeded => ErrorCategory::Business,
        }
    }

    /// Transient failures that may succeed when tried again.
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorCode::Timeout
                | ErrorCode::NetworkError
                | ErrorCode::RateLimited
                | ErrorCode::AiUnavailable
                | ErrorCode::ExternalServiceError
                | ErrorCode::DatabaseError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown code string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error code: {0}")]
pub struct UnknownErrorCode(pub String);

impl FromStr for ErrorCode {
    type Err = UnknownErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownErrorCode(s.to_string()))
    }
}

/// Immutable description of a single failure.
///
/// Built once where the failure is observed; the `with_*` methods consume and return the
/// value so an `ErrorInfo` is never mutated after it has been handed out.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    code: ErrorCode,
    message: String,
    message_for_user: String,
    #[serde(default)]
    details: BTreeMap<String, serde_json::Value>,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stack_trace: Option<String>,
}

impl fmt::Debug for ErrorInfo {
    // Keeps the wire code (e.g. "NOT_FOUND") in panic messages from `Result::unwrap`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorInfo")
            .field("code", &self.code.as_str())
            .field("message", &self.message)
            .field("message_for_user", &self.message_for_user)
            .field("details", &self.details)
            .field("timestamp", &self.timestamp)
            .field("source", &self.source)
            .field("stack_trace", &self.stack_trace.as_ref().map(|_| "<captured>"))
            .finish()
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

// `source` names the originating component, not an underlying error.
impl std::error::Error for ErrorInfo {}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code,
            message_for_user: message.clone(),
            message,
            details: BTreeMap::new(),
            timestamp: Utc::now(),
            source: String::new(),
            stack_trace: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(ErrorCode::MissingField, format!("missing required field '{}'", field))
            .with_detail("field", field)
    }

    pub fn not_found(entity: &str, id: impl fmt::Display) -> Self {
        let id = id.to_string();
        Self::new(ErrorCode::NotFound, format!("{} '{}' not found", entity, id))
            .with_detail("entity", entity)
            .with_detail("id", id)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.message_for_user = message.into();
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    /// Attach a backtrace of the current thread when `RUST_BACKTRACE` enables capturing.
    pub fn capture_stack_trace(mut self) -> Self {
        let bt = Backtrace::capture();
        if bt.status() == BacktraceStatus::Captured {
            self.stack_trace = Some(bt.to_string());
        }
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn message_for_user(&self) -> &str {
        &self.message_for_user
    }

    pub fn details(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.details
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Component the failure was observed in (`source` on the wire); empty when unknown.
    pub fn origin(&self) -> &str {
        &self.source
    }

    pub fn stack_trace(&self) -> Option<&str> {
        self.stack_trace.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Merge `details` into this value's details; existing keys are overwritten.
    pub(crate) fn with_details(mut self, details: BTreeMap<String, serde_json::Value>) -> Self {
        self.details.extend(details);
        self
    }
}

/// Errors raised by the application's own components.
///
/// This is the narrow base hierarchy consulted by classification before any
/// heuristics on foreign error types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("missing required field '{0}'")]
    MissingField(String),
    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },
    #[error("{entity} already exists: {key}")]
    Duplicate { entity: String, key: String },
    #[error("insufficient stock for {item}: requested {requested}, available {available}")]
    InsufficientStock { item: String, requested: f64, available: f64 },
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("business rule violated: {0}")]
    BusinessRule(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("AI request failed: {0}")]
    Ai(String),
    #[error("AI service unavailable: {0}")]
    AiUnavailable(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::MissingField(_) => ErrorCode::MissingField,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::Duplicate { .. } => ErrorCode::Duplicate,
            AppError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            AppError::QuotaExceeded(_) => ErrorCode::QuotaExceeded,
            AppError::BusinessRule(_) => ErrorCode::BusinessRuleViolation,
            AppError::Configuration(_) => ErrorCode::ConfigurationError,
            AppError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            AppError::Ai(_) => ErrorCode::AiError,
            AppError::AiUnavailable(_) => ErrorCode::AiUnavailable,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        AppError::NotFound { entity: entity.into(), id: id.to_string() }
    }
}

impl From<AppError> for ErrorInfo {
    fn from(err: AppError) -> Self {
        let info = ErrorInfo::new(err.code(), err.to_string());
        match &err {
            AppError::NotFound { entity, id } => {
                info.with_detail("entity", entity.as_str()).with_detail("id", id.as_str())
            }
            AppError::InsufficientStock { item, requested, available } => info
                .with_detail("item", item.as_str())
                .with_detail("requested", *requested)
                .with_detail("available", *available),
            _ => info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_least_twenty_distinct_codes() {
        let mut names: Vec<&str> = ErrorCode::ALL.iter().map(|c| c.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert!(names.len() >= 20);
    }

    #[test]
    fn code_round_trips_through_its_string_value() {
        for code in ErrorCode::ALL {
            assert_eq!(code.as_str().parse::<ErrorCode>().unwrap(), code);
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
        assert!("NOPE".parse::<ErrorCode>().is_err());
    }

    #[test]
    fn categories_group_codes() {
        assert_eq!(ErrorCode::MissingField.category(), ErrorCategory::Validation);
        assert_eq!(ErrorCode::Duplicate.category(), ErrorCategory::Persistence);
        assert_eq!(ErrorCode::RateLimited.category(), ErrorCategory::External);
        assert_eq!(ErrorCode::PermissionDenied.category(), ErrorCategory::System);
        assert_eq!(ErrorCode::InsufficientStock.category(), ErrorCategory::Business);
    }

    #[test]
    fn user_message_defaults_to_message() {
        let info = ErrorInfo::new(ErrorCode::DatabaseError, "connection reset");
        assert_eq!(info.message_for_user(), "connection reset");
        let info = info.with_user_message("Please try again later");
        assert_eq!(info.message(), "connection reset");
        assert_eq!(info.message_for_user(), "Please try again later");
    }

    #[test]
    fn display_and_debug_include_code() {
        let info = ErrorInfo::not_found("recipe", 42);
        assert_eq!(info.to_string(), "[NOT_FOUND] recipe '42' not found");
        let dbg = format!("{:?}", info);
        assert!(dbg.contains("\"NOT_FOUND\""));
        assert!(dbg.contains("recipe '42' not found"));
        assert_eq!(info.details()["id"], serde_json::json!("42"));
    }

    #[test]
    fn serializes_code_as_string() {
        let info = ErrorInfo::validation("bad quantity").with_source("inventory");
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["code"], "VALIDATION_ERROR");
        assert_eq!(value["source"], "inventory");
        assert!(value.get("stack_trace").is_none());
    }

    #[test]
    fn app_error_maps_to_code_and_details() {
        let err = AppError::InsufficientStock {
            item: "flour".into(),
            requested: 2.0,
            available: 0.5,
        };
        assert_eq!(err.code(), ErrorCode::InsufficientStock);
        let info = ErrorInfo::from(err);
        assert_eq!(info.code(), ErrorCode::InsufficientStock);
        assert_eq!(info.details()["item"], "flour");
    }

    #[test]
    fn builders_are_the_only_way_to_change_a_value() {
        let info = ErrorInfo::timeout("grocer api slow")
            .with_source("grocery_sync")
            .with_detail("timeout_secs", 30)
            .with_stack_trace("frame 0");
        assert_eq!(info.code(), ErrorCode::Timeout);
        assert_eq!(info.origin(), "grocery_sync");
        assert_eq!(info.details()["timeout_secs"], 30);
        assert_eq!(info.stack_trace(), Some("frame 0"));
        assert!(info.timestamp() <= Utc::now());
        assert!(info.is_retryable());

        let back: ErrorInfo = serde_json::from_value(serde_json::to_value(&info).unwrap()).unwrap();
        assert_eq!(back, info);
    }
}
