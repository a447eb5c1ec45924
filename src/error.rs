use std::fmt;
use thiserror::Error;

/// Where and why an error happened, rendered after the message as `[at ...; ...; in ...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Config key or input position, e.g. `cache.strategies[2]` or `tasks[3].id`.
    pub field_path: Option<String>,
    /// Offending value or expectation.
    pub details: Option<String>,
    /// Component that raised it, e.g. `strategy_registry`.
    pub component: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(self, path: impl Into<String>) -> Self {
        Self {
            field_path: Some(path.into()),
            ..self
        }
    }

    pub fn with_details(self, details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..self
        }
    }

    pub fn with_component(self, component: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
            ..self
        }
    }

    fn is_empty(&self) -> bool {
        self.field_path.is_none() && self.details.is_none() && self.component.is_none()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let segments = [
            self.field_path.as_ref().map(|p| format!("at {}", p)),
            self.details.clone(),
            self.component.as_ref().map(|c| format!("in {}", c)),
        ];
        let rendered: Vec<String> = segments.into_iter().flatten().collect();
        write!(f, " [{}]", rendered.join("; "))
    }
}

/// Unified error type for the orchestration core.
///
/// Only configuration and programmer errors surface as `Error`. Cache I/O failures, task
/// failures and analyzer failures are absorbed at the component boundary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {message}{context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("rejected input: {message}{context}")]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("runtime failure: {message}{context}")]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::runtime_with_context(msg, ErrorContext::default())
    }

    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Structured context, for the variants that carry one.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::Validation { context, .. }
            | Error::Runtime { context, .. } => Some(context),
            Error::Io(_) | Error::Serialization(_) | Error::Yaml(_) => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. } | Error::Yaml(_))
    }
}
