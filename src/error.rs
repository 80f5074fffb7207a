//! Error types for trellis
//!
//! All modules use `TrellisResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for trellis operations
pub type TrellisResult<T> = Result<T, TrellisError>;

/// All errors that can occur in trellis
#[derive(Error, Debug)]
pub enum TrellisError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Markup errors
    #[error("Parse error in {location} at line {line}, column {column}: {message}")]
    MarkupParse {
        location: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Invalid markup in {location}: {message}")]
    Markup { location: String, message: String },

    #[error("Markup not found for component: {0}")]
    MarkupNotFound(String),

    #[error("Base markup of inherited markup not found: {class} extends {base}")]
    BaseMarkupNotFound { class: String, base: String },

    #[error("Component class has no superclass to inherit markup from: {0}")]
    NoBaseClass(String),

    #[error("Cyclic component hierarchy involving {0}")]
    CyclicHierarchy(String),

    // Watcher errors
    #[error("Modification watcher error: {0}")]
    Watcher(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl TrellisError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a structural markup error
    pub fn markup(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Markup {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create a parse error at a line/column position
    pub fn parse(
        location: impl Into<String>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::MarkupParse {
            location: location.into(),
            line,
            column,
            message: message.into(),
        }
    }

    /// Whether the error comes from the markup itself rather than the environment
    pub fn is_markup_error(&self) -> bool {
        matches!(
            self,
            Self::MarkupParse { .. }
                | Self::Markup { .. }
                | Self::BaseMarkupNotFound { .. }
                | Self::NoBaseClass(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MarkupNotFound(_) => {
                Some("Check [resources] roots and the component name in your config")
            }
            Self::BaseMarkupNotFound { .. } => {
                Some("Inherited markup needs a <wicket:child/> in the base template")
            }
            Self::NoBaseClass(_) => Some("Declare the base class with `extends` under [[components]]"),
            Self::ConfigInvalid { .. } => Some("Run: trellis config show"),
            Self::ConfigNotFound(_) => Some("Run: trellis config init"),
            _ => None,
        }
    }
}
