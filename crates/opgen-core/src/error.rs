//! Error types and handling for grammar generation runs

use std::path::PathBuf;
use thiserror::Error;

use crate::discovery::SourceKind;

/// Main error type for grammar generation
#[derive(Debug, Error)]
pub enum OpgenError {
    /// No usable metadata sources, or an invalid option/config file
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// An explicitly named source file does not exist
    #[error("Missing {kind} source: '{path}' does not exist")]
    MissingSource { path: PathBuf, kind: SourceKind },

    /// A metadata file could not be parsed as its expected structure
    #[error("Malformed metadata in '{path}': {message}")]
    MalformedMetadata { path: PathBuf, message: String },

    /// The grammar document could not be parsed or has the wrong root shape
    #[error("Malformed grammar document '{path}': {message}")]
    MalformedGrammar { path: PathBuf, message: String },

    /// More than one pattern node carries the same stable name
    #[error("Ambiguous pattern: {count} nodes are named '{name}'")]
    AmbiguousPattern { name: String, count: usize },

    /// No pattern node carries the requested stable name
    #[error("Pattern not found: no node is named '{name}'")]
    PatternNotFound { name: String },

    /// A node that must own generated nodes has no `patterns` list
    #[error("Pattern list missing: node '{name}' has no 'patterns' array")]
    PatternListMissing { name: String },

    /// File system I/O errors
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File watcher could not be created or registered
    #[error("Watch error: {message}")]
    Watch { message: String },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    MissingSource,
    MalformedMetadata,
    MalformedGrammar,
    AmbiguousPattern,
    PatternNotFound,
    Io,
    Watch,
}

impl OpgenError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            OpgenError::Configuration { .. } => ErrorKind::Configuration,
            OpgenError::MissingSource { .. } => ErrorKind::MissingSource,
            OpgenError::MalformedMetadata { .. } => ErrorKind::MalformedMetadata,
            OpgenError::MalformedGrammar { .. } => ErrorKind::MalformedGrammar,
            OpgenError::AmbiguousPattern { .. } => ErrorKind::AmbiguousPattern,
            OpgenError::PatternNotFound { .. } => ErrorKind::PatternNotFound,
            OpgenError::PatternListMissing { .. } => ErrorKind::PatternNotFound,
            OpgenError::Io { .. } => ErrorKind::Io,
            OpgenError::Watch { .. } => ErrorKind::Watch,
        }
    }

    /// True when the target grammar no longer has the shape the generator expects
    pub fn is_document_mismatch(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::AmbiguousPattern | ErrorKind::PatternNotFound
        )
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a missing source error
    pub fn missing_source(path: impl Into<PathBuf>, kind: SourceKind) -> Self {
        Self::MissingSource {
            path: path.into(),
            kind,
        }
    }

    /// Create a malformed metadata error
    pub fn malformed_metadata(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::MalformedMetadata {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a malformed grammar error
    pub fn malformed_grammar(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::MalformedGrammar {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a watch error
    pub fn watch(message: impl Into<String>) -> Self {
        Self::Watch {
            message: message.into(),
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for OpgenError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}
