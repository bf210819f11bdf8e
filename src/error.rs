//! Unified error model for the file-identity engine.
//! Every failure the engine can produce is one `AsicError` variant. Variants are grouped
//! by how the caller must treat them: configuration faults abort the invocation, probing
//! mismatches are swallowed while classifying, transport failures are retried once.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AsicError {
    /// A matched path carries an extension with no entry in the extension registry.
    #[error("unsupported extension '{extension}'")]
    UnsupportedExtension { extension: String },

    /// The path is not an instance of the probed kind.
    #[error("path '{path}' does not match kind '{kind}': {reason}")]
    PathPatternMismatch { kind: String, path: String, reason: String },

    /// A kind's patterns are unusable (bad regex, missing extension or agent group).
    #[error("malformed pattern for kind '{kind}': {reason}")]
    MalformedPattern { kind: String, reason: String },

    #[error("unknown file kind '{kind}'")]
    UnknownKind { kind: String },

    /// Location-captured and name-captured values for the same field disagree.
    #[error("kind '{kind}' captured conflicting {field} in '{path}': location={location}, name={name}")]
    ConflictingFields { kind: String, path: String, field: &'static str, location: String, name: String },

    /// A template references a placeholder no value was supplied for.
    #[error("template '{template}' needs a value for '{placeholder}'")]
    Template { template: String, placeholder: String },

    /// A static configuration record could not be loaded.
    #[error("configuration '{source_name}' line {line}: {message}")]
    Config { source_name: String, line: usize, message: String },

    #[error("invalid {what} '{value}': {message}")]
    InvalidInput { what: &'static str, value: String, message: String },

    /// The remote directory does not exist.
    #[error("remote location '{path}' not found")]
    NotFound { path: String },

    #[error("transfer of '{path}' failed: {message}")]
    Transfer { path: String, message: String },

    #[error("io error on '{path}': {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("cannot reshape '{kind}' file: {message}")]
    Reshape { kind: String, message: String },
}

impl AsicError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AsicError::UnsupportedExtension { .. } => "unsupported_extension",
            AsicError::PathPatternMismatch { .. } => "path_pattern_mismatch",
            AsicError::MalformedPattern { .. } => "malformed_pattern",
            AsicError::UnknownKind { .. } => "unknown_kind",
            AsicError::ConflictingFields { .. } => "conflicting_fields",
            AsicError::Template { .. } => "template",
            AsicError::Config { .. } => "config",
            AsicError::InvalidInput { .. } => "invalid_input",
            AsicError::NotFound { .. } => "not_found",
            AsicError::Transfer { .. } => "transfer",
            AsicError::Io { .. } => "io",
            AsicError::Reshape { .. } => "reshape",
        }
    }

    /// True when the static rules themselves are broken and no result can be trusted.
    pub fn is_config_fault(&self) -> bool {
        matches!(
            self,
            AsicError::UnsupportedExtension { .. }
                | AsicError::MalformedPattern { .. }
                | AsicError::ConflictingFields { .. }
                | AsicError::Config { .. }
        )
    }

    /// Map to a process exit status for the command line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            AsicError::UnknownKind { .. } | AsicError::InvalidInput { .. } => 2,
            e if e.is_config_fault() => 3,
            AsicError::NotFound { .. } | AsicError::Transfer { .. } | AsicError::Io { .. } => 4,
            AsicError::Reshape { .. } => 5,
            _ => 1,
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        AsicError::Io { path: path.into(), source }
    }

    pub fn invalid(what: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        AsicError::InvalidInput { what, value: value.into(), message: message.into() }
    }
}

pub type AsicResult<T> = Result<T, AsicError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
