use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_SYNTAX: &str = "L-ERR-SYNTAX";
pub const ERR_GENERATE: &str = "L-ERR-GENERATE";
pub const ERR_INTERN_CONSISTENCY: &str = "L-ERR-INTERN-CONSISTENCY";
pub const ERR_OUTPUT: &str = "L-ERR-OUTPUT";
pub const ERR_CACHE_PAYLOAD: &str = "L-ERR-CACHE-PAYLOAD";
pub const ERR_MANIFEST_LATE: &str = "L-ERR-MANIFEST-LATE";

// ═══════════════════════════════════════════════════════════════════════════════
// COLLABORATOR FAILURES
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure reported by a source parser. `line` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub line: u32,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

/// Failure reported by a code generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GenerateError {
    pub message: String,
    pub line: Option<u32>,
}

impl GenerateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DRIVER ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// A syntax error pinned to the unit it came from.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{file}:{line}: {message}")]
pub struct SyntaxDiagnostic {
    pub file: String,
    pub line: u32,
    pub message: String,
}

/// The persistent table and a unit disagree about a name or an id.
///
/// Only reachable when ids were allocated outside a single writer. Fatal for
/// the build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternConsistencyError {
    #[error("'{name}' is interned as '{existing}' but the unit assigned '{incoming}'")]
    NameRemapped {
        name: String,
        existing: String,
        incoming: String,
    },
    #[error("id '{id}' belongs to '{existing}' but the unit assigned it to '{incoming}'")]
    IdReused {
        id: String,
        existing: String,
        incoming: String,
    },
}

#[derive(Debug, Error)]
pub enum CachePayloadError {
    #[error("cache payload is not valid target code: {0}")]
    Unparseable(String),
    #[error("cache payload must be a single call expression")]
    NotACall,
    #[error("cache payload calls '{found}', expected '{expected}'")]
    WrongRegistrar {
        found: String,
        expected: &'static str,
    },
    #[error("cache payload call takes 2 arguments, found {0}")]
    Arity(usize),
    #[error("cache payload mapping must be an object literal")]
    ExpectedObject,
    #[error("cache payload key at offset {0} is not a string")]
    NonStringKey(u32),
    #[error("cache payload value for '{0}' is not a string")]
    NonStringValue(String),
    #[error("cache payload cursor must be a string literal")]
    ExpectedCursor,
    #[error("invalid id '{id}' for '{name}'")]
    InvalidId { name: String, id: String },
    #[error("invalid id cursor '{0}'")]
    InvalidCursor(String),
    #[error("'{0}' appears more than once")]
    DuplicateName(String),
    #[error("id '{id}' is assigned to both '{first}' and '{second}'")]
    DuplicateId {
        id: String,
        first: String,
        second: String,
    },
    #[error("cursor '{cursor}' does not lie past id '{id}'")]
    CursorBehind { cursor: String, id: String },
    #[error("invalid cache JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputError {
    #[error("{file}: wrapped output does not parse: {message}")]
    Unparseable { file: String, message: String },
    #[error("{file}: '{name}' is referenced but never bound")]
    UnresolvedHelper { file: String, name: String },
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Syntax(#[from] SyntaxDiagnostic),
    #[error("{file}: code generation failed: {message}")]
    Generate {
        file: String,
        line: Option<u32>,
        message: String,
    },
    #[error("{file}: {source}")]
    Consistency {
        file: String,
        source: InternConsistencyError,
    },
    #[error(transparent)]
    Output(#[from] OutputError),
    #[error(transparent)]
    CachePayload(#[from] CachePayloadError),
    #[error("manifest must be loaded before the first unit is compiled ({compiled} already compiled)")]
    ManifestAfterCompile { compiled: usize },
}

/// Flat, serializable view of a [`DriverError`] for build tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl DriverError {
    /// Errors that leave the build in a state that must not be persisted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Consistency { .. })
    }

    pub fn code(&self) -> &'static str {
        match self {
            DriverError::Syntax(_) => ERR_SYNTAX,
            DriverError::Generate { .. } => ERR_GENERATE,
            DriverError::Consistency { .. } => ERR_INTERN_CONSISTENCY,
            DriverError::Output(_) => ERR_OUTPUT,
            DriverError::CachePayload(_) => ERR_CACHE_PAYLOAD,
            DriverError::ManifestAfterCompile { .. } => ERR_MANIFEST_LATE,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let (file, line, message) = match self {
            DriverError::Syntax(d) => (Some(d.file.clone()), Some(d.line), d.message.clone()),
            DriverError::Generate {
                file,
                line,
                message,
            } => (Some(file.clone()), *line, message.clone()),
            DriverError::Consistency { file, source } => {
                (Some(file.clone()), None, source.to_string())
            }
            DriverError::Output(
                OutputError::Unparseable { file, .. } | OutputError::UnresolvedHelper { file, .. },
            ) => (Some(file.clone()), None, self.to_string()),
            DriverError::CachePayload(_) | DriverError::ManifestAfterCompile { .. } => {
                (None, None, self.to_string())
            }
        };
        Diagnostic {
            code: self.code().to_string(),
            message,
            file,
            line,
        }
    }
}
