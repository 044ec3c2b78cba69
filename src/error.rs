//! Error types reported to the user through the eval channel.

use crate::lexer::LexingError;
use crate::parser::ParsingError;
use std::path::PathBuf;
use thiserror::Error;

/// Convenient result alias for this crate.
pub type ModmResult<T> = Result<T, ModmError>;

/// Broad classification of a [`ModmError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Syntax,
    AmbiguousCommand,
    Usage,
    Internal,
}

impl ErrorKind {
    /// Fixed human readable description of the kind.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "module not found",
            ErrorKind::Syntax => "syntax error in module file",
            ErrorKind::AmbiguousCommand => "ambiguous command",
            ErrorKind::Usage => "invalid usage",
            ErrorKind::Internal => "internal error",
        }
    }

    /// Internal errors stop the run; all others are reported and processing
    /// continues.
    pub fn is_internal(&self) -> bool {
        matches!(self, ErrorKind::Internal)
    }
}

/// Why a modfile line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxReason {
    #[error(transparent)]
    Lexing(#[from] LexingError),
    #[error(transparent)]
    Parsing(#[from] ParsingError),
}

#[derive(Debug, Error)]
pub enum ModmError {
    #[error("Module '{0}' not found.")]
    NotFound(String),

    #[error("Bad syntax in module file '{}', line {line}: {reason} ({content})", .file.display())]
    Syntax {
        file: PathBuf,
        line: usize,
        content: String,
        reason: SyntaxReason,
    },

    #[error("{kind} '{given}' is ambiguous. Possible matches: {}", .candidates.join(", "))]
    AmbiguousCommand {
        kind: &'static str,
        given: String,
        candidates: Vec<String>,
    },

    #[error("{kind} '{given}' not recognized.")]
    UnknownCommand { kind: &'static str, given: String },

    #[error("No command given.")]
    NoCommand,

    #[error("Unknown help topic '{0}'.")]
    UnknownHelpTopic(String),

    #[error("Could not read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ModmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModmError::NotFound(_) => ErrorKind::NotFound,
            ModmError::Syntax { .. } => ErrorKind::Syntax,
            ModmError::AmbiguousCommand { .. } => ErrorKind::AmbiguousCommand,
            ModmError::UnknownCommand { .. }
            | ModmError::NoCommand
            | ModmError::UnknownHelpTopic(_) => ErrorKind::Usage,
            ModmError::Io { .. } => ErrorKind::Internal,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModmError::Io {
            path: path.into(),
            source,
        }
    }
}
