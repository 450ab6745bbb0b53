//! Error types for workflow inference.
//!
//! # Error Handling Strategy
//!
//! Two complementary patterns are used across the engine:
//!
//! - [`ParseError`]: a single SQL file is malformed or was rejected before
//!   parsing. Non-fatal: the file is excluded from the job graph and the
//!   error is carried in the response `warnings`, stable-sorted by file name.
//!
//! - [`WorkflowError`]: the request as a whole cannot produce a valid
//!   workflow (bad input, dependency cycle, timeout). Fatal: no partial
//!   [`crate::WorkflowSpec`] is ever returned for these, since a partially
//!   ranked graph would violate the DAG invariants.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Error encountered while parsing one SQL file.
///
/// Preserves structured position information from the underlying parser
/// when available.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ParseError {
    /// Name of the file that failed.
    pub file: String,
    /// Line number (1-indexed), if the parser reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    /// Column number (1-indexed), if the parser reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u64>,
    /// Human-readable error message.
    pub message: String,
    /// The specific category of failure.
    pub kind: ParseErrorKind,
}

/// Category of per-file failure for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub enum ParseErrorKind {
    /// Unexpected token or character in input.
    #[default]
    SyntaxError,
    /// Missing required clause or keyword.
    MissingClause,
    /// Invalid or unexpected end of input.
    UnexpectedEof,
    /// Lexer/tokenization error.
    LexerError,
    /// File exceeded the configured per-file size cap; parsing was not attempted.
    FileTooLarge,
}

impl ParseError {
    /// Creates a parse error for a file with just a message.
    pub fn new(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
            message: message.into(),
            kind: ParseErrorKind::SyntaxError,
        }
    }

    /// Creates the fail-fast error for a file over the size cap.
    pub fn file_too_large(file: impl Into<String>, bytes: u64, cap: u64) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
            message: format!("file is {bytes} bytes, exceeding the {cap}-byte cap"),
            kind: ParseErrorKind::FileTooLarge,
        }
    }

    /// Converts a sqlparser error, recovering line/column from its message.
    pub fn from_sqlparser(file: impl Into<String>, err: sqlparser::parser::ParserError) -> Self {
        let message = err.to_string();
        let (line, column) = match Self::parse_position_from_message(&message) {
            Some((l, c)) => (Some(l), Some(c)),
            None => (None, None),
        };
        let kind = Self::infer_kind_from_message(&message);
        Self {
            file: file.into(),
            line,
            column,
            message,
            kind,
        }
    }

    /// Parses position from sqlparser error message format.
    ///
    /// sqlparser uses "Expected ..., found ... at Line: X, Column: Y". This
    /// is coupled to that crate's message format and returns `None` when
    /// the pattern is absent.
    fn parse_position_from_message(message: &str) -> Option<(u64, u64)> {
        static POSITION_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = POSITION_REGEX.get_or_init(|| {
            Regex::new(r"Line:\s*(\d+)\s*,\s*Column:\s*(\d+)").expect("Invalid regex pattern")
        });

        re.captures(message).and_then(|caps| {
            let line: u64 = caps.get(1)?.as_str().parse().ok()?;
            let column: u64 = caps.get(2)?.as_str().parse().ok()?;
            Some((line, column))
        })
    }

    fn infer_kind_from_message(message: &str) -> ParseErrorKind {
        let lower = message.to_lowercase();
        if lower.contains("unexpected end") || lower.contains("eof") {
            ParseErrorKind::UnexpectedEof
        } else if lower.contains("expected") {
            ParseErrorKind::MissingClause
        } else if lower.contains("tokenize") || lower.contains("token") {
            ParseErrorKind::LexerError
        } else {
            ParseErrorKind::SyntaxError
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file)?;
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, ":{line}:{column}")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// The whole input is unusable; nothing was parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("expected a .zip archive, got '{0}'")]
    NotAnArchive(String),
    #[error("archive contains no SQL files")]
    EmptyArchive,
    #[error("archive decompresses to {bytes} bytes, exceeding the {limit}-byte limit")]
    ArchiveTooLarge { bytes: u64, limit: u64 },
    #[error("archive contains {count} files, exceeding the limit of {limit}")]
    TooManyFiles { count: usize, limit: usize },
    #[error("no file in the input produced a parsable SQL job: {summary}")]
    NoUsableFiles { summary: String },
}

/// The job graph is not acyclic and cannot be ranked or scheduled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dependency cycle between jobs: {}", members.join(" -> "))]
pub struct CycleError {
    /// Job names participating in the cycle, sorted alphabetically.
    pub members: Vec<String>,
}

/// Fatal, request-level failure. See the module docs for the taxonomy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error("processing exceeded the {0}s deadline")]
    Timeout(u64),
}

impl WorkflowError {
    /// Stable machine-readable discriminant for the failure response body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "InputError",
            Self::Cycle(_) => "CycleError",
            Self::Timeout(_) => "TimeoutError",
        }
    }
}
