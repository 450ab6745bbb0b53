//! SQL parsing: raw file text to per-statement extraction summaries.

mod summary;

use crate::error::ParseError;
use crate::types::{SqlFile, StatementSummary};
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};

pub use summary::summarize_statement;

/// Parse SQL text into sqlparser ASTs, tagging failures with the file name.
///
/// The generic dialect handles standard SELECT/JOIN/WHERE constructs,
/// case-insensitive keywords, line and block comments, and multiple
/// semicolon-separated statements.
pub fn parse_sql(file: &str, sql: &str) -> Result<Vec<Statement>, ParseError> {
    Parser::parse_sql(&GenericDialect {}, sql).map_err(|err| ParseError::from_sqlparser(file, err))
}

/// Parse one file and summarize every statement in it.
pub fn summarize_file(file: &SqlFile) -> Result<Vec<StatementSummary>, ParseError> {
    let statements = parse_sql(&file.name, &file.content)?;
    Ok(statements.iter().map(summarize_statement).collect())
}

/// Count meaningful tokens in SQL text, excluding whitespace and comments.
///
/// Used as the complexity input to impact scoring. Returns 0 when the text
/// cannot be tokenized; callers only reach this after a successful parse.
pub fn count_tokens(sql: &str) -> usize {
    let dialect = GenericDialect {};
    match Tokenizer::new(&dialect, sql).tokenize() {
        Ok(tokens) => tokens
            .iter()
            .filter(|t| !matches!(t, Token::Whitespace(_)))
            .count(),
        Err(_) => 0,
    }
}
