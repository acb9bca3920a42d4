//! Program loader
//!
//! Turns a comma-separated program listing into the initial memory image.
//! Values may span several lines and carry surrounding whitespace; a single
//! trailing comma is tolerated. Any other malformed token rejects the whole
//! program before a machine is built.

use log::debug;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading program text
#[derive(Debug, Error)]
pub enum LoadError {
    /// A token that is not a base-10 signed integer
    #[error("Invalid token '{token}' at position {index}")]
    InvalidToken { index: usize, token: String },

    /// The text contains no values at all
    #[error("Program is empty")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn parse_program(source: &str) -> Result<Vec<i64>, LoadError> {
    if source.trim().is_empty() {
        return Err(LoadError::Empty);
    }

    let mut tokens: Vec<&str> = source.split(',').map(str::trim).collect();
    if tokens.len() > 1 && tokens.last().map_or(false, |t| t.is_empty()) {
        tokens.pop();
    }

    tokens
        .iter()
        .enumerate()
        .map(|(index, token)| {
            token.parse::<i64>().map_err(|_| LoadError::InvalidToken {
                index,
                token: token.to_string(),
            })
        })
        .collect()
}

pub fn load_program(path: &Path) -> Result<Vec<i64>, LoadError> {
    let source = fs::read_to_string(path)?;
    let program = parse_program(&source)?;
    debug!("loaded {} words from {}", program.len(), path.display());
    Ok(program)
}
