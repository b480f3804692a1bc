//! Shared error utilities used across the compilation pipeline.
//!
//! Every diagnostic is a single line of text: lexical and syntactic errors
//! carry the line/column they were raised at, while semantic errors consist
//! of the message alone because their exact wording is part of the external
//! contract. The first error aborts the pipeline; nothing is accumulated.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(display("{message} at line {line}, column {column}"))]
  Lexical {
    message: String,
    line: usize,
    column: usize,
  },

  #[snafu(display("{message} at line {line}, column {column}"))]
  Syntax {
    message: String,
    line: usize,
    column: usize,
  },

  #[snafu(display("{message}"))]
  Semantic { message: String },
}

impl CompileError {
  /// Construct a lexical error anchored at a byte offset in the source.
  pub fn lexical(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let (line, column) = line_column(source, loc);
    Self::Lexical {
      message: message.into(),
      line,
      column,
    }
  }

  /// Construct a syntax error anchored at a byte offset in the source.
  pub fn syntax(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let (line, column) = line_column(source, loc);
    Self::Syntax {
      message: message.into(),
      line,
      column,
    }
  }

  /// Construct a semantic error. The message is emitted verbatim.
  pub fn semantic(message: impl Into<String>) -> Self {
    Self::Semantic {
      message: message.into(),
    }
  }
}

/// Translate a byte offset into 1-based line and column numbers.
fn line_column(source: &str, loc: usize) -> (usize, usize) {
  let loc = loc.min(source.len());
  let prefix = &source[..loc];
  let line = prefix.bytes().filter(|&b| b == b'\n').count() + 1;
  let column = match prefix.rfind('\n') {
    Some(newline) => prefix[newline + 1..].chars().count() + 1,
    None => prefix.chars().count() + 1,
  };
  (line, column)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lexical_errors_render_on_one_line() {
    let err = CompileError::lexical("a = 1;\nb ~ 2;", 9, "unrecognized character '~'");
    assert_eq!(err.to_string(), "unrecognized character '~' at line 2, column 3");
  }

  #[test]
  fn semantic_errors_carry_no_position() {
    let err = CompileError::semantic("constant 'x' is defined twice");
    assert_eq!(err.to_string(), "constant 'x' is defined twice");
  }

  #[test]
  fn offsets_past_the_end_clamp() {
    let err = CompileError::syntax("fun", 99, "expected \"(\", but got \"EOF\"");
    assert_eq!(err.to_string(), "expected \"(\", but got \"EOF\" at line 1, column 4");
  }
}
