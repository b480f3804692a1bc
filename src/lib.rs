//! Crate root: wires together the compilation pipeline.
//!
//! The stages are intentionally small and composable so they can be evolved
//! independently:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns the program AST.
//! - `codegen` validates names, arity and scoping, then lowers every
//!   function into x86-64 System V assembly (AT&T syntax).
//! - `error` centralises the single-line diagnostics shared by the stages.
//! - `text` holds the trimming helpers the end-to-end oracle relies on.
//!
//! Compilation is synchronous and owns no state beyond the call: the only
//! persistent artifact is the returned listing.

pub mod error;
pub mod parser;
pub mod text;
pub mod tokenizer;

mod codegen;

pub use error::{CompileError, CompileResult};

use log::debug;

/// Compile a source string into an AT&T assembly listing.
///
/// On success the listing is complete and ends with a newline; on failure
/// the error renders as a single line and no assembly is produced.
pub fn compile(source: &str) -> CompileResult<String> {
  let tokens = tokenizer::tokenize(source)?;
  debug!("tokenized {} tokens", tokens.len());
  let program = parser::parse(tokens, source)?;
  debug!("parsed {} top-level items", program.items.len());
  codegen::generate(&program)
}
