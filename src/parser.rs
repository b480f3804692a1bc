//! Recursive-descent parser producing the program AST.
//!
//! The parser mirrors the classic chibicc structure: a thin `TokenStream`
//! cursor plus one function per grammar rule. Top-level declarations are
//! either global constants (`name = number;`) or functions (`fun name(...)`)
//! and function bodies are flat statement lists. Expressions descend through
//! the usual precedence ladder, `+`/`-` above `*`/`/`, both left-associative.
//!
//! Name resolution is deliberately absent here: duplicate parameters,
//! unknown identifiers and arity mismatches all parse successfully and are
//! reported by the code generator, which owns the wording of those
//! diagnostics.

use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind, describe_token, token_text};

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
}

/// Expression tree produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Num {
    value: f64,
  },
  Name {
    name: String,
  },
  Neg {
    operand: Box<Expr>,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
  },
  Call {
    name: String,
    args: Vec<Expr>,
  },
}

impl Expr {
  pub fn number(value: f64) -> Self {
    Self::Num { value }
  }

  pub fn name(name: impl Into<String>) -> Self {
    Self::Name { name: name.into() }
  }

  pub fn neg(operand: Expr) -> Self {
    Self::Neg {
      operand: Box::new(operand),
    }
  }

  pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
    Self::Call {
      name: name.into(),
      args,
    }
  }
}

/// A single statement inside a function body.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
  Assign { name: String, value: Expr },
  Return { value: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
  pub name: String,
  pub params: Vec<String>,
  pub body: Vec<Stmt>,
}

/// One top-level declaration, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
  Constant { name: String, value: f64 },
  Function(Function),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
  pub items: Vec<Item>,
}

/// Parse the token stream into a program.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<Program> {
  let mut stream = TokenStream::new(tokens, source);

  let mut items = Vec::new();
  while !stream.is_eof() {
    if stream.peek_keyword() == Some("fun") {
      items.push(Item::Function(parse_function(&mut stream)?));
    } else {
      items.push(parse_constant(&mut stream)?);
    }
  }

  Ok(Program { items })
}

/// `identifier '=' signedNumber ';'`
fn parse_constant(stream: &mut TokenStream) -> CompileResult<Item> {
  let (name, _) = stream.get_ident()?;
  stream.skip("=")?;
  let negative = stream.equal("-");
  let (mut value, _) = stream.get_number()?;
  if negative {
    value = -value;
  }
  stream.skip(";")?;
  Ok(Item::Constant { name, value })
}

/// `'fun' identifier '(' [ identifier { ',' identifier } ] ')' block`
fn parse_function(stream: &mut TokenStream) -> CompileResult<Function> {
  stream.skip("fun")?;
  let (name, _) = stream.get_ident()?;

  stream.skip("(")?;
  let mut params = Vec::new();
  if !stream.peek_is(")") {
    loop {
      let (param, _) = stream.get_ident()?;
      params.push(param);
      if !stream.equal(",") {
        break;
      }
    }
  }
  stream.skip(")")?;

  stream.skip("{")?;
  let mut body = Vec::new();
  while !stream.equal("}") {
    if stream.is_eof() {
      return Err(CompileError::syntax(
        stream.source,
        stream.source.len(),
        "expected \"}\"",
      ));
    }
    body.push(parse_stmt(stream)?);
  }

  Ok(Function { name, params, body })
}

/// `'return' expr ';'  |  identifier '=' expr ';'`
fn parse_stmt(stream: &mut TokenStream) -> CompileResult<Stmt> {
  if stream.peek_keyword() == Some("return") {
    stream.skip("return")?;
    let value = parse_expr(stream)?;
    stream.skip(";")?;
    return Ok(Stmt::Return { value });
  }

  let (name, _) = stream.get_ident()?;
  stream.skip("=")?;
  let value = parse_expr(stream)?;
  stream.skip(";")?;
  Ok(Stmt::Assign { name, value })
}

// ----- Expression parsing -----
fn parse_expr(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_term(stream)?;

  loop {
    let op = match stream.peek_punctuator() {
      Some("+") => BinaryOp::Add,
      Some("-") => BinaryOp::Sub,
      _ => break,
    };

    stream.advance();
    let rhs = parse_term(stream)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_term(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_factor(stream)?;

  loop {
    let op = match stream.peek_punctuator() {
      Some("*") => BinaryOp::Mul,
      Some("/") => BinaryOp::Div,
      _ => break,
    };

    stream.advance();
    let rhs = parse_factor(stream)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

/// `signedNumber | identifier | identifier '(' args ')' | '(' expr ')'`
fn parse_factor(stream: &mut TokenStream) -> CompileResult<Expr> {
  if stream.equal("-") {
    // A minus in front of a literal folds into the literal itself, so
    // `-234234.123123` pools as one negative constant. Anything else
    // becomes a negation node, later lowered as `0 - x`.
    if matches!(stream.peek().map(|token| token.kind), Some(TokenKind::Num)) {
      let (value, _) = stream.get_number()?;
      return Ok(Expr::number(-value));
    }
    let operand = parse_factor(stream)?;
    return Ok(Expr::neg(operand));
  }

  if stream.equal("(") {
    let node = parse_expr(stream)?;
    stream.skip(")")?;
    return Ok(node);
  }

  if matches!(
    stream.peek().map(|token| token.kind),
    Some(TokenKind::Ident)
  ) {
    let (name, _) = stream.get_ident()?;
    if !stream.equal("(") {
      return Ok(Expr::name(name));
    }

    let mut args = Vec::new();
    if !stream.peek_is(")") {
      loop {
        args.push(parse_expr(stream)?);
        if !stream.equal(",") {
          break;
        }
      }
    }
    stream.skip(")")?;
    return Ok(Expr::call(name, args));
  }

  let (value, _) = stream.get_number()?;
  Ok(Expr::number(value))
}

/// Lightweight cursor over the token vector.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
}

impl<'a> TokenStream<'a> {
  /// Take ownership of the token stream; the parser will advance `pos` as it consumes input.
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn advance(&mut self) {
    self.pos += 1;
  }

  fn peek_punctuator(&self) -> Option<&str> {
    self.peek().and_then(|token| {
      if token.kind == TokenKind::Punctuator {
        Some(token_text(token, self.source))
      } else {
        None
      }
    })
  }

  fn peek_keyword(&self) -> Option<&str> {
    self.peek().and_then(|token| {
      if token.kind == TokenKind::Keyword {
        Some(token_text(token, self.source))
      } else {
        None
      }
    })
  }

  fn peek_is(&self, symbol: &str) -> bool {
    self
      .peek()
      .filter(|token| {
        matches!(token.kind, TokenKind::Punctuator | TokenKind::Keyword)
          && token_text(token, self.source) == symbol
      })
      .is_some()
  }

  /// Consume the current token if it matches the provided punctuator or keyword.
  fn equal(&mut self, symbol: &str) -> bool {
    if self.peek_is(symbol) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn skip(&mut self, symbol: &str) -> CompileResult<()> {
    if self.equal(symbol) {
      Ok(())
    } else {
      let (loc, got) = match self.tokens.get(self.pos) {
        Some(token) => (token.loc, describe_token(Some(token), self.source)),
        None => (self.source.len(), "EOF".to_string()),
      };
      Err(CompileError::syntax(
        self.source,
        loc,
        format!("expected \"{symbol}\", but got \"{got}\""),
      ))
    }
  }

  /// Parse the current token as a numeric literal returning its value and location.
  fn get_number(&mut self) -> CompileResult<(f64, usize)> {
    if let Some(token) = self.tokens.get(self.pos)
      && token.kind == TokenKind::Num
    {
      let value = token.value.ok_or_else(|| {
        CompileError::syntax(
          self.source,
          token.loc,
          "internal error: numeric token missing value",
        )
      })?;
      let loc = token.loc;
      self.pos += 1;
      return Ok((value, loc));
    }

    let (loc, got) = match self.tokens.get(self.pos) {
      Some(token) => (token.loc, describe_token(Some(token), self.source)),
      None => (self.source.len(), "EOF".to_string()),
    };
    Err(CompileError::syntax(
      self.source,
      loc,
      format!("expected a number, but got \"{got}\""),
    ))
  }

  /// Parse the current token as an identifier.
  fn get_ident(&mut self) -> CompileResult<(String, usize)> {
    if let Some(token) = self.tokens.get(self.pos)
      && token.kind == TokenKind::Ident
    {
      let text = token_text(token, self.source);
      let loc = token.loc;
      self.pos += 1;
      return Ok((text.to_string(), loc));
    }

    let (loc, got) = match self.tokens.get(self.pos) {
      Some(token) => (token.loc, describe_token(Some(token), self.source)),
      None => (self.source.len(), "EOF".to_string()),
    };
    Err(CompileError::syntax(
      self.source,
      loc,
      format!("expected an identifier, but got \"{got}\""),
    ))
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek().map(|token| token.kind), Some(TokenKind::Eof))
  }
}
