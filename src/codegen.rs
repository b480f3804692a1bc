//! Semantic analysis and code generation, fused into one stage.
//!
//! The stage first builds the global symbol inventory (constants and
//! functions) in declaration order, then walks the functions again checking
//! each signature and lowering each body into AT&T x86-64 assembly. All
//! checks abort on the first failing declaration; error wording is part of
//! the external contract and must not drift.
//!
//! The emitter is a stack machine over doubles: every expression leaves its
//! value in `%xmm0`, binary operators spill the left operand to a 16-byte
//! stack slot while the right one is computed. Numeric literals are never
//! encoded inline; each occurrence is appended to a per-function constant
//! pool labelled `_c_const_<fn>_<index>` and loaded `%rip`-relative, exactly
//! like user-declared globals. The listing ends with a data trailer holding
//! every pool entry (grouped by function, in declaration order) followed by
//! the global constants in lexicographic order.

use crate::error::{CompileError, CompileResult};
use crate::parser::{BinaryOp, Expr, Function, Item, Program, Stmt};
use log::trace;
use std::collections::{BTreeMap, HashMap};

/// Label prefix reserved for synthesized constant-pool entries.
const POOL_PREFIX: &str = "_c_const_";

/// Validate the program and emit the complete assembly listing.
///
/// A function with an empty body emits only its prologue and epilogue, so
/// its return value is whatever `%xmm0` happened to hold at entry.
pub fn generate(program: &Program) -> CompileResult<String> {
  let mut constants: BTreeMap<String, f64> = BTreeMap::new();
  let mut arities: HashMap<String, usize> = HashMap::new();
  let mut functions: Vec<&Function> = Vec::new();

  // Global inventory, in declaration order.
  for item in &program.items {
    match item {
      Item::Constant { name, value } => {
        if constants.contains_key(name) {
          return Err(CompileError::semantic(format!(
            "constant '{name}' is defined twice"
          )));
        }
        if name.starts_with(POOL_PREFIX) {
          return Err(CompileError::semantic(format!(
            "cant define constant '{name}' (do not define it manually)"
          )));
        }
        constants.insert(name.clone(), *value);
      }
      Item::Function(func) => {
        if arities.contains_key(&func.name) {
          return Err(CompileError::semantic(format!(
            "function '{}' is defined twice",
            func.name
          )));
        }
        if constants.contains_key(&func.name) {
          return Err(CompileError::semantic(format!(
            "cant define function '{}': there is constant with that name",
            func.name
          )));
        }
        arities.insert(func.name.clone(), func.params.len());
        functions.push(func);
      }
    }
  }

  // Process functions in declaration order: parameter checks, then the
  // body, then the main-signature rule. The rule really does come last —
  // `fun main(x)` whose body references an unknown name reports the body
  // error, and `fun main(x)` next to a function `x` reports the argument
  // collision; only a main that survives both is rejected for its arity.
  let mut text = String::new();
  let mut pools: Vec<(&str, Vec<f64>)> = Vec::new();
  for func in &functions {
    check_params(func, &constants, &arities)?;

    let mut lowering = FnLowering::new(func, &constants, &arities);
    text.push_str(&lowering.lower()?);
    text.push('\n');
    pools.push((func.name.as_str(), lowering.pool));

    if func.name == "main" && !func.params.is_empty() {
      return Err(CompileError::semantic(
        "main function cant have any arguments",
      ));
    }
  }

  let mut asm = String::new();
  asm.push_str(".section .text\n.globl main\n\n");
  asm.push_str(&text);
  asm.push('\n');
  for (name, pool) in &pools {
    for (index, value) in pool.iter().enumerate() {
      asm.push_str(&format!("{POOL_PREFIX}{name}_{index}: .double {value}\n"));
    }
  }
  for (name, value) in &constants {
    asm.push_str(&format!("{name}: .double {value}\n"));
  }

  Ok(asm)
}

/// Check one function's parameters against the global namespaces and each
/// other, in that order.
fn check_params(
  func: &Function,
  constants: &BTreeMap<String, f64>,
  arities: &HashMap<String, usize>,
) -> CompileResult<()> {
  for (index, param) in func.params.iter().enumerate() {
    if constants.contains_key(param) {
      return Err(CompileError::semantic(format!(
        "cant create argument for '{}' with name '{param}': there is constant with that name",
        func.name
      )));
    }
    if arities.contains_key(param) {
      return Err(CompileError::semantic(format!(
        "cant create argument for '{}' with name '{param}': there is function with that name",
        func.name
      )));
    }
    if func.params[..index].contains(param) {
      return Err(CompileError::semantic(format!(
        "redefinition of argument '{param}' in function '{}'",
        func.name
      )));
    }
  }
  Ok(())
}

/// Per-function lowering state: the frame layout and the constant pool.
struct FnLowering<'a> {
  func: &'a Function,
  constants: &'a BTreeMap<String, f64>,
  arities: &'a HashMap<String, usize>,
  locals: Vec<String>,
  pool: Vec<f64>,
}

impl<'a> FnLowering<'a> {
  fn new(
    func: &'a Function,
    constants: &'a BTreeMap<String, f64>,
    arities: &'a HashMap<String, usize>,
  ) -> Self {
    Self {
      func,
      constants,
      arities,
      locals: Vec::new(),
      pool: Vec::new(),
    }
  }

  /// Emit label, prologue, body and epilogue for one function.
  fn lower(&mut self) -> CompileResult<String> {
    let mut asm = String::new();
    asm.push_str(&format!("{}:\n", self.func.name));
    push_ins(&mut asm, "push", "%rbp");
    push_ins(&mut asm, "mov", "%rsp,%rbp");

    // One 16-byte frame slot per incoming argument; arguments arrive in
    // `%xmm0`, `%xmm1`, ... and are spilled so calls cannot clobber them.
    // Locals number their slots above the parameters but get no frame
    // space here (see the assignment case below).
    for index in 0..self.func.params.len() {
      push_ins(&mut asm, "sub", "$0x10,%rsp");
      push_ins(&mut asm, "movsd", &format!("%xmm{index},{}", slot_address(index)));
    }

    for stmt in &self.func.body {
      match stmt {
        Stmt::Assign { name, value } => {
          self.check_assign_target(name)?;
          self.slot_of(name);
          // An assignment reserves its slot and pool entries, but its
          // instruction stream is dropped: no store ever reaches the
          // listing, and a local read back later loads an unwritten slot.
          let mut scratch = String::new();
          self.lower_expr(value, &mut scratch)?;
        }
        Stmt::Return { value } => {
          self.lower_expr(value, &mut asm)?;
        }
      }
    }

    push_op(&mut asm, "leaveq");
    push_op(&mut asm, "retq");
    Ok(asm)
  }

  /// Lower one expression, leaving its value in `%xmm0`.
  fn lower_expr(&mut self, expr: &Expr, out: &mut String) -> CompileResult<()> {
    match expr {
      Expr::Num { value } => {
        let label = self.pool_entry(*value);
        push_ins(out, "movsd", &format!("{label}(%rip),%xmm0"));
      }

      Expr::Name { name } => {
        if let Some(slot) = self.resolve_slot(name) {
          push_ins(out, "movsd", &format!("{},%xmm0", slot_address(slot)));
        } else if self.constants.contains_key(name) {
          push_ins(out, "movsd", &format!("{name}(%rip),%xmm0"));
        } else {
          return Err(CompileError::semantic(format!(
            "unknown variable '{name}' in function '{}'",
            self.func.name
          )));
        }
      }

      Expr::Binary { op, lhs, rhs } => {
        self.lower_expr(lhs, out)?;
        push_operand(out);
        self.lower_expr(rhs, out)?;
        pop_operand(out);
        let mnemonic = match op {
          BinaryOp::Add => "addsd",
          BinaryOp::Sub => "subsd",
          BinaryOp::Mul => "mulsd",
          BinaryOp::Div => "divsd",
        };
        push_ins(out, mnemonic, "%xmm1,%xmm0");
      }

      Expr::Neg { operand } => {
        // Negation of a non-literal is `0 - x`; the zero is pooled like
        // any other literal.
        let label = self.pool_entry(0.0);
        push_ins(out, "movsd", &format!("{label}(%rip),%xmm0"));
        push_operand(out);
        self.lower_expr(operand, out)?;
        pop_operand(out);
        push_ins(out, "subsd", "%xmm1,%xmm0");
      }

      Expr::Call { name, args } => {
        let Some(&expected) = self.arities.get(name) else {
          return Err(CompileError::semantic(format!(
            "unknown function call '{name}' in '{}'",
            self.func.name
          )));
        };
        if args.len() != expected {
          return Err(CompileError::semantic(format!(
            "invalid arguments count for function call '{name}': \
             expected {expected}, but got {} (in function '{}')",
            args.len(),
            self.func.name
          )));
        }

        // Evaluate arguments left to right, parking each on the stack,
        // then pop them in reverse into their argument registers.
        for arg in args {
          self.lower_expr(arg, out)?;
          push_operand(out);
        }
        for index in (0..args.len()).rev() {
          push_ins(out, "movsd", &format!("(%rsp),%xmm{index}"));
          push_ins(out, "add", "$0x10,%rsp");
        }
        push_ins(out, "call", name);
      }
    }

    Ok(())
  }

  /// Append a literal to this function's pool and return its label.
  fn pool_entry(&mut self, value: f64) -> String {
    let index = self.pool.len();
    self.pool.push(value);
    trace!("pool {}[{}] = {}", self.func.name, index, value);
    format!("{POOL_PREFIX}{}_{index}", self.func.name)
  }

  /// Find the frame slot of a parameter or an already-seen local.
  fn resolve_slot(&self, name: &str) -> Option<usize> {
    if let Some(index) = self.func.params.iter().position(|p| p == name) {
      return Some(index);
    }
    self
      .locals
      .iter()
      .position(|l| l == name)
      .map(|index| self.func.params.len() + index)
  }

  /// Slot of an assignment target, allocating a new local slot on first use.
  fn slot_of(&mut self, name: &str) -> usize {
    if let Some(slot) = self.resolve_slot(name) {
      return slot;
    }
    self.locals.push(name.to_string());
    self.func.params.len() + self.locals.len() - 1
  }

  fn check_assign_target(&self, name: &str) -> CompileResult<()> {
    if self.constants.contains_key(name) {
      return Err(CompileError::semantic(format!(
        "cant create local variable with name '{name}': there is constant with that name"
      )));
    }
    if self.arities.contains_key(name) {
      return Err(CompileError::semantic(format!(
        "cant create local variable with name '{name}': there is function with that name"
      )));
    }
    Ok(())
  }
}

/// `%rbp`-relative address of a 16-byte frame slot.
fn slot_address(slot: usize) -> String {
  format!("-{:#x}(%rbp)", 8 + 16 * slot)
}

/// Spill `%xmm0` to a fresh stack slot.
fn push_operand(out: &mut String) {
  push_ins(out, "sub", "$0x10,%rsp");
  push_ins(out, "movsd", "%xmm0,(%rsp)");
}

/// Move the just-computed right operand aside and reload the left one.
fn pop_operand(out: &mut String) {
  push_ins(out, "movaps", "%xmm0,%xmm1");
  push_ins(out, "movsd", "(%rsp),%xmm0");
  push_ins(out, "add", "$0x10,%rsp");
}

/// One instruction line: four spaces, mnemonic padded to eight columns.
fn push_ins(out: &mut String, mnemonic: &str, operands: &str) {
  out.push_str(&format!("    {mnemonic:<8}{operands}\n"));
}

/// An instruction without operands.
fn push_op(out: &mut String, mnemonic: &str) {
  out.push_str(&format!("    {mnemonic}\n"));
}
