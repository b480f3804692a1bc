//! End-to-end fixtures: whole programs in, whole listings (or exact error
//! strings) out. Listing comparisons trim the outer edges only, so every
//! interior byte of the expected assembly is load-bearing.

use funcc::text::trim_copy;

fn assert_compilation(source: &str, expected_assembly: &str, expected_error: &str) {
  let result = funcc::compile(source);

  if !expected_error.is_empty() {
    match result {
      Ok(asm) => panic!("expected error {expected_error:?}, but compilation produced:\n{asm}"),
      Err(err) => assert_eq!(err.to_string(), expected_error),
    }
    return;
  }

  match result {
    Ok(asm) => assert_eq!(trim_copy(&asm), trim_copy(expected_assembly)),
    Err(err) => panic!("expected successful compilation, got: {err}"),
  }
}

#[test]
fn only_constants() {
  assert_compilation(
    r"
pi = 3.1415927;
x2 = -234234.123123;
e = 2.7;
x1 = 1.23123123;

fun main() { return 0; }
",
    r"
.section .text
.globl main

main:
    push    %rbp
    mov     %rsp,%rbp
    movsd   _c_const_main_0(%rip),%xmm0
    leaveq
    retq


_c_const_main_0: .double 0
e: .double 2.7
pi: .double 3.1415927
x1: .double 1.23123123
x2: .double -234234.123123
",
    "",
  );
}

#[test]
fn redefinition_of_constant() {
  assert_compilation(
    r"
pi = 3.1415927;
_x = 42;
x2 = -234234.123123;
e = 2.7;
x1 = 1.23123123;
_x = 43;
",
    "",
    "constant '_x' is defined twice",
  );
}

#[test]
fn redefinition_of_function() {
  assert_compilation(
    r"
fun f() {}
fun main() {}
fun f() {}
",
    "",
    "function 'f' is defined twice",
  );
}

#[test]
fn function_call_with_too_few_arguments() {
  assert_compilation(
    r"
fun f() {}

fun main() { return f(1.0); }
",
    "",
    "invalid arguments count for function call 'f': expected 0, but got 1 (in function 'main')",
  );
}

#[test]
fn function_call_with_too_many_arguments() {
  assert_compilation(
    r"
fun f(x, y) { return x + y; }

fun main() { return f(1.0, 2.0, 3.0); }
",
    "",
    "invalid arguments count for function call 'f': expected 2, but got 3 (in function 'main')",
  );
}

#[test]
fn constants_from_functions() {
  assert_compilation(
    r"
pi = 3.1415927;
x2 = -234234.123123;
e = 2.7;
x1 = 1.23123123;

fun lol(k) {
    l = 43;
    return 1 * 43 + 45 * k;
}

fun main() {
    return 42 / 1244.2234234;
}
",
    r"
.section .text
.globl main

lol:
    push    %rbp
    mov     %rsp,%rbp
    sub     $0x10,%rsp
    movsd   %xmm0,-0x8(%rbp)
    movsd   _c_const_lol_1(%rip),%xmm0
    sub     $0x10,%rsp
    movsd   %xmm0,(%rsp)
    movsd   _c_const_lol_2(%rip),%xmm0
    movaps  %xmm0,%xmm1
    movsd   (%rsp),%xmm0
    add     $0x10,%rsp
    mulsd   %xmm1,%xmm0
    sub     $0x10,%rsp
    movsd   %xmm0,(%rsp)
    movsd   _c_const_lol_3(%rip),%xmm0
    sub     $0x10,%rsp
    movsd   %xmm0,(%rsp)
    movsd   -0x8(%rbp),%xmm0
    movaps  %xmm0,%xmm1
    movsd   (%rsp),%xmm0
    add     $0x10,%rsp
    mulsd   %xmm1,%xmm0
    movaps  %xmm0,%xmm1
    movsd   (%rsp),%xmm0
    add     $0x10,%rsp
    addsd   %xmm1,%xmm0
    leaveq
    retq

main:
    push    %rbp
    mov     %rsp,%rbp
    movsd   _c_const_main_0(%rip),%xmm0
    sub     $0x10,%rsp
    movsd   %xmm0,(%rsp)
    movsd   _c_const_main_1(%rip),%xmm0
    movaps  %xmm0,%xmm1
    movsd   (%rsp),%xmm0
    add     $0x10,%rsp
    divsd   %xmm1,%xmm0
    leaveq
    retq


_c_const_lol_0: .double 43
_c_const_lol_1: .double 1
_c_const_lol_2: .double 43
_c_const_lol_3: .double 45
_c_const_main_0: .double 42
_c_const_main_1: .double 1244.2234234
e: .double 2.7
pi: .double 3.1415927
x1: .double 1.23123123
x2: .double -234234.123123
",
    "",
  );
}

#[test]
fn manual_definition_of_pool_constant() {
  assert_compilation(
    r"
pi = 3.1415927;
x2 = -234234.123123;
e = 2.7;
x1 = 1.23123123;
_c_const_lol_1=1;

fun lol() {
    l = 43;
    return 1 * 43 + 45;
}

fun main() {
    return (42);
}
",
    "",
    "cant define constant '_c_const_lol_1' (do not define it manually)",
  );
}

#[test]
fn define_function_with_constant_name() {
  assert_compilation(
    r"
x = 42;
fun x() {}
",
    "",
    "cant define function 'x': there is constant with that name",
  );
}

#[test]
fn define_variable_with_constant_name() {
  assert_compilation(
    r"
x = 42;
fun main() {
    x = 43;
    return x;
}
",
    "",
    "cant create local variable with name 'x': there is constant with that name",
  );
}

#[test]
fn define_variable_with_function_name() {
  assert_compilation(
    r"
fun main() {
    x = 43;
    return x;
}

fun x() { return 42; }
",
    "",
    "cant create local variable with name 'x': there is function with that name",
  );
}

#[test]
fn define_argument_with_constant_name() {
  assert_compilation(
    r"
x = 42;

fun f(x) {
    return x * x;
}
",
    "",
    "cant create argument for 'f' with name 'x': there is constant with that name",
  );
}

#[test]
fn define_argument_with_function_name() {
  assert_compilation(
    r"
fun main(x) {
    return x * x;
}

fun x() { return 52; }
",
    "",
    "cant create argument for 'main' with name 'x': there is function with that name",
  );
}

#[test]
fn redefinition_of_argument() {
  assert_compilation(
    r"
fun main(x, y, x) {
    return x * y * x;
}
",
    "",
    "redefinition of argument 'x' in function 'main'",
  );
}

#[test]
fn unknown_variable_in_usage() {
  assert_compilation(
    r"
fun main(x) {
    return x * 1 / (y);
}
",
    "",
    "unknown variable 'y' in function 'main'",
  );
}

#[test]
fn unknown_variable_in_function_call() {
  assert_compilation(
    r"
fun f(x) {
    return x;
}

fun main() {
    return f(y);
}
",
    "",
    "unknown variable 'y' in function 'main'",
  );
}

#[test]
fn unknown_function_call() {
  assert_compilation(
    r"
fun c(x, y) {
    return x + y;
}

fun main() {
    return 1 + c(42, l(44));
}
",
    "",
    "unknown function call 'l' in 'main'",
  );
}

#[test]
fn main_function_cant_get_arguments() {
  assert_compilation(
    r"
fun main(x) {
    return x;
}
",
    "",
    "main function cant have any arguments",
  );
}

#[test]
fn return_global_constant() {
  assert_compilation(
    r"
pi = 3.1415927;
fun main() {
    return pi;
}
",
    r"
.section .text
.globl main

main:
    push    %rbp
    mov     %rsp,%rbp
    movsd   pi(%rip),%xmm0
    leaveq
    retq


pi: .double 3.1415927
",
    "",
  );
}

// ----- Universal invariants -----

const WELL_FORMED: &str = r"
pi = 3.1415927;
e = 2.7;

fun square(x) { return x * x; }

fun main() { return square(pi) + e; }
";

#[test]
fn well_formed_programs_compile() {
  assert!(funcc::compile(WELL_FORMED).is_ok());
}

#[test]
fn compilation_is_deterministic() {
  let first = funcc::compile(WELL_FORMED).unwrap();
  let second = funcc::compile(WELL_FORMED).unwrap();
  assert_eq!(first, second);
}

#[test]
fn globals_emit_in_lexicographic_order() {
  let asm = funcc::compile("zz = 1;\naa = 2;\nmm = 3;\nfun main() { return 0; }").unwrap();
  let aa = asm.find("aa: .double 2").unwrap();
  let mm = asm.find("mm: .double 3").unwrap();
  let zz = asm.find("zz: .double 1").unwrap();
  assert!(aa < mm && mm < zz);
}

#[test]
fn pool_labels_count_from_zero_per_function() {
  let asm = funcc::compile(
    "fun f() { return 1 + 2; }\n\
     fun main() { return 3 + 4; }",
  )
  .unwrap();
  for label in [
    "_c_const_f_0: .double 1",
    "_c_const_f_1: .double 2",
    "_c_const_main_0: .double 3",
    "_c_const_main_1: .double 4",
  ] {
    assert!(asm.contains(label), "missing {label:?} in:\n{asm}");
  }
  assert!(!asm.contains("_c_const_f_2"));
  assert!(!asm.contains("_c_const_main_2"));
}

#[test]
fn repeated_literals_get_distinct_pool_entries() {
  let asm = funcc::compile("fun main() { return 43 + 43; }").unwrap();
  assert!(asm.contains("_c_const_main_0: .double 43"));
  assert!(asm.contains("_c_const_main_1: .double 43"));
}

#[test]
fn listing_ends_with_a_single_newline() {
  let asm = funcc::compile("fun main() { return 0; }").unwrap();
  assert!(asm.ends_with('\n'));
  assert!(!asm.ends_with("\n\n"));
}

#[test]
fn failed_compilation_produces_no_assembly() {
  let err = funcc::compile("x = 1;\nx = 2;").unwrap_err();
  assert_eq!(err.to_string(), "constant 'x' is defined twice");
}

#[test]
fn empty_function_body_is_prologue_and_epilogue_only() {
  let asm = funcc::compile("fun f() {}\nfun main() { return 0; }").unwrap();
  let f_body: Vec<&str> = asm
    .lines()
    .skip_while(|line| *line != "f:")
    .take_while(|line| !line.is_empty())
    .collect();
  assert_eq!(
    f_body,
    vec!["f:", "    push    %rbp", "    mov     %rsp,%rbp", "    leaveq", "    retq"]
  );
}
