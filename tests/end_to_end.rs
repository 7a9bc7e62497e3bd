//! End-to-end scenarios driving the public `compile` entry point directly,
//! covering the worked examples from the front-end's design notes.

use dalg::compile;

fn ir(source: &str) -> String {
    compile(source, "end_to_end").unwrap_or_else(|e| panic!("unexpected compile error: {e}"))
}

#[test]
fn test_add_returns_fadd_of_its_parameters() {
    let module = ir("fn add(a, b) { a + b }");
    assert!(module.contains("define double @add(double %a, double %b)"));
    assert!(module.contains("fadd"));
}

#[test]
fn test_precedence_in_an_assignment() {
    // x = 2 + 3 * 4; x -> x is bound to 14.0, which optimizes down to a
    // constant return once the default O3 pipeline runs.
    let module = ir("fn k() { x = 2 + 3 * 4; x }");
    assert!(module.contains("define double @k()"));
    assert!(module.contains("1.400000e+01") || module.contains("14"));
}

#[test]
fn test_if_else_merges_through_a_phi() {
    let module = ir("fn c(a) { if a < 0 { 0 } else { a } }");
    assert!(module.contains("define double @c(double %a)"));
}

#[test]
fn test_counted_loop_accumulates_into_a_slot() {
    let module = ir("fn loop() { s = 0; for i = 0, i < 3, 1 { s = s + i; } s }");
    assert!(module.contains("define double @loop()"));
}

#[test]
fn test_print_string_declares_printf_once() {
    let module = ir(r#"fn g() { print("hi"); 0 }"#);
    assert_eq!(module.matches("declare i32 @printf").count(), 1);
    assert!(module.contains("%s"));
}

#[test]
fn test_unbound_variable_aborts_with_no_ir_produced() {
    let err = compile("fn bad() { y }", "end_to_end").unwrap_err();
    assert!(err.to_string().contains("Unknown variable name: y"));
}

#[test]
fn test_calling_another_function_with_the_right_arity() {
    let module = ir("fn sq(a) { a * a } fn main() { sq(3) }");
    assert!(module.contains("define double @sq(double %a)"));
    assert!(module.contains("define double @main()"));
}

#[test]
fn test_determinism_same_source_same_ir() {
    let source = "fn f(a, b) { if a < b { a } else { b } }";
    assert_eq!(ir(source), ir(source));
}

#[test]
fn test_scanner_warning_does_not_block_a_later_syntax_error() {
    // An unterminated string literal is a warning; the missing closing
    // brace after it is what actually aborts compilation.
    let err = compile("fn f() { \"oops", "end_to_end").unwrap_err();
    assert!(err.to_string().starts_with("Line:"));
}
