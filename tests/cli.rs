//! Black-box tests against the `dalg` binary itself: the two CLI shapes
//! from the driver's external interface (token dump vs. compile-to-file)
//! and their exit codes.

use std::fs;
use std::process::Command;

use tempfile::tempdir;

fn dalg() -> Command {
    Command::new(env!("CARGO_BIN_EXE_dalg"))
}

#[test]
fn test_single_argument_dumps_tokens_and_exits_zero() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.dalg");
    fs::write(&input, "fn add(a, b) { a + b }").unwrap();

    let output = dalg().arg(&input).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("fn -> fn"));
    assert!(stdout.contains("add -> identifier"));
}

#[test]
fn test_two_arguments_compiles_to_the_given_output_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.dalg");
    let output_path = dir.path().join("out.ll");
    fs::write(&input, "fn add(a, b) { a + b }").unwrap();

    let output = dalg().arg(&input).arg(&output_path).output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let ir = fs::read_to_string(&output_path).unwrap();
    assert!(ir.contains("define double @add(double %a, double %b)"));
}

#[test]
fn test_compile_error_exits_nonzero_and_writes_no_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.dalg");
    let output_path = dir.path().join("out.ll");
    fs::write(&input, "fn bad() { y }").unwrap();

    let output = dalg().arg(&input).arg(&output_path).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown variable name"));
    assert!(!output_path.exists());
}

#[test]
fn test_missing_input_file_is_a_clean_failure() {
    let output = dalg().arg("/nonexistent/path/to/source.dalg").output().unwrap();
    assert!(!output.status.success());
}
