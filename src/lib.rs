pub mod ast;
pub mod diagnostic;
pub mod emit;
pub mod lexeme;
pub mod lexer;
pub mod parser;
pub mod span;

use diagnostic::{report_warning, CompileError, Diagnostic};
use lexer::Lexer;
use parser::Parser;

/// Scans and parses `source` into a file AST, printing any scanner
/// warnings to stderr along the way. The first parser error, if any,
/// aborts and is returned.
pub fn parse_source(source: &str) -> Result<ast::File, Diagnostic> {
    let (tokens, warnings) = Lexer::new(source).tokenize();
    for warning in &warnings {
        report_warning(warning);
    }
    Parser::new(tokens).parse_file()
}

/// Runs the full pipeline — scan, parse, emit, verify, optimize — and
/// returns the resulting LLVM textual IR.
pub fn compile(source: &str, module_name: &str) -> Result<String, CompileError> {
    let file = parse_source(source)?;
    let ir = emit::compile_to_ir(&file, module_name)?;
    Ok(ir)
}
