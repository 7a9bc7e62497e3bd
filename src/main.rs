use std::fs;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;

use dalg::diagnostic::{report_warning, CompileError};
use dalg::lexer::Lexer;
use dalg::parser::Parser as DalgParser;

/// A small ahead-of-time compiler for the Dalg language.
#[derive(Parser)]
#[command(name = "dalg", version, about = "Compiles Dalg source to LLVM IR")]
struct Cli {
    /// Source file to scan (and, with `output`, to compile).
    input: String,
    /// When given, compile `input` and write textual LLVM IR here instead
    /// of dumping its token stream.
    output: Option<String>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let result = match cli.output {
        Some(output) => run_compile(&cli.input, &output),
        None => run_dump_tokens(&cli.input),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_dump_tokens(input: &str) -> Result<(), CompileError> {
    let source = fs::read_to_string(input)?;
    let (tokens, warnings) = Lexer::new(&source).tokenize();
    for warning in &warnings {
        report_warning(warning);
    }
    for token in &tokens {
        println!("{} -> {}", token.lexeme, token.kind.kind_name());
    }
    Ok(())
}

fn run_compile(input: &str, output: &str) -> Result<(), CompileError> {
    let source = fs::read_to_string(input)?;
    let (tokens, warnings) = Lexer::new(&source).tokenize();
    for warning in &warnings {
        report_warning(warning);
    }

    let file = DalgParser::new(tokens).parse_file()?;
    let module_name = module_name_for(input);
    let ir = dalg::emit::compile_to_ir(&file, &module_name)?;
    fs::write(output, ir)?;
    Ok(())
}

fn module_name_for(input: &str) -> String {
    std::path::Path::new(input)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("module")
        .to_string()
}
