pub mod ast;
pub mod diagnostics;
#[cfg(test)]
mod harness;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod resolver;
pub mod token;
pub mod types;

use std::io::{BufRead, Write};

use diagnostics::Diagnostics;
use interpreter::Fault;

/// How a run ended, with everything the driver needs to report it.
#[derive(Debug)]
pub enum RunStatus {
    Success,
    /// Lexing, parsing or resolution produced diagnostics; the program was
    /// not executed.
    FrontEndErrors(Vec<String>),
    Fault(Fault),
}

/// Runs a program source through the full pipeline. Static diagnostics stop
/// the run before interpretation; each front-end stage still processes the
/// whole program so one run reports as much as possible.
pub fn run(source: &str, stdin: &mut dyn BufRead, stdout: &mut dyn Write) -> RunStatus {
    let mut diags = Diagnostics::new();
    let tokens = lexer::tokenize(source, &mut diags);
    let program = parser::parse(tokens, &mut diags);
    if diags.had_error() {
        return RunStatus::FrontEndErrors(diags.messages().to_vec());
    }
    resolver::resolve(&program, &mut diags);
    if diags.had_error() {
        return RunStatus::FrontEndErrors(diags.messages().to_vec());
    }
    match interpreter::interpret(&program, stdin, stdout) {
        Ok(()) => RunStatus::Success,
        Err(fault) => RunStatus::Fault(fault),
    }
}
