use crate::error::MintError;
use crate::evaluator::Runtime;
use crate::lexer::{Lexer, TokenSpan};
use log::info;
use std::io::{self, Write};

/// Lexes `source` once and runs it, writing `print` output to `out`.
///
/// Output written before an error stays in `out`.
pub fn execute<W: Write>(source: &str, out: W) -> Result<(), MintError> {
    let tokens = Lexer::new(source).scan_tokens()?;
    info!("lexed {} tokens", tokens.len());

    let mut runtime = Runtime::new(out);
    runtime.run_program(TokenSpan::program(tokens))
}

/// Runs `source` against stdout and renders any error to stderr.
pub fn run(source: &str, filename: Option<&str>) -> Result<(), MintError> {
    let stdout = io::stdout();
    let result = execute(source, stdout.lock());

    match &result {
        Ok(()) => info!("finished {}", filename.unwrap_or("<script>")),
        Err(error) => error.report(source, filename),
    }
    result
}
