//! Single-pass compiler for the Jack language, targeting the textual
//! stack-machine VM language.
//!
//! Lexical analysis, recursive-descent parsing, symbol resolution and
//! code emission are fused into one traversal; no syntax tree is built.
pub mod engine;
pub mod lex;
pub mod symbol_table;
pub mod token_stream;
pub mod tokens;
pub mod vm;

pub use engine::{CompilationEngine, CompileError};

use std::io;

/// Compile one Jack class into VM instructions written to the given sink.
///
/// The flushed sink is returned on success.
pub fn compile<W: io::Write>(source: &str, sink: W) -> Result<W, CompileError> {
    // Lexical analysis
    let lexer = lex::Lexer::new(source);
    let stream = token_stream::TokenStream::new(lexer);

    // Code emission
    let writer = vm::VmWriter::new(sink);

    // Parsing, symbol resolution and emission in one pass
    let engine = engine::CompilationEngine::new(stream, writer);
    engine.compile_class()
}

/// Compile one Jack class and return the VM program as a string.
pub fn compile_str(source: &str) -> Result<String, CompileError> {
    let buf = compile(source, Vec::new())?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
