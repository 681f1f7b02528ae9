//! Veld Compiler Library
//!
//! Compiles Veld, a small statically-typed procedural language, into
//! textual register-based assembly for a separate virtual machine.
//!
//! The pipeline is a single pass: source text is tokenized, the token
//! stream runs through a fixed sequence of reductions (comment stripping,
//! numeric literal fusion, `::` fusion), and a recursive-descent code
//! generator parses and emits assembly in one walk. There is no AST.
//!
//! ```rust,ignore
//! use veldc::compile_source;
//!
//! let compilation = compile_source("function main() -> int { return 0; }")?;
//! assert!(compilation.assembly.contains(".function: main"));
//! ```

pub mod codegen;
pub mod config;
pub mod env;
pub mod error;
pub mod function;
pub mod lexer;
pub mod reducers;
pub mod scope;
pub mod types;

pub use codegen::{CodeGen, Compilation, Warning};
pub use config::ProjectConfig;
pub use env::{CompilationEnv, FunctionSignature};
pub use error::CompileError;
pub use lexer::{Token, tokenize};
pub use reducers::reduce;
pub use scope::ScopeStack;
pub use types::ValueType;

use std::path::Path;
use tracing::debug;

/// Compile an already-reduced token stream.
pub fn compile_tokens(tokens: &[Token]) -> Result<Compilation, CompileError> {
    CodeGen::new(tokens).compile()
}

/// Compile source text to assembly.
pub fn compile_source(source: &str) -> Result<Compilation, CompileError> {
    let tokens = lexer::tokenize(source);
    debug!(count = tokens.len(), "lexed source");
    let tokens = reducers::reduce(tokens);
    debug!(count = tokens.len(), "reduced token stream");
    compile_tokens(&tokens)
}

/// Line and column (1-based) of the token an error points at. Falls back
/// to the start of the file when the error carries no usable index.
pub fn fault_location(tokens: &[Token], error: &CompileError) -> (usize, usize) {
    error
        .token_index()
        .and_then(|index| tokens.get(index))
        .map(|token| (token.line + 1, token.column + 1))
        .unwrap_or((1, 1))
}

/// Compile `input` and write the assembly to `output`.
///
/// On success returns the warnings to report. On any fault the error is
/// rendered with the input path and source position, and no output file
/// is written.
pub fn compile_file(input: &Path, output: &Path) -> Result<Vec<Warning>, String> {
    let source = std::fs::read_to_string(input)
        .map_err(|e| format!("could not open file: {}: {}", input.display(), e))?;

    let tokens = reducers::reduce(lexer::tokenize(&source));
    let compilation = compile_tokens(&tokens).map_err(|error| {
        let (line, column) = fault_location(&tokens, &error);
        format!("{}:{}:{}: {}", input.display(), line, column, error)
    })?;

    std::fs::write(output, &compilation.assembly)
        .map_err(|e| format!("could not write file: {}: {}", output.display(), e))?;
    debug!(output = %output.display(), "wrote assembly");
    Ok(compilation.warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_source_end_to_end() {
        let compilation = compile_source(
            "function g() -> int { var int x = 7; return x; }\n\
             function main() -> int { var int r = 0; r = g(); return r; }",
        )
        .unwrap();
        let asm = &compilation.assembly;
        assert!(asm.contains(".function: g\n"));
        assert!(asm.contains(".function: main\n"));
        assert!(asm.contains("    frame 0\n"));
        assert!(asm.contains("    call 1 g\n"));
        assert!(compilation.warnings.is_empty());
    }

    #[test]
    fn test_compile_source_strips_comments() {
        let compilation = compile_source(
            "// leading comment\n\
             function main() { /* nothing here */ }",
        )
        .unwrap();
        assert!(compilation.assembly.contains(".function: main\n"));
    }

    #[test]
    fn test_compile_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("prog.veld");
        let output = dir.path().join("prog.veld.asm");
        std::fs::write(&input, "function main() -> int { return 0; }\n").unwrap();

        let warnings = compile_file(&input, &output).unwrap();
        assert!(warnings.is_empty());

        let asm = std::fs::read_to_string(&output).unwrap();
        assert!(asm.contains(".function: main\n"));
        assert!(asm.contains("    izero 0\n"));
    }

    #[test]
    fn test_compile_file_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.veld");
        let output = dir.path().join("bad.veld.asm");
        std::fs::write(&input, "function f() {\n    break;\n}\n").unwrap();

        let err = compile_file(&input, &output).unwrap_err();
        assert!(err.contains("bad.veld:2:5:"), "{}", err);
        assert!(err.contains("'break' outside of a loop"), "{}", err);
    }

    #[test]
    fn test_no_output_file_on_fault() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.veld");
        let output = dir.path().join("bad.veld.asm");
        std::fs::write(&input, "function f() { return 1; }\n").unwrap();

        assert!(compile_file(&input, &output).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("absent.veld");
        let output = dir.path().join("absent.veld.asm");

        let err = compile_file(&input, &output).unwrap_err();
        assert!(err.contains("could not open file"), "{}", err);
    }

    #[test]
    fn test_compile_file_surfaces_missing_main_warning() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("lib.veld");
        let output = dir.path().join("lib.veld.asm");
        std::fs::write(&input, "function helper() { }\n").unwrap();

        let warnings = compile_file(&input, &output).unwrap();
        assert_eq!(warnings, vec![Warning::MissingMain]);
    }
}
