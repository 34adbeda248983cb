//! BreadLang compiler front end: lexer/parser, semantic analyzer, and
//! module linker.
//!
//! Split into `ast`, `parser`, `analyzer`, `linker`, and `config` modules,
//! with `analyzer` and `linker` carrying BreadLang's module system and
//! nominal type checking.

pub mod analyzer;
pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod linker;
pub mod parser;

pub use analyzer::Analyzer;
pub use ast::Program;
pub use config::CompilerConfig;
pub use parser::Parser;

use bread_core::error::BreadError;
use std::path::Path;

/// Parses, links, and type-checks `entry_path`, returning the fully
/// annotated [`Program`] on success.
///
/// This is as far as this crate goes: lowering the result to bytecode or
/// LLVM IR is left to an external collaborator crate.
pub fn compile_file(entry_path: &Path, config: &CompilerConfig) -> Result<Program, Vec<BreadError>> {
    let mut program = linker::link(entry_path, config).map_err(|e| vec![e])?;
    let mut analyzer = Analyzer::new();
    analyzer.analyze(&mut program)?;
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn compiles_a_single_file_program() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.bread");
        fs::write(&path, "let x: Int = 1 + 2\nprint(x)\n").unwrap();

        let config = CompilerConfig::default();
        let program = compile_file(&path, &config).expect("should compile");
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn reports_type_errors_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.bread");
        fs::write(&path, "let x: Int = true\n").unwrap();

        let config = CompilerConfig::default();
        let errors = compile_file(&path, &config).expect_err("should fail to type-check");
        assert!(!errors.is_empty());
    }
}
