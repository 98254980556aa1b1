//! Модуль `compiler`
//!
//! Архитектура frontend/backend в IcedCoffee:
//! - Frontend: разбор и семантический анализ ([`analyze`])
//! - Middle: необязательная оптимизация ([`optimize`])
//! - Backend: генерация JavaScript ([`generate`])

use std::path::Path;

use crate::error::CompileResult;

pub use crate::analyzer::analyze;
pub use crate::js_backend::{generate, generate_lines};
pub use crate::optimizer::optimize;

/// Настройки компиляции.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Запускать оптимизатор между анализом и генерацией.
    pub optimize: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { optimize: true }
    }
}

impl CompileOptions {
    /// Без оптимизации.
    pub fn unoptimized() -> Self {
        Self { optimize: false }
    }
}

/// Скомпилировать исходный код в JavaScript.
pub fn compile(source: &str, options: &CompileOptions) -> CompileResult<String> {
    log::debug!("compiler: analyzing {} bytes", source.len());
    let program = analyze(source)?;

    let program = if options.optimize {
        optimize(program)
    } else {
        log::debug!("compiler: optimizer disabled");
        program
    };

    Ok(generate(&program))
}

/// Прочитать файл и скомпилировать его.
pub fn compile_file(path: impl AsRef<Path>, options: &CompileOptions) -> CompileResult<String> {
    let path = path.as_ref();
    log::debug!("compiler: reading {}", path.display());
    let source = std::fs::read_to_string(path)?;
    compile(&source, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;

    #[test]
    fn test_compile_default_optimizes() {
        let js = compile("print(5 + 8)", &CompileOptions::default()).unwrap();
        assert_eq!(js, "console.log(13);");
    }

    #[test]
    fn test_compile_unoptimized() {
        let js = compile("print(5 + 8)", &CompileOptions::unoptimized()).unwrap();
        assert_eq!(js, "console.log((5 + 8));");
    }

    #[test]
    fn test_compile_reports_semantic_error() {
        let err = compile("print(x)", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::Semantic(_)));
        assert_eq!(
            err.to_string(),
            "Semantic error: Line 1, col 7: Reference to: x which is not declared"
        );
    }

    #[test]
    fn test_compile_missing_file() {
        let err = compile_file("/nonexistent/program.ic", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::Io(_)));
    }
}
