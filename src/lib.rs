//! # IcedCoffee
//!
//! Компилятор учебного языка IcedCoffee в JavaScript.
//!
//! ## Основные модули
//!
//! - [`parser`] - Лексер и парсер рекурсивного спуска
//! - [`analyzer`] - Семантический анализ и построение типизированного AST
//! - [`ast`] - Типизированное AST и арена сущностей
//! - [`types`] - Система типов
//! - [`optimizer`] - Свёртка констант и удаление мёртвого кода
//! - [`js_backend`] - Генерация JavaScript
//! - [`compiler`] - Весь конвейер целиком
//!
//! ## Пример
//!
//! ```rust,ignore
//! use icedcoffee::{compile, CompileOptions};
//!
//! let js = compile("int x = 3\nprint(x ^ 2)", &CompileOptions::default()).unwrap();
//! assert_eq!(js, "let x = 3;\nconsole.log((x ** 2));");
//! ```

// === Основные модули ===
pub mod analyzer;
pub mod ast;
pub mod error;
pub mod ops;
pub mod parser;
pub mod types;

// === Конвейер ===
pub mod compiler;
pub mod js_backend;
pub mod optimizer;

// === Re-exports для удобства ===
pub use analyzer::analyze;
pub use ast::{Entities, Expression, Program, Statement};
pub use compiler::{compile, compile_file, CompileOptions};
pub use error::{CompileError, CompileResult, SemanticError};
pub use js_backend::{generate, generate_lines};
pub use optimizer::optimize;
pub use types::Type;
