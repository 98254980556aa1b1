//! Модуль парсера IcedCoffee.
//!
//! Лексер на `logos` и парсер рекурсивного спуска строят дерево разбора
//! ([`tree`]), которое затем потребляет семантический анализатор.
//!
//! # Синтаксис
//!
//! ```text
//! ## Комментарий до конца строки
//! int x = 3
//! double y = 5.4
//! array[int] xs = [1, 2, 3]
//! x += 1
//! print(x > y ? x : y)
//!
//! if x == 3 {
//!   print("three")
//! } else if x == 4 {
//!   print("four")
//! } else {
//!   print("other")
//! }
//!
//! while x < 10 {
//!   x += 1
//! }
//!
//! for v in xs {
//!   print(v ^ 2)
//! }
//!
//! func square(n: int) -> int {
//!   return n * n
//! }
//! ```
//!
//! # Пример
//!
//! ```rust,ignore
//! use icedcoffee::parser::parse;
//!
//! let statements = parse("int x = 1\nprint(x)").unwrap();
//! assert_eq!(statements.len(), 2);
//! ```

pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod tree;

pub use error::ParseError;
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Position, Span, Spanned, Token};

/// Парсит исходный код в дерево разбора.
///
/// # Возвращает
///
/// Список инструкций верхнего уровня или первую синтаксическую ошибку.
pub fn parse(source: &str) -> Result<Vec<tree::Stmt>, ParseError> {
    let mut parser = Parser::new(source);
    parser.parse_program()
}
