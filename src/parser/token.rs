//! Токены и позиции для парсера IcedCoffee.

use serde::{Deserialize, Serialize};

/// Позиция в исходном коде.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Начальная позиция (байт).
    pub start: usize,
    /// Конечная позиция (байт).
    pub end: usize,
}

impl Span {
    /// Создать новый Span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Объединить два Span.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Строка и колонка начала Span в исходнике.
    pub fn position(&self, source: &str) -> Position {
        Position::locate(source, self.start)
    }
}

/// Строка и колонка (обе с единицы), как их видит пользователь.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Перевести байтовое смещение в строку/колонку.
    ///
    /// Колонка считается в символах, а не в байтах, чтобы не-ASCII
    /// идентификаторы не сдвигали позицию ошибки.
    pub fn locate(source: &str, offset: usize) -> Position {
        let offset = offset.min(source.len());
        let mut line = 1;
        let mut line_start = 0;
        for (i, c) in source.char_indices() {
            if i >= offset {
                break;
            }
            if c == '\n' {
                line += 1;
                line_start = i + 1;
            }
        }
        let column = source
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(0)
            + 1;
        Position { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}, col {}", self.line, self.column)
    }
}

/// Значение с позицией.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
}

/// Ключевые слова языка.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Int,
    Double,
    Bool,
    String,
    Void,
    Array,
    Func,
    Return,
    Print,
    If,
    Else,
    While,
    For,
    In,
    True,
    False,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Int => "int",
            Keyword::Double => "double",
            Keyword::Bool => "bool",
            Keyword::String => "string",
            Keyword::Void => "void",
            Keyword::Array => "array",
            Keyword::Func => "func",
            Keyword::Return => "return",
            Keyword::Print => "print",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::For => "for",
            Keyword::In => "in",
            Keyword::True => "true",
            Keyword::False => "false",
        }
    }

    /// Начинает ли ключевое слово имя типа.
    pub fn is_type_name(&self) -> bool {
        matches!(
            self,
            Keyword::Int
                | Keyword::Double
                | Keyword::Bool
                | Keyword::String
                | Keyword::Void
                | Keyword::Array
        )
    }
}

/// Типы токенов.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `?`
    Question,
    /// `->`
    Arrow,

    /// Целое число
    Int(i64),
    /// Число с плавающей точкой
    Double(f64),
    /// Строковый литерал (уже без escape-последовательностей)
    String(String),

    /// Идентификатор
    Ident(String),
    /// Ключевое слово
    Keyword(Keyword),
    /// Оператор (+, -, &&, +=, ...)
    Symbol(&'static str),

    /// Конец файла
    Eof,
}

impl Token {
    /// Является ли токен данным оператором.
    pub fn is_symbol(&self, symbol: &str) -> bool {
        matches!(self, Token::Symbol(s) if *s == symbol)
    }

    /// Является ли токен данным ключевым словом.
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, Token::Keyword(k) if *k == keyword)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Comma => write!(f, "','"),
            Token::Colon => write!(f, "':'"),
            Token::Question => write!(f, "'?'"),
            Token::Arrow => write!(f, "'->'"),
            Token::Int(n) => write!(f, "{}", n),
            Token::Double(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::Keyword(k) => write!(f, "'{}'", k.as_str()),
            Token::Symbol(s) => write!(f, "'{}'", s),
            Token::Eof => write!(f, "end of input"),
        }
    }
}
