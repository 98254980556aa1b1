//! Ошибки парсера.

use super::token::{Span, Token};
use thiserror::Error;

/// Ошибка парсинга.
///
/// Сообщения не содержат позиции: строку и колонку добавляет
/// [`CompileError`](crate::error::CompileError), у которого есть исходник.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Неожиданный токен.
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken {
        span: Span,
        expected: String,
        found: String,
    },

    /// Неожиданный конец ввода.
    #[error("Unexpected end of input: {message}")]
    UnexpectedEof { span: Span, message: String },

    /// Неверный литерал.
    #[error("Invalid literal: {message}")]
    InvalidLiteral { span: Span, message: String },

    /// Ошибка лексера.
    #[error("Unexpected character '{text}'")]
    LexerError { span: Span, text: String },
}

impl ParseError {
    /// Создать ошибку "неожиданный токен".
    ///
    /// Конец файла превращается в [`ParseError::UnexpectedEof`].
    pub fn unexpected_token(span: Span, expected: impl Into<String>, found: &Token) -> Self {
        if matches!(found, Token::Eof) {
            return Self::unexpected_eof(span, format!("expected {}", expected.into()));
        }
        Self::UnexpectedToken {
            span,
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    /// Создать ошибку "неожиданный конец".
    pub fn unexpected_eof(span: Span, message: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            span,
            message: message.into(),
        }
    }

    /// Получить позицию ошибки.
    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. } => *span,
            Self::UnexpectedEof { span, .. } => *span,
            Self::InvalidLiteral { span, .. } => *span,
            Self::LexerError { span, .. } => *span,
        }
    }
}
