//! Определения ошибок для IcedCoffee.

use serde::Serialize;
use thiserror::Error;

use crate::parser::{ParseError, Position};

/// Основной тип `Result` для библиотеки.
pub type CompileResult<T> = Result<T, CompileError>;

/// Нарушение семантического правила.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}{message}", located(.position))]
pub struct SemanticError {
    pub message: String,
    pub position: Option<Position>,
}

impl SemanticError {
    pub fn new(message: impl Into<String>, position: Option<Position>) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

fn located(position: &Option<Position>) -> String {
    position.map(|p| format!("{}: ", p)).unwrap_or_default()
}

/// Ошибки компиляции.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Syntax error: {position}: {message}")]
    Syntax { position: Position, message: String },

    #[error("Semantic error: {0}")]
    Semantic(#[from] SemanticError),

    #[error("IO error: {0}")]
    Io(String),
}

impl CompileError {
    /// Привязать ошибку парсера к строке и колонке исходника.
    pub fn syntax(error: &ParseError, source: &str) -> Self {
        Self::Syntax {
            position: error.span().position(source),
            message: error.to_string(),
        }
    }

    /// Позиция ошибки, если известна.
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Syntax { position, .. } => Some(*position),
            Self::Semantic(e) => e.position,
            Self::Io(_) => None,
        }
    }

    /// Машиночитаемое описание ошибки (для `--json`).
    pub fn diagnostic(&self) -> Diagnostic {
        let (kind, message) = match self {
            Self::Syntax { message, .. } => ("syntax", message.clone()),
            Self::Semantic(e) => ("semantic", e.message.clone()),
            Self::Io(message) => ("io", message.clone()),
        };
        let position = self.position();
        Diagnostic {
            kind,
            message,
            line: position.map(|p| p.line),
            column: position.map(|p| p.column),
        }
    }
}

impl From<std::io::Error> for CompileError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

/// Диагностика в формате JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Span;

    #[test]
    fn test_semantic_error_display() {
        let e = SemanticError::new("x is read only", Some(Position { line: 2, column: 1 }));
        assert_eq!(e.to_string(), "Line 2, col 1: x is read only");
        let e = SemanticError::new("x is read only", None);
        assert_eq!(e.to_string(), "x is read only");
    }

    #[test]
    fn test_syntax_error_from_parse_error() {
        let parse_error = ParseError::LexerError {
            span: Span::new(4, 5),
            text: "$".to_string(),
        };
        let e = CompileError::syntax(&parse_error, "x = $");
        assert_eq!(e.to_string(), "Syntax error: Line 1, col 5: Unexpected character '$'");
    }

    #[test]
    fn test_diagnostic_json() {
        let e = CompileError::Semantic(SemanticError::new(
            "Expected a bool",
            Some(Position { line: 3, column: 4 }),
        ));
        let json = serde_json::to_value(e.diagnostic()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "semantic",
                "message": "Expected a bool",
                "line": 3,
                "column": 4,
            })
        );

        let json = serde_json::to_value(CompileError::Io("missing".into()).diagnostic()).unwrap();
        assert!(json.get("line").is_none());
    }
}
