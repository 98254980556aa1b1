//! Дерево разбора: синтаксическая структура программы до анализа.
//!
//! Узлы не типизированы и ссылаются на имена строками; у каждого
//! узла есть [`Span`] для сообщений об ошибках.

use super::token::{Span, Spanned};
use crate::ops::{AssignOp, BinaryOp, UnaryOp};
use crate::types::Type;

/// Идентификатор с позицией.
pub type Ident = Spanned<String>;

/// Блок `{ ... }`.
pub type Block = Vec<Stmt>;

/// Параметр функции: `x` или `x: int`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: Option<Spanned<Type>>,
}

/// Ветка `else if`.
#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
    pub test: Expr,
    pub body: Block,
}

/// Вызов `f(a, b)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSyntax {
    pub callee: Ident,
    pub args: Vec<Expr>,
    /// Позиция открывающей скобки (для ошибок арности).
    pub open_paren: Span,
}

/// Инструкция.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `int x = e`
    VarDecl {
        ty: Spanned<Type>,
        name: Ident,
        initializer: Expr,
    },
    /// `func f(a, b) -> int { ... }`
    FunDecl {
        name: Ident,
        params: Vec<Param>,
        return_type: Spanned<Type>,
        body: Block,
    },
    /// `x = e`, `x += e`, ...
    Assign {
        target: Ident,
        op: Spanned<AssignOp>,
        value: Expr,
    },
    /// `print(e)`
    Print { argument: Expr, span: Span },
    /// `if t { } else if t { } else { }`
    If {
        test: Expr,
        consequent: Block,
        else_ifs: Vec<ElseIf>,
        alternate: Option<Block>,
        span: Span,
    },
    /// `while t { }`
    While { test: Expr, body: Block, span: Span },
    /// `for v in e { }`
    For {
        iterator: Ident,
        collection: Expr,
        body: Block,
        span: Span,
    },
    /// `return` или `return e`
    Return { value: Option<Expr>, span: Span },
    /// `f(a)` как инструкция
    Call(CallSyntax),
}

/// Выражение с позицией.
pub type Expr = Spanned<ExprKind>;

/// Виды выражений.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Double(f64),
    Bool(bool),
    Str(String),
    Ident(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Ternary {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Call(CallSyntax),
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Array(Vec<Expr>),
}
