//! Типизированное AST: результат семантического анализа.
//!
//! Дерево владеет своими узлами единолично. Объявленные переменные и
//! функции лежат в арене [`Entities`]; узлы, которые их используют,
//! хранят только [`VariableId`] / [`FunctionId`], поэтому много мест
//! использования ссылаются на одну и ту же сущность.

use crate::ops::{AssignOp, BinaryOp, UnaryOp};
use crate::types::Type;

/// Индекс переменной в арене.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableId(usize);

/// Индекс функции в арене.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(usize);

/// Объявленная переменная.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
    /// Параметры функций и переменные циклов `for` менять нельзя.
    pub read_only: bool,
}

/// Объявленная функция.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub return_type: Type,
    pub parameters: Vec<VariableId>,
}

impl Function {
    /// Число параметров.
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

/// Арена объявленных сущностей.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entities {
    variables: Vec<Variable>,
    functions: Vec<Function>,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, variable: Variable) -> VariableId {
        self.variables.push(variable);
        VariableId(self.variables.len() - 1)
    }

    pub fn add_function(&mut self, function: Function) -> FunctionId {
        self.functions.push(function);
        FunctionId(self.functions.len() - 1)
    }

    /// Получить переменную по индексу.
    ///
    /// Индексы выдаёт только эта арена, так что промах означает ошибку программиста.
    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0]
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

/// Программа: инструкции верхнего уровня и арена сущностей.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
    pub entities: Entities,
}

/// Ветка `else if`.
#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
    pub test: Expression,
    pub body: Vec<Statement>,
}

/// Условная инструкция.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Vec<Statement>,
    pub else_ifs: Vec<ElseIf>,
    pub alternate: Option<Vec<Statement>>,
}

/// Вызов функции.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub callee: FunctionId,
    pub args: Vec<Expression>,
    /// Тип результата (возвращаемый тип функции).
    pub ty: Type,
}

/// Инструкции.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    VariableDeclaration {
        variable: VariableId,
        initializer: Expression,
    },
    Assignment {
        target: VariableId,
        op: AssignOp,
        source: Expression,
    },
    Print(Expression),
    If(IfStatement),
    While {
        test: Expression,
        body: Vec<Statement>,
    },
    /// Цикл по целому числу (`0..n`) или по элементам массива.
    For {
        iterator: VariableId,
        collection: Expression,
        body: Vec<Statement>,
    },
    Return(Option<Expression>),
    FunctionDeclaration {
        function: FunctionId,
        body: Vec<Statement>,
    },
    Call(Call),
}

/// Выражения.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Int(i64),
    Double(f64),
    Bool(bool),
    StringLiteral(String),
    Variable(VariableId),
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
        ty: Type,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
        ty: Type,
    },
    Ternary {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
        ty: Type,
    },
    Call(Call),
    ArrayAccess {
        array: Box<Expression>,
        index: Box<Expression>,
        ty: Type,
    },
    ArrayLiteral {
        elements: Vec<Expression>,
        ty: Type,
    },
}

impl Expression {
    /// Тип выражения. Для ссылок на переменные берётся из арены.
    pub fn ty(&self, entities: &Entities) -> Type {
        match self {
            Expression::Int(_) => Type::Int,
            Expression::Double(_) => Type::Double,
            Expression::Bool(_) => Type::Bool,
            Expression::StringLiteral(_) => Type::String,
            Expression::Variable(id) => entities.variable(*id).ty.clone(),
            Expression::Binary { ty, .. }
            | Expression::Unary { ty, .. }
            | Expression::Ternary { ty, .. }
            | Expression::ArrayAccess { ty, .. }
            | Expression::ArrayLiteral { ty, .. } => ty.clone(),
            Expression::Call(call) => call.ty.clone(),
        }
    }

    /// Числовой литерал как f64.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expression::Int(n) => Some(*n as f64),
            Expression::Double(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Expression::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Является ли выражение числовым литералом с данным значением.
    pub fn is_number(&self, value: f64) -> bool {
        self.as_number() == Some(value)
    }
}
