//! Модуль `analyzer`
//!
//! Семантический анализ: один рекурсивный проход по дереву разбора,
//! который разрешает имена через цепочку областей видимости, проверяет
//! типы и строит типизированное AST. Первая же ошибка прерывает анализ.
//!
//! Текущая область видимости передаётся параметром. Дочерняя область
//! является локальным значением, заимствующим родителя, и исчезает на
//! любом пути выхода, включая ранний возврат по `?`.

use std::collections::HashMap;

use crate::ast::{
    Call, ElseIf, Entities, Expression, Function, FunctionId, IfStatement, Program, Statement,
    Variable, VariableId,
};
use crate::error::{CompileError, CompileResult, SemanticError};
use crate::ops::UnaryOp;
use crate::parser::tree::{CallSyntax, Expr, ExprKind, Ident, Stmt};
use crate::parser::{self, Span};
use crate::types::Type;

/// Тип параметра без аннотации.
pub const DEFAULT_PARAMETER_TYPE: Type = Type::Double;

// === Области видимости ===

/// Сущность, на которую указывает имя.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entity {
    Variable(VariableId),
    Function(FunctionId),
}

/// Лексическая область видимости.
#[derive(Debug)]
struct Context<'p> {
    parent: Option<&'p Context<'p>>,
    locals: HashMap<String, Entity>,
    /// Функция, внутри тела которой мы находимся.
    function: Option<FunctionId>,
}

impl<'p> Context<'p> {
    /// Глобальная область.
    fn root() -> Self {
        Context {
            parent: None,
            locals: HashMap::new(),
            function: None,
        }
    }

    /// Область тела цикла: наследует объемлющую функцию.
    fn child(&self) -> Context<'_> {
        Context {
            parent: Some(self),
            locals: HashMap::new(),
            function: self.function,
        }
    }

    /// Область тела функции.
    fn function_body(&self, function: FunctionId) -> Context<'_> {
        Context {
            parent: Some(self),
            locals: HashMap::new(),
            function: Some(function),
        }
    }

    /// Найти имя, поднимаясь по цепочке родителей.
    fn lookup(&self, name: &str) -> Option<Entity> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(entity) = current.locals.get(name) {
                return Some(*entity);
            }
            scope = current.parent;
        }
        None
    }
}

// === Анализатор ===

/// Семантический анализатор.
pub struct Analyzer<'src> {
    /// Исходник нужен только для перевода Span в строку/колонку.
    source: &'src str,
    entities: Entities,
}

impl<'src> Analyzer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            entities: Entities::new(),
        }
    }

    /// Проанализировать программу верхнего уровня.
    pub fn analyze_program(mut self, statements: &[Stmt]) -> Result<Program, SemanticError> {
        let mut global = Context::root();
        let statements = self.analyze_block(statements, &mut global)?;

        log::debug!(
            "analyzer: {} statements, {} variables, {} functions",
            statements.len(),
            self.entities.variable_count(),
            self.entities.function_count()
        );

        Ok(Program {
            statements,
            entities: self.entities,
        })
    }

    fn analyze_block(
        &mut self,
        statements: &[Stmt],
        ctx: &mut Context<'_>,
    ) -> Result<Vec<Statement>, SemanticError> {
        statements
            .iter()
            .map(|statement| self.analyze_statement(statement, ctx))
            .collect()
    }

    fn analyze_statement(
        &mut self,
        statement: &Stmt,
        ctx: &mut Context<'_>,
    ) -> Result<Statement, SemanticError> {
        match statement {
            Stmt::VarDecl {
                ty,
                name,
                initializer,
            } => {
                if ty.value == Type::Void {
                    return Err(self.error("Cannot declare a void variable", ty.span));
                }
                // Инициализатор анализируется до регистрации имени:
                // `int x = x` допустимо, только если x есть снаружи.
                let value = self.analyze_expression(initializer, ctx, Some(&ty.value))?;
                self.check_assignable(&ty.value, &value, initializer.span)?;
                let variable = self.entities.add_variable(Variable {
                    name: name.value.clone(),
                    ty: ty.value.clone(),
                    read_only: false,
                });
                self.declare(ctx, name, Entity::Variable(variable))?;
                Ok(Statement::VariableDeclaration {
                    variable,
                    initializer: value,
                })
            }

            Stmt::FunDecl {
                name,
                params,
                return_type,
                body,
            } => {
                let mut parameters = Vec::with_capacity(params.len());
                for param in params {
                    let ty = param
                        .ty
                        .as_ref()
                        .map(|t| t.value.clone())
                        .unwrap_or(DEFAULT_PARAMETER_TYPE);
                    if ty == Type::Void {
                        return Err(self.error("Cannot declare a void variable", param.name.span));
                    }
                    parameters.push(self.entities.add_variable(Variable {
                        name: param.name.value.clone(),
                        ty,
                        read_only: true,
                    }));
                }

                let function = self.entities.add_function(Function {
                    name: name.value.clone(),
                    return_type: return_type.value.clone(),
                    parameters: parameters.clone(),
                });
                // Функция видна до анализа тела, чтобы разрешить рекурсию
                self.declare(ctx, name, Entity::Function(function))?;

                log::trace!("analyzer: enter function '{}'", name.value);
                let mut scope = ctx.function_body(function);
                for (param, variable) in params.iter().zip(&parameters) {
                    self.declare(&mut scope, &param.name, Entity::Variable(*variable))?;
                }
                let body = self.analyze_block(body, &mut scope)?;
                log::trace!("analyzer: leave function '{}'", name.value);

                Ok(Statement::FunctionDeclaration { function, body })
            }

            Stmt::Assign { target, op, value } => {
                let variable = self.resolve_variable(ctx, target)?;
                let (read_only, target_type) = {
                    let v = self.entities.variable(variable);
                    (v.read_only, v.ty.clone())
                };
                if read_only {
                    return Err(self.error(format!("{} is read only", target.value), target.span));
                }
                let source = self.analyze_expression(value, ctx, Some(&target_type))?;
                if op.value.is_compound() {
                    if !target_type.is_numeric() {
                        return Err(self.error("Int or Double expected", target.span));
                    }
                    self.check_numeric(&source, value.span)?;
                } else {
                    self.check_assignable(&target_type, &source, value.span)?;
                }
                Ok(Statement::Assignment {
                    target: variable,
                    op: op.value,
                    source,
                })
            }

            Stmt::Print { argument, .. } => {
                Ok(Statement::Print(self.analyze_expression(argument, ctx, None)?))
            }

            Stmt::If {
                test,
                consequent,
                else_ifs,
                alternate,
                ..
            } => {
                let test = self.analyze_condition(test, ctx)?;
                let consequent = self.analyze_block(consequent, ctx)?;
                let mut clauses = Vec::with_capacity(else_ifs.len());
                for clause in else_ifs {
                    let test = self.analyze_condition(&clause.test, ctx)?;
                    let body = self.analyze_block(&clause.body, ctx)?;
                    clauses.push(ElseIf { test, body });
                }
                let alternate = match alternate {
                    Some(block) => Some(self.analyze_block(block, ctx)?),
                    None => None,
                };
                Ok(Statement::If(IfStatement {
                    test,
                    consequent,
                    else_ifs: clauses,
                    alternate,
                }))
            }

            Stmt::While { test, body, .. } => {
                let test = self.analyze_condition(test, ctx)?;
                log::trace!("analyzer: enter while body");
                let mut scope = ctx.child();
                let body = self.analyze_block(body, &mut scope)?;
                log::trace!("analyzer: leave while body");
                Ok(Statement::While { test, body })
            }

            Stmt::For {
                iterator,
                collection,
                body,
                ..
            } => {
                let collection_span = collection.span;
                let collection = self.analyze_expression(collection, ctx, None)?;
                let element_type = match collection.ty(&self.entities) {
                    Type::Int => Type::Int,
                    Type::Array(base) => *base,
                    _ => return Err(self.error("Expected an Array or Int", collection_span)),
                };
                let variable = self.entities.add_variable(Variable {
                    name: iterator.value.clone(),
                    ty: element_type,
                    read_only: true,
                });

                log::trace!("analyzer: enter for body over '{}'", iterator.value);
                let mut scope = ctx.child();
                self.declare(&mut scope, iterator, Entity::Variable(variable))?;
                let body = self.analyze_block(body, &mut scope)?;
                log::trace!("analyzer: leave for body over '{}'", iterator.value);

                Ok(Statement::For {
                    iterator: variable,
                    collection,
                    body,
                })
            }

            Stmt::Return { value, span } => {
                let Some(function) = ctx.function else {
                    return Err(self.error("Return can only appear in a function", *span));
                };
                let return_type = self.entities.function(function).return_type.clone();
                match value {
                    None if return_type == Type::Void => Ok(Statement::Return(None)),
                    None => Err(self.error("No value returned", *span)),
                    Some(_) if return_type == Type::Void => {
                        Err(self.error("Cannot return in a void function", *span))
                    }
                    Some(expr) => {
                        let value = self.analyze_expression(expr, ctx, Some(&return_type))?;
                        let found = value.ty(&self.entities);
                        if !return_type.accepts(&found) {
                            return Err(self.error(
                                format!(
                                    "Cannot return a {} from a function returning {}",
                                    found, return_type
                                ),
                                expr.span,
                            ));
                        }
                        Ok(Statement::Return(Some(value)))
                    }
                }
            }

            Stmt::Call(call) => Ok(Statement::Call(self.analyze_call(call, ctx)?)),
        }
    }

    // === Выражения ===

    /// `hint`: ожидаемый тип из контекста; нужен только литералам массивов.
    fn analyze_expression(
        &mut self,
        expr: &Expr,
        ctx: &Context<'_>,
        hint: Option<&Type>,
    ) -> Result<Expression, SemanticError> {
        // Глубоко вложенные выражения не должны переполнять стек
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || self.analyze_expression_inner(expr, ctx, hint))
    }

    fn analyze_expression_inner(
        &mut self,
        expr: &Expr,
        ctx: &Context<'_>,
        hint: Option<&Type>,
    ) -> Result<Expression, SemanticError> {
        match &expr.value {
            ExprKind::Int(n) => Ok(Expression::Int(*n)),
            ExprKind::Double(f) => Ok(Expression::Double(*f)),
            ExprKind::Bool(b) => Ok(Expression::Bool(*b)),
            ExprKind::Str(s) => Ok(Expression::StringLiteral(s.clone())),

            ExprKind::Ident(name) => {
                let ident = parser::Spanned::new(name.clone(), expr.span);
                Ok(Expression::Variable(self.resolve_variable(ctx, &ident)?))
            }

            ExprKind::Binary { op, left, right } => {
                let l = self.analyze_expression(left, ctx, None)?;
                let r = self.analyze_expression(right, ctx, None)?;
                let ty = if op.is_arithmetic() {
                    self.check_numeric(&l, left.span)?;
                    self.check_numeric(&r, right.span)?;
                    l.ty(&self.entities)
                } else if op.is_logical() {
                    self.check_bool(&l, left.span)?;
                    self.check_bool(&r, right.span)?;
                    Type::Bool
                } else {
                    // Сравнение: операнды не проверяются
                    Type::Bool
                };
                Ok(Expression::Binary {
                    op: *op,
                    left: Box::new(l),
                    right: Box::new(r),
                    ty,
                })
            }

            ExprKind::Unary { op, operand } => {
                let value = self.analyze_expression(operand, ctx, None)?;
                let ty = match op {
                    UnaryOp::Not => {
                        self.check_bool(&value, operand.span)?;
                        Type::Bool
                    }
                    UnaryOp::Neg => value.ty(&self.entities),
                };
                Ok(Expression::Unary {
                    op: *op,
                    operand: Box::new(value),
                    ty,
                })
            }

            ExprKind::Ternary {
                test,
                consequent,
                alternate,
            } => {
                let test = self.analyze_condition(test, ctx)?;
                let consequent = self.analyze_expression(consequent, ctx, hint)?;
                let alternate = self.analyze_expression(alternate, ctx, hint)?;
                let ty = consequent.ty(&self.entities);
                if alternate.ty(&self.entities) != ty {
                    return Err(self.error("Must be same type", expr.span));
                }
                Ok(Expression::Ternary {
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                    ty,
                })
            }

            ExprKind::Call(call) => Ok(Expression::Call(self.analyze_call(call, ctx)?)),

            ExprKind::Index { array, index } => {
                let target = self.analyze_expression(array, ctx, None)?;
                let ty = match target.ty(&self.entities) {
                    Type::Array(base) => *base,
                    _ => return Err(self.error("Expected an Array", array.span)),
                };
                let position = self.analyze_expression(index, ctx, None)?;
                if position.ty(&self.entities) != Type::Int {
                    return Err(self.error("Expected an Int", index.span));
                }
                Ok(Expression::ArrayAccess {
                    array: Box::new(target),
                    index: Box::new(position),
                    ty,
                })
            }

            ExprKind::Array(items) => {
                let element_hint = hint.and_then(Type::element_type);
                let mut elements = Vec::with_capacity(items.len());
                for item in items {
                    elements.push(self.analyze_expression(item, ctx, element_hint)?);
                }
                // Элементы не сверяются с объявленным базовым типом
                let ty = match (hint, elements.first()) {
                    (Some(declared @ Type::Array(_)), _) => declared.clone(),
                    (_, Some(first)) => Type::array(first.ty(&self.entities)),
                    (_, None) => Type::array(Type::Void),
                };
                Ok(Expression::ArrayLiteral { elements, ty })
            }
        }
    }

    fn analyze_call(&mut self, call: &CallSyntax, ctx: &Context<'_>) -> Result<Call, SemanticError> {
        let callee = self.resolve_function(ctx, &call.callee)?;
        let (parameter_types, return_type) = {
            let function = self.entities.function(callee);
            let types: Vec<Type> = function
                .parameters
                .iter()
                .map(|p| self.entities.variable(*p).ty.clone())
                .collect();
            (types, function.return_type.clone())
        };

        if call.args.len() != parameter_types.len() {
            return Err(self.error(
                format!(
                    "Wrong number of arguments passed: expected {}, found {}",
                    parameter_types.len(),
                    call.args.len()
                ),
                call.open_paren,
            ));
        }

        // Проверяется только арность; типы параметров служат подсказкой
        let mut args = Vec::with_capacity(call.args.len());
        for (arg, ty) in call.args.iter().zip(&parameter_types) {
            args.push(self.analyze_expression(arg, ctx, Some(ty))?);
        }

        Ok(Call {
            callee,
            args,
            ty: return_type,
        })
    }

    /// Условие `if`/`while`/тернарного оператора.
    fn analyze_condition(
        &mut self,
        expr: &Expr,
        ctx: &Context<'_>,
    ) -> Result<Expression, SemanticError> {
        let test = self.analyze_expression(expr, ctx, None)?;
        self.check_bool(&test, expr.span)?;
        Ok(test)
    }

    // === Имена ===

    fn declare(
        &self,
        ctx: &mut Context<'_>,
        name: &Ident,
        entity: Entity,
    ) -> Result<(), SemanticError> {
        if ctx.locals.contains_key(&name.value) {
            return Err(self.error(
                format!("Identifier {} already declared", name.value),
                name.span,
            ));
        }
        ctx.locals.insert(name.value.clone(), entity);
        Ok(())
    }

    fn resolve_variable(&self, ctx: &Context<'_>, name: &Ident) -> Result<VariableId, SemanticError> {
        match ctx.lookup(&name.value) {
            Some(Entity::Variable(id)) => Ok(id),
            Some(Entity::Function(_)) => {
                Err(self.error(format!("{} is not a variable", name.value), name.span))
            }
            None => Err(self.undeclared(name)),
        }
    }

    fn resolve_function(&self, ctx: &Context<'_>, name: &Ident) -> Result<FunctionId, SemanticError> {
        match ctx.lookup(&name.value) {
            Some(Entity::Function(id)) => Ok(id),
            Some(Entity::Variable(_)) => {
                Err(self.error(format!("{} is not a function", name.value), name.span))
            }
            None => Err(self.undeclared(name)),
        }
    }

    fn undeclared(&self, name: &Ident) -> SemanticError {
        self.error(
            format!("Reference to: {} which is not declared", name.value),
            name.span,
        )
    }

    // === Проверки типов ===

    fn check_bool(&self, expr: &Expression, span: Span) -> Result<(), SemanticError> {
        if expr.ty(&self.entities) != Type::Bool {
            return Err(self.error("Expected a bool", span));
        }
        Ok(())
    }

    fn check_numeric(&self, expr: &Expression, span: Span) -> Result<(), SemanticError> {
        if !expr.ty(&self.entities).is_numeric() {
            return Err(self.error("Int or Double expected", span));
        }
        Ok(())
    }

    fn check_assignable(
        &self,
        target: &Type,
        source: &Expression,
        span: Span,
    ) -> Result<(), SemanticError> {
        let found = source.ty(&self.entities);
        if !target.accepts(&found) {
            return Err(self.error(format!("Cannot assign a {} to a {}", found, target), span));
        }
        Ok(())
    }

    fn error(&self, message: impl Into<String>, span: Span) -> SemanticError {
        SemanticError::new(message, Some(span.position(self.source)))
    }
}

/// Разобрать и проанализировать исходный код.
///
/// Синтаксическая ошибка пробрасывается как есть, анализ не начинается.
pub fn analyze(source: &str) -> CompileResult<Program> {
    let statements = parser::parse(source).map_err(|e| CompileError::syntax(&e, source))?;
    let program = Analyzer::new(source).analyze_program(&statements)?;
    Ok(program)
}
