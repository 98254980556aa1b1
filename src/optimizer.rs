//! Модуль `optimizer`
//!
//! Переписывание типизированного AST снизу вверх: свёртка констант,
//! алгебраические тождества, сокращённые логические выражения и удаление
//! мёртвого кода. Проход чистый и тотальный: ошибок не бывает, повторный
//! запуск ничего не меняет.
//!
//! Инструкция может переписаться в ноль или несколько инструкций, поэтому
//! [`optimize_statement`] возвращает `Vec`, а блоки собираются через
//! `flat_map`.

use crate::ast::{Call, ElseIf, Expression, IfStatement, Program, Statement};
use crate::ops::{AssignOp, BinaryOp, UnaryOp};
use crate::types::Type;

/// Оптимизировать программу целиком.
pub fn optimize(program: Program) -> Program {
    let before = program.statements.len();
    let statements = optimize_block(program.statements);
    log::debug!(
        "optimizer: {} top-level statements -> {}",
        before,
        statements.len()
    );
    Program {
        statements,
        entities: program.entities,
    }
}

fn optimize_block(statements: Vec<Statement>) -> Vec<Statement> {
    statements.into_iter().flat_map(optimize_statement).collect()
}

/// Оптимизировать одну инструкцию.
pub fn optimize_statement(statement: Statement) -> Vec<Statement> {
    match statement {
        Statement::VariableDeclaration {
            variable,
            initializer,
        } => vec![Statement::VariableDeclaration {
            variable,
            initializer: optimize_expression(initializer),
        }],

        Statement::Assignment { target, op, source } => {
            let source = optimize_expression(source);
            // `x = x`
            if op == AssignOp::Assign && source == Expression::Variable(target) {
                return vec![];
            }
            vec![Statement::Assignment { target, op, source }]
        }

        Statement::Print(argument) => vec![Statement::Print(optimize_expression(argument))],

        Statement::If(statement) => optimize_if(statement),

        Statement::While { test, body } => {
            let test = optimize_expression(test);
            if test == Expression::Bool(false) {
                return vec![];
            }
            vec![Statement::While {
                test,
                body: optimize_block(body),
            }]
        }

        Statement::For {
            iterator,
            collection,
            body,
        } => {
            let collection = optimize_expression(collection);
            if matches!(&collection, Expression::ArrayLiteral { elements, .. } if elements.is_empty()) {
                return vec![];
            }
            vec![Statement::For {
                iterator,
                collection,
                body: optimize_block(body),
            }]
        }

        Statement::Return(value) => vec![Statement::Return(value.map(optimize_expression))],

        Statement::FunctionDeclaration { function, body } => {
            vec![Statement::FunctionDeclaration {
                function,
                body: optimize_block(body),
            }]
        }

        Statement::Call(call) => vec![Statement::Call(optimize_call(call))],
    }
}

/// Цепочка `if / else if / else` с константными условиями.
///
/// Ветка с ложным условием выбрасывается; ветка с истинным становится
/// финальным `else`, всё после неё отбрасывается. Если условных веток
/// не осталось, на месте `if` остаётся тело `else` (или ничего).
fn optimize_if(statement: IfStatement) -> Vec<Statement> {
    let first = ElseIf {
        test: statement.test,
        body: statement.consequent,
    };
    let mut clauses = Vec::new();
    let mut alternate = statement.alternate.map(optimize_block);

    for clause in std::iter::once(first).chain(statement.else_ifs) {
        let test = optimize_expression(clause.test);
        match test {
            Expression::Bool(true) => {
                alternate = Some(optimize_block(clause.body));
                break;
            }
            Expression::Bool(false) => {}
            test => clauses.push(ElseIf {
                test,
                body: optimize_block(clause.body),
            }),
        }
    }

    let mut clauses = clauses.into_iter();
    match clauses.next() {
        Some(head) => vec![Statement::If(IfStatement {
            test: head.test,
            consequent: head.body,
            else_ifs: clauses.collect(),
            alternate,
        })],
        None => alternate.unwrap_or_default(),
    }
}

fn optimize_call(call: Call) -> Call {
    Call {
        callee: call.callee,
        args: call.args.into_iter().map(optimize_expression).collect(),
        ty: call.ty,
    }
}

/// Оптимизировать выражение (сначала дети, затем сам узел).
pub fn optimize_expression(expr: Expression) -> Expression {
    stacker::maybe_grow(32 * 1024, 1024 * 1024, || optimize_expression_inner(expr))
}

fn optimize_expression_inner(expr: Expression) -> Expression {
    match expr {
        Expression::Binary {
            op,
            left,
            right,
            ty,
        } => {
            let left = optimize_expression(*left);
            let right = optimize_expression(*right);
            optimize_binary(op, left, right, ty)
        }

        Expression::Unary { op, operand, ty } => {
            let operand = optimize_expression(*operand);
            let folded = match (op, &operand) {
                (UnaryOp::Neg, Expression::Int(n)) => n.checked_neg().map(Expression::Int),
                (UnaryOp::Neg, Expression::Double(f)) => Some(Expression::Double(-f)),
                _ => None,
            };
            folded.unwrap_or_else(|| Expression::Unary {
                op,
                operand: Box::new(operand),
                ty,
            })
        }

        Expression::Ternary {
            test,
            consequent,
            alternate,
            ty,
        } => {
            let test = optimize_expression(*test);
            let consequent = optimize_expression(*consequent);
            let alternate = optimize_expression(*alternate);
            match test {
                Expression::Bool(true) => consequent,
                Expression::Bool(false) => alternate,
                test => Expression::Ternary {
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                    ty,
                },
            }
        }

        Expression::Call(call) => Expression::Call(optimize_call(call)),

        Expression::ArrayAccess { array, index, ty } => Expression::ArrayAccess {
            array: Box::new(optimize_expression(*array)),
            index: Box::new(optimize_expression(*index)),
            ty,
        },

        Expression::ArrayLiteral { elements, ty } => Expression::ArrayLiteral {
            elements: elements.into_iter().map(optimize_expression).collect(),
            ty,
        },

        leaf @ (Expression::Int(_)
        | Expression::Double(_)
        | Expression::Bool(_)
        | Expression::StringLiteral(_)
        | Expression::Variable(_)) => leaf,
    }
}

fn optimize_binary(
    op: BinaryOp,
    left: Expression,
    right: Expression,
    ty: Type,
) -> Expression {
    // Два числовых литерала: сначала свёртка, при неудаче тождества
    if left.as_number().is_some() && right.as_number().is_some() {
        if let Some(folded) = fold(op, &left, &right) {
            return folded;
        }
    }

    match op {
        BinaryOp::Add if right.is_number(0.0) => left,
        BinaryOp::Add if left.is_number(0.0) => right,
        BinaryOp::Sub if right.is_number(0.0) => left,
        BinaryOp::Sub if left.is_number(0.0) => Expression::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(right),
            ty,
        },
        BinaryOp::Mul if right.is_number(1.0) => left,
        BinaryOp::Mul if left.is_number(1.0) => right,
        BinaryOp::Mul if right.is_number(0.0) => right,
        BinaryOp::Mul if left.is_number(0.0) => left,
        BinaryOp::Div if right.is_number(1.0) => left,
        BinaryOp::Div if left.is_number(0.0) && !right.is_number(0.0) => left,
        BinaryOp::Pow if right.is_number(0.0) => Expression::Int(1),
        BinaryOp::Pow if left.is_number(1.0) => Expression::Int(1),
        BinaryOp::And if left.as_bool() == Some(true) => right,
        BinaryOp::And if right.as_bool() == Some(true) => left,
        BinaryOp::Or if left.as_bool() == Some(false) => right,
        BinaryOp::Or if right.as_bool() == Some(false) => left,
        _ => Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        },
    }
}

// === Свёртка констант ===

/// Свернуть операцию над двумя числовыми литералами.
///
/// `None`, если результат не представим: переполнение, деление на ноль,
/// бесконечность или NaN.
fn fold(op: BinaryOp, left: &Expression, right: &Expression) -> Option<Expression> {
    match (left, right) {
        (Expression::Int(a), Expression::Int(b)) => fold_int(op, *a, *b),
        _ => fold_double(op, left.as_number()?, right.as_number()?),
    }
}

fn fold_int(op: BinaryOp, a: i64, b: i64) -> Option<Expression> {
    match op {
        BinaryOp::Add => a.checked_add(b).map(Expression::Int),
        BinaryOp::Sub => a.checked_sub(b).map(Expression::Int),
        BinaryOp::Mul => a.checked_mul(b).map(Expression::Int),
        BinaryOp::Div => {
            if b == 0 {
                None
            } else if a.checked_rem(b)? == 0 {
                a.checked_div(b).map(Expression::Int)
            } else {
                finite(a as f64 / b as f64)
            }
        }
        BinaryOp::Pow => {
            if b >= 0 {
                let exponent = u32::try_from(b).ok()?;
                a.checked_pow(exponent).map(Expression::Int)
            } else {
                finite((a as f64).powf(b as f64))
            }
        }
        _ => fold_double(op, a as f64, b as f64),
    }
}

fn fold_double(op: BinaryOp, a: f64, b: f64) -> Option<Expression> {
    match op {
        BinaryOp::Add => finite(a + b),
        BinaryOp::Sub => finite(a - b),
        BinaryOp::Mul => finite(a * b),
        BinaryOp::Div if b == 0.0 => None,
        BinaryOp::Div => finite(a / b),
        BinaryOp::Pow => finite(a.powf(b)),
        BinaryOp::Lt => Some(Expression::Bool(a < b)),
        BinaryOp::Le => Some(Expression::Bool(a <= b)),
        BinaryOp::Eq => Some(Expression::Bool(a == b)),
        BinaryOp::Ne => Some(Expression::Bool(a != b)),
        BinaryOp::Ge => Some(Expression::Bool(a >= b)),
        BinaryOp::Gt => Some(Expression::Bool(a > b)),
        BinaryOp::And | BinaryOp::Or => None,
    }
}

fn finite(value: f64) -> Option<Expression> {
    value.is_finite().then_some(Expression::Double(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;

    fn optimized(source: &str) -> Program {
        optimize(analyze(source).unwrap())
    }

    fn statements(source: &str) -> Vec<Statement> {
        optimized(source).statements
    }

    fn printed(source: &str) -> Expression {
        match statements(source).pop() {
            Some(Statement::Print(e)) => e,
            other => panic!("Expected print, got {:?}", other),
        }
    }

    #[test]
    fn test_constant_folding() {
        assert_eq!(printed("print(5 + 8)"), Expression::Int(13));
        assert_eq!(printed("print(5 ^ 8)"), Expression::Int(390625));
        assert_eq!(printed("print(5 < 8)"), Expression::Bool(true));
        assert_eq!(printed("print(8 / 2)"), Expression::Int(4));
        assert_eq!(printed("print(7 / 2)"), Expression::Double(3.5));
        assert_eq!(printed("print(2 ^ -1)"), Expression::Double(0.5));
        assert_eq!(printed("print(1.5 * 2)"), Expression::Double(3.0));
        assert_eq!(printed("print(2 == 2.0)"), Expression::Bool(true));
        assert_eq!(printed("print((1 + 2) * (3 + 4))"), Expression::Int(21));
    }

    #[test]
    fn test_unfoldable_constants_stay() {
        assert!(matches!(
            printed("print(1 / 0)"),
            Expression::Binary { op: BinaryOp::Div, .. }
        ));
        assert!(matches!(
            printed("print(9223372036854775807 + 1)"),
            Expression::Binary { op: BinaryOp::Add, .. }
        ));
        assert!(matches!(
            printed("print(10.0 ^ 400)"),
            Expression::Binary { op: BinaryOp::Pow, .. }
        ));
    }

    #[test]
    fn test_identity_applies_when_fold_fails() {
        assert_eq!(printed("print(1 ^ 5000000000)"), Expression::Int(1));
        assert!(matches!(
            printed("print(0 / 0)"),
            Expression::Binary { op: BinaryOp::Div, .. }
        ));
    }

    #[test]
    fn test_negation_folding() {
        assert_eq!(printed("print(-5)"), Expression::Int(-5));
        assert_eq!(printed("print(-(2.5))"), Expression::Double(-2.5));
        assert_eq!(printed("print(-(3 - 1))"), Expression::Int(-2));
    }

    #[test]
    fn test_identities() {
        assert_eq!(
            optimized("int x = 1\n print(x * 0)"),
            analyze("int x = 1\n print(0)").unwrap()
        );
        assert_eq!(
            optimized("int x = 1\n print(0 - x)"),
            analyze("int x = 1\n print(-x)").unwrap()
        );
        for source in ["x + 0", "0 + x", "x - 0", "x * 1", "1 * x", "x / 1"] {
            assert_eq!(
                optimized(&format!("int x = 1\n print({})", source)),
                analyze("int x = 1\n print(x)").unwrap(),
                "{}",
                source
            );
        }
        assert_eq!(
            optimized("int x = 1\n print(x ^ 0)\n print(1 ^ x)\n print(0 / x)"),
            analyze("int x = 1\n print(1)\n print(1)\n print(0)").unwrap()
        );
    }

    #[test]
    fn test_short_circuit() {
        for source in ["true && b", "b && true", "false || b", "b || false"] {
            assert_eq!(
                optimized(&format!("bool b = false\n print({})", source)),
                analyze("bool b = false\n print(b)").unwrap(),
                "{}",
                source
            );
        }
        assert_eq!(printed("print(true && false)"), Expression::Bool(false));
    }

    #[test]
    fn test_ternary_with_constant_test() {
        assert_eq!(printed("print(true ? 1 : 2)"), Expression::Int(1));
        assert_eq!(printed("print(1 > 2 ? 1 : 2)"), Expression::Int(2));
    }

    #[test]
    fn test_dead_loops_removed() {
        assert!(statements("while false {\n print(1)\n}").is_empty());
        assert!(statements("for v in [] {\n print(v)\n}").is_empty());
        assert_eq!(statements("for v in [1] {\n print(v)\n}").len(), 1);
    }

    #[test]
    fn test_self_assignment_removed() {
        assert_eq!(
            statements("int x = 1\n x = x"),
            analyze("int x = 1").unwrap().statements
        );
        assert_eq!(statements("int x = 1\n x += x").len(), 2);
    }

    #[test]
    fn test_if_pruning() {
        assert_eq!(
            optimized("if true {\n print(1)\n} else {\n print(2)\n}"),
            analyze("print(1)").unwrap()
        );
        assert!(statements("if false {\n print(1)\n}").is_empty());
        assert_eq!(
            optimized("int x = 1\n if false {\n print(1)\n} else if x > 1 {\n print(2)\n} else {\n print(3)\n}"),
            analyze("int x = 1\n if x > 1 {\n print(2)\n} else {\n print(3)\n}").unwrap()
        );
        assert_eq!(
            optimized("int x = 1\n if x > 1 {\n print(1)\n} else if 1 < 2 {\n print(2)\n} else if x > 5 {\n print(3)\n}"),
            analyze("int x = 1\n if x > 1 {\n print(1)\n} else {\n print(2)\n}").unwrap()
        );
    }

    #[test]
    fn test_optimizes_inside_bodies() {
        let program = optimized("func f(a: int) -> int {\n return a * 1 + (2 + 3)\n}");
        match &program.statements[0] {
            Statement::FunctionDeclaration { body, .. } => match &body[0] {
                Statement::Return(Some(Expression::Binary { op, right, ty, .. })) => {
                    assert_eq!(*op, BinaryOp::Add);
                    assert_eq!(**right, Expression::Int(5));
                    assert_eq!(*ty, Type::Int);
                }
                other => panic!("Expected return, got {:?}", other),
            },
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_idempotent() {
        let sources = [
            "int x = 3\n x += 1\n bool y = true\n print((y && y) || x != 5)",
            "int x = 1\n print(0 - x * 1 + 0)\n print(-(-3))",
            "int x = 1\n if false {\n print(1)\n} else if true {\n print(x)\n}",
            "array[int] xs = [1 + 1, 2 * 0]\n for v in xs {\n print(v ^ 1)\n}",
            "int x = 2\n print(true ? x / 1 : 0)\n while 1 > 2 {\n x = x\n}",
        ];
        for source in sources {
            let once = optimized(source);
            let twice = optimize(once.clone());
            assert_eq!(once, twice, "{}", source);
        }
    }
}
