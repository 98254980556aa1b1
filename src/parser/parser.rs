//! Парсер IcedCoffee: рекурсивный спуск по токенам лексера.

use super::error::ParseError;
use super::lexer::Lexer;
use super::token::{Keyword, Span, Spanned, Token};
use super::tree::{Block, CallSyntax, ElseIf, Expr, ExprKind, Ident, Param, Stmt};
use crate::ops::{AssignOp, BinaryOp, UnaryOp};
use crate::types::Type;

const ASSIGNMENT: [&str; 5] = ["=", "+=", "-=", "*=", "/="];

/// Парсер программы.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    /// Span последнего поглощённого токена.
    prev_span: Span,
}

impl<'a> Parser<'a> {
    /// Создать новый парсер.
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            prev_span: Span::default(),
        }
    }

    /// Распарсить всю программу.
    pub fn parse_program(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();

        loop {
            let token = self.lexer.peek_token()?;
            if matches!(token.value, Token::Eof) {
                break;
            }
            statements.push(self.parse_statement()?);
        }

        Ok(statements)
    }

    // === Инструкции ===

    /// Распарсить одну инструкцию.
    pub fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let token = self.lexer.peek_token()?.clone();

        match &token.value {
            Token::Keyword(k) if k.is_type_name() => self.parse_var_decl(),
            Token::Keyword(Keyword::Func) => self.parse_fun_decl(),
            Token::Keyword(Keyword::Print) => self.parse_print(),
            Token::Keyword(Keyword::If) => self.parse_if(),
            Token::Keyword(Keyword::While) => self.parse_while(),
            Token::Keyword(Keyword::For) => self.parse_for(),
            Token::Keyword(Keyword::Return) => self.parse_return(),
            Token::Ident(_) => self.parse_assign_or_call(),
            other => Err(ParseError::unexpected_token(token.span, "a statement", other)),
        }
    }

    /// `type id = expr`
    fn parse_var_decl(&mut self) -> Result<Stmt, ParseError> {
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        self.expect_symbol("=")?;
        let initializer = self.parse_expression()?;
        Ok(Stmt::VarDecl {
            ty,
            name,
            initializer,
        })
    }

    /// `func id(params) -> type { body }`
    fn parse_fun_decl(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::Func)?;
        let name = self.expect_ident()?;
        self.expect(Token::LParen)?;

        let mut params = Vec::new();
        if !self.peek_is(&Token::RParen)? {
            loop {
                let param_name = self.expect_ident()?;
                let ty = if self.eat(&Token::Colon)? {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                params.push(Param {
                    name: param_name,
                    ty,
                });
                if !self.eat(&Token::Comma)? {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        self.expect(Token::Arrow)?;
        let return_type = self.parse_type()?;
        let body = self.parse_block()?;

        Ok(Stmt::FunDecl {
            name,
            params,
            return_type,
            body,
        })
    }

    /// `print(expr)`
    fn parse_print(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect_keyword(Keyword::Print)?;
        self.expect(Token::LParen)?;
        let argument = self.parse_expression()?;
        let end = self.expect(Token::RParen)?;
        Ok(Stmt::Print {
            argument,
            span: start.merge(end),
        })
    }

    /// `if expr { } (else if expr { })* (else { })?`
    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect_keyword(Keyword::If)?;
        let test = self.parse_expression()?;
        let consequent = self.parse_block()?;
        let mut else_ifs = Vec::new();
        let mut alternate = None;

        while self.eat_keyword(Keyword::Else)? {
            if self.eat_keyword(Keyword::If)? {
                let test = self.parse_expression()?;
                let body = self.parse_block()?;
                else_ifs.push(ElseIf { test, body });
            } else {
                alternate = Some(self.parse_block()?);
                break;
            }
        }

        Ok(Stmt::If {
            test,
            consequent,
            else_ifs,
            alternate,
            span: start.merge(self.prev_span),
        })
    }

    /// `while expr { }`
    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect_keyword(Keyword::While)?;
        let test = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::While {
            test,
            body,
            span: start.merge(self.prev_span),
        })
    }

    /// `for id in expr { }`
    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect_keyword(Keyword::For)?;
        let iterator = self.expect_ident()?;
        self.expect_keyword(Keyword::In)?;
        let collection = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::For {
            iterator,
            collection,
            body,
            span: start.merge(self.prev_span),
        })
    }

    /// `return` или `return expr`.
    ///
    /// Значение относится к return только если начинается на той же строке.
    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect_keyword(Keyword::Return)?;
        let next = self.lexer.peek_token()?.clone();

        let value = if starts_expression(&next.value) && !self.newline_between(start, next.span) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(Stmt::Return {
            value,
            span: start.merge(self.prev_span),
        })
    }

    /// `id op= expr` или `id(args)`.
    fn parse_assign_or_call(&mut self) -> Result<Stmt, ParseError> {
        let target = self.expect_ident()?;
        let next = self.lexer.peek_token()?.clone();

        if next.value == Token::LParen {
            return Ok(Stmt::Call(self.parse_call(target)?));
        }

        let op = match &next.value {
            Token::Symbol(s) if ASSIGNMENT.contains(s) => AssignOp::from_symbol(s),
            _ => None,
        };
        let Some(op) = op else {
            return Err(ParseError::unexpected_token(
                next.span,
                "an assignment operator or '('",
                &next.value,
            ));
        };
        self.advance()?;
        let value = self.parse_expression()?;

        Ok(Stmt::Assign {
            target,
            op: Spanned::new(op, next.span),
            value,
        })
    }

    /// `{ statement* }`
    fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.expect(Token::LBrace)?;
        let mut statements = Vec::new();

        loop {
            let token = self.lexer.peek_token()?;
            match token.value {
                Token::RBrace => {
                    self.advance()?;
                    return Ok(statements);
                }
                Token::Eof => {
                    return Err(ParseError::unexpected_eof(token.span, "expected '}'"));
                }
                _ => statements.push(self.parse_statement()?),
            }
        }
    }

    /// `int | double | bool | string | void | array[type]`
    fn parse_type(&mut self) -> Result<Spanned<Type>, ParseError> {
        let token = self.advance()?;
        let ty = match token.value {
            Token::Keyword(Keyword::Int) => Type::Int,
            Token::Keyword(Keyword::Double) => Type::Double,
            Token::Keyword(Keyword::Bool) => Type::Bool,
            Token::Keyword(Keyword::String) => Type::String,
            Token::Keyword(Keyword::Void) => Type::Void,
            Token::Keyword(Keyword::Array) => {
                self.expect(Token::LBracket)?;
                let base = self.parse_type()?;
                let end = self.expect(Token::RBracket)?;
                return Ok(Spanned::new(Type::array(base.value), token.span.merge(end)));
            }
            other => return Err(ParseError::unexpected_token(token.span, "a type", &other)),
        };
        Ok(Spanned::new(ty, token.span))
    }

    // === Выражения ===

    /// `Exp1 ("?" Exp1 ":" Exp)?`
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let test = self.parse_or()?;
        if !self.eat(&Token::Question)? {
            return Ok(test);
        }
        let consequent = self.parse_or()?;
        self.expect(Token::Colon)?;
        let alternate = self.parse_expression()?;
        let span = test.span.merge(alternate.span);
        Ok(Spanned::new(
            ExprKind::Ternary {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        ))
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat_symbol("||")? {
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        while self.eat_symbol("&&")? {
            let right = self.parse_relational()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    /// Сравнения не ассоциативны: `a < b < c` является синтаксической ошибкой.
    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;
        let op = match &self.lexer.peek_token()?.value {
            Token::Symbol(s) => BinaryOp::from_symbol(s).filter(BinaryOp::is_relational),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(left);
        };
        self.advance()?;
        let right = self.parse_additive()?;
        Ok(binary(op, left, right))
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match &self.lexer.peek_token()?.value {
                Token::Symbol("+") => BinaryOp::Add,
                Token::Symbol("-") => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match &self.lexer.peek_token()?.value {
                Token::Symbol("*") => BinaryOp::Mul,
                Token::Symbol("/") => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    /// `("-" | "!") unary | power`
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        // Глубоко вложенные выражения не должны переполнять стек
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
            let token = self.lexer.peek_token()?.clone();
            let op = match &token.value {
                Token::Symbol(s) => UnaryOp::from_symbol(s),
                _ => None,
            };
            let Some(op) = op else {
                return self.parse_power();
            };
            self.advance()?;
            let operand = self.parse_unary()?;
            let span = token.span.merge(operand.span);
            Ok(Spanned::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ))
        })
    }

    /// `postfix ("^" unary)?`, правоассоциативно.
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;
        if !self.eat_symbol("^")? {
            return Ok(base);
        }
        let exponent = self.parse_unary()?;
        Ok(binary(BinaryOp::Pow, base, exponent))
    }

    /// `primary ("[" expr "]")*`
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        while self.eat(&Token::LBracket)? {
            let index = self.parse_expression()?;
            let end = self.expect(Token::RBracket)?;
            let span = expr.span.merge(end);
            expr = Spanned::new(
                ExprKind::Index {
                    array: Box::new(expr),
                    index: Box::new(index),
                },
                span,
            );
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance()?;
        let span = token.span;

        let kind = match token.value {
            Token::Int(n) => ExprKind::Int(n),
            Token::Double(f) => ExprKind::Double(f),
            Token::String(s) => ExprKind::Str(s),
            Token::Keyword(Keyword::True) => ExprKind::Bool(true),
            Token::Keyword(Keyword::False) => ExprKind::Bool(false),
            Token::Ident(name) => {
                let ident = Spanned::new(name, span);
                if self.peek_is(&Token::LParen)? {
                    let call = self.parse_call(ident)?;
                    return Ok(Spanned::new(ExprKind::Call(call), span.merge(self.prev_span)));
                }
                ExprKind::Ident(ident.value)
            }
            Token::LParen => {
                let inner = self.parse_expression()?;
                self.expect(Token::RParen)?;
                return Ok(inner);
            }
            Token::LBracket => {
                let elements = self.parse_list(Token::RBracket)?;
                return Ok(Spanned::new(ExprKind::Array(elements), span.merge(self.prev_span)));
            }
            other => return Err(ParseError::unexpected_token(span, "an expression", &other)),
        };

        Ok(Spanned::new(kind, span))
    }

    /// `callee "(" args ")"`, callee уже прочитан.
    fn parse_call(&mut self, callee: Ident) -> Result<CallSyntax, ParseError> {
        let open_paren = self.expect(Token::LParen)?;
        let args = self.parse_list(Token::RParen)?;
        Ok(CallSyntax {
            callee,
            args,
            open_paren,
        })
    }

    /// Список выражений через запятую до закрывающего токена включительно.
    fn parse_list(&mut self, close: Token) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if self.eat(&close)? {
            return Ok(items);
        }
        loop {
            items.push(self.parse_expression()?);
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    // === Вспомогательные методы ===

    fn advance(&mut self) -> Result<Spanned<Token>, ParseError> {
        let token = self.lexer.next_token()?;
        self.prev_span = token.span;
        Ok(token)
    }

    fn peek_is(&mut self, expected: &Token) -> Result<bool, ParseError> {
        Ok(&self.lexer.peek_token()?.value == expected)
    }

    /// Поглотить токен, если он совпадает.
    fn eat(&mut self, expected: &Token) -> Result<bool, ParseError> {
        if self.peek_is(expected)? {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn eat_symbol(&mut self, symbol: &str) -> Result<bool, ParseError> {
        if self.lexer.peek_token()?.value.is_symbol(symbol) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> Result<bool, ParseError> {
        if self.lexer.peek_token()?.value.is_keyword(keyword) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect(&mut self, expected: Token) -> Result<Span, ParseError> {
        let token = self.advance()?;
        if token.value == expected {
            Ok(token.span)
        } else {
            Err(ParseError::unexpected_token(
                token.span,
                expected.to_string(),
                &token.value,
            ))
        }
    }

    fn expect_symbol(&mut self, symbol: &'static str) -> Result<Span, ParseError> {
        self.expect(Token::Symbol(symbol))
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<Span, ParseError> {
        self.expect(Token::Keyword(keyword))
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        let token = self.advance()?;
        match token.value {
            Token::Ident(name) => Ok(Spanned::new(name, token.span)),
            other => Err(ParseError::unexpected_token(
                token.span,
                "an identifier",
                &other,
            )),
        }
    }

    fn newline_between(&self, before: Span, after: Span) -> bool {
        self.lexer
            .source()
            .get(before.end..after.start)
            .is_some_and(|gap| gap.contains('\n'))
    }
}

/// Может ли токен начинать выражение.
fn starts_expression(token: &Token) -> bool {
    matches!(
        token,
        Token::Int(_)
            | Token::Double(_)
            | Token::String(_)
            | Token::Ident(_)
            | Token::LParen
            | Token::LBracket
            | Token::Keyword(Keyword::True)
            | Token::Keyword(Keyword::False)
            | Token::Symbol("-")
            | Token::Symbol("!")
    )
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Spanned::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::token::Position;

    fn parse(source: &str) -> Vec<Stmt> {
        Parser::new(source).parse_program().unwrap()
    }

    fn parse_expr(source: &str) -> ExprKind {
        Parser::new(source).parse_expression().unwrap().value
    }

    /// Позиция синтаксической ошибки в виде (строка, колонка).
    fn error_at(source: &str) -> (usize, usize) {
        let err = Parser::new(source).parse_program().unwrap_err();
        let p = Position::locate(source, err.span().start);
        (p.line, p.column)
    }

    #[test]
    fn test_parse_declaration() {
        let program = parse("array[int] x = [1, 2, 3]");
        match &program[0] {
            Stmt::VarDecl {
                ty,
                name,
                initializer,
            } => {
                assert_eq!(ty.value, Type::array(Type::Int));
                assert_eq!(name.value, "x");
                assert!(matches!(&initializer.value, ExprKind::Array(items) if items.len() == 3));
            }
            other => panic!("Expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_precedence() {
        // 1 + 2 * 3 == (1 + (2 * 3))
        match parse_expr("1 + 2 * 3") {
            ExprKind::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(right.value, ExprKind::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("Expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_power_is_right_associative() {
        match parse_expr("2 ^ 3 ^ 2") {
            ExprKind::Binary { op, left, right } => {
                assert_eq!(op, BinaryOp::Pow);
                assert_eq!(left.value, ExprKind::Int(2));
                assert!(matches!(right.value, ExprKind::Binary { op: BinaryOp::Pow, .. }));
            }
            other => panic!("Expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unary_binds_looser_than_power() {
        match parse_expr("-2 ^ 2") {
            ExprKind::Unary { op, operand } => {
                assert_eq!(op, UnaryOp::Neg);
                assert!(matches!(operand.value, ExprKind::Binary { op: BinaryOp::Pow, .. }));
            }
            other => panic!("Expected unary, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_ternary() {
        assert!(matches!(parse_expr("x > y ? x : y"), ExprKind::Ternary { .. }));
    }

    #[test]
    fn test_parse_if_chain() {
        let program = parse("if x == 1 {\n} else if x == 2 {\n print(2)\n} else {\n print(3)\n}");
        match &program[0] {
            Stmt::If {
                else_ifs, alternate, ..
            } => {
                assert_eq!(else_ifs.len(), 1);
                assert_eq!(else_ifs[0].body.len(), 1);
                assert_eq!(alternate.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("Expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_with_typed_param() {
        let program = parse("func f(a, b: bool) -> void {\n return\n}");
        match &program[0] {
            Stmt::FunDecl {
                params,
                return_type,
                body,
                ..
            } => {
                assert_eq!(params.len(), 2);
                assert!(params[0].ty.is_none());
                assert_eq!(params[1].ty.as_ref().map(|t| &t.value), Some(&Type::Bool));
                assert_eq!(return_type.value, Type::Void);
                assert!(matches!(body[0], Stmt::Return { value: None, .. }));
            }
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_return_value_on_same_line_only() {
        let program = parse("func f() -> int {\n return x\n}");
        match &program[0] {
            Stmt::FunDecl { body, .. } => {
                assert!(matches!(body[0], Stmt::Return { value: Some(_), .. }));
            }
            other => panic!("Expected function, got {:?}", other),
        }

        let program = parse("func g() -> void {\n return\n x = 1\n}");
        match &program[0] {
            Stmt::FunDecl { body, .. } => {
                assert_eq!(body.len(), 2);
                assert!(matches!(body[0], Stmt::Return { value: None, .. }));
            }
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_call_statement_and_index() {
        let program = parse("f(a[1], 2)\nx -= 1");
        assert!(matches!(&program[0], Stmt::Call(call) if call.args.len() == 2));
        assert!(matches!(
            &program[1],
            Stmt::Assign { op, .. } if op.value == AssignOp::SubAssign
        ));
    }

    #[test]
    fn test_parse_accepts_grammar_samples() {
        for source in [
            "print(8 * 89.123)",
            "print(83 * ((((-((((13 / 21)))))))) + 1 - 0)",
            "print (-3) \n print (!false)",
            "print(x && y || z * 1 / 2 ^ 3 + 4 < 5)",
            "int x = (!3) * 2 + 4 - (-7.3) * 8 ^ 13 / 1",
            "int x = 1<(2<=(3==(4!=(5 >= (6>7)))))",
            "bool x = true && false || (!false)",
            "print(0) ## yay",
            "print(1) ###\nprint(0)###",
            "コンパイラ = 100",
        ] {
            assert!(
                Parser::new(source).parse_program().is_ok(),
                "failed to parse {:?}",
                source
            );
        }
    }

    #[test]
    fn test_parse_error_positions() {
        assert_eq!(error_at("ab😭c = 2"), (1, 3));
        assert_eq!(error_at("x= 2."), (1, 5));
        assert_eq!(error_at("print(5 -"), (1, 10));
        assert_eq!(error_at("print(7 * ((2 _ 3)"), (1, 15));
        assert_eq!(error_at("x = );"), (1, 5));
        assert_eq!(error_at("x * 5;"), (1, 3));
        assert_eq!(error_at("x = * 71;"), (1, 5));
    }

    #[test]
    fn test_parse_relational_is_not_associative() {
        assert_eq!(error_at("bool b = 1 < 2 < 3"), (1, 16));
    }

    #[test]
    fn test_parse_unclosed_block() {
        let err = Parser::new("while true {\n print(1)").parse_program().unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }
}
