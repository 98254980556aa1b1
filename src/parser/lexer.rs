//! Лексер для синтаксиса IcedCoffee.

use logos::Logos;

use super::error::ParseError;
use super::token::{Keyword, Span, Spanned, Token};

/// Внутренние токены для logos.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")] // Пропускаем пробелы и переводы строк
#[logos(skip r"##[^\n]*")] // Пропускаем комментарии ## до конца строки
enum LogosToken {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("->")]
    Arrow,

    // Ключевые слова (token приоритетнее regex идентификатора)
    #[token("int")]
    Int,
    #[token("double")]
    Double,
    #[token("bool")]
    Bool,
    #[token("string")]
    String,
    #[token("void")]
    Void,
    #[token("array")]
    Array,
    #[token("func")]
    Func,
    #[token("return")]
    Return,
    #[token("print")]
    Print,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // Double: дробная часть и/или экспонента
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", parse_double)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", parse_double)]
    DoubleLit(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntLit(i64),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len() - 1])
    })]
    StringLit(String),

    // Операторы (многосимвольные выигрывают по длине)
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,
    #[token("=")]
    Assign,

    #[regex(r"[\p{L}_][\p{L}\p{N}_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

fn parse_double(lex: &mut logos::Lexer<LogosToken>) -> Option<f64> {
    lex.slice().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Обработка escape-последовательностей в строке.
///
/// Неизвестная последовательность делает литерал ошибочным.
fn unescape_string(s: &str) -> Option<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next()? {
                'n' => result.push('\n'),
                't' => result.push('\t'),
                'r' => result.push('\r'),
                '\\' => result.push('\\'),
                '"' => result.push('"'),
                '0' => result.push('\0'),
                _ => return None,
            }
        } else {
            result.push(c);
        }
    }

    Some(result)
}

/// Лексер IcedCoffee.
pub struct Lexer<'a> {
    logos: logos::Lexer<'a, LogosToken>,
    source: &'a str,
    peeked: Option<Spanned<Token>>,
}

impl<'a> Lexer<'a> {
    /// Создать новый лексер.
    pub fn new(source: &'a str) -> Self {
        Self {
            logos: LogosToken::lexer(source),
            source,
            peeked: None,
        }
    }

    /// Получить следующий токен.
    pub fn next_token(&mut self) -> Result<Spanned<Token>, ParseError> {
        if let Some(token) = self.peeked.take() {
            return Ok(token);
        }

        self.read_token()
    }

    /// Посмотреть на следующий токен без его потребления.
    pub fn peek_token(&mut self) -> Result<&Spanned<Token>, ParseError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.read_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    /// Исходный текст, который разбирает лексер.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Прочитать токен из logos.
    fn read_token(&mut self) -> Result<Spanned<Token>, ParseError> {
        match self.logos.next() {
            Some(Ok(logos_token)) => {
                let span = Span::new(self.logos.span().start, self.logos.span().end);
                Ok(Spanned::new(convert_token(logos_token), span))
            }
            Some(Err(())) => {
                let span = Span::new(self.logos.span().start, self.logos.span().end);
                let text = self.logos.slice();
                // Литерал распознан, но callback его отверг
                if text.starts_with(|c: char| c.is_ascii_digit()) {
                    return Err(ParseError::InvalidLiteral {
                        span,
                        message: format!("number {} is out of range", text),
                    });
                }
                if text.len() > 1 && text.starts_with('"') && text.ends_with('"') {
                    return Err(ParseError::InvalidLiteral {
                        span,
                        message: format!("bad escape sequence in {}", text),
                    });
                }
                Err(ParseError::LexerError {
                    span,
                    text: text.to_string(),
                })
            }
            None => {
                let pos = self.source.len();
                Ok(Spanned::new(Token::Eof, Span::new(pos, pos)))
            }
        }
    }
}

/// Конвертировать внутренний токен logos в публичный Token.
fn convert_token(logos_token: LogosToken) -> Token {
    match logos_token {
        LogosToken::LParen => Token::LParen,
        LogosToken::RParen => Token::RParen,
        LogosToken::LBrace => Token::LBrace,
        LogosToken::RBrace => Token::RBrace,
        LogosToken::LBracket => Token::LBracket,
        LogosToken::RBracket => Token::RBracket,
        LogosToken::Comma => Token::Comma,
        LogosToken::Colon => Token::Colon,
        LogosToken::Question => Token::Question,
        LogosToken::Arrow => Token::Arrow,
        // Ключевые слова
        LogosToken::Int => Token::Keyword(Keyword::Int),
        LogosToken::Double => Token::Keyword(Keyword::Double),
        LogosToken::Bool => Token::Keyword(Keyword::Bool),
        LogosToken::String => Token::Keyword(Keyword::String),
        LogosToken::Void => Token::Keyword(Keyword::Void),
        LogosToken::Array => Token::Keyword(Keyword::Array),
        LogosToken::Func => Token::Keyword(Keyword::Func),
        LogosToken::Return => Token::Keyword(Keyword::Return),
        LogosToken::Print => Token::Keyword(Keyword::Print),
        LogosToken::If => Token::Keyword(Keyword::If),
        LogosToken::Else => Token::Keyword(Keyword::Else),
        LogosToken::While => Token::Keyword(Keyword::While),
        LogosToken::For => Token::Keyword(Keyword::For),
        LogosToken::In => Token::Keyword(Keyword::In),
        LogosToken::True => Token::Keyword(Keyword::True),
        LogosToken::False => Token::Keyword(Keyword::False),
        // Литералы
        LogosToken::DoubleLit(f) => Token::Double(f),
        LogosToken::IntLit(n) => Token::Int(n),
        LogosToken::StringLit(s) => Token::String(s),
        LogosToken::Ident(s) => Token::Ident(s),
        // Операторы
        LogosToken::Le => Token::Symbol("<="),
        LogosToken::Ge => Token::Symbol(">="),
        LogosToken::EqEq => Token::Symbol("=="),
        LogosToken::Ne => Token::Symbol("!="),
        LogosToken::And => Token::Symbol("&&"),
        LogosToken::Or => Token::Symbol("||"),
        LogosToken::PlusAssign => Token::Symbol("+="),
        LogosToken::MinusAssign => Token::Symbol("-="),
        LogosToken::StarAssign => Token::Symbol("*="),
        LogosToken::SlashAssign => Token::Symbol("/="),
        LogosToken::Plus => Token::Symbol("+"),
        LogosToken::Minus => Token::Symbol("-"),
        LogosToken::Star => Token::Symbol("*"),
        LogosToken::Slash => Token::Symbol("/"),
        LogosToken::Caret => Token::Symbol("^"),
        LogosToken::Lt => Token::Symbol("<"),
        LogosToken::Gt => Token::Symbol(">"),
        LogosToken::Bang => Token::Symbol("!"),
        LogosToken::Assign => Token::Symbol("="),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut result = Vec::new();
        loop {
            let token = lexer.next_token().unwrap().value;
            if token == Token::Eof {
                break;
            }
            result.push(token);
        }
        result
    }

    #[test]
    fn test_lexer_declaration() {
        assert_eq!(
            tokens("int x = 3"),
            vec![
                Token::Keyword(Keyword::Int),
                Token::Ident("x".to_string()),
                Token::Symbol("="),
                Token::Int(3),
            ]
        );
    }

    #[test]
    fn test_lexer_numbers() {
        assert_eq!(
            tokens("8 89.123 1e3"),
            vec![Token::Int(8), Token::Double(89.123), Token::Double(1000.0)]
        );
    }

    #[test]
    fn test_lexer_compound_operators() {
        assert_eq!(
            tokens("x += 1 -> != <="),
            vec![
                Token::Ident("x".to_string()),
                Token::Symbol("+="),
                Token::Int(1),
                Token::Arrow,
                Token::Symbol("!="),
                Token::Symbol("<="),
            ]
        );
    }

    #[test]
    fn test_lexer_keyword_prefix_is_identifier() {
        assert_eq!(
            tokens("integer in"),
            vec![Token::Ident("integer".to_string()), Token::Keyword(Keyword::In)]
        );
    }

    #[test]
    fn test_lexer_comments() {
        assert_eq!(tokens("print(0) ## yay"), tokens("print(0)"));
        assert_eq!(tokens("###\n42###").len(), 1);
    }

    #[test]
    fn test_lexer_string_escapes() {
        assert_eq!(
            tokens(r#""say \"hi\"\n""#),
            vec![Token::String("say \"hi\"\n".to_string())]
        );
    }

    #[test]
    fn test_lexer_unicode_identifier() {
        assert_eq!(
            tokens("コンパイラ"),
            vec![Token::Ident("コンパイラ".to_string())]
        );
    }

    #[test]
    fn test_lexer_rejects_emoji() {
        let mut lexer = Lexer::new("ab😭c");
        assert!(lexer.next_token().is_ok());
        match lexer.next_token() {
            Err(ParseError::LexerError { span, .. }) => assert_eq!(span.start, 2),
            other => panic!("Expected lexer error, got {:?}", other),
        }
    }

    #[test]
    fn test_lexer_rejects_out_of_range_int() {
        let mut lexer = Lexer::new("99999999999999999999");
        match lexer.next_token() {
            Err(ParseError::InvalidLiteral { message, .. }) => {
                assert!(message.contains("out of range"), "{}", message)
            }
            other => panic!("Expected invalid literal, got {:?}", other),
        }
    }

    #[test]
    fn test_lexer_peek_does_not_consume() {
        let mut lexer = Lexer::new("a b");
        assert_eq!(lexer.peek_token().unwrap().value, Token::Ident("a".to_string()));
        assert_eq!(lexer.next_token().unwrap().value, Token::Ident("a".to_string()));
        assert_eq!(lexer.next_token().unwrap().value, Token::Ident("b".to_string()));
    }
}
