use std::str::FromStr;

use crate::{
    diagnostics::ParseError,
    lexer::{Lexer, Token, TokenKind},
    value::Value,
};

/// Parses the first value in `source`; empty input yields Unit.
pub fn parse(source: &str) -> Result<Value, ParseError> {
    Parser::new(Lexer::new(source)).parse()
}

/// Parses every top-level value in `source`.
pub fn parse_all(source: &str) -> Result<Vec<Value>, ParseError> {
    Parser::new(Lexer::new(source)).parse_all()
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self { lexer }
    }

    pub fn parse(&mut self) -> Result<Value, ParseError> {
        let token = self.lexer.next_token();
        match token.kind {
            TokenKind::LeftParen => self.parse_list(token),
            TokenKind::RightParen => Err(ParseError::UnexpectedClose {
                position: token.position,
            }),
            TokenKind::Quote => Ok(Value::quote(self.parse()?)),
            TokenKind::Symbol => Ok(Value::atom(token.lexeme)),
            TokenKind::Integer => parse_number(&token).map(Value::int),
            TokenKind::Float => parse_number(&token).map(Value::float),
            TokenKind::String => Ok(Value::string(token.lexeme)),
            TokenKind::Invalid(source) => Err(ParseError::InvalidToken {
                source,
                position: token.position,
            }),
            TokenKind::Eof => Ok(Value::unit()),
        }
    }

    pub fn parse_all(&mut self) -> Result<Vec<Value>, ParseError> {
        let mut values = Vec::new();
        while self.lexer.peek().kind != TokenKind::Eof {
            values.push(self.parse()?);
        }
        Ok(values)
    }

    fn parse_list(&mut self, open: Token<'a>) -> Result<Value, ParseError> {
        let mut items = Vec::new();
        loop {
            let next = self.lexer.peek();
            match next.kind {
                TokenKind::RightParen => {
                    self.lexer.next_token();
                    return Ok(Value::list(items));
                }
                TokenKind::Eof => {
                    return Err(ParseError::UnterminatedList {
                        position: open.position,
                    });
                }
                TokenKind::Invalid(source) => {
                    return Err(ParseError::InvalidToken {
                        source,
                        position: next.position,
                    });
                }
                _ => items.push(self.parse()?),
            }
        }
    }
}

fn parse_number<T: FromStr>(token: &Token<'_>) -> Result<T, ParseError> {
    token
        .lexeme
        .parse()
        .map_err(|_| ParseError::MalformedLiteral {
            lexeme: token.lexeme.to_string(),
            position: token.position,
        })
}
