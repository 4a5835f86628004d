use std::fmt;

use crate::{diagnostics::LexError, position::Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    Quote,
    Symbol,
    Integer,
    Float,
    String,
    Eof,
    Invalid(LexError),
}

/// A lexed token. The lexeme borrows from the source; for strings it excludes
/// the surrounding quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub position: Position,
    pub lexeme: &'a str,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Symbol | TokenKind::Integer | TokenKind::Float | TokenKind::String => {
                write!(f, "{:?} {} '{}'", self.kind, self.position, self.lexeme)
            }
            _ => write!(f, "{:?} {}", self.kind, self.position),
        }
    }
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    position: Position,
    peeked: Option<Token<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            position: Position::default(),
            peeked: None,
        }
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> Token<'a> {
        match self.peeked {
            Some(token) => token,
            None => {
                let token = self.scan();
                self.peeked = Some(token);
                token
            }
        }
    }

    pub fn next_token(&mut self) -> Token<'a> {
        match self.peeked.take() {
            Some(token) => token,
            None => self.scan(),
        }
    }

    /// Lexes the whole source, including the trailing `Eof`.
    pub fn tokenize(mut self) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            tokens.push(token);
            if token.kind == TokenKind::Eof {
                break;
            }
        }
        tokens
    }

    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.source.len())
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        let source = self.source;
        &source[start..end]
    }

    /// The source text from `start` up to the current offset.
    fn lexeme_from(&mut self, start: usize) -> &'a str {
        let end = self.offset();
        self.slice(start, end)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        self.position.advance(ch);
        Some(ch)
    }

    fn bump_while<F>(&mut self, mut predicate: F)
    where
        F: FnMut(char) -> bool,
    {
        while let Some(ch) = self.peek_char() {
            if !predicate(ch) {
                break;
            }
            self.bump();
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            self.bump_while(char::is_whitespace);
            if self.peek_char() != Some(';') {
                break;
            }
            self.bump_while(|ch| ch != '\n');
        }
    }

    fn scan(&mut self) -> Token<'a> {
        self.skip_whitespace_and_comments();
        let position = self.position;
        let start = self.offset();
        let Some(ch) = self.peek_char() else {
            return Token {
                kind: TokenKind::Eof,
                position,
                lexeme: "",
            };
        };
        match ch {
            '\'' => self.single_char(TokenKind::Quote, start, position),
            '(' => self.single_char(TokenKind::LeftParen, start, position),
            ')' => self.single_char(TokenKind::RightParen, start, position),
            '"' => self.string_literal(position),
            '0'..='9' => self.number_literal(start, position),
            _ => self.symbol(start, position),
        }
    }

    fn single_char(&mut self, kind: TokenKind, start: usize, position: Position) -> Token<'a> {
        self.bump();
        Token {
            kind,
            position,
            lexeme: self.lexeme_from(start),
        }
    }

    fn number_literal(&mut self, start: usize, position: Position) -> Token<'a> {
        self.bump_while(|ch| ch.is_ascii_digit());
        let mut kind = TokenKind::Integer;
        if self.peek_char() == Some('.') {
            self.bump();
            self.bump_while(|ch| ch.is_ascii_digit());
            kind = TokenKind::Float;
        }
        Token {
            kind,
            position,
            lexeme: self.lexeme_from(start),
        }
    }

    fn string_literal(&mut self, position: Position) -> Token<'a> {
        self.bump();
        let start = self.offset();
        loop {
            match self.peek_char() {
                Some('"') => {
                    let end = self.offset();
                    self.bump();
                    return Token {
                        kind: TokenKind::String,
                        position,
                        lexeme: self.slice(start, end),
                    };
                }
                Some('\n') => {
                    self.bump();
                    return Token {
                        kind: TokenKind::Invalid(LexError::NewlineInString),
                        position,
                        lexeme: "\n",
                    };
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    return Token {
                        kind: TokenKind::Invalid(LexError::UnterminatedString),
                        position,
                        lexeme: self.lexeme_from(start),
                    };
                }
            }
        }
    }

    fn symbol(&mut self, start: usize, position: Position) -> Token<'a> {
        self.bump_while(|ch| !ch.is_whitespace() && !is_punctuation(ch));
        Token {
            kind: TokenKind::Symbol,
            position,
            lexeme: self.lexeme_from(start),
        }
    }
}

fn is_punctuation(ch: char) -> bool {
    matches!(ch, '(' | ')' | '\'' | '"' | ';')
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    /// Yields tokens up to, but not including, `Eof`.
    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.next_token();
        (token.kind != TokenKind::Eof).then_some(token)
    }
}
