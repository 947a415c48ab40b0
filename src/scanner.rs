use std::fmt::{self, Display, Formatter};
use std::iter::Peekable;
use std::str::CharIndices;

use ordered_float::OrderedFloat;
use thiserror::Error;

use crate::ast::Literal;
use crate::reporter::Reporter;

#[derive(Clone, Error, Debug, PartialEq, Eq)]
#[error("{kind}")]
pub struct ScanError {
    pub kind: ScanErrorKind,
    pub line: usize,
}

#[derive(Clone, Copy, Error, Debug, PartialEq, Eq)]
pub enum ScanErrorKind {
    #[error("Unterminated string.")]
    UnterminatedString,
    #[error("Unexpected character '{0}'.")]
    UnexpectedCharacter(char),
}

/// A token in the input stream
/// `literal` is only present for NUMBER and STRING tokens
/// EOF carries an empty lexeme and the last line of the input
#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub kind: TokenType,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenType, lexeme: &str, literal: Option<Literal>, line: usize) -> Token {
        Token {
            kind,
            lexeme: lexeme.to_string(),
            literal,
            line,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.literal {
            Some(literal) => write!(f, "{} {} {}", self.kind, self.lexeme, literal),
            None => write!(f, "{} {}", self.kind, self.lexeme),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenType {
    Symbol(Symbol),
    Keyword(Keyword),
    Identifier,
    String,
    Number,
    Eof,
}

impl Display for TokenType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbol(sym) => sym.fmt(f),
            Self::Keyword(kw) => kw.fmt(f),
            Self::Identifier => f.write_str("Identifier"),
            Self::String => f.write_str("String"),
            Self::Number => f.write_str("Number"),
            Self::Eof => f.write_str("Eof"),
        }
    }
}

impl PartialEq<Symbol> for TokenType {
    fn eq(&self, other: &Symbol) -> bool {
        matches!(self, TokenType::Symbol(symbol) if symbol == other)
    }
}

impl PartialEq<Keyword> for TokenType {
    fn eq(&self, other: &Keyword) -> bool {
        matches!(self, TokenType::Keyword(keyword) if keyword == other)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Symbol {
    // Single-character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character tokens.
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    And,
    Class,
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,
}

const KEYWORD_LITERAL_TO_SYMBOL: [(&str, Keyword); 16] = [
    ("and", Keyword::And),
    ("class", Keyword::Class),
    ("else", Keyword::Else),
    ("false", Keyword::False),
    ("fun", Keyword::Fun),
    ("for", Keyword::For),
    ("if", Keyword::If),
    ("nil", Keyword::Nil),
    ("or", Keyword::Or),
    ("print", Keyword::Print),
    ("return", Keyword::Return),
    ("super", Keyword::Super),
    ("this", Keyword::This),
    ("true", Keyword::True),
    ("var", Keyword::Var),
    ("while", Keyword::While),
];

impl Display for Keyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

const WS_CHARS: &str = " \r\t";

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_identifier_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Scan the whole source, routing every lexical error to the reporter
/// Never fails: bad input is skipped and scanning continues so that one pass surfaces every error
pub fn scan<R>(reporter: &mut R, code: &str) -> Vec<Token>
where
    R: Reporter + ?Sized,
{
    let mut tokens = Vec::new();
    for result in Scanner::new(code) {
        match result {
            Ok(token) => tokens.push(token),
            Err(err) => reporter.report(err.line, "", &err.to_string()),
        }
    }
    tokens
}

#[derive(Clone)]
pub struct Scanner<'code> {
    code: &'code str,
    code_iter: Peekable<CharIndices<'code>>,
    emitted_eof: bool, // Have we sent the EOF yet
    line: usize,
}

impl<'code> Scanner<'code> {
    pub fn new(code: &'code str) -> Scanner<'code> {
        Scanner {
            code,
            code_iter: code.char_indices().peekable(),
            emitted_eof: false,
            line: 1,
        }
    }

    // Byte offset of the next unconsumed char, which is also the end of the current lexeme
    fn offset(&mut self) -> usize {
        self.code_iter
            .peek()
            .map_or(self.code.len(), |(offset, _)| *offset)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.code_iter.peek().map(|(_, ch)| *ch)
    }

    fn peek_second_char(&self) -> Option<char> {
        let mut ahead = self.code_iter.clone();
        ahead.next();
        ahead.next().map(|(_, ch)| ch)
    }

    fn consume_next_char_if_eq(&mut self, next_ch: char) -> bool {
        self.code_iter.next_if(|(_, ch)| *ch == next_ch).is_some()
    }

    fn consume_next_char_if_match<F>(&mut self, predicate: F) -> bool
    where
        F: FnOnce(char) -> bool,
    {
        self.code_iter.next_if(|(_, ch)| predicate(*ch)).is_some()
    }

    fn token(&mut self, kind: TokenType, start: usize) -> Token {
        let end = self.offset();
        Token::new(kind, &self.code[start..end], None, self.line)
    }

    fn symbol(&mut self, symbol: Symbol, start: usize) -> Token {
        self.token(TokenType::Symbol(symbol), start)
    }

    // Pick the two char form of an operator if the next char is '='
    fn symbol_or_equal(&mut self, single: Symbol, with_equal: Symbol, start: usize) -> Token {
        let symbol = if self.consume_next_char_if_eq('=') {
            with_equal
        } else {
            single
        };
        self.symbol(symbol, start)
    }

    fn number(&mut self, start: usize) -> Token {
        while self.consume_next_char_if_match(|ch| ch.is_ascii_digit()) {}
        // A '.' only belongs to the number when a digit follows it, so "1." is a number then a dot
        if self.peek_char() == Some('.') && self.peek_second_char().is_some_and(|ch| ch.is_ascii_digit()) {
            self.code_iter.next();
            while self.consume_next_char_if_match(|ch| ch.is_ascii_digit()) {}
        }
        let end = self.offset();
        let lexeme = &self.code[start..end];
        // Digits with an optional digit fraction are always valid f64 syntax
        let literal = lexeme
            .parse::<f64>()
            .ok()
            .map(|number| Literal::Number(OrderedFloat(number)));
        Token::new(TokenType::Number, lexeme, literal, self.line)
    }

    fn string(&mut self, start: usize) -> Result<Token, ScanError> {
        // Strings are multiline, the token is attributed to the line it starts on
        let line = self.line;
        loop {
            match self.code_iter.next() {
                Some((_, '"')) => break,
                Some((_, '\n')) => self.line += 1,
                Some(_) => {}
                None => {
                    return Err(ScanError {
                        kind: ScanErrorKind::UnterminatedString,
                        line: self.line,
                    })
                }
            }
        }
        let end = self.offset();
        let lexeme = &self.code[start..end];
        // Both quotes are a single byte
        let contents = &lexeme[1..lexeme.len() - 1];
        Ok(Token::new(
            TokenType::String,
            lexeme,
            Some(Literal::String(contents.to_string())),
            line,
        ))
    }

    fn identifier(&mut self, start: usize) -> Token {
        while self.consume_next_char_if_match(is_identifier_continue) {}
        let end = self.offset();
        let identifier = &self.code[start..end];
        let kind = KEYWORD_LITERAL_TO_SYMBOL
            .iter()
            .find(|(lit, _)| *lit == identifier)
            .map_or(TokenType::Identifier, |(_, kw)| TokenType::Keyword(*kw));
        Token::new(kind, identifier, None, self.line)
    }
}

impl<'code> Iterator for Scanner<'code> {
    type Item = Result<Token, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        // Loop rather than recurse over skipped input so long runs of blank lines or comments don't grow the stack
        loop {
            let Some((start, ch)) = self.code_iter.next() else {
                if self.emitted_eof {
                    return None;
                }
                self.emitted_eof = true;
                return Some(Ok(Token::new(TokenType::Eof, "", None, self.line)));
            };
            let token = match ch {
                '(' => self.symbol(Symbol::LeftParen, start),
                ')' => self.symbol(Symbol::RightParen, start),
                '{' => self.symbol(Symbol::LeftBrace, start),
                '}' => self.symbol(Symbol::RightBrace, start),
                ',' => self.symbol(Symbol::Comma, start),
                '.' => self.symbol(Symbol::Dot, start),
                '-' => self.symbol(Symbol::Minus, start),
                '+' => self.symbol(Symbol::Plus, start),
                ';' => self.symbol(Symbol::Semicolon, start),
                '*' => self.symbol(Symbol::Star, start),
                '!' => self.symbol_or_equal(Symbol::Bang, Symbol::BangEqual, start),
                '=' => self.symbol_or_equal(Symbol::Equal, Symbol::EqualEqual, start),
                '<' => self.symbol_or_equal(Symbol::Less, Symbol::LessEqual, start),
                '>' => self.symbol_or_equal(Symbol::Greater, Symbol::GreaterEqual, start),
                '/' => {
                    if self.consume_next_char_if_eq('/') {
                        // The newline is left in place and counted on the next pass
                        while self.consume_next_char_if_match(|ch| ch != '\n') {}
                        continue;
                    }
                    self.symbol(Symbol::Slash, start)
                }
                '\n' => {
                    self.line += 1;
                    continue;
                }
                c if WS_CHARS.contains(c) => continue,
                '"' => return Some(self.string(start)),
                '0'..='9' => return Some(Ok(self.number(start))),
                c if is_identifier_start(c) => self.identifier(start),
                c => {
                    return Some(Err(ScanError {
                        kind: ScanErrorKind::UnexpectedCharacter(c),
                        line: self.line,
                    }))
                }
            };
            return Some(Ok(token));
        }
    }
}
