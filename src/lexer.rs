use crate::error::{MintError, Span};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Single-character tokens
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Minus,
    Plus,
    Percent,
    Semicolon,
    Slash,
    Star,
    Newline,

    // One or two character tokens
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals
    Identifier,
    String,
    Integer,
    Float,

    // Keywords
    Else,
    False,
    Fn,
    For,
    If,
    Print,
    Return,
    True,

    // Special
    Eof,
}

impl TokenType {
    /// Separators end a statement without being part of it.
    pub fn is_separator(self) -> bool {
        matches!(self, TokenType::Newline | TokenType::Semicolon)
    }

    /// Keywords whose expression is followed by a `{ ... }` body.
    pub fn is_keyword_with_block(self) -> bool {
        matches!(self, TokenType::If | TokenType::For)
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            TokenType::LeftParen => "'('",
            TokenType::RightParen => "')'",
            TokenType::LeftBrace => "'{'",
            TokenType::RightBrace => "'}'",
            TokenType::Comma => "','",
            TokenType::Minus => "'-'",
            TokenType::Plus => "'+'",
            TokenType::Percent => "'%'",
            TokenType::Semicolon => "';'",
            TokenType::Slash => "'/'",
            TokenType::Star => "'*'",
            TokenType::Newline => "line break",
            TokenType::Bang => "'!'",
            TokenType::BangEqual => "'!='",
            TokenType::Equal => "'='",
            TokenType::EqualEqual => "'=='",
            TokenType::Greater => "'>'",
            TokenType::GreaterEqual => "'>='",
            TokenType::Less => "'<'",
            TokenType::LessEqual => "'<='",
            TokenType::Identifier => "identifier",
            TokenType::String => "string literal",
            TokenType::Integer => "integer literal",
            TokenType::Float => "float literal",
            TokenType::Else => "'else'",
            TokenType::False => "'false'",
            TokenType::Fn => "'fn'",
            TokenType::For => "'for'",
            TokenType::If => "'if'",
            TokenType::Print => "'print'",
            TokenType::Return => "'return'",
            TokenType::True => "'true'",
            TokenType::Eof => "end of input",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: String, span: Span) -> Self {
        Self {
            token_type,
            lexeme,
            span,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.token_type {
            TokenType::String if self.lexeme.contains('"') => write!(f, "'{}'", self.lexeme),
            TokenType::String => write!(f, "\"{}\"", self.lexeme),
            TokenType::Newline => write!(f, ";"),
            TokenType::Eof => Ok(()),
            _ => write!(f, "{}", self.lexeme),
        }
    }
}

/// A window over the shared token buffer: tokens `start..end`, terminated by
/// the token at `end` (end of input, a closing brace, or a line end).
#[derive(Debug, Clone)]
pub struct TokenSpan {
    tokens: Rc<[Token]>,
    start: usize,
    end: usize,
}

impl TokenSpan {
    /// The whole program, ended by the trailing `Eof` token.
    pub fn program(tokens: Vec<Token>) -> Self {
        let end = tokens.len().saturating_sub(1);
        Self {
            tokens: tokens.into(),
            start: 0,
            end,
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            tokens: Rc::clone(&self.tokens),
            start,
            end,
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn body(&self) -> &[Token] {
        &self.tokens[self.start..self.end]
    }
}

impl fmt::Display for TokenSpan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for token in self.body() {
            if token.token_type == TokenType::Newline && first {
                continue;
            }
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", token)?;
            first = false;
        }
        Ok(())
    }
}

pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    keywords: HashMap<&'static str, TokenType>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        let mut keywords = HashMap::new();
        keywords.insert("else", TokenType::Else);
        keywords.insert("false", TokenType::False);
        keywords.insert("fn", TokenType::Fn);
        keywords.insert("for", TokenType::For);
        keywords.insert("if", TokenType::If);
        keywords.insert("print", TokenType::Print);
        keywords.insert("return", TokenType::Return);
        keywords.insert("true", TokenType::True);

        Self {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            keywords,
        }
    }

    pub fn scan_tokens(mut self) -> Result<Vec<Token>, MintError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }

        self.tokens.push(Token::new(
            TokenType::Eof,
            String::new(),
            Span::single(self.current),
        ));

        Ok(self.tokens)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn scan_token(&mut self) -> Result<(), MintError> {
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            ',' => self.add_token(TokenType::Comma),
            '-' => self.add_token(TokenType::Minus),
            '+' => self.add_token(TokenType::Plus),
            '%' => self.add_token(TokenType::Percent),
            ';' => self.add_token(TokenType::Semicolon),
            '*' => self.add_token(TokenType::Star),
            '\n' => self.add_token(TokenType::Newline),
            '!' => {
                let token_type = if self.match_char('=') {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(token_type);
            }
            '=' => {
                let token_type = if self.match_char('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                self.add_token(token_type);
            }
            '<' => {
                let token_type = if self.match_char('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token_type);
            }
            '>' => {
                let token_type = if self.match_char('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token_type);
            }
            '/' => {
                if self.match_char('/') {
                    // Comment goes until end of line; the newline itself is kept
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash);
                }
            }
            ' ' | '\r' | '\t' => {}
            '"' | '\'' => self.string(c)?,
            c if c.is_ascii_digit() => self.number()?,
            c if c.is_alphabetic() || c == '_' => self.identifier(),
            _ => {
                return Err(MintError::lex_error(
                    Span::single(self.current - 1),
                    format!("Unexpected character: '{}'", c),
                ));
            }
        }

        Ok(())
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        if !self.is_at_end() {
            self.current += 1;
        }
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.peek() != expected {
            false
        } else {
            self.current += 1;
            true
        }
    }

    fn peek(&self) -> char {
        self.source.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.source.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn string(&mut self, quote: char) -> Result<(), MintError> {
        while self.peek() != quote && !self.is_at_end() {
            self.advance();
        }

        if self.is_at_end() {
            return Err(MintError::lex_error(
                Span::new(self.start, self.current),
                "Unterminated string".to_string(),
            )
            .with_help(format!("Close the string with a matching {}", quote)));
        }

        // Consume the closing quote
        self.advance();

        let content = self.text(self.start + 1, self.current - 1);
        self.add_token_with_content(TokenType::String, content);
        Ok(())
    }

    fn number(&mut self) -> Result<(), MintError> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;

        // Look for fractional part
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let number = self.text(self.start, self.current);

        if is_float {
            if number.parse::<f64>().is_err() {
                return Err(MintError::lex_error(
                    Span::new(self.start, self.current),
                    format!("Invalid float: {}", number),
                ));
            }
            self.add_token_with_content(TokenType::Float, number);
        } else {
            if number.parse::<i64>().is_err() {
                return Err(MintError::lex_error(
                    Span::new(self.start, self.current),
                    format!("Invalid integer: {}", number),
                )
                .with_help("Integers must fit in a signed 64-bit value"));
            }
            self.add_token_with_content(TokenType::Integer, number);
        }

        Ok(())
    }

    fn identifier(&mut self) {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text = self.text(self.start, self.current);
        let token_type = self
            .keywords
            .get(text.as_str())
            .copied()
            .unwrap_or(TokenType::Identifier);

        self.add_token_with_content(token_type, text);
    }

    fn text(&self, start: usize, end: usize) -> String {
        self.source[start..end].iter().collect()
    }

    fn add_token(&mut self, token_type: TokenType) {
        let text = self.text(self.start, self.current);
        self.add_token_with_content(token_type, text);
    }

    fn add_token_with_content(&mut self, token_type: TokenType, lexeme: String) {
        self.tokens.push(Token::new(
            token_type,
            lexeme,
            Span::new(self.start, self.current),
        ));
    }
}
