use crate::diagnostics::{Diagnostics, ErrorKind};
use crate::token::{self, Literal, Token, TokenKind};

/// Indentation-sensitive scanner. Errors are recorded in the diagnostics
/// sink and scanning always continues to the end of the source, so one run
/// can surface every lexical problem at once.
pub struct Lexer<'a> {
    diags: &'a mut Diagnostics,
    chars: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    spaces: usize,
    tabs: usize,
    indent_stack: Vec<usize>,
    at_line_start: bool,
}

pub fn tokenize(source: &str, diags: &mut Diagnostics) -> Vec<Token> {
    Lexer::new(source, diags).scan_tokens()
}

impl<'a> Lexer<'a> {
    pub fn new(source: &str, diags: &'a mut Diagnostics) -> Self {
        Self {
            diags,
            chars: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            spaces: 0,
            tabs: 0,
            indent_stack: vec![0],
            at_line_start: true,
        }
    }

    pub fn scan_tokens(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }

        if self.tokens.last().is_some_and(|t| t.kind != TokenKind::Newline) {
            self.tokens.push(Token::new(TokenKind::Newline, "", self.line));
        }
        self.flush_dedents();
        self.tokens.push(Token::new(TokenKind::Eof, "", self.line));
        self.tokens
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            '(' => self.simple(TokenKind::LeftParen),
            ')' => self.simple(TokenKind::RightParen),
            '[' => self.simple(TokenKind::LeftBracket),
            ']' => self.simple(TokenKind::RightBracket),
            ',' => self.simple(TokenKind::Comma),
            '.' => self.simple(TokenKind::Dot),
            '+' => self.simple(TokenKind::Plus),
            ':' => self.simple(TokenKind::Colon),
            '*' => self.simple(TokenKind::Star),
            '%' => self.simple(TokenKind::Percent),
            '#' => {
                while self.peek() != '\n' && self.peek() != '\r' && !self.is_at_end() {
                    self.advance();
                }
            }
            '-' => {
                self.settle_indentation();
                let kind = if self.matches('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                };
                self.add_token(kind);
            }
            '=' => {
                self.settle_indentation();
                let kind = if self.matches('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.add_token(kind);
            }
            '<' => {
                self.settle_indentation();
                let kind = if self.matches('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.add_token(kind);
            }
            '>' => {
                self.settle_indentation();
                let kind = if self.matches('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.add_token(kind);
            }
            '!' => {
                self.settle_indentation();
                if self.matches('=') {
                    self.add_token(TokenKind::BangEqual);
                } else {
                    self.diags.error(self.line, ErrorKind::Syntax, "invalid syntax");
                }
            }
            '/' => {
                self.settle_indentation();
                if self.matches('/') {
                    self.add_token(TokenKind::DoubleSlash);
                } else {
                    self.diags.error(self.line, ErrorKind::Syntax, "invalid syntax");
                }
            }
            '\r' => {
                self.matches('\n');
                self.add_token(TokenKind::Newline);
                self.begin_line();
            }
            '\n' => {
                self.add_token(TokenKind::Newline);
                self.begin_line();
            }
            ' ' | '\t' => {
                if !self.at_line_start {
                    return;
                }
                if c == ' ' {
                    self.spaces += 1;
                } else {
                    self.tabs += 1;
                }
                while (self.peek() == ' ' || self.peek() == '\t') && !self.is_at_end() {
                    if self.peek() == ' ' {
                        self.spaces += 1;
                    } else {
                        self.tabs += 1;
                    }
                    self.advance();
                }
                if self.peek() == '#' {
                    return;
                }
                self.expand_tabs();
            }
            '"' => {
                self.settle_indentation();
                self.string();
            }
            _ => {
                self.settle_indentation();
                if c.is_ascii_digit() {
                    self.number();
                } else if is_ident_start(c) {
                    self.identifier();
                } else {
                    self.diags.error(self.line, ErrorKind::Syntax, "invalid syntax");
                }
            }
        }
    }

    fn simple(&mut self, kind: TokenKind) {
        self.settle_indentation();
        self.add_token(kind);
    }

    fn begin_line(&mut self) {
        self.line += 1;
        self.at_line_start = true;
        self.spaces = 0;
        self.tabs = 0;
    }

    // Tabs advance to the next multiple of eight columns. Counting spaces
    // and tabs separately and expanding at the end matches historic
    // behavior, including mixed runs.
    fn expand_tabs(&mut self) {
        if self.tabs > 0 {
            self.spaces += 8 - self.spaces % 8;
            self.spaces += 8 * (self.tabs - 1);
        }
        self.tabs = 0;
    }

    /// Compares the indentation gathered since the last newline against the
    /// indent stack, emitting INDENT/DEDENT. Called lazily at the first real
    /// token of a line so blank and comment-only lines never take part.
    fn settle_indentation(&mut self) {
        if !self.at_line_start {
            return;
        }
        self.at_line_start = false;

        let top = *self.indent_stack.last().unwrap_or(&0);
        if self.spaces > top {
            if self.line == 1 {
                self.diags
                    .error(self.line, ErrorKind::Indentation, "unexpected indent");
            }
            self.indent_stack.push(self.spaces);
            self.tokens.push(Token::new(TokenKind::Indent, "", self.line));
            self.spaces = 0;
        } else if self.spaces < top {
            while self.indent_stack.last().is_some_and(|&w| w > self.spaces) {
                self.indent_stack.pop();
                self.tokens.push(Token::new(TokenKind::Dedent, "", self.line));
            }
            if self.indent_stack.last() != Some(&self.spaces) {
                self.diags.error(
                    self.line,
                    ErrorKind::Indentation,
                    "unindent does not match any outer indentation level",
                );
            }
            self.spaces = 0;
        }
    }

    fn flush_dedents(&mut self) {
        while self.indent_stack.last().is_some_and(|&w| w > 0) {
            self.indent_stack.pop();
            self.tokens.push(Token::new(TokenKind::Dedent, "", self.line));
        }
    }

    fn string(&mut self) {
        // Escapes are consumed in full below, so a '"' seen here is always a
        // real terminator.
        while self.peek() != '"' && !self.is_at_end() {
            let c = self.peek();
            if !(' '..='~').contains(&c) {
                self.diags.error(
                    self.line,
                    ErrorKind::Syntax,
                    "only 32-126 decimal range ASCII characters allowed in strings",
                );
            }
            if c == '\n' {
                self.line += 1;
            }
            if c == '\\' {
                let next = self.peek_next();
                if next != '"' && next != '\\' && next != 't' && next != 'n' {
                    self.diags
                        .error(self.line, ErrorKind::Syntax, "unrecognized escape sequence");
                } else {
                    self.advance();
                }
            }
            self.advance();
        }

        if self.is_at_end() {
            self.diags
                .error(self.line, ErrorKind::Syntax, "unterminated string literal");
            return;
        }

        self.advance();

        let raw: String = self.chars[self.start + 1..self.current - 1].iter().collect();
        let value = raw
            .replace("\\\\", "\\")
            .replace("\\n", "\n")
            .replace("\\t", "\t")
            .replace("\\\"", "\"");

        let kind = if is_id_string(&value) {
            TokenKind::IdString
        } else {
            TokenKind::String
        };
        self.add_literal_token(kind, Literal::Str(value));
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let literal: String = self.chars[self.start..self.current].iter().collect();
        let value = match literal.parse::<i32>() {
            Ok(value) => {
                if value > 0 && literal.starts_with('0') {
                    self.diags.error(
                        self.line,
                        ErrorKind::Syntax,
                        "leading zeros in decimal integer literals are not permitted",
                    );
                }
                value
            }
            Err(_) => {
                self.diags.error(
                    self.line,
                    ErrorKind::Overflow,
                    "number value exceeds allowed range of 32 bit signed int",
                );
                0
            }
        };

        self.add_literal_token(TokenKind::Number, Literal::Int(value));

        if is_ident_start(self.peek()) {
            self.diags
                .error(self.line, ErrorKind::Syntax, "invalid decimal literal");
        }
    }

    fn identifier(&mut self) {
        while is_ident_continue(self.peek()) {
            self.advance();
        }

        let text: String = self.chars[self.start..self.current].iter().collect();
        let kind = match token::keyword(&text) {
            Some(kind) => kind,
            None => {
                if token::is_reserved(&text) {
                    self.diags.error(
                        self.line,
                        ErrorKind::Syntax,
                        format!("'{text}' keyword is reserved"),
                    );
                }
                TokenKind::Identifier
            }
        };

        match kind {
            TokenKind::True => self.add_literal_token(kind, Literal::Bool(true)),
            TokenKind::False => self.add_literal_token(kind, Literal::Bool(false)),
            _ => self.add_token(kind),
        }
    }

    fn add_token(&mut self, kind: TokenKind) {
        if kind == TokenKind::Newline {
            match self.tokens.last() {
                None => return,
                Some(last) if last.kind == TokenKind::Newline => return,
                _ => {}
            }
        }
        let lexeme: String = self.chars[self.start..self.current].iter().collect();
        self.tokens.push(Token::new(kind, lexeme, self.line));
    }

    fn add_literal_token(&mut self, kind: TokenKind, literal: Literal) {
        let lexeme: String = self.chars[self.start..self.current].iter().collect();
        self.tokens
            .push(Token::with_literal(kind, lexeme, literal, self.line));
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        c
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn peek(&self) -> char {
        self.chars.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.chars.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

/// A string literal whose decoded value is shaped like an identifier doubles
/// as a forward class-name reference in type annotations.
fn is_id_string(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if is_ident_start(first) => chars.all(is_ident_continue),
        _ => false,
    }
}
