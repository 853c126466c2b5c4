use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Colon,
    Arrow,

    // Operators
    Plus,
    Minus,
    Star,
    Percent,
    DoubleSlash,
    Equal,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Literals
    Identifier,
    IdString,
    String,
    Number,

    // Keywords
    And,
    Bool,
    Class,
    Def,
    Elif,
    Else,
    Empty,
    False,
    For,
    Global,
    If,
    In,
    Input,
    Int,
    Is,
    Len,
    None,
    Nonlocal,
    Not,
    Object,
    Or,
    Pass,
    Print,
    Return,
    SelfKw,
    Str,
    True,
    While,

    // Structural
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            literal: None,
            line,
        }
    }

    pub fn with_literal(
        kind: TokenKind,
        lexeme: impl Into<String>,
        literal: Literal,
        line: usize,
    ) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            literal: Some(literal),
            line,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end"),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Indent => write!(f, "indent"),
            TokenKind::Dedent => write!(f, "dedent"),
            _ => write!(f, "'{}'", self.lexeme),
        }
    }
}

/// Keywords of the language proper. Identifier-shaped lexemes not in this
/// table are either plain identifiers or reserved words.
pub fn keyword(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "and" => TokenKind::And,
        "bool" => TokenKind::Bool,
        "class" => TokenKind::Class,
        "def" => TokenKind::Def,
        "elif" => TokenKind::Elif,
        "else" => TokenKind::Else,
        "Empty" => TokenKind::Empty,
        "False" => TokenKind::False,
        "for" => TokenKind::For,
        "global" => TokenKind::Global,
        "if" => TokenKind::If,
        "in" => TokenKind::In,
        "input" => TokenKind::Input,
        "int" => TokenKind::Int,
        "is" => TokenKind::Is,
        "len" => TokenKind::Len,
        "None" => TokenKind::None,
        "nonlocal" => TokenKind::Nonlocal,
        "not" => TokenKind::Not,
        "object" => TokenKind::Object,
        "or" => TokenKind::Or,
        "pass" => TokenKind::Pass,
        "print" => TokenKind::Print,
        "return" => TokenKind::Return,
        "self" => TokenKind::SelfKw,
        "str" => TokenKind::Str,
        "True" => TokenKind::True,
        "while" => TokenKind::While,
        _ => return None,
    };
    Some(kind)
}

/// Python keywords the language recognizes but does not support.
pub fn is_reserved(ident: &str) -> bool {
    matches!(
        ident,
        "as" | "assert"
            | "async"
            | "await"
            | "break"
            | "continue"
            | "del"
            | "except"
            | "finally"
            | "from"
            | "import"
            | "lambda"
            | "raise"
            | "try"
            | "with"
            | "yield"
    )
}
