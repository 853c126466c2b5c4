use std::fmt;

/// Python-flavored error categories shared by every stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Indentation,
    Name,
    Type,
    Attribute,
    Value,
    Overflow,
    ZeroDivision,
    Index,
    Runtime,
    NotImplemented,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Indentation => "IndentationError",
            ErrorKind::Name => "NameError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Attribute => "AttributeError",
            ErrorKind::Value => "ValueError",
            ErrorKind::Overflow => "OverflowError",
            ErrorKind::ZeroDivision => "ZeroDivisionError",
            ErrorKind::Index => "IndexError",
            ErrorKind::Runtime => "RuntimeError",
            ErrorKind::NotImplemented => "NotImplementedError",
        };
        write!(f, "{name}")
    }
}

/// Accumulates errors across lexing, parsing and resolution so that a single
/// run can surface as many problems as possible. Consecutive duplicate
/// messages are coalesced, which keeps cascaded reports readable.
#[derive(Debug, Default)]
pub struct Diagnostics {
    messages: Vec<String>,
    had_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, line: usize, kind: ErrorKind, message: impl fmt::Display) {
        self.push(format!("[line {line}] {kind}: {message}"));
    }

    fn push(&mut self, rendered: String) {
        self.had_error = true;
        if self.messages.last() == Some(&rendered) {
            return;
        }
        self.messages.push(rendered);
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_line_and_kind() {
        let mut diags = Diagnostics::new();
        diags.error(3, ErrorKind::Syntax, "invalid syntax");
        assert_eq!(diags.messages(), ["[line 3] SyntaxError: invalid syntax"]);
        assert!(diags.had_error());
    }

    #[test]
    fn coalesces_consecutive_duplicates() {
        let mut diags = Diagnostics::new();
        diags.error(2, ErrorKind::Name, "Identifier not defined in current scope: x");
        diags.error(2, ErrorKind::Name, "Identifier not defined in current scope: x");
        diags.error(2, ErrorKind::Name, "Identifier not defined in current scope: y");
        assert_eq!(diags.messages().len(), 2);
    }

    #[test]
    fn keeps_nonadjacent_duplicates() {
        let mut diags = Diagnostics::new();
        diags.error(1, ErrorKind::Type, "Expected int, got str");
        diags.error(2, ErrorKind::Name, "Unknown type: T");
        diags.error(1, ErrorKind::Type, "Expected int, got str");
        assert_eq!(diags.messages().len(), 3);
    }
}
