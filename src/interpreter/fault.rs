use thiserror::Error;

use crate::diagnostics::ErrorKind;

/// A runtime failure. Rendering matches the static diagnostics so the driver
/// can print either through the same path; the exit code distinguishes the
/// fault families at the process level.
#[derive(Debug, Clone, Error)]
#[error("[line {line}] {kind}: {message}")]
pub struct Fault {
    pub line: usize,
    pub kind: ErrorKind,
    pub message: String,
    pub exit_code: u8,
}

impl Fault {
    pub fn new(line: usize, kind: ErrorKind, message: impl Into<String>, exit_code: u8) -> Self {
        Self {
            line,
            kind,
            message: message.into(),
            exit_code,
        }
    }

    pub fn zero_division(line: usize) -> Self {
        Self::new(line, ErrorKind::ZeroDivision, "division by zero", 2)
    }

    pub fn index(line: usize, message: impl Into<String>) -> Self {
        Self::new(line, ErrorKind::Index, message, 3)
    }

    pub fn none_len(line: usize) -> Self {
        Self::new(line, ErrorKind::Type, "object of type 'NoneType' has no len()", 1)
    }

    /// Attribute read (including method lookup) on None.
    pub fn none_attribute(line: usize, name: &str) -> Self {
        Self::new(
            line,
            ErrorKind::Attribute,
            format!("'NoneType' object has no attribute '{name}'"),
            1,
        )
    }

    /// Attribute write on None; unlike reads this falls in the general
    /// None-misuse family.
    pub fn none_attribute_write(line: usize, name: &str) -> Self {
        Self::new(
            line,
            ErrorKind::Attribute,
            format!("'NoneType' object has no attribute '{name}'"),
            4,
        )
    }

    /// Any other operation applied to None: calls, indexing, iteration.
    pub fn none_operation(line: usize, message: impl Into<String>) -> Self {
        Self::new(line, ErrorKind::Type, message, 4)
    }

    pub fn type_error(line: usize, message: impl Into<String>) -> Self {
        Self::new(line, ErrorKind::Type, message, 70)
    }

    pub fn name_error(line: usize, message: impl Into<String>) -> Self {
        Self::new(line, ErrorKind::Name, message, 70)
    }

    pub fn attribute_error(line: usize, message: impl Into<String>) -> Self {
        Self::new(line, ErrorKind::Attribute, message, 70)
    }

    pub fn io(line: usize, message: impl Into<String>) -> Self {
        Self::new(line, ErrorKind::Runtime, message, 70)
    }
}
