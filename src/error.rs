use std::fmt;

use thiserror::Error;

/// Everything that can stop an assembly attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid register `{0}` (expected R0-R7)")]
    InvalidRegister(String),

    #[error("invalid literal `{0}` (expected #<decimal> or x<hex>)")]
    InvalidLiteral(String),

    #[error("invalid escape sequence `\\{0}` in string literal")]
    InvalidEscape(char),

    #[error("{mnemonic} expects {expected} operand(s), found {found}")]
    OperandCount {
        mnemonic: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{mnemonic} operand {position}: expected {expected}, found `{found}`")]
    OperandKind {
        mnemonic: &'static str,
        position: usize,
        expected: &'static str,
        found: String,
    },

    #[error("{0} operands must be separated by commas")]
    OperandSeparator(&'static str),

    #[error("duplicate label: `{0}`")]
    DuplicateLabel(String),

    #[error("undefined label: `{0}`")]
    UndefinedLabel(String),

    #[error("invalid label: `{0}`")]
    InvalidLabel(String),

    #[error("unknown mnemonic or directive: `{0}`")]
    UnknownMnemonic(String),

    #[error("program must begin with .ORIG")]
    MissingOrig,

    #[error("duplicate .ORIG directive")]
    DuplicateOrig,

    #[error("missing .END directive")]
    MissingEnd,

    #[error("label `{0}` appears before .ORIG")]
    LabelBeforeOrig(String),

    #[error("{directive}: {reason}")]
    DirectiveOperand {
        directive: &'static str,
        reason: String,
    },

    #[error("value {value} does not fit in {bits}-bit {signedness} field")]
    Range {
        value: i32,
        bits: u32,
        signedness: &'static str,
    },

    #[error("program runs past the end of memory")]
    AddressOverflow,

    #[error("{0}")]
    Message(String),
}

impl From<String> for ErrorKind {
    fn from(msg: String) -> Self {
        ErrorKind::Message(msg)
    }
}

impl From<&str> for ErrorKind {
    fn from(msg: &str) -> Self {
        ErrorKind::Message(msg.to_owned())
    }
}

/// A fatal error bound to the 1-based source line that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at line {line}: {kind}")]
pub struct AsmError {
    line: usize,
    kind: ErrorKind,
}

impl AsmError {
    pub fn new(line: usize, kind: impl Into<ErrorKind>) -> Self {
        Self {
            line,
            kind: kind.into(),
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The underlying message without the `at line N:` prefix.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Per-line processing context. One is built for each source line and
/// handed down explicitly to every parse and encode step for that line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub line: usize,
}

impl Context {
    pub fn new(line: usize) -> Self {
        Self { line }
    }

    /// Context for the zero-based index of a line in the token sequence.
    pub fn for_index(index: usize) -> Self {
        Self { line: index + 1 }
    }

    pub fn error(&self, kind: impl Into<ErrorKind>) -> AsmError {
        AsmError::new(self.line, kind)
    }

    /// Attribute a failure to this line.
    pub fn attach<T, E: Into<ErrorKind>>(&self, result: Result<T, E>) -> Result<T, AsmError> {
        result.map_err(|e| self.error(e))
    }
}

/// Lift `f` into a function whose failures carry `ctx.line`.
///
/// The context is captured here, at wrap time: every call through the
/// returned function reports the same line. Functions of several
/// arguments take them as a tuple.
pub fn handle_errors<A, T, E, F>(ctx: Context, f: F) -> impl Fn(A) -> Result<T, AsmError>
where
    F: Fn(A) -> Result<T, E>,
    E: Into<ErrorKind>,
{
    move |args| ctx.attach(f(args))
}

/// Non-fatal diagnostic, e.g. text ignored after `.END`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at line {}: {}", self.line, self.message)
    }
}
