use std::borrow::Cow;
use std::fmt::{self, Display};

/// What went wrong with a tool call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The arguments did not decode into the tool's input.
    InvalidInput,
    /// The tool ran and failed, e.g. the lookup service was unreachable.
    ExecutionError,
    /// The model asked for a tool that is not registered.
    NotFound,
}

impl ErrorKind {
    fn describe(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid tool input",
            ErrorKind::ExecutionError => "tool execution failed",
            ErrorKind::NotFound => "no such tool",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A failed tool call.
///
/// The agent turns it into the tool's output (`Error: {reason}`), so the
/// reason should be something the model can act on.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    reason: Cow<'static, str>,
}

impl Error {
    #[inline]
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            reason: Cow::Borrowed(kind.describe()),
        }
    }

    /// Creates an `InvalidInput` error.
    #[inline]
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates an `ExecutionError` error.
    #[inline]
    pub fn execution_error() -> Self {
        Self::new(ErrorKind::ExecutionError)
    }

    /// Creates a `NotFound` error.
    #[inline]
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// Replaces the generic reason.
    #[inline]
    pub fn with_reason<S: Into<Cow<'static, str>>>(mut self, reason: S) -> Self {
        self.reason = reason.into();
        self
    }

    /// Returns the kind of the error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the reason, or a description of the kind if none was given.
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_input().with_reason(format!("{err}"))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

impl std::error::Error for Error {}
