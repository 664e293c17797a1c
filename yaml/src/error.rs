use std::fmt::{self, Display};
use std::io;

use failure::{Backtrace, Context, Fail};

pub type Result<T> = std::result::Result<T, EmitError>;

/// Why emission stopped.
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum EmitErrorKind {
    #[fail(display = "write to underlying sink failed")]
    Io,
}

/// Wraps an I/O failure from the underlying writer.
///
/// Once an [`Encoder`](crate::Encoder) call produces one of these, the
/// encoder remembers it (the "sticky" error from spec.md section 4.8) and
/// every subsequent write becomes a no-op that returns the same error.
#[derive(Debug)]
pub struct EmitError {
    inner: Context<EmitErrorKind>,
}

impl Fail for EmitError {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}

impl Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

impl From<EmitErrorKind> for EmitError {
    fn from(kind: EmitErrorKind) -> EmitError {
        EmitError { inner: Context::new(kind) }
    }
}

impl From<Context<EmitErrorKind>> for EmitError {
    fn from(inner: Context<EmitErrorKind>) -> EmitError {
        EmitError { inner }
    }
}

impl From<io::Error> for EmitError {
    fn from(_: io::Error) -> EmitError {
        EmitErrorKind::Io.into()
    }
}

impl Clone for EmitError {
    fn clone(&self) -> Self {
        EmitErrorKind::Io.into()
    }
}
