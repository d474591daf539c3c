use std::error;
use std::fmt;

/// An error that can occur in this crate.
///
/// Errors only come out of `Matcher::prepare`. Either the engine rejected
/// the pattern, or there was not enough memory to finish preparing it.
/// Failing to find a match is never an error.
#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
    offset: usize,
}

impl Error {
    pub(crate) fn regex(message: String, offset: usize) -> Error {
        Error { kind: ErrorKind::Regex(message), offset }
    }

    pub(crate) fn out_of_memory() -> Error {
        Error { kind: ErrorKind::OutOfMemory, offset: 0 }
    }

    /// Return the kind of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Return the diagnostic message for this error.
    ///
    /// For errors reported by the engine, this is the engine's own text,
    /// unmodified. It may be empty if the engine could not describe the
    /// error.
    pub fn message(&self) -> &str {
        match self.kind {
            ErrorKind::Regex(ref msg) => msg,
            ErrorKind::OutOfMemory => "Out of memory.",
            ErrorKind::__Nonexhaustive => unreachable!(),
        }
    }

    /// Return the byte offset into the pattern at which compilation failed.
    ///
    /// This is a best effort diagnostic. It is always `0` for
    /// `ErrorKind::OutOfMemory`.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// The kind of an error that can occur.
#[derive(Clone, Debug)]
pub enum ErrorKind {
    /// The engine refused to compile the pattern. This is usually a syntax
    /// error, but can be anything the engine reports at compile time,
    /// including running out of memory inside the engine.
    ///
    /// The string here is the engine's error message.
    Regex(String),
    /// The pattern compiled, but its capture output buffer could not be
    /// allocated.
    OutOfMemory,
    /// Hints that destructuring should not be exhaustive.
    ///
    /// This enum may grow additional variants, so this makes sure clients
    /// don't count on exhaustive matching. (Otherwise, adding a new variant
    /// could break existing code.)
    #[doc(hidden)]
    __Nonexhaustive,
}

impl error::Error for Error {
    fn description(&self) -> &str {
        match self.kind {
            ErrorKind::Regex(_) => "regex error",
            ErrorKind::OutOfMemory => "out of memory",
            ErrorKind::__Nonexhaustive => unreachable!(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ErrorKind::Regex(ref msg) => {
                write!(f, "error at offset {}: {}", self.offset, msg)
            }
            ErrorKind::OutOfMemory => write!(f, "{}", self.message()),
            ErrorKind::__Nonexhaustive => unreachable!(),
        }
    }
}
