use std::borrow::Cow;
use std::error;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::io;
use std::result;


/// A result type using our [`Error`] by default.
pub type Result<T, E = Error> = result::Result<T, E>;


/// The kind of an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The first pass completed without finding a `.file` entry matching
    /// the annotation target.
    NoTargetFile,
    /// A `.file` entry was encountered before any DWARF5 `.file 0` entry
    /// established the compilation directory.
    MissingCompileDir,
    /// A numeric capture (file index, source line, stab type) failed to
    /// parse.
    MalformedNumber,
    /// The input or one of the arguments was invalid.
    InvalidInput,
    /// An I/O error occurred.
    Io,
}

impl ErrorKind {
    #[doc(hidden)]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoTargetFile => "no .file entry matches the annotation target",
            Self::MissingCompileDir => "missing compilation directory",
            Self::MalformedNumber => "malformed number",
            Self::InvalidInput => "invalid input",
            Self::Io => "I/O error",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}


/// The error type used by this crate.
///
/// Errors carry an [`ErrorKind`] for programmatic handling and a chain of
/// human readable context strings, added via [`ErrorExt`], for diagnosis.
pub struct Error {
    kind: ErrorKind,
    message: Option<Cow<'static, str>>,
    /// Context strings, innermost first.
    context: Vec<Cow<'static, str>>,
    source: Option<Box<dyn error::Error + Send + Sync + 'static>>,
}

impl Error {
    fn new(kind: ErrorKind, message: Option<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message,
            context: Vec::new(),
            source: None,
        }
    }

    pub(crate) fn with_no_target_file(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::NoTargetFile, Some(message.into()))
    }

    pub(crate) fn with_missing_compile_dir(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::MissingCompileDir, Some(message.into()))
    }

    pub(crate) fn with_malformed_number(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::MalformedNumber, Some(message.into()))
    }

    #[allow(dead_code)]
    pub(crate) fn with_invalid_input(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidInput, Some(message.into()))
    }

    /// Retrieve the error's kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for context in self.context.iter().rev() {
            write!(f, "{context}: ")?;
        }
        match &self.message {
            Some(message) => f.write_str(message)?,
            None => f.write_str(self.kind.as_str())?,
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("context", &self.context)
            .field("source", &self.source)
            .finish()
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

impl From<io::Error> for Error {
    fn from(other: io::Error) -> Self {
        let mut slf = Self::new(ErrorKind::Io, None);
        slf.source = Some(Box::new(other));
        slf
    }
}


/// A trait providing ergonomic chaining capabilities to [`Error`].
pub trait ErrorExt: private::Sealed {
    /// The output type produced by [`context`](Self::context) and
    /// [`with_context`](Self::with_context).
    type Output;

    /// Add context to this error.
    fn context<C>(self, context: C) -> Self::Output
    where
        C: Into<Cow<'static, str>>;

    /// Add context to this error, lazily evaluated.
    fn with_context<C, F>(self, f: F) -> Self::Output
    where
        C: Into<Cow<'static, str>>,
        F: FnOnce() -> C;
}

impl ErrorExt for Error {
    type Output = Error;

    fn context<C>(mut self, context: C) -> Self::Output
    where
        C: Into<Cow<'static, str>>,
    {
        self.context.push(context.into());
        self
    }

    fn with_context<C, F>(self, f: F) -> Self::Output
    where
        C: Into<Cow<'static, str>>,
        F: FnOnce() -> C,
    {
        self.context(f())
    }
}

impl<T, E> ErrorExt for Result<T, E>
where
    E: ErrorExt,
{
    type Output = Result<T, E::Output>;

    fn context<C>(self, context: C) -> Self::Output
    where
        C: Into<Cow<'static, str>>,
    {
        self.map_err(|err| err.context(context))
    }

    fn with_context<C, F>(self, f: F) -> Self::Output
    where
        C: Into<Cow<'static, str>>,
        F: FnOnce() -> C,
    {
        self.map_err(|err| err.with_context(f))
    }
}

mod private {
    use super::Error;
    use super::Result;

    pub trait Sealed {}

    impl Sealed for Error {}
    impl<T, E> Sealed for Result<T, E> where E: Sealed {}
}


#[cfg(test)]
mod tests {
    use super::*;


    /// Check that the error kind is accessible and displayed when no
    /// message was provided.
    #[test]
    fn kind_only_display() {
        let err = Error::new(ErrorKind::NoTargetFile, None);
        assert_eq!(err.kind(), ErrorKind::NoTargetFile);
        assert_eq!(
            err.to_string(),
            "no .file entry matches the annotation target"
        );
    }

    /// Check that context layers are rendered outermost first.
    #[test]
    fn context_chaining() {
        let err = Error::with_malformed_number("'x' is not a number")
            .context("parsing .loc directive")
            .context("first pass failed");
        assert_eq!(err.kind(), ErrorKind::MalformedNumber);
        assert_eq!(
            err.to_string(),
            "first pass failed: parsing .loc directive: 'x' is not a number"
        );
    }

    /// Make sure that I/O errors convert and keep their source.
    #[test]
    fn io_conversion() {
        use std::error::Error as _;

        let io = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = Error::from(io);
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.source().is_some());
        assert!(err.to_string().ends_with("gone"));
    }
}
