//! The [`Report`] error stack shared by the `fmp4live` crates.

use std::fmt;
use std::fmt::{Debug, Display};
use std::panic::Location;
use std::result::Result as StdResult;

//
// public types
//

/// An error `E` together with a stack of context describing where it was raised.
///
/// The [`Display`] implementation prints only the underlying error. The [`Debug`] implementation also prints the
/// location the report was created at and every message attached while it propagated, e.g. which box header was
/// being read and at what offset.
#[derive(thiserror::Error)]
#[error("{error}")]
pub struct Report<E: ReportableError> {
    #[source]
    error: E,
    stack: E::Stack,
}

/// A convenience alias for a [`Result`](std::result::Result) whose error is wrapped in a [`Report`].
pub type Result<T, E> = StdResult<T, Report<E>>;

/// [`Report`]-related extensions for [`Result`](std::result::Result).
pub trait ResultExt: Sized {
    #[track_caller]
    /// Attach a [`Display`]-able message to the error's stack.
    fn attach_printable<P: Display + Send + Sync + 'static>(self, printable: P) -> Self;
}

/// An error type which can be carried by a [`Report`].
pub trait ReportableError: Display {
    /// The stack type recording context for this error.
    type Stack: ReportableErrorStack;
}

/// A stack of context messages carried by a [`Report`].
pub trait ReportableErrorStack: Display {
    #[track_caller]
    /// Construct an empty stack, recording the caller's location.
    fn new() -> Self;

    #[track_caller]
    /// Push a [`Display`]-able message onto the stack.
    fn attach_printable<P: Display + Send + Sync + 'static>(self, printable: P) -> Self;
}

/// The default [`ReportableErrorStack`], recording each message along with the location it was attached at.
pub struct ReportStack {
    location: &'static Location<'static>,
    entries: Vec<ReportEntry>,
}

//
// private types
//

struct ReportEntry {
    message: Box<dyn Display + Send + Sync + 'static>,
    location: &'static Location<'static>,
}

//
// Report impls
//

impl<E: ReportableError> Report<E> {
    /// Get a reference to the underlying error.
    pub fn get_ref(&self) -> &E {
        &self.error
    }

    /// Unwrap this report, discarding its stack.
    pub fn into_inner(self) -> E {
        self.error
    }

    #[track_caller]
    /// Attach a [`Display`]-able message to the stack.
    pub fn attach_printable<P: Display + Send + Sync + 'static>(mut self, message: P) -> Self {
        self.stack = self.stack.attach_printable(message);
        self
    }
}

impl<E: ReportableError> From<E> for Report<E> {
    #[track_caller]
    fn from(error: E) -> Self {
        Self { error, stack: E::Stack::new() }
    }
}

impl<E: ReportableError> Debug for Report<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { error, stack } = self;
        write!(f, "{error}{stack}")
    }
}

//
// ReportStack impls
//

impl Display for ReportStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " at {}", self.location)?;
        for entry in &self.entries {
            write!(f, "\n - {entry}")?;
        }
        Ok(())
    }
}

impl ReportableErrorStack for ReportStack {
    #[track_caller]
    fn new() -> Self {
        Self { location: Location::caller(), entries: Vec::new() }
    }

    #[track_caller]
    fn attach_printable<P: Display + Send + Sync + 'static>(mut self, printable: P) -> Self {
        self.entries.push(ReportEntry { message: Box::new(printable), location: Location::caller() });
        self
    }
}

//
// ReportEntry impls
//

impl Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.location)
    }
}

//
// ResultExt impls
//

impl<T, E: ReportableError> ResultExt for Result<T, E> {
    #[track_caller]
    fn attach_printable<P: Display + Send + Sync + 'static>(self, printable: P) -> Self {
        self.map_err(|err| err.attach_printable(printable))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TEST_ERROR_DISPLAY: &str = "test error display";
    const TEST_ATTACHMENT: &str = "while reading `moov` header";

    #[derive(Debug, thiserror::Error)]
    #[error("{}", TEST_ERROR_DISPLAY)]
    struct TestError;

    impl ReportableError for TestError {
        type Stack = ReportStack;
    }

    fn test_report() -> Report<TestError> {
        report_attach!(TestError, TEST_ATTACHMENT)
    }

    fn failing() -> Result<(), TestError> {
        bail_attach!(TestError, "first");
    }

    #[test]
    fn display_is_only_the_error() {
        assert_eq!(test_report().to_string(), TEST_ERROR_DISPLAY);
    }

    #[test]
    fn debug_includes_attachments() {
        let report_debug = format!("{:?}", test_report());
        assert!(report_debug.starts_with(TEST_ERROR_DISPLAY));
        assert!(report_debug.contains(TEST_ATTACHMENT));
    }

    #[test]
    fn attachments_keep_their_order() {
        let report = failing().attach_printable("second").unwrap_err();
        let report_debug = format!("{report:?}");
        let first = report_debug.find("first").unwrap();
        let second = report_debug.find("second").unwrap();
        assert!(first < second);
    }
}
