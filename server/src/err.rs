use std::fmt::{Debug, Display, Formatter};

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// This is defined as a convenience.
pub type Result<T> = std::result::Result<T, Error>;

/// A failure that remembers where it was raised.
///
/// `Display` is the operator-facing message; `Debug` appends the raise
/// site so log lines point back into the code. Built through the
/// [`netdisc_error!`] macros rather than directly.
pub struct NetdiscError {
    context: String,
    at: &'static str,
    source: Option<Error>,
}

impl NetdiscError {
    pub fn new(context: impl Into<String>, at: &'static str) -> Self {
        Self {
            context: context.into(),
            at,
            source: None,
        }
    }

    pub fn with_source(mut self, source: Error) -> Self {
        self.source = Some(source);
        self
    }
}

#[macro_export]
macro_rules! netdisc_error {
    ($($arg:tt)+) => {
        $crate::err::NetdiscError::new(
            format!($($arg)+),
            concat!(file!(), ":", line!()),
        )
    };
}

#[macro_export]
macro_rules! netdisc_error_with_source {
    ($source:expr, $($arg:tt)+) => {
        $crate::netdisc_error!($($arg)+)
            .with_source(Box::new($source) as $crate::err::Error)
    };
}

impl Display for NetdiscError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.context)
    }
}

impl Debug for NetdiscError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (at {})", self.context, self.at)
    }
}

impl std::error::Error for NetdiscError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error))
    }
}
