//! Handler failures

use thiserror::Error;

/// Failure raised by a worker handler
///
/// `kind` names the error category and is what error-code mappings match
/// against. Conversions from Rust errors use the error type's name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("{}", describe(.kind, .message))]
    Raised {
        kind: String,
        message: Option<String>,
    },

    /// Wraps a failure observed through an asynchronous completion
    #[error("handler execution failed: {0}")]
    Execution(#[source] Box<HandlerError>),
}

fn describe(kind: &str, message: &Option<String>) -> String {
    match message {
        Some(message) => format!("{}: {}", kind, message),
        None => kind.to_string(),
    }
}

impl HandlerError {
    /// Kind of the failure raised when a required argument is unbound
    pub const MISSING_ARGUMENT: &'static str = "MissingArgument";

    /// Kind of the failure raised when a handler panics
    pub const PANIC: &'static str = "Panic";

    pub fn raised(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Raised {
            kind: kind.into(),
            message: Some(message.into()).filter(|m: &String| !m.is_empty()),
        }
    }

    /// A failure that carries no message
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self::Raised {
            kind: kind.into(),
            message: None,
        }
    }

    /// A failure whose kind is the name of the type `E`
    pub fn typed<E: ?Sized>(message: impl Into<String>) -> Self {
        Self::raised(short_type_name::<E>(), message)
    }

    /// Capture a Rust error, keeping its type name as the kind
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        Self::raised(short_type_name::<E>(), error.to_string())
    }

    pub fn missing_argument(parameter: &str) -> Self {
        Self::raised(
            Self::MISSING_ARGUMENT,
            format!("missing required argument '{}'", parameter),
        )
    }

    pub(crate) fn panicked(message: impl Into<String>) -> Self {
        Self::raised(Self::PANIC, message).wrap()
    }

    /// Wrap this failure in an execution wrapper
    pub fn wrap(self) -> Self {
        Self::Execution(Box::new(self))
    }

    /// The original failure beneath any execution wrappers
    pub fn root_cause(&self) -> &HandlerError {
        let mut current = self;
        while let Self::Execution(inner) = current {
            current = &**inner;
        }
        current
    }

    pub fn kind(&self) -> &str {
        match self.root_cause() {
            Self::Raised { kind, .. } => kind,
            Self::Execution(_) => "",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self.root_cause() {
            Self::Raised { message, .. } => message.as_deref(),
            Self::Execution(_) => None,
        }
    }

    /// Message reported to the broker: the message, or the kind without one
    pub fn report_message(&self) -> &str {
        self.message().unwrap_or_else(|| self.kind())
    }

    /// Whether this failure is of the given kind
    ///
    /// A bare type name matches a path-qualified kind and vice versa.
    pub fn is_kind(&self, kind: &str) -> bool {
        let own = self.kind();
        own == kind || last_segment(own) == last_segment(kind)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(error: serde_json::Error) -> Self {
        Self::from_error(&error)
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(error: std::io::Error) -> Self {
        Self::from_error(&error)
    }
}

/// Type name of `T` without its module path or generic arguments
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    last_segment(base)
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}
