//! Error types for the object model.
//!
//! Providers report failures as a [`ProviderError`] carrying a 32-bit WBEM
//! status. The core lifts those into [`WmiError`] according to the operation
//! that failed, so a missing namespace surfaces as `Connection` while a missing
//! object surfaces as `ObjectNotFound`.

use std::fmt;

/// Result type for object model operations
pub type WmiResult<T> = Result<T, WmiError>;

// ============================================================================
// Status codes
// ============================================================================

/// WBEM status code reported by a provider.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub u32);

impl Status {
    /// Unspecified failure
    pub const FAILED: Status = Status(0x8004_1001);
    /// Object, class or property could not be found
    pub const NOT_FOUND: Status = Status(0x8004_1002);
    /// Caller lacks access to the namespace or object
    pub const ACCESS_DENIED: Status = Status(0x8004_1003);
    /// Value does not match the declared type
    pub const TYPE_MISMATCH: Status = Status(0x8004_1005);
    /// A parameter was not valid
    pub const INVALID_PARAMETER: Status = Status(0x8004_1008);
    /// Operation is not supported by the provider
    pub const NOT_SUPPORTED: Status = Status(0x8004_100C);
    /// Namespace does not exist
    pub const INVALID_NAMESPACE: Status = Status(0x8004_100E);
    /// Object is malformed
    pub const INVALID_OBJECT: Status = Status(0x8004_100F);
    /// Class does not exist
    pub const INVALID_CLASS: Status = Status(0x8004_1010);
    /// Query text could not be parsed or evaluated
    pub const INVALID_QUERY: Status = Status(0x8004_1017);
    /// An object with the same path already exists
    pub const ALREADY_EXISTS: Status = Status(0x8004_1019);
    /// Method does not exist on the class
    pub const INVALID_METHOD: Status = Status(0x8004_102E);
    /// Object path could not be parsed
    pub const INVALID_OBJECT_PATH: Status = Status(0x8004_103A);
    /// Handle was released or never issued
    pub const INVALID_HANDLE: Status = Status(0x8007_0006);

    /// Symbolic name of a well-known status
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Status::FAILED => "WBEM_E_FAILED",
            Status::NOT_FOUND => "WBEM_E_NOT_FOUND",
            Status::ACCESS_DENIED => "WBEM_E_ACCESS_DENIED",
            Status::TYPE_MISMATCH => "WBEM_E_TYPE_MISMATCH",
            Status::INVALID_PARAMETER => "WBEM_E_INVALID_PARAMETER",
            Status::NOT_SUPPORTED => "WBEM_E_NOT_SUPPORTED",
            Status::INVALID_NAMESPACE => "WBEM_E_INVALID_NAMESPACE",
            Status::INVALID_OBJECT => "WBEM_E_INVALID_OBJECT",
            Status::INVALID_CLASS => "WBEM_E_INVALID_CLASS",
            Status::INVALID_QUERY => "WBEM_E_INVALID_QUERY",
            Status::ALREADY_EXISTS => "WBEM_E_ALREADY_EXISTS",
            Status::INVALID_METHOD => "WBEM_E_INVALID_METHOD",
            Status::INVALID_OBJECT_PATH => "WBEM_E_INVALID_OBJECT_PATH",
            Status::INVALID_HANDLE => "E_HANDLE",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{:#010x} ({})", self.0, name),
            None => write!(f, "{:#010x}", self.0),
        }
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status({})", self)
    }
}

// ============================================================================
// Provider errors
// ============================================================================

/// Failure reported by a provider call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} [{status}]")]
pub struct ProviderError {
    /// Status code
    pub status: Status,
    /// Human readable detail
    pub message: String,
}

impl ProviderError {
    /// Create a provider error
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Shorthand for a released or unknown handle
    pub fn invalid_handle() -> Self {
        Self::new(Status::INVALID_HANDLE, "invalid handle")
    }

    /// Lift into a [`WmiError`], keeping handle failures as `HandleInvalid`.
    pub(crate) fn lift(self, wrap: impl FnOnce(ProviderError) -> WmiError) -> WmiError {
        if self.status == Status::INVALID_HANDLE {
            WmiError::HandleInvalid
        } else {
            wrap(self)
        }
    }
}

// ============================================================================
// WmiError
// ============================================================================

/// Errors surfaced by the object model.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WmiError {
    /// Namespace could not be opened
    #[error("Connection to namespace '{namespace}' failed: {source}")]
    Connection {
        /// Namespace path requested
        namespace: String,
        /// Provider failure
        source: ProviderError,
    },

    /// Query was malformed or failed while executing
    #[error("Query '{query}' failed: {source}")]
    QueryExecution {
        /// Query text or class name
        query: String,
        /// Provider failure
        source: ProviderError,
    },

    /// Named object does not exist
    #[error("Object not found: {path}")]
    ObjectNotFound {
        /// Object path or query
        path: String,
    },

    /// Named property does not exist on the object
    #[error("Property '{name}' not found in class '{class}'")]
    PropertyNotFound {
        /// Property name
        name: String,
        /// Class of the object
        class: String,
    },

    /// Named method does not exist on the class
    #[error("Method '{name}' not found in class '{class}'")]
    MethodNotFound {
        /// Method name
        name: String,
        /// Class of the object
        class: String,
    },

    /// Value conversion failed
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// Type cannot be represented
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Operation on a released handle, or on a handle whose service was closed
    #[error("Handle is invalid or has been released")]
    HandleInvalid,

    /// Method call failed
    #[error("Method '{method}' on '{path}' failed: {source}")]
    MethodInvocation {
        /// Object path the method was invoked on
        path: String,
        /// Method name
        method: String,
        /// Provider failure (carries the status code)
        source: ProviderError,
    },

    /// Method executor operation called in the wrong stage
    #[error("Cannot {operation} while the method executor is {stage}")]
    Sequence {
        /// Operation attempted
        operation: &'static str,
        /// Stage the executor was in
        stage: &'static str,
    },

    /// Any other provider failure
    #[error("Provider error: {0}")]
    Provider(ProviderError),
}

impl WmiError {
    /// Build a type mismatch error
    pub fn type_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        WmiError::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Provider status carried by this error, if any
    pub fn status(&self) -> Option<Status> {
        match self {
            WmiError::Connection { source, .. }
            | WmiError::QueryExecution { source, .. }
            | WmiError::MethodInvocation { source, .. }
            | WmiError::Provider(source) => Some(source.status),
            WmiError::HandleInvalid => Some(Status::INVALID_HANDLE),
            _ => None,
        }
    }
}

impl From<ProviderError> for WmiError {
    fn from(err: ProviderError) -> Self {
        err.lift(WmiError::Provider)
    }
}
