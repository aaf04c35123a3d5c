//! Error types for the transaction engine.

use std::path::PathBuf;

use ptx_hal::HalError;
use thiserror::Error;

use crate::registry::ApiLevel;
use crate::reply::RemoteException;

/// Errors from building or querying versioned registries.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No table exists for the requested version
    #[error("no transaction table for API level {api_level} (available: {available:?})")]
    UnsupportedVersion { api_level: u32, available: Vec<u32> },

    /// The table for this version has no entry for the operation
    #[error("{interface}.{operation} has no transaction id on API level {api_level}")]
    OperationNotPresent {
        interface: String,
        operation: String,
        api_level: u32,
    },

    /// A table for this version was already installed
    #[error("a transaction table for API level {api_level} is already installed")]
    DuplicateVersion { api_level: u32 },

    /// A table document is malformed
    #[error("invalid transaction table {origin}: {reason}")]
    InvalidTable { origin: String, reason: String },

    /// A table file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RegistryError {
    /// Create an invalid table error.
    pub fn invalid_table(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTable {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    /// Create an operation-not-present error.
    pub fn not_present(interface: &str, operation: &str, api_level: u32) -> Self {
        Self::OperationNotPresent {
            interface: interface.to_string(),
            operation: operation.to_string(),
            api_level,
        }
    }

    /// Check if this is a configuration error (no table for the version).
    pub fn is_unsupported_version(&self) -> bool {
        matches!(self, RegistryError::UnsupportedVersion { .. })
    }

    /// Check if this is a missing entry in an otherwise valid table.
    pub fn is_not_present(&self) -> bool {
        matches!(self, RegistryError::OperationNotPresent { .. })
    }
}

/// Errors from reading a parcel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParcelError {
    /// Read past the end of the parcel
    #[error("parcel underflow at {position}: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        position: usize,
        needed: usize,
        remaining: usize,
    },

    /// A length prefix was negative (other than the null marker) or too large
    #[error("invalid length {0} in parcel")]
    InvalidLength(i32),

    /// A string was not valid UTF-16
    #[error("invalid UTF-16 string in parcel")]
    InvalidUtf16,
}

/// Errors from resolving a call target.
#[derive(Debug, Error)]
pub enum LocatorError {
    /// The service manager has no service with this name
    #[error("service '{service}' is not available on this device")]
    ServiceUnavailable { service: String },

    /// The bound connection did not arrive in time
    #[error("timed out after {timeout_ms} ms waiting for {target} to connect")]
    ConnectTimeout { target: String, timeout_ms: u64 },

    /// The platform refused the bind request
    #[error("bind to {target} refused: {source}")]
    BindFailed {
        target: String,
        #[source]
        source: HalError,
    },

    /// The service manager itself failed
    #[error("service manager lookup failed: {0}")]
    Transport(#[from] HalError),
}

impl LocatorError {
    /// Check if the target service is simply absent on this device.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, LocatorError::ServiceUnavailable { .. })
    }

    /// Check if this is a bind timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LocatorError::ConnectTimeout { .. })
    }
}

/// Errors surfaced to a test case from an invocation.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The remote rejected the caller; the cause is kept verbatim
    #[error("{0}")]
    AuthorizationDenied(RemoteException),

    /// The target service does not exist on this device; the test should be bypassed
    #[error("service '{service}' is not available on this device")]
    ServiceUnavailable { service: String },

    /// The operation has no id on this version; the test should be skipped
    #[error("{interface}.{operation} does not exist on API level {api_level}")]
    UnsupportedOnVersion {
        interface: String,
        operation: String,
        api_level: ApiLevel,
    },

    /// Anything else that kept the call from completing
    #[error("unexpected invocation failure: {reason}")]
    UnexpectedInvocationFailure { reason: String },
}

impl InvokeError {
    /// Create an unexpected invocation failure.
    pub fn unexpected(reason: impl Into<String>) -> Self {
        Self::UnexpectedInvocationFailure {
            reason: reason.into(),
        }
    }

    /// Check if the remote rejected the caller for lacking authorization.
    pub fn is_authorization_denied(&self) -> bool {
        matches!(self, InvokeError::AuthorizationDenied(_))
    }

    /// Check if the operation is absent on this version.
    pub fn is_skip(&self) -> bool {
        matches!(self, InvokeError::UnsupportedOnVersion { .. })
    }

    /// Check if the test should be bypassed rather than failed.
    pub fn is_bypass(&self) -> bool {
        matches!(
            self,
            InvokeError::ServiceUnavailable { .. } | InvokeError::UnsupportedOnVersion { .. }
        )
    }
}

/// Errors from loading the engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON for `TransactConfig`
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds an unusable value
    #[error("invalid config field '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    /// Create an invalid field error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors from building a `TransactContext`.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_predicates() {
        let err = RegistryError::UnsupportedVersion {
            api_level: 30,
            available: vec![31],
        };
        assert!(err.is_unsupported_version());
        assert!(!err.is_not_present());

        let err = RegistryError::not_present("android.os.IPowerManager", "reboot", 31);
        assert!(err.is_not_present());
        assert_eq!(
            err.to_string(),
            "android.os.IPowerManager.reboot has no transaction id on API level 31"
        );
    }

    #[test]
    fn test_locator_error_predicates() {
        let err = LocatorError::ServiceUnavailable {
            service: "wifi".to_string(),
        };
        assert!(err.is_unavailable());
        assert!(!err.is_timeout());

        let err = LocatorError::ConnectTimeout {
            target: "com.example/.Svc".to_string(),
            timeout_ms: 5000,
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("5000 ms"));
    }

    #[test]
    fn test_invoke_error_construction() {
        let err = InvokeError::unexpected("dead object");
        match &err {
            InvokeError::UnexpectedInvocationFailure { reason, .. } => {
                assert_eq!(reason, "dead object")
            }
            _ => panic!("Expected UnexpectedInvocationFailure"),
        }
        assert!(!err.is_authorization_denied());
        assert!(!err.is_bypass());
        assert!(!err.is_skip());
    }

    #[test]
    fn test_unsupported_on_version_is_skip() {
        let err = InvokeError::UnsupportedOnVersion {
            interface: "android.os.IPowerManager".to_string(),
            operation: "shutdown".to_string(),
            api_level: ApiLevel::P,
        };
        assert!(err.is_skip());
        assert!(err.is_bypass());
        assert!(!err.is_authorization_denied());
        assert!(err.to_string().starts_with("android.os.IPowerManager.shutdown does not exist"));

        let err = InvokeError::ServiceUnavailable {
            service: "wifi".to_string(),
        };
        assert!(err.is_bypass());
        assert!(!err.is_skip());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("bind_timeout_ms", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "invalid config field 'bind_timeout_ms': must be greater than zero"
        );
    }
}
