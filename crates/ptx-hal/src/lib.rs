//! Binder transport abstraction for ptx
//!
//! This crate defines the `Transport` trait that lets the invocation engine
//! drive raw binder transactions on different backends (the platform binder
//! driver, a recording mock for tests) by abstracting the few driver
//! operations the engine needs.
//!
//! # Backends
//!
//! - **Platform**: service manager lookup, `ioctl(BINDER_WRITE_READ)`, bind via
//!   the activity manager
//! - **Mock**: scripted replies and bind behaviours (`ptx-hal-mock`)

#![no_std]

extern crate alloc;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use ptx_ipc::{binder, status};

/// Callback invoked by the transport when a bound connection changes state
///
/// Called from a platform callback thread, never from the thread that
/// requested the binding.
pub type ConnectionCallback = Arc<dyn Fn(BindingId, ConnectionEvent) + Send + Sync>;

/// Binder transport trait
///
/// Implementations provide the driver operations for:
/// - Service manager lookup (global, never released)
/// - Synchronous transactions against a handle
/// - Bound connections (asynchronous, must be released)
/// - Debug output
pub trait Transport: Send + Sync + 'static {
    // === Service Manager ===

    /// Look up a globally registered service by name
    ///
    /// # Returns
    /// * `Ok(Some(handle))` - Service is registered
    /// * `Ok(None)` - No service with that name (a normal outcome)
    /// * `Err(HalError)` - The service manager could not be reached
    fn get_service(&self, name: &str) -> Result<Option<BinderHandle>, HalError>;

    // === Transactions ===

    /// Issue a synchronous transaction
    ///
    /// # Arguments
    /// * `handle` - Target binder
    /// * `code` - Operation id
    /// * `data` - Marshalled request parcel
    /// * `flags` - Transaction flags (`FLAG_ONEWAY`)
    ///
    /// # Returns
    /// * `Ok(reply)` - Raw reply parcel (empty for one-way calls)
    /// * `Err(HalError)` - Driver status error, no reply was produced
    fn transact(
        &self,
        handle: BinderHandle,
        code: u32,
        data: &[u8],
        flags: u32,
    ) -> Result<Vec<u8>, HalError>;

    // === Bound Connections ===

    /// Request a bound connection to a component
    ///
    /// Returns immediately. The handle arrives later through `callback`
    /// as `ConnectionEvent::Connected`, possibly never.
    ///
    /// # Returns
    /// * `Ok(binding)` - Binding requested, must be passed to `unbind_service`
    /// * `Err(HalError::BindFailed)` - The platform refused the request
    fn bind_service(
        &self,
        _request: &ConnectionRequest,
        _callback: ConnectionCallback,
    ) -> Result<BindingId, HalError> {
        Err(HalError::NotSupported)
    }

    /// Release a bound connection
    ///
    /// No further callbacks are delivered for `binding` after this returns.
    fn unbind_service(&self, _binding: BindingId) -> Result<(), HalError> {
        Err(HalError::NotSupported)
    }
}

// =============================================================================
// Handles and Objects
// =============================================================================

/// Driver-assigned reference to a remote binder
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BinderHandle(pub u32);

impl BinderHandle {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for BinderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle:{}", self.0)
    }
}

/// Identifier of a pending or established bound connection
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingId(pub u64);

/// A binder object passed as a call argument
///
/// Written to the parcel as a flat binder object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinderObject {
    /// A binder hosted in this process (token or callback stub)
    Local { ptr: u64, cookie: u64 },
    /// A reference to a binder hosted elsewhere
    Remote(BinderHandle),
}

impl BinderObject {
    /// Flat binder object type marker
    pub fn type_marker(&self) -> u32 {
        match self {
            BinderObject::Local { .. } => binder::BINDER_TYPE_BINDER,
            BinderObject::Remote(_) => binder::BINDER_TYPE_HANDLE,
        }
    }
}

// =============================================================================
// Bound Connections
// =============================================================================

/// Bind flag: create the service if it is not running
pub const BIND_AUTO_CREATE: u32 = 0x0001;

/// Description of the component to bind to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionRequest {
    /// Package hosting the service
    pub package: String,
    /// Fully qualified service class, if targeting an explicit component
    pub class: Option<String>,
    /// Intent action, if targeting by action
    pub action: Option<String>,
    /// Bind flags
    pub flags: u32,
}

impl ConnectionRequest {
    /// Create a request for an explicit component
    pub fn component(package: &str, class: &str) -> Self {
        Self {
            package: String::from(package),
            class: Some(String::from(class)),
            action: None,
            flags: BIND_AUTO_CREATE,
        }
    }

    /// Create a request resolved by action within a package
    pub fn action(package: &str, action: &str) -> Self {
        Self {
            package: String::from(package),
            class: None,
            action: Some(String::from(action)),
            flags: BIND_AUTO_CREATE,
        }
    }

    /// Replace the bind flags
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Key identifying the target: `package/class` or `package#action`
    pub fn target_key(&self) -> String {
        let mut key = self.package.clone();
        if let Some(class) = &self.class {
            key.push('/');
            key.push_str(class);
        } else if let Some(action) = &self.action {
            key.push('#');
            key.push_str(action);
        }
        key
    }
}

impl fmt::Display for ConnectionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target_key())
    }
}

/// State change reported for a bound connection
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The service is connected and reachable through `handle`
    Connected { handle: BinderHandle },
    /// The hosting process died; the binding stays registered
    Disconnected,
}

// =============================================================================
// Errors
// =============================================================================

/// Transport errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalError {
    /// Operation not supported by this backend
    NotSupported,
    /// The remote process died
    DeadObject,
    /// The transaction could not be delivered (buffer full, too large)
    FailedTransaction,
    /// The remote does not implement this operation id
    UnknownTransaction,
    /// The driver refused the caller
    PermissionDenied,
    /// The platform refused a bind request
    BindFailed,
    /// Malformed argument passed to the transport
    InvalidArgument,
    /// Any other driver status value
    Status(i32),
}

impl HalError {
    /// Map a driver status value to an error
    ///
    /// Returns `None` for `OK`.
    pub fn from_status(code: i32) -> Option<Self> {
        match code {
            status::OK => None,
            status::DEAD_OBJECT => Some(HalError::DeadObject),
            status::FAILED_TRANSACTION => Some(HalError::FailedTransaction),
            status::UNKNOWN_TRANSACTION => Some(HalError::UnknownTransaction),
            status::PERMISSION_DENIED => Some(HalError::PermissionDenied),
            status::BAD_VALUE => Some(HalError::InvalidArgument),
            status::INVALID_OPERATION => Some(HalError::NotSupported),
            other => Some(HalError::Status(other)),
        }
    }

    /// Driver status value for this error
    pub fn status(&self) -> i32 {
        match self {
            HalError::NotSupported => status::INVALID_OPERATION,
            HalError::DeadObject => status::DEAD_OBJECT,
            HalError::FailedTransaction => status::FAILED_TRANSACTION,
            HalError::UnknownTransaction => status::UNKNOWN_TRANSACTION,
            HalError::PermissionDenied => status::PERMISSION_DENIED,
            HalError::BindFailed => status::NAME_NOT_FOUND,
            HalError::InvalidArgument => status::BAD_VALUE,
            HalError::Status(code) => *code,
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalError::NotSupported => write!(f, "operation not supported"),
            HalError::DeadObject => write!(f, "remote binder is dead"),
            HalError::FailedTransaction => write!(f, "transaction failed"),
            HalError::UnknownTransaction => write!(f, "unknown transaction code"),
            HalError::PermissionDenied => write!(f, "permission denied by driver"),
            HalError::BindFailed => write!(f, "bind request refused"),
            HalError::InvalidArgument => write!(f, "invalid argument"),
            HalError::Status(code) => write!(f, "driver status {}", code),
        }
    }
}

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "std")]
impl std::error::Error for HalError {}
