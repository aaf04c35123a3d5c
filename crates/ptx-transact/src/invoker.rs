//! Invoker.
//!
//! Issues one raw transaction and classifies the outcome:
//!
//! ```text
//! lookup id ──absent──> UnsupportedOnVersion      (nothing sent)
//!    │
//! encode args
//!    │
//! resolve target ──missing──> ServiceUnavailable  (nothing sent)
//!    │          └──timeout/refused──> TransportFailure
//! transact ──status error──> TransportFailure
//!    │
//! decode marker ──EX_SECURITY──> AuthorizationDenied
//!    │          └──other──> TransportFailure
//! Success
//! ```
//!
//! Every call is attempted at most once; nothing is retried or cached.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ptx_hal::{BinderHandle, ConnectionRequest, HalError, Transport};
use ptx_ipc::transaction;
use tracing::{debug, info, warn};

use crate::error::{InvokeError, LocatorError, ParcelError};
use crate::locator::{ServiceHandle, ServiceLocator};
use crate::parcel::{encode, Arg, TextMode};
use crate::registry::{ApiLevel, VersionedRegistry};
use crate::reply::{decode_reply, RemoteException, Reply, ReplyStatus};

// =============================================================================
// Call Inputs
// =============================================================================

/// Where a call is sent
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Service manager name, or a service constant from the table's `services` map
    Name(String),
    /// Component to bind; the binding is released after the call
    Intent(ConnectionRequest),
    /// Already-resolved handle
    Handle(BinderHandle),
}

impl Target {
    pub fn service(name: impl Into<String>) -> Self {
        Target::Name(name.into())
    }
}

impl From<ConnectionRequest> for Target {
    fn from(request: ConnectionRequest) -> Self {
        Target::Intent(request)
    }
}

impl From<BinderHandle> for Target {
    fn from(handle: BinderHandle) -> Self {
        Target::Handle(handle)
    }
}

/// Per-call options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// How text arguments are written
    pub text_mode: TextMode,
    /// Send without waiting for a reply
    pub oneway: bool,
}

impl CallOptions {
    /// Options for operations taking `CharSequence` text
    pub fn char_sequence() -> Self {
        Self {
            text_mode: TextMode::CharSequence,
            oneway: false,
        }
    }

    fn flags(&self) -> u32 {
        if self.oneway {
            transaction::FLAG_ONEWAY
        } else {
            0
        }
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Why a call did not complete
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureCause {
    /// The bound connection did not arrive in time
    ConnectTimeout { target: String, timeout_ms: u64 },
    /// The platform refused to bind
    BindFailed { target: String, error: HalError },
    /// The service manager failed
    ServiceManager(HalError),
    /// The driver returned an error status for the transaction
    Transport(HalError),
    /// The remote threw something other than a security exception
    RemoteException(RemoteException),
    /// The reply could not be decoded
    MalformedReply(ParcelError),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::ConnectTimeout { target, timeout_ms } => {
                write!(f, "failed to connect to {} within {} ms", target, timeout_ms)
            }
            FailureCause::BindFailed { target, error } => {
                write!(f, "bind to {} refused: {}", target, error)
            }
            FailureCause::ServiceManager(e) => write!(f, "service manager failed: {}", e),
            FailureCause::Transport(e) => write!(f, "transaction failed: {}", e),
            FailureCause::RemoteException(e) => write!(f, "remote exception: {}", e),
            FailureCause::MalformedReply(e) => write!(f, "malformed reply: {}", e),
        }
    }
}

impl From<LocatorError> for FailureCause {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::ConnectTimeout { target, timeout_ms } => {
                FailureCause::ConnectTimeout { target, timeout_ms }
            }
            LocatorError::BindFailed { target, source } => FailureCause::BindFailed {
                target,
                error: source,
            },
            LocatorError::Transport(e) => FailureCause::ServiceManager(e),
            LocatorError::ServiceUnavailable { .. } => {
                FailureCause::ServiceManager(HalError::Status(ptx_ipc::status::NAME_NOT_FOUND))
            }
        }
    }
}

/// Classified outcome of one call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvocationResult {
    /// The remote accepted the call
    Success(Reply),
    /// The remote rejected the caller for lacking authorization
    AuthorizationDenied(RemoteException),
    /// The operation has no id on this version; nothing was sent
    UnsupportedOnVersion {
        interface: String,
        operation: String,
        api_level: ApiLevel,
    },
    /// The named service is not registered on this device; nothing was sent
    ServiceUnavailable { service: String },
    /// Anything else
    TransportFailure(FailureCause),
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationResult::Success(_))
    }

    pub fn is_authorization_denied(&self) -> bool {
        matches!(self, InvocationResult::AuthorizationDenied(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, InvocationResult::UnsupportedOnVersion { .. })
    }

    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, InvocationResult::ServiceUnavailable { .. })
    }

    pub fn is_transport_failure(&self) -> bool {
        matches!(self, InvocationResult::TransportFailure(_))
    }

    /// Short outcome label for reports
    pub fn label(&self) -> &'static str {
        match self {
            InvocationResult::Success(_) => "success",
            InvocationResult::AuthorizationDenied(_) => "authorization-denied",
            InvocationResult::UnsupportedOnVersion { .. } => "unsupported-on-version",
            InvocationResult::ServiceUnavailable { .. } => "service-unavailable",
            InvocationResult::TransportFailure(_) => "transport-failure",
        }
    }

    /// Convert into the error shape test cases consume
    ///
    /// Authorization denials keep the remote cause verbatim. Unavailable
    /// services and operations absent on this version become bypass
    /// signals. Everything else is an unexpected invocation failure.
    pub fn into_result(self) -> Result<Reply, InvokeError> {
        match self {
            InvocationResult::Success(reply) => Ok(reply),
            InvocationResult::AuthorizationDenied(cause) => {
                Err(InvokeError::AuthorizationDenied(cause))
            }
            InvocationResult::ServiceUnavailable { service } => {
                Err(InvokeError::ServiceUnavailable { service })
            }
            InvocationResult::UnsupportedOnVersion {
                interface,
                operation,
                api_level,
            } => Err(InvokeError::UnsupportedOnVersion {
                interface,
                operation,
                api_level,
            }),
            InvocationResult::TransportFailure(cause) => Err(InvokeError::unexpected(cause.to_string())),
        }
    }
}

// =============================================================================
// Invoker
// =============================================================================

/// Issues calls against one version's table
#[derive(Clone)]
pub struct Invoker {
    registry: Arc<VersionedRegistry>,
    locator: ServiceLocator,
    transport: Arc<dyn Transport>,
    defaults: CallOptions,
}

impl Invoker {
    pub fn new(registry: Arc<VersionedRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            locator: ServiceLocator::new(Arc::clone(&transport)),
            transport,
            defaults: CallOptions::default(),
        }
    }

    /// Replace the bind timeout used for `Target::Intent`
    pub fn with_bind_timeout(mut self, timeout: Duration) -> Self {
        self.locator = self.locator.with_bind_timeout(timeout);
        self
    }

    /// Replace the options used by `call`
    pub fn with_defaults(mut self, defaults: CallOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn registry(&self) -> &VersionedRegistry {
        &self.registry
    }

    pub fn locator(&self) -> &ServiceLocator {
        &self.locator
    }

    /// Call with the default options
    pub fn call(
        &self,
        interface: &str,
        operation: &str,
        target: &Target,
        args: &[Arg],
    ) -> InvocationResult {
        self.call_with(interface, operation, target, args, self.defaults)
    }

    /// Call with `CharSequence` text
    pub fn call_char_sequence(
        &self,
        interface: &str,
        operation: &str,
        target: &Target,
        args: &[Arg],
    ) -> InvocationResult {
        let options = CallOptions {
            text_mode: TextMode::CharSequence,
            ..self.defaults
        };
        self.call_with(interface, operation, target, args, options)
    }

    /// Call with explicit options
    pub fn call_with(
        &self,
        interface: &str,
        operation: &str,
        target: &Target,
        args: &[Arg],
        options: CallOptions,
    ) -> InvocationResult {
        let api_level = self.registry.api_level();

        // Presence first; an absent operation must not touch the transport
        let id = match self.registry.lookup(interface, operation) {
            Ok(id) => id,
            Err(_) => {
                info!(
                    interface,
                    operation,
                    api_level = api_level.get(),
                    "operation not present on this version"
                );
                return InvocationResult::UnsupportedOnVersion {
                    interface: interface.to_string(),
                    operation: operation.to_string(),
                    api_level,
                };
            }
        };

        let data = encode(interface, api_level, args, options.text_mode);

        let service = match self.resolve(target) {
            Ok(service) => service,
            Err(LocatorError::ServiceUnavailable { service }) => {
                return InvocationResult::ServiceUnavailable { service };
            }
            Err(e) => {
                warn!(interface, operation, error = %e, "failed to resolve target");
                return InvocationResult::TransportFailure(e.into());
            }
        };

        debug!(
            interface,
            operation,
            code = id.code(),
            handle = %service.handle(),
            bytes = data.len(),
            oneway = options.oneway,
            "transact"
        );
        let reply = self
            .transport
            .transact(service.handle(), id.code(), data.as_bytes(), options.flags());
        // Bound connections are released here, after the single attempt
        drop(service);

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                warn!(interface, operation, error = %e, "transaction failed");
                return InvocationResult::TransportFailure(FailureCause::Transport(e));
            }
        };

        match decode_reply(reply) {
            Ok(ReplyStatus::Ok(reply)) => InvocationResult::Success(reply),
            Ok(ReplyStatus::Exception(ex)) if ex.is_security() => {
                debug!(interface, operation, message = ?ex.message, "authorization denied");
                InvocationResult::AuthorizationDenied(ex)
            }
            Ok(ReplyStatus::Exception(ex)) => {
                warn!(interface, operation, exception = %ex, "remote exception");
                InvocationResult::TransportFailure(FailureCause::RemoteException(ex))
            }
            Err(e) => InvocationResult::TransportFailure(FailureCause::MalformedReply(e)),
        }
    }

    fn resolve(&self, target: &Target) -> Result<ServiceHandle, LocatorError> {
        match target {
            Target::Name(name) => {
                let name = self.registry.service_name(name).unwrap_or(name.as_str());
                self.locator.resolve_by_name(name)
            }
            Target::Intent(request) => self.locator.resolve_bound(request),
            Target::Handle(handle) => Ok(ServiceHandle::global(*handle)),
        }
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("api_level", &self.registry.api_level())
            .field("locator", &self.locator)
            .field("defaults", &self.defaults)
            .finish()
    }
}
