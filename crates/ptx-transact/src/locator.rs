//! Service locator.
//!
//! Produces a handle to the target of a call in one of two ways:
//!
//! - **By name**: a synchronous service manager lookup. The handle is global
//!   and needs no release. An unregistered name is reported as
//!   `LocatorError::ServiceUnavailable`, which callers treat as a reason to
//!   bypass the test rather than a failure.
//! - **By connection request**: asks the platform to bind a component and
//!   blocks until the connection callback delivers the handle or the
//!   timeout elapses. The binding is released when the handle is dropped, or
//!   right away on timeout.
//!
//! The callback and the waiter meet in a `HandoffSlot`: written at most once
//! by the callback thread, consumed at most once by the waiter.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(all(test, feature = "loom"))]
use loom::sync::{Condvar, Mutex};
#[cfg(not(all(test, feature = "loom")))]
use std::sync::{Condvar, Mutex};

use ptx_hal::{
    BinderHandle, BindingId, ConnectionCallback, ConnectionEvent, ConnectionRequest, HalError,
    Transport,
};
use tracing::{debug, info, warn};

use crate::error::LocatorError;

/// Default wait for a bound connection
pub const DEFAULT_BIND_TIMEOUT: Duration = Duration::from_millis(5000);

// =============================================================================
// HandoffSlot
// =============================================================================

#[derive(Debug)]
enum SlotState<T> {
    Empty,
    Filled(T),
    Taken,
    /// The waiter timed out; later deliveries are refused
    Abandoned,
}

/// Single-value, single-writer, single-reader rendezvous
pub struct HandoffSlot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> HandoffSlot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Empty),
            ready: Condvar::new(),
        }
    }

    /// Deliver the value and wake the waiter
    ///
    /// # Returns
    /// * `Ok(())` - Value stored
    /// * `Err(value)` - Slot already written, consumed or abandoned
    pub fn put(&self, value: T) -> Result<(), T> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match *state {
            SlotState::Empty => {
                *state = SlotState::Filled(value);
                self.ready.notify_one();
                Ok(())
            }
            _ => Err(value),
        }
    }

    /// Wait for the value until `timeout` elapses
    ///
    /// Returns `None` on timeout (or if the value was already consumed) and
    /// abandons the slot so that a late `put` is refused.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            match std::mem::replace(&mut *state, SlotState::Taken) {
                SlotState::Filled(value) => return Some(value),
                SlotState::Empty => *state = SlotState::Empty,
                other => {
                    *state = other;
                    return None;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                *state = SlotState::Abandoned;
                return None;
            }
            state = match self.ready.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// Whether the waiter gave up
    pub fn is_abandoned(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        matches!(*state, SlotState::Abandoned)
    }
}

impl<T> Default for HandoffSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ServiceHandle
// =============================================================================

struct Binding {
    id: BindingId,
    target: String,
    transport: Arc<dyn Transport>,
}

/// Handle to the target of a call
///
/// Bound handles release their binding exactly once, on `release` or drop.
pub struct ServiceHandle {
    handle: BinderHandle,
    binding: Option<Binding>,
}

impl ServiceHandle {
    /// Handle that needs no release (service manager lookup or caller supplied)
    pub fn global(handle: BinderHandle) -> Self {
        Self {
            handle,
            binding: None,
        }
    }

    fn bound(handle: BinderHandle, binding: Binding) -> Self {
        Self {
            handle,
            binding: Some(binding),
        }
    }

    pub fn handle(&self) -> BinderHandle {
        self.handle
    }

    /// Whether this handle holds a binding that must be released
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Release the binding now, reporting any transport error
    pub fn release(mut self) -> Result<(), HalError> {
        self.release_binding()
    }

    fn release_binding(&mut self) -> Result<(), HalError> {
        match self.binding.take() {
            Some(binding) => {
                debug!(component = %binding.target, binding = binding.id.0, "releasing binding");
                binding.transport.unbind_service(binding.id)
            }
            None => Ok(()),
        }
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        if let Err(e) = self.release_binding() {
            warn!(handle = %self.handle, error = %e, "failed to release binding");
        }
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("handle", &self.handle)
            .field("bound", &self.binding.as_ref().map(|b| b.target.as_str()))
            .finish()
    }
}

// =============================================================================
// ServiceLocator
// =============================================================================

/// Resolves call targets against a transport
#[derive(Clone)]
pub struct ServiceLocator {
    transport: Arc<dyn Transport>,
    bind_timeout: Duration,
}

impl ServiceLocator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            bind_timeout: DEFAULT_BIND_TIMEOUT,
        }
    }

    /// Replace the default bind timeout
    pub fn with_bind_timeout(mut self, timeout: Duration) -> Self {
        self.bind_timeout = timeout;
        self
    }

    pub fn bind_timeout(&self) -> Duration {
        self.bind_timeout
    }

    /// Look up a globally registered service
    ///
    /// # Returns
    /// * `Ok(handle)` - Global handle, no release needed
    /// * `Err(LocatorError::ServiceUnavailable)` - No such service on this device
    /// * `Err(LocatorError::Transport)` - The service manager failed
    pub fn resolve_by_name(&self, name: &str) -> Result<ServiceHandle, LocatorError> {
        match self.transport.get_service(name)? {
            Some(handle) => {
                debug!(service = name, %handle, "resolved service");
                Ok(ServiceHandle::global(handle))
            }
            None => {
                info!(service = name, "service not available");
                Err(LocatorError::ServiceUnavailable {
                    service: name.to_string(),
                })
            }
        }
    }

    /// Bind a component and wait for its handle, using the default timeout
    pub fn resolve_bound(&self, request: &ConnectionRequest) -> Result<ServiceHandle, LocatorError> {
        self.resolve_by_intent(request, self.bind_timeout)
    }

    /// Bind a component and wait up to `timeout` for its handle
    ///
    /// On timeout the pending binding is released before returning and any
    /// later connection is ignored.
    pub fn resolve_by_intent(
        &self,
        request: &ConnectionRequest,
        timeout: Duration,
    ) -> Result<ServiceHandle, LocatorError> {
        let target = request.target_key();
        let slot: Arc<HandoffSlot<BinderHandle>> = Arc::new(HandoffSlot::new());

        let callback: ConnectionCallback = {
            let slot = Arc::clone(&slot);
            let target = target.clone();
            Arc::new(move |binding, event| match event {
                ConnectionEvent::Connected { handle } => {
                    debug!(component = %target, binding = binding.0, %handle, "service connected");
                    if slot.put(handle).is_err() {
                        debug!(component = %target, binding = binding.0, "ignoring late connection");
                    }
                }
                ConnectionEvent::Disconnected => {
                    info!(component = %target, binding = binding.0, "service disconnected");
                }
            })
        };

        let binding = self
            .transport
            .bind_service(request, callback)
            .map_err(|source| LocatorError::BindFailed {
                target: target.clone(),
                source,
            })?;

        match slot.wait_timeout(timeout) {
            Some(handle) => Ok(ServiceHandle::bound(
                handle,
                Binding {
                    id: binding,
                    target,
                    transport: Arc::clone(&self.transport),
                },
            )),
            None => {
                warn!(component = %target, timeout_ms = timeout.as_millis() as u64, "bind timed out");
                if let Err(e) = self.transport.unbind_service(binding) {
                    warn!(component = %target, error = %e, "failed to release timed out binding");
                }
                Err(LocatorError::ConnectTimeout {
                    target,
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}

impl fmt::Debug for ServiceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceLocator")
            .field("bind_timeout", &self.bind_timeout)
            .finish_non_exhaustive()
    }
}
