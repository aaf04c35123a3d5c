//! Mock binder transport for testing ptx
//!
//! This provides a mock implementation of the `Transport` trait that can be
//! used for testing the invocation engine without a binder driver.
//!
//! - Services are registered by name and get sequential handles
//! - Replies are scripted per `(handle, code)`; unscripted calls succeed
//!   with an empty reply (`EX_NONE`)
//! - Every transaction is recorded so tests can assert on side effects
//! - Bind requests follow a per-target `BindBehavior`, delivered from a
//!   separate thread like a real platform callback

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use ptx_hal::{
    BinderHandle, BindingId, ConnectionCallback, ConnectionEvent, ConnectionRequest, HalError,
    Transport,
};
use ptx_ipc::{exception, transaction};

/// How the mock answers a bind request for a given target
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindBehavior {
    /// Deliver `Connected` right away from a callback thread
    Immediate(BinderHandle),
    /// Deliver `Connected` after a delay
    Delayed(BinderHandle, Duration),
    /// Accept the request but never connect
    Never,
    /// Refuse the request (`HalError::BindFailed`)
    Refuse,
}

/// A transaction observed by the mock
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedTransaction {
    pub handle: BinderHandle,
    pub code: u32,
    pub data: Vec<u8>,
    pub flags: u32,
}

#[derive(Clone, Debug)]
enum ScriptedReply {
    Reply(Vec<u8>),
    Error(HalError),
}

/// Simulated binding state
struct MockBinding {
    target: String,
    callback: ConnectionCallback,
}

/// Mock transport for unit testing
///
/// Safe to share across threads; all state sits behind mutexes or atomics.
pub struct MockTransport {
    /// Next handle to assign to a registered service
    next_handle: AtomicU32,
    /// Next binding id to assign
    next_binding: AtomicU64,
    /// Whether the service manager answers lookups
    service_manager_up: AtomicBool,
    /// Captured debug messages
    debug_log: Arc<Mutex<Vec<String>>>,
    /// Registered services (name -> handle)
    services: Mutex<BTreeMap<String, BinderHandle>>,
    /// Scripted replies per (handle, code)
    replies: Mutex<BTreeMap<(BinderHandle, u32), ScriptedReply>>,
    /// Every transaction issued, in order
    transactions: Mutex<Vec<RecordedTransaction>>,
    /// Bind behaviour per target key
    bind_behaviors: Mutex<BTreeMap<String, BindBehavior>>,
    /// Live bindings, shared with delivery threads
    bindings: Arc<Mutex<BTreeMap<BindingId, MockBinding>>>,
    /// Total bind requests accepted
    bind_requests: AtomicU64,
    /// Total successful unbinds
    unbinds: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    /// Create a new mock transport with no services
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU32::new(1),
            next_binding: AtomicU64::new(1),
            service_manager_up: AtomicBool::new(true),
            debug_log: Arc::new(Mutex::new(Vec::new())),
            services: Mutex::new(BTreeMap::new()),
            replies: Mutex::new(BTreeMap::new()),
            transactions: Mutex::new(Vec::new()),
            bind_behaviors: Mutex::new(BTreeMap::new()),
            bindings: Arc::new(Mutex::new(BTreeMap::new())),
            bind_requests: AtomicU64::new(0),
            unbinds: AtomicU64::new(0),
        }
    }

    // === Services ===

    /// Register a service and return its handle
    pub fn add_service(&self, name: &str) -> BinderHandle {
        let handle = self.allocate_handle();
        lock(&self.services).insert(name.to_string(), handle);
        handle
    }

    /// Remove a registered service
    pub fn remove_service(&self, name: &str) {
        lock(&self.services).remove(name);
    }

    /// Allocate a handle not tied to any service (for bound connections)
    pub fn allocate_handle(&self) -> BinderHandle {
        BinderHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst))
    }

    /// Make service manager lookups fail with `HalError::DeadObject`
    pub fn set_service_manager_available(&self, up: bool) {
        self.service_manager_up.store(up, Ordering::SeqCst);
    }

    // === Replies ===

    /// Script the raw reply parcel for a `(handle, code)` pair
    pub fn script_reply(&self, handle: BinderHandle, code: u32, reply: Vec<u8>) {
        lock(&self.replies).insert((handle, code), ScriptedReply::Reply(reply));
    }

    /// Script a driver error for a `(handle, code)` pair
    pub fn script_error(&self, handle: BinderHandle, code: u32, error: HalError) {
        lock(&self.replies).insert((handle, code), ScriptedReply::Error(error));
    }

    /// Get all recorded transactions
    pub fn transactions(&self) -> Vec<RecordedTransaction> {
        lock(&self.transactions).clone()
    }

    /// Get the number of recorded transactions
    pub fn transaction_count(&self) -> usize {
        lock(&self.transactions).len()
    }

    /// Get the most recent transaction
    pub fn last_transaction(&self) -> Option<RecordedTransaction> {
        lock(&self.transactions).last().cloned()
    }

    // === Bindings ===

    /// Set how bind requests for `target_key` are answered
    ///
    /// Targets without a behaviour are refused.
    pub fn set_bind_behavior(&self, target_key: &str, behavior: BindBehavior) {
        lock(&self.bind_behaviors).insert(target_key.to_string(), behavior);
    }

    /// Number of bindings requested and not yet released
    pub fn active_binding_count(&self) -> usize {
        lock(&self.bindings).len()
    }

    /// Total bind requests accepted
    pub fn bind_request_count(&self) -> u64 {
        self.bind_requests.load(Ordering::SeqCst)
    }

    /// Total bindings released
    pub fn unbind_count(&self) -> u64 {
        self.unbinds.load(Ordering::SeqCst)
    }

    /// Simulate the hosting process of a binding dying
    pub fn simulate_disconnect(&self, binding: BindingId) {
        let callback = lock(&self.bindings)
            .get(&binding)
            .map(|b| b.callback.clone());
        if let Some(callback) = callback {
            callback(binding, ConnectionEvent::Disconnected);
        }
    }

    // === Activity Log ===

    /// Every transact, bind and unbind seen so far, oldest first
    pub fn get_debug_log(&self) -> Vec<String> {
        lock(&self.debug_log).clone()
    }

    /// Check if a specific message was logged
    pub fn has_log_containing(&self, substr: &str) -> bool {
        lock(&self.debug_log).iter().any(|msg| msg.contains(substr))
    }

    fn log(&self, msg: String) {
        lock(&self.debug_log).push(msg);
    }

    fn deliver_later(&self, binding: BindingId, handle: BinderHandle, delay: Option<Duration>) {
        let bindings = Arc::clone(&self.bindings);
        let debug_log = Arc::clone(&self.debug_log);
        thread::spawn(move || {
            if let Some(delay) = delay {
                thread::sleep(delay);
            }
            // An unbound connection gets no callbacks
            let callback = lock(&bindings).get(&binding).map(|b| b.callback.clone());
            match callback {
                Some(callback) => {
                    lock(&debug_log).push(format!(
                        "[mock-transport] Connected binding {} to {}",
                        binding.0, handle
                    ));
                    callback(binding, ConnectionEvent::Connected { handle });
                }
                None => {
                    lock(&debug_log).push(format!(
                        "[mock-transport] Dropped delivery for released binding {}",
                        binding.0
                    ));
                }
            }
        });
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn get_service(&self, name: &str) -> Result<Option<BinderHandle>, HalError> {
        if !self.service_manager_up.load(Ordering::SeqCst) {
            return Err(HalError::DeadObject);
        }
        Ok(lock(&self.services).get(name).copied())
    }

    fn transact(
        &self,
        handle: BinderHandle,
        code: u32,
        data: &[u8],
        flags: u32,
    ) -> Result<Vec<u8>, HalError> {
        lock(&self.transactions).push(RecordedTransaction {
            handle,
            code,
            data: data.to_vec(),
            flags,
        });
        self.log(format!(
            "[mock-transport] Transact {} code {} ({} bytes)",
            handle,
            code,
            data.len()
        ));

        let scripted = lock(&self.replies).get(&(handle, code)).cloned();
        match scripted {
            Some(ScriptedReply::Error(err)) => Err(err),
            _ if flags & transaction::FLAG_ONEWAY != 0 => Ok(Vec::new()),
            Some(ScriptedReply::Reply(reply)) => Ok(reply),
            None => Ok(exception::EX_NONE.to_le_bytes().to_vec()),
        }
    }

    fn bind_service(
        &self,
        request: &ConnectionRequest,
        callback: ConnectionCallback,
    ) -> Result<BindingId, HalError> {
        let target = request.target_key();
        let behavior = lock(&self.bind_behaviors)
            .get(&target)
            .copied()
            .unwrap_or(BindBehavior::Refuse);

        if behavior == BindBehavior::Refuse {
            self.log(format!("[mock-transport] Refused bind to {}", target));
            return Err(HalError::BindFailed);
        }

        let binding = BindingId(self.next_binding.fetch_add(1, Ordering::SeqCst));
        lock(&self.bindings).insert(
            binding,
            MockBinding {
                target: target.clone(),
                callback,
            },
        );
        self.bind_requests.fetch_add(1, Ordering::SeqCst);
        self.log(format!("[mock-transport] Bind {} -> binding {}", target, binding.0));

        match behavior {
            BindBehavior::Immediate(handle) => self.deliver_later(binding, handle, None),
            BindBehavior::Delayed(handle, delay) => self.deliver_later(binding, handle, Some(delay)),
            BindBehavior::Never | BindBehavior::Refuse => {}
        }
        Ok(binding)
    }

    fn unbind_service(&self, binding: BindingId) -> Result<(), HalError> {
        match lock(&self.bindings).remove(&binding) {
            Some(released) => {
                self.unbinds.fetch_add(1, Ordering::SeqCst);
                self.log(format!(
                    "[mock-transport] Unbind {} (binding {})",
                    released.target, binding.0
                ));
                Ok(())
            }
            None => Err(HalError::InvalidArgument),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn channel_callback() -> (ConnectionCallback, mpsc::Receiver<(BindingId, ConnectionEvent)>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let callback: ConnectionCallback = Arc::new(move |binding, event| {
            let _ = lock(&tx).send((binding, event));
        });
        (callback, rx)
    }

    #[test]
    fn test_mock_transport_services() {
        let transport = MockTransport::new();

        let power = transport.add_service("power");
        let wifi = transport.add_service("wifi");

        assert_eq!(power.id(), 1);
        assert_eq!(wifi.id(), 2);
        assert_eq!(transport.get_service("power"), Ok(Some(power)));
        assert_eq!(transport.get_service("missing"), Ok(None));

        transport.remove_service("power");
        assert_eq!(transport.get_service("power"), Ok(None));
    }

    #[test]
    fn test_mock_transport_service_manager_down() {
        let transport = MockTransport::new();
        transport.add_service("power");
        transport.set_service_manager_available(false);

        assert_eq!(transport.get_service("power"), Err(HalError::DeadObject));
    }

    #[test]
    fn test_mock_transport_default_reply() {
        let transport = MockTransport::new();
        let handle = transport.add_service("power");

        let reply = transport.transact(handle, 7, b"data", 0).unwrap();
        assert_eq!(reply, vec![0, 0, 0, 0]);

        let recorded = transport.last_transaction().unwrap();
        assert_eq!(recorded.handle, handle);
        assert_eq!(recorded.code, 7);
        assert_eq!(recorded.data, b"data");
    }

    #[test]
    fn test_mock_transport_scripted_reply_and_error() {
        let transport = MockTransport::new();
        let handle = transport.add_service("power");

        transport.script_reply(handle, 1, vec![0xff, 0xff, 0xff, 0xff]);
        transport.script_error(handle, 2, HalError::DeadObject);

        assert_eq!(transport.transact(handle, 1, &[], 0), Ok(vec![0xff; 4]));
        assert_eq!(transport.transact(handle, 2, &[], 0), Err(HalError::DeadObject));
        assert_eq!(transport.transaction_count(), 2);
    }

    #[test]
    fn test_mock_transport_oneway_has_empty_reply() {
        let transport = MockTransport::new();
        let handle = transport.add_service("power");
        transport.script_reply(handle, 1, vec![1, 2, 3, 4]);

        let reply = transport.transact(handle, 1, &[], transaction::FLAG_ONEWAY).unwrap();
        assert!(reply.is_empty());
    }

    #[test]
    fn test_mock_transport_bind_immediate() {
        let transport = MockTransport::new();
        let handle = transport.allocate_handle();
        let request = ConnectionRequest::component("com.example", "com.example.Svc");
        transport.set_bind_behavior(&request.target_key(), BindBehavior::Immediate(handle));

        let (callback, rx) = channel_callback();
        let binding = transport.bind_service(&request, callback).unwrap();

        let (got_binding, event) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(got_binding, binding);
        assert_eq!(event, ConnectionEvent::Connected { handle });
        assert_eq!(transport.active_binding_count(), 1);

        transport.unbind_service(binding).unwrap();
        assert_eq!(transport.active_binding_count(), 0);
        assert_eq!(transport.unbind_count(), 1);

        // Unbinding twice is an error
        assert_eq!(transport.unbind_service(binding), Err(HalError::InvalidArgument));
    }

    #[test]
    fn test_mock_transport_bind_refused_by_default() {
        let transport = MockTransport::new();
        let request = ConnectionRequest::component("com.example", "com.example.Unknown");
        let (callback, _rx) = channel_callback();

        assert_eq!(transport.bind_service(&request, callback), Err(HalError::BindFailed));
        assert_eq!(transport.bind_request_count(), 0);
        assert!(transport.has_log_containing("Refused bind"));
    }

    #[test]
    fn test_mock_transport_never_connects() {
        let transport = MockTransport::new();
        let request = ConnectionRequest::component("com.example", "com.example.Slow");
        transport.set_bind_behavior(&request.target_key(), BindBehavior::Never);

        let (callback, rx) = channel_callback();
        let binding = transport.bind_service(&request, callback).unwrap();

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        transport.unbind_service(binding).unwrap();
    }

    #[test]
    fn test_mock_transport_simulated_disconnect() {
        let transport = MockTransport::new();
        let request = ConnectionRequest::component("com.example", "com.example.Svc");
        transport.set_bind_behavior(&request.target_key(), BindBehavior::Never);

        let (callback, rx) = channel_callback();
        let binding = transport.bind_service(&request, callback).unwrap();
        transport.simulate_disconnect(binding);

        let (_, event) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event, ConnectionEvent::Disconnected);
    }

    #[test]
    fn test_mock_transport_activity_log() {
        let transport = MockTransport::new();
        let handle = transport.add_service("power");

        transport.transact(handle, 30, &[0; 8], 0).unwrap();
        let request = ConnectionRequest::component("com.example", "com.example.Unknown");
        let (callback, _rx) = channel_callback();
        assert!(transport.bind_service(&request, callback).is_err());

        let log = transport.get_debug_log();
        assert_eq!(log.len(), 2);
        assert!(log[0].contains("code 30 (8 bytes)"));
        assert!(transport.has_log_containing("Refused bind to com.example/"));
        assert!(!transport.has_log_containing("Unbind"));
    }
}
