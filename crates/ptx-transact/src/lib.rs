//! ptx Transaction Engine
//!
//! Issues raw binder transactions against platform services so a test case
//! can check whether an operation is guarded by an authorization check:
//!
//! - **Registry**: one immutable `interface -> operation -> id` table per API level
//! - **Parcel**: request encoding with an exact per-version header layout
//! - **Locator**: named service lookup, or bind-and-wait with a timeout
//! - **Invoker**: one call, outcome classified for the test case
//!
//! # Design Principles
//!
//! 1. **Exact tables**: only the table for the running level is used; a
//!    missing level is a configuration error, never a guess
//! 2. **No side effects on absence**: an operation missing on this level is
//!    reported before anything is sent
//! 3. **At most once**: no retries and no caching of outcomes
//! 4. **Explicit context**: tables and transport travel in a `TransactContext`
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          TransactContext                             │
//! │                                                                      │
//! │  ┌────────────────┐   ┌──────────────────────────────────────────┐   │
//! │  │  RegistrySet   │   │                Invoker                   │   │
//! │  │ built-in + dir │──>│ lookup -> encode -> resolve -> transact  │   │
//! │  │  select(level) │   │           -> decode_reply -> classify    │   │
//! │  └────────────────┘   └───────────────┬──────────────────────────┘   │
//! │                                       │                              │
//! │                         ┌─────────────┴────────────┐                 │
//! │                         │      ServiceLocator      │                 │
//! │                         │ by name │ bind-and-wait  │                 │
//! │                         └─────────────┬────────────┘                 │
//! └───────────────────────────────────────┼──────────────────────────────┘
//!                                         ▼
//!                            ptx_hal::Transport (driver / mock)
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod invoker;
pub mod locator;
pub mod parcel;
pub mod registry;
pub mod reply;


// Convenient re-exports at crate root
pub use config::{TransactConfig, API_LEVEL_ENV};
pub use context::TransactContext;
pub use error::{ConfigError, ContextError, InvokeError, LocatorError, ParcelError, RegistryError};
pub use invoker::{CallOptions, FailureCause, InvocationResult, Invoker, Target};
pub use locator::{HandoffSlot, ServiceHandle, ServiceLocator, DEFAULT_BIND_TIMEOUT};
pub use parcel::{encode, Arg, ArgKind, Parcel, Parcelable, TextMode};
pub use registry::{ApiLevel, OperationId, RegistrySet, VersionedRegistry};
pub use reply::{decode_reply, RemoteException, Reply, ReplyStatus};

pub use ptx_hal::{BinderHandle, BinderObject, ConnectionRequest, Transport};
