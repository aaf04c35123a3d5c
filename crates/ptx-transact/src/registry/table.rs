//! Per-version operation tables.

use std::borrow::{Borrow, Cow};
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::version::ApiLevel;
use crate::error::RegistryError;

// =============================================================================
// Keys
// =============================================================================

/// Stable string identifying a remote interface contract
/// (e.g. `android.os.IPowerManager`)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceToken(Cow<'static, str>);

impl InterfaceToken {
    /// Token for a compile-time constant descriptor
    pub const fn from_static(token: &'static str) -> Self {
        Self(Cow::Borrowed(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for InterfaceToken {
    fn from(token: &'static str) -> Self {
        Self::from_static(token)
    }
}

impl From<String> for InterfaceToken {
    fn from(token: String) -> Self {
        Self(Cow::Owned(token))
    }
}

impl Borrow<str> for InterfaceToken {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable symbolic name of an operation within an interface
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationName(Cow<'static, str>);

impl OperationName {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for OperationName {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for OperationName {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl Borrow<str> for OperationName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wire-level transaction code for one operation on one version
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub u32);

impl OperationId {
    pub fn code(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operation ids of one interface
pub type OperationMap = BTreeMap<OperationName, OperationId>;

// =============================================================================
// VersionedRegistry
// =============================================================================

/// Immutable `interface -> (operation -> id)` table for exactly one API level
///
/// An absent entry means the operation does not exist on this version and is
/// reported as `RegistryError::OperationNotPresent`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedRegistry {
    api_level: ApiLevel,
    /// Service constant name -> runtime service name
    services: BTreeMap<String, String>,
    methods: BTreeMap<InterfaceToken, OperationMap>,
}

impl VersionedRegistry {
    /// Build a table, checking that ids are unique within each interface
    pub fn from_parts(
        api_level: ApiLevel,
        services: BTreeMap<String, String>,
        methods: BTreeMap<InterfaceToken, OperationMap>,
    ) -> Result<Self, RegistryError> {
        for (interface, operations) in &methods {
            let mut seen: BTreeMap<OperationId, &OperationName> = BTreeMap::new();
            for (name, id) in operations {
                if let Some(other) = seen.insert(*id, name) {
                    return Err(RegistryError::invalid_table(
                        format!("level {}", api_level.get()),
                        format!(
                            "{} assigns id {} to both {} and {}",
                            interface, id, other, name
                        ),
                    ));
                }
            }
        }

        Ok(Self {
            api_level,
            services,
            methods,
        })
    }

    /// API level this table belongs to
    pub fn api_level(&self) -> ApiLevel {
        self.api_level
    }

    /// Resolve an operation to its wire id on this version
    pub fn lookup(&self, interface: &str, operation: &str) -> Result<OperationId, RegistryError> {
        self.methods
            .get(interface)
            .and_then(|ops| ops.get(operation))
            .copied()
            .ok_or_else(|| RegistryError::not_present(interface, operation, self.api_level.get()))
    }

    /// Whether the operation exists on this version
    pub fn contains(&self, interface: &str, operation: &str) -> bool {
        self.methods
            .get(interface)
            .is_some_and(|ops| ops.contains_key(operation))
    }

    /// Runtime service name for a service constant (e.g. `TELEPHONY_SERVICE` -> `phone`)
    pub fn service_name(&self, alias: &str) -> Option<&str> {
        self.services.get(alias).map(String::as_str)
    }

    /// Service constant -> runtime name pairs
    pub fn services(&self) -> impl Iterator<Item = (&str, &str)> {
        self.services.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Interfaces with at least one operation on this version
    pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceToken> {
        self.methods.keys()
    }

    /// Operations of one interface, if it exists on this version
    pub fn operations(&self, interface: &str) -> Option<&OperationMap> {
        self.methods.get(interface)
    }

    /// Total number of operations across all interfaces
    pub fn operation_count(&self) -> usize {
        self.methods.values().map(BTreeMap::len).sum()
    }
}
