//! Version registry and selector.
//!
//! Maps `(interface, operation)` to the wire id used by one platform
//! release. Ids are not stable across releases, so each API level carries
//! its own table and the selector refuses to guess for unknown levels.
//!
//! | Lookup | Result |
//! |--------|--------|
//! | Level has no table | `RegistryError::UnsupportedVersion` (configuration error) |
//! | Table has no entry | `RegistryError::OperationNotPresent` (testable state) |
//! | Entry present | `OperationId` |

mod builtin;
mod loader;
mod selector;
mod table;
mod version;

pub use builtin::{builtin_levels, builtin_table, builtin_tables};
pub use loader::{
    file_name_for, level_from_file_name, load_dir, load_file, parse_table, TableDocument,
    TABLE_FILE_PREFIX,
};
pub use selector::RegistrySet;
pub use table::{InterfaceToken, OperationId, OperationMap, OperationName, VersionedRegistry};
pub use version::ApiLevel;
