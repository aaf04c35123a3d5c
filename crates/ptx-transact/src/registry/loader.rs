//! JSON table documents.
//!
//! Tables use the layout produced by the id discovery tool:
//!
//! ```json
//! {
//!   "api_level": 31,
//!   "services": { "POWER_SERVICE": "power" },
//!   "methods": { "android.os.IPowerManager": { "reboot": 30 } }
//! }
//! ```
//!
//! `api_level` may be omitted when the file is named `binderdb-<level>.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::table::{InterfaceToken, OperationId, OperationMap, VersionedRegistry};
use super::version::ApiLevel;
use crate::error::RegistryError;

/// File name prefix of table documents
pub const TABLE_FILE_PREFIX: &str = "binderdb-";

/// On-disk form of a `VersionedRegistry`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_level: Option<u32>,
    #[serde(default)]
    pub services: BTreeMap<String, String>,
    pub methods: BTreeMap<String, BTreeMap<String, u32>>,
}

impl TableDocument {
    /// Convert into a table, resolving the level from the document or `fallback`
    pub fn into_registry(
        self,
        origin: &str,
        fallback: Option<ApiLevel>,
    ) -> Result<VersionedRegistry, RegistryError> {
        let api_level = match (self.api_level.map(ApiLevel), fallback) {
            (Some(declared), Some(named)) if declared != named => {
                return Err(RegistryError::invalid_table(
                    origin,
                    format!(
                        "declares API level {} but is named for level {}",
                        declared.get(),
                        named.get()
                    ),
                ));
            }
            (Some(level), _) | (None, Some(level)) => level,
            (None, None) => {
                return Err(RegistryError::invalid_table(origin, "missing api_level"));
            }
        };

        let methods = self
            .methods
            .into_iter()
            .map(|(interface, ops)| {
                let ops: OperationMap = ops
                    .into_iter()
                    .map(|(name, id)| (name.into(), OperationId(id)))
                    .collect();
                (InterfaceToken::from(interface), ops)
            })
            .collect();

        VersionedRegistry::from_parts(api_level, self.services, methods)
    }
}

impl From<&VersionedRegistry> for TableDocument {
    fn from(table: &VersionedRegistry) -> Self {
        let methods = table
            .interfaces()
            .map(|interface| {
                let ops = table
                    .operations(interface.as_str())
                    .map(|ops| {
                        ops.iter()
                            .map(|(name, id)| (name.to_string(), id.code()))
                            .collect()
                    })
                    .unwrap_or_default();
                (interface.to_string(), ops)
            })
            .collect();

        Self {
            api_level: Some(table.api_level().get()),
            services: table
                .services()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            methods,
        }
    }
}

/// Parse a table document from a JSON string
pub fn parse_table(
    json: &str,
    origin: &str,
    fallback: Option<ApiLevel>,
) -> Result<VersionedRegistry, RegistryError> {
    let doc: TableDocument = serde_json::from_str(json)
        .map_err(|e| RegistryError::invalid_table(origin, e.to_string()))?;
    doc.into_registry(origin, fallback)
}

/// API level encoded in a `binderdb-<level>.json` file name
pub fn level_from_file_name(file_name: &str) -> Option<ApiLevel> {
    file_name
        .strip_prefix(TABLE_FILE_PREFIX)?
        .strip_suffix(".json")?
        .parse::<u32>()
        .ok()
        .map(ApiLevel)
}

/// File name holding the table for `level`
pub fn file_name_for(level: ApiLevel) -> String {
    format!("{}{}.json", TABLE_FILE_PREFIX, level.get())
}

/// Load one table document from disk
pub fn load_file(path: &Path) -> Result<VersionedRegistry, RegistryError> {
    let json = fs::read_to_string(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let fallback = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(level_from_file_name);
    let table = parse_table(&json, &path.display().to_string(), fallback)?;

    debug!(
        path = %path.display(),
        api_level = table.api_level().get(),
        operations = table.operation_count(),
        "loaded transaction table"
    );
    Ok(table)
}

/// Load every `binderdb-<level>.json` in a directory, sorted by level
///
/// Other files are ignored.
pub fn load_dir(dir: &Path) -> Result<Vec<VersionedRegistry>, RegistryError> {
    let io_err = |source| RegistryError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_table = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(level_from_file_name)
            .is_some();
        if is_table && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut tables = paths
        .iter()
        .map(|path| load_file(path))
        .collect::<Result<Vec<_>, _>>()?;
    tables.sort_by_key(VersionedRegistry::api_level);
    Ok(tables)
}
