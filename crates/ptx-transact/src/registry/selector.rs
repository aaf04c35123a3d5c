//! Selecting the table for the build under test.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use super::builtin::builtin_tables;
use super::loader::load_dir;
use super::table::VersionedRegistry;
use super::version::ApiLevel;
use crate::error::RegistryError;

/// All installed tables, at most one per API level
///
/// Tables are never merged: selecting a level returns exactly the table
/// authored for it, or a configuration error.
#[derive(Clone, Debug, Default)]
pub struct RegistrySet {
    tables: BTreeMap<ApiLevel, Arc<VersionedRegistry>>,
}

impl RegistrySet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set holding the built-in tables
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut set = Self::new();
        for table in builtin_tables()? {
            set.insert(table)?;
        }
        Ok(set)
    }

    /// Install one table
    ///
    /// # Returns
    /// * `Err(RegistryError::DuplicateVersion)` - A table for this level exists
    pub fn insert(&mut self, table: VersionedRegistry) -> Result<(), RegistryError> {
        let level = table.api_level();
        if self.tables.contains_key(&level) {
            return Err(RegistryError::DuplicateVersion {
                api_level: level.get(),
            });
        }
        debug!(api_level = level.get(), "installed transaction table");
        self.tables.insert(level, Arc::new(table));
        Ok(())
    }

    /// Install a table, replacing any existing table for its level
    pub fn replace(&mut self, table: VersionedRegistry) -> Option<Arc<VersionedRegistry>> {
        self.tables.insert(table.api_level(), Arc::new(table))
    }

    /// Load every table in `dir`, replacing built-in tables of the same level
    ///
    /// Two files for one level in `dir` are still a `DuplicateVersion` error.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, RegistryError> {
        let tables = load_dir(dir)?;
        let count = tables.len();
        let mut seen = Vec::with_capacity(count);
        for table in tables {
            let level = table.api_level();
            if seen.contains(&level) {
                return Err(RegistryError::DuplicateVersion {
                    api_level: level.get(),
                });
            }
            seen.push(level);
            self.replace(table);
        }
        info!(dir = %dir.display(), count, "loaded transaction tables");
        Ok(count)
    }

    /// Table for exactly `level`
    ///
    /// # Returns
    /// * `Err(RegistryError::UnsupportedVersion)` - No table for this level
    pub fn select(&self, level: ApiLevel) -> Result<Arc<VersionedRegistry>, RegistryError> {
        self.tables
            .get(&level)
            .cloned()
            .ok_or_else(|| RegistryError::UnsupportedVersion {
                api_level: level.get(),
                available: self.levels().map(|l| l.get()).collect(),
            })
    }

    /// Installed levels, ascending
    pub fn levels(&self) -> impl Iterator<Item = ApiLevel> + '_ {
        self.tables.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::loader::parse_table;

    fn table(level: u32) -> VersionedRegistry {
        let json = format!(
            r#"{{ "api_level": {}, "methods": {{ "android.os.IPowerManager": {{ "reboot": {} }} }} }}"#,
            level, level
        );
        parse_table(&json, "inline", None).unwrap()
    }

    #[test]
    fn test_select_exact_level() {
        let mut set = RegistrySet::new();
        set.insert(table(29)).unwrap();
        set.insert(table(31)).unwrap();

        let selected = set.select(ApiLevel::S).unwrap();
        assert_eq!(selected.api_level(), ApiLevel::S);
    }

    #[test]
    fn test_select_missing_level_is_configuration_error() {
        let mut set = RegistrySet::new();
        set.insert(table(29)).unwrap();
        set.insert(table(31)).unwrap();

        // No interpolation from neighbouring levels
        let err = set.select(ApiLevel::R).unwrap_err();
        match err {
            RegistryError::UnsupportedVersion { api_level, available } => {
                assert_eq!(api_level, 30);
                assert_eq!(available, vec![29, 31]);
            }
            other => panic!("Expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_level_rejected() {
        let mut set = RegistrySet::new();
        set.insert(table(31)).unwrap();
        let err = set.insert(table(31)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateVersion { api_level: 31 }));
    }

    #[test]
    fn test_builtin_levels() {
        let set = RegistrySet::builtin().unwrap();
        let levels: Vec<u32> = set.levels().map(|l| l.get()).collect();
        assert_eq!(levels, vec![28, 29, 30, 31]);
        assert!(set.select(ApiLevel::S_V2).unwrap_err().is_unsupported_version());
    }

    #[test]
    fn test_select_shares_table() {
        let set = RegistrySet::builtin().unwrap();
        let a = set.select(ApiLevel::S).unwrap();
        let b = set.select(ApiLevel::S).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_load_dir_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("binderdb-31.json"),
            r#"{ "methods": { "android.os.IPowerManager": { "reboot": 99 } } }"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("binderdb-33.json"),
            r#"{ "methods": { "android.os.IPowerManager": { "reboot": 40 } } }"#,
        )
        .unwrap();

        let mut set = RegistrySet::builtin().unwrap();
        assert_eq!(set.load_dir(dir.path()).unwrap(), 2);

        let s = set.select(ApiLevel::S).unwrap();
        assert_eq!(s.lookup("android.os.IPowerManager", "reboot").unwrap().code(), 99);
        assert!(set.select(ApiLevel::TIRAMISU).is_ok());
        assert_eq!(set.len(), 5);
    }
}
