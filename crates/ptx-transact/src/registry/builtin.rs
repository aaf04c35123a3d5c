//! Tables shipped with the crate.
//!
//! Harvested from reference builds of P, Q, R and S. Later levels must be
//! supplied as table files.

use super::loader::parse_table;
use super::table::VersionedRegistry;
use super::version::ApiLevel;
use crate::error::RegistryError;

const TABLES: &[(u32, &str, &str)] = &[
    (28, "binderdb-28.json", include_str!("../../tables/binderdb-28.json")),
    (29, "binderdb-29.json", include_str!("../../tables/binderdb-29.json")),
    (30, "binderdb-30.json", include_str!("../../tables/binderdb-30.json")),
    (31, "binderdb-31.json", include_str!("../../tables/binderdb-31.json")),
];

/// API levels with a built-in table
pub fn builtin_levels() -> impl Iterator<Item = ApiLevel> {
    TABLES.iter().map(|(level, _, _)| ApiLevel(*level))
}

/// Parse the built-in table for one level, if shipped
pub fn builtin_table(level: ApiLevel) -> Option<Result<VersionedRegistry, RegistryError>> {
    TABLES
        .iter()
        .find(|(l, _, _)| *l == level.get())
        .map(|(l, name, json)| parse_table(json, name, Some(ApiLevel(*l))))
}

/// Parse every built-in table
pub fn builtin_tables() -> Result<Vec<VersionedRegistry>, RegistryError> {
    TABLES
        .iter()
        .map(|(level, name, json)| parse_table(json, name, Some(ApiLevel(*level))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::OperationId;
    use ptx_ipc::{descriptor, op};

    #[test]
    fn test_all_builtin_tables_parse() {
        let tables = builtin_tables().unwrap();
        assert_eq!(tables.len(), 4);
        for (table, level) in tables.iter().zip(builtin_levels()) {
            assert_eq!(table.api_level(), level);
            assert!(table.operation_count() > 0);
        }
    }

    #[test]
    fn test_voice_interaction_ids_differ_by_release() {
        let p = builtin_table(ApiLevel::P).unwrap().unwrap();
        let s = builtin_table(ApiLevel::S).unwrap().unwrap();

        let name = op::voice_interaction::GET_ACTIVE_SERVICE_COMPONENT_NAME;
        assert_eq!(p.lookup(descriptor::VOICE_INTERACTION, name).unwrap(), OperationId(20));
        assert_eq!(s.lookup(descriptor::VOICE_INTERACTION, name).unwrap(), OperationId(18));

        // updateState only exists from S on
        assert!(!p.contains(descriptor::VOICE_INTERACTION, op::voice_interaction::UPDATE_STATE));
        assert_eq!(
            s.lookup(descriptor::VOICE_INTERACTION, op::voice_interaction::UPDATE_STATE)
                .unwrap(),
            OperationId(33)
        );
    }

    #[test]
    fn test_uri_grants_absent_on_p() {
        let p = builtin_table(ApiLevel::P).unwrap().unwrap();
        assert!(p.operations(descriptor::URI_GRANTS).is_none());
        assert_eq!(p.service_name("URI_GRANTS_SERVICE"), None);
    }

    #[test]
    fn test_no_builtin_table_for_later_levels() {
        assert!(builtin_table(ApiLevel::S_V2).is_none());
        assert!(builtin_table(ApiLevel::BAKLAVA).is_none());
    }
}
