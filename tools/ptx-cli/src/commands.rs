//! Command implementations.

use std::path::Path;

use anyhow::{bail, Context, Result};
use ptx_transact::registry::{load_dir, load_file, TableDocument};
use ptx_transact::{
    encode, Arg, ApiLevel, RegistrySet, TextMode, TransactConfig, API_LEVEL_ENV,
};
use tracing::{debug, info};

use crate::{Commands, TableSource};

/// Run one command
pub fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Versions { source } => versions(&source),
        Commands::Lookup {
            source,
            level,
            interface,
            operation,
        } => lookup(&source, level, &interface, &operation),
        Commands::Encode {
            source,
            level,
            char_sequence,
            interface,
            args,
        } => encode_command(&source, level, char_sequence, &interface, &args),
        Commands::Export { source, level } => export(&source, level),
        Commands::Check { path } => check(&path),
    }
}

// =============================================================================
// Commands
// =============================================================================

fn versions(source: &TableSource) -> Result<()> {
    let (tables, _) = load_tables(source)?;
    if tables.is_empty() {
        println!("no transaction tables installed");
        return Ok(());
    }

    for level in tables.levels() {
        let table = tables.select(level)?;
        println!(
            "{:<22} {:>3} interfaces {:>4} operations",
            level.to_string(),
            table.interfaces().count(),
            table.operation_count()
        );
    }
    Ok(())
}

fn lookup(source: &TableSource, level: Option<u32>, interface: &str, operation: &str) -> Result<()> {
    let (tables, config) = load_tables(source)?;
    let level = resolve_level(level, config.as_ref())?;
    let table = tables.select(level)?;

    match table.lookup(interface, operation) {
        Ok(id) => println!("{}.{} = {}", interface, operation, id),
        Err(e) if e.is_not_present() => println!("{}", e),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn encode_command(
    source: &TableSource,
    level: Option<u32>,
    char_sequence: bool,
    interface: &str,
    specs: &[String],
) -> Result<()> {
    let config = load_config(source)?;
    let level = resolve_level(level, config.as_ref())?;
    let mode = if char_sequence {
        TextMode::CharSequence
    } else {
        config.map(|c| c.text_mode).unwrap_or_default()
    };

    let args = specs
        .iter()
        .map(|spec| parse_arg(spec))
        .collect::<Result<Vec<_>>>()?;
    let parcel = encode(interface, level, &args, mode);

    println!("# {} at API level {}, {} bytes", interface, level, parcel.len());
    if !parcel.object_offsets().is_empty() {
        println!("# binder objects at {:?}", parcel.object_offsets());
    }
    print!("{}", parcel.hex_dump());
    Ok(())
}

fn export(source: &TableSource, level: Option<u32>) -> Result<()> {
    let (tables, config) = load_tables(source)?;
    let level = resolve_level(level, config.as_ref())?;
    let table = tables.select(level)?;

    let document = TableDocument::from(table.as_ref());
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn check(path: &Path) -> Result<()> {
    let loaded = if path.is_dir() {
        load_dir(path).with_context(|| format!("checking {}", path.display()))?
    } else {
        vec![load_file(path).with_context(|| format!("checking {}", path.display()))?]
    };

    if loaded.is_empty() {
        bail!("no binderdb-<level>.json files in {}", path.display());
    }

    let mut tables = RegistrySet::new();
    for table in loaded {
        let summary = format!(
            "level {}: {} operations",
            table.api_level(),
            table.operation_count()
        );
        tables.insert(table)?;
        println!("ok  {}", summary);
    }
    info!(count = tables.len(), "tables valid");
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn load_config(source: &TableSource) -> Result<Option<TransactConfig>> {
    match &source.config {
        Some(path) => {
            let config = TransactConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?
                .with_env_overrides()?;
            debug!(api_level = config.api_level.get(), "loaded config");
            Ok(Some(config))
        }
        None => Ok(None),
    }
}

fn load_tables(source: &TableSource) -> Result<(RegistrySet, Option<TransactConfig>)> {
    let config = load_config(source)?;

    let use_builtin = !source.no_builtin && config.as_ref().map_or(true, |c| c.use_builtin_tables);
    let mut tables = if use_builtin {
        RegistrySet::builtin()?
    } else {
        RegistrySet::new()
    };

    let dir = source
        .registry_dir
        .as_deref()
        .or_else(|| config.as_ref().and_then(|c| c.registry_dir.as_deref()));
    if let Some(dir) = dir {
        tables
            .load_dir(dir)
            .with_context(|| format!("loading tables from {}", dir.display()))?;
    }

    Ok((tables, config))
}

/// Level from the flag, then the config file, then the environment
fn resolve_level(flag: Option<u32>, config: Option<&TransactConfig>) -> Result<ApiLevel> {
    if let Some(level) = flag {
        return Ok(ApiLevel(level));
    }
    if let Some(config) = config {
        return Ok(config.api_level);
    }
    match std::env::var(API_LEVEL_ENV) {
        Ok(value) => value
            .trim()
            .parse()
            .map(ApiLevel)
            .with_context(|| format!("{}='{}' is not an API level", API_LEVEL_ENV, value)),
        Err(_) => bail!("no API level given; pass --level, --config or set {}", API_LEVEL_ENV),
    }
}

/// Parse a typed argument such as `i32:5` or `str:hello`
pub fn parse_arg(spec: &str) -> Result<Arg> {
    match spec {
        "null-str" => return Ok(Arg::Text(None)),
        "null-binder" => return Ok(Arg::null_binder()),
        "null-bytes" => return Ok(Arg::Bytes(None)),
        _ => {}
    }

    let Some((kind, value)) = spec.split_once(':') else {
        bail!("argument '{}' has no type prefix", spec);
    };
    let arg = match kind {
        "i32" | "int" => Arg::Int(value.parse().with_context(|| format!("bad i32 '{}'", value))?),
        "i64" | "long" => Arg::Long(value.parse().with_context(|| format!("bad i64 '{}'", value))?),
        "bool" => Arg::Bool(value.parse().with_context(|| format!("bad bool '{}'", value))?),
        "str" => Arg::text(value),
        "bytes" => Arg::Bytes(Some(parse_hex(value)?)),
        "i32s" => {
            let values = value
                .split(',')
                .filter(|v| !v.is_empty())
                .map(|v| v.trim().parse::<i32>())
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("bad i32 list '{}'", value))?;
            Arg::IntArray(Some(values))
        }
        "strs" => Arg::text_array(value.split(',').filter(|v| !v.is_empty())),
        other => bail!("unknown argument type '{}'", other),
    };
    Ok(arg)
}

fn parse_hex(hex: &str) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        bail!("hex string '{}' has odd length", hex);
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .with_context(|| format!("bad hex byte at {} in '{}'", i, hex))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptx_transact::ArgKind;

    #[test]
    fn test_parse_scalar_args() {
        assert!(matches!(parse_arg("i32:-5").unwrap(), Arg::Int(-5)));
        assert!(matches!(parse_arg("i64:4294967296").unwrap(), Arg::Long(4294967296)));
        assert!(matches!(parse_arg("bool:true").unwrap(), Arg::Bool(true)));
        assert!(matches!(parse_arg("str:a:b").unwrap(), Arg::Text(Some(ref s)) if s == "a:b"));
        assert!(matches!(parse_arg("null-str").unwrap(), Arg::Text(None)));
    }

    #[test]
    fn test_parse_compound_args() {
        assert!(matches!(parse_arg("bytes:deadbeef").unwrap(), Arg::Bytes(Some(ref b)) if b == &[0xde, 0xad, 0xbe, 0xef]));
        assert!(matches!(parse_arg("i32s:1,2,3").unwrap(), Arg::IntArray(Some(ref v)) if v == &[1, 2, 3]));
        assert_eq!(parse_arg("strs:a,b").unwrap().kind(), ArgKind::TextArray);
        assert_eq!(parse_arg("null-binder").unwrap().kind(), ArgKind::Binder);
    }

    #[test]
    fn test_parse_arg_errors() {
        assert!(parse_arg("5").is_err());
        assert!(parse_arg("f32:1.0").is_err());
        assert!(parse_arg("i32:x").is_err());
        assert!(parse_arg("bytes:abc").is_err());
        assert!(parse_arg("bytes:zz").is_err());
    }

    #[test]
    fn test_flag_level_wins() {
        let config = TransactConfig::for_level(ApiLevel::Q);
        assert_eq!(resolve_level(Some(31), Some(&config)).unwrap(), ApiLevel::S);
        assert_eq!(resolve_level(None, Some(&config)).unwrap(), ApiLevel::Q);
    }

    #[test]
    fn test_check_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("binderdb-33.json"),
            r#"{ "methods": { "android.os.IPowerManager": { "reboot": 34 } } }"#,
        )
        .unwrap();
        assert!(check(dir.path()).is_ok());

        std::fs::write(
            dir.path().join("binderdb-34.json"),
            r#"{ "api_level": 35, "methods": {} }"#,
        )
        .unwrap();
        assert!(check(dir.path()).is_err());
    }

    #[test]
    fn test_check_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check(dir.path()).is_err());
    }
}
