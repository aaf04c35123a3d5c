//! ptx CLI
//!
//! Inspects transaction tables and request parcels without a device.
//!
//! # Usage
//!
//! ```bash
//! # List installed tables
//! ptx versions
//!
//! # Resolve an operation id for one level
//! ptx lookup --level 31 com.android.internal.app.IVoiceInteractionManagerService updateState
//!
//! # Show the request parcel a call would send
//! ptx encode --level 30 android.os.IPowerManager bool:false str:test bool:false
//!
//! # Validate table files before shipping them
//! ptx check ./binderdb
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub mod commands;

/// ptx Command Line Interface
#[derive(Parser, Debug)]
#[command(name = "ptx")]
#[command(author, version, about = "Versioned binder transaction tables and parcels")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Where tables come from
#[derive(Args, Debug, Clone, Default)]
pub struct TableSource {
    /// Engine config file (JSON); its level and table directory are used
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory of binderdb-<level>.json files, overriding built-in tables
    #[arg(long)]
    pub registry_dir: Option<PathBuf>,

    /// Ignore the built-in tables
    #[arg(long)]
    pub no_builtin: bool,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List installed API levels
    Versions {
        #[command(flatten)]
        source: TableSource,
    },

    /// Resolve the wire id of an operation
    Lookup {
        #[command(flatten)]
        source: TableSource,

        /// API level (defaults to the config file, then PTX_API_LEVEL)
        #[arg(short, long)]
        level: Option<u32>,

        /// Interface token, e.g. android.os.IPowerManager
        interface: String,

        /// Operation name, e.g. reboot
        operation: String,
    },

    /// Print the request parcel for a call as a hex dump
    Encode {
        #[command(flatten)]
        source: TableSource,

        #[arg(short, long)]
        level: Option<u32>,

        /// Write text arguments as CharSequence
        #[arg(long)]
        char_sequence: bool,

        /// Interface token
        interface: String,

        /// Typed arguments: i32:N, i64:N, bool:B, str:S, null-str, bytes:HEX, null-binder
        args: Vec<String>,
    },

    /// Print a table as JSON
    Export {
        #[command(flatten)]
        source: TableSource,

        #[arg(short, long)]
        level: Option<u32>,
    },

    /// Validate a table file or a directory of table files
    Check {
        /// File or directory to validate
        path: PathBuf,
    },
}
