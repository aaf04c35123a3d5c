//! Per-run context.
//!
//! Holds the one table selected for the device's version together with the
//! transport. Test cases receive a context instead of reaching for
//! process-wide state, so several contexts (e.g. one per simulated level)
//! can coexist.

use std::sync::Arc;
use std::time::Duration;

use ptx_hal::Transport;
use tracing::info;

use crate::config::TransactConfig;
use crate::error::ContextError;
use crate::invoker::{CallOptions, Invoker};
use crate::locator::ServiceLocator;
use crate::registry::{ApiLevel, RegistrySet, VersionedRegistry};

#[derive(Clone, Debug)]
pub struct TransactContext {
    registry: Arc<VersionedRegistry>,
    invoker: Invoker,
}

impl TransactContext {
    /// Build the table set described by `config` and select its level
    ///
    /// A missing table for the configured level is a configuration error;
    /// nothing is guessed from neighbouring levels.
    pub fn new(config: &TransactConfig, transport: Arc<dyn Transport>) -> Result<Self, ContextError> {
        config.validate()?;

        let mut tables = if config.use_builtin_tables {
            RegistrySet::builtin()?
        } else {
            RegistrySet::new()
        };
        if let Some(dir) = &config.registry_dir {
            tables.load_dir(dir)?;
        }

        let options = CallOptions {
            text_mode: config.text_mode,
            oneway: false,
        };
        Self::from_tables(&tables, config.api_level, transport, config.bind_timeout(), options)
    }

    /// Select `level` from an already built table set
    pub fn from_tables(
        tables: &RegistrySet,
        level: ApiLevel,
        transport: Arc<dyn Transport>,
        bind_timeout: Duration,
        defaults: CallOptions,
    ) -> Result<Self, ContextError> {
        let registry = tables.select(level)?;
        info!(
            api_level = level.get(),
            operations = registry.operation_count(),
            "selected transaction table"
        );
        Ok(Self::from_registry(registry, transport, bind_timeout, defaults))
    }

    /// Wrap a single table
    pub fn from_registry(
        registry: Arc<VersionedRegistry>,
        transport: Arc<dyn Transport>,
        bind_timeout: Duration,
        defaults: CallOptions,
    ) -> Self {
        let invoker = Invoker::new(Arc::clone(&registry), transport)
            .with_bind_timeout(bind_timeout)
            .with_defaults(defaults);
        Self { registry, invoker }
    }

    pub fn api_level(&self) -> ApiLevel {
        self.registry.api_level()
    }

    pub fn registry(&self) -> &VersionedRegistry {
        &self.registry
    }

    pub fn locator(&self) -> &ServiceLocator {
        self.invoker.locator()
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }
}
