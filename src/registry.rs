//! Named configurations, the adapter factory and memoized client instances.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, error, info, warn};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;

use crate::adapters::{Adapter, AdapterFunc};
use crate::config::DEFAULT_GROUP_NAME;
use crate::{Client, Config, KvError, Result};

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

type InstanceCell = Arc<OnceCell<Option<Arc<Client>>>>;

/// Process-wide client registry.
///
/// Holds named configurations, the factory used to turn a configuration
/// into an adapter, and one lazily built [`Client`] per group name.
/// [`Registry::global`] is the shared instance behind the crate-level
/// functions; separate registries can be created for isolated use.
pub struct Registry {
    configs: RwLock<HashMap<String, Config>>,
    adapter_func: RwLock<AdapterFunc>,
    instances: DashMap<String, InstanceCell>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn group_name(name: Option<&str>) -> &str {
    match name {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_GROUP_NAME,
    }
}

impl Registry {
    /// Creates an empty registry whose adapter factory yields nothing.
    ///
    /// An adapter factory must be registered before configuration-based
    /// construction can succeed.
    pub fn new() -> Self {
        let unregistered: AdapterFunc = Arc::new(|_: &Config| -> Option<Arc<dyn Adapter>> { None });
        Registry {
            configs: RwLock::new(HashMap::new()),
            adapter_func: RwLock::new(unregistered),
            instances: DashMap::new(),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Replaces the adapter factory.
    ///
    /// Only later constructions are affected; existing clients keep their
    /// adapters.
    pub fn register_adapter_func<F>(&self, func: F)
    where
        F: Fn(&Config) -> Option<Arc<dyn Adapter>> + Send + Sync + 'static,
    {
        *self.adapter_func.write() = Arc::new(func);
        info!("adapter factory registered");
    }

    /// Stores `config` under `name` (the default group when `None`).
    pub fn set_config(&self, config: Config, name: Option<&str>) {
        let group = group_name(name).to_owned();
        debug!("set config for group \"{}\": {:?}", group, config);
        self.configs.write().insert(group, config);
    }

    /// Builds a configuration from `map` and stores it under `name`.
    pub fn set_config_by_map(
        &self,
        map: serde_json::Map<String, serde_json::Value>,
        name: Option<&str>,
    ) -> Result<()> {
        let config = Config::from_map(map)?;
        self.set_config(config, name);
        Ok(())
    }

    /// Configuration stored under `name` (the default group when `None`).
    pub fn config(&self, name: Option<&str>) -> Option<Config> {
        self.configs.read().get(group_name(name)).cloned()
    }

    /// Removes the configuration stored under `name`.
    pub fn remove_config(&self, name: Option<&str>) {
        let group = group_name(name);
        if self.configs.write().remove(group).is_some() {
            debug!("removed config for group \"{}\"", group);
        }
    }

    /// Removes every stored configuration.
    pub fn clear_config(&self) {
        self.configs.write().clear();
    }

    /// Builds a client from `config`, or from the default group's
    /// configuration when `None`.
    pub fn new_client(&self, config: Option<&Config>) -> Result<Client> {
        let config = match config {
            Some(config) => config.clone(),
            None => self.config(None).ok_or_else(|| {
                KvError::MissingConfiguration(
                    "no configuration found for creating client".to_owned(),
                )
            })?,
        };
        let func = self.adapter_func.read().clone();
        let adapter = func(&config).ok_or(KvError::MissingAdapter)?;
        Ok(Client::with_config(config, adapter))
    }

    /// Returns the memoized client of group `name` (the default group when
    /// `None` or empty), building it on first use.
    ///
    /// Exactly one construction is attempted per name, whatever the number
    /// of concurrent callers. A failed attempt is logged and remembered as
    /// `None`.
    pub fn instance(&self, name: Option<&str>) -> Option<Arc<Client>> {
        let group = group_name(name);
        let cell = self
            .instances
            .entry(group.to_owned())
            .or_default()
            .clone();
        cell.get_or_init(|| self.build_instance(group)).clone()
    }

    fn build_instance(&self, group: &str) -> Option<Arc<Client>> {
        let Some(config) = self.config(Some(group)) else {
            warn!("no configuration found for client group \"{}\"", group);
            return None;
        };
        match self.new_client(Some(&config)) {
            Ok(client) => {
                debug!("created client for group \"{}\"", group);
                Some(Arc::new(client))
            }
            Err(e) => {
                error!("failed to create client for group \"{}\": {}", group, e);
                None
            }
        }
    }
}

/// Replaces the adapter factory of the global registry.
pub fn register_adapter_func<F>(func: F)
where
    F: Fn(&Config) -> Option<Arc<dyn Adapter>> + Send + Sync + 'static,
{
    Registry::global().register_adapter_func(func)
}

/// Returns the memoized client of group `name` from the global registry.
pub fn instance(name: Option<&str>) -> Option<Arc<Client>> {
    Registry::global().instance(name)
}

/// Stores `config` in the global registry.
pub fn set_config(config: Config, name: Option<&str>) {
    Registry::global().set_config(config, name)
}

/// Builds and stores a configuration in the global registry.
pub fn set_config_by_map(
    map: serde_json::Map<String, serde_json::Value>,
    name: Option<&str>,
) -> Result<()> {
    Registry::global().set_config_by_map(map, name)
}

/// Configuration stored in the global registry.
pub fn get_config(name: Option<&str>) -> Option<Config> {
    Registry::global().config(name)
}

/// Removes a configuration from the global registry.
pub fn remove_config(name: Option<&str>) {
    Registry::global().remove_config(name)
}

/// Removes every configuration from the global registry.
pub fn clear_config() {
    Registry::global().clear_config()
}
