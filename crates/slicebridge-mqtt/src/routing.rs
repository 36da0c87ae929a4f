//! Static option key to topic routing.
//!
//! The routing table has three partitions, all loaded from
//! `data/topic_routes.toml`:
//!
//! - config routes: `key -> {page, group}`, giving `config/{page}/{group}/{key}`
//! - printer routes: `key -> path`, giving `config/printer/{path}/{key}`
//! - extruder groups: per-extruder vector keys, giving
//!   `config/printer/extruder/{idx}/{group}/{key}`
//!
//! Topics returned here do not carry the publisher's prefix.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{MqttError, MqttResult};

const BUILTIN_ROUTES: &str = include_str!("../data/topic_routes.toml");

/// Page and group of a routed config key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicRoute {
    pub page: String,
    pub group: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RouteFile {
    config: Vec<ConfigEntry>,
    printer: Vec<PrinterEntry>,
    extruder: Vec<ExtruderEntry>,
}

#[derive(Debug, Deserialize)]
struct ConfigEntry {
    page: String,
    group: String,
    keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PrinterEntry {
    path: String,
    keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ExtruderEntry {
    group: String,
    keys: Vec<String>,
}

/// Immutable routing table.
#[derive(Debug, Clone, Default)]
pub struct TopicRouter {
    /// Config keys in file order
    config_keys: Vec<String>,
    config_routes: HashMap<String, TopicRoute>,
    printer_paths: HashMap<String, String>,
    extruder_groups: HashMap<String, String>,
}

impl TopicRouter {
    /// Routing table bundled with the crate.
    pub fn builtin() -> MqttResult<Self> {
        Self::from_toml_str(BUILTIN_ROUTES)
    }

    /// Load a routing table from a TOML file.
    pub fn load_from_file(path: &Path) -> MqttResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse a routing table. A key listed twice in one partition is rejected.
    pub fn from_toml_str(content: &str) -> MqttResult<Self> {
        let file: RouteFile = toml::from_str(content).map_err(|e| MqttError::InvalidRoutes {
            reason: e.to_string(),
        })?;

        let mut router = Self::default();

        for entry in file.config {
            let route = TopicRoute {
                page: entry.page,
                group: entry.group,
            };
            for key in entry.keys {
                if router.config_routes.contains_key(&key) {
                    return Err(duplicate("config", &key));
                }
                router.config_routes.insert(key.clone(), route.clone());
                router.config_keys.push(key);
            }
        }

        for entry in file.printer {
            for key in entry.keys {
                if router
                    .printer_paths
                    .insert(key.clone(), entry.path.clone())
                    .is_some()
                {
                    return Err(duplicate("printer", &key));
                }
            }
        }

        for entry in file.extruder {
            for key in entry.keys {
                if router
                    .extruder_groups
                    .insert(key.clone(), entry.group.clone())
                    .is_some()
                {
                    return Err(duplicate("extruder", &key));
                }
            }
        }

        tracing::debug!(
            "Topic routes loaded: {} config, {} printer, {} extruder keys",
            router.config_routes.len(),
            router.printer_paths.len(),
            router.extruder_groups.len()
        );

        Ok(router)
    }

    /// Route of a config key, if known.
    pub fn route(&self, opt_key: &str) -> Option<&TopicRoute> {
        self.config_routes.get(opt_key)
    }

    /// Config topic of `opt_key`; unknown keys go to `config/unknown/`.
    pub fn get_topic(&self, opt_key: &str) -> String {
        match self.route(opt_key) {
            Some(route) => format!("config/{}/{}/{}", route.page, route.group, opt_key),
            None => format!("config/unknown/{}", opt_key),
        }
    }

    /// Printer preset topic of `opt_key`; unlisted keys go to `config/printer/misc/`.
    pub fn printer_topic(&self, opt_key: &str) -> String {
        let path = self
            .printer_paths
            .get(opt_key)
            .map(String::as_str)
            .unwrap_or("misc");
        format!("config/printer/{}/{}", path, opt_key)
    }

    /// Per-extruder group of `opt_key`, if it is extruder-indexed.
    pub fn extruder_group(&self, opt_key: &str) -> Option<&str> {
        self.extruder_groups.get(opt_key).map(String::as_str)
    }

    /// Topic of element `idx` of an extruder-indexed key.
    pub fn extruder_topic(&self, opt_key: &str, idx: usize) -> Option<String> {
        self.extruder_group(opt_key)
            .map(|group| format!("config/printer/extruder/{}/{}/{}", idx, group, opt_key))
    }

    /// Known config keys in table order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.config_keys.iter().map(String::as_str)
    }

    /// Number of known config keys.
    pub fn len(&self) -> usize {
        self.config_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.config_keys.is_empty()
    }
}

fn duplicate(partition: &str, key: &str) -> MqttError {
    MqttError::InvalidRoutes {
        reason: format!("key '{}' listed twice in {} routes", key, partition),
    }
}
