//! Container settings and the configuration sources they are loaded from.
//!
//! Settings can be built directly, or loaded through a [`ConfigProvider`]
//! backed by environment variables, in-memory maps, or (with the `config`
//! feature) JSON documents.

use std::collections::HashMap;
use std::env;
use std::fmt;

use parking_lot::RwLock;
#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{ContainerError, ContainerResult};

/// Environment variable prefix used by [`ContainerSettings::from_env`].
pub const ENV_PREFIX: &str = "FERROUS_BEANS";

/// Behavioral switches for a [`BeanContainer`](crate::BeanContainer).
///
/// ```
/// use ferrous_beans::ContainerSettings;
///
/// let settings = ContainerSettings::default();
/// assert!(settings.allow_circular_references);
/// assert!(!settings.proxy_target_class);
/// assert_eq!(settings.max_creation_depth, 1024);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerSettings {
    /// Expose early references of singletons so reference cycles resolve.
    pub allow_circular_references: bool,
    /// Prefer subclass-style proxies even when a type declares interfaces.
    pub proxy_target_class: bool,
    /// Maximum nesting of beans being created on one thread.
    pub max_creation_depth: usize,
    /// Register the injection-point processor when the container is built.
    pub annotation_injection: bool,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        ContainerSettings {
            allow_circular_references: true,
            proxy_target_class: false,
            max_creation_depth: 1024,
            annotation_injection: true,
        }
    }
}

impl ContainerSettings {
    /// Loads settings from `config`, falling back to defaults for missing keys.
    pub fn load(config: &ConfigProvider) -> ContainerResult<Self> {
        let defaults = ContainerSettings::default();
        let depth = config.get_i64_or("max_creation_depth", defaults.max_creation_depth as i64);
        if depth <= 0 {
            return Err(ContainerError::Config(format!(
                "max_creation_depth must be positive, got {}",
                depth
            )));
        }
        Ok(ContainerSettings {
            allow_circular_references: config
                .get_bool_or("allow_circular_references", defaults.allow_circular_references),
            proxy_target_class: config.get_bool_or("proxy_target_class", defaults.proxy_target_class),
            max_creation_depth: depth as usize,
            annotation_injection: config
                .get_bool_or("annotation_injection", defaults.annotation_injection),
        })
    }

    /// Loads settings from `FERROUS_BEANS_*` environment variables.
    pub fn from_env() -> ContainerResult<Self> {
        let mut provider = ConfigProvider::new();
        provider.add_source(Box::new(EnvironmentConfigSource::with_prefix(ENV_PREFIX)));
        Self::load(&provider)
    }

    /// Parses settings from a JSON object; missing fields take defaults.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> ContainerResult<Self> {
        serde_json::from_str(json).map_err(|e| ContainerError::Config(e.to_string()))
    }
}

/// A configuration value that can be various types
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(untagged))]
pub enum ConfigValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Parses an untyped string the way environment values are read.
    pub fn parse(raw: &str) -> Self {
        if let Ok(int_val) = raw.parse::<i64>() {
            ConfigValue::Integer(int_val)
        } else if let Ok(float_val) = raw.parse::<f64>() {
            ConfigValue::Float(float_val)
        } else if let Ok(bool_val) = raw.parse::<bool>() {
            ConfigValue::Boolean(bool_val)
        } else {
            ConfigValue::String(raw.to_string())
        }
    }

    pub fn as_string(&self) -> ContainerResult<&str> {
        match self {
            ConfigValue::String(s) => Ok(s),
            other => Err(mismatch("string", other)),
        }
    }

    pub fn as_i64(&self) -> ContainerResult<i64> {
        match self {
            ConfigValue::Integer(i) => Ok(*i),
            other => Err(mismatch("integer", other)),
        }
    }

    pub fn as_bool(&self) -> ContainerResult<bool> {
        match self {
            ConfigValue::Boolean(b) => Ok(*b),
            other => Err(mismatch("boolean", other)),
        }
    }

    /// Renders scalars as text, for placeholder substitution.
    pub fn to_text(&self) -> Option<String> {
        match self {
            ConfigValue::Boolean(b) => Some(b.to_string()),
            ConfigValue::Integer(i) => Some(i.to_string()),
            ConfigValue::Float(f) => Some(f.to_string()),
            ConfigValue::String(s) => Some(s.clone()),
            ConfigValue::Array(_) | ConfigValue::Object(_) => None,
        }
    }
}

fn mismatch(expected: &str, found: &ConfigValue) -> ContainerError {
    ContainerError::Config(format!("expected {} value, found {:?}", expected, found))
}

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync + fmt::Debug {
    /// Get a configuration value by key
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// List all available keys
    fn keys(&self) -> Vec<String>;
}

/// Environment variable configuration source
///
/// Key `a.b_c` with prefix `APP` reads `APP_A_B_C`.
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn env_key(&self, key: &str) -> String {
        let key = key.replace('.', "_").to_uppercase();
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key),
            None => key,
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.env_key(key)).ok().map(|value| ConfigValue::parse(&value))
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => {
                    let prefix_upper = format!("{}_", prefix.to_uppercase());
                    key.strip_prefix(&prefix_upper).map(str::to_lowercase)
                }
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// In-memory configuration source.
#[derive(Debug, Default, Clone)]
pub struct MapConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.values.insert(key.into(), value);
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// JSON configuration source
///
/// Nested objects are addressable with dotted keys, so `{"db": {"url": ".."}}`
/// answers `db.url`.
#[cfg(feature = "config")]
#[derive(Debug)]
pub struct JsonConfigSource {
    values: HashMap<String, ConfigValue>,
}

#[cfg(feature = "config")]
impl JsonConfigSource {
    pub fn from_str(json: &str) -> ContainerResult<Self> {
        let parsed: HashMap<String, ConfigValue> = serde_json::from_str(json)
            .map_err(|e| ContainerError::Config(format!("invalid JSON configuration: {}", e)))?;
        let mut values = HashMap::new();
        flatten_into(&mut values, None, parsed);
        Ok(Self { values })
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> ContainerResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ContainerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }
}

#[cfg(feature = "config")]
fn flatten_into(
    out: &mut HashMap<String, ConfigValue>,
    prefix: Option<&str>,
    values: HashMap<String, ConfigValue>,
) {
    for (key, value) in values {
        let full = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key,
        };
        if let ConfigValue::Object(nested) = &value {
            flatten_into(out, Some(&full), nested.clone());
        }
        out.insert(full, value);
    }
}

#[cfg(feature = "config")]
impl ConfigSource for JsonConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// Layered configuration lookup over several sources
///
/// Sources are consulted in the order they were added; the first hit wins
/// and is cached.
#[derive(Default)]
pub struct ConfigProvider {
    sources: Vec<Box<dyn ConfigSource>>,
    cache: RwLock<HashMap<String, ConfigValue>>,
}

impl fmt::Debug for ConfigProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigProvider")
            .field("sources", &self.sources)
            .field("cached", &self.cache.read().len())
            .finish()
    }
}

impl ConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration source (higher priority sources should be added first)
    pub fn add_source(&mut self, source: Box<dyn ConfigSource>) {
        self.sources.push(source);
    }

    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.add_source(Box::new(source));
        self
    }

    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        if let Some(value) = self.cache.read().get(key) {
            return Some(value.clone());
        }

        let value = self.sources.iter().find_map(|source| source.get(key))?;
        self.cache.write().insert(key.to_string(), value.clone());
        Some(value)
    }

    pub fn get_string(&self, key: &str) -> ContainerResult<String> {
        self.require(key)?.as_string().map(str::to_string)
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    pub fn get_i64(&self, key: &str) -> ContainerResult<i64> {
        self.require(key)?.as_i64()
    }

    pub fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        self.get_i64(key).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str) -> ContainerResult<bool> {
        self.require(key)?.as_bool()
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// Clear the configuration cache (forces reload from sources)
    pub fn invalidate_cache(&self) {
        self.cache.write().clear();
    }

    /// All keys across sources, sorted and deduplicated.
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sources.iter().flat_map(|s| s.keys()).collect();
        keys.sort();
        keys.dedup();
        keys
    }

    fn require(&self, key: &str) -> ContainerResult<ConfigValue> {
        self.get(key)
            .ok_or_else(|| ContainerError::Config(format!("configuration key '{}' not found", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_value_parsing() {
        assert_eq!(ConfigValue::parse("42"), ConfigValue::Integer(42));
        assert_eq!(ConfigValue::parse("1.5"), ConfigValue::Float(1.5));
        assert_eq!(ConfigValue::parse("true"), ConfigValue::Boolean(true));
        assert_eq!(ConfigValue::parse("x"), ConfigValue::String("x".into()));
        assert!(ConfigValue::Integer(1).as_string().is_err());
        assert_eq!(ConfigValue::Integer(7).to_text().as_deref(), Some("7"));
    }

    #[test]
    fn test_provider_first_source_wins() {
        let provider = ConfigProvider::new()
            .with_source(MapConfigSource::new().with("proxy_target_class", ConfigValue::Boolean(true)))
            .with_source(
                MapConfigSource::new()
                    .with("proxy_target_class", ConfigValue::Boolean(false))
                    .with("max_creation_depth", ConfigValue::Integer(8)),
            );

        let settings = ContainerSettings::load(&provider).unwrap();
        assert!(settings.proxy_target_class);
        assert_eq!(settings.max_creation_depth, 8);
        assert!(settings.allow_circular_references);
        assert_eq!(provider.all_keys(), vec!["max_creation_depth", "proxy_target_class"]);
    }

    #[test]
    fn test_invalid_depth_rejected() {
        let provider = ConfigProvider::new()
            .with_source(MapConfigSource::new().with("max_creation_depth", ConfigValue::Integer(0)));
        assert!(matches!(
            ContainerSettings::load(&provider),
            Err(ContainerError::Config(_))
        ));
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_json_source_flattens_nested_keys() {
        let source = JsonConfigSource::from_str(r#"{"db": {"url": "postgres://x", "pool": 4}}"#).unwrap();
        assert_eq!(source.get("db.url"), Some(ConfigValue::String("postgres://x".into())));
        assert_eq!(source.get("db.pool"), Some(ConfigValue::Integer(4)));
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_settings_from_json() {
        let settings = ContainerSettings::from_json_str(r#"{"proxy_target_class": true}"#).unwrap();
        assert!(settings.proxy_target_class);
        assert_eq!(settings.max_creation_depth, 1024);
    }
}
