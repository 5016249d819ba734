//! `${key}` placeholder substitution backed by a [`ConfigProvider`].

use std::fmt;
use std::sync::Arc;

use regex::{Captures, Regex};
use tracing::{debug, trace};

use crate::autowire::StringValueResolver;
use crate::config::ConfigProvider;
use crate::container::BeanContainer;
use crate::definition::{PropertySource, PropertyValue};
use crate::error::{ContainerError, ContainerResult};
use crate::processor::DefinitionPostProcessor;
use crate::registration::DefinitionRegistry;
use crate::value::Value;

const PLACEHOLDER_PATTERN: &str = r"\$\{([^}:]+)(?::([^}]*))?\}";

/// Replaces `${key}` and `${key:default}` with configuration values.
///
/// As a definition post-processor it rewrites string literals in property
/// lists; as an embedded value resolver it serves `value(..)` injection
/// points. A value that itself contains placeholders is resolved again.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{ConfigProvider, ConfigValue, MapConfigSource, PlaceholderConfigurer};
///
/// let config = ConfigProvider::new().with_source(
///     MapConfigSource::new()
///         .with("db.host", ConfigValue::String("localhost".into()))
///         .with("db.url", ConfigValue::String("pg://${db.host}:${db.port:5432}".into())),
/// );
/// let configurer = PlaceholderConfigurer::new(config).unwrap();
///
/// assert_eq!(configurer.resolve("${db.url}").unwrap(), "pg://localhost:5432");
/// assert!(configurer.resolve("${missing}").is_err());
/// ```
pub struct PlaceholderConfigurer {
    config: ConfigProvider,
    pattern: Regex,
    ignore_unresolvable: bool,
}

impl PlaceholderConfigurer {
    pub fn new(config: ConfigProvider) -> ContainerResult<Self> {
        let pattern = Regex::new(PLACEHOLDER_PATTERN)
            .map_err(|e| ContainerError::Config(format!("invalid placeholder pattern: {}", e)))?;
        Ok(PlaceholderConfigurer {
            config,
            pattern,
            ignore_unresolvable: false,
        })
    }

    /// Leave unknown placeholders in place instead of failing.
    pub fn ignore_unresolvable(mut self, ignore: bool) -> Self {
        self.ignore_unresolvable = ignore;
        self
    }

    pub fn config(&self) -> &ConfigProvider {
        &self.config
    }

    /// Substitutes every placeholder in `text`.
    pub fn resolve(&self, text: &str) -> ContainerResult<String> {
        self.resolve_nested(text, &mut Vec::new())
    }

    fn resolve_nested(&self, text: &str, visiting: &mut Vec<String>) -> ContainerResult<String> {
        if !text.contains("${") {
            return Ok(text.to_string());
        }

        let mut failure = None;
        let replaced = self.pattern.replace_all(text, |caps: &Captures<'_>| {
            if failure.is_some() {
                return String::new();
            }
            match self.resolve_one(caps, visiting) {
                Ok(value) => value,
                Err(e) => {
                    failure = Some(e);
                    String::new()
                }
            }
        });

        match failure {
            Some(error) => Err(error),
            None => Ok(replaced.into_owned()),
        }
    }

    fn resolve_one(&self, caps: &Captures<'_>, visiting: &mut Vec<String>) -> ContainerResult<String> {
        let key = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();

        if visiting.iter().any(|k| k == key) {
            return Err(ContainerError::Config(format!(
                "circular placeholder reference '{}' in {}",
                key,
                visiting.join(" -> ")
            )));
        }

        let raw = match self.config.get(key).and_then(|value| value.to_text()) {
            Some(raw) => raw,
            None => match caps.get(2) {
                Some(default) => default.as_str().to_string(),
                None if self.ignore_unresolvable => return Ok(whole.to_string()),
                None => {
                    return Err(ContainerError::Config(format!(
                        "could not resolve placeholder '{}'",
                        key
                    )))
                }
            },
        };

        visiting.push(key.to_string());
        let resolved = self.resolve_nested(&raw, visiting);
        visiting.pop();
        trace!(placeholder = %key, "resolved placeholder");
        resolved
    }

    fn resolve_value(&self, value: &Value) -> ContainerResult<Option<Value>> {
        match value {
            Value::Str(s) if s.contains("${") => Ok(Some(Value::Str(self.resolve(s)?))),
            Value::List(items) => {
                let mut changed = false;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match self.resolve_value(item)? {
                        Some(next) => {
                            changed = true;
                            out.push(next);
                        }
                        None => out.push(item.clone()),
                    }
                }
                Ok(changed.then_some(Value::List(out)))
            }
            _ => Ok(None),
        }
    }

    /// Rewrites the registered definitions, then serves as the container's
    /// embedded value resolver.
    pub fn install(self: Arc<Self>, container: &BeanContainer) -> ContainerResult<()> {
        container.apply_definition_post_processor(self.as_ref())?;
        container.add_embedded_value_resolver(self);
        Ok(())
    }
}

impl fmt::Debug for PlaceholderConfigurer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaceholderConfigurer")
            .field("config", &self.config)
            .field("ignore_unresolvable", &self.ignore_unresolvable)
            .finish()
    }
}

impl DefinitionPostProcessor for PlaceholderConfigurer {
    fn post_process_definitions(&self, registry: &DefinitionRegistry) -> ContainerResult<()> {
        for (name, definition) in registry.entries() {
            for property in definition.property_values().iter() {
                let literal = match property.source() {
                    PropertySource::Literal(value) => value,
                    PropertySource::Reference(_) => continue,
                };
                let resolved = self.resolve_value(literal).map_err(|source| {
                    ContainerError::PropertyAssignmentFailed {
                        name: name.clone(),
                        property: property.name().to_string(),
                        source: Box::new(source),
                    }
                })?;
                if let Some(value) = resolved {
                    debug!(bean = %name, property = %property.name(), "substituted placeholders");
                    definition.add_property_value(PropertyValue::literal(property.name(), value));
                }
            }
        }
        Ok(())
    }
}

impl StringValueResolver for PlaceholderConfigurer {
    fn resolve_string_value(&self, value: &str) -> Option<String> {
        self.resolve(value).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean_type::BeanType;
    use crate::config::{ConfigValue, MapConfigSource};
    use crate::definition::BeanDefinition;
    use crate::traits::Bean;

    #[derive(Default)]
    struct Pool;
    impl Bean for Pool {}

    fn configurer() -> PlaceholderConfigurer {
        let source = MapConfigSource::new()
            .with("pool.size", ConfigValue::Integer(8))
            .with("a", ConfigValue::String("${b}".into()))
            .with("b", ConfigValue::String("${a}".into()));
        PlaceholderConfigurer::new(ConfigProvider::new().with_source(source)).unwrap()
    }

    #[test]
    fn defaults_and_non_string_values() {
        let configurer = configurer();
        assert_eq!(configurer.resolve("size=${pool.size}").unwrap(), "size=8");
        assert_eq!(configurer.resolve("${pool.name:main}").unwrap(), "main");
        assert_eq!(configurer.resolve("${pool.name:}").unwrap(), "");
        assert_eq!(configurer.resolve("plain").unwrap(), "plain");
    }

    #[test]
    fn circular_placeholders_fail() {
        match configurer().resolve("${a}") {
            Err(ContainerError::Config(message)) => assert!(message.contains("circular")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unresolvable_can_be_ignored() {
        let configurer = configurer().ignore_unresolvable(true);
        assert_eq!(configurer.resolve("x=${nope}").unwrap(), "x=${nope}");
        assert_eq!(configurer.resolve_string_value("${pool.size}").as_deref(), Some("8"));
    }

    #[test]
    fn rewrites_string_literals_in_definitions() {
        let registry = DefinitionRegistry::new();
        registry.register(
            "pool",
            BeanDefinition::new(BeanType::of::<Pool>())
                .property("size", "${pool.size}")
                .property("tags", vec!["${pool.name:main}", "fixed"])
                .property("timeout", 30)
                .reference("owner", "${not.touched}"),
        );

        configurer().post_process_definitions(&registry).unwrap();

        let values = registry.get("pool").unwrap().property_values();
        assert_eq!(values.get("size").unwrap().source(), &PropertySource::Literal(Value::from("8")));
        assert_eq!(
            values.get("tags").unwrap().source(),
            &PropertySource::Literal(Value::from(vec!["main", "fixed"]))
        );
        assert_eq!(values.get("timeout").unwrap().source(), &PropertySource::Literal(Value::Int(30)));
        assert_eq!(values.references().collect::<Vec<_>>(), vec!["${not.touched}"]);
    }

    #[test]
    fn unresolvable_literal_names_bean_and_property() {
        let registry = DefinitionRegistry::new();
        registry.register(
            "pool",
            BeanDefinition::new(BeanType::of::<Pool>()).property("url", "${db.url}"),
        );
        match configurer().post_process_definitions(&registry) {
            Err(ContainerError::PropertyAssignmentFailed { name, property, source }) => {
                assert_eq!(name, "pool");
                assert_eq!(property, "url");
                assert!(matches!(*source, ContainerError::Config(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
