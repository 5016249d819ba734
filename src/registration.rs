//! Definition store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::definition::BeanDefinition;
use crate::key::TypeKey;

/// Definitions keyed by name, remembering registration order
///
/// Registering a name twice overwrites the earlier definition but keeps its
/// original position, so eager start-up and shutdown order stay stable.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{Bean, BeanDefinition, BeanType, DefinitionRegistry};
///
/// #[derive(Default)]
/// struct Mapper;
/// impl Bean for Mapper {}
///
/// let registry = DefinitionRegistry::new();
/// registry.register("b", BeanDefinition::new(BeanType::of::<Mapper>()));
/// registry.register("a", BeanDefinition::new(BeanType::of::<Mapper>()));
/// registry.register("b", BeanDefinition::new(BeanType::of::<Mapper>()).lazy());
///
/// assert_eq!(registry.names(), vec!["b".to_string(), "a".to_string()]);
/// assert!(registry.get("b").unwrap().is_lazy_init());
/// ```
#[derive(Default)]
pub struct DefinitionRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    order: Vec<String>,
    definitions: HashMap<String, Arc<BeanDefinition>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `definition` under `name`, returning the one it replaced.
    pub fn register(
        &self,
        name: impl Into<String>,
        definition: BeanDefinition,
    ) -> Option<Arc<BeanDefinition>> {
        let name = name.into();
        let mut inner = self.inner.write();
        let previous = inner.definitions.insert(name.clone(), Arc::new(definition));
        if previous.is_none() {
            inner.order.push(name);
        } else {
            debug!(bean = %name, "overriding bean definition");
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Arc<BeanDefinition>> {
        self.inner.read().definitions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().definitions.contains_key(name)
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.inner.read().order.clone()
    }

    /// `(name, definition)` pairs in registration order.
    pub fn entries(&self) -> Vec<(String, Arc<BeanDefinition>)> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|name| {
                inner
                    .definitions
                    .get(name)
                    .map(|def| (name.clone(), def.clone()))
            })
            .collect()
    }

    /// Names whose declared type matches `key`, in registration order.
    pub fn names_for_type(&self, key: &TypeKey) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(_, def)| def.bean_type().matches(key))
            .map(|(name, _)| name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
