//! Bean definitions: how to build one named bean.

use std::fmt;

use parking_lot::RwLock;

use crate::bean_type::BeanType;
use crate::scope::Scope;
use crate::value::Value;

/// A property value that names another bean to be resolved at population
/// time instead of being used literally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BeanReference(String);

impl BeanReference {
    pub fn new(bean_name: impl Into<String>) -> Self {
        BeanReference(bean_name.into())
    }

    pub fn bean_name(&self) -> &str {
        &self.0
    }
}

/// Where a property's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertySource {
    Literal(Value),
    Reference(BeanReference),
}

/// One `(name, value-or-reference)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    name: String,
    source: PropertySource,
}

impl PropertyValue {
    pub fn literal(name: impl Into<String>, value: impl Into<Value>) -> Self {
        PropertyValue {
            name: name.into(),
            source: PropertySource::Literal(value.into()),
        }
    }

    pub fn reference(name: impl Into<String>, bean_name: impl Into<String>) -> Self {
        PropertyValue {
            name: name.into(),
            source: PropertySource::Reference(BeanReference::new(bean_name)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &PropertySource {
        &self.source
    }
}

/// Ordered property list. Adding a value whose name is already present
/// replaces it in place.
///
/// ```
/// use ferrous_beans::{PropertySource, PropertyValue, PropertyValues, Value};
///
/// let mut values = PropertyValues::new();
/// values.add(PropertyValue::literal("port", 80));
/// values.add(PropertyValue::reference("pool", "dataSource"));
/// values.add(PropertyValue::literal("port", 8080));
///
/// assert_eq!(values.len(), 2);
/// assert_eq!(values.get("port").unwrap().source(), &PropertySource::Literal(Value::from(8080)));
/// assert_eq!(values.iter().next().unwrap().name(), "port");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyValues {
    values: Vec<PropertyValue>,
}

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: PropertyValue) {
        match self.values.iter_mut().find(|v| v.name == value.name) {
            Some(existing) => *existing = value,
            None => self.values.push(value),
        }
    }

    /// Adds every value of `other`, replacing by name.
    pub fn merge(&mut self, other: PropertyValues) {
        for value in other.values {
            self.add(value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.iter().find(|v| v.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names of beans referenced by these values, in order.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.values.iter().filter_map(|v| match &v.source {
            PropertySource::Reference(r) => Some(r.bean_name()),
            PropertySource::Literal(_) => None,
        })
    }
}

impl FromIterator<PropertyValue> for PropertyValues {
    fn from_iter<I: IntoIterator<Item = PropertyValue>>(iter: I) -> Self {
        let mut values = PropertyValues::new();
        for value in iter {
            values.add(value);
        }
        values
    }
}

/// Declarative description of one named bean
///
/// The type is fixed at creation; the property list stays mutable so that
/// post-processors can append to it before the bean is populated.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{Bean, BeanDefinition, BeanType, Scope};
///
/// #[derive(Default)]
/// struct Mapper;
/// impl Bean for Mapper {}
///
/// let def = BeanDefinition::new(BeanType::of::<Mapper>())
///     .with_scope(Scope::Prototype)
///     .property("table", "users")
///     .reference("pool", "dataSource")
///     .init_method("open")
///     .destroy_method("close");
///
/// assert!(def.scope().is_prototype());
/// assert_eq!(def.init_method_name(), Some("open"));
/// assert_eq!(def.property_values().len(), 2);
/// ```
pub struct BeanDefinition {
    bean_type: BeanType,
    property_values: RwLock<PropertyValues>,
    scope: Scope,
    lazy_init: bool,
    init_method: Option<String>,
    destroy_method: Option<String>,
}

impl BeanDefinition {
    pub fn new(bean_type: BeanType) -> Self {
        BeanDefinition {
            bean_type,
            property_values: RwLock::new(PropertyValues::new()),
            scope: Scope::Singleton,
            lazy_init: false,
            init_method: None,
            destroy_method: None,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn prototype(self) -> Self {
        self.with_scope(Scope::Prototype)
    }

    /// Excludes the bean from eager start-up instantiation.
    pub fn lazy(mut self) -> Self {
        self.lazy_init = true;
        self
    }

    pub fn init_method(mut self, method: impl Into<String>) -> Self {
        self.init_method = Some(method.into());
        self
    }

    pub fn destroy_method(mut self, method: impl Into<String>) -> Self {
        self.destroy_method = Some(method.into());
        self
    }

    /// Adds a literal property.
    pub fn property(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.property_values.write().add(PropertyValue::literal(name, value));
        self
    }

    /// Adds a property resolved from another bean.
    pub fn reference(self, name: impl Into<String>, bean_name: impl Into<String>) -> Self {
        self.property_values.write().add(PropertyValue::reference(name, bean_name));
        self
    }

    pub fn with_property_values(self, values: PropertyValues) -> Self {
        *self.property_values.write() = values;
        self
    }

    pub fn bean_type(&self) -> &BeanType {
        &self.bean_type
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_singleton(&self) -> bool {
        self.scope.is_singleton()
    }

    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init
    }

    pub fn init_method_name(&self) -> Option<&str> {
        self.init_method.as_deref()
    }

    pub fn destroy_method_name(&self) -> Option<&str> {
        self.destroy_method.as_deref()
    }

    /// Snapshot of the current property list.
    pub fn property_values(&self) -> PropertyValues {
        self.property_values.read().clone()
    }

    pub fn add_property_value(&self, value: PropertyValue) {
        self.property_values.write().add(value);
    }

    /// Merges `values` into the property list, replacing by name, so
    /// applying the same deltas twice leaves the list unchanged.
    pub fn merge_property_values(&self, values: PropertyValues) {
        self.property_values.write().merge(values);
    }
}

impl Clone for BeanDefinition {
    fn clone(&self) -> Self {
        BeanDefinition {
            bean_type: self.bean_type.clone(),
            property_values: RwLock::new(self.property_values()),
            scope: self.scope,
            lazy_init: self.lazy_init,
            init_method: self.init_method.clone(),
            destroy_method: self.destroy_method.clone(),
        }
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("type", &self.bean_type.name())
            .field("scope", &self.scope)
            .field("lazy_init", &self.lazy_init)
            .field("init_method", &self.init_method)
            .field("destroy_method", &self.destroy_method)
            .field("property_values", &*self.property_values.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Bean;

    #[derive(Default)]
    struct Thing;
    impl Bean for Thing {}

    #[test]
    fn merging_the_same_deltas_twice_is_idempotent() {
        let def = BeanDefinition::new(BeanType::of::<Thing>()).property("a", 1);
        let deltas: PropertyValues = vec![
            PropertyValue::reference("b", "other"),
            PropertyValue::literal("a", 2),
        ]
        .into_iter()
        .collect();

        def.merge_property_values(deltas.clone());
        def.merge_property_values(deltas);

        let values = def.property_values();
        assert_eq!(values.len(), 2);
        assert_eq!(values.references().collect::<Vec<_>>(), vec!["other"]);
        assert_eq!(
            values.get("a").unwrap().source(),
            &PropertySource::Literal(Value::Int(2))
        );
    }

    #[test]
    fn clone_snapshots_property_list() {
        let def = BeanDefinition::new(BeanType::of::<Thing>()).property("a", 1);
        let copy = def.clone();
        def.add_property_value(PropertyValue::literal("b", true));
        assert_eq!(copy.property_values().len(), 1);
        assert_eq!(def.property_values().len(), 2);
    }
}
