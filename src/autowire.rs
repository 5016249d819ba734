//! Injection points and the processor that turns them into property values.
//!
//! A bean type may declare injection points (by name, by type, or a
//! placeholder expression). [`AutowiredAnnotationProcessor`] reads them
//! through a pluggable [`InjectionMetadataResolver`] and contributes the
//! matching property entries before the bean is populated, so injected
//! dependencies go through the same reference resolution as explicitly
//! configured ones.

use std::sync::Arc;

use tracing::trace;

use crate::bean_type::BeanType;
use crate::container::BeanContainer;
use crate::definition::{BeanDefinition, PropertyValue, PropertyValues};
use crate::error::{ContainerError, ContainerResult};
use crate::key::TypeKey;
use crate::processor::{BeanPostProcessor, InstantiationAwareBeanPostProcessor};
use crate::traits::Object;

/// How an injection point finds its value.
#[derive(Debug, Clone, PartialEq)]
pub enum InjectionKind {
    /// The bean with this name.
    ByName(String),
    /// The single bean whose type or interface matches.
    ByType(TypeKey),
    /// A placeholder expression resolved through the container's embedded
    /// value resolvers.
    Value(String),
}

/// A property to be injected.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionPoint {
    property: String,
    kind: InjectionKind,
}

impl InjectionPoint {
    pub fn new(property: impl Into<String>, kind: InjectionKind) -> Self {
        InjectionPoint {
            property: property.into(),
            kind,
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn kind(&self) -> &InjectionKind {
        &self.kind
    }
}

/// Supplies the injection points of a bean type.
pub trait InjectionMetadataResolver: Send + Sync {
    fn injection_points(&self, bean_type: &BeanType) -> Vec<InjectionPoint>;
}

/// Reads the points declared on the [`BeanType`] builder.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredInjectionPoints;

impl InjectionMetadataResolver for DeclaredInjectionPoints {
    fn injection_points(&self, bean_type: &BeanType) -> Vec<InjectionPoint> {
        bean_type.injection_points().to_vec()
    }
}

/// Resolves embedded string values such as `${db.url}`.
///
/// Returning `None` means the value cannot be resolved.
pub trait StringValueResolver: Send + Sync {
    fn resolve_string_value(&self, value: &str) -> Option<String>;
}

impl<F> StringValueResolver for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn resolve_string_value(&self, value: &str) -> Option<String> {
        self(value)
    }
}

/// Turns declared injection points into property values.
///
/// Registered automatically unless
/// [`ContainerSettings::annotation_injection`](crate::ContainerSettings) is
/// off.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{
///     Bean, BeanContainer, BeanDefinition, BeanType, InvocationError, Object, Value,
/// };
/// use parking_lot::Mutex;
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Mapper;
/// impl Bean for Mapper {}
///
/// #[derive(Default)]
/// struct Service {
///     mapper: Mutex<Option<Object>>,
///     url: Mutex<String>,
/// }
///
/// impl Bean for Service {
///     fn set_property(&self, name: &str, value: Value) -> Result<(), InvocationError> {
///         match (name, value) {
///             ("mapper", Value::Object(o)) => *self.mapper.lock() = Some(o),
///             ("url", Value::Str(s)) => *self.url.lock() = s,
///             (other, _) => return Err(InvocationError::no_such_property(self, other)),
///         }
///         Ok(())
///     }
/// }
///
/// let container = BeanContainer::new();
/// container.add_embedded_value_resolver(Arc::new(|v: &str| Some(v.replace("${db.url}", "mem://"))));
/// container.register_definition("mapper", BeanDefinition::new(BeanType::of::<Mapper>()));
/// container.register_definition(
///     "service",
///     BeanDefinition::new(
///         BeanType::builder::<Service>()
///             .default_constructor()
///             .autowired("mapper")
///             .value("url", "${db.url}")
///             .build(),
///     ),
/// );
///
/// let service = container.get::<Service>("service").unwrap();
/// assert_eq!(*service.url.lock(), "mem://");
/// assert!(service.mapper.lock().is_some());
/// ```
pub struct AutowiredAnnotationProcessor {
    metadata: Arc<dyn InjectionMetadataResolver>,
}

impl AutowiredAnnotationProcessor {
    pub fn new() -> Self {
        Self::with_metadata(Arc::new(DeclaredInjectionPoints))
    }

    pub fn with_metadata(metadata: Arc<dyn InjectionMetadataResolver>) -> Self {
        AutowiredAnnotationProcessor { metadata }
    }

    fn property_value(
        &self,
        point: &InjectionPoint,
        name: &str,
        container: &BeanContainer,
    ) -> ContainerResult<PropertyValue> {
        let failed = |source: ContainerError| ContainerError::PropertyAssignmentFailed {
            name: name.to_string(),
            property: point.property.clone(),
            source: Box::new(source),
        };

        match &point.kind {
            InjectionKind::ByName(bean) => Ok(PropertyValue::reference(&point.property, bean)),
            InjectionKind::ByType(key) => {
                let candidate = container.single_name_for_key(key).map_err(failed)?;
                Ok(PropertyValue::reference(&point.property, candidate))
            }
            InjectionKind::Value(expression) => {
                let resolved = container.resolve_embedded_value(expression).ok_or_else(|| {
                    failed(ContainerError::Config(format!(
                        "could not resolve placeholder in '{}'",
                        expression
                    )))
                })?;
                Ok(PropertyValue::literal(&point.property, resolved))
            }
        }
    }
}

impl Default for AutowiredAnnotationProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanPostProcessor for AutowiredAnnotationProcessor {
    fn as_instantiation_aware(&self) -> Option<&dyn InstantiationAwareBeanPostProcessor> {
        Some(self)
    }
}

impl InstantiationAwareBeanPostProcessor for AutowiredAnnotationProcessor {
    fn post_process_property_values(
        &self,
        definition: &BeanDefinition,
        _bean: &Object,
        name: &str,
        container: &BeanContainer,
    ) -> ContainerResult<Option<PropertyValues>> {
        let points = self.metadata.injection_points(definition.bean_type());
        if points.is_empty() {
            return Ok(None);
        }

        let mut values = PropertyValues::new();
        for point in &points {
            trace!(bean = %name, property = %point.property, "injecting");
            values.add(self.property_value(point, name, container)?);
        }
        Ok(Some(values))
    }
}
