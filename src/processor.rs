//! Extension hooks invoked while beans are built.
//!
//! Processors run in registration order at four points of construction:
//!
//! 1. **property values**: after instantiation, before population; may
//!    contribute property entries that are merged into the definition.
//! 2. **before initialization**: after population, before init hooks.
//! 3. **after initialization**: after init hooks; the usual place to
//!    substitute a proxy.
//! 4. **early reference**: only when a circular dependent asks for a bean
//!    that is still being built.
//!
//! For the three hooks that return an object, `Ok(None)` ends the chain for
//! that hook: the last object returned by an earlier processor (or the bean
//! itself) is used and later processors are skipped.

use crate::container::BeanContainer;
use crate::definition::{BeanDefinition, PropertyValues};
use crate::error::ContainerResult;
use crate::registration::DefinitionRegistry;
use crate::traits::Object;

/// Hook around bean initialization.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanContainer, BeanPostProcessor, ContainerResult, Object};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct CountingProcessor {
///     seen: AtomicUsize,
/// }
///
/// impl BeanPostProcessor for CountingProcessor {
///     fn post_process_after_initialization(
///         &self,
///         bean: Object,
///         _name: &str,
///         _container: &BeanContainer,
///     ) -> ContainerResult<Option<Object>> {
///         self.seen.fetch_add(1, Ordering::SeqCst);
///         Ok(Some(bean))
///     }
/// }
///
/// let container = BeanContainer::new();
/// container.add_post_processor(Arc::new(CountingProcessor::default()));
/// ```
pub trait BeanPostProcessor: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn post_process_before_initialization(
        &self,
        bean: Object,
        _name: &str,
        _container: &BeanContainer,
    ) -> ContainerResult<Option<Object>> {
        Ok(Some(bean))
    }

    fn post_process_after_initialization(
        &self,
        bean: Object,
        _name: &str,
        _container: &BeanContainer,
    ) -> ContainerResult<Option<Object>> {
        Ok(Some(bean))
    }

    /// Probe for the richer instantiation-aware hooks.
    fn as_instantiation_aware(&self) -> Option<&dyn InstantiationAwareBeanPostProcessor> {
        None
    }
}

/// Processor that also takes part in population and early exposure.
pub trait InstantiationAwareBeanPostProcessor: BeanPostProcessor {
    /// Property entries to add to `definition` before `bean` is populated.
    /// `Ok(None)` contributes nothing; later processors still run.
    fn post_process_property_values(
        &self,
        _definition: &BeanDefinition,
        _bean: &Object,
        _name: &str,
        _container: &BeanContainer,
    ) -> ContainerResult<Option<PropertyValues>> {
        Ok(None)
    }

    /// The object a circular dependent should see for `bean`. Must agree
    /// with what `post_process_after_initialization` decides for the same
    /// bean.
    fn early_bean_reference(
        &self,
        bean: Object,
        _name: &str,
        _container: &BeanContainer,
    ) -> ContainerResult<Option<Object>> {
        Ok(Some(bean))
    }

    /// Called when creating `name` failed, so state kept between the early
    /// and after-initialization hooks can be released.
    fn bean_creation_failed(&self, _name: &str) {}
}

/// Hook over the definition store, run before beans are created.
pub trait DefinitionPostProcessor: Send + Sync {
    fn post_process_definitions(&self, registry: &DefinitionRegistry) -> ContainerResult<()>;
}

impl<F> DefinitionPostProcessor for F
where
    F: Fn(&DefinitionRegistry) -> ContainerResult<()> + Send + Sync,
{
    fn post_process_definitions(&self, registry: &DefinitionRegistry) -> ContainerResult<()> {
        self(registry)
    }
}
