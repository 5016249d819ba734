//! Bean creation: instantiate, expose early, populate, initialize, register
//! for disposal, cache.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::bean_type::BeanType;
use crate::container::BeanContainer;
use crate::definition::{BeanDefinition, PropertySource};
use crate::error::{ContainerError, ContainerResult, InvocationError};
use crate::internal::{CreationGuard, DisposableBeanAdapter};
use crate::traits::Object;
use crate::value::Value;

impl BeanContainer {
    /// Builds one bean. Any failure is wrapped in `ConstructionFailed`
    /// naming the bean, after its early cache entries are dropped. If its
    /// early reference already escaped, every cached bean holding it is
    /// evicted and the error becomes `DependentsEvicted`.
    pub(super) fn create_bean(
        &self,
        name: &str,
        definition: &Arc<BeanDefinition>,
        args: &[Value],
    ) -> ContainerResult<Object> {
        let observers = &self.inner.observers;
        let observed = observers.has_observers();
        if observed {
            observers.creating(name);
        }
        debug!(bean = %name, scope = %definition.scope(), "creating bean");
        let start = Instant::now();

        match self.do_create_bean(name, definition, args) {
            Ok(bean) => {
                if observed {
                    observers.created(name, start.elapsed());
                }
                Ok(bean)
            }
            Err(error) => {
                let handed_out = self.inner.cache.get_early(name).is_some();
                self.inner.cache.remove_early(name);
                for processor in self.post_processors() {
                    if let Some(aware) = processor.as_instantiation_aware() {
                        aware.bean_creation_failed(name);
                    }
                }

                let mut error = ContainerError::construction(name, error);
                if handed_out {
                    let evicted = self.evict_dependents(name);
                    if !evicted.is_empty() {
                        warn!(bean = %name, ?evicted, "evicted beans holding a failed early reference");
                        error = ContainerError::DependentsEvicted {
                            name: name.to_string(),
                            dependents: evicted,
                            source: Box::new(error),
                        };
                    }
                }
                debug!(bean = %name, %error, "bean creation failed");
                if observed {
                    observers.creation_failed(name, &error);
                }
                Err(error)
            }
        }
    }

    /// Removes every finished bean that holds `name`, directly or through
    /// other dependents, from tier 1, the product cache and the disposers.
    /// Returns the evicted names, nearest first.
    fn evict_dependents(&self, name: &str) -> Vec<String> {
        let inner = &self.inner;
        let mut visited = vec![name.to_string()];
        let mut pending: VecDeque<String> =
            inner.dependents.lock().remove(name).unwrap_or_default().into();
        let mut evicted = Vec::new();

        while let Some(dependent) = pending.pop_front() {
            if visited.contains(&dependent) {
                continue;
            }
            visited.push(dependent.clone());
            if inner.cache.remove_finished(&dependent) {
                inner.factory_bean_objects.lock().remove(&dependent);
                inner.disposers.lock().remove(&dependent);
                evicted.push(dependent.clone());
            }
            if let Some(holders) = inner.dependents.lock().remove(&dependent) {
                pending.extend(holders);
            }
        }
        evicted
    }

    fn do_create_bean(
        &self,
        name: &str,
        definition: &Arc<BeanDefinition>,
        args: &[Value],
    ) -> ContainerResult<Object> {
        let inner = &self.inner;
        let _guard = CreationGuard::enter(inner.id, name, inner.settings.max_creation_depth)?;

        let raw = self.instantiate(name, definition.bean_type(), args)?;

        let expose_early = definition.is_singleton() && inner.settings.allow_circular_references;
        if expose_early {
            let container = Arc::downgrade(&self.inner);
            let bean = raw.clone();
            let bean_name = name.to_string();
            inner.cache.register_early_factory(
                name,
                Arc::new(move || match container.upgrade() {
                    Some(inner) => {
                        BeanContainer { inner }.early_bean_reference(&bean_name, bean.clone())
                    }
                    None => Ok(bean.clone()),
                }),
            );
            trace!(bean = %name, "registered early reference factory");
        }

        self.populate_bean(name, definition, &raw)?;
        let mut exposed = self.initialize_bean(name, definition, raw.clone())?;

        if expose_early {
            exposed = self.reconcile_early_reference(name, &raw, exposed)?;
        }

        if definition.is_singleton() {
            if let Some(adapter) =
                DisposableBeanAdapter::for_bean(name, raw.clone(), definition.destroy_method_name())
            {
                trace!(bean = %name, "registered disposer");
                inner.disposers.lock().push(adapter);
            }
            inner.cache.promote_to_finished(name, exposed.clone());
        }

        Ok(exposed)
    }

    fn instantiate(&self, name: &str, bean_type: &BeanType, args: &[Value]) -> ContainerResult<Object> {
        let constructor = bean_type.constructor_for(args.len()).ok_or_else(|| {
            ContainerError::NoMatchingConstructor {
                name: name.to_string(),
                type_name: bean_type.name(),
                arity: args.len(),
            }
        })?;
        let bean = constructor.build(args).map_err(ContainerError::Callback)?;
        trace!(bean = %name, arity = args.len(), "instantiated");
        Ok(bean)
    }

    /// What a circular dependent sees for `bean` while it is still being
    /// built.
    fn early_bean_reference(&self, name: &str, bean: Object) -> ContainerResult<Object> {
        let mut exposed = bean;
        for processor in self.post_processors() {
            if let Some(aware) = processor.as_instantiation_aware() {
                match aware.early_bean_reference(exposed.clone(), name, self)? {
                    Some(next) => exposed = next,
                    None => break,
                }
            }
        }
        trace!(bean = %name, "early reference requested");
        Ok(exposed)
    }

    fn populate_bean(&self, name: &str, definition: &BeanDefinition, bean: &Object) -> ContainerResult<()> {
        for processor in self.post_processors() {
            if let Some(aware) = processor.as_instantiation_aware() {
                if let Some(deltas) = aware.post_process_property_values(definition, bean, name, self)? {
                    definition.merge_property_values(deltas);
                }
            }
        }

        let values = definition.property_values();
        for property in values.iter() {
            let failed = |source: ContainerError| ContainerError::PropertyAssignmentFailed {
                name: name.to_string(),
                property: property.name().to_string(),
                source: Box::new(source),
            };

            let value = match property.source() {
                PropertySource::Reference(reference) => {
                    Value::Object(self.resolve(reference.bean_name()).map_err(failed)?)
                }
                PropertySource::Literal(literal) => self
                    .convert_if_necessary(definition.bean_type(), property.name(), literal.clone())
                    .map_err(failed)?,
            };

            trace!(bean = %name, property = %property.name(), "applying property");
            bean.set_property(property.name(), value)
                .map_err(|e| failed(e.into()))?;
        }
        Ok(())
    }

    /// Converts `value` to the declared kind of `property` when a
    /// conversion service is installed and can do it. Anything else passes
    /// through unchanged.
    fn convert_if_necessary(
        &self,
        bean_type: &BeanType,
        property: &str,
        value: Value,
    ) -> ContainerResult<Value> {
        let target = match bean_type.property_kind(property) {
            Some(kind) if !kind.accepts(value.kind()) => kind,
            _ => return Ok(value),
        };
        match self.conversion_service() {
            Some(service) if service.can_convert(value.kind(), target) => service.convert(value, target),
            _ => Ok(value),
        }
    }

    fn initialize_bean(
        &self,
        name: &str,
        definition: &BeanDefinition,
        bean: Object,
    ) -> ContainerResult<Object> {
        if let Some(aware) = bean.as_bean_name_aware() {
            aware.set_bean_name(name);
        }
        if let Some(aware) = bean.as_container_aware() {
            aware.set_container(self).map_err(ContainerError::Callback)?;
        }

        let processors = self.post_processors();

        let mut current = bean;
        for processor in &processors {
            match processor.post_process_before_initialization(current.clone(), name, self)? {
                Some(next) => current = next,
                None => break,
            }
        }

        self.invoke_init_methods(name, definition, &current)?;

        for processor in &processors {
            match processor.post_process_after_initialization(current.clone(), name, self)? {
                Some(next) => current = next,
                None => break,
            }
        }
        Ok(current)
    }

    fn invoke_init_methods(
        &self,
        name: &str,
        definition: &BeanDefinition,
        bean: &Object,
    ) -> ContainerResult<()> {
        let initializing = bean.as_initializing();
        if let Some(initializing) = initializing {
            trace!(bean = %name, "invoking after_properties_set");
            initializing
                .after_properties_set()
                .map_err(ContainerError::Callback)?;
        }

        let method = match definition.init_method_name() {
            Some(method) => method,
            None => return Ok(()),
        };
        if initializing.is_some() && method == "after_properties_set" {
            return Ok(());
        }
        trace!(bean = %name, %method, "invoking init method");
        match bean.invoke(method, &[]) {
            Ok(_) => Ok(()),
            Err(InvocationError::NoSuchMethod { .. }) => Err(ContainerError::NoSuchInitMethod {
                name: name.to_string(),
                method: method.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// If a circular dependent already holds an early reference, the bean
    /// must end up as that same object.
    fn reconcile_early_reference(
        &self,
        name: &str,
        raw: &Object,
        exposed: Object,
    ) -> ContainerResult<Object> {
        let early = match self.inner.cache.get_early(name) {
            Some(early) => early,
            None => return Ok(exposed),
        };
        if Arc::ptr_eq(&exposed, raw) || Arc::ptr_eq(&exposed, &early) {
            trace!(bean = %name, "using early reference as final bean");
            Ok(early)
        } else {
            Err(ContainerError::EarlyReferenceMismatch {
                name: name.to_string(),
            })
        }
    }
}
