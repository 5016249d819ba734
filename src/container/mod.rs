//! The bean container.
//!
//! [`BeanContainer`] owns the definition store, the singleton cache and the
//! post-processor list, and drives the creation pipeline in
//! [`pipeline`](self::pipeline) for every bean it hands out.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tracing::{debug, info, trace, warn};

use crate::aop::ProxyKind;
use crate::autowire::{AutowiredAnnotationProcessor, StringValueResolver};
use crate::config::ContainerSettings;
use crate::convert::ConversionService;
use crate::definition::BeanDefinition;
use crate::error::{ContainerError, ContainerResult};
use crate::internal::{creation_path, current_creation, DisposeBag, SingletonCache};
use crate::key::TypeKey;
use crate::observer::{ContainerObserver, Observers};
use crate::processor::{BeanPostProcessor, DefinitionPostProcessor};
use crate::registration::DefinitionRegistry;
use crate::traits::Object;
use crate::validation::{self, ValidationResult};
use crate::value::Value;

mod pipeline;

/// Prefix that asks for a factory bean itself instead of its product.
pub const FACTORY_BEAN_PREFIX: &str = "&";

static NEXT_CONTAINER_ID: AtomicUsize = AtomicUsize::new(1);

/// Bean container.
///
/// Holds bean definitions, creates beans from them on demand, and manages
/// their lifecycle until [`destroy_singletons`](Self::destroy_singletons).
///
/// Singletons are created once and cached; two threads racing for the same
/// singleton converge on one instance. Prototypes are created afresh on
/// every request and are never tracked for destruction.
///
/// Cloning is cheap and every clone refers to the same container.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{Bean, BeanContainer, BeanDefinition, BeanType, InvocationError, Object, Value};
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
/// }
///
/// impl Bean for Service {
///     fn set_property(&self, name: &str, value: Value) -> Result<(), InvocationError> {
///         match (name, value) {
///             ("mapper", Value::Object(o)) => {
///                 *self.mapper.lock() = Some(o);
///                 Ok(())
///             }
///             (other, _) => Err(InvocationError::no_such_property(self, other)),
///         }
///     }
/// }
///
/// let container = BeanContainer::new();
/// container.register_definition("mapper", BeanDefinition::new(BeanType::of::<Mapper>()));
/// container.register_definition(
///     "service",
///     BeanDefinition::new(BeanType::of::<Service>()).reference("mapper", "mapper"),
/// );
///
/// let service = container.get::<Service>("service").unwrap();
/// let mapper = container.resolve("mapper").unwrap();
/// assert!(Arc::ptr_eq(service.mapper.lock().as_ref().unwrap(), &mapper));
/// ```
#[derive(Clone)]
pub struct BeanContainer {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    id: usize,
    settings: ContainerSettings,
    definitions: DefinitionRegistry,
    cache: SingletonCache,
    factory_bean_objects: Mutex<HashMap<String, Object>>,
    // bean name -> beans that were handed it while they were being created
    dependents: Mutex<HashMap<String, Vec<String>>>,
    manual_singletons: RwLock<Vec<String>>,
    post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,
    creation_lock: ReentrantMutex<()>,
    disposers: Mutex<DisposeBag>,
    conversion_service: RwLock<Option<Arc<dyn ConversionService>>>,
    value_resolvers: RwLock<Vec<Arc<dyn StringValueResolver>>>,
    observers: Observers,
}

/// Non-owning handle to a [`BeanContainer`].
///
/// Beans that keep a reference to their container should hold this rather
/// than a `BeanContainer`, which would keep the container alive through its
/// own singletons.
#[derive(Clone)]
pub struct WeakBeanContainer {
    inner: Weak<ContainerInner>,
}

impl WeakBeanContainer {
    pub fn upgrade(&self) -> Option<BeanContainer> {
        self.inner.upgrade().map(|inner| BeanContainer { inner })
    }
}

impl fmt::Debug for WeakBeanContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakBeanContainer")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl BeanContainer {
    /// Container with default settings.
    pub fn new() -> Self {
        Self::with_settings(ContainerSettings::default())
    }

    pub fn with_settings(settings: ContainerSettings) -> Self {
        let annotation_injection = settings.annotation_injection;
        let container = BeanContainer {
            inner: Arc::new(ContainerInner {
                id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
                settings,
                definitions: DefinitionRegistry::new(),
                cache: SingletonCache::new(),
                factory_bean_objects: Mutex::new(HashMap::new()),
                dependents: Mutex::new(HashMap::new()),
                manual_singletons: RwLock::new(Vec::new()),
                post_processors: RwLock::new(Vec::new()),
                creation_lock: ReentrantMutex::new(()),
                disposers: Mutex::new(DisposeBag::default()),
                conversion_service: RwLock::new(None),
                value_resolvers: RwLock::new(Vec::new()),
                observers: Observers::default(),
            }),
        };
        if annotation_injection {
            container.add_post_processor(Arc::new(AutowiredAnnotationProcessor::new()));
        }
        container
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.inner.settings
    }

    pub fn downgrade(&self) -> WeakBeanContainer {
        WeakBeanContainer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ----- definitions -----

    /// Stores `definition` under `name`, replacing any earlier one.
    pub fn register_definition(&self, name: impl Into<String>, definition: BeanDefinition) {
        self.inner.definitions.register(name, definition);
    }

    pub fn contains_definition(&self, name: &str) -> bool {
        self.inner.definitions.contains(name)
    }

    pub fn definition(&self, name: &str) -> Option<Arc<BeanDefinition>> {
        self.inner.definitions.get(name)
    }

    /// Definition names in registration order.
    pub fn definition_names(&self) -> Vec<String> {
        self.inner.definitions.names()
    }

    /// The definition store, for definition-level tooling.
    pub fn registry(&self) -> &DefinitionRegistry {
        &self.inner.definitions
    }

    /// Runs a definition post-processor over the store.
    pub fn apply_definition_post_processor(
        &self,
        processor: &dyn DefinitionPostProcessor,
    ) -> ContainerResult<()> {
        processor.post_process_definitions(&self.inner.definitions)
    }

    // ----- singletons -----

    /// Installs a pre-built object as a finished singleton.
    ///
    /// The object takes part in type lookups through its concrete type. It
    /// is not post-processed and gets no disposer.
    pub fn register_singleton(&self, name: impl Into<String>, object: Object) -> ContainerResult<()> {
        let name = name.into();
        let _lock = self.inner.creation_lock.lock();
        if self.inner.cache.contains_finished(&name) {
            return Err(ContainerError::DuplicateSingleton(name));
        }
        debug!(bean = %name, "registering singleton");
        self.inner.cache.promote_to_finished(&name, object);
        self.inner.manual_singletons.write().push(name);
        Ok(())
    }

    /// Whether a finished singleton exists under `name`.
    pub fn contains_singleton(&self, name: &str) -> bool {
        self.inner.cache.contains_finished(name)
    }

    /// Whether `name` is known as a definition or a singleton.
    pub fn contains_bean(&self, name: &str) -> bool {
        let name = name.strip_prefix(FACTORY_BEAN_PREFIX).unwrap_or(name);
        self.contains_definition(name) || self.contains_singleton(name)
    }

    /// Finished singletons in completion order.
    pub fn singletons(&self) -> Vec<(String, Object)> {
        self.inner.cache.finished_entries()
    }

    pub(crate) fn manual_singletons(&self) -> Vec<(String, Object)> {
        let names = self.inner.manual_singletons.read().clone();
        names
            .into_iter()
            .filter_map(|name| {
                let object = self.inner.cache.get_finished(&name)?;
                Some((name, object))
            })
            .collect()
    }

    /// Whether `name` is being built on this thread, or has an early
    /// reference outstanding.
    pub fn is_currently_in_creation(&self, name: &str) -> bool {
        creation_path(self.inner.id).iter().any(|n| n == name) || self.inner.cache.is_in_creation(name)
    }

    // ----- resolution -----

    /// Returns the bean named `name`, creating it if needed.
    ///
    /// A name starting with [`FACTORY_BEAN_PREFIX`] returns a factory bean
    /// itself rather than its product.
    pub fn resolve(&self, name: &str) -> ContainerResult<Object> {
        self.do_get(name, None)
    }

    /// Like [`resolve`](Self::resolve) but builds the bean with the
    /// constructor taking `args.len()` arguments. A singleton that already
    /// exists is returned as is.
    pub fn resolve_with_args(&self, name: &str, args: Vec<Value>) -> ContainerResult<Object> {
        self.do_get(name, Some(args))
    }

    /// Returns the bean named `name` as its concrete type.
    ///
    /// Subclass-style proxies downcast to their target type; interface-style
    /// proxies do not.
    pub fn get<T: std::any::Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        self.resolve(name)?
            .downcast_arc::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// The single bean whose concrete type or declared interface is `T`.
    pub fn resolve_by_type<T: ?Sized + 'static>(&self) -> ContainerResult<Object> {
        self.resolve_by_key(&TypeKey::of::<T>())
    }

    pub fn resolve_by_key(&self, key: &TypeKey) -> ContainerResult<Object> {
        let name = self.single_name_for_key(key)?;
        self.resolve(&name)
    }

    /// The single bean of concrete type `T`, downcast.
    pub fn get_by_type<T: std::any::Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        let name = self.single_name_for_key(&TypeKey::of::<T>())?;
        self.get::<T>(&name)
    }

    pub fn bean_names_for_type<T: ?Sized + 'static>(&self) -> Vec<String> {
        self.bean_names_for_key(&TypeKey::of::<T>())
    }

    /// Definitions whose declared type matches `key`, then registered
    /// singletons whose concrete type is `key`.
    pub fn bean_names_for_key(&self, key: &TypeKey) -> Vec<String> {
        let mut names = self.inner.definitions.names_for_type(key);
        for (name, object) in self.manual_singletons() {
            if !names.contains(&name) && object.concrete_type_key() == *key {
                names.push(name);
            }
        }
        names
    }

    /// Name of the only bean matching `key`.
    pub fn single_name_for_key(&self, key: &TypeKey) -> ContainerResult<String> {
        let mut names = self.bean_names_for_key(key);
        match names.len() {
            0 => Err(ContainerError::NoMatchingType {
                type_name: key.name(),
            }),
            1 => Ok(names.remove(0)),
            _ => Err(ContainerError::AmbiguousType {
                type_name: key.name(),
                candidates: names,
            }),
        }
    }

    /// Every bean matching `T`, in registration order.
    pub fn beans_of_type<T: ?Sized + 'static>(&self) -> ContainerResult<Vec<(String, Object)>> {
        self.bean_names_for_type::<T>()
            .into_iter()
            .map(|name| self.resolve(&name).map(|bean| (name, bean)))
            .collect()
    }

    fn do_get(&self, name: &str, args: Option<Vec<Value>>) -> ContainerResult<Object> {
        let (bean_name, want_factory) = match name.strip_prefix(FACTORY_BEAN_PREFIX) {
            Some(stripped) => (stripped, true),
            None => (name, false),
        };
        let bean = self.raw_bean(bean_name, args)?;
        self.record_dependent(bean_name);
        self.object_for_bean_instance(bean, bean_name, want_factory)
    }

    /// Notes that the bean currently being created on this thread holds
    /// `name`.
    fn record_dependent(&self, name: &str) {
        let dependent = match current_creation(self.inner.id) {
            Some(dependent) if dependent != name => dependent,
            _ => return,
        };
        let mut dependents = self.inner.dependents.lock();
        let entry = dependents.entry(name.to_string()).or_default();
        if !entry.contains(&dependent) {
            entry.push(dependent);
        }
    }

    /// The bean registered under `name`, without factory-bean indirection.
    fn raw_bean(&self, name: &str, args: Option<Vec<Value>>) -> ContainerResult<Object> {
        if let Some(hit) = self.inner.cache.get_finished(name) {
            trace!(bean = %name, "singleton cache hit");
            return Ok(hit);
        }

        let definition = self
            .inner
            .definitions
            .get(name)
            .ok_or_else(|| ContainerError::DefinitionNotFound(name.to_string()))?;
        let args = args.unwrap_or_default();

        if !definition.is_singleton() {
            return self.create_bean(name, &definition, &args);
        }

        let _lock = self.inner.creation_lock.lock();
        if let Some(hit) = self.inner.cache.get(name)? {
            trace!(bean = %name, "singleton cache hit under creation lock");
            return Ok(hit);
        }
        self.create_bean(name, &definition, &args)
    }

    fn object_for_bean_instance(
        &self,
        bean: Object,
        name: &str,
        want_factory: bool,
    ) -> ContainerResult<Object> {
        if want_factory {
            if bean.as_factory_bean().is_none() {
                return Err(ContainerError::TypeMismatch {
                    name: name.to_string(),
                    expected: "FactoryBean",
                });
            }
            return Ok(bean);
        }

        let factory = match bean.as_factory_bean() {
            Some(factory) => factory,
            None => return Ok(bean.clone()),
        };
        let produce = || {
            factory
                .get_object()
                .map_err(|e| ContainerError::construction(name, ContainerError::Callback(e)))
        };

        if !(factory.is_singleton() && self.inner.cache.contains_finished(name)) {
            return produce();
        }

        if let Some(product) = self.inner.factory_bean_objects.lock().get(name) {
            return Ok(product.clone());
        }
        let _lock = self.inner.creation_lock.lock();
        if let Some(product) = self.inner.factory_bean_objects.lock().get(name) {
            return Ok(product.clone());
        }
        let product = produce()?;
        trace!(bean = %name, "caching factory bean product");
        self.inner
            .factory_bean_objects
            .lock()
            .insert(name.to_string(), product.clone());
        Ok(product)
    }

    // ----- extension points -----

    /// Appends `processor`. Adding the same processor again moves it to the
    /// end.
    pub fn add_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        let mut processors = self.inner.post_processors.write();
        processors.retain(|existing| !Arc::ptr_eq(existing, &processor));
        debug!(processor = processor.name(), "adding post-processor");
        processors.push(processor);
    }

    pub fn post_processor_count(&self) -> usize {
        self.inner.post_processors.read().len()
    }

    pub(crate) fn post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.inner.post_processors.read().clone()
    }

    pub fn set_conversion_service(&self, service: Arc<dyn ConversionService>) {
        *self.inner.conversion_service.write() = Some(service);
    }

    pub fn conversion_service(&self) -> Option<Arc<dyn ConversionService>> {
        self.inner.conversion_service.read().clone()
    }

    pub fn add_embedded_value_resolver(&self, resolver: Arc<dyn StringValueResolver>) {
        self.inner.value_resolvers.write().push(resolver);
    }

    /// Passes `value` through every embedded value resolver in order.
    /// `None` if any resolver fails; `value` unchanged if there are none.
    pub fn resolve_embedded_value(&self, value: &str) -> Option<String> {
        let resolvers = self.inner.value_resolvers.read().clone();
        let mut current = value.to_string();
        for resolver in resolvers {
            current = resolver.resolve_string_value(&current)?;
        }
        Some(current)
    }

    pub fn add_observer(&self, observer: Arc<dyn ContainerObserver>) {
        self.inner.observers.add(observer);
    }

    pub(crate) fn notify_proxy_created(&self, name: &str, kind: ProxyKind) {
        self.inner.observers.proxy_created(name, kind);
    }

    // ----- lifecycle -----

    /// Creates every non-lazy singleton in registration order, stopping at
    /// the first failure. Factory beans are created, their products are not.
    pub fn pre_instantiate_singletons(&self) -> ContainerResult<()> {
        let eager: Vec<_> = self
            .inner
            .definitions
            .entries()
            .into_iter()
            .filter(|(_, definition)| definition.is_singleton() && !definition.is_lazy_init())
            .map(|(name, _)| name)
            .collect();

        info!(count = eager.len(), "pre-instantiating singletons");
        for name in &eager {
            self.raw_bean(name, None)?;
        }
        Ok(())
    }

    /// Empties the singleton cache, then runs every registered disposer once,
    /// in registration order.
    ///
    /// A failing disposer does not stop the others; all failures are
    /// returned together as [`ContainerError::DestroyFailed`].
    pub fn destroy_singletons(&self) -> ContainerResult<()> {
        // unpublish before any hook runs
        let bag = {
            let _lock = self.inner.creation_lock.lock();
            let bag = std::mem::take(&mut *self.inner.disposers.lock());
            self.inner.cache.clear();
            self.inner.factory_bean_objects.lock().clear();
            self.inner.dependents.lock().clear();
            self.inner.manual_singletons.write().clear();
            bag
        };
        info!(count = bag.len(), "destroying singletons");

        let mut failures = Vec::new();
        for (name, outcome) in bag.run_all_in_order() {
            match outcome {
                Ok(()) => self.inner.observers.destroyed(&name, None),
                Err(error) => {
                    warn!(bean = %name, %error, "destroy hook failed");
                    self.inner.observers.destroyed(&name, Some(&error));
                    failures.push((name, error));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ContainerError::DestroyFailed { failures })
        }
    }

    /// Checks the reference graph of the registered definitions.
    pub fn validate(&self) -> ValidationResult {
        let singletons: Vec<(String, TypeKey)> = self
            .manual_singletons()
            .into_iter()
            .map(|(name, object)| {
                let key = object.concrete_type_key();
                (name, key)
            })
            .collect();
        validation::validate(&self.inner.definitions, &singletons, &self.inner.settings)
    }
}

impl Default for BeanContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BeanContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanContainer")
            .field("id", &self.inner.id)
            .field("definitions", &self.inner.definitions.len())
            .field("singletons", &self.inner.cache.finished_entries().len())
            .field("post_processors", &self.inner.post_processors.read().len())
            .finish()
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        let undisposed = self.disposers.get_mut().len();
        if undisposed > 0 {
            warn!(
                container = self.id,
                undisposed, "container dropped with undisposed beans; call destroy_singletons() first"
            );
        }
    }
}
