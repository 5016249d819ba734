//! Post-processor that replaces advised beans with proxies.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::aop::advisor::{Advisor, BeanAdvisor};
use crate::aop::proxy::{AdvisedSupport, ProxyFactory};
use crate::bean_type::BeanType;
use crate::container::BeanContainer;
use crate::error::ContainerResult;
use crate::key::TypeKey;
use crate::processor::{BeanPostProcessor, InstantiationAwareBeanPostProcessor};
use crate::traits::Object;

/// Wraps every bean matched by at least one advisor in a single proxy.
///
/// Advisors come from two places: those attached with
/// [`add_advisor`](Self::add_advisor), and beans in the container that
/// declare the [`Advisor`] interface or expose the advisor capability.
/// Advisors and interceptors are never proxied themselves.
///
/// When a circular dependent pulls a bean early, the proxy is built from
/// the early-reference hook and the after-initialization hook leaves the
/// bean alone, so both sides of the cycle see the same proxy.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{
///     AutoProxyCreator, Bean, BeanContainer, BeanDefinition, BeanType, ExpressionPointcutAdvisor,
///     InvocationError, MethodInvocation, Value,
/// };
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {}
///
/// #[derive(Default)]
/// struct SystemClock;
/// impl Bean for SystemClock {
///     fn invoke(&self, method: &str, _args: &[Value]) -> Result<Value, InvocationError> {
///         match method {
///             "now" => Ok(Value::Int(42)),
///             _ => Err(InvocationError::no_such_method(self, method)),
///         }
///     }
/// }
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counter = calls.clone();
/// let creator = AutoProxyCreator::new();
/// creator.add_advisor(Arc::new(
///     ExpressionPointcutAdvisor::new(
///         "execution(* Clock::now())",
///         Arc::new(move |inv: &MethodInvocation<'_>| -> Result<Value, InvocationError> {
///             counter.fetch_add(1, Ordering::SeqCst);
///             inv.proceed()
///         }),
///     )
///     .unwrap(),
/// ));
///
/// let container = BeanContainer::new();
/// container.add_post_processor(Arc::new(creator));
/// container.register_definition(
///     "clock",
///     BeanDefinition::new(
///         BeanType::builder::<SystemClock>()
///             .default_constructor()
///             .interface::<dyn Clock>()
///             .build(),
///     ),
/// );
///
/// let clock = container.resolve("clock").unwrap();
/// assert_eq!(clock.invoke("now", &[]).unwrap(), Value::Int(42));
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
pub struct AutoProxyCreator {
    advisors: RwLock<Vec<Arc<dyn Advisor>>>,
    early_proxy_references: Mutex<HashMap<String, Object>>,
    proxy_target_class: Option<bool>,
}

impl AutoProxyCreator {
    pub fn new() -> Self {
        AutoProxyCreator {
            advisors: RwLock::new(Vec::new()),
            early_proxy_references: Mutex::new(HashMap::new()),
            proxy_target_class: None,
        }
    }

    /// Overrides [`ContainerSettings::proxy_target_class`](crate::ContainerSettings).
    pub fn with_proxy_target_class(mut self, proxy_target_class: bool) -> Self {
        self.proxy_target_class = Some(proxy_target_class);
        self
    }

    pub fn add_advisor(&self, advisor: Arc<dyn Advisor>) {
        self.advisors.write().push(advisor);
    }

    /// Advisors and interceptors are framework infrastructure.
    pub fn is_infrastructure(&self, bean: &Object) -> bool {
        bean.as_advisor().is_some() || bean.as_method_interceptor().is_some()
    }

    /// Attached advisors followed by advisor beans, in registration order.
    /// Advisor beans still being built on this thread are skipped.
    pub fn candidate_advisors(
        &self,
        container: &BeanContainer,
    ) -> ContainerResult<Vec<Arc<dyn Advisor>>> {
        let mut candidates = self.advisors.read().clone();

        for name in container.bean_names_for_key(&TypeKey::of::<dyn Advisor>()) {
            if container.is_currently_in_creation(&name) {
                debug!(advisor = %name, "skipping advisor currently in creation");
                continue;
            }
            let bean = container.resolve(&name)?;
            if let Some(advisor) = BeanAdvisor::new(bean) {
                candidates.push(Arc::new(advisor));
            }
        }

        for (_, bean) in container.manual_singletons() {
            if let Some(advisor) = BeanAdvisor::new(bean) {
                candidates.push(Arc::new(advisor));
            }
        }

        Ok(candidates)
    }

    fn target_type(bean: &Object, name: &str, container: &BeanContainer) -> BeanType {
        let key = bean.concrete_type_key();
        match container.definition(name) {
            Some(definition) if definition.bean_type().key() == key => {
                definition.bean_type().clone()
            }
            _ => BeanType::of_object(bean),
        }
    }

    /// Returns a proxy for `bean` if any advisor applies, otherwise `bean`.
    pub fn wrap_if_necessary(
        &self,
        bean: Object,
        name: &str,
        container: &BeanContainer,
    ) -> ContainerResult<Object> {
        if self.is_infrastructure(&bean) {
            return Ok(bean);
        }

        let bean_type = Self::target_type(&bean, name, container);
        let proxy_target_class = self
            .proxy_target_class
            .unwrap_or(container.settings().proxy_target_class);
        let mut advised = AdvisedSupport::new(bean.clone(), bean_type.clone())
            .with_proxy_target_class(proxy_target_class);

        for advisor in self.candidate_advisors(container)? {
            if let Some(pointcut) = advisor.pointcut() {
                if pointcut.matches_type(&bean_type) {
                    advised.add_advisor_from(advisor.as_ref());
                }
            }
        }

        if advised.is_empty() {
            return Ok(bean);
        }

        let factory = ProxyFactory::new(advised);
        let kind = factory.proxy_kind();
        info!(bean = %name, ?kind, target = bean_type.short_name(), "creating proxy");
        let proxy = factory.get_proxy();
        container.notify_proxy_created(name, kind);
        Ok(proxy)
    }
}

impl Default for AutoProxyCreator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AutoProxyCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoProxyCreator")
            .field("advisors", &self.advisors.read().len())
            .field("proxy_target_class", &self.proxy_target_class)
            .finish()
    }
}

impl BeanPostProcessor for AutoProxyCreator {
    fn post_process_after_initialization(
        &self,
        bean: Object,
        name: &str,
        container: &BeanContainer,
    ) -> ContainerResult<Option<Object>> {
        let early = self.early_proxy_references.lock().remove(name);
        match early {
            Some(raw) if Arc::ptr_eq(&raw, &bean) => Ok(Some(bean)),
            _ => self.wrap_if_necessary(bean, name, container).map(Some),
        }
    }

    fn as_instantiation_aware(&self) -> Option<&dyn InstantiationAwareBeanPostProcessor> {
        Some(self)
    }
}

impl InstantiationAwareBeanPostProcessor for AutoProxyCreator {
    fn early_bean_reference(
        &self,
        bean: Object,
        name: &str,
        container: &BeanContainer,
    ) -> ContainerResult<Option<Object>> {
        self.early_proxy_references
            .lock()
            .insert(name.to_string(), bean.clone());
        self.wrap_if_necessary(bean, name, container).map(Some)
    }

    fn bean_creation_failed(&self, name: &str) {
        if self.early_proxy_references.lock().remove(name).is_some() {
            debug!(bean = %name, "dropped early proxy reference of failed bean");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aop::advisor::ExpressionPointcutAdvisor;
    use crate::aop::interceptor::LoggingInterceptor;
    use crate::aop::proxy::AopProxy;
    use crate::definition::BeanDefinition;
    use crate::traits::Bean;

    #[derive(Default)]
    struct Worker;
    impl Bean for Worker {}

    #[derive(Default)]
    struct Bystander;
    impl Bean for Bystander {}

    fn creator() -> AutoProxyCreator {
        let creator = AutoProxyCreator::new();
        creator.add_advisor(Arc::new(
            ExpressionPointcutAdvisor::new(
                "execution(* Worker::*(..))",
                Arc::new(LoggingInterceptor::new()),
            )
            .unwrap(),
        ));
        creator
    }

    #[test]
    fn wraps_only_matching_types() {
        let container = BeanContainer::new();
        container.register_definition("worker", BeanDefinition::new(BeanType::of::<Worker>()));
        let creator = creator();

        let worker: Object = Arc::new(Worker);
        let proxied = creator.wrap_if_necessary(worker.clone(), "worker", &container).unwrap();
        assert!(proxied.is::<AopProxy>());
        assert!(!Arc::ptr_eq(&proxied, &worker));

        let bystander: Object = Arc::new(Bystander);
        let same = creator.wrap_if_necessary(bystander.clone(), "bystander", &container).unwrap();
        assert!(Arc::ptr_eq(&same, &bystander));
    }

    #[test]
    fn infrastructure_is_never_wrapped() {
        let container = BeanContainer::new();
        let creator = creator();
        let interceptor: Object = Arc::new(LoggingInterceptor::new());
        assert!(creator.is_infrastructure(&interceptor));
        let same = creator
            .wrap_if_necessary(interceptor.clone(), "logging", &container)
            .unwrap();
        assert!(Arc::ptr_eq(&same, &interceptor));
    }

    #[test]
    fn early_reference_suppresses_second_wrap() {
        let container = BeanContainer::new();
        let creator = creator();
        let raw: Object = Arc::new(Worker);

        let early = creator
            .early_bean_reference(raw.clone(), "worker", &container)
            .unwrap()
            .unwrap();
        assert!(early.is::<AopProxy>());

        let after = creator
            .post_process_after_initialization(raw.clone(), "worker", &container)
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&after, &raw));

        // the early marker is consumed
        let again = creator
            .post_process_after_initialization(raw, "worker", &container)
            .unwrap()
            .unwrap();
        assert!(again.is::<AopProxy>());
    }

    #[test]
    fn failed_creation_releases_the_early_bean() {
        let container = BeanContainer::new();
        let creator = creator();
        let raw: Object = Arc::new(Worker);
        let weak = Arc::downgrade(&raw);

        let early = creator
            .early_bean_reference(raw.clone(), "worker", &container)
            .unwrap()
            .unwrap();
        creator.bean_creation_failed("worker");
        drop(early);
        drop(raw);
        assert!(weak.upgrade().is_none());
    }
}
