//! # ferrous-beans
//!
//! A bean lifecycle container for Rust: named definitions, singletons that
//! may reference each other in cycles, post-processors that can replace a
//! bean, and proxies that weave interceptors around method calls.
//!
//! ## Features
//!
//! - **Named definitions**: type, scope, property list, init and destroy hooks
//! - **Circular references**: singletons in a reference cycle all resolve,
//!   and every participant sees the same final object
//! - **Post-processors**: hooks before and after initialization, around
//!   property population, and for early references
//! - **Proxies**: pointcut expressions select methods; interface-style and
//!   subclass-style proxies route them through an interceptor chain
//! - **Factory beans**: a bean that produces the object callers receive
//! - **Ordered shutdown**: destroy hooks run once, in registration order
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_beans::{Bean, BeanContainer, BeanDefinition, BeanType, InvocationError, Object, Value};
//! use parking_lot::Mutex;
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Database {
//!     url: Mutex<String>,
//! }
//!
//! impl Bean for Database {
//!     fn set_property(&self, name: &str, value: Value) -> Result<(), InvocationError> {
//!         match (name, value) {
//!             ("url", Value::Str(url)) => *self.url.lock() = url,
//!             (other, _) => return Err(InvocationError::no_such_property(self, other)),
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[derive(Default)]
//! struct UserService {
//!     db: Mutex<Option<Object>>,
//! }
//!
//! impl Bean for UserService {
//!     fn set_property(&self, name: &str, value: Value) -> Result<(), InvocationError> {
//!         match (name, value) {
//!             ("db", Value::Object(db)) => *self.db.lock() = Some(db),
//!             (other, _) => return Err(InvocationError::no_such_property(self, other)),
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let container = BeanContainer::new();
//! container.register_definition(
//!     "db",
//!     BeanDefinition::new(BeanType::of::<Database>()).property("url", "postgres://localhost"),
//! );
//! container.register_definition(
//!     "users",
//!     BeanDefinition::new(BeanType::of::<UserService>()).reference("db", "db"),
//! );
//! container.pre_instantiate_singletons().unwrap();
//!
//! let users = container.get::<UserService>("users").unwrap();
//! let db = users.db.lock().clone().unwrap();
//! assert_eq!(*db.downcast_ref::<Database>().unwrap().url.lock(), "postgres://localhost");
//!
//! container.destroy_singletons().unwrap();
//! ```
//!
//! ## Scopes
//!
//! - **Singleton**: created once, cached, destroyed at shutdown
//! - **Prototype**: created on every request, never tracked
//!
//! ## Proxies
//!
//! ```rust
//! use ferrous_beans::{
//!     AdvisedSupport, Bean, BeanType, InvocationError, MethodInvocation, Object, ProxyFactory,
//!     ProxyKind, Value,
//! };
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {}
//!
//! #[derive(Default)]
//! struct English;
//! impl Bean for English {
//!     fn invoke(&self, method: &str, _args: &[Value]) -> Result<Value, InvocationError> {
//!         match method {
//!             "greet" => Ok(Value::from("hello")),
//!             _ => Err(InvocationError::no_such_method(self, method)),
//!         }
//!     }
//! }
//!
//! let target: Object = Arc::new(English);
//! let bean_type = BeanType::builder::<English>().interface::<dyn Greeter>().build();
//! let mut advised = AdvisedSupport::new(target, bean_type);
//! advised.add_interceptor(Arc::new(|inv: &MethodInvocation<'_>| -> Result<Value, InvocationError> {
//!     let inner = inv.proceed()?;
//!     Ok(Value::from(format!("{}!", inner.as_str().unwrap_or_default())))
//! }));
//!
//! let factory = ProxyFactory::new(advised);
//! assert_eq!(factory.proxy_kind(), ProxyKind::Interface);
//! let proxy = factory.get_proxy();
//! assert_eq!(proxy.invoke("greet", &[]).unwrap(), Value::from("hello!"));
//! ```

pub mod aop;
pub mod autowire;
pub mod bean_type;
pub mod config;
pub mod container;
pub mod convert;
pub mod definition;
pub mod error;
pub mod key;
pub mod observer;
pub mod placeholder;
pub mod processor;
pub mod registration;
pub mod scope;
pub mod traits;
pub mod validation;
pub mod value;

// Internal modules
mod internal;

pub use aop::{
    wrap, AdvisedSupport, Advisor, AfterReturningAdvice, AfterReturningAdviceInterceptor, AopProxy,
    AutoProxyCreator, BeanAdvisor, BeanInterceptor, CallStats, DefaultPointcutAdvisor,
    ExpressionPointcut, ExpressionPointcutAdvisor, LoggingInterceptor, MatchAll, MethodBeforeAdvice,
    MethodBeforeAdviceInterceptor, MethodInterceptor, MethodInvocation, MethodSignature,
    PerformanceInterceptor, Pointcut, ProxyFactory, ProxyKind, ThrowsAdvice, ThrowsAdviceInterceptor,
};
pub use autowire::{
    AutowiredAnnotationProcessor, DeclaredInjectionPoints, InjectionKind, InjectionMetadataResolver,
    InjectionPoint, StringValueResolver,
};
pub use bean_type::{BeanType, BeanTypeBuilder, Constructor};
#[cfg(feature = "config")]
pub use config::JsonConfigSource;
pub use config::{
    ConfigProvider, ConfigSource, ConfigValue, ContainerSettings, EnvironmentConfigSource,
    MapConfigSource, ENV_PREFIX,
};
pub use container::{BeanContainer, WeakBeanContainer, FACTORY_BEAN_PREFIX};
pub use convert::{ConversionService, DefaultConversionService};
pub use definition::{BeanDefinition, BeanReference, PropertySource, PropertyValue, PropertyValues};
pub use error::{BoxError, ContainerError, ContainerResult, InvocationError};
pub use key::TypeKey;
pub use observer::{ContainerObserver, LoggingObserver, MetricsObserver};
pub use placeholder::PlaceholderConfigurer;
pub use processor::{BeanPostProcessor, DefinitionPostProcessor, InstantiationAwareBeanPostProcessor};
pub use registration::DefinitionRegistry;
pub use scope::Scope;
pub use traits::{
    AsAny, Bean, BeanNameAware, ContainerAware, DisposableBean, FactoryBean, InitializingBean, Object,
};
pub use validation::{ValidationError, ValidationResult, ValidationWarning};
pub use value::{Value, ValueKind};

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counter {
        hits: AtomicUsize,
    }
    impl Bean for Counter {}

    #[derive(Default)]
    struct Holder {
        held: Mutex<Option<Object>>,
    }
    impl Bean for Holder {
        fn set_property(&self, name: &str, value: Value) -> Result<(), InvocationError> {
            match (name, value) {
                ("held", Value::Object(o)) => *self.held.lock() = Some(o),
                (other, _) => return Err(InvocationError::no_such_property(self, other)),
            }
            Ok(())
        }
    }

    #[test]
    fn test_singleton_resolution() {
        let container = BeanContainer::new();
        container.register_definition("counter", BeanDefinition::new(BeanType::of::<Counter>()));

        let a = container.resolve("counter").unwrap();
        let b = container.resolve("counter").unwrap();
        assert!(Arc::ptr_eq(&a, &b)); // Same instance
    }

    #[test]
    fn test_prototype_resolution() {
        let container = BeanContainer::new();
        container.register_definition(
            "counter",
            BeanDefinition::new(BeanType::of::<Counter>()).prototype(),
        );

        let a = container.get::<Counter>("counter").unwrap();
        let b = container.get::<Counter>("counter").unwrap();
        a.hits.fetch_add(1, Ordering::SeqCst);
        assert!(!Arc::ptr_eq(&a, &b)); // Different instances
        assert_eq!(b.hits.load(Ordering::SeqCst), 0);
        assert!(!container.contains_singleton("counter"));
    }

    #[test]
    fn test_reference_is_the_cached_singleton() {
        let container = BeanContainer::new();
        container.register_definition("counter", BeanDefinition::new(BeanType::of::<Counter>()));
        container.register_definition(
            "holder",
            BeanDefinition::new(BeanType::of::<Holder>()).reference("held", "counter"),
        );

        let holder = container.get::<Holder>("holder").unwrap();
        let counter = container.resolve("counter").unwrap();
        assert!(Arc::ptr_eq(holder.held.lock().as_ref().unwrap(), &counter));
    }

    #[test]
    fn test_missing_definition() {
        let container = BeanContainer::new();
        assert!(matches!(
            container.resolve("nope"),
            Err(ContainerError::DefinitionNotFound(name)) if name == "nope"
        ));
        assert!(!container.contains_bean("nope"));
    }

    #[test]
    fn test_get_with_wrong_type() {
        let container = BeanContainer::new();
        container.register_definition("counter", BeanDefinition::new(BeanType::of::<Counter>()));
        assert!(matches!(
            container.get::<Holder>("counter"),
            Err(ContainerError::TypeMismatch { .. })
        ));
    }
}
