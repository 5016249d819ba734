//! Proxy objects routing matched calls through interceptor chains.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::aop::advisor::Advisor;
use crate::aop::interceptor::{MethodInterceptor, MethodInvocation};
use crate::aop::pointcut::{MatchAll, MethodSignature, Pointcut};
use crate::bean_type::BeanType;
use crate::error::InvocationError;
use crate::traits::{
    Bean, BeanNameAware, ContainerAware, DisposableBean, FactoryBean, InitializingBean, Object,
};
use crate::value::Value;

/// How a proxy stands in for its target.
///
/// An `Interface` proxy only satisfies the interfaces the target type
/// declares; downcasting it to the concrete type fails. A `Subclass` proxy
/// also impersonates the concrete type, so downcasts reach the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyKind {
    Interface,
    Subclass,
}

type AdvisorPair = (Arc<dyn Pointcut>, Arc<dyn MethodInterceptor>);

/// Target, type and advice that a proxy is built from.
#[derive(Clone)]
pub struct AdvisedSupport {
    target: Object,
    bean_type: BeanType,
    advisors: Vec<AdvisorPair>,
    proxy_target_class: bool,
}

impl AdvisedSupport {
    pub fn new(target: Object, bean_type: BeanType) -> Self {
        AdvisedSupport {
            target,
            bean_type,
            advisors: Vec::new(),
            proxy_target_class: false,
        }
    }

    pub fn add_advisor(&mut self, pointcut: Arc<dyn Pointcut>, interceptor: Arc<dyn MethodInterceptor>) {
        self.advisors.push((pointcut, interceptor));
    }

    /// Adds `advisor` if it is complete. Returns whether it was added.
    pub fn add_advisor_from(&mut self, advisor: &dyn Advisor) -> bool {
        match (advisor.pointcut(), advisor.interceptor()) {
            (Some(pointcut), Some(interceptor)) => {
                self.add_advisor(pointcut, interceptor);
                true
            }
            _ => false,
        }
    }

    /// Adds an interceptor applying to every method.
    pub fn add_interceptor(&mut self, interceptor: Arc<dyn MethodInterceptor>) {
        self.add_advisor(Arc::new(MatchAll), interceptor);
    }

    pub fn with_proxy_target_class(mut self, proxy_target_class: bool) -> Self {
        self.proxy_target_class = proxy_target_class;
        self
    }

    pub fn target(&self) -> &Object {
        &self.target
    }

    pub fn bean_type(&self) -> &BeanType {
        &self.bean_type
    }

    pub fn is_empty(&self) -> bool {
        self.advisors.is_empty()
    }

    pub fn advisor_count(&self) -> usize {
        self.advisors.len()
    }

    /// Subclass proxies are used when requested or when the type declares
    /// no interfaces to implement.
    pub fn proxy_kind(&self) -> ProxyKind {
        if self.proxy_target_class || !self.bean_type.has_interfaces() {
            ProxyKind::Subclass
        } else {
            ProxyKind::Interface
        }
    }

    /// Interceptors whose pointcut matches `method`, in advisor order.
    pub fn interceptors_for(&self, method: &MethodSignature) -> Vec<Arc<dyn MethodInterceptor>> {
        self.advisors
            .iter()
            .filter(|(pointcut, _)| pointcut.matches_method(method, &self.bean_type))
            .map(|(_, interceptor)| interceptor.clone())
            .collect()
    }
}

impl fmt::Debug for AdvisedSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisedSupport")
            .field("target", &self.target.concrete_type_name())
            .field("advisors", &self.advisors.len())
            .field("proxy_target_class", &self.proxy_target_class)
            .finish()
    }
}

/// Builds proxies.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{
///     AdvisedSupport, Bean, BeanType, InvocationError, MethodInvocation, Object, ProxyFactory,
///     ProxyKind, Value,
/// };
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Calculator;
///
/// impl Bean for Calculator {
///     fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, InvocationError> {
///         match method {
///             "double" => Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2)),
///             _ => Err(InvocationError::no_such_method(self, method)),
///         }
///     }
/// }
///
/// let target: Object = Arc::new(Calculator);
/// let mut advised = AdvisedSupport::new(target, BeanType::of::<Calculator>());
/// advised.add_interceptor(Arc::new(|inv: &MethodInvocation<'_>| -> Result<Value, InvocationError> {
///     let value = inv.proceed()?;
///     Ok(Value::Int(value.as_int().unwrap_or(0) + 1))
/// }));
///
/// let factory = ProxyFactory::new(advised);
/// assert_eq!(factory.proxy_kind(), ProxyKind::Subclass);
/// let proxy = factory.get_proxy();
/// assert_eq!(proxy.invoke("double", &[Value::Int(4)]).unwrap(), Value::Int(9));
/// assert!(proxy.downcast_arc::<Calculator>().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ProxyFactory {
    advised: AdvisedSupport,
}

impl ProxyFactory {
    pub fn new(advised: AdvisedSupport) -> Self {
        ProxyFactory { advised }
    }

    pub fn proxy_kind(&self) -> ProxyKind {
        self.advised.proxy_kind()
    }

    pub fn get_proxy(self) -> Object {
        let kind = self.advised.proxy_kind();
        Arc::new(AopProxy {
            advised: self.advised,
            kind,
            chains: RwLock::new(HashMap::new()),
        })
    }
}

/// Wraps `target` so that calls matching `pointcut` go through `interceptor`.
pub fn wrap(
    target: Object,
    bean_type: &BeanType,
    interceptor: Arc<dyn MethodInterceptor>,
    pointcut: Arc<dyn Pointcut>,
    prefer_subclass: bool,
) -> Object {
    let mut advised =
        AdvisedSupport::new(target, bean_type.clone()).with_proxy_target_class(prefer_subclass);
    advised.add_advisor(pointcut, interceptor);
    ProxyFactory::new(advised).get_proxy()
}

type Chain = Arc<[Arc<dyn MethodInterceptor>]>;

/// The stand-in produced by [`ProxyFactory`].
///
/// Lifecycle capabilities and property mutation pass straight through to
/// the target.
pub struct AopProxy {
    advised: AdvisedSupport,
    kind: ProxyKind,
    chains: RwLock<HashMap<MethodSignature, Chain>>,
}

impl AopProxy {
    pub fn target(&self) -> &Object {
        self.advised.target()
    }

    pub fn kind(&self) -> ProxyKind {
        self.kind
    }

    pub fn advised(&self) -> &AdvisedSupport {
        &self.advised
    }

    fn chain_for(&self, signature: MethodSignature) -> Chain {
        if let Some(chain) = self.chains.read().get(&signature) {
            return chain.clone();
        }
        let chain: Chain = self.advised.interceptors_for(&signature).into();
        self.chains
            .write()
            .entry(signature)
            .or_insert(chain)
            .clone()
    }
}

impl Bean for AopProxy {
    fn set_property(&self, name: &str, value: Value) -> Result<(), InvocationError> {
        self.target().set_property(name, value)
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, InvocationError> {
        let chain = self.chain_for(MethodSignature::new(method, args.len()));
        if chain.is_empty() {
            return self.target().invoke(method, args);
        }
        MethodInvocation::new(self.target(), method, args, &chain).proceed()
    }

    fn as_initializing(&self) -> Option<&dyn InitializingBean> {
        self.target().as_initializing()
    }

    fn as_disposable(&self) -> Option<&dyn DisposableBean> {
        self.target().as_disposable()
    }

    fn as_factory_bean(&self) -> Option<&dyn FactoryBean> {
        self.target().as_factory_bean()
    }

    fn as_container_aware(&self) -> Option<&dyn ContainerAware> {
        self.target().as_container_aware()
    }

    fn as_bean_name_aware(&self) -> Option<&dyn BeanNameAware> {
        self.target().as_bean_name_aware()
    }

    fn class_target(&self) -> Option<Object> {
        match self.kind {
            ProxyKind::Subclass => Some(self.target().clone()),
            ProxyKind::Interface => None,
        }
    }
}

impl fmt::Debug for AopProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AopProxy")
            .field("kind", &self.kind)
            .field("advised", &self.advised)
            .finish()
    }
}
