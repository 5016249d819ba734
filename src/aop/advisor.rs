//! Advisors: a pointcut paired with the interceptor it guards.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::aop::interceptor::{MethodInterceptor, MethodInvocation};
use crate::aop::pointcut::{ExpressionPointcut, MatchAll, Pointcut};
use crate::bean_type::BeanType;
use crate::error::{ContainerResult, InvocationError};
use crate::traits::{Bean, Object};
use crate::value::{Value, ValueKind};

/// Source of advice for the auto-proxy creator.
///
/// Either half may be missing while an advisor bean is still being
/// configured; incomplete advisors are skipped.
pub trait Advisor: Send + Sync {
    fn pointcut(&self) -> Option<Arc<dyn Pointcut>>;

    fn interceptor(&self) -> Option<Arc<dyn MethodInterceptor>>;
}

/// Advisor built from an explicit pointcut and interceptor.
#[derive(Clone)]
pub struct DefaultPointcutAdvisor {
    pointcut: Arc<dyn Pointcut>,
    interceptor: Arc<dyn MethodInterceptor>,
}

impl DefaultPointcutAdvisor {
    pub fn new(pointcut: Arc<dyn Pointcut>, interceptor: Arc<dyn MethodInterceptor>) -> Self {
        DefaultPointcutAdvisor {
            pointcut,
            interceptor,
        }
    }

    /// Advises every method of every bean.
    pub fn match_all(interceptor: Arc<dyn MethodInterceptor>) -> Self {
        Self::new(Arc::new(MatchAll), interceptor)
    }
}

impl Advisor for DefaultPointcutAdvisor {
    fn pointcut(&self) -> Option<Arc<dyn Pointcut>> {
        Some(self.pointcut.clone())
    }

    fn interceptor(&self) -> Option<Arc<dyn MethodInterceptor>> {
        Some(self.interceptor.clone())
    }
}

/// Advisor whose pointcut is an `execution(..)` expression.
///
/// Usable directly, or registered as a bean of [`bean_type`](Self::bean_type)
/// with an `expression` string property and an `advice` reference to an
/// interceptor bean.
#[derive(Default)]
pub struct ExpressionPointcutAdvisor {
    pointcut: RwLock<Option<Arc<ExpressionPointcut>>>,
    advice: RwLock<Option<Arc<dyn MethodInterceptor>>>,
}

impl ExpressionPointcutAdvisor {
    pub fn new(expression: &str, advice: Arc<dyn MethodInterceptor>) -> ContainerResult<Self> {
        let advisor = Self::default();
        advisor.set_expression(expression)?;
        advisor.set_advice(advice);
        Ok(advisor)
    }

    /// Type descriptor for registering the advisor as a bean.
    pub fn bean_type() -> BeanType {
        BeanType::builder::<Self>()
            .default_constructor()
            .interface::<dyn Advisor>()
            .property("expression", ValueKind::Str)
            .property("advice", ValueKind::Object)
            .build()
    }

    pub fn set_expression(&self, expression: &str) -> ContainerResult<()> {
        let pointcut = ExpressionPointcut::parse(expression)?;
        *self.pointcut.write() = Some(Arc::new(pointcut));
        Ok(())
    }

    pub fn set_advice(&self, advice: Arc<dyn MethodInterceptor>) {
        *self.advice.write() = Some(advice);
    }

    pub fn expression(&self) -> Option<String> {
        self.pointcut
            .read()
            .as_ref()
            .map(|p| p.expression().to_string())
    }
}

impl Advisor for ExpressionPointcutAdvisor {
    fn pointcut(&self) -> Option<Arc<dyn Pointcut>> {
        self.pointcut
            .read()
            .clone()
            .map(|p| p as Arc<dyn Pointcut>)
    }

    fn interceptor(&self) -> Option<Arc<dyn MethodInterceptor>> {
        self.advice.read().clone()
    }
}

impl Bean for ExpressionPointcutAdvisor {
    fn set_property(&self, name: &str, value: Value) -> Result<(), InvocationError> {
        match (name, value) {
            ("expression", Value::Str(expression)) => self
                .set_expression(&expression)
                .map_err(|e| InvocationError::Failed(Box::new(e))),
            ("advice", Value::Object(advice)) => {
                let interceptor = BeanInterceptor::new(advice).ok_or_else(|| {
                    InvocationError::InvalidArguments(
                        "advice bean is not a method interceptor".into(),
                    )
                })?;
                self.set_advice(Arc::new(interceptor));
                Ok(())
            }
            ("expression", other) | ("advice", other) => Err(InvocationError::InvalidArguments(
                format!("unexpected {} for '{}'", other.kind(), name),
            )),
            (other, _) => Err(InvocationError::no_such_property(self, other)),
        }
    }

    fn as_advisor(&self) -> Option<&dyn Advisor> {
        Some(self)
    }
}

impl fmt::Debug for ExpressionPointcutAdvisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionPointcutAdvisor")
            .field("expression", &self.expression())
            .field("has_advice", &self.advice.read().is_some())
            .finish()
    }
}

/// Interceptor backed by a bean exposing the interceptor capability.
pub struct BeanInterceptor(Object);

impl BeanInterceptor {
    pub fn new(bean: Object) -> Option<Self> {
        bean.as_method_interceptor().is_some().then(|| BeanInterceptor(bean))
    }
}

impl MethodInterceptor for BeanInterceptor {
    fn invoke(&self, invocation: &MethodInvocation<'_>) -> Result<Value, InvocationError> {
        match self.0.as_method_interceptor() {
            Some(interceptor) => interceptor.invoke(invocation),
            None => invocation.proceed(),
        }
    }
}

/// Advisor backed by a bean exposing the advisor capability.
pub struct BeanAdvisor(Object);

impl BeanAdvisor {
    pub fn new(bean: Object) -> Option<Self> {
        bean.as_advisor().is_some().then(|| BeanAdvisor(bean))
    }
}

impl Advisor for BeanAdvisor {
    fn pointcut(&self) -> Option<Arc<dyn Pointcut>> {
        self.0.as_advisor().and_then(|a| a.pointcut())
    }

    fn interceptor(&self) -> Option<Arc<dyn MethodInterceptor>> {
        self.0.as_advisor().and_then(|a| a.interceptor())
    }
}
