//! Aspect-oriented proxying.
//!
//! A [`Pointcut`] selects methods, a [`MethodInterceptor`] wraps them, and
//! an [`Advisor`] pairs the two. [`ProxyFactory`] builds a stand-in object
//! that routes matched calls through the interceptor chain, and
//! [`AutoProxyCreator`] does this automatically for container beans.

mod advisor;
mod auto_proxy;
mod interceptor;
mod pointcut;
mod proxy;

pub use advisor::{Advisor, BeanAdvisor, BeanInterceptor, DefaultPointcutAdvisor, ExpressionPointcutAdvisor};
pub use auto_proxy::AutoProxyCreator;
pub use interceptor::{
    AfterReturningAdvice, AfterReturningAdviceInterceptor, CallStats, LoggingInterceptor,
    MethodBeforeAdvice, MethodBeforeAdviceInterceptor, MethodInterceptor, MethodInvocation,
    PerformanceInterceptor, ThrowsAdvice, ThrowsAdviceInterceptor,
};
pub use pointcut::{ExpressionPointcut, MatchAll, MethodSignature, Pointcut};
pub use proxy::{wrap, AdvisedSupport, AopProxy, ProxyFactory, ProxyKind};
