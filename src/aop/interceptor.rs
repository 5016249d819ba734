//! Method interception: the invocation chain and the stock advice types.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn, Level};

use crate::error::{BoxError, InvocationError};
use crate::traits::{Bean, Object};
use crate::value::Value;

/// Around-advice for a proxied call.
///
/// Implementations call [`MethodInvocation::proceed`] to continue down the
/// chain, or return without proceeding to short-circuit the call.
pub trait MethodInterceptor: Send + Sync {
    fn invoke(&self, invocation: &MethodInvocation<'_>) -> Result<Value, InvocationError>;
}

impl<F> MethodInterceptor for F
where
    F: Fn(&MethodInvocation<'_>) -> Result<Value, InvocationError> + Send + Sync,
{
    fn invoke(&self, invocation: &MethodInvocation<'_>) -> Result<Value, InvocationError> {
        self(invocation)
    }
}

/// One call travelling through an interceptor chain.
///
/// Each interceptor sees the invocation positioned after itself, so
/// `proceed` hands the call to the next interceptor or, at the end of the
/// chain, to the target. `proceed` may be called more than once.
pub struct MethodInvocation<'a> {
    target: &'a Object,
    method: &'a str,
    arguments: Cow<'a, [Value]>,
    chain: &'a [Arc<dyn MethodInterceptor>],
    index: usize,
}

impl<'a> MethodInvocation<'a> {
    pub(crate) fn new(
        target: &'a Object,
        method: &'a str,
        arguments: &'a [Value],
        chain: &'a [Arc<dyn MethodInterceptor>],
    ) -> Self {
        MethodInvocation {
            target,
            method,
            arguments: Cow::Borrowed(arguments),
            chain,
            index: 0,
        }
    }

    /// Continues with the current arguments.
    pub fn proceed(&self) -> Result<Value, InvocationError> {
        self.dispatch(&self.arguments)
    }

    /// Continues with replaced arguments.
    pub fn proceed_with(&self, arguments: Vec<Value>) -> Result<Value, InvocationError> {
        self.dispatch(&arguments)
    }

    fn dispatch(&self, arguments: &[Value]) -> Result<Value, InvocationError> {
        match self.chain.get(self.index) {
            Some(next) => next.invoke(&MethodInvocation {
                target: self.target,
                method: self.method,
                arguments: Cow::Borrowed(arguments),
                chain: self.chain,
                index: self.index + 1,
            }),
            None => self.target.invoke(self.method, arguments),
        }
    }

    /// The advised target (never the proxy).
    pub fn this(&self) -> &Object {
        self.target
    }

    pub fn method(&self) -> &str {
        self.method
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }
}

/// Advice run before the call; an error aborts it.
pub trait MethodBeforeAdvice: Send + Sync {
    fn before(&self, method: &str, args: &[Value], target: &Object) -> Result<(), BoxError>;
}

/// Advice run after a successful call. Cannot change the returned value.
pub trait AfterReturningAdvice: Send + Sync {
    fn after_returning(
        &self,
        returned: &Value,
        method: &str,
        args: &[Value],
        target: &Object,
    ) -> Result<(), BoxError>;
}

/// Advice run when the call fails. The original error is still returned.
pub trait ThrowsAdvice: Send + Sync {
    fn after_throwing(&self, method: &str, args: &[Value], error: &InvocationError);
}

/// Adapts a [`MethodBeforeAdvice`] to the interceptor chain.
pub struct MethodBeforeAdviceInterceptor {
    advice: Arc<dyn MethodBeforeAdvice>,
}

impl MethodBeforeAdviceInterceptor {
    pub fn new(advice: Arc<dyn MethodBeforeAdvice>) -> Self {
        MethodBeforeAdviceInterceptor { advice }
    }
}

impl MethodInterceptor for MethodBeforeAdviceInterceptor {
    fn invoke(&self, invocation: &MethodInvocation<'_>) -> Result<Value, InvocationError> {
        self.advice
            .before(invocation.method(), invocation.arguments(), invocation.this())
            .map_err(InvocationError::Failed)?;
        invocation.proceed()
    }
}

impl Bean for MethodBeforeAdviceInterceptor {
    fn as_method_interceptor(&self) -> Option<&dyn MethodInterceptor> {
        Some(self)
    }
}

/// Adapts an [`AfterReturningAdvice`] to the interceptor chain.
pub struct AfterReturningAdviceInterceptor {
    advice: Arc<dyn AfterReturningAdvice>,
}

impl AfterReturningAdviceInterceptor {
    pub fn new(advice: Arc<dyn AfterReturningAdvice>) -> Self {
        AfterReturningAdviceInterceptor { advice }
    }
}

impl MethodInterceptor for AfterReturningAdviceInterceptor {
    fn invoke(&self, invocation: &MethodInvocation<'_>) -> Result<Value, InvocationError> {
        let returned = invocation.proceed()?;
        self.advice
            .after_returning(
                &returned,
                invocation.method(),
                invocation.arguments(),
                invocation.this(),
            )
            .map_err(InvocationError::Failed)?;
        Ok(returned)
    }
}

impl Bean for AfterReturningAdviceInterceptor {
    fn as_method_interceptor(&self) -> Option<&dyn MethodInterceptor> {
        Some(self)
    }
}

/// Adapts a [`ThrowsAdvice`] to the interceptor chain.
pub struct ThrowsAdviceInterceptor {
    advice: Arc<dyn ThrowsAdvice>,
}

impl ThrowsAdviceInterceptor {
    pub fn new(advice: Arc<dyn ThrowsAdvice>) -> Self {
        ThrowsAdviceInterceptor { advice }
    }
}

impl MethodInterceptor for ThrowsAdviceInterceptor {
    fn invoke(&self, invocation: &MethodInvocation<'_>) -> Result<Value, InvocationError> {
        invocation.proceed().map_err(|error| {
            self.advice
                .after_throwing(invocation.method(), invocation.arguments(), &error);
            error
        })
    }
}

impl Bean for ThrowsAdviceInterceptor {
    fn as_method_interceptor(&self) -> Option<&dyn MethodInterceptor> {
        Some(self)
    }
}

/// Logs entry, exit and failure of every advised call through `tracing`.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{ExpressionPointcutAdvisor, LoggingInterceptor};
/// use std::sync::Arc;
/// use tracing::Level;
///
/// let advisor = ExpressionPointcutAdvisor::new(
///     "execution(* *Service::*(..))",
///     Arc::new(LoggingInterceptor::new().with_level(Level::INFO).with_arguments()),
/// )
/// .unwrap();
/// assert_eq!(advisor.expression().as_deref(), Some("execution(* *Service::*(..))"));
/// ```
#[derive(Debug, Clone)]
pub struct LoggingInterceptor {
    level: Level,
    log_arguments: bool,
}

impl LoggingInterceptor {
    pub fn new() -> Self {
        LoggingInterceptor {
            level: Level::DEBUG,
            log_arguments: false,
        }
    }

    /// Level for entry and exit events. Failures always log at `WARN`.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Also record the call arguments.
    pub fn with_arguments(mut self) -> Self {
        self.log_arguments = true;
        self
    }

    fn emit(&self, target: &str, method: &str, args: &[Value], phase: &str, elapsed: Option<Duration>) {
        let args = if self.log_arguments {
            format!("{:?}", args)
        } else {
            String::new()
        };
        if self.level == Level::TRACE {
            trace!(target_type = %target, %method, %args, ?elapsed, "{}", phase);
        } else if self.level == Level::DEBUG {
            debug!(target_type = %target, %method, %args, ?elapsed, "{}", phase);
        } else if self.level == Level::INFO {
            info!(target_type = %target, %method, %args, ?elapsed, "{}", phase);
        } else {
            warn!(target_type = %target, %method, %args, ?elapsed, "{}", phase);
        }
    }
}

impl Default for LoggingInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodInterceptor for LoggingInterceptor {
    fn invoke(&self, invocation: &MethodInvocation<'_>) -> Result<Value, InvocationError> {
        let target = invocation.this().concrete_type_name();
        let target = crate::key::short_type_name(target);
        let start = Instant::now();
        self.emit(target, invocation.method(), invocation.arguments(), "entering", None);

        let result = invocation.proceed();
        let elapsed = start.elapsed();
        match &result {
            Ok(_) => self.emit(
                target,
                invocation.method(),
                invocation.arguments(),
                "completed",
                Some(elapsed),
            ),
            Err(error) => warn!(
                target_type = %target,
                method = %invocation.method(),
                ?elapsed,
                %error,
                "failed"
            ),
        }
        result
    }
}

impl Bean for LoggingInterceptor {
    fn as_method_interceptor(&self) -> Option<&dyn MethodInterceptor> {
        Some(self)
    }
}

/// Call statistics for one method.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallStats {
    pub call_count: u64,
    pub failure_count: u64,
    pub total_time: Duration,
}

impl CallStats {
    pub fn average_time(&self) -> Duration {
        if self.call_count == 0 {
            Duration::ZERO
        } else {
            self.total_time / self.call_count as u32
        }
    }
}

/// Records per-method call counts and timings.
#[derive(Debug, Default)]
pub struct PerformanceInterceptor {
    stats: Mutex<HashMap<String, CallStats>>,
}

impl PerformanceInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics keyed by `Type::method`.
    pub fn stats(&self) -> HashMap<String, CallStats> {
        self.stats.lock().clone()
    }

    pub fn reset(&self) {
        self.stats.lock().clear();
    }
}

impl MethodInterceptor for PerformanceInterceptor {
    fn invoke(&self, invocation: &MethodInvocation<'_>) -> Result<Value, InvocationError> {
        let start = Instant::now();
        let result = invocation.proceed();
        let elapsed = start.elapsed();

        let key = format!(
            "{}::{}",
            crate::key::short_type_name(invocation.this().concrete_type_name()),
            invocation.method()
        );
        let mut stats = self.stats.lock();
        let entry = stats.entry(key).or_default();
        entry.call_count += 1;
        entry.total_time += elapsed;
        if result.is_err() {
            entry.failure_count += 1;
        }
        result
    }
}

impl Bean for PerformanceInterceptor {
    fn as_method_interceptor(&self) -> Option<&dyn MethodInterceptor> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;
    impl Bean for Echo {
        fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, InvocationError> {
            match method {
                "echo" => Ok(Value::List(args.to_vec())),
                "fail" => Err(InvocationError::InvalidArguments("boom".into())),
                _ => Err(InvocationError::no_such_method(self, method)),
            }
        }
    }

    fn call(
        target: &Object,
        chain: &[Arc<dyn MethodInterceptor>],
        method: &str,
        args: &[Value],
    ) -> Result<Value, InvocationError> {
        MethodInvocation::new(target, method, args, chain).proceed()
    }

    #[test]
    fn empty_chain_reaches_target() {
        let target: Object = Arc::new(Echo);
        let result = call(&target, &[], "echo", &[Value::Int(1)]).unwrap();
        assert_eq!(result, Value::List(vec![Value::Int(1)]));
    }

    #[test]
    fn interceptors_run_in_order_and_can_rewrite_arguments() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let first = {
            let order = order.clone();
            Arc::new(move |inv: &MethodInvocation<'_>| -> Result<Value, InvocationError> {
                order.lock().push("first");
                inv.proceed_with(vec![Value::from("rewritten")])
            }) as Arc<dyn MethodInterceptor>
        };
        let second = {
            let order = order.clone();
            Arc::new(move |inv: &MethodInvocation<'_>| -> Result<Value, InvocationError> {
                order.lock().push("second");
                assert_eq!(inv.arguments(), &[Value::from("rewritten")]);
                inv.proceed()
            }) as Arc<dyn MethodInterceptor>
        };

        let target: Object = Arc::new(Echo);
        let result = call(&target, &[first, second], "echo", &[Value::Int(1)]).unwrap();

        assert_eq!(result, Value::List(vec![Value::from("rewritten")]));
        assert_eq!(*order.lock(), vec!["first", "second"]);
    }

    #[test]
    fn interceptor_can_short_circuit() {
        let cached: Arc<dyn MethodInterceptor> =
            Arc::new(|_: &MethodInvocation<'_>| -> Result<Value, InvocationError> {
                Ok(Value::from("cached"))
            });
        let target: Object = Arc::new(Echo);
        assert_eq!(call(&target, &[cached], "fail", &[]).unwrap(), Value::from("cached"));
    }

    struct Veto;
    impl MethodBeforeAdvice for Veto {
        fn before(&self, method: &str, _args: &[Value], _target: &Object) -> Result<(), BoxError> {
            if method == "echo" {
                Err("vetoed".into())
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn before_advice_error_aborts_call() {
        let chain: Vec<Arc<dyn MethodInterceptor>> =
            vec![Arc::new(MethodBeforeAdviceInterceptor::new(Arc::new(Veto)))];
        let target: Object = Arc::new(Echo);
        let err = call(&target, &chain, "echo", &[]).unwrap_err();
        assert_eq!(err.to_string(), "vetoed");
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);
    impl ThrowsAdvice for Recorder {
        fn after_throwing(&self, method: &str, _args: &[Value], error: &InvocationError) {
            self.0.lock().push(format!("{}: {}", method, error));
        }
    }

    #[test]
    fn throws_advice_sees_error_and_rethrows() {
        let recorder = Arc::new(Recorder::default());
        let chain: Vec<Arc<dyn MethodInterceptor>> =
            vec![Arc::new(ThrowsAdviceInterceptor::new(recorder.clone()))];
        let target: Object = Arc::new(Echo);

        assert!(call(&target, &chain, "fail", &[]).is_err());
        assert!(call(&target, &chain, "echo", &[]).is_ok());
        assert_eq!(recorder.0.lock().len(), 1);
        assert!(recorder.0.lock()[0].starts_with("fail: "));
    }

    #[test]
    fn performance_interceptor_counts_calls_and_failures() {
        let perf = Arc::new(PerformanceInterceptor::new());
        let chain: Vec<Arc<dyn MethodInterceptor>> =
            vec![Arc::new(LoggingInterceptor::new()), perf.clone()];
        let target: Object = Arc::new(Echo);

        call(&target, &chain, "echo", &[]).unwrap();
        call(&target, &chain, "echo", &[]).unwrap();
        let _ = call(&target, &chain, "fail", &[]);

        let stats = perf.stats();
        assert_eq!(stats["Echo::echo"].call_count, 2);
        assert_eq!(stats["Echo::fail"].failure_count, 1);

        perf.reset();
        assert!(perf.stats().is_empty());
    }
}
