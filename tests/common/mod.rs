//! Beans shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use ferrous_beans::{
    Bean, BeanNameAware, BeanType, BoxError, DisposableBean, InitializingBean, InvocationError,
    Object, Value,
};
use parking_lot::Mutex;

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().clone()
}

/// Accepts any property and remembers it.
#[derive(Default)]
pub struct Node {
    props: Mutex<HashMap<String, Value>>,
}

impl Node {
    pub fn get(&self, name: &str) -> Option<Value> {
        self.props.lock().get(name).cloned()
    }

    pub fn object(&self, name: &str) -> Option<Object> {
        self.get(name).and_then(Value::into_object)
    }
}

impl Bean for Node {
    fn set_property(&self, name: &str, value: Value) -> Result<(), InvocationError> {
        self.props.lock().insert(name.to_string(), value);
        Ok(())
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, InvocationError> {
        match method {
            "echo" => Ok(args.first().cloned().unwrap_or_default()),
            "fail" => Err(InvocationError::failed("node failure")),
            _ => Err(InvocationError::no_such_method(self, method)),
        }
    }
}

/// Records its lifecycle into a shared log, prefixed with its bean name.
pub struct Tracked {
    log: Log,
    name: Mutex<String>,
    fail_destroy: bool,
}

impl Tracked {
    pub fn new(log: Log, fail_destroy: bool) -> Self {
        Tracked {
            log,
            name: Mutex::new(String::new()),
            fail_destroy,
        }
    }

    fn record(&self, event: &str) {
        let entry = format!("{}:{}", event, self.name.lock());
        self.log.lock().push(entry);
    }
}

impl BeanNameAware for Tracked {
    fn set_bean_name(&self, name: &str) {
        *self.name.lock() = name.to_string();
    }
}

impl InitializingBean for Tracked {
    fn after_properties_set(&self) -> Result<(), BoxError> {
        self.record("init");
        Ok(())
    }
}

impl DisposableBean for Tracked {
    fn destroy(&self) -> Result<(), BoxError> {
        self.record("destroy");
        if self.fail_destroy {
            return Err("destroy refused".into());
        }
        Ok(())
    }
}

impl Bean for Tracked {
    fn set_property(&self, name: &str, _value: Value) -> Result<(), InvocationError> {
        self.record(&format!("set {}", name));
        Ok(())
    }

    fn invoke(&self, method: &str, _args: &[Value]) -> Result<Value, InvocationError> {
        match method {
            "start" | "close" => {
                self.record(method);
                Ok(Value::Null)
            }
            _ => Err(InvocationError::no_such_method(self, method)),
        }
    }

    fn as_initializing(&self) -> Option<&dyn InitializingBean> {
        Some(self)
    }

    fn as_disposable(&self) -> Option<&dyn DisposableBean> {
        Some(self)
    }

    fn as_bean_name_aware(&self) -> Option<&dyn BeanNameAware> {
        Some(self)
    }
}

pub fn tracked(log: &Log) -> BeanType {
    let log = log.clone();
    BeanType::builder::<Tracked>()
        .constructor(0, move |_| Ok(Tracked::new(log.clone(), false)))
        .build()
}

pub fn failing_tracked(log: &Log) -> BeanType {
    let log = log.clone();
    BeanType::builder::<Tracked>()
        .constructor(0, move |_| Ok(Tracked::new(log.clone(), true)))
        .build()
}

/// Routes container logs to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
