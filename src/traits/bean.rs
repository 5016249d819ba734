//! The object surface every managed bean exposes.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::aop::{Advisor, MethodInterceptor};
use crate::error::InvocationError;
use crate::key::TypeKey;
use crate::traits::{BeanNameAware, ContainerAware, DisposableBean, FactoryBean, InitializingBean};
use crate::value::Value;

/// A shared, type-erased bean. Identity is pointer identity.
pub type Object = Arc<dyn Bean>;

/// Type-erasure helpers, implemented for every sized `Send + Sync` type.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
    fn any_type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn any_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl fmt::Debug for dyn Bean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.any_type_name())
    }
}

/// A container-managed object.
///
/// Rust has no runtime reflection, so a bean describes its own mutable
/// surface: `set_property` is the mutator used while populating it, and
/// `invoke` is the dispatch table through which proxies and named lifecycle
/// hooks reach its methods. Both default to "not found".
///
/// Optional capabilities (init/destroy hooks, factory production, container
/// awareness, advice) are opted into by overriding the matching `as_*` probe.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{Bean, InvocationError, Value};
/// use parking_lot::Mutex;
///
/// #[derive(Default)]
/// struct Greeter {
///     greeting: Mutex<String>,
/// }
///
/// impl Bean for Greeter {
///     fn set_property(&self, name: &str, value: Value) -> Result<(), InvocationError> {
///         match (name, value) {
///             ("greeting", Value::Str(s)) => {
///                 *self.greeting.lock() = s;
///                 Ok(())
///             }
///             (name, _) => Err(InvocationError::no_such_property(self, name)),
///         }
///     }
///
///     fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, InvocationError> {
///         match method {
///             "greet" => Ok(Value::from(format!("{}, {}", self.greeting.lock(), args.len()))),
///             _ => Err(InvocationError::no_such_method(self, method)),
///         }
///     }
/// }
///
/// let greeter = Greeter::default();
/// greeter.set_property("greeting", Value::from("hello")).unwrap();
/// assert_eq!(greeter.invoke("greet", &[]).unwrap(), Value::from("hello, 0"));
/// ```
pub trait Bean: AsAny {
    /// Applies one property value.
    fn set_property(&self, name: &str, value: Value) -> Result<(), InvocationError> {
        let _ = value;
        Err(InvocationError::NoSuchProperty {
            type_name: self.any_type_name(),
            property: name.to_string(),
        })
    }

    /// Invokes a method by name.
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, InvocationError> {
        let _ = args;
        Err(InvocationError::NoSuchMethod {
            type_name: self.any_type_name(),
            method: method.to_string(),
        })
    }

    fn as_initializing(&self) -> Option<&dyn InitializingBean> {
        None
    }

    fn as_disposable(&self) -> Option<&dyn DisposableBean> {
        None
    }

    fn as_factory_bean(&self) -> Option<&dyn FactoryBean> {
        None
    }

    fn as_container_aware(&self) -> Option<&dyn ContainerAware> {
        None
    }

    fn as_bean_name_aware(&self) -> Option<&dyn BeanNameAware> {
        None
    }

    fn as_advisor(&self) -> Option<&dyn Advisor> {
        None
    }

    fn as_method_interceptor(&self) -> Option<&dyn MethodInterceptor> {
        None
    }

    /// The object a subclass-style stand-in impersonates, so typed
    /// downcasts through the stand-in reach the concrete type.
    fn class_target(&self) -> Option<Object> {
        None
    }
}

impl dyn Bean {
    /// Name of the concrete type behind the object.
    pub fn concrete_type_name(&self) -> &'static str {
        <dyn Bean as AsAny>::any_type_name(self)
    }

    /// Type key of the concrete type behind the object.
    pub fn concrete_type_key(&self) -> TypeKey {
        let any = <dyn Bean as AsAny>::as_any(self);
        TypeKey::from_parts(Any::type_id(any), self.concrete_type_name())
    }

    /// Whether the concrete type behind the object is `T`.
    pub fn is<T: Any>(&self) -> bool {
        <dyn Bean as AsAny>::as_any(self).is::<T>()
    }

    /// Borrows the concrete `T` behind the object.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        <dyn Bean as AsAny>::as_any(self).downcast_ref::<T>()
    }

    /// Converts the object into `Arc<T>`, looking through subclass-style
    /// stand-ins. Returns the object unchanged on mismatch.
    pub fn downcast_arc<T: Any + Send + Sync>(self: Arc<Self>) -> Result<Arc<T>, Object> {
        if let Ok(concrete) = <dyn Bean as AsAny>::as_any_arc(self.clone()).downcast::<T>() {
            return Ok(concrete);
        }
        if let Some(target) = self.class_target() {
            if let Ok(concrete) = <dyn Bean as AsAny>::as_any_arc(target).downcast::<T>() {
                return Ok(concrete);
            }
        }
        Err(self)
    }
}

impl InvocationError {
    /// `NoSuchMethod` for `bean`.
    pub fn no_such_method<B: AsAny + ?Sized>(bean: &B, method: &str) -> Self {
        InvocationError::NoSuchMethod {
            type_name: bean.any_type_name(),
            method: method.to_string(),
        }
    }

    /// `NoSuchProperty` for `bean`.
    pub fn no_such_property<B: AsAny + ?Sized>(bean: &B, property: &str) -> Self {
        InvocationError::NoSuchProperty {
            type_name: bean.any_type_name(),
            property: property.to_string(),
        }
    }
}
