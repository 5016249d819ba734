//! Lifecycle capabilities a bean may opt into.

use crate::error::BoxError;
use crate::traits::Object;

/// Init hook run after all properties have been applied.
///
/// Runs between the before- and after-initialization post-processor hooks,
/// ahead of any init method named by the definition.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{Bean, BoxError, InitializingBean};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// #[derive(Default)]
/// struct Pool {
///     ready: AtomicBool,
/// }
///
/// impl InitializingBean for Pool {
///     fn after_properties_set(&self) -> Result<(), BoxError> {
///         self.ready.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// impl Bean for Pool {
///     fn as_initializing(&self) -> Option<&dyn InitializingBean> {
///         Some(self)
///     }
/// }
/// ```
pub trait InitializingBean: Send + Sync {
    fn after_properties_set(&self) -> Result<(), BoxError>;
}

/// Destroy hook run once at container shutdown.
///
/// Only singletons are tracked for destruction. Disposers run in
/// registration order and a failing one does not stop the others.
pub trait DisposableBean: Send + Sync {
    fn destroy(&self) -> Result<(), BoxError>;
}

/// A bean that produces the object callers actually receive.
///
/// Resolving a factory bean's name yields `get_object()`; prefix the name
/// with `&` to obtain the factory itself. Products of singleton factories are
/// cached by name.
pub trait FactoryBean: Send + Sync {
    fn get_object(&self) -> Result<Object, BoxError>;

    fn is_singleton(&self) -> bool {
        true
    }
}
