//! Capabilities for beans that want to know about their surroundings.

use crate::container::BeanContainer;
use crate::error::BoxError;

/// Receives the owning container before initialization.
///
/// Hold on to [`BeanContainer::downgrade`] rather than a clone if the bean is
/// a singleton, otherwise the container keeps itself alive.
pub trait ContainerAware: Send + Sync {
    fn set_container(&self, container: &BeanContainer) -> Result<(), BoxError>;
}

/// Receives the name it was registered under.
pub trait BeanNameAware: Send + Sync {
    fn set_bean_name(&self, name: &str);
}
