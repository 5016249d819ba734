//! Core traits for beans managed by the container.

mod aware;
mod bean;
mod lifecycle;

pub use aware::{BeanNameAware, ContainerAware};
pub use bean::{AsAny, Bean, Object};
pub use lifecycle::{DisposableBean, FactoryBean, InitializingBean};
