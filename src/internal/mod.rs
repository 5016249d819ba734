//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod dispose_bag;
pub(crate) mod singleton_cache;

pub(crate) use circular::{creation_path, current_creation, CreationGuard};
pub(crate) use dispose_bag::{DisposableBeanAdapter, DisposeBag};
pub(crate) use singleton_cache::SingletonCache;
