//! Type keys used for by-type lookup.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a concrete type or a trait object type.
///
/// Bean types declare the interfaces they implement as `TypeKey`s, and
/// by-type lookups match a requested key against the concrete type and the
/// declared interfaces of every definition. Equality is by `TypeId`; the
/// name is kept for diagnostics.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::TypeKey;
///
/// trait Repository: Send + Sync {}
/// struct UserRepository;
///
/// let concrete = TypeKey::of::<UserRepository>();
/// let interface = TypeKey::of::<dyn Repository>();
///
/// assert_ne!(concrete, interface);
/// assert_eq!(concrete, TypeKey::of::<UserRepository>());
/// assert!(interface.name().contains("Repository"));
/// assert_eq!(concrete.short_name(), "UserRepository");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for `T`, which may be a trait object type such as `dyn Service`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeKey {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub(crate) fn from_parts(id: TypeId, name: &'static str) -> Self {
        TypeKey { id, name }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full type path, e.g. `my_app::repo::UserRepository` or `dyn my_app::Repository`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment without generics, e.g. `UserRepository`.
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub(crate) fn short_type_name(name: &str) -> &str {
    let base = name.split('<').next().unwrap_or(name);
    let base = base.strip_prefix("dyn ").unwrap_or(base);
    base.rsplit("::").next().unwrap_or(base)
}
