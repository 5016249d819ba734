//! Bean scopes.

use std::fmt;

/// Scopes controlling instance sharing
///
/// - **Singleton**: one instance for the container's lifetime, cached after
///   first resolution (or eagerly by `pre_instantiate_singletons`) and
///   destroyed at shutdown.
/// - **Prototype**: a fresh instance per resolution; never cached and never
///   tracked for destruction.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::Scope;
///
/// assert_eq!(Scope::default(), Scope::Singleton);
/// assert!(Scope::Singleton.is_singleton());
/// assert!(!Scope::Prototype.is_singleton());
/// assert_eq!(Scope::Prototype.to_string(), "prototype");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// One shared instance.
    #[default]
    Singleton,
    /// A new instance per request.
    Prototype,
}

impl Scope {
    pub fn is_singleton(self) -> bool {
        matches!(self, Scope::Singleton)
    }

    pub fn is_prototype(self) -> bool {
        matches!(self, Scope::Prototype)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Singleton => f.write_str("singleton"),
            Scope::Prototype => f.write_str("prototype"),
        }
    }
}
