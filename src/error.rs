//! Error types for the bean container.

use thiserror::Error;

/// Boxed error produced by user code (lifecycle callbacks, mutators, producers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Container errors
///
/// Represents the failure conditions that can occur while registering,
/// resolving, or destroying beans. Every failure raised while building a
/// named bean is wrapped in [`ContainerError::ConstructionFailed`] naming
/// that bean, so the chain of wrappers reads as the resolution path.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanContainer, ContainerError};
///
/// let container = BeanContainer::new();
/// match container.resolve("missing") {
///     Err(ContainerError::DefinitionNotFound(name)) => assert_eq!(name, "missing"),
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_beans::ContainerError;
///
/// let inner = ContainerError::NoSuchInitMethod {
///     name: "service".into(),
///     method: "start".into(),
/// };
/// let outer = ContainerError::ConstructionFailed {
///     name: "service".into(),
///     source: Box::new(inner),
/// };
/// assert!(matches!(outer.root_cause(), ContainerError::NoSuchInitMethod { .. }));
/// println!("Error: {}", outer);
/// ```
#[derive(Debug, Error)]
pub enum ContainerError {
    /// No definition registered under the name
    #[error("no bean definition named '{0}'")]
    DefinitionNotFound(String),

    /// A pre-built singleton was registered under a name already bound
    #[error("cannot register singleton '{0}': there is already an object bound")]
    DuplicateSingleton(String),

    /// Arguments were supplied but no constructor takes that many
    #[error("no constructor of {type_name} for bean '{name}' takes {arity} argument(s)")]
    NoMatchingConstructor {
        name: String,
        type_name: &'static str,
        arity: usize,
    },

    /// Resolving or applying a property value failed
    #[error("failed to set property '{property}' on bean '{name}'")]
    PropertyAssignmentFailed {
        name: String,
        property: String,
        #[source]
        source: Box<ContainerError>,
    },

    /// The definition names an init hook the bean does not expose
    #[error("bean '{name}' has no init method '{method}'")]
    NoSuchInitMethod { name: String, method: String },

    /// The definition names a destroy hook the bean does not expose
    #[error("bean '{name}' has no destroy method '{method}'")]
    NoSuchDestroyMethod { name: String, method: String },

    /// Building the named bean failed
    #[error("error creating bean '{name}'")]
    ConstructionFailed {
        name: String,
        #[source]
        source: Box<ContainerError>,
    },

    /// More than one bean matches the requested type
    #[error("expected a single bean of type {type_name} but found {}: {}", candidates.len(), candidates.join(", "))]
    AmbiguousType {
        type_name: &'static str,
        candidates: Vec<String>,
    },

    /// No bean matches the requested type
    #[error("no bean of type {type_name} is defined")]
    NoMatchingType { type_name: &'static str },

    /// A dependency cycle the singleton cache cannot break (includes path)
    #[error("unresolvable circular reference: {}", path.join(" -> "))]
    CircularReference { path: Vec<String> },

    /// A circular dependent received the raw bean, but post-processing
    /// later replaced it with a different object
    #[error("bean '{name}' was injected into other beans in its raw version as part of a circular reference, but has since been wrapped")]
    EarlyReferenceMismatch { name: String },

    /// A bean failed after circular dependents took its early reference.
    /// The dependents were evicted from the cache together with it
    #[error("bean '{name}' failed after circular dependents took its early reference; evicted: {}", dependents.join(", "))]
    DependentsEvicted {
        name: String,
        dependents: Vec<String>,
        #[source]
        source: Box<ContainerError>,
    },

    /// Maximum creation depth exceeded
    #[error("max creation depth {0} exceeded")]
    DepthExceeded(usize),

    /// The bean exists but is not of the requested type
    #[error("bean '{name}' is not of type {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    /// A literal could not be converted to the declared property kind
    #[error("cannot convert {from} to {to}: {reason}")]
    ConversionFailed {
        from: &'static str,
        to: &'static str,
        reason: String,
    },

    /// A pointcut expression failed to parse
    #[error("invalid pointcut expression '{expression}': {reason}")]
    InvalidPointcut { expression: String, reason: String },

    /// One or more disposers failed during shutdown
    #[error("{} disposer(s) failed during shutdown", failures.len())]
    DestroyFailed { failures: Vec<(String, ContainerError)> },

    /// Invalid container settings
    #[error("configuration error: {0}")]
    Config(String),

    /// Failure raised by user code
    #[error(transparent)]
    Callback(BoxError),
}

impl ContainerError {
    /// Wraps a user failure.
    pub fn callback(err: impl Into<BoxError>) -> Self {
        ContainerError::Callback(err.into())
    }

    /// Wraps `self` as the cause of a failed construction of `name`.
    pub(crate) fn construction(name: &str, source: ContainerError) -> Self {
        ContainerError::ConstructionFailed {
            name: name.to_string(),
            source: Box::new(source),
        }
    }

    /// Walks `ConstructionFailed`, `PropertyAssignmentFailed` and
    /// `DependentsEvicted` wrappers to the innermost container error.
    pub fn root_cause(&self) -> &ContainerError {
        let mut current = self;
        loop {
            match current {
                ContainerError::ConstructionFailed { source, .. }
                | ContainerError::PropertyAssignmentFailed { source, .. }
                | ContainerError::DependentsEvicted { source, .. } => current = source,
                other => return other,
            }
        }
    }

    /// Names of the beans on the wrapping path, outermost first.
    pub fn creation_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self;
        loop {
            match current {
                ContainerError::ConstructionFailed { name, source } => {
                    path.push(name.as_str());
                    current = source;
                }
                ContainerError::PropertyAssignmentFailed { source, .. }
                | ContainerError::DependentsEvicted { source, .. } => current = source,
                _ => return path,
            }
        }
    }
}

/// Result type for container operations
///
/// A convenience alias for `Result<T, ContainerError>`.
///
/// ```rust
/// use ferrous_beans::{ContainerError, ContainerResult};
///
/// fn lookup() -> ContainerResult<()> {
///     Err(ContainerError::DefinitionNotFound("some_bean".into()))
/// }
///
/// assert!(lookup().is_err());
/// ```
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Error raised by dynamic method dispatch on a bean.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The bean does not expose the method
    #[error("{type_name} has no method '{method}'")]
    NoSuchMethod {
        type_name: &'static str,
        method: String,
    },

    /// The bean does not accept the property
    #[error("{type_name} has no property '{property}'")]
    NoSuchProperty {
        type_name: &'static str,
        property: String,
    },

    /// The method exists but rejected its arguments
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The method ran and failed
    #[error(transparent)]
    Failed(BoxError),
}

impl InvocationError {
    /// Wraps a method failure.
    pub fn failed(err: impl Into<BoxError>) -> Self {
        InvocationError::Failed(err.into())
    }
}

impl From<ContainerError> for InvocationError {
    fn from(err: ContainerError) -> Self {
        InvocationError::Failed(Box::new(err))
    }
}

impl From<InvocationError> for ContainerError {
    fn from(err: InvocationError) -> Self {
        match err {
            InvocationError::Failed(inner) => match inner.downcast::<ContainerError>() {
                Ok(container) => *container,
                Err(other) => ContainerError::Callback(other),
            },
            other => ContainerError::Callback(Box::new(other)),
        }
    }
}
