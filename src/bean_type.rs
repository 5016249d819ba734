//! Declared shape of a bean type: constructors, interfaces, property kinds
//! and injection points.

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::autowire::{InjectionKind, InjectionPoint};
use crate::error::BoxError;
use crate::key::TypeKey;
use crate::traits::{Bean, Object};
use crate::value::{Value, ValueKind};

type BuildFn = Arc<dyn Fn(&[Value]) -> Result<Object, BoxError> + Send + Sync>;

/// A constructor taking a fixed number of arguments.
#[derive(Clone)]
pub struct Constructor {
    arity: usize,
    build: BuildFn,
}

impl Constructor {
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub(crate) fn build(&self, args: &[Value]) -> Result<Object, BoxError> {
        (self.build)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor").field("arity", &self.arity).finish()
    }
}

/// The "class" of a definition.
///
/// Rust has no runtime reflection, so the information the container needs
/// about a type is declared once through [`BeanType::builder`]. Cloning is
/// cheap.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{Bean, BeanType, TypeKey, ValueKind};
///
/// trait Repository: Send + Sync {}
///
/// #[derive(Default)]
/// struct UserRepository;
/// impl Bean for UserRepository {}
///
/// let ty = BeanType::builder::<UserRepository>()
///     .default_constructor()
///     .interface::<dyn Repository>()
///     .property("pool_size", ValueKind::Int)
///     .build();
///
/// assert!(ty.matches(&TypeKey::of::<UserRepository>()));
/// assert!(ty.matches(&TypeKey::of::<dyn Repository>()));
/// assert_eq!(ty.short_name(), "UserRepository");
/// assert_eq!(ty.property_kind("pool_size"), Some(ValueKind::Int));
/// ```
#[derive(Clone)]
pub struct BeanType {
    inner: Arc<BeanTypeInner>,
}

struct BeanTypeInner {
    key: TypeKey,
    interfaces: Vec<TypeKey>,
    constructors: Vec<Constructor>,
    properties: Vec<(String, ValueKind)>,
    injection_points: Vec<InjectionPoint>,
}

impl BeanType {
    pub fn builder<T: Bean>() -> BeanTypeBuilder<T> {
        BeanTypeBuilder {
            interfaces: Vec::new(),
            constructors: Vec::new(),
            properties: Vec::new(),
            injection_points: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Shorthand for a type built with `Default` and nothing else declared.
    pub fn of<T: Bean + Default>() -> Self {
        Self::builder::<T>().default_constructor().build()
    }

    /// Type of an already-built object, with no constructors.
    pub(crate) fn of_object(object: &Object) -> Self {
        BeanType {
            inner: Arc::new(BeanTypeInner {
                key: object.concrete_type_key(),
                interfaces: Vec::new(),
                constructors: Vec::new(),
                properties: Vec::new(),
                injection_points: Vec::new(),
            }),
        }
    }

    pub fn key(&self) -> TypeKey {
        self.inner.key
    }

    pub fn type_id(&self) -> TypeId {
        self.inner.key.id()
    }

    pub fn name(&self) -> &'static str {
        self.inner.key.name()
    }

    pub fn short_name(&self) -> &'static str {
        self.inner.key.short_name()
    }

    pub fn interfaces(&self) -> &[TypeKey] {
        &self.inner.interfaces
    }

    pub fn has_interfaces(&self) -> bool {
        !self.inner.interfaces.is_empty()
    }

    /// Whether the concrete type or one of the declared interfaces is `key`.
    pub fn matches(&self, key: &TypeKey) -> bool {
        self.inner.key == *key || self.inner.interfaces.contains(key)
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.inner.constructors
    }

    /// First constructor whose arity is `arity`.
    pub fn constructor_for(&self, arity: usize) -> Option<&Constructor> {
        self.inner.constructors.iter().find(|c| c.arity == arity)
    }

    /// Declared kind of a property, if any.
    pub fn property_kind(&self, name: &str) -> Option<ValueKind> {
        self.inner
            .properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, kind)| *kind)
    }

    pub fn injection_points(&self) -> &[InjectionPoint] {
        &self.inner.injection_points
    }
}

impl fmt::Debug for BeanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanType")
            .field("name", &self.name())
            .field("interfaces", &self.inner.interfaces)
            .field("constructors", &self.inner.constructors.len())
            .finish()
    }
}

/// Builder for [`BeanType`].
pub struct BeanTypeBuilder<T> {
    interfaces: Vec<TypeKey>,
    constructors: Vec<Constructor>,
    properties: Vec<(String, ValueKind)>,
    injection_points: Vec<InjectionPoint>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Bean> BeanTypeBuilder<T> {
    /// Adds a constructor taking exactly `arity` arguments. Constructors are
    /// tried in declaration order; the first with a matching arity wins.
    pub fn constructor<F>(mut self, arity: usize, build: F) -> Self
    where
        F: Fn(&[Value]) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor {
            arity,
            build: Arc::new(move |args: &[Value]| {
                build(args).map(|bean| Arc::new(bean) as Object)
            }),
        });
        self
    }

    /// Adds a zero-argument constructor using `Default`.
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(0, |_| Ok(T::default()))
    }

    /// Declares that `T` implements the trait object type `I`.
    pub fn interface<I: ?Sized + 'static>(mut self) -> Self {
        let key = TypeKey::of::<I>();
        if !self.interfaces.contains(&key) {
            self.interfaces.push(key);
        }
        self
    }

    /// Declares the kind a property expects; literals of another kind are
    /// converted before assignment.
    pub fn property(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.properties.push((name.into(), kind));
        self
    }

    /// Injects the bean whose name equals the property name.
    pub fn autowired(self, property: impl Into<String>) -> Self {
        let property = property.into();
        let bean = property.clone();
        self.inject(InjectionPoint::new(property, InjectionKind::ByName(bean)))
    }

    /// Injects the named bean into `property`.
    pub fn autowired_qualified(self, property: impl Into<String>, bean: impl Into<String>) -> Self {
        self.inject(InjectionPoint::new(property, InjectionKind::ByName(bean.into())))
    }

    /// Injects the single bean of type `D` into `property`.
    pub fn autowired_by_type<D: ?Sized + 'static>(self, property: impl Into<String>) -> Self {
        self.inject(InjectionPoint::new(property, InjectionKind::ByType(TypeKey::of::<D>())))
    }

    /// Injects a placeholder expression such as `${db.url}` after resolving it
    /// through the container's embedded value resolvers.
    pub fn value(self, property: impl Into<String>, expression: impl Into<String>) -> Self {
        self.inject(InjectionPoint::new(property, InjectionKind::Value(expression.into())))
    }

    pub fn inject(mut self, point: InjectionPoint) -> Self {
        self.injection_points.push(point);
        self
    }

    pub fn build(self) -> BeanType {
        BeanType {
            inner: Arc::new(BeanTypeInner {
                key: TypeKey::of::<T>(),
                interfaces: self.interfaces,
                constructors: self.constructors,
                properties: self.properties,
                injection_points: self.injection_points,
            }),
        }
    }
}
