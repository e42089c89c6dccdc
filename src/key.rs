use crate::{DynSvc, InterfaceFor, Injectable, TypeMembers};
use std::{
    any::{Any, TypeId},
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
};

/// Identity of a generic type definition without its type arguments, for
/// example `Repository<_>`. Usually created with [`open_generic!`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct OpenGeneric {
    path: &'static str,
}

impl OpenGeneric {
    /// Creates an open generic definition from its fully qualified path.
    #[must_use]
    pub const fn new(path: &'static str) -> Self {
        OpenGeneric { path }
    }

    #[must_use]
    pub fn path(&self) -> &'static str {
        self.path
    }
}

impl Display for OpenGeneric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<..>", self.path)
    }
}

/// Creates the [`OpenGeneric`] identity for a generic type. This must be
/// invoked from the module the type is declared in, since the module path is
/// part of the identity.
///
/// ```
/// use unity_container::{open_generic, OpenGeneric};
///
/// struct Repository<T>(T);
///
/// let definition: OpenGeneric = open_generic!(Repository);
/// assert!(definition.path().ends_with("Repository"));
/// ```
#[macro_export]
macro_rules! open_generic {
    ($name:ident) => {
        $crate::OpenGeneric::new(concat!(
            module_path!(),
            "::",
            stringify!($name)
        ))
    };
}

/// The result of closing an open generic definition over the type arguments
/// of a requested type.
#[derive(Clone, Copy)]
pub struct ClosedType {
    service_info: ServiceInfo,
    cast: fn(DynSvc) -> Option<DynSvc>,
}

impl ClosedType {
    /// Closes an interface `I` over implementation `T`.
    #[must_use]
    pub fn of<I, T>() -> Self
    where
        I: ?Sized + InterfaceFor<T>,
        T: Injectable,
    {
        ClosedType {
            service_info: ServiceInfo::of_injectable::<T>(),
            cast: crate::cast_to::<I, T>,
        }
    }

    #[must_use]
    pub fn service_info(&self) -> ServiceInfo {
        self.service_info
    }

    #[must_use]
    pub fn cast(&self) -> fn(DynSvc) -> Option<DynSvc> {
        self.cast
    }
}

impl Debug for ClosedType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosedType")
            .field("service_info", &self.service_info)
            .finish_non_exhaustive()
    }
}

/// Generic information attached to a closed generic type.
#[derive(Clone, Copy)]
pub struct GenericInfo {
    definition: OpenGeneric,
    close: Option<fn(&OpenGeneric) -> Option<ClosedType>>,
}

impl GenericInfo {
    /// Creates generic information for a type with the given definition. The
    /// `close` function maps another definition onto a closed type with the
    /// same type arguments, if that definition is a known implementation.
    #[must_use]
    pub fn new(
        definition: OpenGeneric,
        close: Option<fn(&OpenGeneric) -> Option<ClosedType>>,
    ) -> Self {
        GenericInfo { definition, close }
    }

    #[must_use]
    pub fn definition(&self) -> OpenGeneric {
        self.definition
    }

    /// Closes `target` over this type's arguments.
    #[must_use]
    pub fn close(&self, target: &OpenGeneric) -> Option<ClosedType> {
        self.close.and_then(|close| close(target))
    }
}

impl Debug for GenericInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericInfo")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// Type information about a service. Equality and hashing only consider the
/// type's identity.
#[derive(Clone, Copy)]
pub struct ServiceInfo {
    id: TypeId,
    name: &'static str,
    generic: Option<GenericInfo>,
    activator: Option<fn() -> TypeMembers>,
}

impl ServiceInfo {
    /// Gets the type information for any type. Types created this way carry
    /// no injection members, so they can only be built through a mapping, a
    /// registered instance or a factory.
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        ServiceInfo {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            generic: None,
            activator: None,
        }
    }

    /// Gets the type information for an injectable type, including how to
    /// discover its injection members.
    #[must_use]
    pub fn of_injectable<T: Injectable>() -> Self {
        ServiceInfo {
            generic: T::open_generic()
                .map(|definition| GenericInfo::new(definition, None)),
            activator: Some(TypeMembers::of::<T>),
            ..ServiceInfo::of::<T>()
        }
    }

    /// Attaches generic information to this type.
    #[must_use]
    pub fn with_generic(mut self, generic: GenericInfo) -> Self {
        self.generic = Some(generic);
        self
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn generic(&self) -> Option<&GenericInfo> {
        self.generic.as_ref()
    }

    /// Discovers the injection members of this type, if it has any.
    #[must_use]
    pub fn members(&self) -> Option<TypeMembers> {
        self.activator.map(|activator| activator())
    }
}

impl PartialEq for ServiceInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceInfo {}

impl Hash for ServiceInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Debug for ServiceInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ServiceInfo").field(&self.name).finish()
    }
}

/// A registered type, which is either a concrete type or an open generic
/// definition.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TypeKey {
    Closed(ServiceInfo),
    OpenGeneric(OpenGeneric),
}

impl TypeKey {
    /// Checks whether a request for `service_info` would be served by a
    /// registration of this type.
    #[must_use]
    pub fn matches(&self, service_info: &ServiceInfo) -> bool {
        match self {
            TypeKey::Closed(info) => info == service_info,
            TypeKey::OpenGeneric(definition) => service_info
                .generic()
                .map_or(false, |generic| generic.definition() == *definition),
        }
    }
}

impl Display for TypeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeKey::Closed(info) => f.write_str(info.name()),
            TypeKey::OpenGeneric(definition) => Display::fmt(definition, f),
        }
    }
}

/// Identifies what to build: a requested type plus an optional name.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct BuildKey {
    service_info: ServiceInfo,
    name: Option<String>,
}

impl BuildKey {
    /// Creates a new build key. An empty name is the same as no name.
    #[must_use]
    pub fn new(service_info: ServiceInfo, name: Option<String>) -> Self {
        BuildKey {
            service_info,
            name: name.filter(|name| !name.is_empty()),
        }
    }

    /// Creates a build key for a resolvable type.
    #[must_use]
    pub fn of<T: ?Sized + crate::Resolvable>(name: Option<&str>) -> Self {
        BuildKey::new(T::service_info(), name.map(str::to_owned))
    }

    #[must_use]
    pub fn service_info(&self) -> &ServiceInfo {
        &self.service_info
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Creates a build key for another type with the same name.
    #[must_use]
    pub fn with_type(&self, service_info: ServiceInfo) -> Self {
        BuildKey {
            service_info,
            name: self.name.clone(),
        }
    }
}

impl Display for BuildKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({:?})", self.service_info.name(), name),
            None => f.write_str(self.service_info.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{BuildKey, ServiceInfo};

    #[test]
    fn empty_name_is_default() {
        let unnamed = BuildKey::new(ServiceInfo::of::<i32>(), None);
        let empty = BuildKey::new(ServiceInfo::of::<i32>(), Some(String::new()));
        assert_eq!(unnamed, empty);
        assert_eq!(None, empty.name());
    }

    #[test]
    fn keys_compare_type_and_name() {
        let a = BuildKey::new(ServiceInfo::of::<i32>(), Some("a".into()));
        let b = BuildKey::new(ServiceInfo::of::<i32>(), Some("b".into()));
        let other = BuildKey::new(ServiceInfo::of::<u32>(), Some("a".into()));
        assert_ne!(a, b);
        assert_ne!(a, other);
        assert_eq!(a, a.with_type(ServiceInfo::of::<i32>()));
    }

    #[test]
    fn display_includes_name() {
        let key = BuildKey::new(ServiceInfo::of::<i32>(), Some("x".into()));
        assert_eq!("i32 (\"x\")", key.to_string());
    }
}
