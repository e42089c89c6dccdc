use crate::{BuilderContext, DependencyResolver, Resolvable, ServiceInfo, Svc};
use std::sync::Arc;

/// Supplies a value for a dependency in place of what the container would
/// resolve. Overrides are scoped to a single resolve call and apply
/// throughout the object graph it builds.
pub trait ResolverOverride: Send + Sync {
    /// Gets the resolver to use for a dependency of type `dependency`, or
    /// `None` if this override does not apply at the current point of the
    /// build.
    fn get_resolver(
        &self,
        context: &BuilderContext,
        dependency: &ServiceInfo,
    ) -> Option<DependencyResolver>;
}

/// Overrides every dependency of a type.
pub struct DependencyOverride {
    service_info: ServiceInfo,
    resolver: DependencyResolver,
}

impl DependencyOverride {
    #[must_use]
    pub fn new<D: ?Sized + Resolvable>(value: Svc<D>) -> Self {
        DependencyOverride::with_resolver::<D>(DependencyResolver::value(value))
    }

    #[must_use]
    pub fn with_resolver<D: ?Sized + Resolvable>(resolver: DependencyResolver) -> Self {
        DependencyOverride {
            service_info: D::service_info(),
            resolver,
        }
    }
}

impl ResolverOverride for DependencyOverride {
    fn get_resolver(
        &self,
        _context: &BuilderContext,
        dependency: &ServiceInfo,
    ) -> Option<DependencyResolver> {
        (*dependency == self.service_info).then(|| self.resolver.clone())
    }
}

/// Overrides constructor and method parameters with a given name.
pub struct ParameterOverride {
    name: String,
    resolver: DependencyResolver,
}

impl ParameterOverride {
    #[must_use]
    pub fn new<D: ?Sized + Resolvable>(name: impl Into<String>, value: Svc<D>) -> Self {
        ParameterOverride::with_resolver(name, DependencyResolver::value(value))
    }

    #[must_use]
    pub fn with_resolver(name: impl Into<String>, resolver: DependencyResolver) -> Self {
        ParameterOverride {
            name: name.into(),
            resolver,
        }
    }
}

impl ResolverOverride for ParameterOverride {
    fn get_resolver(
        &self,
        context: &BuilderContext,
        _dependency: &ServiceInfo,
    ) -> Option<DependencyResolver> {
        let parameter = context.current_operation()?.parameter_name()?;
        (parameter == self.name).then(|| self.resolver.clone())
    }
}

/// Overrides properties with a given name.
pub struct PropertyOverride {
    name: String,
    resolver: DependencyResolver,
}

impl PropertyOverride {
    #[must_use]
    pub fn new<D: ?Sized + Resolvable>(name: impl Into<String>, value: Svc<D>) -> Self {
        PropertyOverride::with_resolver(name, DependencyResolver::value(value))
    }

    #[must_use]
    pub fn with_resolver(name: impl Into<String>, resolver: DependencyResolver) -> Self {
        PropertyOverride {
            name: name.into(),
            resolver,
        }
    }
}

impl ResolverOverride for PropertyOverride {
    fn get_resolver(
        &self,
        context: &BuilderContext,
        _dependency: &ServiceInfo,
    ) -> Option<DependencyResolver> {
        let property = context.current_operation()?.property_name()?;
        (property == self.name).then(|| self.resolver.clone())
    }
}

/// Restricts another override to dependencies of one type being built.
pub struct TypeBasedOverride {
    target: ServiceInfo,
    inner: Box<dyn ResolverOverride>,
}

impl TypeBasedOverride {
    #[must_use]
    pub fn new<T, O>(inner: O) -> Self
    where
        T: ?Sized + Resolvable,
        O: ResolverOverride + 'static,
    {
        TypeBasedOverride {
            target: T::service_info(),
            inner: Box::new(inner),
        }
    }
}

impl ResolverOverride for TypeBasedOverride {
    fn get_resolver(
        &self,
        context: &BuilderContext,
        dependency: &ServiceInfo,
    ) -> Option<DependencyResolver> {
        if *context.build_key().service_info() != self.target {
            return None;
        }

        self.inner.get_resolver(context, dependency)
    }
}

/// A set of overrides. When more than one applies, the one added last wins.
#[derive(Clone, Default)]
pub struct CompositeResolverOverride {
    overrides: Vec<Arc<dyn ResolverOverride>>,
}

impl CompositeResolverOverride {
    #[must_use]
    pub fn new() -> Self {
        CompositeResolverOverride::default()
    }

    /// Adds an override, returning the set for chaining.
    #[must_use]
    pub fn with<O: ResolverOverride + 'static>(mut self, resolver_override: O) -> Self {
        self.add(resolver_override);
        self
    }

    pub fn add<O: ResolverOverride + 'static>(&mut self, resolver_override: O) {
        self.overrides.push(Arc::new(resolver_override));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.overrides.len()
    }
}

impl ResolverOverride for CompositeResolverOverride {
    fn get_resolver(
        &self,
        context: &BuilderContext,
        dependency: &ServiceInfo,
    ) -> Option<DependencyResolver> {
        self.overrides
            .iter()
            .rev()
            .find_map(|resolver_override| resolver_override.get_resolver(context, dependency))
    }
}

impl std::fmt::Debug for CompositeResolverOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeResolverOverride")
            .field("len", &self.overrides.len())
            .finish()
    }
}
