use crate::{DynSvc, Resolvable, ServiceInfo, Svc};
use std::fmt::{Debug, Formatter};

/// Produces the value for a single dependency during a build.
#[derive(Clone)]
pub enum DependencyResolver {
    /// Always supplies the same value.
    Value(DynSvc),

    /// Builds the dependency with the container. Optional dependencies
    /// resolve to `None` when nothing is registered that could build them.
    Resolved {
        service_info: ServiceInfo,
        name: Option<String>,
        optional: bool,
    },
}

impl DependencyResolver {
    /// A resolver supplying a fixed value.
    #[must_use]
    pub fn value<D: ?Sized + Resolvable>(value: Svc<D>) -> Self {
        DependencyResolver::Value(D::into_dyn(value))
    }

    /// A resolver which builds the default registration of `D`.
    #[must_use]
    pub fn service<D: ?Sized + Resolvable>() -> Self {
        DependencyResolver::resolved::<D>(None)
    }

    /// A resolver which builds `D`, optionally with a registration name.
    #[must_use]
    pub fn resolved<D: ?Sized + Resolvable>(name: Option<&str>) -> Self {
        DependencyResolver::Resolved {
            service_info: D::service_info(),
            name: name.map(str::to_owned),
            optional: false,
        }
    }

    /// Like [`DependencyResolver::resolved`], but yields `None` when `D`
    /// can't be built.
    #[must_use]
    pub fn optional<D: ?Sized + Resolvable>(name: Option<&str>) -> Self {
        DependencyResolver::Resolved {
            service_info: D::service_info(),
            name: name.map(str::to_owned),
            optional: true,
        }
    }
}

impl Debug for DependencyResolver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyResolver::Value(_) => f.write_str("Value(..)"),
            DependencyResolver::Resolved {
                service_info,
                name,
                optional,
            } => f
                .debug_struct("Resolved")
                .field("service_info", service_info)
                .field("name", name)
                .field("optional", optional)
                .finish(),
        }
    }
}
