#![allow(clippy::used_underscore_binding)]

use crate::{BuildKey, OpenGeneric, ServiceInfo};
use derive_more::Display;
use std::{any::Any, error::Error};

/// A result from attempting to build a service.
pub type InjectResult<T> = Result<T, InjectError>;

/// An error that occurred while registering or building a service.
#[derive(Debug, Display)]
#[non_exhaustive]
pub enum InjectError {
    /// Building the requested service failed. This wraps the innermost cause
    /// exactly once, at the call made on the container.
    #[display(
        fmt = "resolution of {}{} failed{}: {}",
        "service_info.name()",
        "fmt_name(name.as_deref())",
        "fmt_operation(operation.as_deref())",
        source
    )]
    ResolutionFailed {
        service_info: ServiceInfo,
        name: Option<String>,
        operation: Option<String>,
        source: Box<InjectError>,
    },

    /// The type has no mapping, instance or constructor to build it from.
    #[display(
        fmt = "{} cannot be constructed; register a mapping or an instance for it",
        "service_info.name()"
    )]
    NotConstructible { service_info: ServiceInfo },

    /// The type is injectable, but declares no constructors.
    #[display(fmt = "{} has no constructors", "service_info.name()")]
    NoConstructor { service_info: ServiceInfo },

    /// More than one constructor has the most parameters, and none of them
    /// is marked for injection.
    #[display(
        fmt = "{} has multiple constructors with {} parameters and none is marked for injection",
        "service_info.name()",
        parameter_count
    )]
    AmbiguousConstructor {
        service_info: ServiceInfo,
        parameter_count: usize,
    },

    #[display(
        fmt = "{} has more than one constructor marked for injection",
        "service_info.name()"
    )]
    MultipleMarkedConstructors { service_info: ServiceInfo },

    #[display(
        fmt = "{} has no constructor with signature ({})",
        "service_info.name()",
        "fmt_signature(signature)"
    )]
    ConstructorNotFound {
        service_info: ServiceInfo,
        signature: Vec<ServiceInfo>,
    },

    #[display(fmt = "{} has no property named {:?}", "service_info.name()", property)]
    PropertyNotFound {
        service_info: ServiceInfo,
        property: String,
    },

    #[display(
        fmt = "{} has no method {:?} with signature ({})",
        "service_info.name()",
        method,
        "fmt_signature(signature)"
    )]
    MethodNotFound {
        service_info: ServiceInfo,
        method: String,
        signature: Vec<ServiceInfo>,
    },

    /// A cycle was detected while building a service.
    #[display(
        fmt = "a cycle was detected while building {} [{}]",
        "service_info.name()",
        "fmt_cycle(cycle)"
    )]
    CycleDetected {
        service_info: ServiceInfo,
        cycle: Vec<BuildKey>,
    },

    /// The lifetime manager is already bound to another registration.
    #[display(
        fmt = "the lifetime manager passed for {} is already in use by another registration",
        "service_info.name()"
    )]
    LifetimeManagerInUse { service_info: ServiceInfo },

    /// The container was used after it was disposed.
    #[display(fmt = "the container has been disposed")]
    ContainerDisposed,

    /// A built or supplied value does not have the expected type.
    #[display(fmt = "the value provided for {} has the wrong type", "service_info.name()")]
    InvalidInstance { service_info: ServiceInfo },

    /// A constructor or method asked for more arguments than were resolved.
    #[display(fmt = "no argument of type {} was resolved", "service_info.name()")]
    MissingArgument { service_info: ServiceInfo },

    /// An open generic mapping could not be closed over the requested type.
    #[display(
        fmt = "{} cannot be closed over the type arguments of {}",
        definition,
        "service_info.name()"
    )]
    GenericClosingFailed {
        service_info: ServiceInfo,
        definition: OpenGeneric,
    },

    #[display(fmt = "{} is not a generic type", "service_info.name()")]
    NotGeneric { service_info: ServiceInfo },

    /// A user-provided constructor, method or factory failed.
    #[display(fmt = "an error occurred while activating {}: {}", "service_info.name()", inner)]
    ActivationFailed {
        service_info: ServiceInfo,
        inner: Box<dyn Error + Send + Sync>,
    },

    /// An unexpected error has occurred. This is usually caused by a bug in
    /// the library itself.
    #[display(fmt = "an unexpected error occurred (please report this): {}", _0)]
    InternalError(String),
}

impl InjectError {
    /// Creates an [`InjectError::ActivationFailed`] for a service type.
    pub fn activation_failed<T: ?Sized + Any>(
        inner: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        InjectError::ActivationFailed {
            service_info: ServiceInfo::of::<T>(),
            inner: inner.into(),
        }
    }

    /// Gets the innermost cause of this error, skipping any resolution
    /// failure wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &InjectError {
        match self {
            InjectError::ResolutionFailed { source, .. } => source.root_cause(),
            error => error,
        }
    }

    /// Whether this error means nothing is registered that could build the
    /// requested type.
    #[must_use]
    pub fn is_missing_registration(&self) -> bool {
        matches!(
            self.root_cause(),
            InjectError::NotConstructible { .. }
                | InjectError::NoConstructor { .. }
        )
    }
}

impl Error for InjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InjectError::ResolutionFailed { source, .. } => Some(source.as_ref()),
            InjectError::ActivationFailed { inner, .. } => Some(inner.as_ref()),
            _ => None,
        }
    }
}

fn fmt_name(name: Option<&str>) -> String {
    name.map(|name| format!(" ({:?})", name)).unwrap_or_default()
}

fn fmt_operation(operation: Option<&str>) -> String {
    operation
        .map(|operation| format!(" while {}", operation))
        .unwrap_or_default()
}

fn fmt_signature(signature: &[ServiceInfo]) -> String {
    signature
        .iter()
        .map(ServiceInfo::name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn fmt_cycle(cycle: &[BuildKey]) -> String {
    let mut joined = String::new();
    for item in cycle {
        if !joined.is_empty() {
            joined.push_str(" -> ");
        }
        joined.push_str(&item.to_string());
    }
    joined
}

#[cfg(test)]
mod tests {
    use crate::{BuildKey, InjectError, ServiceInfo};
    use std::error::Error;

    #[test]
    fn root_cause_skips_wrappers() {
        let error = InjectError::ResolutionFailed {
            service_info: ServiceInfo::of::<u8>(),
            name: None,
            operation: None,
            source: Box::new(InjectError::NotConstructible {
                service_info: ServiceInfo::of::<u16>(),
            }),
        };

        assert!(error.source().is_some());
        assert!(error.is_missing_registration());
        match error.root_cause() {
            InjectError::NotConstructible { service_info }
                if *service_info == ServiceInfo::of::<u16>() => {}
            other => panic!("unexpected root cause: {}", other),
        }
    }

    #[test]
    fn cycle_is_formatted_in_order() {
        let error = InjectError::CycleDetected {
            service_info: ServiceInfo::of::<u8>(),
            cycle: vec![
                BuildKey::new(ServiceInfo::of::<u8>(), None),
                BuildKey::new(ServiceInfo::of::<u16>(), None),
                BuildKey::new(ServiceInfo::of::<u8>(), None),
            ],
        };

        assert_eq!(
            "a cycle was detected while building u8 [u8 -> u16 -> u8]",
            error.to_string()
        );
    }
}
