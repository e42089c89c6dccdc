use crate::{DynSvc, Injectable, InstanceHooks, Service, ServiceInfo, Svc};
use std::any::Any;

/// A type that can be requested from the container. Every injectable type is
/// resolvable as itself. Trait objects (`dyn Trait`) become resolvable
/// through the [`interface!`] macro.
///
/// Resolvable types travel through the build pipeline as [`DynSvc`]. Sized
/// types are erased directly, while trait objects are erased by wrapping
/// their service pointer.
pub trait Resolvable: Any + Send + Sync {
    /// Type information used to build keys for this type.
    fn service_info() -> ServiceInfo;

    /// Erases a service pointer of this type.
    fn into_dyn(value: Svc<Self>) -> DynSvc;

    /// Recovers a service pointer of this type from its erased form.
    fn from_dyn(value: DynSvc) -> Option<Svc<Self>>;

    /// Lifecycle hooks for values of this type.
    #[must_use]
    fn hooks() -> Option<InstanceHooks> {
        None
    }
}

impl<T: Injectable> Resolvable for T {
    fn service_info() -> ServiceInfo {
        ServiceInfo::of_injectable::<T>()
    }

    fn into_dyn(value: Svc<Self>) -> DynSvc {
        value
    }

    fn from_dyn(value: DynSvc) -> Option<Svc<Self>> {
        value.downcast_arc().ok()
    }

    fn hooks() -> Option<InstanceHooks> {
        Some(InstanceHooks::of::<T>())
    }
}

/// Marker trait that indicates that a type is an interface for another type.
///
/// Each injectable type is an interface for itself, and each `dyn Trait` is
/// an interface for the types that implement it. This trait should usually be
/// implemented by the [`interface!`] macro, and is used to enforce stronger
/// type checking when mapping interfaces to implementations.
pub trait InterfaceFor<T: Service>: Resolvable {
    #[doc(hidden)]
    fn from_svc(service: Svc<T>) -> Svc<Self>;
}

impl<T: Injectable> InterfaceFor<T> for T {
    fn from_svc(service: Svc<T>) -> Svc<Self> {
        service
    }
}

/// Converts a built implementation into the erased form of one of its
/// interfaces.
pub(crate) fn cast_to<I, T>(value: DynSvc) -> Option<DynSvc>
where
    I: ?Sized + InterfaceFor<T>,
    T: Injectable,
{
    let value: Svc<T> = value.downcast_arc().ok()?;
    Some(I::into_dyn(I::from_svc(value)))
}

/// Marks a trait as an interface. A request for the trait object can then be
/// served by any injectable type implementing the trait, once a mapping is
/// registered.
///
/// The trait must be a subtrait of [`Service`].
///
/// Generic traits list their generic implementations, so that open generic
/// mappings can be closed over the requested type argument.
///
/// ## Example
///
/// ```
/// use unity_container::{interface, Service};
///
/// trait Logger: Service {
///     fn log(&self, message: &str);
/// }
///
/// interface!(Logger);
/// ```
#[macro_export]
macro_rules! interface {
    ($interface:ident) => {
        impl $crate::Resolvable for dyn $interface {
            fn service_info() -> $crate::ServiceInfo {
                $crate::ServiceInfo::of::<Self>()
            }

            fn into_dyn(value: $crate::Svc<Self>) -> $crate::DynSvc {
                $crate::Svc::new(value)
            }

            fn from_dyn(value: $crate::DynSvc) -> Option<$crate::Svc<Self>> {
                value
                    .downcast_arc::<$crate::Svc<Self>>()
                    .ok()
                    .map(|value| $crate::Svc::clone(&*value))
            }
        }

        impl<__T> $crate::InterfaceFor<__T> for dyn $interface
        where
            __T: $interface + $crate::Injectable,
        {
            fn from_svc(service: $crate::Svc<__T>) -> $crate::Svc<Self> {
                service
            }
        }
    };
    ($interface:ident < $param:ident > = [$($(#[$attr:meta])* $impl:ty),* $(,)?]) => {
        impl<$param: $crate::Service> $crate::Resolvable for dyn $interface<$param> {
            fn service_info() -> $crate::ServiceInfo {
                #[allow(unused_variables)]
                fn close<$param: $crate::Service>(
                    definition: &$crate::OpenGeneric,
                ) -> Option<$crate::ClosedType> {
                    $(
                        $(#[$attr])*
                        if <$impl as $crate::Injectable>::open_generic().as_ref() == Some(definition) {
                            return Some($crate::ClosedType::of::<dyn $interface<$param>, $impl>());
                        }
                    )*
                    None
                }

                $crate::ServiceInfo::of::<Self>().with_generic(
                    $crate::GenericInfo::new(
                        $crate::open_generic!($interface),
                        Some(close::<$param>),
                    ),
                )
            }

            fn into_dyn(value: $crate::Svc<Self>) -> $crate::DynSvc {
                $crate::Svc::new(value)
            }

            fn from_dyn(value: $crate::DynSvc) -> Option<$crate::Svc<Self>> {
                value
                    .downcast_arc::<$crate::Svc<Self>>()
                    .ok()
                    .map(|value| $crate::Svc::clone(&*value))
            }
        }

        impl<$param, __T> $crate::InterfaceFor<__T> for dyn $interface<$param>
        where
            $param: $crate::Service,
            __T: $interface<$param> + $crate::Injectable,
        {
            fn from_svc(service: $crate::Svc<__T>) -> $crate::Svc<Self> {
                service
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{
        interface, InterfaceFor, Members, Resolvable, Service, ServiceInfo,
        Svc,
    };

    trait Greeter: Service {
        fn greet(&self) -> String;
    }

    interface!(Greeter);

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    impl crate::Injectable for English {
        fn members() -> Members<Self> {
            Members::new()
        }
    }

    #[test]
    fn trait_objects_round_trip_through_erasure() {
        let greeter: Svc<dyn Greeter> =
            <dyn Greeter as InterfaceFor<English>>::from_svc(Svc::new(English));
        let erased = <dyn Greeter as Resolvable>::into_dyn(greeter);

        let recovered = <dyn Greeter>::from_dyn(erased.clone()).unwrap();
        assert_eq!("hello", recovered.greet());
        assert!(English::from_dyn(erased).is_none());
    }

    #[test]
    fn cast_erases_as_interface() {
        let erased = crate::cast_to::<dyn Greeter, English>(Svc::new(English))
            .unwrap();
        assert!(<dyn Greeter>::from_dyn(erased).is_some());
        assert_eq!(
            ServiceInfo::of::<dyn Greeter>(),
            <dyn Greeter as Resolvable>::service_info()
        );
    }
}
