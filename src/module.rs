use crate::{
    InjectResult, Injectable, InterfaceFor, LifetimeManager, RegisterOptions,
    Resolvable, Svc, UnityContainer,
};
use std::sync::Arc;

type Registration = Box<dyn FnOnce(&UnityContainer) -> InjectResult<()> + Send>;

/// A group of registrations that can be added to a container all at once.
/// Modules can be used to configure a container in pieces, or to build the
/// registrations from configuration read at runtime.
///
/// For creating a module easily via a domain specific language, see
/// [`define_module!`].
#[derive(Default)]
pub struct Module {
    registrations: Vec<Registration>,
}

impl Module {
    #[must_use]
    pub fn new() -> Self {
        Module::default()
    }

    /// Adds a type registration. See [`UnityContainer::register_type`].
    pub fn register_type<F, T>(&mut self, options: RegisterOptions) -> &mut Self
    where
        F: ?Sized + InterfaceFor<T>,
        T: Injectable,
    {
        self.register(move |container| {
            container.register_type::<F, T>(options).map(|_| ())
        })
    }

    /// Adds an instance registration. See
    /// [`UnityContainer::register_instance`].
    pub fn register_instance<T: ?Sized + Resolvable>(
        &mut self,
        name: Option<&str>,
        instance: Svc<T>,
        lifetime: Option<Arc<dyn LifetimeManager>>,
    ) -> &mut Self {
        let name = name.map(str::to_owned);
        self.register(move |container| {
            container
                .register_instance(name.as_deref(), instance, lifetime)
                .map(|_| ())
        })
    }

    /// Adds any other registration.
    pub fn register<F>(&mut self, registration: F) -> &mut Self
    where
        F: FnOnce(&UnityContainer) -> InjectResult<()> + Send + 'static,
    {
        self.registrations.push(Box::new(registration));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl UnityContainer {
    /// Applies the registrations of a module, in the order they were added.
    /// Stops at the first registration that fails.
    pub fn add_module(&self, module: Module) -> InjectResult<&Self> {
        for registration in module.registrations {
            registration(self)?;
        }

        Ok(self)
    }
}

/// Defines a new module using a domain specific language.
///
/// # Example
///
/// ```
/// use unity_container::{
///     define_module, interface, Constructor, Injectable, Members, Service, Svc,
///     UnityContainer,
/// };
///
/// trait Fooable: Service {}
/// interface!(Fooable);
///
/// #[derive(Default)]
/// struct Foo;
/// impl Fooable for Foo {}
/// impl Injectable for Foo {
///     fn members() -> Members<Self> {
///         Members::new().constructor(Constructor::from_default())
///     }
/// }
///
/// #[derive(Default)]
/// struct Bar;
/// impl Fooable for Bar {}
/// impl Injectable for Bar {
///     fn members() -> Members<Self> {
///         Members::new().constructor(Constructor::from_default())
///     }
/// }
///
/// let module = define_module! {
///     singletons = [dyn Fooable => Foo],
///     named = {
///         "bar": dyn Fooable => Bar,
///     },
///     instances = [u32 => 42],
/// };
///
/// let container = UnityContainer::new();
/// container.add_module(module).unwrap();
///
/// let first: Svc<dyn Fooable> = container.resolve().unwrap();
/// let second: Svc<dyn Fooable> = container.resolve().unwrap();
/// assert!(Svc::ptr_eq(&first, &second));
/// assert_eq!(1, container.resolve_all::<dyn Fooable>().unwrap().len());
/// assert_eq!(42, *container.resolve::<u32>().unwrap());
/// ```
#[macro_export]
macro_rules! define_module {
    {
        $($key:ident = $value:tt),*
        $(,)?
    } => {
        {
            #[allow(unused_mut)]
            let mut module = <$crate::Module as ::std::default::Default>::default();
            $($crate::define_module!(@register module, $key = $value);)*
            module
        }
    };
    (
        @register $module:expr,
        types = [
            $($from:ty => $to:ty),*
            $(,)?
        ]
    ) => {
        $($module.register_type::<$from, $to>($crate::RegisterOptions::new());)*
    };
    (
        @register $module:expr,
        singletons = [
            $($from:ty => $to:ty),*
            $(,)?
        ]
    ) => {
        $(
            $module.register_type::<$from, $to>(
                $crate::RegisterOptions::new()
                    .lifetime($crate::ContainerControlledLifetimeManager::new()),
            );
        )*
    };
    (
        @register $module:expr,
        named = {
            $($name:literal : $from:ty => $to:ty),*
            $(,)?
        }
    ) => {
        $($module.register_type::<$from, $to>($crate::RegisterOptions::new().named($name));)*
    };
    (
        @register $module:expr,
        instances = [
            $($ty:ty => $value:expr),*
            $(,)?
        ]
    ) => {
        $($module.register_instance::<$ty>(None, $crate::Svc::new($value), None);)*
    };
}
