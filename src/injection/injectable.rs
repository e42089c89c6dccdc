use crate::{BuildKey, Dispose, Members, OpenGeneric, Service};

/// Describes how the container can build and inject a type. This replaces
/// attribute discovery: a type lists its constructors, properties and methods
/// along with which of them are marked for injection.
///
/// ## Example
///
/// ```
/// use unity_container::{
///     Constructor, Injectable, Members, Property, Svc, UnityContainer,
/// };
///
/// #[derive(Default)]
/// struct Config;
/// impl Injectable for Config {
///     fn members() -> Members<Self> {
///         Members::new().constructor(Constructor::new(|_| Ok(Config)))
///     }
/// }
///
/// struct Mailer {
///     config: Svc<Config>,
///     retries: Option<Svc<u32>>,
/// }
///
/// impl Injectable for Mailer {
///     fn members() -> Members<Self> {
///         Members::new()
///             .constructor(
///                 Constructor::new(|args| {
///                     Ok(Mailer {
///                         config: args.next()?,
///                         retries: None,
///                     })
///                 })
///                 .param::<Config>("config"),
///             )
///             .property(
///                 Property::optional("retries", |mailer: &mut Mailer, retries| {
///                     mailer.retries = retries;
///                 })
///                 .marked(),
///             )
///     }
/// }
///
/// let container = UnityContainer::new();
/// let mailer: Svc<Mailer> = container.resolve().unwrap();
/// assert!(mailer.retries.is_none());
/// ```
pub trait Injectable: Service + Sized {
    /// The injection members of this type.
    #[must_use]
    fn members() -> Members<Self> {
        Members::new()
    }

    /// The open generic definition of this type, if it is generic. See
    /// [`open_generic!`](crate::open_generic).
    #[must_use]
    fn open_generic() -> Option<OpenGeneric> {
        None
    }

    /// Exposes the build lifecycle hooks of this value.
    fn as_builder_aware(&self) -> Option<&dyn BuilderAware> {
        None
    }

    /// Exposes the disposal hook of this value. Values held by a disposable
    /// lifetime manager are disposed along with their container.
    fn as_dispose(&self) -> Option<&dyn Dispose> {
        None
    }
}

/// Implemented by types which want to know when the container has finished
/// building them.
pub trait BuilderAware {
    /// Called after the value has been constructed and injected.
    fn on_built_up(&self, build_key: &BuildKey);
}

macro_rules! injectable_values {
    ($($value:ty),* $(,)?) => {
        $(impl Injectable for $value {})*
    };
}

// Values are never constructed by the container, but they can be supplied
// through instances and overrides.
injectable_values!(
    String,
    &'static str,
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
);
