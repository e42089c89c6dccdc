use crate::{
    DependencyResolver, DynSvc, ErasedValue, InjectError, InjectResult,
    Injectable, InstanceHooks, Resolvable, Service, ServiceInfo, Svc,
};
use std::{fmt::Debug, marker::PhantomData, sync::Arc};

type Invoke =
    Arc<dyn Fn(&mut Arguments) -> InjectResult<ErasedValue> + Send + Sync>;
type Apply = Arc<
    dyn Fn(&mut ErasedValue, &mut Arguments) -> InjectResult<()> + Send + Sync,
>;

/// Converts an erased value of type `T` into a service pointer.
pub(crate) fn seal<T: Service>(value: ErasedValue) -> Option<DynSvc> {
    value
        .downcast::<T>()
        .ok()
        .map(|value| Svc::new(*value) as DynSvc)
}

/// Resolved values passed to a constructor, method or property setter, in
/// declaration order.
pub struct Arguments {
    values: std::vec::IntoIter<Option<DynSvc>>,
}

impl Arguments {
    pub(crate) fn new(values: Vec<Option<DynSvc>>) -> Self {
        Arguments {
            values: values.into_iter(),
        }
    }

    /// Takes the next argument, which must be present.
    pub fn next<D: ?Sized + Resolvable>(&mut self) -> InjectResult<Svc<D>> {
        self.next_optional::<D>()?
            .ok_or(InjectError::MissingArgument {
                service_info: D::service_info(),
            })
    }

    /// Takes the next argument. Optional parameters which could not be
    /// resolved are `None`.
    pub fn next_optional<D: ?Sized + Resolvable>(
        &mut self,
    ) -> InjectResult<Option<Svc<D>>> {
        let service_info = D::service_info();
        let value = self
            .values
            .next()
            .ok_or(InjectError::MissingArgument { service_info })?;
        value
            .map(|value| {
                D::from_dyn(value)
                    .ok_or(InjectError::InvalidInstance { service_info })
            })
            .transpose()
    }

    /// Takes the next argument and clones the value out of it.
    pub fn next_value<D: Resolvable + Clone>(&mut self) -> InjectResult<D> {
        self.next::<D>().map(|value| D::clone(&value))
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

/// A dependency of a constructor, method or property.
#[derive(Clone, Debug)]
pub struct ParameterInfo {
    name: &'static str,
    dependency: ServiceInfo,
    dependency_name: Option<String>,
    optional: bool,
    resolver: Option<DependencyResolver>,
}

impl ParameterInfo {
    fn of<D: ?Sized + Resolvable>(name: &'static str) -> Self {
        ParameterInfo {
            name,
            dependency: D::service_info(),
            dependency_name: None,
            optional: false,
            resolver: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn dependency(&self) -> &ServiceInfo {
        &self.dependency
    }

    /// The registration name the dependency is resolved with.
    #[must_use]
    pub fn dependency_name(&self) -> Option<&str> {
        self.dependency_name.as_deref()
    }

    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Replaces how this parameter is resolved.
    #[must_use]
    pub fn with_resolver(mut self, resolver: DependencyResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// How this parameter is resolved when no override applies.
    #[must_use]
    pub fn resolver(&self) -> DependencyResolver {
        self.resolver
            .clone()
            .unwrap_or_else(|| DependencyResolver::Resolved {
                service_info: self.dependency,
                name: self.dependency_name.clone(),
                optional: self.optional,
            })
    }
}

/// An erased constructor.
#[derive(Clone)]
pub struct ConstructorInfo {
    parameters: Vec<ParameterInfo>,
    marked: bool,
    invoke: Invoke,
}

impl ConstructorInfo {
    #[must_use]
    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    #[must_use]
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Checks whether the parameter types of this constructor are exactly
    /// `signature`.
    #[must_use]
    pub fn matches(&self, signature: &[ServiceInfo]) -> bool {
        matches_signature(&self.parameters, signature)
    }

    pub(crate) fn invoke(
        &self,
        arguments: &mut Arguments,
    ) -> InjectResult<ErasedValue> {
        (self.invoke)(arguments)
    }
}

impl Debug for ConstructorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructorInfo")
            .field("parameters", &self.parameters)
            .field("marked", &self.marked)
            .finish_non_exhaustive()
    }
}

/// An erased property setter.
#[derive(Clone)]
pub struct PropertyInfo {
    name: &'static str,
    parameter: ParameterInfo,
    marked: bool,
    apply: Apply,
}

impl PropertyInfo {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The dependency assigned to this property.
    #[must_use]
    pub fn parameter(&self) -> &ParameterInfo {
        &self.parameter
    }

    #[must_use]
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub(crate) fn apply(
        &self,
        target: &mut ErasedValue,
        arguments: &mut Arguments,
    ) -> InjectResult<()> {
        (self.apply)(target, arguments)
    }
}

impl Debug for PropertyInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyInfo")
            .field("name", &self.name)
            .field("parameter", &self.parameter)
            .field("marked", &self.marked)
            .finish_non_exhaustive()
    }
}

/// An erased method.
#[derive(Clone)]
pub struct MethodInfo {
    name: &'static str,
    parameters: Vec<ParameterInfo>,
    marked: bool,
    apply: Apply,
}

impl MethodInfo {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    #[must_use]
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    #[must_use]
    pub fn matches(&self, signature: &[ServiceInfo]) -> bool {
        matches_signature(&self.parameters, signature)
    }

    pub(crate) fn apply(
        &self,
        target: &mut ErasedValue,
        arguments: &mut Arguments,
    ) -> InjectResult<()> {
        (self.apply)(target, arguments)
    }
}

impl Debug for MethodInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodInfo")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("marked", &self.marked)
            .finish_non_exhaustive()
    }
}

fn matches_signature(
    parameters: &[ParameterInfo],
    signature: &[ServiceInfo],
) -> bool {
    parameters.len() == signature.len()
        && parameters
            .iter()
            .zip(signature)
            .all(|(parameter, expected)| parameter.dependency == *expected)
}

fn downcast_target<T: Injectable>(target: &mut ErasedValue) -> InjectResult<&mut T> {
    target
        .downcast_mut::<T>()
        .ok_or(InjectError::InvalidInstance {
            service_info: ServiceInfo::of::<T>(),
        })
}

/// A constructor of `T`. The constructor function receives its resolved
/// parameters through [`Arguments`], in the order they are declared.
pub struct Constructor<T> {
    info: ConstructorInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Constructor<T> {
    pub fn new<F>(constructor: F) -> Self
    where
        F: Fn(&mut Arguments) -> InjectResult<T> + Send + Sync + 'static,
    {
        Constructor {
            info: ConstructorInfo {
                parameters: Vec::new(),
                marked: false,
                invoke: Arc::new(move |arguments| {
                    constructor(arguments)
                        .map(|value| Box::new(value) as ErasedValue)
                }),
            },
            _marker: PhantomData,
        }
    }

    /// A parameterless constructor using [`Default`].
    #[must_use]
    pub fn from_default() -> Self
    where
        T: Default,
    {
        Constructor::new(|_| Ok(T::default()))
    }

    /// Declares the next parameter.
    #[must_use]
    pub fn param<D: ?Sized + Resolvable>(mut self, name: &'static str) -> Self {
        self.info.parameters.push(ParameterInfo::of::<D>(name));
        self
    }

    /// Declares the next parameter, resolved using a registration name.
    #[must_use]
    pub fn named_param<D: ?Sized + Resolvable>(
        mut self,
        name: &'static str,
        dependency_name: impl Into<String>,
    ) -> Self {
        let mut parameter = ParameterInfo::of::<D>(name);
        parameter.dependency_name = Some(dependency_name.into());
        self.info.parameters.push(parameter);
        self
    }

    /// Declares the next parameter as optional. It is `None` when nothing is
    /// registered that could build it.
    #[must_use]
    pub fn optional_param<D: ?Sized + Resolvable>(
        mut self,
        name: &'static str,
    ) -> Self {
        let mut parameter = ParameterInfo::of::<D>(name);
        parameter.optional = true;
        self.info.parameters.push(parameter);
        self
    }

    /// Marks this constructor as the one to inject.
    #[must_use]
    pub fn marked(mut self) -> Self {
        self.info.marked = true;
        self
    }
}

/// A property of `T` which can be injected with a dependency.
pub struct Property<T> {
    info: PropertyInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Property<T> {
    pub fn new<D, F>(name: &'static str, setter: F) -> Self
    where
        D: ?Sized + Resolvable,
        F: Fn(&mut T, Svc<D>) + Send + Sync + 'static,
    {
        Property {
            info: PropertyInfo {
                name,
                parameter: ParameterInfo::of::<D>(name),
                marked: false,
                apply: Arc::new(move |target, arguments| {
                    let value = arguments.next::<D>()?;
                    setter(downcast_target::<T>(target)?, value);
                    Ok(())
                }),
            },
            _marker: PhantomData,
        }
    }

    /// A property which is left unset when its dependency can't be built.
    pub fn optional<D, F>(name: &'static str, setter: F) -> Self
    where
        D: ?Sized + Resolvable,
        F: Fn(&mut T, Option<Svc<D>>) + Send + Sync + 'static,
    {
        let mut parameter = ParameterInfo::of::<D>(name);
        parameter.optional = true;
        Property {
            info: PropertyInfo {
                name,
                parameter,
                marked: false,
                apply: Arc::new(move |target, arguments| {
                    let value = arguments.next_optional::<D>()?;
                    setter(downcast_target::<T>(target)?, value);
                    Ok(())
                }),
            },
            _marker: PhantomData,
        }
    }

    /// Resolves the dependency using a registration name.
    #[must_use]
    pub fn named(mut self, dependency_name: impl Into<String>) -> Self {
        self.info.parameter.dependency_name = Some(dependency_name.into());
        self
    }

    /// Marks this property for injection.
    #[must_use]
    pub fn marked(mut self) -> Self {
        self.info.marked = true;
        self
    }
}

/// A method of `T` which can be invoked with dependencies after
/// construction.
pub struct Method<T> {
    info: MethodInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Method<T> {
    pub fn new<F>(name: &'static str, method: F) -> Self
    where
        F: Fn(&mut T, &mut Arguments) -> InjectResult<()> + Send + Sync + 'static,
    {
        Method {
            info: MethodInfo {
                name,
                parameters: Vec::new(),
                marked: false,
                apply: Arc::new(move |target, arguments| {
                    method(downcast_target::<T>(target)?, arguments)
                }),
            },
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn param<D: ?Sized + Resolvable>(mut self, name: &'static str) -> Self {
        self.info.parameters.push(ParameterInfo::of::<D>(name));
        self
    }

    #[must_use]
    pub fn named_param<D: ?Sized + Resolvable>(
        mut self,
        name: &'static str,
        dependency_name: impl Into<String>,
    ) -> Self {
        let mut parameter = ParameterInfo::of::<D>(name);
        parameter.dependency_name = Some(dependency_name.into());
        self.info.parameters.push(parameter);
        self
    }

    #[must_use]
    pub fn optional_param<D: ?Sized + Resolvable>(
        mut self,
        name: &'static str,
    ) -> Self {
        let mut parameter = ParameterInfo::of::<D>(name);
        parameter.optional = true;
        self.info.parameters.push(parameter);
        self
    }

    /// Marks this method for injection.
    #[must_use]
    pub fn marked(mut self) -> Self {
        self.info.marked = true;
        self
    }
}

/// The constructors, properties and methods of `T` known to the container.
pub struct Members<T> {
    constructors: Vec<ConstructorInfo>,
    properties: Vec<PropertyInfo>,
    methods: Vec<MethodInfo>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Members<T> {
    #[must_use]
    pub fn new() -> Self {
        Members {
            constructors: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn constructor(mut self, constructor: Constructor<T>) -> Self {
        self.constructors.push(constructor.info);
        self
    }

    #[must_use]
    pub fn property(mut self, property: Property<T>) -> Self {
        self.properties.push(property.info);
        self
    }

    #[must_use]
    pub fn method(mut self, method: Method<T>) -> Self {
        self.methods.push(method.info);
        self
    }
}

impl<T: Injectable> Default for Members<T> {
    fn default() -> Self {
        Members::new()
    }
}

/// The members of a type, with the type erased.
#[derive(Clone, Debug)]
pub struct TypeMembers {
    service_info: ServiceInfo,
    hooks: InstanceHooks,
    seal: fn(ErasedValue) -> Option<DynSvc>,
    constructors: Vec<ConstructorInfo>,
    properties: Vec<PropertyInfo>,
    methods: Vec<MethodInfo>,
}

impl TypeMembers {
    /// Discovers the members of an injectable type.
    #[must_use]
    pub fn of<T: Injectable>() -> Self {
        let members = T::members();
        TypeMembers {
            service_info: ServiceInfo::of_injectable::<T>(),
            hooks: InstanceHooks::of::<T>(),
            seal: seal::<T>,
            constructors: members.constructors,
            properties: members.properties,
            methods: members.methods,
        }
    }

    #[must_use]
    pub fn service_info(&self) -> &ServiceInfo {
        &self.service_info
    }

    #[must_use]
    pub fn hooks(&self) -> InstanceHooks {
        self.hooks
    }

    #[must_use]
    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    #[must_use]
    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    #[must_use]
    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    pub(crate) fn seal(&self) -> fn(ErasedValue) -> Option<DynSvc> {
        self.seal
    }
}

#[cfg(test)]
mod tests {
    use super::{Arguments, Constructor, Members, Method, Property, TypeMembers};
    use crate::{InjectError, InjectResult, Injectable, ServiceInfo, Svc};

    #[derive(Default)]
    struct Widget {
        size: u32,
        label: Option<Svc<String>>,
        calls: Vec<u32>,
    }

    impl Injectable for Widget {
        fn members() -> Members<Self> {
            Members::new()
                .constructor(Constructor::from_default())
                .constructor(
                    Constructor::new(|args| {
                        Ok(Widget {
                            size: args.next_value()?,
                            ..Widget::default()
                        })
                    })
                    .param::<u32>("size")
                    .marked(),
                )
                .property(Property::optional(
                    "label",
                    |widget: &mut Widget, label| widget.label = label,
                ))
                .method(
                    Method::new("record", |widget: &mut Widget, args| {
                        widget.calls.push(args.next_value()?);
                        Ok(())
                    })
                    .param::<u32>("value"),
                )
        }
    }

    fn arguments(values: Vec<Option<u32>>) -> Arguments {
        Arguments::new(
            values
                .into_iter()
                .map(|value| value.map(|value| Svc::new(value) as crate::DynSvc))
                .collect(),
        )
    }

    #[test]
    fn members_are_erased_in_declaration_order() {
        let members = TypeMembers::of::<Widget>();
        assert_eq!(2, members.constructors().len());
        assert!(!members.constructors()[0].is_marked());
        assert!(members.constructors()[1].is_marked());
        assert!(members.constructors()[1].matches(&[ServiceInfo::of::<u32>()]));
        assert!(members.properties()[0].parameter().is_optional());
        assert_eq!("record", members.methods()[0].name());
    }

    #[test]
    fn erased_members_build_and_inject() -> InjectResult<()> {
        let members = TypeMembers::of::<Widget>();
        let mut value = members.constructors()[1].invoke(&mut arguments(vec![Some(7)]))?;
        members.properties()[0].apply(&mut value, &mut arguments(vec![None]))?;
        members.methods()[0].apply(&mut value, &mut arguments(vec![Some(3)]))?;

        let widget = (members.seal())(value).unwrap();
        let widget: Svc<Widget> = widget.downcast_arc().ok().unwrap();
        assert_eq!(7, widget.size);
        assert!(widget.label.is_none());
        assert_eq!(vec![3], widget.calls);
        Ok(())
    }

    #[test]
    fn missing_arguments_are_reported() {
        let mut args = arguments(vec![]);
        match args.next::<u32>() {
            Err(InjectError::MissingArgument { service_info })
                if service_info == ServiceInfo::of::<u32>() => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => unreachable!("no arguments were given"),
        }
    }

    #[test]
    fn wrong_argument_type_is_invalid() {
        let mut args = arguments(vec![Some(1)]);
        match args.next::<String>() {
            Err(InjectError::InvalidInstance { .. }) => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => unreachable!("a u32 is not a string"),
        }
    }
}
