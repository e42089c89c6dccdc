use crate::{
    BuildKey, BuildPlanPolicy, ConstructorSelectorPolicy, DependencyResolver,
    FactoryBuildPlan, InjectResult, MethodSelectorPolicy, PropertySelectorPolicy,
    Resolvable, ServiceInfo, SpecifiedConstructorSelector, SpecifiedMethodsSelector,
    SpecifiedParameter, SpecifiedPropertiesSelector, Svc, UnityContainer,
};
use std::sync::Arc;

/// Configures how a registration is built. Members contribute policies
/// which the container stores for the registered type.
pub trait InjectionMember: Send + Sync {
    fn add_policies(&self, policies: &mut InjectionPolicies) -> InjectResult<()>;
}

/// Policies collected from the injection members of one registration.
#[derive(Default)]
pub struct InjectionPolicies {
    constructor: Option<SpecifiedConstructorSelector>,
    properties: Vec<(String, Option<DependencyResolver>)>,
    methods: Vec<(String, Vec<SpecifiedParameter>)>,
    plan: Option<Arc<dyn BuildPlanPolicy>>,
}

impl InjectionPolicies {
    #[must_use]
    pub fn new() -> Self {
        InjectionPolicies::default()
    }

    /// Selects the constructor to use. A later selection replaces an
    /// earlier one.
    pub fn set_constructor(&mut self, selector: SpecifiedConstructorSelector) {
        self.constructor = Some(selector);
    }

    pub fn add_property(&mut self, name: String, resolver: Option<DependencyResolver>) {
        self.properties.push((name, resolver));
    }

    pub fn add_method(&mut self, name: String, parameters: Vec<SpecifiedParameter>) {
        self.methods.push((name, parameters));
    }

    /// Replaces the build plan.
    pub fn set_plan(&mut self, plan: Arc<dyn BuildPlanPolicy>) {
        self.plan = Some(plan);
    }

    #[must_use]
    pub fn constructor_selector(&self) -> Option<Arc<dyn ConstructorSelectorPolicy>> {
        self.constructor
            .clone()
            .map(|selector| Arc::new(selector) as Arc<dyn ConstructorSelectorPolicy>)
    }

    /// The property selector, if any property was specified.
    #[must_use]
    pub fn property_selector(&self) -> Option<Arc<dyn PropertySelectorPolicy>> {
        (!self.properties.is_empty()).then(|| {
            Arc::new(SpecifiedPropertiesSelector::new(self.properties.clone()))
                as Arc<dyn PropertySelectorPolicy>
        })
    }

    /// The method selector, if any method was specified.
    #[must_use]
    pub fn method_selector(&self) -> Option<Arc<dyn MethodSelectorPolicy>> {
        (!self.methods.is_empty()).then(|| {
            Arc::new(SpecifiedMethodsSelector::new(self.methods.clone()))
                as Arc<dyn MethodSelectorPolicy>
        })
    }

    #[must_use]
    pub fn plan(&self) -> Option<Arc<dyn BuildPlanPolicy>> {
        self.plan.clone()
    }
}

/// Selects a constructor by its parameter types. Each parameter can be
/// resolved normally or given a value.
///
/// ```
/// use unity_container::{
///     Constructor, InjectionConstructor, Injectable, Members, RegisterOptions,
///     Svc, UnityContainer,
/// };
///
/// struct Port(u16);
///
/// impl Injectable for Port {
///     fn members() -> Members<Self> {
///         Members::new()
///             .constructor(Constructor::new(|_| Ok(Port(80))))
///             .constructor(
///                 Constructor::new(|args| Ok(Port(args.next_value()?)))
///                     .param::<u16>("port"),
///             )
///     }
/// }
///
/// let container = UnityContainer::new();
/// container
///     .register_type::<Port, Port>(
///         RegisterOptions::new()
///             .member(InjectionConstructor::new().value(Svc::new(8080_u16))),
///     )
///     .unwrap();
///
/// let port: Svc<Port> = container.resolve().unwrap();
/// assert_eq!(8080, port.0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InjectionConstructor {
    parameters: Vec<SpecifiedParameter>,
}

impl InjectionConstructor {
    /// Selects the parameterless constructor until parameters are added.
    #[must_use]
    pub fn new() -> Self {
        InjectionConstructor::default()
    }

    /// Adds a parameter which is resolved as it normally would be.
    #[must_use]
    pub fn param<D: ?Sized + Resolvable>(mut self) -> Self {
        self.parameters.push((D::service_info(), None));
        self
    }

    /// Adds a parameter with a fixed value.
    #[must_use]
    pub fn value<D: ?Sized + Resolvable>(mut self, value: Svc<D>) -> Self {
        self.parameters
            .push((D::service_info(), Some(DependencyResolver::value(value))));
        self
    }

    /// Adds a parameter resolved through a registration name.
    #[must_use]
    pub fn resolved<D: ?Sized + Resolvable>(mut self, name: &str) -> Self {
        self.parameters.push((
            D::service_info(),
            Some(DependencyResolver::resolved::<D>(Some(name))),
        ));
        self
    }

    /// Adds a parameter with a custom resolver.
    #[must_use]
    pub fn with(mut self, service_info: ServiceInfo, resolver: DependencyResolver) -> Self {
        self.parameters.push((service_info, Some(resolver)));
        self
    }
}

impl InjectionMember for InjectionConstructor {
    fn add_policies(&self, policies: &mut InjectionPolicies) -> InjectResult<()> {
        policies.set_constructor(SpecifiedConstructorSelector::new(self.parameters.clone()));
        Ok(())
    }
}

/// Injects a property by name, whether or not it is marked.
#[derive(Clone, Debug)]
pub struct InjectionProperty {
    name: String,
    resolver: Option<DependencyResolver>,
}

impl InjectionProperty {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        InjectionProperty {
            name: name.into(),
            resolver: None,
        }
    }

    /// Injects a fixed value instead of resolving the property.
    #[must_use]
    pub fn with_value<D: ?Sized + Resolvable>(name: impl Into<String>, value: Svc<D>) -> Self {
        InjectionProperty {
            name: name.into(),
            resolver: Some(DependencyResolver::value(value)),
        }
    }

    #[must_use]
    pub fn with_resolver(name: impl Into<String>, resolver: DependencyResolver) -> Self {
        InjectionProperty {
            name: name.into(),
            resolver: Some(resolver),
        }
    }
}

impl InjectionMember for InjectionProperty {
    fn add_policies(&self, policies: &mut InjectionPolicies) -> InjectResult<()> {
        policies.add_property(self.name.clone(), self.resolver.clone());
        Ok(())
    }
}

/// Invokes a method by name and parameter types after construction.
#[derive(Clone, Debug)]
pub struct InjectionMethod {
    name: String,
    parameters: Vec<SpecifiedParameter>,
}

impl InjectionMethod {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        InjectionMethod {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn param<D: ?Sized + Resolvable>(mut self) -> Self {
        self.parameters.push((D::service_info(), None));
        self
    }

    #[must_use]
    pub fn value<D: ?Sized + Resolvable>(mut self, value: Svc<D>) -> Self {
        self.parameters
            .push((D::service_info(), Some(DependencyResolver::value(value))));
        self
    }

    #[must_use]
    pub fn resolved<D: ?Sized + Resolvable>(mut self, name: &str) -> Self {
        self.parameters.push((
            D::service_info(),
            Some(DependencyResolver::resolved::<D>(Some(name))),
        ));
        self
    }
}

impl InjectionMember for InjectionMethod {
    fn add_policies(&self, policies: &mut InjectionPolicies) -> InjectResult<()> {
        policies.add_method(self.name.clone(), self.parameters.clone());
        Ok(())
    }
}

/// Builds a registration with a factory function instead of a constructor.
pub struct InjectionFactory {
    plan: Arc<FactoryBuildPlan>,
}

impl InjectionFactory {
    pub fn new<T, F>(factory: F) -> Self
    where
        T: ?Sized + Resolvable,
        F: Fn(&UnityContainer, &BuildKey) -> InjectResult<Svc<T>> + Send + Sync + 'static,
    {
        InjectionFactory {
            plan: Arc::new(FactoryBuildPlan::new(
                Arc::new(move |container: &UnityContainer, build_key: &BuildKey| {
                    factory(container, build_key).map(T::into_dyn)
                }),
                T::hooks(),
            )),
        }
    }
}

impl InjectionMember for InjectionFactory {
    fn add_policies(&self, policies: &mut InjectionPolicies) -> InjectResult<()> {
        policies.set_plan(self.plan.clone());
        Ok(())
    }
}
