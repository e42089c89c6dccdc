use crate::{
    ConstructorInfo, ConstructorSelectorPolicy, DependencyResolver, InjectError,
    InjectResult, MethodInfo, MethodSelectorPolicy, ParameterInfo, PropertyInfo,
    PropertySelectorPolicy, ServiceInfo, TypeMembers,
};

/// A constructor chosen for a build, with the parameters to resolve for it.
#[derive(Clone, Debug)]
pub struct SelectedConstructor {
    pub constructor: ConstructorInfo,
    pub parameters: Vec<ParameterInfo>,
}

impl SelectedConstructor {
    fn from_info(constructor: &ConstructorInfo) -> Self {
        SelectedConstructor {
            parameters: constructor.parameters().to_vec(),
            constructor: constructor.clone(),
        }
    }
}

/// A property chosen for injection.
#[derive(Clone, Debug)]
pub struct SelectedProperty {
    pub property: PropertyInfo,
    pub parameter: ParameterInfo,
}

/// A method chosen for injection, with the parameters to resolve for it.
#[derive(Clone, Debug)]
pub struct SelectedMethod {
    pub method: MethodInfo,
    pub parameters: Vec<ParameterInfo>,
}

/// Selects the constructor marked for injection. Without a marked
/// constructor, the one with the most parameters is selected.
#[derive(Clone, Copy, Default, Debug)]
pub struct DefaultConstructorSelector;

impl ConstructorSelectorPolicy for DefaultConstructorSelector {
    fn select_constructor(
        &self,
        members: &TypeMembers,
    ) -> InjectResult<SelectedConstructor> {
        let service_info = *members.service_info();
        let constructors = members.constructors();

        let mut marked = constructors.iter().filter(|c| c.is_marked());
        if let Some(constructor) = marked.next() {
            if marked.next().is_some() {
                return Err(InjectError::MultipleMarkedConstructors { service_info });
            }

            return Ok(SelectedConstructor::from_info(constructor));
        }

        let parameter_count = constructors
            .iter()
            .map(|constructor| constructor.parameters().len())
            .max()
            .ok_or(InjectError::NoConstructor { service_info })?;
        let mut longest = constructors
            .iter()
            .filter(|constructor| constructor.parameters().len() == parameter_count);
        match (longest.next(), longest.next()) {
            (Some(constructor), None) => Ok(SelectedConstructor::from_info(constructor)),
            _ => Err(InjectError::AmbiguousConstructor {
                service_info,
                parameter_count,
            }),
        }
    }
}

/// Selects every property marked for injection.
#[derive(Clone, Copy, Default, Debug)]
pub struct DefaultPropertySelector;

impl PropertySelectorPolicy for DefaultPropertySelector {
    fn select_properties(
        &self,
        members: &TypeMembers,
    ) -> InjectResult<Vec<SelectedProperty>> {
        Ok(members
            .properties()
            .iter()
            .filter(|property| property.is_marked())
            .map(|property| SelectedProperty {
                property: property.clone(),
                parameter: property.parameter().clone(),
            })
            .collect())
    }
}

/// Selects every method marked for injection.
#[derive(Clone, Copy, Default, Debug)]
pub struct DefaultMethodSelector;

impl MethodSelectorPolicy for DefaultMethodSelector {
    fn select_methods(
        &self,
        members: &TypeMembers,
    ) -> InjectResult<Vec<SelectedMethod>> {
        Ok(members
            .methods()
            .iter()
            .filter(|method| method.is_marked())
            .map(|method| SelectedMethod {
                method: method.clone(),
                parameters: method.parameters().to_vec(),
            })
            .collect())
    }
}

/// A parameter given at registration, by type, with an optional resolver
/// replacing how it is resolved.
pub type SpecifiedParameter = (ServiceInfo, Option<DependencyResolver>);

fn signature_of(parameters: &[SpecifiedParameter]) -> Vec<ServiceInfo> {
    parameters.iter().map(|(service_info, _)| *service_info).collect()
}

fn apply_resolvers(
    declared: &[ParameterInfo],
    specified: &[SpecifiedParameter],
) -> Vec<ParameterInfo> {
    declared
        .iter()
        .zip(specified)
        .map(|(parameter, (_, resolver))| match resolver {
            Some(resolver) => parameter.clone().with_resolver(resolver.clone()),
            None => parameter.clone(),
        })
        .collect()
}

/// Selects the constructor with exactly the given parameter types.
#[derive(Clone, Debug)]
pub struct SpecifiedConstructorSelector {
    parameters: Vec<SpecifiedParameter>,
}

impl SpecifiedConstructorSelector {
    #[must_use]
    pub fn new(parameters: Vec<SpecifiedParameter>) -> Self {
        SpecifiedConstructorSelector { parameters }
    }
}

impl ConstructorSelectorPolicy for SpecifiedConstructorSelector {
    fn select_constructor(
        &self,
        members: &TypeMembers,
    ) -> InjectResult<SelectedConstructor> {
        let signature = signature_of(&self.parameters);
        let constructor = members
            .constructors()
            .iter()
            .find(|constructor| constructor.matches(&signature))
            .ok_or_else(|| InjectError::ConstructorNotFound {
                service_info: *members.service_info(),
                signature: signature.clone(),
            })?;

        Ok(SelectedConstructor {
            constructor: constructor.clone(),
            parameters: apply_resolvers(constructor.parameters(), &self.parameters),
        })
    }
}

/// Selects the named properties, whether or not they are marked.
#[derive(Clone, Debug)]
pub struct SpecifiedPropertiesSelector {
    properties: Vec<(String, Option<DependencyResolver>)>,
}

impl SpecifiedPropertiesSelector {
    #[must_use]
    pub fn new(properties: Vec<(String, Option<DependencyResolver>)>) -> Self {
        SpecifiedPropertiesSelector { properties }
    }
}

impl PropertySelectorPolicy for SpecifiedPropertiesSelector {
    fn select_properties(
        &self,
        members: &TypeMembers,
    ) -> InjectResult<Vec<SelectedProperty>> {
        self.properties
            .iter()
            .map(|(name, resolver)| {
                let property = members
                    .properties()
                    .iter()
                    .find(|property| property.name() == name)
                    .ok_or_else(|| InjectError::PropertyNotFound {
                        service_info: *members.service_info(),
                        property: name.clone(),
                    })?;
                let parameter = match resolver {
                    Some(resolver) => {
                        property.parameter().clone().with_resolver(resolver.clone())
                    }
                    None => property.parameter().clone(),
                };

                Ok(SelectedProperty {
                    property: property.clone(),
                    parameter,
                })
            })
            .collect()
    }
}

/// Selects the methods with the given names and parameter types, in the
/// order they were given. A method may be selected more than once.
#[derive(Clone, Debug)]
pub struct SpecifiedMethodsSelector {
    methods: Vec<(String, Vec<SpecifiedParameter>)>,
}

impl SpecifiedMethodsSelector {
    #[must_use]
    pub fn new(methods: Vec<(String, Vec<SpecifiedParameter>)>) -> Self {
        SpecifiedMethodsSelector { methods }
    }
}

impl MethodSelectorPolicy for SpecifiedMethodsSelector {
    fn select_methods(
        &self,
        members: &TypeMembers,
    ) -> InjectResult<Vec<SelectedMethod>> {
        self.methods
            .iter()
            .map(|(name, parameters)| {
                let signature = signature_of(parameters);
                let method = members
                    .methods()
                    .iter()
                    .find(|method| method.name() == name && method.matches(&signature))
                    .ok_or_else(|| InjectError::MethodNotFound {
                        service_info: *members.service_info(),
                        method: name.clone(),
                        signature: signature.clone(),
                    })?;

                Ok(SelectedMethod {
                    method: method.clone(),
                    parameters: apply_resolvers(method.parameters(), parameters),
                })
            })
            .collect()
    }
}
