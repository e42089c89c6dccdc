use crate::{
    Arguments, BuildKey, BuildPlanCreatorPolicy, BuildPlanPolicy, BuilderContext,
    ConstructorSelectorPolicy, DynSvc, ErasedValue, Existing, InjectError,
    InjectResult, Instance, InstanceHooks, MethodSelectorPolicy, Operation,
    PropertySelectorPolicy, SelectedConstructor, SelectedMethod, SelectedProperty,
    ServiceInfo, UnityContainer,
};
use std::{cell::RefCell, sync::Arc};

/// Builds a type by invoking its selected constructor, then injecting its
/// selected properties, then invoking its selected methods.
pub struct DynamicBuildPlan {
    service_info: ServiceInfo,
    hooks: InstanceHooks,
    seal: fn(ErasedValue) -> Option<DynSvc>,
    constructor: Option<SelectedConstructor>,
    properties: Vec<SelectedProperty>,
    methods: Vec<SelectedMethod>,
}

impl DynamicBuildPlan {
    fn construct(&self, context: &mut BuilderContext) -> InjectResult<ErasedValue> {
        let constructor = self.constructor.as_ref().ok_or(InjectError::NoConstructor {
            service_info: self.service_info,
        })?;

        let mut values = Vec::with_capacity(constructor.parameters.len());
        for parameter in &constructor.parameters {
            context.set_operation(Operation::ResolvingConstructorParameter {
                type_being_built: self.service_info,
                parameter: parameter.name(),
                dependency: *parameter.dependency(),
            });
            values.push(context.resolve_dependency(parameter)?);
        }

        context.set_operation(Operation::InvokingConstructor {
            type_being_built: self.service_info,
        });
        constructor
            .constructor
            .invoke(&mut Arguments::new(values))
    }

    fn inject(
        &self,
        context: &mut BuilderContext,
        value: &mut ErasedValue,
    ) -> InjectResult<()> {
        for selected in &self.properties {
            context.set_operation(Operation::ResolvingProperty {
                type_being_built: self.service_info,
                property: selected.property.name(),
                dependency: *selected.parameter.dependency(),
            });
            let resolved = context.resolve_dependency(&selected.parameter)?;
            selected
                .property
                .apply(value, &mut Arguments::new(vec![resolved]))?;
        }

        for selected in &self.methods {
            let mut values = Vec::with_capacity(selected.parameters.len());
            for parameter in &selected.parameters {
                context.set_operation(Operation::ResolvingMethodParameter {
                    type_being_built: self.service_info,
                    method: selected.method.name(),
                    parameter: parameter.name(),
                    dependency: *parameter.dependency(),
                });
                values.push(context.resolve_dependency(parameter)?);
            }

            context.set_operation(Operation::InvokingMethod {
                type_being_built: self.service_info,
                method: selected.method.name(),
            });
            selected
                .method
                .apply(value, &mut Arguments::new(values))?;
        }

        Ok(())
    }
}

impl BuildPlanPolicy for DynamicBuildPlan {
    fn build_up(&self, context: &mut BuilderContext) -> InjectResult<()> {
        let (mut value, seal, hooks) = match context.take_existing() {
            Some(Existing::Built(instance)) => {
                context.set_existing(Existing::Built(instance));
                return Ok(());
            }
            Some(Existing::Unbuilt(unbuilt)) => unbuilt.into_parts(),
            None => (self.construct(context)?, self.seal, Some(self.hooks)),
        };

        self.inject(context, &mut value)?;
        context.clear_operation();

        let value = seal(value).ok_or(InjectError::InvalidInstance {
            service_info: self.service_info,
        })?;
        context.set_existing(Existing::Built(Instance::new(value, hooks)));
        Ok(())
    }

    fn is_shared(&self) -> bool {
        false
    }
}

/// Creates [`DynamicBuildPlan`]s from the members of a type, using the
/// selector policies in effect for the build key.
#[derive(Clone, Copy, Default, Debug)]
pub struct DynamicBuildPlanCreator;

impl BuildPlanCreatorPolicy for DynamicBuildPlanCreator {
    fn create_plan(
        &self,
        context: &mut BuilderContext,
        build_key: &BuildKey,
    ) -> InjectResult<Arc<dyn BuildPlanPolicy>> {
        let service_info = *build_key.service_info();
        let members = service_info
            .members()
            .ok_or(InjectError::NotConstructible { service_info })?;

        let policies = context.policies();
        let constructor = match policies.get::<dyn ConstructorSelectorPolicy>(build_key) {
            Some(selector) => match selector.select_constructor(&members) {
                Ok(constructor) => Some(constructor),
                // Existing values are never constructed
                Err(_) if context.has_unbuilt() => None,
                Err(error) => return Err(error),
            },
            None => None,
        };
        let properties = match policies.get::<dyn PropertySelectorPolicy>(build_key) {
            Some(selector) => selector.select_properties(&members)?,
            None => Vec::new(),
        };
        let methods = match policies.get::<dyn MethodSelectorPolicy>(build_key) {
            Some(selector) => selector.select_methods(&members)?,
            None => Vec::new(),
        };

        Ok(Arc::new(DynamicBuildPlan {
            service_info,
            hooks: members.hooks(),
            seal: members.seal(),
            constructor,
            properties,
            methods,
        }))
    }
}

type Factory =
    Arc<dyn Fn(&UnityContainer, &BuildKey) -> InjectResult<DynSvc> + Send + Sync>;

thread_local! {
    /// The build path of the build whose factory is running on this thread.
    static FACTORY_PATH: RefCell<Vec<BuildKey>> = RefCell::new(Vec::new());
}

/// The build path that resolves made by a running factory continue from, so
/// a factory requesting its own key is reported as a cycle.
pub(crate) fn factory_build_path() -> Vec<BuildKey> {
    FACTORY_PATH.with(|path| path.borrow().clone())
}

/// Restores the factory build path of an enclosing factory.
struct RestoreFactoryPath(Vec<BuildKey>);

impl Drop for RestoreFactoryPath {
    fn drop(&mut self) {
        let previous = std::mem::take(&mut self.0);
        FACTORY_PATH.with(|path| *path.borrow_mut() = previous);
    }
}

/// Builds values by calling a factory function with the container.
pub struct FactoryBuildPlan {
    factory: Factory,
    hooks: Option<InstanceHooks>,
}

impl FactoryBuildPlan {
    #[must_use]
    pub fn new(factory: Factory, hooks: Option<InstanceHooks>) -> Self {
        FactoryBuildPlan { factory, hooks }
    }
}

impl BuildPlanPolicy for FactoryBuildPlan {
    fn build_up(&self, context: &mut BuilderContext) -> InjectResult<()> {
        match context.take_existing() {
            Some(Existing::Built(instance)) => {
                context.set_existing(Existing::Built(instance));
                return Ok(());
            }
            Some(Existing::Unbuilt(unbuilt)) => {
                let service_info = *context.build_key().service_info();
                let (value, seal, hooks) = unbuilt.into_parts();
                let value = seal(value).ok_or(InjectError::InvalidInstance { service_info })?;
                context.set_existing(Existing::Built(Instance::new(value, hooks)));
                return Ok(());
            }
            None => {}
        }

        let container = context
            .new_build_up(BuildKey::of::<UnityContainer>(None))?
            .into_value();
        let container: Arc<UnityContainer> = container.downcast_arc().map_err(|_| {
            InjectError::InternalError("the container could not resolve itself".into())
        })?;

        let build_key = context.build_key().clone();
        let mut build_path = context.build_path().to_vec();
        build_path.push(build_key.clone());
        let _restore =
            RestoreFactoryPath(FACTORY_PATH.with(|path| path.replace(build_path)));

        let value = (self.factory)(&container, &build_key)?;
        context.set_existing(Existing::Built(Instance::new(value, self.hooks)));
        Ok(())
    }
}
