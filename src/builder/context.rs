use crate::{
    BuildKey, Cast, CompositeResolverOverride, DependencyResolver,
    DynSvc, InjectError, InjectResult, Instance, InstanceHooks,
    LifetimeContainer, LifetimeManager, ParameterInfo, PolicyList, ResolverOverride,
    ServiceInfo, SlotGuard, StrategyChain,
};
use derive_more::Display;
use std::{any::Any, sync::Arc};

/// An owned value of an injectable type whose type has been erased.
pub type ErasedValue = Box<dyn Any + Send>;

/// A value passed into a build-up which has not been injected yet.
pub struct UnbuiltValue {
    value: ErasedValue,
    seal: fn(ErasedValue) -> Option<DynSvc>,
    hooks: Option<InstanceHooks>,
}

impl UnbuiltValue {
    pub(crate) fn new<T: crate::Injectable>(value: T) -> Self {
        UnbuiltValue {
            value: Box::new(value),
            seal: crate::injection::seal::<T>,
            hooks: Some(InstanceHooks::of::<T>()),
        }
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        ErasedValue,
        fn(ErasedValue) -> Option<DynSvc>,
        Option<InstanceHooks>,
    ) {
        (self.value, self.seal, self.hooks)
    }
}

impl std::fmt::Debug for UnbuiltValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnbuiltValue").finish_non_exhaustive()
    }
}

/// The value a build is working on.
#[derive(Debug)]
pub enum Existing {
    /// A value which was passed in to be injected.
    Unbuilt(UnbuiltValue),
    /// A finished value.
    Built(Instance),
}

/// What a build is currently doing. Overrides use this to decide whether
/// they apply, and failures report it.
#[derive(Clone, Debug, Display)]
pub enum Operation {
    #[display(
        fmt = "resolving parameter {:?} of the constructor of {}",
        parameter,
        "type_being_built.name()"
    )]
    ResolvingConstructorParameter {
        type_being_built: ServiceInfo,
        parameter: &'static str,
        dependency: ServiceInfo,
    },

    #[display(fmt = "invoking the constructor of {}", "type_being_built.name()")]
    InvokingConstructor { type_being_built: ServiceInfo },

    #[display(
        fmt = "resolving property {:?} of {}",
        property,
        "type_being_built.name()"
    )]
    ResolvingProperty {
        type_being_built: ServiceInfo,
        property: &'static str,
        dependency: ServiceInfo,
    },

    #[display(
        fmt = "resolving parameter {:?} of method {:?} of {}",
        parameter,
        method,
        "type_being_built.name()"
    )]
    ResolvingMethodParameter {
        type_being_built: ServiceInfo,
        method: &'static str,
        parameter: &'static str,
        dependency: ServiceInfo,
    },

    #[display(fmt = "invoking method {:?} of {}", method, "type_being_built.name()")]
    InvokingMethod {
        type_being_built: ServiceInfo,
        method: &'static str,
    },
}

impl Operation {
    #[must_use]
    pub fn type_being_built(&self) -> ServiceInfo {
        match self {
            Operation::ResolvingConstructorParameter {
                type_being_built, ..
            }
            | Operation::InvokingConstructor { type_being_built }
            | Operation::ResolvingProperty {
                type_being_built, ..
            }
            | Operation::ResolvingMethodParameter {
                type_being_built, ..
            }
            | Operation::InvokingMethod {
                type_being_built, ..
            } => *type_being_built,
        }
    }

    /// The constructor or method parameter being resolved, if any.
    #[must_use]
    pub fn parameter_name(&self) -> Option<&'static str> {
        match self {
            Operation::ResolvingConstructorParameter { parameter, .. }
            | Operation::ResolvingMethodParameter { parameter, .. } => {
                Some(*parameter)
            }
            _ => None,
        }
    }

    /// The property being resolved, if any.
    #[must_use]
    pub fn property_name(&self) -> Option<&'static str> {
        match self {
            Operation::ResolvingProperty { property, .. } => Some(*property),
            _ => None,
        }
    }
}

/// A rollback action run when a build fails.
pub trait RequiresRecovery {
    fn recover(self: Box<Self>, context: &mut BuilderContext);
}

impl<F: FnOnce(&mut BuilderContext)> RequiresRecovery for F {
    fn recover(self: Box<Self>, context: &mut BuilderContext) {
        (*self)(context);
    }
}

/// The state of a single build. Each dependency is built in its own child
/// context, which shares the policies, lifetime container and overrides of
/// the context that requested it.
pub struct BuilderContext {
    chain: Arc<StrategyChain>,
    lifetime: Arc<LifetimeContainer>,
    persistent_policies: Arc<PolicyList>,
    policies: Arc<PolicyList>,
    overrides: Arc<CompositeResolverOverride>,
    original_build_key: BuildKey,
    build_key: BuildKey,
    existing: Option<Existing>,
    build_complete: bool,
    recovery_stack: Vec<Box<dyn RequiresRecovery>>,
    current_operation: Option<Operation>,
    child_context: Option<Box<BuilderContext>>,
    build_path: Vec<BuildKey>,
    pub(crate) pending_cast: Option<Cast>,
    pub(crate) pending_lifetime: Option<Arc<dyn LifetimeManager>>,
    pub(crate) lifetime_slot: Option<SlotGuard>,
}

impl BuilderContext {
    /// Creates the context for a top-level build. `policies` holds policies
    /// scoped to this build and should have `persistent_policies` as its
    /// parent.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        chain: Arc<StrategyChain>,
        lifetime: Arc<LifetimeContainer>,
        persistent_policies: Arc<PolicyList>,
        policies: Arc<PolicyList>,
        overrides: Arc<CompositeResolverOverride>,
        build_key: BuildKey,
        existing: Option<Existing>,
    ) -> Self {
        BuilderContext {
            chain,
            lifetime,
            persistent_policies,
            policies,
            overrides,
            original_build_key: build_key.clone(),
            build_key,
            existing,
            build_complete: false,
            recovery_stack: Vec::new(),
            current_operation: None,
            child_context: None,
            build_path: Vec::new(),
            pending_cast: None,
            pending_lifetime: None,
            lifetime_slot: None,
        }
    }

    /// Continues the build path of a build this one is nested in.
    #[must_use]
    pub(crate) fn with_build_path(mut self, build_path: Vec<BuildKey>) -> Self {
        self.build_path = build_path;
        self
    }

    /// The strategies this build runs.
    #[must_use]
    pub fn strategies(&self) -> Arc<StrategyChain> {
        Arc::clone(&self.chain)
    }

    #[must_use]
    pub fn lifetime(&self) -> &Arc<LifetimeContainer> {
        &self.lifetime
    }

    /// Policies of the container the build started in.
    #[must_use]
    pub fn persistent_policies(&self) -> &Arc<PolicyList> {
        &self.persistent_policies
    }

    /// Policies scoped to this build, backed by the persistent policies.
    #[must_use]
    pub fn policies(&self) -> &Arc<PolicyList> {
        &self.policies
    }

    #[must_use]
    pub fn overrides(&self) -> &Arc<CompositeResolverOverride> {
        &self.overrides
    }

    /// The key that was requested, before any mapping.
    #[must_use]
    pub fn original_build_key(&self) -> &BuildKey {
        &self.original_build_key
    }

    /// The key currently being built.
    #[must_use]
    pub fn build_key(&self) -> &BuildKey {
        &self.build_key
    }

    pub fn set_build_key(&mut self, build_key: BuildKey) {
        self.build_key = build_key;
    }

    #[must_use]
    pub fn existing(&self) -> Option<&Existing> {
        self.existing.as_ref()
    }

    /// The finished value, if there is one.
    #[must_use]
    pub fn built(&self) -> Option<&Instance> {
        match &self.existing {
            Some(Existing::Built(instance)) => Some(instance),
            _ => None,
        }
    }

    #[must_use]
    pub fn has_unbuilt(&self) -> bool {
        matches!(self.existing, Some(Existing::Unbuilt(_)))
    }

    pub fn set_existing(&mut self, existing: Existing) {
        self.existing = Some(existing);
    }

    pub fn take_existing(&mut self) -> Option<Existing> {
        self.existing.take()
    }

    #[must_use]
    pub fn build_complete(&self) -> bool {
        self.build_complete
    }

    /// Marks the build as complete, which stops any further pre-build steps
    /// from running.
    pub fn set_build_complete(&mut self, build_complete: bool) {
        self.build_complete = build_complete;
    }

    /// Registers an action to run if this build fails. Actions run most
    /// recently added first.
    pub fn add_recovery<R: RequiresRecovery + 'static>(&mut self, recovery: R) {
        self.recovery_stack.push(Box::new(recovery));
    }

    #[must_use]
    pub fn current_operation(&self) -> Option<&Operation> {
        self.current_operation.as_ref()
    }

    pub fn set_operation(&mut self, operation: Operation) {
        self.current_operation = Some(operation);
    }

    pub fn clear_operation(&mut self) {
        self.current_operation = None;
    }

    /// The context of the nested build that failed, if one did.
    #[must_use]
    pub fn child_context(&self) -> Option<&BuilderContext> {
        self.child_context.as_deref()
    }

    pub fn clear_child_context(&mut self) {
        self.child_context = None;
    }

    /// The operation of the innermost failed build.
    #[must_use]
    pub fn deepest_operation(&self) -> Option<&Operation> {
        self.child_context()
            .and_then(BuilderContext::deepest_operation)
            .or(self.current_operation.as_ref())
    }

    /// Keys of the builds this build is nested in, outermost first.
    #[must_use]
    pub fn build_path(&self) -> &[BuildKey] {
        &self.build_path
    }

    /// Builds a dependency in a child context.
    pub fn new_build_up(&mut self, build_key: BuildKey) -> InjectResult<Instance> {
        let mut build_path = self.build_path.clone();
        build_path.push(self.build_key.clone());

        let mut child = BuilderContext {
            build_path,
            ..BuilderContext::new(
                Arc::clone(&self.chain),
                Arc::clone(&self.lifetime),
                Arc::clone(&self.persistent_policies),
                Arc::clone(&self.policies),
                Arc::clone(&self.overrides),
                build_key,
                None,
            )
        };

        self.child_context = None;
        match child.execute() {
            Ok(instance) => Ok(instance),
            Err(error) => {
                self.child_context = Some(Box::new(child));
                Err(error)
            }
        }
    }

    /// Resolves a constructor, property or method parameter. Overrides are
    /// consulted before the parameter's own resolver.
    pub fn resolve_dependency(
        &mut self,
        parameter: &ParameterInfo,
    ) -> InjectResult<Option<DynSvc>> {
        let overrides = Arc::clone(&self.overrides);
        let resolver = overrides
            .get_resolver(self, parameter.dependency())
            .unwrap_or_else(|| parameter.resolver());
        resolver.resolve(self)
    }

    /// Runs the strategy chain, recovering on failure.
    pub(crate) fn execute(&mut self) -> InjectResult<Instance> {
        let chain = Arc::clone(&self.chain);
        if let Err(error) = chain.execute(self) {
            self.recover();
            return Err(error);
        }

        match self.existing.take() {
            Some(Existing::Built(instance)) => Ok(instance),
            _ => Err(InjectError::NotConstructible {
                service_info: *self.build_key.service_info(),
            }),
        }
    }

    fn recover(&mut self) {
        let stack = std::mem::take(&mut self.recovery_stack);
        for recovery in stack.into_iter().rev() {
            recovery.recover(self);
        }
    }
}

impl DependencyResolver {
    pub(crate) fn resolve(
        &self,
        context: &mut BuilderContext,
    ) -> InjectResult<Option<DynSvc>> {
        match self {
            DependencyResolver::Value(value) => Ok(Some(Arc::clone(value))),
            DependencyResolver::Resolved {
                service_info,
                name,
                optional,
            } => {
                let build_key = BuildKey::new(*service_info, name.clone());
                match context.new_build_up(build_key) {
                    Ok(instance) => Ok(Some(instance.into_value())),
                    Err(error) if *optional && error.is_missing_registration() => {
                        context.clear_child_context();
                        Ok(None)
                    }
                    Err(error) => Err(error),
                }
            }
        }
    }
}
