use crate::{
    BuildKey, BuildKeyMappingStrategy, BuildPlanCreatorPolicy, BuildPlanPolicy,
    BuildPlanStrategy, BuilderAwareStrategy, BuilderContext,
    CompositeResolverOverride, ConstructorSelectorPolicy, ContainerRegistration,
    CycleDetectionStrategy, DefaultConstructorSelector, DefaultMethodSelector,
    DefaultPropertySelector, Dispose, DynSvc, DynamicBuildPlanCreator, Existing,
    InjectError, InjectResult, Injectable, Instance, LifetimeContainer,
    LifetimeStrategy, MethodSelectorPolicy, PolicyKey, PolicyList,
    PropertySelectorPolicy, Resolvable, ServiceInfo, StagedStrategyChain, Svc,
    UnbuiltValue, UnityBuildStage, UnityContainerExtension,
};
use super::registration::TargetOwners;
use parking_lot::{Mutex, RwLock};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Weak,
};
use tracing::{debug, debug_span};

/// A dependency injection container. Types are registered with a mapping
/// and a lifetime, then resolved along with all of their dependencies.
///
/// Containers form a hierarchy. A child container sees every registration
/// of its parents and can shadow them with its own, without affecting the
/// parents. Handles are cheap to clone and can be shared between threads.
///
/// ## Example
///
/// ```
/// use unity_container::{
///     interface, Constructor, ContainerControlledLifetimeManager, Injectable,
///     Members, RegisterOptions, Service, Svc, UnityContainer,
/// };
///
/// trait Clock: Service {
///     fn now(&self) -> u64;
/// }
/// interface!(Clock);
///
/// #[derive(Default)]
/// struct FixedClock;
///
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 {
///         42
///     }
/// }
///
/// impl Injectable for FixedClock {
///     fn members() -> Members<Self> {
///         Members::new().constructor(Constructor::from_default())
///     }
/// }
///
/// let container = UnityContainer::new();
/// container
///     .register_type::<dyn Clock, FixedClock>(
///         RegisterOptions::new().lifetime(ContainerControlledLifetimeManager::new()),
///     )
///     .unwrap();
///
/// let first: Svc<dyn Clock> = container.resolve().unwrap();
/// let second: Svc<dyn Clock> = container.resolve().unwrap();
/// assert_eq!(42, first.now());
/// assert!(Svc::ptr_eq(&first, &second));
/// ```
#[derive(Clone)]
pub struct UnityContainer {
    pub(crate) inner: Svc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    pub(crate) parent: Option<UnityContainer>,
    pub(crate) policies: Arc<PolicyList>,
    pub(crate) strategies: Arc<StagedStrategyChain>,
    pub(crate) lifetime: Arc<LifetimeContainer>,
    pub(crate) registrations: RwLock<Vec<ContainerRegistration>>,
    pub(crate) extensions: Mutex<Vec<Box<dyn UnityContainerExtension>>>,
    pub(crate) target_owners: Mutex<TargetOwners>,
    disposed: AtomicBool,
    parent_entry: Mutex<Option<Arc<dyn Dispose>>>,
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        // Dropped children no longer need to be disposed by their parent
        if let (Some(parent), Some(entry)) = (&self.parent, self.parent_entry.get_mut().take()) {
            parent.inner.lifetime.remove(&entry);
        }
    }
}

impl UnityContainer {
    /// Creates a root container with the default build pipeline.
    #[must_use]
    pub fn new() -> Self {
        let strategies = StagedStrategyChain::new();
        strategies.add_new::<BuildKeyMappingStrategy>(UnityBuildStage::TypeMapping);
        strategies.add_new::<CycleDetectionStrategy>(UnityBuildStage::Lifetime);
        strategies.add_new::<LifetimeStrategy>(UnityBuildStage::Lifetime);
        strategies.add_new::<BuildPlanStrategy>(UnityBuildStage::Creation);
        strategies.add_new::<BuilderAwareStrategy>(UnityBuildStage::PostInitialization);

        let policies = PolicyList::new();
        policies.set_default::<dyn ConstructorSelectorPolicy>(Arc::new(DefaultConstructorSelector));
        policies.set_default::<dyn PropertySelectorPolicy>(Arc::new(DefaultPropertySelector));
        policies.set_default::<dyn MethodSelectorPolicy>(Arc::new(DefaultMethodSelector));
        policies.set_default::<dyn BuildPlanCreatorPolicy>(Arc::new(DynamicBuildPlanCreator));

        UnityContainer::from_parts(None, Arc::new(policies), Arc::new(strategies))
    }

    fn from_parts(
        parent: Option<UnityContainer>,
        policies: Arc<PolicyList>,
        strategies: Arc<StagedStrategyChain>,
    ) -> Self {
        let inner = Svc::new(ContainerInner {
            parent,
            policies,
            strategies,
            lifetime: Arc::new(LifetimeContainer::new()),
            registrations: RwLock::default(),
            extensions: Mutex::default(),
            target_owners: Mutex::default(),
            disposed: AtomicBool::new(false),
            parent_entry: Mutex::default(),
        });

        // Lifetime managers materialized for this container's registrations
        // are owned by its lifetime container
        inner
            .policies
            .set_default::<LifetimeContainer>(Arc::clone(&inner.lifetime));

        // Requests for the container itself resolve to this container
        inner.policies.set::<dyn BuildPlanPolicy>(
            Arc::new(ContainerSelfPlan(Svc::downgrade(&inner))),
            PolicyKey::Type(ServiceInfo::of::<UnityContainer>()),
        );

        UnityContainer { inner }
    }

    /// The container this container was created from.
    #[must_use]
    pub fn parent(&self) -> Option<&UnityContainer> {
        self.inner.parent.as_ref()
    }

    /// Creates a container which inherits the registrations and build
    /// pipeline of this one. The child is disposed along with this
    /// container.
    pub fn create_child_container(&self) -> InjectResult<UnityContainer> {
        self.check_disposed()?;

        let child = UnityContainer::from_parts(
            Some(self.clone()),
            Arc::new(PolicyList::with_parent(Arc::clone(&self.inner.policies))),
            Arc::new(StagedStrategyChain::with_parent(Arc::clone(&self.inner.strategies))),
        );

        let entry: Arc<dyn Dispose> = Arc::new(ChildHandle(Svc::downgrade(&child.inner)));
        self.inner.lifetime.add(Arc::clone(&entry));
        *child.inner.parent_entry.lock() = Some(entry);

        debug!("created child container");
        Ok(child)
    }

    /// Disposes every value owned by this container and its child
    /// containers, most recently added first, then detaches this container
    /// from its parent. Later calls do nothing.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.inner.lifetime.dispose();
        self.inner.policies.clear_all();
        self.inner.registrations.write().clear();
        self.inner.target_owners.lock().clear();
        self.inner.extensions.lock().clear();

        let entry = self.inner.parent_entry.lock().take();
        if let (Some(parent), Some(entry)) = (&self.inner.parent, entry) {
            parent.inner.lifetime.remove(&entry);
        }

        debug!("disposed container");
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn check_disposed(&self) -> InjectResult<()> {
        if self.is_disposed() {
            Err(InjectError::ContainerDisposed)
        } else {
            Ok(())
        }
    }

    /// Resolves the default registration of a type.
    pub fn resolve<T: ?Sized + Resolvable>(&self) -> InjectResult<Svc<T>> {
        self.resolve_with::<T>(None, CompositeResolverOverride::new())
    }

    /// Resolves a named registration of a type.
    pub fn resolve_named<T: ?Sized + Resolvable>(&self, name: &str) -> InjectResult<Svc<T>> {
        self.resolve_with::<T>(Some(name), CompositeResolverOverride::new())
    }

    /// Resolves a type, applying overrides throughout the object graph that
    /// is built for it.
    ///
    /// ```
    /// use unity_container::{
    ///     CompositeResolverOverride, Constructor, DependencyOverride, Injectable,
    ///     Members, Svc, UnityContainer,
    /// };
    ///
    /// struct Greeting(Svc<String>);
    ///
    /// impl Injectable for Greeting {
    ///     fn members() -> Members<Self> {
    ///         Members::new().constructor(
    ///             Constructor::new(|args| Ok(Greeting(args.next()?))).param::<String>("text"),
    ///         )
    ///     }
    /// }
    ///
    /// let container = UnityContainer::new();
    /// let overrides = CompositeResolverOverride::new()
    ///     .with(DependencyOverride::new(Svc::new(String::from("hello"))));
    /// let greeting: Svc<Greeting> = container.resolve_with(None, overrides).unwrap();
    /// assert_eq!("hello", greeting.0.as_str());
    /// ```
    pub fn resolve_with<T: ?Sized + Resolvable>(
        &self,
        name: Option<&str>,
        overrides: CompositeResolverOverride,
    ) -> InjectResult<Svc<T>> {
        let value = self.resolve_dyn(BuildKey::of::<T>(name), overrides)?;
        T::from_dyn(value).ok_or(InjectError::InvalidInstance {
            service_info: T::service_info(),
        })
    }

    /// Resolves a type, or returns `None` if nothing is registered that
    /// could build it. Failures building its dependencies are still errors.
    pub fn try_resolve<T: ?Sized + Resolvable>(&self) -> InjectResult<Option<Svc<T>>> {
        let service_info = T::service_info();
        match self.resolve::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(error) => match error.root_cause() {
                InjectError::NotConstructible { service_info: missing }
                | InjectError::NoConstructor { service_info: missing }
                    if *missing == service_info =>
                {
                    Ok(None)
                }
                _ => Err(error),
            },
        }
    }

    /// Resolves a build key without knowing its type statically.
    pub fn resolve_dyn(
        &self,
        build_key: BuildKey,
        overrides: CompositeResolverOverride,
    ) -> InjectResult<DynSvc> {
        self.build(build_key, None, overrides).map(Instance::into_value)
    }

    /// Resolves every named registration of a type, in the order they were
    /// registered. The default registration is not included.
    pub fn resolve_all<T: ?Sized + Resolvable>(&self) -> InjectResult<Vec<Svc<T>>> {
        self.resolve_all_with::<T>(CompositeResolverOverride::new())
    }

    pub fn resolve_all_with<T: ?Sized + Resolvable>(
        &self,
        overrides: CompositeResolverOverride,
    ) -> InjectResult<Vec<Svc<T>>> {
        let service_info = T::service_info();
        let mut names: Vec<String> = Vec::new();
        for registration in self.registrations() {
            if let Some(name) = registration.name() {
                if registration.registered_type().matches(&service_info)
                    && !names.iter().any(|existing| existing == name)
                {
                    names.push(name.to_owned());
                }
            }
        }

        names
            .iter()
            .map(|name| self.resolve_with::<T>(Some(name), overrides.clone()))
            .collect()
    }

    /// Injects the properties and methods of an existing value without
    /// constructing a new one.
    pub fn build_up<T: Injectable>(
        &self,
        existing: T,
        name: Option<&str>,
        overrides: CompositeResolverOverride,
    ) -> InjectResult<Svc<T>> {
        let instance = self.build(
            BuildKey::of::<T>(name),
            Some(Existing::Unbuilt(UnbuiltValue::new(existing))),
            overrides,
        )?;
        T::from_dyn(instance.into_value()).ok_or(InjectError::InvalidInstance {
            service_info: T::service_info(),
        })
    }

    fn build(
        &self,
        build_key: BuildKey,
        existing: Option<Existing>,
        overrides: CompositeResolverOverride,
    ) -> InjectResult<Instance> {
        self.check_disposed()?;

        let span = debug_span!("resolve", build_key = %build_key);
        let _entered = span.enter();

        let mut context = BuilderContext::new(
            Arc::new(self.inner.strategies.make_strategy_chain()),
            Arc::clone(&self.inner.lifetime),
            Arc::clone(&self.inner.policies),
            Arc::new(PolicyList::with_parent(Arc::clone(&self.inner.policies))),
            Arc::new(overrides),
            build_key.clone(),
            existing,
        )
        .with_build_path(crate::injection::factory_build_path());

        context.execute().map_err(|source| {
            let operation = context.deepest_operation().map(ToString::to_string);
            debug!(error = %source, "resolution failed");
            InjectError::ResolutionFailed {
                service_info: *build_key.service_info(),
                name: build_key.name().map(str::to_owned),
                operation,
                source: Box::new(source),
            }
        })
    }
}

impl Default for UnityContainer {
    fn default() -> Self {
        UnityContainer::new()
    }
}

impl std::fmt::Debug for UnityContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnityContainer")
            .field("has_parent", &self.inner.parent.is_some())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

impl Injectable for UnityContainer {}

/// Builds the container that owns it.
struct ContainerSelfPlan(Weak<ContainerInner>);

impl BuildPlanPolicy for ContainerSelfPlan {
    fn build_up(&self, context: &mut BuilderContext) -> InjectResult<()> {
        let inner = self.0.upgrade().ok_or(InjectError::ContainerDisposed)?;
        let container: DynSvc = Svc::new(UnityContainer { inner });
        context.set_existing(Existing::Built(Instance::new(container, None)));
        Ok(())
    }
}

/// Entry for a child container in its parent's lifetime container.
struct ChildHandle(Weak<ContainerInner>);

impl Dispose for ChildHandle {
    fn dispose(&self) {
        if let Some(inner) = self.0.upgrade() {
            UnityContainer { inner }.dispose();
        }
    }
}
