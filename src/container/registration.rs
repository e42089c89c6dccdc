use crate::{
    BuildKey, BuildKeyMapping, BuildKeyMappingPolicy, BuildPlanPolicy,
    ContainerControlledLifetimeManager, GenericTypeMapping, InjectError,
    InjectResult, Injectable, InjectionFactory, InjectionMember,
    InjectionPolicies, Instance, InterfaceFor, LifetimeKind, LifetimeManager,
    PolicyKey, PolicyList, Resolvable, ServiceInfo, Svc, TypeKey, UnityContainer,
};
use std::{any::TypeId, collections::HashMap, fmt::Debug, sync::Arc};
use tracing::{debug, trace};

/// Options for a registration.
#[derive(Default)]
pub struct RegisterOptions {
    name: Option<String>,
    lifetime: Option<Arc<dyn LifetimeManager>>,
    members: Vec<Box<dyn InjectionMember>>,
}

impl RegisterOptions {
    #[must_use]
    pub fn new() -> Self {
        RegisterOptions::default()
    }

    /// Registers under a name instead of as the default registration. An
    /// empty name is the default registration.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into()).filter(|name| !name.is_empty());
        self
    }

    /// Controls how long built values live. Without a lifetime, a new value
    /// is built for every request.
    #[must_use]
    pub fn lifetime<L: LifetimeManager + 'static>(self, lifetime: L) -> Self {
        self.with_lifetime(Arc::new(lifetime))
    }

    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Arc<dyn LifetimeManager>) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Adds an injection member, which configures how the registered type
    /// is built.
    #[must_use]
    pub fn member<M: InjectionMember + 'static>(mut self, member: M) -> Self {
        self.members.push(Box::new(member));
        self
    }
}

/// A registration made in a container.
#[derive(Clone)]
pub struct ContainerRegistration {
    registered_type: TypeKey,
    mapped_to: TypeKey,
    name: Option<String>,
    lifetime: Option<Arc<dyn LifetimeManager>>,
}

impl ContainerRegistration {
    /// The type requests are made for.
    #[must_use]
    pub fn registered_type(&self) -> TypeKey {
        self.registered_type
    }

    /// The type that is built for requests.
    #[must_use]
    pub fn mapped_to(&self) -> TypeKey {
        self.mapped_to
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn lifetime(&self) -> Option<&Arc<dyn LifetimeManager>> {
        self.lifetime.as_ref()
    }

    /// The kind of lifetime, which is transient when none was given.
    #[must_use]
    pub fn lifetime_kind(&self) -> LifetimeKind {
        self.lifetime
            .as_ref()
            .map_or(LifetimeKind::Transient, |lifetime| lifetime.kind())
    }

    fn same_key(&self, other: &ContainerRegistration) -> bool {
        self.registered_type == other.registered_type && self.name == other.name
    }
}

impl Debug for ContainerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerRegistration")
            .field("registered_type", &self.registered_type)
            .field("mapped_to", &self.mapped_to)
            .field("name", &self.name)
            .field("lifetime", &self.lifetime_kind())
            .finish()
    }
}

fn set_or_clear<P>(list: &PolicyList, policy: Option<Arc<P>>, key: &PolicyKey)
where
    P: ?Sized + Send + Sync + 'static,
{
    match policy {
        Some(policy) => list.set(policy, key.clone()),
        None => list.clear::<P>(key),
    }
}

/// Which registration set each policy stored under a target key. Several
/// registrations can map to the same target.
pub(crate) type TargetOwners = HashMap<(TypeId, PolicyKey), PolicyKey>;

/// Sets a policy under the target key of the registration `from`, or removes
/// the one `from` set before. Policies `from` set under other targets are
/// removed, and policies set by other registrations are left alone.
fn set_target_policy<P>(
    list: &PolicyList,
    owners: &mut TargetOwners,
    policy: Option<Arc<P>>,
    from: &PolicyKey,
    to: &PolicyKey,
) where
    P: ?Sized + Send + Sync + 'static,
{
    let id = TypeId::of::<P>();
    let stale: Vec<PolicyKey> = owners
        .iter()
        .filter(|((policy_id, key), owner)| *policy_id == id && key != to && *owner == from)
        .map(|((_, key), _)| key.clone())
        .collect();
    for key in stale {
        list.clear::<P>(&key);
        owners.remove(&(id, key));
    }

    let slot = (id, to.clone());
    match policy {
        Some(policy) => {
            list.set(policy, to.clone());
            owners.insert(slot, from.clone());
        }
        None if owners.get(&slot) == Some(from) => {
            list.clear::<P>(to);
            owners.remove(&slot);
        }
        None => {}
    }
}

impl UnityContainer {
    /// Registers `T` as what is built for requests of `F`. `F` is usually a
    /// `dyn Trait` implemented by `T`, or `T` itself.
    pub fn register_type<F, T>(&self, options: RegisterOptions) -> InjectResult<&Self>
    where
        F: ?Sized + InterfaceFor<T>,
        T: Injectable,
    {
        let from = BuildKey::of::<F>(options.name.as_deref());
        let to = BuildKey::of::<T>(options.name.as_deref());
        let mapping = (from.service_info() != to.service_info()).then(|| {
            Arc::new(BuildKeyMapping::new(to.clone(), crate::cast_to::<F, T>))
                as Arc<dyn BuildKeyMappingPolicy>
        });

        self.register(
            *from.service_info(),
            ContainerRegistration {
                registered_type: TypeKey::Closed(*from.service_info()),
                mapped_to: TypeKey::Closed(*to.service_info()),
                name: options.name.clone(),
                lifetime: options.lifetime.clone(),
            },
            PolicyKey::Build(from),
            PolicyKey::Build(to),
            mapping,
            options,
        )?;
        Ok(self)
    }

    /// Registers `T` under a name.
    pub fn register_named<F, T>(&self, name: &str) -> InjectResult<&Self>
    where
        F: ?Sized + InterfaceFor<T>,
        T: Injectable,
    {
        self.register_type::<F, T>(RegisterOptions::new().named(name))
    }

    /// Registers `T` with a single value for this container.
    pub fn register_singleton<F, T>(&self) -> InjectResult<&Self>
    where
        F: ?Sized + InterfaceFor<T>,
        T: Injectable,
    {
        self.register_type::<F, T>(
            RegisterOptions::new().lifetime(ContainerControlledLifetimeManager::new()),
        )
    }

    /// Registers an open generic mapping. Both types are witnesses: any
    /// closed form of each identifies its generic definition, and every
    /// closed form of `F` is mapped to the matching closed form of `T`.
    ///
    /// The lifetime given is a prototype. Each closed form gets its own
    /// lifetime manager of the same kind.
    pub fn register_generic_type<F, T>(&self, options: RegisterOptions) -> InjectResult<&Self>
    where
        F: ?Sized + Resolvable,
        T: Injectable,
    {
        let from = definition_of(F::service_info())?;
        let to = definition_of(ServiceInfo::of_injectable::<T>())?;
        let mapping = (from != to).then(|| {
            Arc::new(GenericTypeMapping::new(to)) as Arc<dyn BuildKeyMappingPolicy>
        });

        self.register(
            F::service_info(),
            ContainerRegistration {
                registered_type: TypeKey::OpenGeneric(from),
                mapped_to: TypeKey::OpenGeneric(to),
                name: options.name.clone(),
                lifetime: options.lifetime.clone(),
            },
            PolicyKey::OpenBuild(from, options.name.clone()),
            PolicyKey::OpenBuild(to, options.name.clone()),
            mapping,
            options,
        )?;
        Ok(self)
    }

    /// Registers a factory which builds `T`. The factory receives the
    /// container performing the request and the key being built.
    pub fn register_factory<T, F>(
        &self,
        name: Option<&str>,
        factory: F,
        options: RegisterOptions,
    ) -> InjectResult<&Self>
    where
        T: ?Sized + Resolvable,
        F: Fn(&UnityContainer, &BuildKey) -> InjectResult<Svc<T>> + Send + Sync + 'static,
    {
        let options = match name {
            Some(name) => options.named(name),
            None => options,
        };
        let options = options.member(InjectionFactory::new::<T, F>(factory));
        let key = BuildKey::of::<T>(options.name.as_deref());

        self.register(
            *key.service_info(),
            ContainerRegistration {
                registered_type: TypeKey::Closed(*key.service_info()),
                mapped_to: TypeKey::Closed(*key.service_info()),
                name: options.name.clone(),
                lifetime: options.lifetime.clone(),
            },
            PolicyKey::Build(key.clone()),
            PolicyKey::Build(key),
            None,
            options,
        )?;
        Ok(self)
    }

    /// Registers an existing value. Without a lifetime, the value is held
    /// and disposed by this container.
    pub fn register_instance<T: ?Sized + Resolvable>(
        &self,
        name: Option<&str>,
        instance: Svc<T>,
        lifetime: Option<Arc<dyn LifetimeManager>>,
    ) -> InjectResult<&Self> {
        self.check_disposed()?;

        let build_key = BuildKey::of::<T>(name);
        let service_info = *build_key.service_info();
        let lifetime = lifetime
            .unwrap_or_else(|| Arc::new(ContainerControlledLifetimeManager::new()));
        if !lifetime.mark_in_use() {
            return Err(InjectError::LifetimeManagerInUse { service_info });
        }
        lifetime.set_value(Instance::new(T::into_dyn(instance), T::hooks()));

        let key = PolicyKey::Build(build_key.clone());
        let policies = &self.inner.policies;
        let mut owners = self.inner.target_owners.lock();
        policies.clear::<dyn BuildKeyMappingPolicy>(&key);
        set_target_policy::<dyn BuildPlanPolicy>(policies, &mut owners, None, &key, &key);
        policies.clear::<dyn BuildPlanPolicy>(&key);
        set_target_policy(policies, &mut owners, Some(Arc::clone(&lifetime)), &key, &key);
        drop(owners);
        if let Some(dispose) = Arc::clone(&lifetime).as_dispose() {
            self.inner.lifetime.add(dispose);
        }

        self.record(ContainerRegistration {
            registered_type: TypeKey::Closed(service_info),
            mapped_to: TypeKey::Closed(service_info),
            name: build_key.name().map(str::to_owned),
            lifetime: Some(lifetime),
        });
        debug!(build_key = %build_key, "registered instance");
        Ok(self)
    }

    fn register(
        &self,
        service_info: ServiceInfo,
        registration: ContainerRegistration,
        from: PolicyKey,
        to: PolicyKey,
        mapping: Option<Arc<dyn BuildKeyMappingPolicy>>,
        options: RegisterOptions,
    ) -> InjectResult<()> {
        self.check_disposed()?;

        let mut injection = InjectionPolicies::new();
        for member in &options.members {
            member.add_policies(&mut injection)?;
        }

        if let Some(lifetime) = &options.lifetime {
            if !lifetime.mark_in_use() {
                return Err(InjectError::LifetimeManagerInUse { service_info });
            }
        }

        let policies = &self.inner.policies;
        let mut owners = self.inner.target_owners.lock();
        set_or_clear(policies, mapping, &from);
        set_target_policy(policies, &mut owners, injection.plan(), &from, &to);
        set_target_policy(policies, &mut owners, injection.constructor_selector(), &from, &to);
        set_target_policy(policies, &mut owners, injection.property_selector(), &from, &to);
        set_target_policy(policies, &mut owners, injection.method_selector(), &from, &to);
        set_target_policy(policies, &mut owners, options.lifetime.clone(), &from, &to);

        // Plans cached from earlier selectors are rebuilt on the next resolve
        if !owners.contains_key(&(TypeId::of::<dyn BuildPlanPolicy>(), to.clone())) {
            policies.clear::<dyn BuildPlanPolicy>(&to);
        }
        drop(owners);

        if let Some(dispose) = options.lifetime.and_then(|lifetime| lifetime.as_dispose()) {
            self.inner.lifetime.add(dispose);
        }

        debug!(
            registered_type = %registration.registered_type,
            mapped_to = %registration.mapped_to,
            name = ?registration.name,
            lifetime = ?registration.lifetime_kind(),
            "registered type"
        );
        self.record(registration);
        Ok(())
    }

    fn record(&self, registration: ContainerRegistration) {
        let mut registrations = self.inner.registrations.write();
        match registrations
            .iter_mut()
            .find(|existing| existing.same_key(&registration))
        {
            Some(existing) => *existing = registration,
            None => registrations.push(registration),
        }
    }

    /// Checks whether a type is registered in this container or one of its
    /// parents. Open generic registrations count for each of their closed
    /// forms. Nothing is registered in a disposed container.
    #[must_use]
    pub fn is_registered<T: ?Sized + Resolvable>(&self, name: Option<&str>) -> bool {
        let service_info = T::service_info();
        let name = name.filter(|name| !name.is_empty());
        self.registrations().iter().any(|registration| {
            registration.registered_type().matches(&service_info) && registration.name() == name
        })
    }

    /// The registrations visible from this container, parents' first. A
    /// registration in this container replaces the same registration of a
    /// parent. A disposed container has no registrations.
    #[must_use]
    pub fn registrations(&self) -> Vec<ContainerRegistration> {
        if self.is_disposed() {
            trace!("registrations requested from a disposed container");
            return Vec::new();
        }

        let mut registrations = self
            .parent()
            .map(UnityContainer::registrations)
            .unwrap_or_default();
        for registration in self.inner.registrations.read().iter() {
            match registrations
                .iter_mut()
                .find(|existing| existing.same_key(registration))
            {
                Some(existing) => *existing = registration.clone(),
                None => registrations.push(registration.clone()),
            }
        }

        registrations
    }
}

fn definition_of(service_info: ServiceInfo) -> InjectResult<crate::OpenGeneric> {
    service_info
        .generic()
        .map(|generic| generic.definition())
        .ok_or(InjectError::NotGeneric { service_info })
}
