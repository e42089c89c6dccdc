use crate::{BuildKey, OpenGeneric, ServiceInfo};
use parking_lot::RwLock;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

/// The key a policy is stored under, from most to least specific.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum PolicyKey {
    /// A specific type and name.
    Build(BuildKey),
    /// Every name of a type.
    Type(ServiceInfo),
    /// A specific name of every closed form of a generic definition.
    OpenBuild(OpenGeneric, Option<String>),
    /// Every closed form of a generic definition.
    OpenType(OpenGeneric),
    /// The fallback for every key.
    Default,
}

/// How specific the key was that a policy was found under.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Specificity {
    Exact,
    Type,
    OpenBuild,
    OpenType,
    Default,
}

/// A policy found by [`PolicyList::lookup`].
pub struct PolicyLookup<P: ?Sized> {
    /// The policy itself.
    pub policy: Arc<P>,
    /// How many parents were walked to find the policy. The list the lookup
    /// started at has a depth of zero.
    pub depth: usize,
    pub specificity: Specificity,
}

type PolicyMap = HashMap<(TypeId, PolicyKey), Box<dyn Any + Send + Sync>>;

/// A hierarchical store of policies, keyed by the policy interface and a
/// [`PolicyKey`].
///
/// Lookups try the specific build key, then the type, then the open generic
/// definition with the name, then the open generic definition, then the
/// default. Only after all of those miss locally does the lookup continue in
/// the parent, so a local policy of any specificity shadows the parent.
///
/// Policy interfaces are usually trait objects, such as
/// `dyn LifetimeManager`.
#[derive(Default)]
pub struct PolicyList {
    parent: Option<Arc<PolicyList>>,
    policies: RwLock<PolicyMap>,
}

impl PolicyList {
    #[must_use]
    pub fn new() -> Self {
        PolicyList::default()
    }

    /// Creates a policy list which delegates to `parent` on a local miss.
    /// Later changes to the parent are visible through the child.
    #[must_use]
    pub fn with_parent(parent: Arc<PolicyList>) -> Self {
        PolicyList {
            parent: Some(parent),
            policies: RwLock::default(),
        }
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Arc<PolicyList>> {
        self.parent.as_ref()
    }

    /// The list `depth` levels up the parent chain. A depth of zero is this
    /// list.
    #[must_use]
    pub fn ancestor(self: &Arc<Self>, depth: usize) -> Option<Arc<PolicyList>> {
        let mut current = Arc::clone(self);
        for _ in 0..depth {
            current = Arc::clone(current.parent.as_ref()?);
        }

        Some(current)
    }

    /// Sets a policy at this level, replacing any previous policy of the
    /// same interface under the same key.
    pub fn set<P>(&self, policy: Arc<P>, key: PolicyKey)
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.policies
            .write()
            .insert((TypeId::of::<P>(), key), Box::new(policy));
    }

    /// Sets a policy at this level unless one is already set under the same
    /// key. Returns the stored policy and whether `policy` was inserted.
    pub fn set_if_absent<P>(&self, policy: Arc<P>, key: PolicyKey) -> (Arc<P>, bool)
    where
        P: ?Sized + Send + Sync + 'static,
    {
        let mut policies = self.policies.write();
        let slot = (TypeId::of::<P>(), key);
        if let Some(existing) = policies.get(&slot).and_then(|policy| downcast::<P>(&**policy)) {
            return (existing, false);
        }

        policies.insert(slot, Box::new(Arc::clone(&policy)));
        (policy, true)
    }

    pub fn set_default<P>(&self, policy: Arc<P>)
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.set(policy, PolicyKey::Default);
    }

    pub fn clear_default<P>(&self)
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.clear::<P>(&PolicyKey::Default);
    }

    /// Removes a policy from this level. Parents are not affected.
    pub fn clear<P>(&self, key: &PolicyKey)
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.policies.write().remove(&(TypeId::of::<P>(), key.clone()));
    }

    /// Removes every policy from this level.
    pub fn clear_all(&self) {
        self.policies.write().clear();
    }

    /// Gets the policy for a build key, falling back to the default policy.
    #[must_use]
    pub fn get<P>(&self, build_key: &BuildKey) -> Option<Arc<P>>
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.lookup(build_key, true, false).map(|found| found.policy)
    }

    /// Gets the policy for a build key without considering default policies.
    /// If `local_only` is set, parents are not consulted either.
    #[must_use]
    pub fn get_no_default<P>(
        &self,
        build_key: &BuildKey,
        local_only: bool,
    ) -> Option<Arc<P>>
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.lookup(build_key, false, local_only)
            .map(|found| found.policy)
    }

    /// Gets the policy stored at this level under exactly `key`.
    #[must_use]
    pub fn get_local<P>(&self, key: &PolicyKey) -> Option<Arc<P>>
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.policies
            .read()
            .get(&(TypeId::of::<P>(), key.clone()))
            .and_then(|policy| downcast::<P>(&**policy))
    }

    /// Finds a policy for a build key, reporting where it was found.
    #[must_use]
    pub fn lookup<P>(
        &self,
        build_key: &BuildKey,
        include_default: bool,
        local_only: bool,
    ) -> Option<PolicyLookup<P>>
    where
        P: ?Sized + Send + Sync + 'static,
    {
        let candidates = candidate_keys(build_key, include_default);
        let mut depth = 0;
        let mut current = Some(self);
        while let Some(list) = current {
            let policies = list.policies.read();
            for (key, specificity) in &candidates {
                let policy = policies
                    .get(&(TypeId::of::<P>(), key.clone()))
                    .and_then(|policy| downcast::<P>(&**policy));
                if let Some(policy) = policy {
                    return Some(PolicyLookup {
                        policy,
                        depth,
                        specificity: *specificity,
                    });
                }
            }

            if local_only {
                break;
            }

            current = list.parent.as_deref();
            depth += 1;
        }

        None
    }
}

fn downcast<P: ?Sized + Send + Sync + 'static>(
    policy: &(dyn Any + Send + Sync),
) -> Option<Arc<P>> {
    policy.downcast_ref::<Arc<P>>().cloned()
}

fn candidate_keys(
    build_key: &BuildKey,
    include_default: bool,
) -> Vec<(PolicyKey, Specificity)> {
    let service_info = *build_key.service_info();
    let mut keys = vec![
        (PolicyKey::Build(build_key.clone()), Specificity::Exact),
        (PolicyKey::Type(service_info), Specificity::Type),
    ];

    if let Some(generic) = service_info.generic() {
        let definition = generic.definition();
        keys.push((
            PolicyKey::OpenBuild(
                definition,
                build_key.name().map(str::to_owned),
            ),
            Specificity::OpenBuild,
        ));
        keys.push((PolicyKey::OpenType(definition), Specificity::OpenType));
    }

    if include_default {
        keys.push((PolicyKey::Default, Specificity::Default));
    }

    keys
}
