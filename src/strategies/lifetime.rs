use crate::{
    BuilderContext, BuilderStrategy, Existing, InjectResult, LifetimeContainer,
    LifetimeKind, LifetimeManager, PerResolveLifetimeManager, PolicyKey,
    Specificity,
};
use std::sync::Arc;
use tracing::debug;

/// Reuses values held by the lifetime manager of a build key, and stores
/// newly built values in it.
///
/// Managers registered for many keys, such as those of an open generic
/// registration, act as prototypes: each closed key gets a fresh manager of
/// the same kind, owned by the container holding the registration.
/// Hierarchical managers are instead materialized in the container resolving
/// the key, so each child container gets its own.
#[derive(Clone, Copy, Default, Debug)]
pub struct LifetimeStrategy;

impl LifetimeStrategy {
    fn find_manager(context: &BuilderContext) -> Option<Arc<dyn LifetimeManager>> {
        let build_key = context.build_key();
        let local_key = PolicyKey::Build(build_key.clone());

        // Values of per-resolve registrations live in the resolve call
        if let Some(manager) = context.policies().get_local::<dyn LifetimeManager>(&local_key) {
            return Some(manager);
        }

        let found = context
            .persistent_policies()
            .lookup::<dyn LifetimeManager>(build_key, false, false)?;
        let kind = found.policy.kind();
        let prototype = found.specificity != Specificity::Exact;
        let inherited = found.depth > 0 && kind == LifetimeKind::Hierarchical;
        if !(prototype || inherited)
            || matches!(kind, LifetimeKind::Transient | LifetimeKind::PerResolve)
        {
            return Some(found.policy);
        }

        // Hierarchical managers belong to the resolving container, every
        // other kind to the container holding the registration
        let (owner, lifetime) = if kind == LifetimeKind::Hierarchical {
            (
                Arc::clone(context.persistent_policies()),
                Arc::clone(context.lifetime()),
            )
        } else {
            let owner = context.persistent_policies().ancestor(found.depth)?;
            let lifetime = owner
                .get_local::<LifetimeContainer>(&PolicyKey::Default)
                .unwrap_or_else(|| Arc::clone(context.lifetime()));
            (owner, lifetime)
        };

        let (manager, inserted) = owner.set_if_absent(found.policy.fresh(), local_key);
        if inserted {
            manager.mark_in_use();
            if let Some(dispose) = Arc::clone(&manager).as_dispose() {
                lifetime.add(dispose);
            }
            debug!(
                build_key = %build_key,
                kind = ?kind,
                depth = found.depth,
                "materialized lifetime manager"
            );
        }

        Some(manager)
    }
}

impl BuilderStrategy for LifetimeStrategy {
    fn pre_build_up(&self, context: &mut BuilderContext) -> InjectResult<()> {
        let manager = match LifetimeStrategy::find_manager(context) {
            Some(manager) => manager,
            None => return Ok(()),
        };

        if context.has_unbuilt() {
            context.pending_lifetime = Some(manager);
            return Ok(());
        }

        if let Some(value) = manager.get_value() {
            context.set_existing(Existing::Built(value));
            context.set_build_complete(true);
            return Ok(());
        }

        if let Some(slot) = manager.lock_slot() {
            // Another thread may have finished while this one waited
            if let Some(value) = manager.get_value() {
                drop(slot);
                context.set_existing(Existing::Built(value));
                context.set_build_complete(true);
                return Ok(());
            }

            context.lifetime_slot = Some(slot);
            context.add_recovery(|context: &mut BuilderContext| {
                context.lifetime_slot = None;
            });
        }

        context.pending_lifetime = Some(manager);
        Ok(())
    }

    fn post_build_up(&self, context: &mut BuilderContext) -> InjectResult<()> {
        if let Some(manager) = context.pending_lifetime.take() {
            if let Some(value) = context.built().cloned() {
                if manager.kind() == LifetimeKind::PerResolve {
                    context.policies().set::<dyn LifetimeManager>(
                        Arc::new(PerResolveLifetimeManager::holding(value)),
                        PolicyKey::Build(context.build_key().clone()),
                    );
                } else {
                    manager.set_value(value);
                }
            }
        }

        context.lifetime_slot = None;
        Ok(())
    }
}
