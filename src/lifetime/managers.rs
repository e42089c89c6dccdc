use crate::{
    any::WeakInstance, Dispose, Instance, LifetimeKind, LifetimeManager,
    SlotGuard,
};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::ThreadId,
};

#[derive(Default)]
struct InUse(AtomicBool);

impl InUse {
    fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn mark(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }
}

/// Never holds a value, so a new value is built for every request.
#[derive(Default)]
pub struct TransientLifetimeManager {
    in_use: InUse,
}

impl TransientLifetimeManager {
    #[must_use]
    pub fn new() -> Self {
        TransientLifetimeManager::default()
    }
}

impl LifetimeManager for TransientLifetimeManager {
    fn get_value(&self) -> Option<Instance> {
        None
    }

    fn set_value(&self, _value: Instance) {}

    fn remove_value(&self) {}

    fn in_use(&self) -> bool {
        self.in_use.get()
    }

    fn mark_in_use(&self) -> bool {
        self.in_use.mark()
    }

    fn fresh(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(TransientLifetimeManager::new())
    }

    fn kind(&self) -> LifetimeKind {
        LifetimeKind::Transient
    }
}

/// Shared state of the singleton-like managers. The slot lock serializes
/// the first build of the value, so concurrent requests for the same key
/// produce exactly one stored value.
#[derive(Default)]
struct SynchronizedSlot {
    value: Mutex<Option<Instance>>,
    slot: Arc<Mutex<()>>,
    in_use: InUse,
}

impl SynchronizedSlot {
    fn dispose(&self) {
        // Taken out first so disposal never runs under the lock
        let value = self.value.lock().take();
        if let Some(value) = value {
            value.dispose();
        }
    }
}

macro_rules! synchronized_manager {
    ($(#[$attr:meta])* $name:ident => $kind:ident) => {
        $(#[$attr])*
        #[derive(Default)]
        pub struct $name {
            inner: SynchronizedSlot,
        }

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                $name::default()
            }
        }

        impl LifetimeManager for $name {
            fn get_value(&self) -> Option<Instance> {
                self.inner.value.lock().clone()
            }

            fn set_value(&self, value: Instance) {
                *self.inner.value.lock() = Some(value);
            }

            fn remove_value(&self) {
                self.inner.value.lock().take();
            }

            fn in_use(&self) -> bool {
                self.inner.in_use.get()
            }

            fn mark_in_use(&self) -> bool {
                self.inner.in_use.mark()
            }

            fn fresh(&self) -> Arc<dyn LifetimeManager> {
                Arc::new($name::new())
            }

            fn kind(&self) -> LifetimeKind {
                LifetimeKind::$kind
            }

            fn lock_slot(&self) -> Option<SlotGuard> {
                Some(self.inner.slot.lock_arc())
            }

            fn as_dispose(self: Arc<Self>) -> Option<Arc<dyn Dispose>> {
                Some(self)
            }
        }

        impl Dispose for $name {
            fn dispose(&self) {
                self.inner.dispose();
            }
        }
    };
}

synchronized_manager!(
    /// Holds a single value for the container it is registered in. The value
    /// is disposed with that container.
    ContainerControlledLifetimeManager => ContainerControlled
);

synchronized_manager!(
    /// Like [`ContainerControlledLifetimeManager`], except each child
    /// container resolving the registration gets its own value, which is
    /// disposed with that child container.
    HierarchicalLifetimeManager => Hierarchical
);

/// Holds one value per thread. Values are disposed with the container.
#[derive(Default)]
pub struct PerThreadLifetimeManager {
    values: Mutex<HashMap<ThreadId, Instance>>,
    in_use: InUse,
}

impl PerThreadLifetimeManager {
    #[must_use]
    pub fn new() -> Self {
        PerThreadLifetimeManager::default()
    }
}

impl LifetimeManager for PerThreadLifetimeManager {
    fn get_value(&self) -> Option<Instance> {
        self.values.lock().get(&std::thread::current().id()).cloned()
    }

    fn set_value(&self, value: Instance) {
        self.values.lock().insert(std::thread::current().id(), value);
    }

    fn remove_value(&self) {
        self.values.lock().remove(&std::thread::current().id());
    }

    fn in_use(&self) -> bool {
        self.in_use.get()
    }

    fn mark_in_use(&self) -> bool {
        self.in_use.mark()
    }

    fn fresh(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(PerThreadLifetimeManager::new())
    }

    fn kind(&self) -> LifetimeKind {
        LifetimeKind::PerThread
    }

    fn as_dispose(self: Arc<Self>) -> Option<Arc<dyn Dispose>> {
        Some(self)
    }
}

impl Dispose for PerThreadLifetimeManager {
    fn dispose(&self) {
        let values = std::mem::take(&mut *self.values.lock());
        for value in values.into_values() {
            value.dispose();
        }
    }
}

/// Reuses a value only within a single resolve call, so a dependency shared
/// by several parts of one object graph is built once for that graph.
///
/// The registered manager itself never holds a value. Values are stored in
/// the policies of the resolve call that built them.
#[derive(Default)]
pub struct PerResolveLifetimeManager {
    value: Mutex<Option<Instance>>,
    in_use: InUse,
}

impl PerResolveLifetimeManager {
    #[must_use]
    pub fn new() -> Self {
        PerResolveLifetimeManager::default()
    }

    pub(crate) fn holding(value: Instance) -> Self {
        PerResolveLifetimeManager {
            value: Mutex::new(Some(value)),
            in_use: InUse::default(),
        }
    }
}

impl LifetimeManager for PerResolveLifetimeManager {
    fn get_value(&self) -> Option<Instance> {
        self.value.lock().clone()
    }

    fn set_value(&self, value: Instance) {
        *self.value.lock() = Some(value);
    }

    fn remove_value(&self) {
        self.value.lock().take();
    }

    fn in_use(&self) -> bool {
        self.in_use.get()
    }

    fn mark_in_use(&self) -> bool {
        self.in_use.mark()
    }

    fn fresh(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(PerResolveLifetimeManager::new())
    }

    fn kind(&self) -> LifetimeKind {
        LifetimeKind::PerResolve
    }
}

/// Holds a weak reference to its value. The value lives only as long as
/// something outside the container holds it, and is never disposed by the
/// container.
///
/// Trait object values are stored behind an extra pointer owned by the
/// container, so their weak reference does not outlive the resolve call.
/// Register the implementation type with this lifetime instead.
#[derive(Default)]
pub struct ExternallyControlledLifetimeManager {
    value: Mutex<Option<WeakInstance>>,
    in_use: InUse,
}

impl ExternallyControlledLifetimeManager {
    #[must_use]
    pub fn new() -> Self {
        ExternallyControlledLifetimeManager::default()
    }
}

impl LifetimeManager for ExternallyControlledLifetimeManager {
    fn get_value(&self) -> Option<Instance> {
        self.value.lock().as_ref().and_then(WeakInstance::upgrade)
    }

    fn set_value(&self, value: Instance) {
        *self.value.lock() = Some(value.downgrade());
    }

    fn remove_value(&self) {
        self.value.lock().take();
    }

    fn in_use(&self) -> bool {
        self.in_use.get()
    }

    fn mark_in_use(&self) -> bool {
        self.in_use.mark()
    }

    fn fresh(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(ExternallyControlledLifetimeManager::new())
    }

    fn kind(&self) -> LifetimeKind {
        LifetimeKind::ExternallyControlled
    }
}
