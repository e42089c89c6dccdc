use crate::Instance;
use parking_lot::{ArcMutexGuard, RawMutex};
use std::sync::Arc;

/// Something that releases resources when its owning container is disposed.
pub trait Dispose: Send + Sync {
    fn dispose(&self);
}

/// A held lock on a lifetime manager's slot. While it is held, no other
/// thread can start building a value for that manager.
pub type SlotGuard = ArcMutexGuard<RawMutex, ()>;

/// The built-in kinds of lifetime managers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LifetimeKind {
    Transient,
    ContainerControlled,
    Hierarchical,
    PerThread,
    PerResolve,
    ExternallyControlled,
    Custom,
}

/// Controls how long a built value lives and when it is reused.
///
/// A lifetime manager holds at most one value (per thread, for
/// [`PerThreadLifetimeManager`](crate::PerThreadLifetimeManager)). When it
/// holds nothing, the container builds a new value and stores it through
/// [`LifetimeManager::set_value`].
///
/// Each manager can be bound to only one registration.
pub trait LifetimeManager: Send + Sync {
    /// Gets the held value, if any.
    fn get_value(&self) -> Option<Instance>;

    /// Replaces the held value.
    fn set_value(&self, value: Instance);

    /// Forgets the held value without disposing it.
    fn remove_value(&self);

    /// Whether this manager is bound to a registration.
    fn in_use(&self) -> bool;

    /// Binds this manager to a registration. Returns `false` if it was
    /// already bound.
    fn mark_in_use(&self) -> bool;

    /// Creates an unbound manager of the same kind. Used when a registration
    /// serves many build keys, such as an open generic registration, or when
    /// a hierarchical registration is resolved through a child container.
    fn fresh(&self) -> Arc<dyn LifetimeManager>;

    fn kind(&self) -> LifetimeKind;

    /// Locks the slot of this manager, if it synchronizes the creation of its
    /// value.
    fn lock_slot(&self) -> Option<SlotGuard> {
        None
    }

    /// Exposes the disposal behavior of this manager. Disposable managers
    /// are owned by the lifetime container of the container they are
    /// registered in.
    fn as_dispose(self: Arc<Self>) -> Option<Arc<dyn Dispose>> {
        None
    }
}
