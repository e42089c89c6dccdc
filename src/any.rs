use crate::{BuildKey, Injectable};
use downcast_rs::{impl_downcast, DowncastSync};
use std::sync::{Arc, Weak};

/// A reference-counted pointer holding a service.
pub type Svc<T> = Arc<T>;

/// A reference-counted service pointer holding an instance of `dyn Service`.
pub type DynSvc = Svc<dyn Service>;

/// Implemented automatically on types that are capable of being a service.
pub trait Service: DowncastSync {}
impl<T: DowncastSync> Service for T {}
impl_downcast!(sync Service);

/// Type-specific callbacks for an erased instance. These let the container
/// run lifecycle hooks on values it only knows as [`DynSvc`].
#[derive(Clone, Copy)]
pub struct InstanceHooks {
    dispose: fn(&dyn Service),
    built_up: fn(&dyn Service, &BuildKey),
}

impl InstanceHooks {
    /// Creates the hooks for an injectable type.
    #[must_use]
    pub fn of<T: Injectable>() -> Self {
        InstanceHooks {
            dispose: dispose_hook::<T>,
            built_up: built_up_hook::<T>,
        }
    }

    pub(crate) fn dispose(&self, value: &dyn Service) {
        (self.dispose)(value);
    }

    pub(crate) fn built_up(&self, value: &dyn Service, build_key: &BuildKey) {
        (self.built_up)(value, build_key);
    }
}

impl std::fmt::Debug for InstanceHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceHooks").finish_non_exhaustive()
    }
}

fn dispose_hook<T: Injectable>(value: &dyn Service) {
    if let Some(dispose) =
        value.downcast_ref::<T>().and_then(Injectable::as_dispose)
    {
        dispose.dispose();
    }
}

fn built_up_hook<T: Injectable>(value: &dyn Service, build_key: &BuildKey) {
    if let Some(aware) =
        value.downcast_ref::<T>().and_then(Injectable::as_builder_aware)
    {
        aware.on_built_up(build_key);
    }
}

/// A built value as it flows through the build pipeline and is stored by
/// lifetime managers.
#[derive(Clone, Debug)]
pub struct Instance {
    value: DynSvc,
    hooks: Option<InstanceHooks>,
}

impl Instance {
    /// Wraps an erased value.
    #[must_use]
    pub fn new(value: DynSvc, hooks: Option<InstanceHooks>) -> Self {
        Instance { value, hooks }
    }

    /// The erased service pointer.
    #[must_use]
    pub fn value(&self) -> &DynSvc {
        &self.value
    }

    #[must_use]
    pub fn into_value(self) -> DynSvc {
        self.value
    }

    #[must_use]
    pub fn hooks(&self) -> Option<InstanceHooks> {
        self.hooks
    }

    /// Runs the disposal hook of the underlying value, if it has one.
    pub fn dispose(&self) {
        if let Some(hooks) = self.hooks {
            hooks.dispose(self.value.as_ref());
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        std::ptr::eq(
            Svc::as_ptr(&self.value).cast::<()>(),
            Svc::as_ptr(&other.value).cast::<()>(),
        )
    }

    pub(crate) fn downgrade(&self) -> WeakInstance {
        WeakInstance {
            value: Svc::downgrade(&self.value),
            hooks: self.hooks,
        }
    }
}

impl std::fmt::Debug for dyn Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Service")
    }
}

/// A weak handle to an [`Instance`] which does not keep the value alive.
#[derive(Clone, Debug)]
pub(crate) struct WeakInstance {
    value: Weak<dyn Service>,
    hooks: Option<InstanceHooks>,
}

impl WeakInstance {
    pub fn upgrade(&self) -> Option<Instance> {
        self.value.upgrade().map(|value| Instance {
            value,
            hooks: self.hooks,
        })
    }
}
