use crate::{
    InjectResult, LifetimeContainer, PolicyList, StagedStrategyChain,
    UnityContainer,
};
use std::sync::Arc;
use tracing::debug;

/// Extends a container by adding strategies and policies to it. Strategies
/// added this way run for every build in the container and its children,
/// and may replace the values being built.
///
/// ```
/// use unity_container::{
///     BuilderContext, BuilderStrategy, ExtensionContext, InjectResult,
///     UnityBuildStage, UnityContainer, UnityContainerExtension,
/// };
/// use std::sync::{atomic::{AtomicUsize, Ordering}, Arc};
///
/// #[derive(Default)]
/// struct CountBuilds(AtomicUsize);
///
/// impl BuilderStrategy for CountBuilds {
///     fn pre_build_up(&self, _context: &mut BuilderContext) -> InjectResult<()> {
///         self.0.fetch_add(1, Ordering::Relaxed);
///         Ok(())
///     }
/// }
///
/// struct Counting(Arc<CountBuilds>);
///
/// impl UnityContainerExtension for Counting {
///     fn initialize(&self, context: &ExtensionContext<'_>) -> InjectResult<()> {
///         context.strategies().add(self.0.clone(), UnityBuildStage::Setup);
///         Ok(())
///     }
/// }
///
/// let counter = Arc::new(CountBuilds::default());
/// let container = UnityContainer::new();
/// container.add_extension(Counting(counter.clone())).unwrap();
/// container.register_instance::<u32>(None, Arc::new(1), None).unwrap();
///
/// let _: Arc<u32> = container.resolve().unwrap();
/// assert_eq!(1, counter.0.load(Ordering::Relaxed));
/// ```
pub trait UnityContainerExtension: Send + Sync {
    fn initialize(&self, context: &ExtensionContext<'_>) -> InjectResult<()>;
}

/// What an extension can change in the container it is added to.
pub struct ExtensionContext<'a> {
    container: &'a UnityContainer,
}

impl<'a> ExtensionContext<'a> {
    #[must_use]
    pub fn container(&self) -> &'a UnityContainer {
        self.container
    }

    /// The build pipeline of the container.
    #[must_use]
    pub fn strategies(&self) -> &'a StagedStrategyChain {
        &self.container.inner.strategies
    }

    /// The policies of the container.
    #[must_use]
    pub fn policies(&self) -> &'a Arc<PolicyList> {
        &self.container.inner.policies
    }

    /// The disposables owned by the container.
    #[must_use]
    pub fn lifetime(&self) -> &'a Arc<LifetimeContainer> {
        &self.container.inner.lifetime
    }
}

impl UnityContainer {
    /// Adds an extension to this container. The extension is kept until the
    /// container is disposed.
    pub fn add_extension<E>(&self, extension: E) -> InjectResult<&Self>
    where
        E: UnityContainerExtension + 'static,
    {
        self.check_disposed()?;
        extension.initialize(&ExtensionContext { container: self })?;
        self.inner.extensions.lock().push(Box::new(extension));

        debug!(
            extension = std::any::type_name::<E>(),
            "added container extension"
        );
        Ok(self)
    }
}
