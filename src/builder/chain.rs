use crate::{BuilderContext, InjectResult};
use parking_lot::RwLock;
use std::{collections::BTreeMap, sync::Arc};

/// A step of the build pipeline.
///
/// Pre-build steps run in chain order until one of them marks the build as
/// complete. Post-build steps then run in reverse order for every strategy
/// whose pre-build step ran.
pub trait BuilderStrategy: Send + Sync {
    fn pre_build_up(&self, _context: &mut BuilderContext) -> InjectResult<()> {
        Ok(())
    }

    fn post_build_up(&self, _context: &mut BuilderContext) -> InjectResult<()> {
        Ok(())
    }
}

/// The stages of the build pipeline, in execution order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum UnityBuildStage {
    Setup,
    TypeMapping,
    Lifetime,
    PreCreation,
    Creation,
    Initialization,
    PostInitialization,
}

/// Strategies grouped by stage. A chain created for a child container runs
/// its parent's strategies before its own within each stage.
#[derive(Default)]
pub struct StagedStrategyChain {
    parent: Option<Arc<StagedStrategyChain>>,
    stages: RwLock<BTreeMap<UnityBuildStage, Vec<Arc<dyn BuilderStrategy>>>>,
}

impl StagedStrategyChain {
    #[must_use]
    pub fn new() -> Self {
        StagedStrategyChain::default()
    }

    #[must_use]
    pub fn with_parent(parent: Arc<StagedStrategyChain>) -> Self {
        StagedStrategyChain {
            parent: Some(parent),
            stages: RwLock::default(),
        }
    }

    /// Adds a strategy to the end of a stage.
    pub fn add(&self, strategy: Arc<dyn BuilderStrategy>, stage: UnityBuildStage) {
        self.stages.write().entry(stage).or_default().push(strategy);
    }

    pub fn add_new<S>(&self, stage: UnityBuildStage)
    where
        S: BuilderStrategy + Default + 'static,
    {
        self.add(Arc::new(S::default()), stage);
    }

    /// Removes the strategies added directly to this chain.
    pub fn clear(&self) {
        self.stages.write().clear();
    }

    /// Flattens this chain and its parents into the strategies to execute.
    #[must_use]
    pub fn make_strategy_chain(&self) -> StrategyChain {
        let mut stages: BTreeMap<UnityBuildStage, Vec<Arc<dyn BuilderStrategy>>> =
            BTreeMap::new();
        self.collect(&mut stages);
        StrategyChain {
            strategies: stages.into_values().flatten().collect(),
        }
    }

    fn collect(
        &self,
        stages: &mut BTreeMap<UnityBuildStage, Vec<Arc<dyn BuilderStrategy>>>,
    ) {
        if let Some(parent) = &self.parent {
            parent.collect(stages);
        }

        for (stage, strategies) in self.stages.read().iter() {
            stages
                .entry(*stage)
                .or_default()
                .extend(strategies.iter().cloned());
        }
    }
}

/// An ordered list of strategies, ready to execute.
#[derive(Clone, Default)]
pub struct StrategyChain {
    strategies: Vec<Arc<dyn BuilderStrategy>>,
}

impl StrategyChain {
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Runs the strategies against a context. Errors are returned as is;
    /// recovering the context is left to the caller.
    pub fn execute(&self, context: &mut BuilderContext) -> InjectResult<()> {
        let mut ran = 0;
        for strategy in &self.strategies {
            ran += 1;
            strategy.pre_build_up(context)?;
            if context.build_complete() {
                break;
            }
        }

        for strategy in self.strategies[..ran].iter().rev() {
            strategy.post_build_up(context)?;
        }

        Ok(())
    }
}
