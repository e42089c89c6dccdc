use crate::{BuilderContext, BuilderStrategy, InjectResult};

/// Notifies values implementing [`BuilderAware`](crate::BuilderAware) that
/// they have been built.
#[derive(Clone, Copy, Default, Debug)]
pub struct BuilderAwareStrategy;

impl BuilderStrategy for BuilderAwareStrategy {
    fn pre_build_up(&self, context: &mut BuilderContext) -> InjectResult<()> {
        if let Some(instance) = context.built() {
            if let Some(hooks) = instance.hooks() {
                hooks.built_up(instance.value().as_ref(), context.build_key());
            }
        }

        Ok(())
    }
}
