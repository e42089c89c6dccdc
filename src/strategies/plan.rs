use crate::{
    BuildPlanCreatorPolicy, BuildPlanPolicy, BuilderContext, BuilderStrategy,
    InjectError, InjectResult, PolicyKey,
};
use tracing::trace;

/// Builds the value with the build plan of the build key, creating and
/// caching a plan if there isn't one yet.
#[derive(Clone, Copy, Default, Debug)]
pub struct BuildPlanStrategy;

impl BuilderStrategy for BuildPlanStrategy {
    fn pre_build_up(&self, context: &mut BuilderContext) -> InjectResult<()> {
        if context.built().is_some() {
            return Ok(());
        }

        let build_key = context.build_key().clone();
        let cached = context
            .persistent_policies()
            .lookup::<dyn BuildPlanPolicy>(&build_key, false, false)
            .filter(|found| found.depth == 0 || found.policy.is_shared());
        let plan = match cached {
            Some(found) => found.policy,
            None => {
                let creator = context
                    .policies()
                    .get::<dyn BuildPlanCreatorPolicy>(&build_key)
                    .ok_or_else(|| {
                        InjectError::InternalError(format!(
                            "no build plan creator is available for {}",
                            build_key
                        ))
                    })?;
                let plan = creator.create_plan(context, &build_key)?;
                if !context.has_unbuilt() {
                    context
                        .persistent_policies()
                        .set::<dyn BuildPlanPolicy>(plan.clone(), PolicyKey::Build(build_key.clone()));
                }

                trace!(build_key = %build_key, "created build plan");
                plan
            }
        };

        plan.build_up(context)
    }
}
