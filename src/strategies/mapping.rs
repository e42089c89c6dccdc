use crate::{
    BuildKeyMappingPolicy, BuilderContext, BuilderStrategy, Cast, Existing,
    InjectError, InjectResult, Instance,
};
use tracing::trace;

/// Replaces the requested build key with the key it is mapped to. After the
/// mapped type is built, the value is converted back to the requested type.
///
/// Mappings are followed for a single hop only.
#[derive(Clone, Copy, Default, Debug)]
pub struct BuildKeyMappingStrategy;

impl BuilderStrategy for BuildKeyMappingStrategy {
    fn pre_build_up(&self, context: &mut BuilderContext) -> InjectResult<()> {
        let mapping = match context
            .policies()
            .get::<dyn BuildKeyMappingPolicy>(context.build_key())
        {
            Some(mapping) => mapping,
            None => return Ok(()),
        };

        let mapped = mapping.map(context.build_key())?;
        trace!(
            from = %context.build_key(),
            to = %mapped.build_key,
            "mapped build key"
        );
        context.set_build_key(mapped.build_key);
        context.pending_cast = Some(mapped.cast);
        Ok(())
    }

    fn post_build_up(&self, context: &mut BuilderContext) -> InjectResult<()> {
        let Cast(cast) = match context.pending_cast.take() {
            Some(cast) => cast,
            None => return Ok(()),
        };

        match context.take_existing() {
            Some(Existing::Built(instance)) => {
                let service_info = *context.original_build_key().service_info();
                let hooks = instance.hooks();
                let value = cast(instance.into_value())
                    .ok_or(InjectError::InvalidInstance { service_info })?;
                context.set_existing(Existing::Built(Instance::new(value, hooks)));
            }
            Some(existing) => context.set_existing(existing),
            None => {}
        }

        Ok(())
    }
}
