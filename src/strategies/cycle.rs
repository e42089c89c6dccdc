use crate::{BuilderContext, BuilderStrategy, InjectError, InjectResult};

/// Fails a build whose key is already being built further up the same
/// object graph.
#[derive(Clone, Copy, Default, Debug)]
pub struct CycleDetectionStrategy;

impl BuilderStrategy for CycleDetectionStrategy {
    fn pre_build_up(&self, context: &mut BuilderContext) -> InjectResult<()> {
        let build_key = context.build_key();
        let start = match context.build_path().iter().position(|key| key == build_key) {
            Some(start) => start,
            None => return Ok(()),
        };

        let mut cycle = context.build_path()[start..].to_vec();
        cycle.push(build_key.clone());
        Err(InjectError::CycleDetected {
            service_info: *build_key.service_info(),
            cycle,
        })
    }
}
