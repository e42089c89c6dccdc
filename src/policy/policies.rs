use crate::{
    BuildKey, BuilderContext, DynSvc, InjectError, InjectResult, OpenGeneric,
    SelectedConstructor, SelectedMethod, SelectedProperty, TypeMembers,
};
use std::sync::Arc;

/// A build key a request was mapped to, along with the conversion from the
/// mapped type back to the requested type.
#[derive(Clone, Debug)]
pub struct MappedKey {
    pub build_key: BuildKey,
    pub cast: Cast,
}

/// Converts a built value into the erased form of the type that was
/// requested.
#[derive(Clone, Copy)]
pub struct Cast(pub fn(DynSvc) -> Option<DynSvc>);

impl std::fmt::Debug for Cast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Cast")
    }
}

/// Maps a requested build key to the key that should actually be built.
pub trait BuildKeyMappingPolicy: Send + Sync {
    fn map(&self, build_key: &BuildKey) -> InjectResult<MappedKey>;
}

/// A mapping from one closed type to another.
pub struct BuildKeyMapping {
    target: BuildKey,
    cast: Cast,
}

impl BuildKeyMapping {
    #[must_use]
    pub fn new(target: BuildKey, cast: fn(DynSvc) -> Option<DynSvc>) -> Self {
        BuildKeyMapping {
            target,
            cast: Cast(cast),
        }
    }
}

impl BuildKeyMappingPolicy for BuildKeyMapping {
    fn map(&self, _build_key: &BuildKey) -> InjectResult<MappedKey> {
        Ok(MappedKey {
            build_key: self.target.clone(),
            cast: self.cast,
        })
    }
}

/// A mapping from an open generic definition to another, closed over the
/// type arguments of each request.
pub struct GenericTypeMapping {
    target: OpenGeneric,
}

impl GenericTypeMapping {
    #[must_use]
    pub fn new(target: OpenGeneric) -> Self {
        GenericTypeMapping { target }
    }
}

impl BuildKeyMappingPolicy for GenericTypeMapping {
    fn map(&self, build_key: &BuildKey) -> InjectResult<MappedKey> {
        let service_info = *build_key.service_info();
        let closed = service_info
            .generic()
            .and_then(|generic| generic.close(&self.target))
            .ok_or(InjectError::GenericClosingFailed {
                service_info,
                definition: self.target,
            })?;

        Ok(MappedKey {
            build_key: build_key.with_type(closed.service_info()),
            cast: Cast(closed.cast()),
        })
    }
}

/// Builds a value for a build key. Plans are cached per build key once
/// created.
pub trait BuildPlanPolicy: Send + Sync {
    fn build_up(&self, context: &mut BuilderContext) -> InjectResult<()>;

    /// Whether containers other than the one holding this plan may use it.
    /// Plans derived from a container's own policies are not shared with its
    /// child containers, since a child may shadow those policies.
    fn is_shared(&self) -> bool {
        true
    }
}

/// Creates build plans for build keys that have none yet.
pub trait BuildPlanCreatorPolicy: Send + Sync {
    fn create_plan(
        &self,
        context: &mut BuilderContext,
        build_key: &BuildKey,
    ) -> InjectResult<Arc<dyn BuildPlanPolicy>>;
}

/// Chooses the constructor used to build a type.
pub trait ConstructorSelectorPolicy: Send + Sync {
    fn select_constructor(
        &self,
        members: &TypeMembers,
    ) -> InjectResult<SelectedConstructor>;
}

/// Chooses the properties injected into a type.
pub trait PropertySelectorPolicy: Send + Sync {
    fn select_properties(
        &self,
        members: &TypeMembers,
    ) -> InjectResult<Vec<SelectedProperty>>;
}

/// Chooses the methods invoked on a type.
pub trait MethodSelectorPolicy: Send + Sync {
    fn select_methods(
        &self,
        members: &TypeMembers,
    ) -> InjectResult<Vec<SelectedMethod>>;
}
