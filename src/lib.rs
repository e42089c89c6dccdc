//! A dependency injection container with a staged build pipeline.
//!
//! Types are registered with the [`UnityContainer`], which then builds them
//! along with their dependencies when they are requested. Each registration
//! maps a requested type to the type that should be built for it, and
//! optionally controls the lifetime of the values that are built.
//!
//! # Injectable types
//!
//! The container does not inspect types at runtime. Instead, a type
//! implements [`Injectable`] to list its constructors, properties and
//! methods. Members can be marked for injection, and their dependencies can
//! be named or optional. When a type has no marked constructor, the one with
//! the most parameters is used.
//!
//! # Interfaces
//!
//! Requesting a `dyn Trait` lets a service depend on a behavior without
//! knowing the concrete type that provides it. The [`interface!`] macro
//! makes a trait usable this way, after which any implementation of it can
//! be registered for requests of the trait object. Generic traits can list
//! their generic implementations so that a single open generic registration
//! serves every closed form of the trait.
//!
//! # Lifetimes
//!
//! A lifetime manager controls when values are reused:
//!
//! - [`TransientLifetimeManager`]: a new value for every request. This is the
//!   default.
//! - [`ContainerControlledLifetimeManager`]: a single value, disposed with
//!   the container.
//! - [`HierarchicalLifetimeManager`]: a single value per container in the
//!   hierarchy.
//! - [`PerThreadLifetimeManager`]: a single value per thread.
//! - [`PerResolveLifetimeManager`]: a single value per resolve call.
//! - [`ExternallyControlledLifetimeManager`]: the value is reused while
//!   something outside the container keeps it alive.
//!
//! # Example
//!
//! ```
//! use unity_container::{
//!     interface, Constructor, ContainerControlledLifetimeManager, Injectable,
//!     Members, RegisterOptions, Service, Svc, UnityContainer,
//! };
//!
//! struct User;
//!
//! trait DataService: Service {
//!     fn get_user(&self, user_id: &str) -> Option<User>;
//! }
//! interface!(DataService);
//!
//! #[derive(Default)]
//! struct MockDataService;
//!
//! impl DataService for MockDataService {
//!     fn get_user(&self, _user_id: &str) -> Option<User> {
//!         Some(User)
//!     }
//! }
//!
//! impl Injectable for MockDataService {
//!     fn members() -> Members<Self> {
//!         Members::new().constructor(Constructor::from_default())
//!     }
//! }
//!
//! struct UserService {
//!     data_service: Svc<dyn DataService>,
//! }
//!
//! impl Injectable for UserService {
//!     fn members() -> Members<Self> {
//!         Members::new().constructor(
//!             Constructor::new(|args| {
//!                 Ok(UserService {
//!                     data_service: args.next()?,
//!                 })
//!             })
//!             .param::<dyn DataService>("data_service"),
//!         )
//!     }
//! }
//!
//! let container = UnityContainer::new();
//! container
//!     .register_type::<dyn DataService, MockDataService>(
//!         RegisterOptions::new().lifetime(ContainerControlledLifetimeManager::new()),
//!     )
//!     .unwrap();
//!
//! let user_service: Svc<UserService> = container.resolve().unwrap();
//! assert!(user_service.data_service.get_user("john").is_some());
//! ```

#![forbid(unsafe_code)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::needless_pass_by_value
)]

mod any;
mod builder;
mod container;
mod error;
mod injection;
mod interface;
mod key;
mod lifetime;
mod module;
mod overrides;
mod policy;
mod strategies;

pub use any::*;
pub use builder::*;
pub use container::*;
pub use error::*;
pub use injection::*;
pub use interface::*;
pub use key::*;
pub use lifetime::*;
pub use module::*;
pub use overrides::*;
pub use policy::*;
pub use strategies::*;

#[cfg(test)]
mod tests;
