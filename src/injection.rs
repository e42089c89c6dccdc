mod injectable;
mod member;
mod members;
mod plan;
mod resolver;
mod selection;

pub use injectable::*;
pub use member::*;
pub use members::*;
pub use plan::*;
pub use resolver::*;
pub use selection::*;

pub(crate) use members::seal;
pub(crate) use plan::factory_build_path;
