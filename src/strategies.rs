mod builder_aware;
mod cycle;
mod lifetime;
mod mapping;
mod plan;

pub use builder_aware::*;
pub use cycle::*;
pub use lifetime::*;
pub use mapping::*;
pub use plan::*;
