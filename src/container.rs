mod container;
mod extension;
mod registration;

pub use container::*;
pub use extension::*;
pub use registration::*;
