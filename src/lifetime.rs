mod container;
mod manager;
mod managers;

pub use container::*;
pub use manager::*;
pub use managers::*;
