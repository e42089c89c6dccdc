mod list;
mod policies;

pub use list::*;
pub use policies::*;
