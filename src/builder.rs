mod chain;
mod context;

pub use chain::*;
pub use context::*;
