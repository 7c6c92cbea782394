mod state;
mod negotiator;

pub use state::*;
pub use negotiator::*;
