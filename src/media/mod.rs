mod frame;
mod pump;

pub use frame::*;
pub use pump::*;
