mod config;
mod listener;
mod publisher;
mod state;
mod target;

pub use config::*;
pub use listener::*;
pub use publisher::RtmpPublisher;
pub use state::PublisherState;
pub use target::*;
