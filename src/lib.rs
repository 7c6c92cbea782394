mod utils;
mod amf;
mod protocol;
mod handshake;
mod chunk;
mod connection;
mod media;
mod client;

// Re-export commonly used types at crate root
pub use utils::*;
pub use amf::*;
pub use protocol::*;
pub use connection::*;
pub use chunk::*;
pub use handshake::*;
pub use media::*;

// Client exports
pub use client::*;
