pub mod host;
pub mod media_engine;
pub mod routing_delegate;
pub mod session_bridge;
pub mod stores;
