//! Media engine boundary and stream player

pub mod engine;
pub mod stream_player;

pub use engine::{EngineError, MediaEngine, StreamTier};
pub use stream_player::StreamPlayer;
