pub mod mpv;
mod resolver;
mod sink;

pub use mpv::MpvPlayer;
pub use resolver::{PlaybackResolver, PlaybackSession};
pub use sink::PlaybackSink;
