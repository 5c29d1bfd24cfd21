mod pager;
pub mod soundcloud;
mod traits;
mod types;
pub mod youtube;

pub use pager::Paginator;
pub use soundcloud::SoundcloudProvider;
pub use traits::{Backend, Page, PageTicket, SearchSource};
pub use types::*;
pub use youtube::{YoutubeCursor, YoutubeProvider};

/// Search adapter for SoundCloud
pub type SoundcloudSource = Paginator<SoundcloudProvider>;
/// Search adapter for YouTube
pub type YoutubeSource = Paginator<YoutubeProvider>;
