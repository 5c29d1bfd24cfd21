mod config;
pub mod credentials;

pub use config::{Config, PlaybackConfig, SoundcloudConfig, YoutubeConfig};
pub use credentials::CredentialCell;
