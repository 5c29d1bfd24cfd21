use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/105.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Sent by the requests that scrape web pages instead of calling an API
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Upper bound for waiting on every backend to settle
    pub search_timeout_secs: u64,
    pub soundcloud: SoundcloudConfig,
    pub youtube: YoutubeConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundcloudConfig {
    pub api_url: String,
    /// Landing page that references the script bundles carrying the client id
    pub web_url: String,
    pub asset_host: String,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    pub host_url: String,
    /// `sp` search parameter restricting results to videos, already URL-encoded
    pub video_filter: String,
    pub ytdlp_path: String,
    pub resolve_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub mpv_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".unisound"),
            user_agent: DESKTOP_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            search_timeout_secs: 60,
            soundcloud: SoundcloudConfig::default(),
            youtube: YoutubeConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl Default for SoundcloudConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api-v2.soundcloud.com".to_string(),
            web_url: "https://soundcloud.com".to_string(),
            asset_host: "https://a-v2.sndcdn.com".to_string(),
            page_size: 20,
        }
    }
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            host_url: "https://www.youtube.com".to_string(),
            video_filter: "EgIQAQ%3D%3D".to_string(),
            ytdlp_path: "yt-dlp".to_string(),
            resolve_timeout_secs: 15,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            mpv_path: "mpv".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML from {:?}", path))
    }

    /// Like `load`, but a missing file yields the defaults
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content =
            toml::to_string_pretty(&self).with_context(|| "Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        fs::write(path, content).with_context(|| format!("Failed to write config to {:?}", path))
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    /// HTTP client shared by every backend
    pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout())
            .build()
            .context("Failed to build HTTP client")
    }
}

impl YoutubeConfig {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.data_dir, PathBuf::from(".unisound"));
        assert_eq!(config.soundcloud.page_size, 20);
        assert_eq!(config.youtube.video_filter, "EgIQAQ%3D%3D");
    }

    #[test]
    fn test_config_save_and_load() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.soundcloud.page_size = 50;
        config.youtube.ytdlp_path = "/opt/bin/yt-dlp".to_string();

        config.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");
        fs::write(&config_path, "[soundcloud]\npage_size = 5\n").unwrap();

        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(loaded.soundcloud.page_size, 5);
        assert_eq!(loaded.soundcloud.api_url, "https://api-v2.soundcloud.com");
        assert_eq!(loaded.youtube, YoutubeConfig::default());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let loaded = Config::load_or_default(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_config_paths() {
        let config = Config::default();
        assert_eq!(config.config_path(), PathBuf::from(".unisound/config.toml"));
        assert_eq!(config.search_timeout(), Duration::from_secs(60));
    }
}
