use anyhow::Result;
use async_trait::async_trait;

/// Audio output that plays one stream URL at a time.
#[async_trait]
pub trait PlaybackSink: Send {
    /// Replace whatever is loaded with `url` and start playing
    async fn load(&mut self, url: &str) -> Result<()>;

    /// Resolve once the loaded stream is prepared
    async fn wait_ready(&mut self) -> Result<()> {
        Ok(())
    }

    async fn pause(&mut self) -> Result<()>;

    async fn resume(&mut self) -> Result<()>;

    /// Jump to an absolute position in seconds
    async fn seek(&mut self, seconds: f64) -> Result<()>;

    /// Unload the current stream
    async fn stop(&mut self) -> Result<()>;

    async fn position(&mut self) -> Result<Option<f64>>;

    async fn duration(&mut self) -> Result<Option<f64>>;
}
