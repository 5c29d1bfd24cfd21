#[cfg(unix)]
mod unix {
    use anyhow::{Context, Result};
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::process::{Child, Command, Stdio};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
    use tokio::net::UnixStream;
    use tokio::sync::mpsc::{self, error::TrySendError};
    use tokio::sync::oneshot;
    use tokio::time::{sleep, timeout, Duration};
    use tracing::{debug, trace, warn};

    use crate::playback::PlaybackSink;

    const READY_TIMEOUT: Duration = Duration::from_secs(10);
    const PROPERTY_TIMEOUT: Duration = Duration::from_millis(500);

    #[derive(Debug, Clone, Deserialize)]
    struct MpvEvent {
        event: String,
        #[serde(default)]
        reason: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    enum MpvResponse {
        Event(MpvEvent),
        Result {
            error: String,
            #[serde(default)]
            data: Option<serde_json::Value>,
            #[serde(default)]
            request_id: Option<u64>,
        },
    }

    type Waiters = HashMap<u64, oneshot::Sender<Option<serde_json::Value>>>;
    /// Property queries waiting for their reply, by request id
    type Pending = Arc<Mutex<Waiters>>;

    fn lock(pending: &Pending) -> MutexGuard<'_, Waiters> {
        pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// mpv running headless, driven over its JSON IPC socket.
    pub struct MpvPlayer {
        socket_path: PathBuf,
        process: Option<Child>,
        writer: BufWriter<tokio::net::unix::OwnedWriteHalf>,
        event_rx: mpsc::Receiver<MpvEvent>,
        pending: Pending,
        next_request: u64,
    }

    pub fn check_dependencies(mpv: &str) -> Result<()> {
        if Command::new(mpv)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_err()
        {
            anyhow::bail!(
                "mpv not found. Install it:\n\n  \
                 Ubuntu/Debian: sudo apt install mpv\n  \
                 Arch:          sudo pacman -S mpv\n  \
                 Fedora:        sudo dnf install mpv\n  \
                 macOS:         brew install mpv\n"
            );
        }

        Ok(())
    }

    impl MpvPlayer {
        pub async fn spawn(mpv: &str) -> Result<Self> {
            check_dependencies(mpv)?;

            let socket_path =
                std::env::temp_dir().join(format!("unisound-mpv-{}.sock", std::process::id()));
            let _ = std::fs::remove_file(&socket_path);

            let mut process = Command::new(mpv)
                .args([
                    "--idle=yes",
                    "--keep-open=yes",
                    "--no-video",
                    "--no-terminal",
                    "--really-quiet",
                    &format!("--input-ipc-server={}", socket_path.display()),
                ])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .context("Failed to spawn mpv")?;

            let mut connected = false;
            for _ in 0..50 {
                if socket_path.exists() {
                    connected = true;
                    break;
                }
                sleep(Duration::from_millis(100)).await;
            }

            if !connected {
                let _ = process.kill();
                anyhow::bail!("mpv socket did not appear at {}", socket_path.display());
            }

            Self::connect(socket_path, Some(process)).await
        }

        /// Attach to an IPC socket that is already listening. `process`, if
        /// given, is killed when the player is dropped.
        pub async fn connect(socket_path: PathBuf, process: Option<Child>) -> Result<Self> {
            let stream = UnixStream::connect(&socket_path)
                .await
                .context("Failed to connect to mpv socket")?;

            let (reader, writer) = stream.into_split();
            let writer = BufWriter::new(writer);

            let (event_tx, event_rx) = mpsc::channel(32);
            let pending = Pending::default();
            tokio::spawn(Self::read_events(
                BufReader::new(reader),
                event_tx,
                Arc::clone(&pending),
            ));

            debug!(socket = %socket_path.display(), "mpv ready");
            Ok(Self {
                socket_path,
                process,
                writer,
                event_rx,
                pending,
                next_request: 0,
            })
        }

        /// Never blocks on a slow consumer: events nobody reads are dropped
        /// and replies nobody waits for are discarded.
        async fn read_events(
            mut reader: BufReader<tokio::net::unix::OwnedReadHalf>,
            event_tx: mpsc::Sender<MpvEvent>,
            pending: Pending,
        ) {
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let Ok(resp) = serde_json::from_str::<MpvResponse>(&line) else {
                            continue;
                        };
                        match resp {
                            MpvResponse::Event(event) => match event_tx.try_send(event) {
                                Ok(()) => {}
                                Err(TrySendError::Full(event)) => {
                                    trace!(event = %event.event, "event queue full, dropping");
                                }
                                Err(TrySendError::Closed(_)) => break,
                            },
                            MpvResponse::Result {
                                error,
                                data,
                                request_id,
                            } => {
                                if error != "success" {
                                    debug!(%error, "mpv command failed");
                                }
                                let waiter = request_id.and_then(|id| lock(&pending).remove(&id));
                                if let Some(waiter) = waiter {
                                    let _ = waiter.send(data);
                                }
                            }
                        }
                    }
                    Err(_) => break,
                }
            }
        }

        fn next_request_id(&mut self) -> u64 {
            self.next_request += 1;
            self.next_request
        }

        async fn write_command(
            &mut self,
            cmd: Vec<serde_json::Value>,
            request_id: u64,
        ) -> Result<()> {
            let msg = json!({ "command": cmd, "request_id": request_id });
            let line = format!("{}\n", msg);
            self.writer.write_all(line.as_bytes()).await?;
            self.writer.flush().await?;
            Ok(())
        }

        async fn send_command(&mut self, cmd: Vec<serde_json::Value>) -> Result<()> {
            let request_id = self.next_request_id();
            self.write_command(cmd, request_id).await
        }

        async fn get_property(&mut self, name: &str) -> Result<Option<f64>> {
            let request_id = self.next_request_id();
            let (tx, rx) = oneshot::channel();
            lock(&self.pending).insert(request_id, tx);

            self.write_command(vec![json!("get_property"), json!(name)], request_id)
                .await?;
            match timeout(PROPERTY_TIMEOUT, rx).await {
                Ok(Ok(data)) => Ok(data.and_then(|value| value.as_f64())),
                _ => {
                    lock(&self.pending).remove(&request_id);
                    Ok(None)
                }
            }
        }
    }

    #[async_trait]
    impl PlaybackSink for MpvPlayer {
        async fn load(&mut self, url: &str) -> Result<()> {
            while self.event_rx.try_recv().is_ok() {}
            self.send_command(vec![json!("loadfile"), json!(url), json!("replace")]).await?;
            self.send_command(vec![json!("set_property"), json!("pause"), json!(false)]).await
        }

        async fn wait_ready(&mut self) -> Result<()> {
            let wait = async {
                while let Some(event) = self.event_rx.recv().await {
                    match event.event.as_str() {
                        "file-loaded" => return Ok(()),
                        "end-file" if event.reason.as_deref() == Some("error") => {
                            anyhow::bail!("mpv could not open the stream")
                        }
                        _ => {}
                    }
                }
                anyhow::bail!("mpv event stream closed")
            };

            match timeout(READY_TIMEOUT, wait).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("mpv did not report file-loaded in time");
                    Ok(())
                }
            }
        }

        async fn pause(&mut self) -> Result<()> {
            self.send_command(vec![json!("set_property"), json!("pause"), json!(true)]).await
        }

        async fn resume(&mut self) -> Result<()> {
            self.send_command(vec![json!("set_property"), json!("pause"), json!(false)]).await
        }

        async fn seek(&mut self, seconds: f64) -> Result<()> {
            self.send_command(vec![json!("seek"), json!(seconds), json!("absolute")]).await
        }

        async fn stop(&mut self) -> Result<()> {
            self.send_command(vec![json!("stop")]).await
        }

        async fn position(&mut self) -> Result<Option<f64>> {
            self.get_property("time-pos").await
        }

        async fn duration(&mut self) -> Result<Option<f64>> {
            self.get_property("duration").await
        }
    }

    impl Drop for MpvPlayer {
        fn drop(&mut self) {
            if let Some(process) = self.process.as_mut() {
                let _ = process.kill();
            }
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }

}

#[cfg(unix)]
pub use unix::*;

#[cfg(not(unix))]
compile_error!("Playback is currently only supported on Unix systems (Linux/macOS).");
