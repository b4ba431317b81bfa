//! Spin server: thin TCP adapter over [`GameService`]

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};

use slot_engine::{ConfigError, ConfigSource, ConfigStore, GameConfig, GameService, RandomSource};

use crate::protocol::{read_frame, write_frame, ClientFrame, ErrorFrame, ServerFrame};

/// Load every config file, failing on the first invalid one
pub fn load_configs(paths: &[PathBuf]) -> Result<Vec<GameConfig>, ConfigError> {
    paths
        .iter()
        .map(|path| {
            ConfigStore::load(ConfigSource::File(path)).map_err(|e| match e {
                ConfigError::Invalid { field, reason } => ConfigError::Invalid {
                    field: format!("{}: {}", path.display(), field),
                    reason,
                },
                other => other,
            })
        })
        .collect()
}

pub struct SpinServer<R> {
    service: Arc<GameService<R>>,
    config_paths: Arc<Vec<PathBuf>>,
}

impl<R> Clone for SpinServer<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            config_paths: Arc::clone(&self.config_paths),
        }
    }
}

impl<R: RandomSource + 'static> SpinServer<R> {
    /// `config_paths` are re-read on every `reload` frame
    pub fn new(service: GameService<R>, config_paths: Vec<PathBuf>) -> Self {
        Self {
            service: Arc::new(service),
            config_paths: Arc::new(config_paths),
        }
    }

    pub fn service(&self) -> &Arc<GameService<R>> {
        &self.service
    }

    /// Accept connections until `shutdown` resolves
    pub async fn run_until(
        &self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> std::io::Result<()> {
        log::info!(
            "[SpinServer] Listening on {} with games {:?}",
            listener.local_addr()?,
            self.service.store().game_codes()
        );
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let server = self.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream, peer).await {
                                log::warn!("[SpinServer] {} connection error: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => log::error!("[SpinServer] Accept failed: {}", e),
                },
                _ = &mut shutdown => {
                    log::info!("[SpinServer] Shutting down");
                    return Ok(());
                }
            }
        }
    }

    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) -> std::io::Result<()> {
        log::debug!("[SpinServer] {} connected", peer);
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        while let Some(decoded) = read_frame::<_, ClientFrame>(&mut reader).await? {
            let reply = match decoded {
                Ok(frame) => self.handle_frame(frame).await,
                Err(e) => {
                    log::warn!("[SpinServer] {} sent invalid frame: {}", peer, e);
                    ServerFrame::Error(ErrorFrame::bad_request(e.to_string()))
                }
            };
            write_frame(&mut write_half, &reply).await?;
        }

        log::debug!("[SpinServer] {} disconnected", peer);
        Ok(())
    }

    /// Dispatch one decoded frame
    pub async fn handle_frame(&self, frame: ClientFrame) -> ServerFrame {
        match frame {
            ClientFrame::Spin(request) => match self.service.spin(&request).await {
                Ok(result) => ServerFrame::SpinResult(result),
                Err(err) => ServerFrame::Error(ErrorFrame::from(&err)),
            },
            ClientFrame::ListGames => ServerFrame::Games {
                games: self.service.store().game_codes(),
            },
            ClientFrame::Reload => self.reload().await,
        }
    }

    /// Re-read all config files; nothing is published unless all validate
    async fn reload(&self) -> ServerFrame {
        let paths = Arc::clone(&self.config_paths);
        let loaded = match tokio::task::spawn_blocking(move || load_configs(&paths)).await {
            Ok(loaded) => loaded.map_err(|e| e.to_string()),
            Err(e) => Err(format!("reload task failed: {}", e)),
        };

        match loaded {
            Ok(configs) => {
                self.service.store().publish_all(configs);
                let games = self.service.store().game_codes();
                log::info!("[SpinServer] Reloaded games {:?}", games);
                ServerFrame::Reloaded { games }
            }
            Err(message) => {
                log::error!("[SpinServer] Reload rejected, keeping current configs: {}", message);
                ServerFrame::Error(ErrorFrame::reload_failed(message))
            }
        }
    }
}
