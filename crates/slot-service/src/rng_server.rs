//! Standalone RNG server backed by [`ChaChaSource`]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};

use slot_engine::ChaChaSource;

use crate::protocol::{read_frame, write_frame, RngFailure, RngNumbers, RngReply, RngRequest};

pub struct RngServer {
    source: Arc<ChaChaSource>,
}

impl RngServer {
    pub fn new(source: ChaChaSource) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn source(&self) -> &Arc<ChaChaSource> {
        &self.source
    }

    /// Accept connections until `shutdown` resolves
    pub async fn run_until(
        &self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> std::io::Result<()> {
        log::info!("[RngServer] Listening on {}", listener.local_addr()?);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let source = Arc::clone(&self.source);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(source, stream, peer).await {
                                log::warn!("[RngServer] {} connection error: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => log::error!("[RngServer] Accept failed: {}", e),
                },
                _ = &mut shutdown => {
                    log::info!("[RngServer] Shutting down after {} draws", self.source.draw_count());
                    return Ok(());
                }
            }
        }
    }
}

/// Answer one reply per request line
pub fn answer(source: &ChaChaSource, request: &RngRequest) -> RngReply {
    if request.count != request.upper_bounds.len() {
        return RngReply::Failure(RngFailure {
            error: format!(
                "count {} does not match {} upper bounds",
                request.count,
                request.upper_bounds.len()
            ),
        });
    }
    match source.draw(&request.upper_bounds) {
        Ok(output) => RngReply::Numbers(RngNumbers {
            numbers: output.stops,
            audit_token: output.audit_token,
        }),
        Err(e) => RngReply::Failure(RngFailure {
            error: e.to_string(),
        }),
    }
}

async fn handle_connection(
    source: Arc<ChaChaSource>,
    stream: TcpStream,
    peer: SocketAddr,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    while let Some(decoded) = read_frame::<_, RngRequest>(&mut reader).await? {
        let reply = match decoded {
            Ok(request) => answer(&source, &request),
            Err(e) => {
                log::warn!("[RngServer] {} sent invalid request: {}", peer, e);
                RngReply::Failure(RngFailure {
                    error: e.to_string(),
                })
            }
        };
        write_frame(&mut write_half, &reply).await?;
    }
    Ok(())
}
