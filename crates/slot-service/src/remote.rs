//! Random sources the service can be wired to

use tokio::io::BufReader;
use tokio::net::TcpStream;

use slot_engine::{check_bounds, ChaChaSource, RandomSource, RandomSourceError, RngOutput};

use crate::protocol::{read_frame, write_frame, RngReply, RngRequest};

/// Client for the standalone RNG server
///
/// Opens one connection per draw. The coordinator's timeout bounds the
/// whole exchange; this type does not retry.
#[derive(Debug, Clone)]
pub struct RemoteRandomSource {
    addr: String,
}

impl RemoteRandomSource {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

fn unavailable(context: &str, err: impl std::fmt::Display) -> RandomSourceError {
    RandomSourceError::Unavailable(format!("{context}: {err}"))
}

impl RandomSource for RemoteRandomSource {
    async fn request(&self, upper_bounds: &[u64]) -> Result<RngOutput, RandomSourceError> {
        check_bounds(upper_bounds)?;

        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| unavailable(&format!("connect {}", self.addr), e))?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let request = RngRequest {
            count: upper_bounds.len(),
            upper_bounds: upper_bounds.to_vec(),
        };
        write_frame(&mut write_half, &request)
            .await
            .map_err(|e| unavailable("send", e))?;

        let reply = read_frame::<_, RngReply>(&mut reader)
            .await
            .map_err(|e| unavailable("receive", e))?
            .ok_or_else(|| unavailable("receive", "connection closed"))?
            .map_err(|e| unavailable("decode", e))?;

        // Count is passed through untouched; the resolver owns that check
        match reply {
            RngReply::Numbers(numbers) => Ok(RngOutput {
                stops: numbers.numbers,
                audit_token: numbers.audit_token,
            }),
            RngReply::Failure(failure) => Err(RandomSourceError::Unavailable(failure.error)),
        }
    }
}

/// The source a running spin server draws from
pub enum EngineSource {
    Local(ChaChaSource),
    Remote(RemoteRandomSource),
}

impl EngineSource {
    pub fn describe(&self) -> String {
        match self {
            EngineSource::Local(_) => "local ChaCha20".to_string(),
            EngineSource::Remote(remote) => format!("remote {}", remote.addr()),
        }
    }
}

impl RandomSource for EngineSource {
    async fn request(&self, upper_bounds: &[u64]) -> Result<RngOutput, RandomSourceError> {
        match self {
            EngineSource::Local(source) => source.request(upper_bounds).await,
            EngineSource::Remote(source) => source.request(upper_bounds).await,
        }
    }
}
