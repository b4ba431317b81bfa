//! Wire format: one JSON object per line

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use slot_engine::{AuditToken, SpinError, SpinRequest, SpinResult};

/// Frames a client sends to the spin server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Resolve one spin
    Spin(SpinRequest),
    /// List published game codes
    ListGames,
    /// Re-read every config file and publish them together
    Reload,
}

/// Frames the spin server answers with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    SpinResult(SpinResult),
    Games { games: Vec<String> },
    Reloaded { games: Vec<String> },
    Error(ErrorFrame),
}

/// Typed failure as the client sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    /// `invalid_bet`, `unknown_game`, `rng_unavailable`, `resolution`,
    /// `bad_request` or `reload_failed`
    pub kind: String,
    pub message: String,
    pub retryable: bool,
}

impl ErrorFrame {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            kind: "bad_request".into(),
            message: message.into(),
            retryable: false,
        }
    }

    pub fn reload_failed(message: impl Into<String>) -> Self {
        Self {
            kind: "reload_failed".into(),
            message: message.into(),
            retryable: false,
        }
    }
}

impl From<&SpinError> for ErrorFrame {
    fn from(err: &SpinError) -> Self {
        Self {
            kind: err.kind().into(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

/// Request to the RNG server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RngRequest {
    pub count: usize,
    pub upper_bounds: Vec<u64>,
}

/// Successful RNG draw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RngNumbers {
    pub numbers: Vec<u64>,
    pub audit_token: AuditToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngFailure {
    pub error: String,
}

/// RNG server reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RngReply {
    Numbers(RngNumbers),
    Failure(RngFailure),
}

/// Write one frame followed by a newline
pub async fn write_frame<W, T>(writer: &mut W, frame: &T) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let json = serde_json::to_string(frame)?;
    writer.write_all(format!("{}\n", json).as_bytes()).await?;
    writer.flush().await
}

/// Longest line accepted as one frame, newline excluded
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// A line arrived but could not be used as a frame
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Frame exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Invalid frame: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Read the next non-empty line and decode it; `Ok(None)` on EOF
///
/// Lines longer than [`MAX_FRAME_BYTES`] are skipped up to their newline and
/// reported as [`FrameError::TooLarge`], so the stream stays usable.
pub async fn read_frame<R, T>(reader: &mut R) -> std::io::Result<Option<Result<T, FrameError>>>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = (&mut *reader)
            .take(MAX_FRAME_BYTES as u64 + 1)
            .read_until(b'\n', &mut line)
            .await?;
        if n == 0 {
            return Ok(None);
        }
        if n > MAX_FRAME_BYTES && !line.ends_with(b"\n") {
            discard_line(reader).await?;
            return Ok(Some(Err(FrameError::TooLarge {
                limit: MAX_FRAME_BYTES,
            })));
        }
        if !line.iter().all(u8::is_ascii_whitespace) {
            return Ok(Some(serde_json::from_slice(&line).map_err(FrameError::from)));
        }
    }
}

/// Consume input through the next newline in bounded chunks
async fn discard_line<R>(reader: &mut R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut chunk = Vec::new();
    loop {
        chunk.clear();
        let n = (&mut *reader)
            .take(MAX_FRAME_BYTES as u64)
            .read_until(b'\n', &mut chunk)
            .await?;
        if n == 0 || chunk.ends_with(b"\n") {
            return Ok(());
        }
    }
}
