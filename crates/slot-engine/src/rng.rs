//! Random source contract and the local ChaCha20-backed source
//!
//! The engine never draws randomness itself. It asks a [`RandomSource`] for
//! one stop value per reel, each below that reel's strip length, and carries
//! the returned [`AuditToken`] through to the settlement result.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rand::prelude::*;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::error::RandomSourceError;

/// Opaque identifier accompanying a draw, kept for later verification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditToken(String);

impl AuditToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AuditToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw stop values for one spin plus the source's audit token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RngOutput {
    /// One raw value per reel, left to right
    pub stops: Vec<u64>,
    pub audit_token: AuditToken,
}

/// Supplier of independent, uniformly distributed stop values
///
/// `request` returns exactly `upper_bounds.len()` numbers, the i-th in
/// `[0, upper_bounds[i])`. Implementations must not retry on their own
/// behalf; the caller owns retry policy and the timeout.
pub trait RandomSource: Send + Sync {
    fn request(
        &self,
        upper_bounds: &[u64],
    ) -> impl Future<Output = Result<RngOutput, RandomSourceError>> + Send;
}

/// Reject requests no source could satisfy
pub fn check_bounds(upper_bounds: &[u64]) -> Result<(), RandomSourceError> {
    if upper_bounds.is_empty() {
        return Err(RandomSourceError::InvalidRequest(
            "count must be positive".into(),
        ));
    }
    if let Some(reel) = upper_bounds.iter().position(|&b| b == 0) {
        return Err(RandomSourceError::InvalidRequest(format!(
            "upper bound for position {reel} must be positive"
        )));
    }
    Ok(())
}

/// Recompute the numbers of a draw from its seed
pub fn replay(seed: [u8; 32], upper_bounds: &[u64]) -> Vec<u64> {
    let mut rng = ChaCha20Rng::from_seed(seed);
    upper_bounds
        .iter()
        .map(|&bound| rng.random_range(0..bound))
        .collect()
}

/// Local random source
///
/// A master ChaCha20 stream hands out a fresh 32-byte seed per draw; the
/// draw's numbers come from a ChaCha20 generator keyed by that seed. The
/// audit token is `"<draw>:<seed hex>"`, enough to replay the draw.
pub struct ChaChaSource {
    master: Mutex<ChaCha20Rng>,
    draws: AtomicU64,
}

impl ChaChaSource {
    /// Source seeded from the operating system
    pub fn from_os() -> Self {
        Self::with_master(ChaCha20Rng::from_os_rng())
    }

    /// Reproducible source for tests and simulations
    pub fn seeded(seed: u64) -> Self {
        Self::with_master(ChaCha20Rng::seed_from_u64(seed))
    }

    fn with_master(master: ChaCha20Rng) -> Self {
        Self {
            master: Mutex::new(master),
            draws: AtomicU64::new(0),
        }
    }

    /// Number of draws served so far
    pub fn draw_count(&self) -> u64 {
        self.draws.load(Ordering::Relaxed)
    }

    /// Draw synchronously; the async contract wraps this
    pub fn draw(&self, upper_bounds: &[u64]) -> Result<RngOutput, RandomSourceError> {
        check_bounds(upper_bounds)?;

        let seed: [u8; 32] = self.master.lock().random();
        let stops = replay(seed, upper_bounds);
        let draw = self.draws.fetch_add(1, Ordering::Relaxed) + 1;

        Ok(RngOutput {
            stops,
            audit_token: AuditToken::new(format!("{}:{}", draw, hex::encode(seed))),
        })
    }

    /// Extract the seed from a token produced by this source
    pub fn seed_from_token(token: &AuditToken) -> Option<[u8; 32]> {
        let (_, seed_hex) = token.as_str().split_once(':')?;
        let bytes = hex::decode(seed_hex).ok()?;
        bytes.try_into().ok()
    }

    /// Check that `stops` is exactly what the token's seed produces for `upper_bounds`
    pub fn verify(token: &AuditToken, upper_bounds: &[u64], stops: &[u64]) -> bool {
        if check_bounds(upper_bounds).is_err() {
            return false;
        }
        Self::seed_from_token(token)
            .map(|seed| replay(seed, upper_bounds) == stops)
            .unwrap_or(false)
    }
}

impl RandomSource for ChaChaSource {
    async fn request(&self, upper_bounds: &[u64]) -> Result<RngOutput, RandomSourceError> {
        self.draw(upper_bounds)
    }
}
