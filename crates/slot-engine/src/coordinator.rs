//! Spin coordinator: one spin, end to end
//!
//! ```text
//! Idle → AwaitingRandomness → Resolving → Evaluating → Complete
//!   └──────────────┴──────────────┴──────────→ Failed(kind)
//! ```
//!
//! The random source round trip is the only await point and is bounded by
//! the configured timeout. Dropping the future abandons that call; nothing
//! partial is ever returned.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::error::{RandomSourceError, SpinError};
use crate::evaluator::{evaluate, WinLine};
use crate::resolver::{resolve, stop_indices, SymbolMatrix};
use crate::rng::{AuditToken, RandomSource};

/// Default bound on the random source round trip
pub const DEFAULT_RNG_TIMEOUT: Duration = Duration::from_millis(2000);

/// Where a spin is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinPhase {
    Idle,
    AwaitingRandomness,
    Resolving,
    Evaluating,
    Complete,
}

/// Settled spin, returned to the caller and not retained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinResult {
    pub spin_id: String,
    pub player_id: String,
    pub game_code: String,
    pub bet: f64,
    pub matrix: SymbolMatrix,
    /// Reduced stop index per reel
    pub stop_indices: Vec<usize>,
    pub total_win: f64,
    pub win_lines: Vec<WinLine>,
    pub audit_token: AuditToken,
}

impl SpinResult {
    pub fn is_win(&self) -> bool {
        !self.win_lines.is_empty()
    }

    /// Win-to-bet ratio
    pub fn win_ratio(&self) -> f64 {
        if self.bet > 0.0 {
            self.total_win / self.bet
        } else {
            0.0
        }
    }
}

/// Runs spins against a random source
pub struct SpinCoordinator<R> {
    source: R,
    rng_timeout: Duration,
}

impl<R: RandomSource> SpinCoordinator<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            rng_timeout: DEFAULT_RNG_TIMEOUT,
        }
    }

    /// Bound the random source round trip
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.rng_timeout = timeout;
        self
    }

    pub fn rng_timeout(&self) -> Duration {
        self.rng_timeout
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    /// Resolve one spin for `player_id` at `bet` under `config`
    pub async fn spin(
        &self,
        player_id: &str,
        bet: f64,
        config: &GameConfig,
    ) -> Result<SpinResult, SpinError> {
        check_bet(bet)?;

        log::debug!(
            "[Spin] {} {:?} game={} bet={}",
            player_id,
            SpinPhase::AwaitingRandomness,
            config.game_code(),
            bet
        );
        let bounds = config.stop_bounds();
        let output = match tokio::time::timeout(self.rng_timeout, self.source.request(&bounds)).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                log::warn!("[Spin] {} random source failed: {}", player_id, err);
                return Err(SpinError::RngUnavailable(err));
            }
            Err(_) => {
                let err = RandomSourceError::Timeout {
                    timeout_ms: self.rng_timeout.as_millis() as u64,
                };
                log::warn!("[Spin] {} {}", player_id, err);
                return Err(SpinError::RngUnavailable(err));
            }
        };

        log::debug!("[Spin] {} {:?} stops={:?}", player_id, SpinPhase::Resolving, output.stops);
        let matrix = resolve(&output, config).map_err(|err| {
            log::error!(
                "[Spin] {} game '{}' disagrees with random source: {}",
                player_id,
                config.game_code(),
                err
            );
            SpinError::Resolution(err)
        })?;

        log::debug!("[Spin] {} {:?}", player_id, SpinPhase::Evaluating);
        let evaluation = evaluate(&matrix, config, bet);

        let result = SpinResult {
            spin_id: uuid::Uuid::new_v4().to_string(),
            player_id: player_id.to_string(),
            game_code: config.game_code().to_string(),
            bet,
            stop_indices: stop_indices(&output, config),
            matrix,
            total_win: evaluation.total_win,
            win_lines: evaluation.win_lines,
            audit_token: output.audit_token,
        };

        log::info!(
            "[Spin] {} {:?} spin={} game={} bet={} win={} lines={} audit={}",
            player_id,
            SpinPhase::Complete,
            result.spin_id,
            result.game_code,
            bet,
            result.total_win,
            result.win_lines.len(),
            result.audit_token
        );
        Ok(result)
    }
}

/// Bets must be finite and strictly positive
pub fn check_bet(bet: f64) -> Result<(), SpinError> {
    if bet.is_finite() && bet > 0.0 {
        Ok(())
    } else {
        Err(SpinError::InvalidBet { bet })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameDocument, GridSpec};
    use crate::error::ResolutionError;
    use crate::rng::{ChaChaSource, RngOutput};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted source that counts calls
    struct ScriptedSource {
        reply: Result<Vec<u64>, RandomSourceError>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        seen_bounds: parking_lot::Mutex<Vec<u64>>,
    }

    impl ScriptedSource {
        fn replying(stops: Vec<u64>) -> Self {
            Self {
                reply: Ok(stops),
                delay: None,
                calls: AtomicUsize::new(0),
                seen_bounds: parking_lot::Mutex::new(Vec::new()),
            }
        }

        fn failing(err: RandomSourceError) -> Self {
            Self {
                reply: Err(err),
                ..Self::replying(Vec::new())
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::replying(vec![0; 5])
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RandomSource for ScriptedSource {
        async fn request(&self, upper_bounds: &[u64]) -> Result<RngOutput, RandomSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_bounds.lock() = upper_bounds.to_vec();
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply.clone().map(|stops| RngOutput {
                stops,
                audit_token: AuditToken::new("audit-42"),
            })
        }
    }

    fn config() -> GameConfig {
        let strips = vec![
            vec!["A", "B", "C"],
            vec!["A", "B", "C", "D"],
            vec!["A", "B", "C", "D", "E"],
            vec!["A", "B"],
            vec!["A", "B", "C", "D", "E", "F"],
        ];
        GameConfig::from_document(GameDocument {
            game_code: "coord".into(),
            grid: GridSpec { rows: 3, reels: 5 },
            reel_strips: strips
                .into_iter()
                .map(|s| s.into_iter().map(String::from).collect())
                .collect(),
            paylines: vec![vec![0; 5], vec![1; 5]],
            paytable: [("A".to_string(), 4.0)].into_iter().collect(),
            wild_symbol: None,
            scatter_symbol: None,
            scatter_threshold: None,
            min_win_length: Some(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_bet_never_contacts_source() {
        let coordinator = SpinCoordinator::new(ScriptedSource::replying(vec![0; 5]));
        for bet in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = coordinator.spin("p1", bet, &config()).await.unwrap_err();
            assert!(matches!(err, SpinError::InvalidBet { .. }));
            assert_eq!(err.phase(), SpinPhase::Idle);
            assert!(!err.is_retryable());
        }
        assert_eq!(coordinator.source().calls(), 0);
    }

    #[tokio::test]
    async fn test_requests_per_reel_bounds() {
        let coordinator = SpinCoordinator::new(ScriptedSource::replying(vec![0; 5]));
        coordinator.spin("p1", 1.0, &config()).await.unwrap();
        assert_eq!(*coordinator.source().seen_bounds.lock(), vec![3, 4, 5, 2, 6]);
        assert_eq!(coordinator.source().calls(), 1);
    }

    #[tokio::test]
    async fn test_success_carries_audit_token_and_win() {
        let coordinator = SpinCoordinator::new(ScriptedSource::replying(vec![3, 8, 10, 4, 12]));
        let result = coordinator.spin("p1", 2.5, &config()).await.unwrap();

        assert_eq!(result.audit_token.as_str(), "audit-42");
        assert_eq!(result.stop_indices, vec![0, 0, 0, 0, 0]);
        assert_eq!(result.matrix.rows()[0], vec!["A"; 5]);
        assert_eq!(result.win_lines.len(), 1);
        assert_eq!(result.total_win, 10.0);
        assert_eq!(result.win_ratio(), 4.0);
        assert_eq!(result.player_id, "p1");
        assert_eq!(result.game_code, "coord");
    }

    #[tokio::test]
    async fn test_no_win_is_a_success() {
        let coordinator = SpinCoordinator::new(ScriptedSource::replying(vec![1, 1, 1, 1, 1]));
        let result = coordinator.spin("p1", 1.0, &config()).await.unwrap();
        assert!(!result.is_win());
        assert_eq!(result.total_win, 0.0);
    }

    #[tokio::test]
    async fn test_source_failure_is_rng_unavailable() {
        let coordinator = SpinCoordinator::new(ScriptedSource::failing(
            RandomSourceError::Unavailable("connection refused".into()),
        ));
        let err = coordinator.spin("p1", 1.0, &config()).await.unwrap_err();
        assert!(matches!(err, SpinError::RngUnavailable(RandomSourceError::Unavailable(_))));
        assert_eq!(err.phase(), SpinPhase::AwaitingRandomness);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let coordinator = SpinCoordinator::new(ScriptedSource::slow(Duration::from_secs(10)))
            .with_timeout(Duration::from_millis(20));
        let err = coordinator.spin("p1", 1.0, &config()).await.unwrap_err();
        assert_eq!(
            err,
            SpinError::RngUnavailable(RandomSourceError::Timeout { timeout_ms: 20 })
        );
    }

    #[tokio::test]
    async fn test_short_reply_is_resolution_error() {
        let coordinator = SpinCoordinator::new(ScriptedSource::replying(vec![0; 4]));
        let err = coordinator.spin("p1", 1.0, &config()).await.unwrap_err();
        assert_eq!(
            err,
            SpinError::Resolution(ResolutionError::CountMismatch {
                expected: 5,
                actual: 4
            })
        );
        assert_eq!(err.phase(), SpinPhase::Resolving);
        assert_eq!(err.kind(), "resolution");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_chacha_source_end_to_end() {
        let coordinator = SpinCoordinator::new(ChaChaSource::seeded(11));
        let config = config();
        let result = coordinator.spin("p1", 1.0, &config).await.unwrap();
        assert_eq!(result.matrix.row_count(), 3);
        assert_eq!(result.matrix.reel_count(), 5);
        assert!(ChaChaSource::verify(
            &result.audit_token,
            &config.stop_bounds(),
            &result.stop_indices.iter().map(|&i| i as u64).collect::<Vec<_>>()
        ));
    }
}
