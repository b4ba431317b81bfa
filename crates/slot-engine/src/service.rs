//! Transport-agnostic game service: `Spin(playerId, gameCode, betAmount)`

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ConfigStore;
use crate::coordinator::{check_bet, SpinCoordinator, SpinResult};
use crate::error::SpinError;
use crate::rng::RandomSource;

/// Logical spin request as any transport carries it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinRequest {
    pub player_id: String,
    pub game_code: String,
    pub bet_amount: f64,
}

impl SpinRequest {
    pub fn new(player_id: impl Into<String>, game_code: impl Into<String>, bet_amount: f64) -> Self {
        Self {
            player_id: player_id.into(),
            game_code: game_code.into(),
            bet_amount,
        }
    }
}

/// Game lookup plus spin coordination
pub struct GameService<R> {
    store: Arc<ConfigStore>,
    coordinator: SpinCoordinator<R>,
}

impl<R: RandomSource> GameService<R> {
    pub fn new(store: Arc<ConfigStore>, coordinator: SpinCoordinator<R>) -> Self {
        Self { store, coordinator }
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &SpinCoordinator<R> {
        &self.coordinator
    }

    /// Run one spin against the game's current config
    ///
    /// The config is snapshotted up front; a reload published mid-spin
    /// affects only later requests.
    pub async fn spin(&self, request: &SpinRequest) -> Result<SpinResult, SpinError> {
        check_bet(request.bet_amount)?;

        let config = self.store.get(&request.game_code).ok_or_else(|| {
            log::warn!(
                "[GameService] {} requested unknown game '{}'",
                request.player_id,
                request.game_code
            );
            SpinError::UnknownGame(request.game_code.clone())
        })?;

        self.coordinator
            .spin(&request.player_id, request.bet_amount, &config)
            .await
    }
}
