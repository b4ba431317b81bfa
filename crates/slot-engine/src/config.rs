//! Game configuration: document format, validation and the shared store
//!
//! A [`GameConfig`] only exists after validation. Once built it is never
//! mutated; the [`ConfigStore`] hands out `Arc`s and replaces whole instances
//! on reload, so a spin keeps reading the config it started with.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Symbol identifier as written in reel strips and the paytable
pub type SymbolId = String;

/// Run length that pays when the document does not say otherwise
pub const DEFAULT_MIN_WIN_LENGTH: usize = 3;

/// Scatter count that pays when the document does not say otherwise
pub const DEFAULT_SCATTER_THRESHOLD: usize = 3;

/// Grid specification (rows × reels)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of visible rows per reel
    pub rows: usize,
    /// Number of reels (columns)
    pub reels: usize,
}

impl GridSpec {
    /// Standard 3×5 layout
    pub fn standard_3x5() -> Self {
        Self { rows: 3, reels: 5 }
    }

    /// Total grid positions
    pub fn total_positions(&self) -> usize {
        self.rows * self.reels
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::standard_3x5()
    }
}

/// Game definition as it appears on disk, before validation
///
/// Accepts camelCase names and the snake_case spelling older documents use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDocument {
    #[serde(alias = "game_code")]
    pub game_code: String,
    pub grid: GridSpec,
    #[serde(alias = "reel_strips")]
    pub reel_strips: Vec<Vec<SymbolId>>,
    #[serde(default)]
    pub paylines: Vec<Vec<usize>>,
    #[serde(default)]
    pub paytable: BTreeMap<SymbolId, f64>,
    #[serde(default, alias = "wild_symbol")]
    pub wild_symbol: Option<SymbolId>,
    #[serde(default, alias = "scatter_symbol")]
    pub scatter_symbol: Option<SymbolId>,
    #[serde(default, alias = "scatter_threshold")]
    pub scatter_threshold: Option<usize>,
    #[serde(default, alias = "min_win_length")]
    pub min_win_length: Option<usize>,
}

/// Validated, immutable game definition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    game_code: String,
    grid: GridSpec,
    reel_strips: Vec<Vec<SymbolId>>,
    paylines: Vec<Vec<usize>>,
    paytable: BTreeMap<SymbolId, f64>,
    wild_symbol: Option<SymbolId>,
    scatter_symbol: Option<SymbolId>,
    scatter_threshold: usize,
    min_win_length: usize,
}

impl GameConfig {
    /// Validate a document and freeze it into a config
    pub fn from_document(doc: GameDocument) -> ConfigResult<Self> {
        if doc.game_code.trim().is_empty() {
            return Err(ConfigError::invalid("gameCode", "must not be empty"));
        }

        let GridSpec { rows, reels } = doc.grid;
        if rows == 0 {
            return Err(ConfigError::invalid("grid.rows", "must be positive"));
        }
        if reels == 0 {
            return Err(ConfigError::invalid("grid.reels", "must be positive"));
        }

        if doc.reel_strips.len() != reels {
            return Err(ConfigError::invalid(
                "reelStrips",
                format!("expected {} strips, found {}", reels, doc.reel_strips.len()),
            ));
        }
        for (reel, strip) in doc.reel_strips.iter().enumerate() {
            if strip.is_empty() {
                return Err(ConfigError::invalid(
                    format!("reelStrips[{reel}]"),
                    "strip must not be empty",
                ));
            }
        }

        for (line, positions) in doc.paylines.iter().enumerate() {
            if positions.len() != reels {
                return Err(ConfigError::invalid(
                    format!("paylines[{line}]"),
                    format!("expected {} row indices, found {}", reels, positions.len()),
                ));
            }
            if let Some((reel, row)) = positions.iter().enumerate().find(|(_, row)| **row >= rows) {
                return Err(ConfigError::invalid(
                    format!("paylines[{line}][{reel}]"),
                    format!("row {row} out of range 0..{rows}"),
                ));
            }
        }

        for (symbol, multiplier) in &doc.paytable {
            if !multiplier.is_finite() || *multiplier < 0.0 {
                return Err(ConfigError::invalid(
                    format!("paytable.{symbol}"),
                    format!("multiplier must be a non-negative number, got {multiplier}"),
                ));
            }
        }

        let min_win_length = doc
            .min_win_length
            .unwrap_or_else(|| DEFAULT_MIN_WIN_LENGTH.min(reels));
        if min_win_length == 0 || min_win_length > reels {
            return Err(ConfigError::invalid(
                "minWinLength",
                format!("must be within 1..={reels}, got {min_win_length}"),
            ));
        }

        if let (Some(wild), Some(scatter)) = (&doc.wild_symbol, &doc.scatter_symbol) {
            if wild == scatter {
                return Err(ConfigError::invalid(
                    "scatterSymbol",
                    "must differ from wildSymbol",
                ));
            }
        }

        let scatter_threshold = match (&doc.scatter_symbol, doc.scatter_threshold) {
            (None, Some(_)) => {
                return Err(ConfigError::invalid(
                    "scatterThreshold",
                    "set without a scatterSymbol",
                ));
            }
            (_, Some(0)) => {
                return Err(ConfigError::invalid("scatterThreshold", "must be positive"));
            }
            (_, threshold) => threshold.unwrap_or(DEFAULT_SCATTER_THRESHOLD),
        };

        Ok(Self {
            game_code: doc.game_code,
            grid: doc.grid,
            reel_strips: doc.reel_strips,
            paylines: doc.paylines,
            paytable: doc.paytable,
            wild_symbol: doc.wild_symbol,
            scatter_symbol: doc.scatter_symbol,
            scatter_threshold,
            min_win_length,
        })
    }

    pub fn game_code(&self) -> &str {
        &self.game_code
    }

    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    pub fn reel_strips(&self) -> &[Vec<SymbolId>] {
        &self.reel_strips
    }

    pub fn paylines(&self) -> &[Vec<usize>] {
        &self.paylines
    }

    pub fn paytable(&self) -> &BTreeMap<SymbolId, f64> {
        &self.paytable
    }

    /// Multiplier for a symbol; symbols missing from the paytable pay nothing
    pub fn multiplier(&self, symbol: &str) -> f64 {
        self.paytable.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn wild_symbol(&self) -> Option<&str> {
        self.wild_symbol.as_deref()
    }

    pub fn scatter_symbol(&self) -> Option<&str> {
        self.scatter_symbol.as_deref()
    }

    pub fn scatter_threshold(&self) -> usize {
        self.scatter_threshold
    }

    pub fn min_win_length(&self) -> usize {
        self.min_win_length
    }

    /// Exclusive upper bound for each reel's stop value (its strip length)
    pub fn stop_bounds(&self) -> Vec<u64> {
        self.reel_strips.iter().map(|strip| strip.len() as u64).collect()
    }
}

/// Where a game definition comes from
#[derive(Debug, Clone, Copy)]
pub enum ConfigSource<'a> {
    Json(&'a str),
    Yaml(&'a str),
    /// File path; `.json`, `.yaml` and `.yml` are recognised
    File(&'a Path),
}

/// Holds every published game definition, keyed by game code
#[derive(Debug, Default)]
pub struct ConfigStore {
    games: RwLock<HashMap<String, Arc<GameConfig>>>,
}

impl ConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a game definition
    pub fn load(source: ConfigSource<'_>) -> ConfigResult<GameConfig> {
        let doc: GameDocument = match source {
            ConfigSource::Json(text) => {
                serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            ConfigSource::Yaml(text) => {
                serde_yml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            ConfigSource::File(path) => {
                let text = std::fs::read_to_string(path)?;
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_default();
                return match ext.as_str() {
                    "json" => Self::load(ConfigSource::Json(&text)),
                    "yaml" | "yml" => Self::load(ConfigSource::Yaml(&text)),
                    other => Err(ConfigError::UnsupportedFormat(format!(
                        "{} (extension `{}`)",
                        path.display(),
                        other
                    ))),
                };
            }
        };

        let config = GameConfig::from_document(doc)?;
        log::info!(
            "[ConfigStore] Loaded game '{}' ({}x{}, {} paylines)",
            config.game_code(),
            config.grid().rows,
            config.grid().reels,
            config.paylines().len()
        );
        Ok(config)
    }

    /// Install a config under its game code, returning the instance it replaced
    pub fn publish(&self, config: GameConfig) -> Option<Arc<GameConfig>> {
        let code = config.game_code().to_string();
        self.games.write().insert(code, Arc::new(config))
    }

    /// Install a batch of configs under one write lock
    pub fn publish_all(&self, configs: impl IntoIterator<Item = GameConfig>) {
        let fresh: Vec<_> = configs
            .into_iter()
            .map(|c| (c.game_code().to_string(), Arc::new(c)))
            .collect();
        let mut games = self.games.write();
        for (code, config) in fresh {
            games.insert(code, config);
        }
    }

    /// Snapshot of the current config for a game
    pub fn get(&self, game_code: &str) -> Option<Arc<GameConfig>> {
        self.games.read().get(game_code).cloned()
    }

    /// Published game codes, sorted
    pub fn game_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.games.read().keys().cloned().collect();
        codes.sort();
        codes
    }

    pub fn len(&self) -> usize {
        self.games.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.read().is_empty()
    }
}

impl FromIterator<GameConfig> for ConfigStore {
    fn from_iter<I: IntoIterator<Item = GameConfig>>(iter: I) -> Self {
        let store = ConfigStore::new();
        store.publish_all(iter);
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> String {
        r#"{
            "gameCode": "aurora_star",
            "grid": { "rows": 3, "reels": 5 },
            "reelStrips": [
                ["S_WILD", "S_HIGH_A", "S_LOW_E", "S_HIGH_A", "S_LOW_D"],
                ["S_HIGH_A", "S_SCATTER", "S_LOW_D", "S_HIGH_A", "S_WILD"],
                ["S_LOW_E", "S_WILD", "S_SCATTER", "S_LOW_D", "S_LOW_E"],
                ["S_HIGH_A", "S_LOW_D", "S_WILD", "S_HIGH_A", "S_SCATTER"],
                ["S_SCATTER", "S_LOW_E", "S_HIGH_A", "S_WILD", "S_LOW_D"]
            ],
            "paylines": [[1,1,1,1,1], [0,0,0,0,0], [2,2,2,2,2]],
            "paytable": { "S_WILD": 100, "S_SCATTER": 50, "S_HIGH_A": 20, "S_LOW_D": 10, "S_LOW_E": 5 },
            "wildSymbol": "S_WILD",
            "scatterSymbol": "S_SCATTER"
        }"#
        .to_string()
    }

    fn sample_doc() -> GameDocument {
        serde_json::from_str(&sample_json()).unwrap()
    }

    fn invalid_field(doc: GameDocument) -> String {
        match GameConfig::from_document(doc) {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected invalid field, got {other:?}"),
        }
    }

    #[test]
    fn test_load_json_applies_defaults() {
        let config = ConfigStore::load(ConfigSource::Json(&sample_json())).unwrap();
        assert_eq!(config.game_code(), "aurora_star");
        assert_eq!(config.grid(), GridSpec::standard_3x5());
        assert_eq!(config.min_win_length(), DEFAULT_MIN_WIN_LENGTH);
        assert_eq!(config.scatter_threshold(), DEFAULT_SCATTER_THRESHOLD);
        assert_eq!(config.stop_bounds(), vec![5, 5, 5, 5, 5]);
        assert_eq!(config.multiplier("S_HIGH_A"), 20.0);
        assert_eq!(config.multiplier("S_UNKNOWN"), 0.0);
    }

    #[test]
    fn test_load_snake_case_aliases() {
        let json = r#"{
            "game_code": "legacy",
            "grid": { "rows": 1, "reels": 2 },
            "reel_strips": [["A"], ["A", "B"]],
            "paylines": [[0, 0]],
            "min_win_length": 2
        }"#;
        let config = ConfigStore::load(ConfigSource::Json(json)).unwrap();
        assert_eq!(config.game_code(), "legacy");
        assert_eq!(config.min_win_length(), 2);
        assert_eq!(config.stop_bounds(), vec![1, 2]);
    }

    #[test]
    fn test_load_yaml() {
        let yaml = "
gameCode: yaml_game
grid: { rows: 2, reels: 3 }
reelStrips:
  - [A, B]
  - [A, B, C]
  - [C]
paylines:
  - [0, 1, 1]
paytable:
  A: 2.5
";
        let config = ConfigStore::load(ConfigSource::Yaml(yaml)).unwrap();
        assert_eq!(config.grid(), GridSpec { rows: 2, reels: 3 });
        assert_eq!(config.multiplier("A"), 2.5);
        assert!(config.wild_symbol().is_none());
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        let err = ConfigStore::load(ConfigSource::Json("{ not json")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_names_offending_field() {
        let mut doc = sample_doc();
        doc.game_code = "  ".into();
        assert_eq!(invalid_field(doc), "gameCode");

        let mut doc = sample_doc();
        doc.grid.rows = 0;
        assert_eq!(invalid_field(doc), "grid.rows");

        let mut doc = sample_doc();
        doc.grid.reels = 0;
        assert_eq!(invalid_field(doc), "grid.reels");

        let mut doc = sample_doc();
        doc.reel_strips.pop();
        assert_eq!(invalid_field(doc), "reelStrips");

        let mut doc = sample_doc();
        doc.reel_strips[2].clear();
        assert_eq!(invalid_field(doc), "reelStrips[2]");

        let mut doc = sample_doc();
        doc.paylines[1] = vec![0, 0, 0, 0];
        assert_eq!(invalid_field(doc), "paylines[1]");

        let mut doc = sample_doc();
        doc.paylines[2] = vec![0, 1, 3, 1, 0];
        assert_eq!(invalid_field(doc), "paylines[2][2]");

        let mut doc = sample_doc();
        doc.paytable.insert("S_LOW_E".into(), -1.0);
        assert_eq!(invalid_field(doc), "paytable.S_LOW_E");

        let mut doc = sample_doc();
        doc.min_win_length = Some(6);
        assert_eq!(invalid_field(doc), "minWinLength");

        let mut doc = sample_doc();
        doc.scatter_threshold = Some(0);
        assert_eq!(invalid_field(doc), "scatterThreshold");

        let mut doc = sample_doc();
        doc.scatter_symbol = None;
        doc.scatter_threshold = Some(3);
        assert_eq!(invalid_field(doc), "scatterThreshold");

        let mut doc = sample_doc();
        doc.scatter_symbol = Some("S_WILD".into());
        assert_eq!(invalid_field(doc), "scatterSymbol");
    }

    #[test]
    fn test_default_min_win_length_clamped_to_reels() {
        let mut doc = sample_doc();
        doc.grid.reels = 2;
        doc.reel_strips.truncate(2);
        doc.paylines = vec![vec![0, 0]];
        let config = GameConfig::from_document(doc).unwrap();
        assert_eq!(config.min_win_length(), 2);
    }

    #[test]
    fn test_store_publish_replaces_whole_instance() {
        let store = ConfigStore::new();
        assert!(store.is_empty());

        let first = GameConfig::from_document(sample_doc()).unwrap();
        assert!(store.publish(first).is_none());
        let snapshot = store.get("aurora_star").unwrap();

        let mut doc = sample_doc();
        doc.paytable.insert("S_HIGH_A".into(), 40.0);
        let previous = store.publish(GameConfig::from_document(doc).unwrap()).unwrap();

        // Readers holding the old Arc still see the old values
        assert_eq!(snapshot.multiplier("S_HIGH_A"), 20.0);
        assert!(Arc::ptr_eq(&snapshot, &previous));
        assert_eq!(store.get("aurora_star").unwrap().multiplier("S_HIGH_A"), 40.0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_from_iter_sorted_codes() {
        let mut a = sample_doc();
        a.game_code = "zeta".into();
        let mut b = sample_doc();
        b.game_code = "alpha".into();
        let store: ConfigStore = [a, b]
            .into_iter()
            .map(|d| GameConfig::from_document(d).unwrap())
            .collect();
        assert_eq!(store.game_codes(), vec!["alpha".to_string(), "zeta".to_string()]);
        assert!(store.get("missing").is_none());
    }
}
