//! Stop values → visible symbol window

use serde::{Deserialize, Serialize};

use crate::config::{GameConfig, SymbolId};
use crate::error::ResolutionError;
use crate::rng::RngOutput;

/// Visible window, row-major: `rows()[row][reel]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolMatrix {
    rows: Vec<Vec<SymbolId>>,
}

impl SymbolMatrix {
    /// Build from reel-indexed columns (`columns[reel][row]`)
    ///
    /// Strips wrap reel-wise but paylines are read row-wise, hence the
    /// transposition. All columns must have the same length.
    pub fn from_columns(columns: Vec<Vec<SymbolId>>) -> Self {
        let row_count = columns.first().map_or(0, Vec::len);
        let mut rows = vec![Vec::with_capacity(columns.len()); row_count];
        for column in columns {
            for (row, symbol) in column.into_iter().enumerate() {
                rows[row].push(symbol);
            }
        }
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<SymbolId>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn reel_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Symbol at a grid position
    pub fn get(&self, row: usize, reel: usize) -> Option<&str> {
        self.rows.get(row)?.get(reel).map(String::as_str)
    }

    /// Every position as `(row, reel, symbol)`
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &str)> {
        self.rows.iter().enumerate().flat_map(|(row, symbols)| {
            symbols
                .iter()
                .enumerate()
                .map(move |(reel, symbol)| (row, reel, symbol.as_str()))
        })
    }

    pub fn into_rows(self) -> Vec<Vec<SymbolId>> {
        self.rows
    }
}

/// Reduce a raw stop value onto a strip of `strip_len` symbols
pub fn stop_index(stop: u64, strip_len: usize) -> usize {
    (stop % strip_len as u64) as usize
}

/// Map one stop value per reel onto the configured strips
pub fn resolve(output: &RngOutput, config: &GameConfig) -> Result<SymbolMatrix, ResolutionError> {
    let grid = config.grid();
    if output.stops.len() != grid.reels {
        return Err(ResolutionError::CountMismatch {
            expected: grid.reels,
            actual: output.stops.len(),
        });
    }

    let columns = config
        .reel_strips()
        .iter()
        .zip(&output.stops)
        .map(|(strip, &stop)| {
            let start = stop_index(stop, strip.len());
            (0..grid.rows)
                .map(|row| strip[(start + row) % strip.len()].clone())
                .collect()
        })
        .collect();

    Ok(SymbolMatrix::from_columns(columns))
}

/// Reduced stop index for each reel, for audit records
pub fn stop_indices(output: &RngOutput, config: &GameConfig) -> Vec<usize> {
    config
        .reel_strips()
        .iter()
        .zip(&output.stops)
        .map(|(strip, &stop)| stop_index(stop, strip.len()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameDocument, GridSpec};
    use crate::rng::AuditToken;

    fn config(rows: usize, strips: Vec<Vec<&str>>) -> GameConfig {
        let reels = strips.len();
        GameConfig::from_document(GameDocument {
            game_code: "test".into(),
            grid: GridSpec { rows, reels },
            reel_strips: strips
                .into_iter()
                .map(|s| s.into_iter().map(String::from).collect())
                .collect(),
            paylines: vec![vec![0; reels]],
            paytable: Default::default(),
            wild_symbol: None,
            scatter_symbol: None,
            scatter_threshold: None,
            min_win_length: Some(1),
        })
        .unwrap()
    }

    fn output(stops: Vec<u64>) -> RngOutput {
        RngOutput {
            stops,
            audit_token: AuditToken::new("t"),
        }
    }

    #[test]
    fn test_stop_index_always_in_range() {
        for len in 1..40usize {
            for stop in [0, 1, 7, 39, 40, 1_000_003, u64::MAX - 1, u64::MAX] {
                let idx = stop_index(stop, len);
                assert!(idx < len);
                assert_eq!(idx as u64, stop % len as u64);
            }
        }
    }

    #[test]
    fn test_window_wraps_around_strip() {
        let config = config(3, vec![vec!["s0", "s1", "s2", "s3", "s4"]]);
        let matrix = resolve(&output(vec![4]), &config).unwrap();
        let column: Vec<_> = (0..3).map(|row| matrix.get(row, 0).unwrap()).collect();
        assert_eq!(column, vec!["s4", "s0", "s1"]);
    }

    #[test]
    fn test_raw_stop_reduced_modulo_strip_length() {
        let config = config(1, vec![vec!["a", "b", "c"], vec!["x", "y"]]);
        let matrix = resolve(&output(vec![7, 101]), &config).unwrap();
        assert_eq!(matrix.get(0, 0), Some("b"));
        assert_eq!(matrix.get(0, 1), Some("y"));
        assert_eq!(stop_indices(&output(vec![7, 101]), &config), vec![1, 1]);
    }

    #[test]
    fn test_matrix_is_row_major_with_configured_shape() {
        let config = config(
            4,
            vec![
                vec!["a0", "a1", "a2"],
                vec!["b0", "b1", "b2", "b3", "b4", "b5"],
                vec!["c0"],
            ],
        );
        let matrix = resolve(&output(vec![1, 5, 9]), &config).unwrap();
        assert_eq!(matrix.row_count(), 4);
        assert_eq!(matrix.reel_count(), 3);
        assert!(matrix.rows().iter().all(|row| row.len() == 3));
        assert_eq!(matrix.rows()[0], vec!["a1", "b5", "c0"]);
        assert_eq!(matrix.rows()[1], vec!["a2", "b0", "c0"]);
        assert_eq!(matrix.rows()[3], vec!["a1", "b2", "c0"]);
        assert_eq!(matrix.cells().count(), 12);
    }

    #[test]
    fn test_count_mismatch_reported() {
        let config = config(1, vec![vec!["a"], vec!["b"], vec!["c"]]);
        assert_eq!(
            resolve(&output(vec![0, 0]), &config),
            Err(ResolutionError::CountMismatch {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            resolve(&output(vec![0, 0, 0, 0]), &config),
            Err(ResolutionError::CountMismatch {
                expected: 3,
                actual: 4
            })
        );
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let config = config(3, vec![vec!["a", "b", "c", "d"]; 5]);
        let out = output(vec![3, 14, 15, 92, 65]);
        assert_eq!(resolve(&out, &config), resolve(&out, &config));
    }
}
