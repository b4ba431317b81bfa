//! Payline and scatter evaluation

use serde::{Deserialize, Serialize};

use crate::config::{GameConfig, SymbolId};
use crate::resolver::SymbolMatrix;

/// A single paying combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinLine {
    /// Payline index; `None` marks the scatter win
    pub payline_index: Option<usize>,
    /// Symbol that was paid
    pub symbol: SymbolId,
    /// Matching reels from the left (scatter: occurrences in the window)
    pub run_length: usize,
    /// Win amount (multiplier × bet)
    pub payout: f64,
    /// Positions of the paying symbols as `(row, reel)`
    pub positions: Vec<(usize, usize)>,
}

impl WinLine {
    pub fn is_scatter(&self) -> bool {
        self.payline_index.is_none()
    }
}

/// Outcome of evaluating one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub total_win: f64,
    /// Line wins in payline order, then the scatter win
    pub win_lines: Vec<WinLine>,
}

impl Evaluation {
    pub fn is_win(&self) -> bool {
        !self.win_lines.is_empty()
    }
}

/// Evaluate every payline and the scatter rule against a window
pub fn evaluate(matrix: &SymbolMatrix, config: &GameConfig, bet: f64) -> Evaluation {
    let mut win_lines: Vec<WinLine> = config
        .paylines()
        .iter()
        .enumerate()
        .filter_map(|(index, payline)| evaluate_line(matrix, config, index, payline, bet))
        .collect();

    if let Some(win) = evaluate_scatter(matrix, config, bet) {
        win_lines.push(win);
    }

    // Fold from +0.0: an empty f64 sum is -0.0
    let total_win = win_lines.iter().fold(0.0, |acc, w| acc + w.payout);
    Evaluation {
        total_win,
        win_lines,
    }
}

fn evaluate_line(
    matrix: &SymbolMatrix,
    config: &GameConfig,
    index: usize,
    payline: &[usize],
    bet: f64,
) -> Option<WinLine> {
    let wild = config.wild_symbol();

    // Validation guarantees every position is inside the window
    let line_symbols: Vec<&str> = payline
        .iter()
        .enumerate()
        .map(|(reel, &row)| matrix.get(row, reel))
        .collect::<Option<_>>()?;

    // First non-wild symbol; an all-wild line pays as wild
    let base = line_symbols
        .iter()
        .copied()
        .find(|&s| Some(s) != wild)
        .or(wild)?;

    let run_length = line_symbols
        .iter()
        .take_while(|&&s| s == base || Some(s) == wild)
        .count();
    if run_length < config.min_win_length() {
        return None;
    }

    let payout = config.multiplier(base) * bet;
    if payout <= 0.0 {
        return None;
    }

    Some(WinLine {
        payline_index: Some(index),
        symbol: base.to_string(),
        run_length,
        payout,
        positions: payline
            .iter()
            .take(run_length)
            .enumerate()
            .map(|(reel, &row)| (row, reel))
            .collect(),
    })
}

fn evaluate_scatter(matrix: &SymbolMatrix, config: &GameConfig, bet: f64) -> Option<WinLine> {
    let scatter = config.scatter_symbol()?;

    let positions: Vec<(usize, usize)> = matrix
        .cells()
        .filter(|(_, _, symbol)| *symbol == scatter)
        .map(|(row, reel, _)| (row, reel))
        .collect();

    if positions.len() < config.scatter_threshold() {
        return None;
    }

    let payout = config.multiplier(scatter) * bet;
    if payout <= 0.0 {
        return None;
    }

    Some(WinLine {
        payline_index: None,
        symbol: scatter.to_string(),
        run_length: positions.len(),
        payout,
        positions,
    })
}
