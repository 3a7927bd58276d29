use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::Serialize;

use crate::boxscore::{GameRecord, Phase, chronological};
use crate::validation::ValidationReport;

pub const DEFAULT_ACTIVITY_THRESHOLD: usize = 10;

#[derive(Debug, Clone)]
pub struct SeriesConfig {
    /// Minimum active games for a player to carry derived statistics and be
    /// eligible for a dedicated model.
    pub activity_threshold: usize,
    /// Minimum series length for the lag-1 autocorrelation to be defined.
    pub min_autocorr_window: usize,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            activity_threshold: DEFAULT_ACTIVITY_THRESHOLD,
            min_autocorr_window: DEFAULT_ACTIVITY_THRESHOLD,
        }
    }
}

/// One active game of a player's series, in chronological position, with the
/// lag/context fields the models consume.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesGame {
    pub game_id: u32,
    pub round: u32,
    pub phase: Phase,
    pub is_playoff: bool,
    pub is_home: bool,
    pub seconds_played: u32,
    pub points: u32,
    pub valuation: i32,
    pub plus_minus: i32,
    /// Points in the immediately preceding active game. Absent (never zero)
    /// on the chronologically first record of the series.
    pub previous_game_points: Option<u32>,
}

/// Summary statistics over a player's active games. Statistics whose minimum
/// sample requirement is not met are absent, never defaulted.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesStats {
    pub active_games: usize,
    pub points_mean: f64,
    pub points_std: Option<f64>,
    pub valuation_mean: f64,
    pub valuation_std: Option<f64>,
    pub plus_minus_mean: f64,
    pub plus_minus_std: Option<f64>,
    pub points_lag1_autocorr: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSeries {
    pub player_id: String,
    pub games: Vec<SeriesGame>,
    pub stats: SeriesStats,
}

/// Output of the feature builder: the eligible series plus the active-game
/// counts of the players the activity threshold excluded (the harness reports
/// those counts in its insufficient-data errors).
#[derive(Debug, Clone)]
pub struct SeriesSet {
    pub team_code: String,
    pub series: BTreeMap<String, PlayerSeries>,
    pub excluded: BTreeMap<String, usize>,
}

/// Builds per-player chronological series from a validated record set. The
/// `ValidationReport` of the same records is required input; it supplies the
/// team code used for the home/away flag.
pub fn build_player_series(
    records: &[GameRecord],
    report: &ValidationReport,
    config: &SeriesConfig,
) -> SeriesSet {
    let mut by_player: HashMap<&str, Vec<&GameRecord>> = HashMap::new();
    for record in records {
        if record.is_team_totals() || !record.is_playing {
            continue;
        }
        by_player.entry(&record.player_id).or_default().push(record);
    }

    let mut eligible: Vec<(&str, Vec<&GameRecord>)> = Vec::new();
    let mut excluded: BTreeMap<String, usize> = BTreeMap::new();
    for (player_id, rows) in by_player {
        if rows.len() >= config.activity_threshold {
            eligible.push((player_id, rows));
        } else {
            excluded.insert(player_id.to_string(), rows.len());
        }
    }

    let series: BTreeMap<String, PlayerSeries> = eligible
        .into_par_iter()
        .map(|(player_id, rows)| {
            let series = build_series(player_id, rows, report, config);
            (player_id.to_string(), series)
        })
        .collect();

    SeriesSet {
        team_code: report.team_code.clone(),
        series,
        excluded,
    }
}

fn build_series(
    player_id: &str,
    mut rows: Vec<&GameRecord>,
    report: &ValidationReport,
    config: &SeriesConfig,
) -> PlayerSeries {
    rows.sort_by(|a, b| chronological(a, b));

    let mut games = Vec::with_capacity(rows.len());
    let mut previous_points: Option<u32> = None;
    for row in &rows {
        let is_home = row
            .game_code_tokens()
            .is_some_and(|(home, _)| home == report.team_code);
        games.push(SeriesGame {
            game_id: row.game_id,
            round: row.round,
            phase: row.phase,
            is_playoff: row.phase == Phase::Playoffs,
            is_home,
            seconds_played: row.seconds_played,
            points: row.points,
            valuation: row.valuation,
            plus_minus: row.plus_minus,
            previous_game_points: previous_points,
        });
        previous_points = Some(row.points);
    }

    let points: Vec<f64> = games.iter().map(|g| g.points as f64).collect();
    let valuations: Vec<f64> = games.iter().map(|g| g.valuation as f64).collect();
    let plus_minus: Vec<f64> = games.iter().map(|g| g.plus_minus as f64).collect();

    let stats = SeriesStats {
        active_games: games.len(),
        points_mean: mean(&points),
        points_std: sample_std(&points),
        valuation_mean: mean(&valuations),
        valuation_std: sample_std(&valuations),
        plus_minus_mean: mean(&plus_minus),
        plus_minus_std: sample_std(&plus_minus),
        points_lag1_autocorr: lag1_autocorr(&points, config.min_autocorr_window),
    };

    PlayerSeries {
        player_id: player_id.to_string(),
        games,
        stats,
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n−1 denominator). Undefined below two samples.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (n - 1) as f64;
    Some(var.sqrt())
}

/// Pearson correlation between the series and itself shifted by one
/// position, over the n−1 overlapping pairs. Undefined below `min_window`
/// samples or when either side of the pairing has zero variance.
pub fn lag1_autocorr(values: &[f64], min_window: usize) -> Option<f64> {
    let n = values.len();
    if n < min_window.max(2) {
        return None;
    }
    let lead = &values[..n - 1];
    let lag = &values[1..];
    let mean_lead = mean(lead);
    let mean_lag = mean(lag);

    let mut cov = 0.0;
    let mut var_lead = 0.0;
    let mut var_lag = 0.0;
    for (a, b) in lead.iter().zip(lag) {
        cov += (a - mean_lead) * (b - mean_lag);
        var_lead += (a - mean_lead) * (a - mean_lead);
        var_lag += (b - mean_lag) * (b - mean_lag);
    }
    let denom = (var_lead * var_lag).sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    Some(cov / denom)
}
