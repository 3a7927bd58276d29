use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::ensemble::{EnsembleConfig, fit_bagged};
use crate::errors::AnalysisError;
use crate::features::{DEFAULT_ACTIVITY_THRESHOLD, PlayerSeries, SeriesGame, SeriesSet};
use crate::regression::{FEATURE_COUNT, FEATURE_NAMES, Sample, evaluate, fit_ols, split_indices};

pub const DEFAULT_HOLDOUT_FRACTION: f64 = 0.2;
pub const DEFAULT_SEED: u64 = 2024;

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub seed: u64,
    pub holdout_fraction: f64,
    pub activity_threshold: usize,
    pub ensemble: EnsembleConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            holdout_fraction: DEFAULT_HOLDOUT_FRACTION,
            activity_threshold: DEFAULT_ACTIVITY_THRESHOLD,
            ensemble: EnsembleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ModelScope {
    Global,
    Player(String),
}

impl ModelScope {
    pub fn label(&self) -> String {
        match self {
            ModelScope::Global => "global".to_string(),
            ModelScope::Player(id) => format!("player {id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelKind {
    Linear,
    BaggedTrees,
}

impl ModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::BaggedTrees => "bagged_trees",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelResult {
    pub scope: ModelScope,
    pub kind: ModelKind,
    pub feature_names: Vec<String>,
    /// Present for linear fits.
    pub intercept: Option<f64>,
    /// Per-feature coefficients; empty for the ensemble.
    pub coefficients: Vec<f64>,
    /// Per-feature relative importances summing to 1; empty for linear fits.
    pub importances: Vec<f64>,
    pub r2: f64,
    pub mse: f64,
    pub rmse: f64,
    pub train_samples: usize,
    pub holdout_samples: usize,
}

/// One requested player's outcome. A player below the activity threshold
/// carries its own `InsufficientData` error and leaves every sibling fit
/// untouched.
#[derive(Debug)]
pub struct PlayerModel {
    pub player_id: String,
    pub outcome: Result<ModelResult, AnalysisError>,
}

#[derive(Debug)]
pub struct HarnessOutput {
    pub global: Vec<ModelResult>,
    pub players: Vec<PlayerModel>,
}

/// Rows a series contributes to modeling: every active game with a defined
/// `previous_game_points`. Series-first games are excluded, never imputed.
fn series_samples(series: &PlayerSeries) -> Vec<Sample> {
    series.games.iter().filter_map(sample_from).collect()
}

fn sample_from(game: &SeriesGame) -> Option<Sample> {
    let previous = game.previous_game_points?;
    Some(Sample {
        x: [
            game.seconds_played as f64,
            previous as f64,
            if game.is_playoff { 1.0 } else { 0.0 },
            if game.is_home { 1.0 } else { 0.0 },
        ],
        y: game.points as f64,
    })
}

/// Pooled global training rows, concatenated in deterministic player order.
pub fn pooled_samples(series: &BTreeMap<String, PlayerSeries>) -> Vec<Sample> {
    series.values().flat_map(|s| series_samples(s)).collect()
}

/// Fits the global linear and bagged-ensemble models on the pooled set, then
/// one linear model per requested roster player. An empty roster requests
/// every eligible player.
pub fn run_harness(
    set: &SeriesSet,
    roster: &[String],
    config: &HarnessConfig,
) -> Result<HarnessOutput, AnalysisError> {
    let pooled = pooled_samples(&set.series);
    let required = config.activity_threshold.max(2);
    if pooled.len() < required {
        return Err(AnalysisError::insufficient(
            "global model pool",
            pooled.len(),
            required,
        ));
    }

    let (train, holdout) = partition(&pooled, config);
    let mut global = Vec::with_capacity(2);
    global.push(linear_result(ModelScope::Global, &train, &holdout));
    global.push(bagged_result(ModelScope::Global, &train, &holdout, config));

    let roster: Vec<String> = if roster.is_empty() {
        set.series.keys().cloned().collect()
    } else {
        roster.to_vec()
    };

    let players: Vec<PlayerModel> = roster
        .par_iter()
        .map(|player_id| PlayerModel {
            player_id: player_id.clone(),
            outcome: fit_player(set, player_id, config),
        })
        .collect();

    Ok(HarnessOutput { global, players })
}

fn fit_player(
    set: &SeriesSet,
    player_id: &str,
    config: &HarnessConfig,
) -> Result<ModelResult, AnalysisError> {
    let Some(series) = set.series.get(player_id) else {
        let observed = set.excluded.get(player_id).copied().unwrap_or(0);
        return Err(AnalysisError::insufficient(
            format!("player {player_id}"),
            observed,
            config.activity_threshold,
        ));
    };
    if series.games.len() < config.activity_threshold {
        return Err(AnalysisError::insufficient(
            format!("player {player_id}"),
            series.games.len(),
            config.activity_threshold,
        ));
    }

    let samples = series_samples(series);
    if samples.len() < 2 {
        return Err(AnalysisError::insufficient(
            format!("player {player_id}"),
            samples.len(),
            2,
        ));
    }

    let (train, holdout) = partition(&samples, config);
    Ok(linear_result(
        ModelScope::Player(player_id.to_string()),
        &train,
        &holdout,
    ))
}

/// The one split procedure every scope reuses: same seed, same fraction.
fn partition(samples: &[Sample], config: &HarnessConfig) -> (Vec<Sample>, Vec<Sample>) {
    let (train_idx, holdout_idx) =
        split_indices(samples.len(), config.holdout_fraction, config.seed);
    let train = train_idx.iter().map(|&i| samples[i]).collect();
    let holdout = holdout_idx.iter().map(|&i| samples[i]).collect();
    (train, holdout)
}

fn linear_result(scope: ModelScope, train: &[Sample], holdout: &[Sample]) -> ModelResult {
    let fit = fit_ols(train);
    let predictions: Vec<f64> = holdout.iter().map(|s| fit.predict(&s.x)).collect();
    let actuals: Vec<f64> = holdout.iter().map(|s| s.y).collect();
    let metrics = evaluate(&predictions, &actuals);
    ModelResult {
        scope,
        kind: ModelKind::Linear,
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        intercept: Some(fit.intercept),
        coefficients: fit.coefficients.to_vec(),
        importances: Vec::new(),
        r2: metrics.r2,
        mse: metrics.mse,
        rmse: metrics.rmse,
        train_samples: train.len(),
        holdout_samples: holdout.len(),
    }
}

fn bagged_result(
    scope: ModelScope,
    train: &[Sample],
    holdout: &[Sample],
    config: &HarnessConfig,
) -> ModelResult {
    let forest = fit_bagged(train, &config.ensemble, config.seed);
    let predictions: Vec<f64> = holdout.iter().map(|s| forest.predict(&s.x)).collect();
    let actuals: Vec<f64> = holdout.iter().map(|s| s.y).collect();
    let metrics = evaluate(&predictions, &actuals);
    ModelResult {
        scope,
        kind: ModelKind::BaggedTrees,
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        intercept: None,
        coefficients: Vec::new(),
        importances: forest.importances.to_vec(),
        r2: metrics.r2,
        mse: metrics.mse,
        rmse: metrics.rmse,
        train_samples: train.len(),
        holdout_samples: holdout.len(),
    }
}
