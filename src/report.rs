use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::Utc;
use serde::Serialize;

use crate::features::SeriesStats;
use crate::harness::{ModelKind, ModelResult};
use crate::pipeline::{PipelineConfig, SeasonAnalysis};

pub const ARTIFACT_VERSION: u32 = 1;

/// Versioned, serialisable snapshot of one season run: the figures an
/// external reporting collaborator consumes.
#[derive(Debug, Serialize)]
pub struct AnalysisArtifact {
    pub version: u32,
    pub generated_at: String,
    pub team_code: String,
    pub seed: u64,
    pub holdout_fraction: f64,
    pub activity_threshold: usize,
    pub games: usize,
    pub unassigned_totals: BTreeMap<&'static str, i64>,
    pub player_stats: BTreeMap<String, SeriesStats>,
    pub models: Vec<ModelResult>,
    pub model_errors: Vec<ModelErrorEntry>,
}

#[derive(Debug, Serialize)]
pub struct ModelErrorEntry {
    pub player_id: String,
    pub error: String,
}

pub fn build_artifact(analysis: &SeasonAnalysis, config: &PipelineConfig) -> AnalysisArtifact {
    let player_stats: BTreeMap<String, SeriesStats> = analysis
        .series
        .series
        .iter()
        .map(|(id, series)| (id.clone(), series.stats.clone()))
        .collect();

    let mut models: Vec<ModelResult> = analysis.models.global.clone();
    let mut model_errors = Vec::new();
    for player in &analysis.models.players {
        match &player.outcome {
            Ok(result) => models.push(result.clone()),
            Err(err) => model_errors.push(ModelErrorEntry {
                player_id: player.player_id.clone(),
                error: err.to_string(),
            }),
        }
    }

    AnalysisArtifact {
        version: ARTIFACT_VERSION,
        generated_at: Utc::now().to_rfc3339(),
        team_code: analysis.series.team_code.clone(),
        seed: config.harness.seed,
        holdout_fraction: config.harness.holdout_fraction,
        activity_threshold: config.series.activity_threshold,
        games: analysis.validation.games,
        unassigned_totals: analysis.validation.unassigned_totals.clone(),
        player_stats,
        models,
        model_errors,
    }
}

/// The on-success terminal report: validation summary, reconcilable
/// residuals, per-player statistics, and per-model figures of merit.
pub fn render_text(analysis: &SeasonAnalysis) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", analysis.validation);

    if !analysis.validation.unassigned_by_game.is_empty() {
        let _ = writeln!(out, "unassigned by game:");
        for entry in &analysis.validation.unassigned_by_game {
            let _ = writeln!(
                out,
                "  game {:>3}  {:14} {}",
                entry.game_id, entry.metric, entry.amount
            );
        }
    }

    let _ = writeln!(out, "\nplayer series ({} eligible):", analysis.series.series.len());
    for (player_id, series) in &analysis.series.series {
        let stats = &series.stats;
        let _ = writeln!(
            out,
            "  {:6} games={:>2}  pts {:>5.1}±{}  val {:>5.1}  +/- {:>5.1}  ac1 {}",
            player_id,
            stats.active_games,
            stats.points_mean,
            fmt_opt(stats.points_std),
            stats.valuation_mean,
            stats.plus_minus_mean,
            fmt_opt(stats.points_lag1_autocorr),
        );
    }
    if !analysis.series.excluded.is_empty() {
        let excluded: Vec<String> = analysis
            .series
            .excluded
            .iter()
            .map(|(id, n)| format!("{id} ({n})"))
            .collect();
        let _ = writeln!(out, "  below threshold: {}", excluded.join(", "));
    }

    let _ = writeln!(out, "\nmodels:");
    for result in &analysis.models.global {
        render_model(&mut out, result);
    }
    for player in &analysis.models.players {
        match &player.outcome {
            Ok(result) => render_model(&mut out, result),
            Err(err) => {
                let _ = writeln!(out, "  {:28} {}", player.player_id, err);
            }
        }
    }

    out
}

fn render_model(out: &mut String, result: &ModelResult) {
    let _ = writeln!(
        out,
        "  {:16} {:12} r2={:+.4} mse={:.3} rmse={:.3} train={} holdout={}",
        result.scope.label(),
        result.kind.as_str(),
        result.r2,
        result.mse,
        result.rmse,
        result.train_samples,
        result.holdout_samples,
    );
    if result.kind == ModelKind::Linear {
        if let Some(intercept) = result.intercept {
            let _ = writeln!(out, "    intercept {intercept:+.4}");
        }
        for (name, coeff) in result.feature_names.iter().zip(&result.coefficients) {
            let _ = writeln!(out, "    {name:22} {coeff:+.4}");
        }
    } else {
        for (name, weight) in result.feature_names.iter().zip(&result.importances) {
            let _ = writeln!(out, "    {name:22} {weight:.4}");
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "-".to_string(),
    }
}
