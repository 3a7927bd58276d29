use crate::boxscore::GameRecord;
use crate::errors::AnalysisError;
use crate::features::{SeriesConfig, SeriesSet, build_player_series};
use crate::harness::{HarnessConfig, HarnessOutput, run_harness};
use crate::validation::{ValidationReport, validate};

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Explicit team code; discovered from the game codes when absent.
    pub team_code: Option<String>,
    pub series: SeriesConfig,
    pub harness: HarnessConfig,
    /// Players requesting a dedicated model; empty means every eligible one.
    pub roster: Vec<String>,
}

/// Everything the season run produces, each stage's output immutable and
/// derived from the previous one.
#[derive(Debug)]
pub struct SeasonAnalysis {
    pub validation: ValidationReport,
    pub series: SeriesSet,
    pub models: HarnessOutput,
}

/// Validator barrier, then feature building, then modeling. A
/// `DataIntegrity` failure stops everything here; nothing downstream ever
/// sees an unvalidated record set.
pub fn run_season_analysis(
    records: &[GameRecord],
    config: &PipelineConfig,
) -> Result<SeasonAnalysis, AnalysisError> {
    let validation = validate(records, config.team_code.as_deref())?;
    let series = build_player_series(records, &validation, &config.series);
    let models = run_harness(&series, &config.roster, &config.harness)?;
    Ok(SeasonAnalysis {
        validation,
        series,
        models,
    })
}
