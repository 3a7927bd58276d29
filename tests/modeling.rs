use courtside::errors::AnalysisError;
use courtside::harness::{ModelKind, ModelScope};
use courtside::pipeline::{PipelineConfig, run_season_analysis};
use courtside::sample_season::{SampleConfig, generate};

fn demo_records() -> Vec<courtside::boxscore::GameRecord> {
    generate(&SampleConfig::default())
}

#[test]
fn harness_emits_global_models_and_per_player_models() {
    let records = demo_records();
    let analysis =
        run_season_analysis(&records, &PipelineConfig::default()).expect("pipeline runs");

    let kinds: Vec<ModelKind> = analysis.models.global.iter().map(|m| m.kind).collect();
    assert_eq!(kinds, vec![ModelKind::Linear, ModelKind::BaggedTrees]);
    for model in &analysis.models.global {
        assert_eq!(model.scope, ModelScope::Global);
        assert!((model.rmse - model.mse.sqrt()).abs() < 1e-12);
        assert!(model.train_samples > model.holdout_samples);
    }

    // Default roster is every eligible player, and each succeeds.
    assert_eq!(analysis.models.players.len(), analysis.series.series.len());
    for player in &analysis.models.players {
        let result = player.outcome.as_ref().expect("eligible player fits");
        assert_eq!(result.kind, ModelKind::Linear);
        assert_eq!(result.scope, ModelScope::Player(player.player_id.clone()));
        assert_eq!(result.coefficients.len(), 4);
    }
}

#[test]
fn ineligible_player_fails_alone() {
    let records = demo_records();
    let config = PipelineConfig {
        roster: vec!["P01".to_string(), "P12".to_string(), "P02".to_string()],
        ..PipelineConfig::default()
    };
    let analysis = run_season_analysis(&records, &config).expect("pipeline runs");

    assert_eq!(analysis.models.players.len(), 3);
    assert!(analysis.models.players[0].outcome.is_ok());
    assert!(analysis.models.players[2].outcome.is_ok());

    let failed = &analysis.models.players[1];
    assert_eq!(failed.player_id, "P12");
    let Err(AnalysisError::InsufficientData {
        entity,
        observed,
        required,
    }) = &failed.outcome
    else {
        panic!("expected InsufficientData for P12");
    };
    assert_eq!(entity, "player P12");
    assert_eq!(*observed, 7);
    assert_eq!(*required, 10);

    // Sibling global models are still there.
    assert_eq!(analysis.models.global.len(), 2);
}

#[test]
fn identical_inputs_produce_bit_identical_models() {
    let records = demo_records();
    let config = PipelineConfig::default();
    let a = run_season_analysis(&records, &config).expect("first run");
    let b = run_season_analysis(&records, &config).expect("second run");

    let flatten = |analysis: &courtside::pipeline::SeasonAnalysis| {
        let mut values: Vec<u64> = Vec::new();
        for model in analysis.models.global.iter().chain(
            analysis
                .models
                .players
                .iter()
                .filter_map(|p| p.outcome.as_ref().ok()),
        ) {
            values.push(model.r2.to_bits());
            values.push(model.mse.to_bits());
            values.push(model.rmse.to_bits());
            if let Some(intercept) = model.intercept {
                values.push(intercept.to_bits());
            }
            values.extend(model.coefficients.iter().map(|c| c.to_bits()));
            values.extend(model.importances.iter().map(|w| w.to_bits()));
        }
        values
    };

    assert_eq!(flatten(&a), flatten(&b));
}

#[test]
fn changing_the_seed_changes_the_partition() {
    let records = demo_records();
    let base = run_season_analysis(&records, &PipelineConfig::default()).expect("base run");
    let mut reseeded_config = PipelineConfig::default();
    reseeded_config.harness.seed = 777;
    let reseeded = run_season_analysis(&records, &reseeded_config).expect("reseeded run");
    assert_eq!(reseeded.models.global.len(), base.models.global.len());

    let coeffs = |analysis: &courtside::pipeline::SeasonAnalysis| {
        analysis.models.global[0]
            .coefficients
            .iter()
            .map(|c| c.to_bits())
            .collect::<Vec<u64>>()
    };
    assert_ne!(coeffs(&base), coeffs(&reseeded));
}

#[test]
fn importances_sum_to_one_for_the_global_ensemble() {
    let records = demo_records();
    let analysis =
        run_season_analysis(&records, &PipelineConfig::default()).expect("pipeline runs");
    let bagged = analysis
        .models
        .global
        .iter()
        .find(|m| m.kind == ModelKind::BaggedTrees)
        .expect("bagged model present");
    let sum: f64 = bagged.importances.iter().sum();
    assert!((sum - 1.0).abs() < 1e-9);
    assert!(bagged.importances.iter().all(|w| *w >= 0.0));
}

#[test]
fn threshold_starving_the_pool_fails_the_global_scope() {
    let records = demo_records();
    let mut config = PipelineConfig::default();
    config.series.activity_threshold = 40;
    config.series.min_autocorr_window = 40;
    config.harness.activity_threshold = 40;

    let err = run_season_analysis(&records, &config).unwrap_err();
    let AnalysisError::InsufficientData { entity, .. } = err else {
        panic!("expected InsufficientData");
    };
    assert_eq!(entity, "global model pool");
}

#[test]
fn corrupted_records_never_reach_the_models() {
    let mut records = demo_records();
    records[0].total_rebounds += 1;
    let err = run_season_analysis(&records, &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::DataIntegrity(_)));
}
