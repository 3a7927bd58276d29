use courtside::boxscore::GameRecord;
use courtside::errors::AnalysisError;
use courtside::sample_season::{SampleConfig, generate};
use courtside::validation::validate;

fn season() -> Vec<GameRecord> {
    generate(&SampleConfig::default())
}

fn totals_row(rows: &mut [GameRecord], game_id: u32) -> &mut GameRecord {
    rows.iter_mut()
        .find(|r| r.is_team_totals() && r.game_id == game_id)
        .expect("totals row exists")
}

#[test]
fn synthetic_season_is_internally_consistent() {
    let report = validate(&season(), None).expect("season validates");
    assert!(report.passed());
    assert_eq!(report.games, 35);
    assert!(report.categories.values().all(|passed| *passed));
    for (metric, total) in &report.unassigned_totals {
        assert!(*total >= 0, "unassigned {metric} went negative");
    }
}

#[test]
fn every_row_satisfies_the_derived_formulas() {
    for record in season() {
        assert_eq!(
            record.offensive_rebounds + record.defensive_rebounds,
            record.total_rebounds
        );
        assert_eq!(record.points_from_shots(), record.points as i64);
        assert_eq!(record.expected_valuation(), record.valuation as i64);
    }
}

#[test]
fn extra_team_rebounds_are_reported_not_fatal() {
    let mut rows = season();
    let before = validate(&rows, None).expect("baseline validates");
    let baseline = before.unassigned_for_game(12, "total_rebounds");

    let totals = totals_row(&mut rows, 12);
    totals.defensive_rebounds += 6;
    totals.total_rebounds += 6;
    totals.valuation += 6;

    let report = validate(&rows, None).expect("still validates");
    assert_eq!(report.unassigned_for_game(12, "total_rebounds"), baseline + 6);
    assert_eq!(
        report.unassigned_totals["total_rebounds"],
        before.unassigned_totals["total_rebounds"] + 6
    );
}

#[test]
fn player_sum_exceeding_team_total_is_fatal() {
    let mut rows = season();
    // Pick a game where the players recorded any steals at all, then push the
    // team total below their sum.
    let game_id = rows
        .iter()
        .find(|r| !r.is_team_totals() && r.steals > 0)
        .map(|r| r.game_id)
        .expect("some player recorded a steal");
    let player_sum: u32 = rows
        .iter()
        .filter(|r| !r.is_team_totals() && r.game_id == game_id)
        .map(|r| r.steals)
        .sum();
    let totals = totals_row(&mut rows, game_id);
    let delta = totals.steals as i64 - (player_sum as i64 - 1);
    totals.steals = player_sum - 1;
    totals.valuation -= delta as i32;

    let err = validate(&rows, None).unwrap_err();
    let AnalysisError::DataIntegrity(report) = err else {
        panic!("expected DataIntegrity");
    };
    assert!(
        report
            .failures
            .iter()
            .any(|f| f.category == "reconcilable_aggregate" && f.game_id == Some(game_id))
    );
}

#[test]
fn missing_totals_row_aborts_with_the_game_id() {
    let mut rows = season();
    rows.retain(|r| !(r.is_team_totals() && r.game_id == 20));

    let err = validate(&rows, None).unwrap_err();
    let AnalysisError::DataIntegrity(report) = err else {
        panic!("expected DataIntegrity");
    };
    let failure = report
        .failures
        .iter()
        .find(|f| f.category == "aggregate_presence")
        .expect("presence failure");
    assert_eq!(failure.game_id, Some(20));
    assert!(format!("{failure}").contains("game 20"));
}

#[test]
fn broken_exact_metric_fails_at_both_granularities() {
    let mut rows = season();
    let totals = totals_row(&mut rows, 7);
    totals.ft_made += 1;
    totals.ft_attempted += 1;
    totals.points += 1;
    totals.valuation += 1;

    let err = validate(&rows, None).unwrap_err();
    let AnalysisError::DataIntegrity(report) = err else {
        panic!("expected DataIntegrity");
    };
    let per_game = report
        .failures
        .iter()
        .any(|f| f.category == "exact_aggregate" && f.game_id == Some(7));
    let season_wide = report
        .failures
        .iter()
        .any(|f| f.category == "exact_aggregate" && f.game_id.is_none());
    assert!(per_game && season_wide);
}
