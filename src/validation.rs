use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::boxscore::GameRecord;
use crate::errors::AnalysisError;

/// How a metric reconciles between the player rows of a game and its
/// team-totals row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComparisonKind {
    /// Player sum must equal the team total, per game and season-wide.
    Exact,
    /// The team total may exceed the player sum; the non-negative residual is
    /// an unassigned count, not an error.
    Reconcilable,
}

struct AggregateRule {
    name: &'static str,
    kind: ComparisonKind,
    value: fn(&GameRecord) -> i64,
}

/// One generic checker walks this table instead of one bespoke routine per
/// metric.
static AGGREGATE_RULES: &[AggregateRule] = &[
    AggregateRule {
        name: "points",
        kind: ComparisonKind::Exact,
        value: |r| r.points as i64,
    },
    AggregateRule {
        name: "assists",
        kind: ComparisonKind::Exact,
        value: |r| r.assists as i64,
    },
    AggregateRule {
        name: "ft_made",
        kind: ComparisonKind::Exact,
        value: |r| r.ft_made as i64,
    },
    AggregateRule {
        name: "ft_attempted",
        kind: ComparisonKind::Exact,
        value: |r| r.ft_attempted as i64,
    },
    AggregateRule {
        name: "fouls_committed",
        kind: ComparisonKind::Exact,
        value: |r| r.fouls_committed as i64,
    },
    AggregateRule {
        name: "fouls_received",
        kind: ComparisonKind::Exact,
        value: |r| r.fouls_received as i64,
    },
    AggregateRule {
        name: "seconds_played",
        kind: ComparisonKind::Exact,
        value: |r| r.seconds_played as i64,
    },
    AggregateRule {
        name: "total_rebounds",
        kind: ComparisonKind::Reconcilable,
        value: |r| r.total_rebounds as i64,
    },
    AggregateRule {
        name: "steals",
        kind: ComparisonKind::Reconcilable,
        value: |r| r.steals as i64,
    },
    AggregateRule {
        name: "turnovers",
        kind: ComparisonKind::Reconcilable,
        value: |r| r.turnovers as i64,
    },
];

struct RecordRule {
    name: &'static str,
    check: fn(&GameRecord) -> Option<String>,
}

/// Internal-consistency invariants checked on every row, player and
/// team-totals alike.
static RECORD_RULES: &[RecordRule] = &[
    RecordRule {
        name: "rebound_split",
        check: |r| {
            let split = r.offensive_rebounds as i64 + r.defensive_rebounds as i64;
            (split != r.total_rebounds as i64).then(|| {
                format!(
                    "offensive {} + defensive {} != total {}",
                    r.offensive_rebounds, r.defensive_rebounds, r.total_rebounds
                )
            })
        },
    },
    RecordRule {
        name: "points_breakdown",
        check: |r| {
            let from_shots = r.points_from_shots();
            (from_shots != r.points as i64).then(|| {
                format!("made shots imply {} points, row says {}", from_shots, r.points)
            })
        },
    },
    RecordRule {
        name: "valuation",
        check: |r| {
            let expected = r.expected_valuation();
            (expected != r.valuation as i64).then(|| {
                format!(
                    "recomputed valuation {} differs from recorded {} by {}",
                    expected,
                    r.valuation,
                    expected - r.valuation as i64
                )
            })
        },
    },
];

const CATEGORY_AGGREGATE_PRESENCE: &str = "aggregate_presence";
const CATEGORY_GAME_CODE: &str = "game_code";
const CATEGORY_EXACT: &str = "exact_aggregate";
const CATEGORY_RECONCILABLE: &str = "reconcilable_aggregate";

#[derive(Debug, Clone, Serialize)]
pub struct CheckFailure {
    pub category: &'static str,
    pub game_id: Option<u32>,
    pub player_id: Option<String>,
    pub detail: String,
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.category)?;
        if let Some(game_id) = self.game_id {
            write!(f, " game {game_id}")?;
        }
        if let Some(player_id) = &self.player_id {
            write!(f, " player {player_id}")?;
        }
        write!(f, ": {}", self.detail)
    }
}

/// A strictly positive unassigned residual in one game.
#[derive(Debug, Clone, Serialize)]
pub struct UnassignedEntry {
    pub game_id: u32,
    pub metric: &'static str,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// The team's own code, as discovered from (or verified against) the
    /// game codes.
    pub team_code: String,
    pub games: usize,
    pub player_rows: usize,
    pub aggregate_rows: usize,
    /// Pass/fail per hard-check category.
    pub categories: BTreeMap<&'static str, bool>,
    /// Season totals of unassigned counts per reconcilable metric. Always
    /// present for every reconcilable metric, zero included.
    pub unassigned_totals: BTreeMap<&'static str, i64>,
    /// Per-game breakdown of the strictly positive residuals.
    pub unassigned_by_game: Vec<UnassignedEntry>,
    pub failures: Vec<CheckFailure>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn unassigned_for_game(&self, game_id: u32, metric: &str) -> i64 {
        self.unassigned_by_game
            .iter()
            .filter(|e| e.game_id == game_id && e.metric == metric)
            .map(|e| e.amount)
            .sum()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "team {}: {} games, {} player rows, {} totals rows",
            self.team_code, self.games, self.player_rows, self.aggregate_rows
        )?;
        for (category, passed) in &self.categories {
            writeln!(
                f,
                "  {:24} {}",
                category,
                if *passed { "ok" } else { "FAILED" }
            )?;
        }
        for (metric, total) in &self.unassigned_totals {
            writeln!(f, "  unassigned {metric}: {total}")?;
        }
        for failure in &self.failures {
            writeln!(f, "  {failure}")?;
        }
        Ok(())
    }
}

struct GameGroup<'a> {
    players: Vec<&'a GameRecord>,
    totals: Vec<&'a GameRecord>,
}

/// Validates a normalized season record set. Returns the report when every
/// hard check passes; otherwise the report comes back wrapped in
/// `AnalysisError::DataIntegrity` with every failure enumerated, and nothing
/// downstream may run.
///
/// `team_override` skips team-code discovery and instead verifies the given
/// code appears in every game.
pub fn validate(
    records: &[GameRecord],
    team_override: Option<&str>,
) -> Result<ValidationReport, AnalysisError> {
    let mut failures: Vec<CheckFailure> = Vec::new();

    let mut games: BTreeMap<u32, GameGroup<'_>> = BTreeMap::new();
    let mut player_rows = 0usize;
    let mut aggregate_rows = 0usize;
    for record in records {
        let group = games.entry(record.game_id).or_insert_with(|| GameGroup {
            players: Vec::new(),
            totals: Vec::new(),
        });
        if record.is_team_totals() {
            aggregate_rows += 1;
            group.totals.push(record);
        } else {
            player_rows += 1;
            group.players.push(record);
        }
    }

    for (game_id, group) in &games {
        if group.totals.len() != 1 {
            failures.push(CheckFailure {
                category: CATEGORY_AGGREGATE_PRESENCE,
                game_id: Some(*game_id),
                player_id: None,
                detail: format!("{} team-totals rows, expected exactly 1", group.totals.len()),
            });
        }
    }

    let team_code = resolve_team_code(&games, team_override, &mut failures);

    for record in records {
        for rule in RECORD_RULES {
            if let Some(detail) = (rule.check)(record) {
                failures.push(CheckFailure {
                    category: rule.name,
                    game_id: Some(record.game_id),
                    player_id: Some(record.player_id.clone()),
                    detail,
                });
            }
        }
    }

    let mut unassigned_totals: BTreeMap<&'static str, i64> = BTreeMap::new();
    let mut unassigned_by_game: Vec<UnassignedEntry> = Vec::new();
    for rule in AGGREGATE_RULES {
        if rule.kind == ComparisonKind::Reconcilable {
            unassigned_totals.insert(rule.name, 0);
        }
    }

    // Per-game reconciliation runs only where the totals row is unambiguous;
    // a presence failure already aborts the run.
    for (game_id, group) in &games {
        let [totals] = group.totals.as_slice() else {
            continue;
        };
        for rule in AGGREGATE_RULES {
            let player_sum: i64 = group.players.iter().map(|r| (rule.value)(r)).sum();
            let team_value = (rule.value)(totals);
            match rule.kind {
                ComparisonKind::Exact => {
                    if player_sum != team_value {
                        failures.push(CheckFailure {
                            category: CATEGORY_EXACT,
                            game_id: Some(*game_id),
                            player_id: None,
                            detail: format!(
                                "{}: player sum {} vs team total {}",
                                rule.name, player_sum, team_value
                            ),
                        });
                    }
                }
                ComparisonKind::Reconcilable => {
                    let residual = team_value - player_sum;
                    if residual < 0 {
                        failures.push(CheckFailure {
                            category: CATEGORY_RECONCILABLE,
                            game_id: Some(*game_id),
                            player_id: None,
                            detail: format!(
                                "{}: player sum {} exceeds team total {}",
                                rule.name, player_sum, team_value
                            ),
                        });
                    } else if residual > 0 {
                        unassigned_by_game.push(UnassignedEntry {
                            game_id: *game_id,
                            metric: rule.name,
                            amount: residual,
                        });
                    }
                }
            }
        }
    }

    // Season-level pass over the same rule table, across all rows at once.
    for rule in AGGREGATE_RULES {
        let player_sum: i64 = records
            .iter()
            .filter(|r| !r.is_team_totals())
            .map(|r| (rule.value)(r))
            .sum();
        let team_sum: i64 = records
            .iter()
            .filter(|r| r.is_team_totals())
            .map(|r| (rule.value)(r))
            .sum();
        match rule.kind {
            ComparisonKind::Exact => {
                if player_sum != team_sum {
                    failures.push(CheckFailure {
                        category: CATEGORY_EXACT,
                        game_id: None,
                        player_id: None,
                        detail: format!(
                            "{}: season player sum {} vs season team sum {}",
                            rule.name, player_sum, team_sum
                        ),
                    });
                }
            }
            ComparisonKind::Reconcilable => {
                let residual = team_sum - player_sum;
                if residual < 0 {
                    failures.push(CheckFailure {
                        category: CATEGORY_RECONCILABLE,
                        game_id: None,
                        player_id: None,
                        detail: format!(
                            "{}: season player sum {} exceeds season team sum {}",
                            rule.name, player_sum, team_sum
                        ),
                    });
                }
                unassigned_totals.insert(rule.name, residual.max(0));
            }
        }
    }

    let mut categories: BTreeMap<&'static str, bool> = BTreeMap::new();
    for name in [CATEGORY_AGGREGATE_PRESENCE, CATEGORY_GAME_CODE, CATEGORY_EXACT, CATEGORY_RECONCILABLE]
    {
        categories.insert(name, true);
    }
    for rule in RECORD_RULES {
        categories.insert(rule.name, true);
    }
    for failure in &failures {
        categories.insert(failure.category, false);
    }

    let report = ValidationReport {
        team_code,
        games: games.len(),
        player_rows,
        aggregate_rows,
        categories,
        unassigned_totals,
        unassigned_by_game,
        failures,
    };

    if report.passed() {
        Ok(report)
    } else {
        Err(AnalysisError::DataIntegrity(Box::new(report)))
    }
}

/// Every game code must split into two team codes, and exactly one code must
/// occur in every game of the season: the team the record set belongs to.
fn resolve_team_code(
    games: &BTreeMap<u32, GameGroup<'_>>,
    team_override: Option<&str>,
    failures: &mut Vec<CheckFailure>,
) -> String {
    let mut candidates: Option<Vec<String>> = None;
    for (game_id, group) in games {
        let Some(record) = group.totals.first().or_else(|| group.players.first()) else {
            continue;
        };
        let Some((home, away)) = record.game_code_tokens() else {
            failures.push(CheckFailure {
                category: CATEGORY_GAME_CODE,
                game_id: Some(*game_id),
                player_id: None,
                detail: format!("malformed game code {:?}", record.game_code),
            });
            continue;
        };
        let pair = [home.to_string(), away.to_string()];
        candidates = Some(match candidates {
            None => pair.to_vec(),
            Some(previous) => previous.into_iter().filter(|c| pair.contains(c)).collect(),
        });
    }

    if let Some(code) = team_override {
        let seen_everywhere = candidates
            .as_ref()
            .is_some_and(|c| c.iter().any(|candidate| candidate == code));
        if !seen_everywhere {
            failures.push(CheckFailure {
                category: CATEGORY_GAME_CODE,
                game_id: None,
                player_id: None,
                detail: format!("team code {code:?} does not appear in every game code"),
            });
        }
        return code.to_string();
    }

    match candidates.as_deref() {
        Some([code]) => code.clone(),
        Some([]) | None => {
            failures.push(CheckFailure {
                category: CATEGORY_GAME_CODE,
                game_id: None,
                player_id: None,
                detail: "no team code common to every game".to_string(),
            });
            String::new()
        }
        Some(_) => {
            failures.push(CheckFailure {
                category: CATEGORY_GAME_CODE,
                game_id: None,
                player_id: None,
                detail: "ambiguous team code, pass an explicit one".to_string(),
            });
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxscore::{Phase, TEAM_TOTALS_ID};

    fn player_row(game_id: u32, code: &str, player: &str, points_pattern: u32) -> GameRecord {
        // Two made twos and `points_pattern` made free throws keeps the
        // breakdown invariant satisfied by construction.
        let mut r = GameRecord {
            game_id,
            game_code: code.to_string(),
            round: game_id,
            phase: Phase::RegularSeason,
            player_id: player.to_string(),
            is_starter: true,
            is_playing: true,
            seconds_played: 1500,
            points: 4 + points_pattern,
            two_made: 2,
            two_attempted: 5,
            three_made: 0,
            three_attempted: 2,
            ft_made: points_pattern,
            ft_attempted: points_pattern + 1,
            offensive_rebounds: 1,
            defensive_rebounds: 3,
            total_rebounds: 4,
            assists: 2,
            steals: 1,
            turnovers: 2,
            blocks_favour: 0,
            blocks_against: 1,
            fouls_committed: 3,
            fouls_received: 2,
            valuation: 0,
            plus_minus: 4,
        };
        r.valuation = r.expected_valuation() as i32;
        r
    }

    fn totals_row(game_id: u32, code: &str, players: &[GameRecord]) -> GameRecord {
        let mut t = players[0].clone();
        t.player_id = TEAM_TOTALS_ID.to_string();
        t.is_starter = false;
        macro_rules! sum {
            ($field:ident) => {
                players.iter().map(|p| p.$field).sum()
            };
        }
        t.game_code = code.to_string();
        t.seconds_played = sum!(seconds_played);
        t.points = sum!(points);
        t.two_made = sum!(two_made);
        t.two_attempted = sum!(two_attempted);
        t.three_made = sum!(three_made);
        t.three_attempted = sum!(three_attempted);
        t.ft_made = sum!(ft_made);
        t.ft_attempted = sum!(ft_attempted);
        t.offensive_rebounds = sum!(offensive_rebounds);
        t.defensive_rebounds = sum!(defensive_rebounds);
        t.total_rebounds = sum!(total_rebounds);
        t.assists = sum!(assists);
        t.steals = sum!(steals);
        t.turnovers = sum!(turnovers);
        t.blocks_favour = sum!(blocks_favour);
        t.blocks_against = sum!(blocks_against);
        t.fouls_committed = sum!(fouls_committed);
        t.fouls_received = sum!(fouls_received);
        t.plus_minus = 6;
        t.valuation = t.expected_valuation() as i32;
        t
    }

    fn tiny_season() -> Vec<GameRecord> {
        let mut rows = Vec::new();
        for (game_id, code) in [(1, "VIR-OLY"), (2, "PAN-VIR")] {
            let players = vec![
                player_row(game_id, code, "P01", 2),
                player_row(game_id, code, "P02", 0),
            ];
            let totals = totals_row(game_id, code, &players);
            rows.extend(players);
            rows.push(totals);
        }
        rows
    }

    #[test]
    fn clean_season_passes_and_discovers_team_code() {
        let report = validate(&tiny_season(), None).expect("clean season validates");
        assert!(report.passed());
        assert_eq!(report.team_code, "VIR");
        assert_eq!(report.games, 2);
        assert_eq!(report.player_rows, 4);
        assert_eq!(report.aggregate_rows, 2);
        assert_eq!(report.unassigned_totals["total_rebounds"], 0);
    }

    #[test]
    fn unassigned_rebounds_are_data_not_errors() {
        let mut rows = tiny_season();
        let totals = rows
            .iter_mut()
            .find(|r| r.is_team_totals() && r.game_id == 1)
            .unwrap();
        totals.defensive_rebounds += 6;
        totals.total_rebounds += 6;
        totals.valuation += 6;
        let report = validate(&rows, None).expect("reconcilable residual is not a failure");
        assert_eq!(report.unassigned_totals["total_rebounds"], 6);
        assert_eq!(report.unassigned_for_game(1, "total_rebounds"), 6);
        assert_eq!(report.unassigned_for_game(2, "total_rebounds"), 0);
    }

    #[test]
    fn negative_residual_is_a_hard_failure() {
        let mut rows = tiny_season();
        let totals = rows
            .iter_mut()
            .find(|r| r.is_team_totals() && r.game_id == 1)
            .unwrap();
        totals.steals -= 1;
        totals.valuation -= 1;
        let err = validate(&rows, None).unwrap_err();
        let AnalysisError::DataIntegrity(report) = err else {
            panic!("expected DataIntegrity");
        };
        assert!(!report.categories[CATEGORY_RECONCILABLE]);
        assert!(
            report
                .failures
                .iter()
                .any(|f| f.category == CATEGORY_RECONCILABLE && f.game_id == Some(1))
        );
    }

    #[test]
    fn duplicate_totals_row_fails_presence() {
        let mut rows = tiny_season();
        let dup = rows.iter().find(|r| r.is_team_totals()).unwrap().clone();
        rows.push(dup);
        let err = validate(&rows, None).unwrap_err();
        let AnalysisError::DataIntegrity(report) = err else {
            panic!("expected DataIntegrity");
        };
        assert!(!report.categories[CATEGORY_AGGREGATE_PRESENCE]);
    }

    #[test]
    fn exact_metric_mismatch_names_metric_and_game() {
        let mut rows = tiny_season();
        let totals = rows
            .iter_mut()
            .find(|r| r.is_team_totals() && r.game_id == 2)
            .unwrap();
        totals.assists += 1;
        totals.valuation += 1;
        let err = validate(&rows, None).unwrap_err();
        let AnalysisError::DataIntegrity(report) = err else {
            panic!("expected DataIntegrity");
        };
        let failure = report
            .failures
            .iter()
            .find(|f| f.category == CATEGORY_EXACT && f.game_id == Some(2))
            .expect("per-game exact failure");
        assert!(failure.detail.contains("assists"));
        // The same mismatch surfaces at season granularity too.
        assert!(
            report
                .failures
                .iter()
                .any(|f| f.category == CATEGORY_EXACT && f.game_id.is_none())
        );
    }

    #[test]
    fn rebound_split_violation_names_the_record() {
        let mut rows = tiny_season();
        let row = rows.iter_mut().find(|r| r.player_id == "P02").unwrap();
        row.total_rebounds += 1;
        row.valuation += 1;
        let err = validate(&rows, None).unwrap_err();
        let AnalysisError::DataIntegrity(report) = err else {
            panic!("expected DataIntegrity");
        };
        let failure = report
            .failures
            .iter()
            .find(|f| f.category == "rebound_split")
            .expect("rebound split failure");
        assert_eq!(failure.player_id.as_deref(), Some("P02"));
    }

    #[test]
    fn valuation_mismatch_reports_discrepancy() {
        let mut rows = tiny_season();
        rows.iter_mut().find(|r| r.player_id == "P01").unwrap().valuation += 3;
        let err = validate(&rows, None).unwrap_err();
        let AnalysisError::DataIntegrity(report) = err else {
            panic!("expected DataIntegrity");
        };
        let failure = report
            .failures
            .iter()
            .find(|f| f.category == "valuation")
            .expect("valuation failure");
        assert!(failure.detail.contains("-3"));
    }

    #[test]
    fn team_override_must_appear_in_every_game() {
        let rows = tiny_season();
        let report = validate(&rows, Some("VIR")).expect("override matches");
        assert_eq!(report.team_code, "VIR");
        assert!(validate(&rows, Some("MAD")).is_err());
    }
}
