use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Reserved player id marking the team-totals row of a game.
pub const TEAM_TOTALS_ID: &str = "TEAM";

/// Season phase. Declaration order is chronological order; the derived `Ord`
/// is what makes the schedule comparator phase-dominant. A future extra phase
/// (e.g. a play-in round) is a new variant inserted in the right position.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Phase {
    RegularSeason,
    Playoffs,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::RegularSeason => "RegularSeason",
            Phase::Playoffs => "Playoffs",
        }
    }

    pub fn parse(raw: &str) -> Option<Phase> {
        match raw.trim() {
            "RegularSeason" | "RS" => Some(Phase::RegularSeason),
            "Playoffs" | "PO" => Some(Phase::Playoffs),
            _ => None,
        }
    }
}

/// One normalized box-score row: either an individual player line or the
/// team-totals line (`player_id == TEAM_TOTALS_ID`) of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: u32,
    /// "HOME-AWAY" pair of team codes, e.g. "VIR-OLY".
    pub game_code: String,
    /// Round number within the phase; numbering restarts at the playoffs.
    pub round: u32,
    pub phase: Phase,
    pub player_id: String,
    pub is_starter: bool,
    pub is_playing: bool,
    pub seconds_played: u32,
    pub points: u32,
    pub two_made: u32,
    pub two_attempted: u32,
    pub three_made: u32,
    pub three_attempted: u32,
    pub ft_made: u32,
    pub ft_attempted: u32,
    pub offensive_rebounds: u32,
    pub defensive_rebounds: u32,
    pub total_rebounds: u32,
    pub assists: u32,
    pub steals: u32,
    pub turnovers: u32,
    pub blocks_favour: u32,
    pub blocks_against: u32,
    pub fouls_committed: u32,
    pub fouls_received: u32,
    pub valuation: i32,
    pub plus_minus: i32,
}

impl GameRecord {
    pub fn is_team_totals(&self) -> bool {
        self.player_id == TEAM_TOTALS_ID
    }

    pub fn missed_field_goals(&self) -> i64 {
        (self.two_attempted as i64 - self.two_made as i64)
            + (self.three_attempted as i64 - self.three_made as i64)
    }

    pub fn missed_free_throws(&self) -> i64 {
        self.ft_attempted as i64 - self.ft_made as i64
    }

    /// Points implied by the made-shot counts: 2·2PM + 3·3PM + FTM.
    pub fn points_from_shots(&self) -> i64 {
        2 * self.two_made as i64 + 3 * self.three_made as i64 + self.ft_made as i64
    }

    /// PIR: production minus cost.
    pub fn expected_valuation(&self) -> i64 {
        let production = self.points as i64
            + self.total_rebounds as i64
            + self.assists as i64
            + self.steals as i64
            + self.blocks_favour as i64
            + self.fouls_received as i64;
        let cost = self.missed_field_goals()
            + self.missed_free_throws()
            + self.turnovers as i64
            + self.blocks_against as i64
            + self.fouls_committed as i64;
        production - cost
    }

    /// (home, away) team codes, if the game code has the two-token shape.
    pub fn game_code_tokens(&self) -> Option<(&str, &str)> {
        let (home, away) = self.game_code.split_once('-')?;
        if home.is_empty() || away.is_empty() || away.contains('-') {
            return None;
        }
        Some((home, away))
    }
}

/// Strict chronological order across both phases. Round numbering restarts in
/// the playoffs, so the phase must dominate; the game id breaks ties so the
/// order is total even across duplicate rounds.
pub fn chronological(a: &GameRecord, b: &GameRecord) -> Ordering {
    (a.phase, a.round, a.game_id).cmp(&(b.phase, b.round, b.game_id))
}
