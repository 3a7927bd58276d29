use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, params};

use crate::boxscore::{GameRecord, Phase};

/// Local SQLite store for normalized season rows. This is the loader
/// collaborator of the pipeline: it hands rows to the validator exactly as
/// imported, with no normalization and no checking of its own.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub rows_upserted: usize,
    pub games: usize,
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS box_rows (
            game_id INTEGER NOT NULL,
            player_id TEXT NOT NULL,
            game_code TEXT NOT NULL,
            round INTEGER NOT NULL,
            phase TEXT NOT NULL,
            is_starter INTEGER NOT NULL,
            is_playing INTEGER NOT NULL,
            seconds_played INTEGER NOT NULL,
            points INTEGER NOT NULL,
            two_made INTEGER NOT NULL,
            two_attempted INTEGER NOT NULL,
            three_made INTEGER NOT NULL,
            three_attempted INTEGER NOT NULL,
            ft_made INTEGER NOT NULL,
            ft_attempted INTEGER NOT NULL,
            offensive_rebounds INTEGER NOT NULL,
            defensive_rebounds INTEGER NOT NULL,
            total_rebounds INTEGER NOT NULL,
            assists INTEGER NOT NULL,
            steals INTEGER NOT NULL,
            turnovers INTEGER NOT NULL,
            blocks_favour INTEGER NOT NULL,
            blocks_against INTEGER NOT NULL,
            fouls_committed INTEGER NOT NULL,
            fouls_received INTEGER NOT NULL,
            valuation INTEGER NOT NULL,
            plus_minus INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (game_id, player_id)
        );
        CREATE INDEX IF NOT EXISTS idx_box_rows_player ON box_rows(player_id);
        CREATE INDEX IF NOT EXISTS idx_box_rows_phase_round ON box_rows(phase, round);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn upsert_records(conn: &mut Connection, rows: &[GameRecord]) -> Result<usize> {
    let tx = conn.transaction().context("begin upsert transaction")?;
    let mut upserted = 0usize;
    for row in rows {
        upsert_row(&tx, row)?;
        upserted += 1;
    }
    tx.commit().context("commit upsert transaction")?;
    Ok(upserted)
}

fn upsert_row(tx: &rusqlite::Transaction<'_>, r: &GameRecord) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO box_rows (
            game_id, player_id, game_code, round, phase,
            is_starter, is_playing, seconds_played, points,
            two_made, two_attempted, three_made, three_attempted,
            ft_made, ft_attempted,
            offensive_rebounds, defensive_rebounds, total_rebounds,
            assists, steals, turnovers, blocks_favour, blocks_against,
            fouls_committed, fouls_received, valuation, plus_minus,
            updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9,
            ?10, ?11, ?12, ?13,
            ?14, ?15,
            ?16, ?17, ?18,
            ?19, ?20, ?21, ?22, ?23,
            ?24, ?25, ?26, ?27,
            ?28
        )
        ON CONFLICT(game_id, player_id) DO UPDATE SET
            game_code = excluded.game_code,
            round = excluded.round,
            phase = excluded.phase,
            is_starter = excluded.is_starter,
            is_playing = excluded.is_playing,
            seconds_played = excluded.seconds_played,
            points = excluded.points,
            two_made = excluded.two_made,
            two_attempted = excluded.two_attempted,
            three_made = excluded.three_made,
            three_attempted = excluded.three_attempted,
            ft_made = excluded.ft_made,
            ft_attempted = excluded.ft_attempted,
            offensive_rebounds = excluded.offensive_rebounds,
            defensive_rebounds = excluded.defensive_rebounds,
            total_rebounds = excluded.total_rebounds,
            assists = excluded.assists,
            steals = excluded.steals,
            turnovers = excluded.turnovers,
            blocks_favour = excluded.blocks_favour,
            blocks_against = excluded.blocks_against,
            fouls_committed = excluded.fouls_committed,
            fouls_received = excluded.fouls_received,
            valuation = excluded.valuation,
            plus_minus = excluded.plus_minus,
            updated_at = excluded.updated_at
        "#,
        params![
            r.game_id as i64,
            r.player_id,
            r.game_code,
            r.round as i64,
            r.phase.as_str(),
            r.is_starter as i64,
            r.is_playing as i64,
            r.seconds_played as i64,
            r.points as i64,
            r.two_made as i64,
            r.two_attempted as i64,
            r.three_made as i64,
            r.three_attempted as i64,
            r.ft_made as i64,
            r.ft_attempted as i64,
            r.offensive_rebounds as i64,
            r.defensive_rebounds as i64,
            r.total_rebounds as i64,
            r.assists as i64,
            r.steals as i64,
            r.turnovers as i64,
            r.blocks_favour as i64,
            r.blocks_against as i64,
            r.fouls_committed as i64,
            r.fouls_received as i64,
            r.valuation as i64,
            r.plus_minus as i64,
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| format!("upsert row game {} player {}", r.game_id, r.player_id))?;
    Ok(())
}

pub fn load_season(conn: &Connection) -> Result<Vec<GameRecord>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                game_id, player_id, game_code, round, phase,
                is_starter, is_playing, seconds_played, points,
                two_made, two_attempted, three_made, three_attempted,
                ft_made, ft_attempted,
                offensive_rebounds, defensive_rebounds, total_rebounds,
                assists, steals, turnovers, blocks_favour, blocks_against,
                fouls_committed, fouls_received, valuation, plus_minus
            FROM box_rows
            ORDER BY game_id ASC, player_id ASC
            "#,
        )
        .context("prepare season load query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                [
                    row.get::<_, u32>(7)?,
                    row.get::<_, u32>(8)?,
                    row.get::<_, u32>(9)?,
                    row.get::<_, u32>(10)?,
                    row.get::<_, u32>(11)?,
                    row.get::<_, u32>(12)?,
                    row.get::<_, u32>(13)?,
                    row.get::<_, u32>(14)?,
                    row.get::<_, u32>(15)?,
                    row.get::<_, u32>(16)?,
                    row.get::<_, u32>(17)?,
                    row.get::<_, u32>(18)?,
                    row.get::<_, u32>(19)?,
                    row.get::<_, u32>(20)?,
                    row.get::<_, u32>(21)?,
                    row.get::<_, u32>(22)?,
                    row.get::<_, u32>(23)?,
                    row.get::<_, u32>(24)?,
                ],
                row.get::<_, i32>(25)?,
                row.get::<_, i32>(26)?,
            ))
        })
        .context("query season rows")?;

    let mut out = Vec::new();
    for row in rows {
        let (game_id, player_id, game_code, round, phase_raw, starter, playing, counts, valuation, plus_minus) =
            row.context("decode season row")?;
        let phase = Phase::parse(&phase_raw)
            .ok_or_else(|| anyhow!("unknown phase {phase_raw:?} for game {game_id}"))?;
        out.push(GameRecord {
            game_id,
            game_code,
            round,
            phase,
            player_id,
            is_starter: starter != 0,
            is_playing: playing != 0,
            seconds_played: counts[0],
            points: counts[1],
            two_made: counts[2],
            two_attempted: counts[3],
            three_made: counts[4],
            three_attempted: counts[5],
            ft_made: counts[6],
            ft_attempted: counts[7],
            offensive_rebounds: counts[8],
            defensive_rebounds: counts[9],
            total_rebounds: counts[10],
            assists: counts[11],
            steals: counts[12],
            turnovers: counts[13],
            blocks_favour: counts[14],
            blocks_against: counts[15],
            fouls_committed: counts[16],
            fouls_received: counts[17],
            valuation,
            plus_minus,
        });
    }
    Ok(out)
}

/// Imports a JSON array of records (the serde shape of `GameRecord`) into the
/// store.
pub fn import_json_file(conn: &mut Connection, path: &Path) -> Result<ImportSummary> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let rows: Vec<GameRecord> =
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    let rows_upserted = upsert_records(conn, &rows)?;
    let mut game_ids: Vec<u32> = rows.iter().map(|r| r.game_id).collect();
    game_ids.sort_unstable();
    game_ids.dedup();
    Ok(ImportSummary {
        rows_upserted,
        games: game_ids.len(),
    })
}
