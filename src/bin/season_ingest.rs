use std::path::PathBuf;

use anyhow::{Result, anyhow};

use courtside::season_store;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let Some(json_path) = flag_value("--json").map(PathBuf::from) else {
        return Err(anyhow!(
            "usage: season_ingest --json SEASON.json [--db PATH]\n\
             imports a JSON array of normalized box-score rows into the season store"
        ));
    };
    let db_path = flag_value("--db")
        .or_else(|| std::env::var("COURTSIDE_DB").ok().filter(|v| !v.trim().is_empty()))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("courtside.sqlite"));

    let mut conn = season_store::open_db(&db_path)?;
    let summary = season_store::import_json_file(&mut conn, &json_path)?;
    println!(
        "imported {} rows across {} games into {}",
        summary.rows_upserted,
        summary.games,
        db_path.display()
    );
    Ok(())
}

fn flag_value(flag: &str) -> Option<String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(v) = arg.strip_prefix(&prefix) {
            if !v.trim().is_empty() {
                return Some(v.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.clone());
        }
    }
    None
}
