use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use courtside::pipeline::{PipelineConfig, run_season_analysis};
use courtside::report;
use courtside::sample_season::{SampleConfig, generate};
use courtside::season_store;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    if has_flag("--help") {
        print_usage();
        return Ok(());
    }

    let mut config = PipelineConfig::default();
    if let Some(threshold) = parse_usize_arg("--threshold", "COURTSIDE_THRESHOLD")? {
        config.series.activity_threshold = threshold;
        config.series.min_autocorr_window = threshold;
        config.harness.activity_threshold = threshold;
    }
    if let Some(window) = parse_usize_arg("--window", "COURTSIDE_WINDOW")? {
        config.series.min_autocorr_window = window;
    }
    if let Some(seed) = parse_u64_arg("--seed", "COURTSIDE_SEED")? {
        config.harness.seed = seed;
    }
    if let Some(holdout) = parse_f64_arg("--holdout", "COURTSIDE_HOLDOUT")? {
        if !(0.0..1.0).contains(&holdout) {
            return Err(anyhow!("--holdout must be in (0, 1), got {holdout}"));
        }
        config.harness.holdout_fraction = holdout;
    }
    if let Some(trees) = parse_usize_arg("--trees", "COURTSIDE_TREES")? {
        config.harness.ensemble.trees = trees;
    }
    if let Some(team) = flag_value("--team") {
        config.team_code = Some(team);
    }
    if let Some(players) = flag_value("--players") {
        config.roster = players
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
    }

    let records = if has_flag("--demo") {
        let sample = SampleConfig {
            seed: config.harness.seed,
            ..SampleConfig::default()
        };
        generate(&sample)
    } else {
        let db_path = db_path()?;
        let conn = season_store::open_db(&db_path)?;
        let records = season_store::load_season(&conn)?;
        if records.is_empty() {
            return Err(anyhow!(
                "no season rows in {} (import one with season_ingest, or pass --demo)",
                db_path.display()
            ));
        }
        records
    };

    let analysis = run_season_analysis(&records, &config)?;
    println!("{}", report::render_text(&analysis));

    if let Some(out_path) = flag_value("--json").map(PathBuf::from) {
        let artifact = report::build_artifact(&analysis, &config);
        let raw = serde_json::to_string_pretty(&artifact).context("serialize artifact")?;
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).ok();
        }
        fs::write(&out_path, raw).with_context(|| format!("write {}", out_path.display()))?;
        println!("artifact written: {}", out_path.display());
    }

    Ok(())
}

fn print_usage() {
    println!("courtside: one-team season box-score validation and scoring models");
    println!();
    println!("  --demo             analyze a deterministic synthetic season");
    println!("  --db PATH          season store (default COURTSIDE_DB or ./courtside.sqlite)");
    println!("  --team CODE        explicit team code (otherwise discovered)");
    println!("  --threshold N      activity threshold (default 10)");
    println!("  --window N         autocorrelation window (default = threshold)");
    println!("  --seed N           model seed (default 2024)");
    println!("  --holdout F        holdout fraction (default 0.2)");
    println!("  --trees N          bagged ensemble size (default 60)");
    println!("  --players A,B,C    roster for dedicated models (default: all eligible)");
    println!("  --json PATH        write the analysis artifact as JSON");
}

fn db_path() -> Result<PathBuf> {
    if let Some(path) = flag_value("--db") {
        return Ok(PathBuf::from(path));
    }
    if let Ok(path) = std::env::var("COURTSIDE_DB")
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }
    Ok(PathBuf::from("courtside.sqlite"))
}

fn has_flag(flag: &str) -> bool {
    std::env::args().skip(1).any(|a| a == flag)
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

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_usize_arg(flag: &str, env: &str) -> Result<Option<usize>> {
    let Some(raw) = flag_value(flag).or_else(|| env_value(env)) else {
        return Ok(None);
    };
    let value = raw
        .trim()
        .parse::<usize>()
        .with_context(|| format!("parse {flag} value {raw:?}"))?;
    Ok(Some(value))
}

fn parse_u64_arg(flag: &str, env: &str) -> Result<Option<u64>> {
    let Some(raw) = flag_value(flag).or_else(|| env_value(env)) else {
        return Ok(None);
    };
    let value = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("parse {flag} value {raw:?}"))?;
    Ok(Some(value))
}

fn parse_f64_arg(flag: &str, env: &str) -> Result<Option<f64>> {
    let Some(raw) = flag_value(flag).or_else(|| env_value(env)) else {
        return Ok(None);
    };
    let value = raw
        .trim()
        .parse::<f64>()
        .with_context(|| format!("parse {flag} value {raw:?}"))?;
    Ok(Some(value))
}
