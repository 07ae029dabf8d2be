use bench_history::QueryFacade;
use bench_history::config::HistoryConfig;
use bench_history::entry::{Direction, EntryRecord};
use bench_history::query::SeriesPoint;

use crate::store_cmd::{open_store, short_id};

fn format_date(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map_or_else(|| ms.to_string(), |d| d.to_rfc3339())
}

fn print_entry(entry: &EntryRecord) {
    let direction = match entry.direction() {
        Some(Direction::BiggerIsBetter) => " (bigger is better)",
        Some(Direction::SmallerIsBetter) => " (smaller is better)",
        None => "",
    };
    let subject = entry.commit.message.lines().next().unwrap_or_default();
    println!("commit  {} {subject}", short_id(&entry.commit.id));
    println!("date    {} ({})", format_date(entry.date), entry.date);
    println!("tool    {}{direction}", entry.tool);

    let width = entry
        .benches
        .iter()
        .map(|b| b.name.len())
        .max()
        .unwrap_or(0);
    for bench in &entry.benches {
        println!("  {:<width$}  {} {}", bench.name, bench.raw_value, bench.unit);
    }
}

pub fn cmd_latest(cfg: &HistoryConfig, group: &str, json: bool) -> anyhow::Result<i32> {
    let store = open_store(cfg)?;
    let latest = QueryFacade::new(&store).latest(group);

    if json {
        println!("{}", serde_json::to_string_pretty(&latest.as_deref())?);
        return Ok(0);
    }
    match latest {
        Some(entry) => print_entry(&entry),
        None => eprintln!("[bench-history] no entries for {group}"),
    }
    Ok(0)
}

pub fn cmd_series(cfg: &HistoryConfig, group: &str, bench: &str, json: bool) -> anyhow::Result<i32> {
    let store = open_store(cfg)?;
    let series = QueryFacade::new(&store).series_for(group, bench);

    if json {
        let points: Vec<SeriesPoint> = series.iter().collect();
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(0);
    }
    if series.is_empty() {
        eprintln!("[bench-history] no values for {bench} in {group}");
        return Ok(0);
    }
    for point in &series {
        println!("{}\t{}", point.date, point.value);
    }
    Ok(0)
}

pub fn cmd_names(cfg: &HistoryConfig, group: &str) -> anyhow::Result<i32> {
    let store = open_store(cfg)?;
    let names = QueryFacade::new(&store).all_bench_names(group);
    if names.is_empty() {
        eprintln!("[bench-history] no benches recorded for {group}");
    }
    for name in names {
        println!("{name}");
    }
    Ok(0)
}

pub fn cmd_groups(cfg: &HistoryConfig) -> anyhow::Result<i32> {
    let store = open_store(cfg)?;
    let groups = QueryFacade::new(&store).groups();
    if groups.is_empty() {
        eprintln!("[bench-history] no groups recorded");
    }
    for group in groups {
        println!("{group}");
    }
    Ok(0)
}
