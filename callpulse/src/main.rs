//! callpulse - call-center KPI dashboard CLI
//!
//! Rolls KPI records up to a chosen granularity and compares periods.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use callpulse_core::analytics::{metrics_registry, ComparisonResult, Dashboard};
use callpulse_core::{
    Config, Database, Granularity, MetricDefinition, Period, RawRecord, RecordStore,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "callpulse")]
#[command(about = "Call-center KPI rollup and period comparison")]
#[command(version)]
struct Args {
    /// Database file (default: $XDG_DATA_HOME/callpulse/kpi.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List metric definitions
    Metrics,

    /// Add the built-in call-center metrics
    Seed,

    /// Append one record to a metric
    Add {
        #[arg(short, long)]
        metric: String,
        /// Period: YYYY-MM, YYYY-QN, YYYY-HN or YYYY (default: current month)
        #[arg(short, long)]
        period: Option<String>,
        #[arg(short, long, allow_negative_numbers = true)]
        value: f64,
    },

    /// Import records from a JSON array of {metric, period, value}
    Import {
        file: PathBuf,
        /// Abort the whole import on the first malformed period
        #[arg(long)]
        strict: bool,
    },

    /// Show a metric's series at a granularity
    Series {
        /// Metric id (default: dashboard.default_metric from config)
        #[arg(short, long)]
        metric: Option<String>,
        /// month, quarter, half_year or year (default: the metric's own)
        #[arg(short, long)]
        granularity: Option<Granularity>,
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Compare two periods of a metric
    Compare {
        #[arg(short, long)]
        metric: Option<String>,
        #[arg(short, long)]
        granularity: Option<Granularity>,
        /// Period A (default: most recent bucket)
        #[arg(short = 'a', long = "a")]
        period_a: Option<String>,
        /// Period B (default: the period before --a, or the bucket before
        /// the most recent one)
        #[arg(short = 'b', long = "b")]
        period_b: Option<String>,
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// One entry of an import file.
#[derive(Deserialize)]
struct ImportEntry {
    metric: String,
    period: String,
    value: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        callpulse_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let db_path = args
        .db
        .clone()
        .unwrap_or_else(|| config.resolved_database_path());
    tracing::info!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    match args.command {
        Command::Metrics => list_metrics(&db),
        Command::Seed => {
            let inserted = db.seed_default_metrics()?;
            println!("Seeded {} metric(s).", inserted);
            Ok(())
        }
        Command::Add {
            metric,
            period,
            value,
        } => add_record(&db, &metric, period.as_deref(), value),
        Command::Import { file, strict } => import_records(&db, &file, strict),
        Command::Series {
            metric,
            granularity,
            format,
        } => {
            let metric = resolve_metric(&config, metric)?;
            show_series(&db, &config, &metric, granularity, format)
        }
        Command::Compare {
            metric,
            granularity,
            period_a,
            period_b,
            format,
        } => {
            let metric = resolve_metric(&config, metric)?;
            show_comparison(&db, &config, &metric, granularity, period_a, period_b, format)
        }
    }
}

fn resolve_metric(config: &Config, metric: Option<String>) -> Result<String> {
    metric
        .or_else(|| config.dashboard.default_metric.clone())
        .context("no metric given and dashboard.default_metric is not configured")
}

fn direction_text(metric: &MetricDefinition) -> &'static str {
    match metric.direction {
        callpulse_core::Direction::Up => "higher is better",
        callpulse_core::Direction::Down => "lower is better",
    }
}

fn list_metrics(db: &Database) -> Result<()> {
    let metrics = db.metrics()?;
    if metrics.is_empty() {
        println!("No metrics defined.");
        println!("Run 'callpulse seed' to add the built-in call-center metrics.");
        return Ok(());
    }

    println!(
        "{:<14} {:<28} {:<7} {:<10} {:<4} {:<5} {:>8}",
        "ID", "LABEL", "UNIT", "DEFAULT", "AGG", "DIR", "TARGET"
    );
    for m in metrics {
        let target = m
            .target
            .map(|t| format!("{:.1}", t))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<14} {:<28} {:<7} {:<10} {:<4} {:<5} {:>8}",
            m.id,
            m.label,
            m.unit,
            m.default_granularity,
            m.aggregation.as_str(),
            m.direction.as_str(),
            target
        );
        if let Some(summary) = metrics_registry::summary(&m.id) {
            println!("{:<14} {}", "", summary);
        }
    }
    Ok(())
}

fn add_record(db: &Database, metric: &str, period: Option<&str>, value: f64) -> Result<()> {
    let parsed = match period {
        Some(p) => Period::parse(p)?,
        None => Period::containing(Local::now().date_naive(), Granularity::Month),
    };
    let record = RawRecord::new(parsed.to_string(), value);
    db.insert_record(metric, &record, Some("manual"))
        .with_context(|| format!("failed to add record to '{}'", metric))?;
    println!("Added {} = {} to {}.", parsed, value, metric);
    Ok(())
}

fn import_records(db: &Database, file: &Path, strict: bool) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let entries: Vec<ImportEntry> =
        serde_json::from_str(&content).context("import file must be a JSON array of records")?;

    let source = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "import".to_string());

    let mut by_metric: std::collections::BTreeMap<String, Vec<RawRecord>> = Default::default();
    let mut skipped = 0usize;
    for entry in entries {
        match Period::parse(&entry.period) {
            Ok(period) => by_metric
                .entry(entry.metric)
                .or_default()
                .push(RawRecord::new(period.to_string(), entry.value)),
            Err(e) if strict => return Err(anyhow::Error::new(e).context("import aborted")),
            Err(e) => {
                eprintln!("Skipping {} record: {}", entry.metric, e);
                skipped += 1;
            }
        }
    }

    let imported = db
        .insert_record_groups(
            by_metric.iter().map(|(m, r)| (m.as_str(), r.as_slice())),
            Some(&source),
        )
        .context("import aborted; no records were written")?;

    println!("Imported {} record(s), skipped {}.", imported, skipped);
    Ok(())
}

fn open_dashboard<'a>(
    db: &'a Database,
    config: &Config,
    metric: &str,
    granularity: Option<Granularity>,
) -> Result<Dashboard<'a, Database>> {
    let mut dashboard = Dashboard::new(db, config.dashboard_options());
    dashboard
        .select_metric(metric)
        .with_context(|| format!("failed to load metric '{}'", metric))?;
    if let Some(g) = granularity {
        dashboard.set_granularity(g)?;
    }
    Ok(dashboard)
}

fn show_series(
    db: &Database,
    config: &Config,
    metric: &str,
    granularity: Option<Granularity>,
    format: Format,
) -> Result<()> {
    let dashboard = open_dashboard(db, config, metric, granularity)?;
    let Some(def) = dashboard.metric() else {
        anyhow::bail!("no metric selected");
    };
    let granularity = dashboard
        .granularity()
        .unwrap_or(def.default_granularity);

    if format == Format::Json {
        let json = serde_json::json!({
            "metric": def.id,
            "granularity": granularity,
            "aggregation": def.aggregation,
            "direction": def.direction,
            "buckets": dashboard.buckets().iter().map(|b| serde_json::json!({
                "label": b.label,
                "value": b.value,
                "sort_key": b.sort_key,
                "target_status": def.target_status(b.value),
            })).collect::<Vec<_>>(),
            "rejected": dashboard.rejected().iter().map(|r| serde_json::json!({
                "period": r.record.period,
                "value": r.record.value,
                "error": r.error.to_string(),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!(
        "{} ({}) by {}, {}, {}",
        def.label,
        def.id,
        granularity,
        def.aggregation.as_str(),
        direction_text(def)
    );

    if dashboard.buckets().is_empty() {
        println!("  No data in this view.");
    }
    for bucket in dashboard.buckets() {
        let marker = match def.target_status(bucket.value) {
            Some(callpulse_core::TargetStatus::Met) => " *",
            _ => "",
        };
        println!("  {:<10} {:>10.1} {}{}", bucket.label, bucket.value, def.unit, marker);
    }
    if !dashboard.rejected().is_empty() {
        println!(
            "  Skipped {} record(s) with malformed periods.",
            dashboard.rejected().len()
        );
    }
    Ok(())
}

fn show_comparison(
    db: &Database,
    config: &Config,
    metric: &str,
    granularity: Option<Granularity>,
    period_a: Option<String>,
    period_b: Option<String>,
    format: Format,
) -> Result<()> {
    let mut dashboard = open_dashboard(db, config, metric, granularity)?;
    let period_b = period_b.or_else(|| {
        let a = Period::parse(period_a.as_deref()?).ok()?;
        Some(a.previous().to_string())
    });
    if let Some(a) = period_a {
        dashboard.set_period_a(a);
    }
    if let Some(b) = period_b {
        dashboard.set_period_b(b);
    }

    let Some(def) = dashboard.metric() else {
        anyhow::bail!("no metric selected");
    };
    let state = dashboard.state();
    let result = dashboard.comparison();

    if format == Format::Json {
        let json = serde_json::json!({
            "metric": def.id,
            "granularity": state.granularity,
            "period_a": state.period_a,
            "period_b": state.period_b,
            "comparison": result,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    let (Some(a), Some(b), Some(result)) = (&state.period_a, &state.period_b, result) else {
        println!("{}: no data in this view; nothing to compare.", def.label);
        return Ok(());
    };
    print_comparison(def, a, b, &result);
    Ok(())
}

/// "June 2024" for a parseable label, the label itself otherwise.
fn period_name(label: &str) -> String {
    Period::parse(label)
        .map(|p| p.display_name())
        .unwrap_or_else(|_| label.to_string())
}

fn print_comparison(def: &MetricDefinition, a: &str, b: &str, result: &ComparisonResult) {
    println!(
        "{}: {} vs {} ({})",
        def.label,
        period_name(a),
        period_name(b),
        direction_text(def)
    );
    println!("  A {:<10} {:>10.1} {}", a, result.value_a, def.unit);
    println!("  B {:<10} {:>10.1} {}", b, result.value_b, def.unit);
    println!(
        "  Change: {} ({}) {}",
        result.format_delta(),
        result.format_percent(),
        if result.improved { "improved" } else { "regressed" }
    );
}
