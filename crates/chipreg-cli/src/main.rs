//! chipreg - chiplet regression runner CLI
//!
//! Runs the unit-status analysis tool over a unit catalog and reports a
//! verdict per unit and analysis domain.
//!
//! ## Commands
//!
//! - `run`: Execute a regression and write the report
//! - `units`: List the units a run would cover
//! - `classify`: Classify a saved raw tool output

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use chipreg_core::{
    classify, level_for, render_markdown, AnalysisDomain, Parallelism, RegressionConfig, Status,
    Unit, UnitCatalog, UnitFilter, CONFIG_ENV,
};
use chipreg_runner::{PipelineResult, RegressionGate, RegressionPipeline, RegressionPlan, ToolInvoker};

#[derive(Parser)]
#[command(name = "chipreg")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Chiplet regression runner", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Catalog and unit selection shared by `run` and `units`.
#[derive(Args, Debug, Clone, Default)]
struct SelectArgs {
    /// Unit catalog file (overrides `catalog_path`)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Release flag to select per unit (falls back to `default`)
    #[arg(long)]
    release: Option<String>,

    /// Comma-separated chiplets to keep (case-insensitive)
    #[arg(long)]
    chiplets: Option<String>,

    /// Single unit to keep
    #[arg(long)]
    unit: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    #[command(flatten)]
    select: SelectArgs,

    /// Domains to run, comma-separated or repeated (default: all)
    #[arg(long, value_delimiter = ',')]
    domains: Vec<String>,

    /// Concurrent jobs: a number or `auto`
    #[arg(short, long)]
    jobs: Option<Parallelism>,

    /// Resolve every job to NOT_RUN without invoking the tool
    #[arg(long)]
    dry_run: bool,

    /// State log of an interrupted run to resume
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Retries after the first attempt
    #[arg(long)]
    retries: Option<u32>,

    /// Seconds between attempts
    #[arg(long)]
    retry_delay: Option<u64>,

    /// Per-invocation timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Output directory for artifacts and the report
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the regression
    Run(RunArgs),

    /// List the units selected from the catalog
    Units(SelectArgs),

    /// Classify a saved raw tool output
    Classify {
        /// Analysis domain (formal, timing, pv, clock, release, glc)
        #[arg(short, long)]
        domain: AnalysisDomain,

        /// File holding the tool output
        raw: PathBuf,

        /// Print the metrics as JSON
        #[arg(long)]
        metrics: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    chipreg_core::init_tracing(cli.json, level_for(cli.verbose, cli.quiet));

    let config = RegressionConfig::resolve(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Run(args) => cmd_run(config, &args).await,
        Commands::Units(select) => cmd_units(&config, &select).map(|_| ExitCode::SUCCESS),
        Commands::Classify {
            domain,
            raw,
            metrics,
        } => cmd_classify(domain, &raw, metrics).map(|_| ExitCode::SUCCESS),
    }
}

/// Apply command-line overrides on top of the file configuration.
fn apply_overrides(mut config: RegressionConfig, args: &RunArgs) -> Result<RegressionConfig> {
    if let Some(catalog) = &args.select.catalog {
        config.catalog_path = Some(catalog.clone());
    }
    if let Some(jobs) = args.jobs {
        config.parallel = jobs;
    }
    if let Some(retries) = args.retries {
        config.max_retries = retries;
    }
    if let Some(delay) = args.retry_delay {
        config.retry_delay_secs = delay;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Load the catalog, pick one release per unit and apply the filters.
fn select_units(config: &RegressionConfig, select: &SelectArgs) -> Result<Vec<Unit>> {
    let path = select
        .catalog
        .as_ref()
        .or(config.catalog_path.as_ref())
        .context("No unit catalog given; pass --catalog or set catalog_path")?;

    let catalog = UnitCatalog::load(path, config.catalog_delimiter)?;
    let units = catalog.select_release(select.release.as_deref());
    let filter = UnitFilter::new(select.chiplets.as_deref(), select.unit.as_deref());
    let units = filter.apply(units);

    info!(
        catalog = %path.display(),
        rows = catalog.row_count(),
        selected = units.len(),
        "Loaded unit catalog"
    );
    if units.is_empty() {
        warn!("No units match the given filters");
    }
    Ok(units)
}

/// Run the regression and map the gate verdict to the exit status.
async fn cmd_run(config: RegressionConfig, args: &RunArgs) -> Result<ExitCode> {
    let config = apply_overrides(config, args)?;
    let units = select_units(&config, &args.select)?;
    let domains = AnalysisDomain::parse_list(&args.domains.join(","))?;

    let plan = RegressionPlan {
        domains,
        units,
        dry_run: args.dry_run,
        resume: args.resume.clone(),
    };

    let invoker = Arc::new(ToolInvoker::from_config(&config));
    let result = RegressionPipeline::run(invoker, &config, &plan)
        .await
        .context("Regression run failed")?;

    print_summary(&result);
    if plan.dry_run {
        println!();
        print!("{}", render_markdown(&result.report));
    }

    // NOT_RUN never blocks, but results resumed into a dry run still count.
    let verdict = RegressionGate::evaluate(&result.report);
    println!("Gate: {}", if verdict.passed { "✓ PASSED" } else { "✗ FAILED" });
    if !verdict.violations.is_empty() {
        println!("Violations:");
        for violation in &verdict.violations {
            println!("  - {}", violation);
        }
    }
    Ok(ExitCode::from(verdict.exit_code()))
}

fn print_summary(result: &PipelineResult) {
    println!("Run ID: {}", result.run_id);
    println!("Duration: {}ms", result.duration_ms);
    println!(
        "Jobs: {} executed, {} resumed",
        result.executed_count(),
        result.resumed_count()
    );
    println!(
        "Invocations: {} ({} retries)",
        result.counters.invocations, result.counters.retries
    );
    println!();

    for summary in &result.report.summaries {
        let counts: Vec<String> = summary
            .counts
            .iter()
            .map(|c| format!("{} {}", c.status, c.count))
            .collect();
        println!("  {} ({} units): {}", summary.domain, summary.total, counts.join(", "));
    }

    println!();
    println!(
        "Summary: {} passed, {} blocking",
        result.passed_count(),
        result.blocking_count()
    );
    if let Some((json, md)) = &result.report_paths {
        println!("Report: {} / {}", json.display(), md.display());
    }
}

/// Print the units a run would cover.
fn cmd_units(config: &RegressionConfig, select: &SelectArgs) -> Result<()> {
    let units = select_units(config, select)?;
    for unit in &units {
        println!(
            "{:>5}  {:<12} {:<24} {:<12} {}",
            unit.index,
            unit.chiplet,
            unit.name,
            unit.rtl_tag.as_deref().unwrap_or("-"),
            unit.workarea.display()
        );
    }
    println!("{} unit(s)", units.len());
    Ok(())
}

/// Classify a saved raw output as the scheduler would.
fn cmd_classify(domain: AnalysisDomain, raw: &Path, with_metrics: bool) -> Result<Status> {
    let text = std::fs::read_to_string(raw).with_context(|| format!("Failed to read {:?}", raw))?;
    let verdict = classify(domain, &text);

    println!("{}: {} ({})", domain, verdict.status, verdict.details);
    if with_metrics {
        println!("{}", serde_json::to_string_pretty(&verdict.metrics)?);
    }
    Ok(verdict.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipreg_core::state::format_line;
    use chipreg_core::store::write_record;
    use chipreg_core::{ArtifactLayout, Job, JobResult};
    use clap::CommandFactory;

    const CATALOG: &str = "\
unit,chiplet,workarea,rtl_tag,release_types,release_date,release_user
alu,core0,/w/alu,rtl_v1,default,2024-05-01,jdoe
alu,core0,/w/alu_pd,rtl_v2,pd,2024-05-03,jdoe
phy,io0,/w/phy,rtl_v1,default,2024-05-02,asmith
";

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::try_parse_from([
            "chipreg", "-v", "run", "--domains", "timing,clock", "--domains", "pv", "--jobs",
            "auto", "--dry-run", "--retries", "0", "--output", "/tmp/out",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.domains, vec!["timing", "clock", "pv"]);
        assert_eq!(args.jobs, Some(Parallelism::Auto));
        assert!(args.dry_run);
        assert_eq!(args.retries, Some(0));
    }

    #[test]
    fn test_zero_jobs_rejected() {
        assert!(Cli::try_parse_from(["chipreg", "run", "--jobs", "0"]).is_err());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let file = RegressionConfig::from_toml_str("max_retries = 5\ntimeout_secs = 60\n").unwrap();
        let args = RunArgs {
            jobs: Some(Parallelism::Fixed(3)),
            retries: Some(1),
            ..RunArgs::default()
        };
        let config = apply_overrides(file, &args).unwrap();
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.job_slots(), 3);
    }

    #[test]
    fn test_zero_timeout_override_rejected() {
        let args = RunArgs {
            timeout: Some(0),
            ..RunArgs::default()
        };
        assert!(apply_overrides(RegressionConfig::default(), &args).is_err());
    }

    #[test]
    fn test_select_units_release_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("units.csv");
        std::fs::write(&path, CATALOG).unwrap();

        let select = SelectArgs {
            catalog: Some(path),
            release: Some("pd".to_string()),
            chiplets: Some("CORE0".to_string()),
            unit: None,
        };
        let units = select_units(&RegressionConfig::default(), &select).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].workarea, PathBuf::from("/w/alu_pd"));
        assert_eq!(units[0].index, 0);
    }

    #[test]
    fn test_select_units_requires_catalog() {
        let err = select_units(&RegressionConfig::default(), &SelectArgs::default()).unwrap_err();
        assert!(err.to_string().contains("--catalog"));
    }

    #[test]
    fn test_classify_saved_output() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("clock.log");
        std::fs::write(&raw, "===== CLOCK =====\nClock clk_core latency: 580 ps\n").unwrap();

        let status = cmd_classify(AnalysisDomain::Clock, &raw, true).unwrap();
        assert_eq!(status, Status::Failed);
    }

    #[tokio::test]
    async fn test_dry_run_exits_successfully() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("units.csv");
        std::fs::write(&path, CATALOG).unwrap();

        let args = RunArgs {
            select: SelectArgs {
                catalog: Some(path),
                ..SelectArgs::default()
            },
            dry_run: true,
            output: Some(dir.path().join("out")),
            ..RunArgs::default()
        };
        let code = cmd_run(RegressionConfig::default(), &args).await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_dry_run_with_resumed_failure_exits_nonzero() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("units.csv");
        std::fs::write(&catalog, CATALOG).unwrap();
        let out = dir.path().join("out");

        let alu = select_units(
            &RegressionConfig::default(),
            &SelectArgs {
                catalog: Some(catalog.clone()),
                ..SelectArgs::default()
            },
        )
        .unwrap()
        .remove(0);
        let job = Job::new(AnalysisDomain::Timing, alu);
        let layout = ArtifactLayout::new(&out);
        layout.prepare(AnalysisDomain::Timing).unwrap();
        let mut failed = JobResult::not_run();
        failed.status = Status::Failed;
        failed.details = "WNS -0.300 ns (setup)".to_string();
        failed.attempts = 1;
        write_record(&layout.result_path(&job), &failed).unwrap();

        let state = out.join("state.log");
        let line = format_line(&job.key, &job.unit.name, "2024-05-01T00:00:00Z".parse().unwrap());
        std::fs::write(&state, format!("{line}\n")).unwrap();

        let args = RunArgs {
            select: SelectArgs {
                catalog: Some(catalog),
                ..SelectArgs::default()
            },
            domains: vec!["timing".to_string()],
            dry_run: true,
            resume: Some(state),
            output: Some(out),
            ..RunArgs::default()
        };
        let code = cmd_run(RegressionConfig::default(), &args).await.unwrap();
        assert_eq!(code, ExitCode::from(1));
    }
}
