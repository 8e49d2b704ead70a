//! LazyPlan command-line entry point.
//!
//! # Responsibility
//! - Expose constraint checks, plan listing and calendar export over the
//!   core crate for local use and scripting.

mod config;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use lazyplan_core::db::open_db_with_timeout;
use lazyplan_core::export::write_csv;
use lazyplan_core::solver::time_constraints::{RoutineLoad, TaskLoad};
use lazyplan_core::{
    init_logging_from_config, Cadence, ExportService, PlanService, SqlitePlanRepository,
    TimeConstraintSolver, Workload,
};

use config::ResolvedConfig;

#[derive(Parser)]
#[command(name = "lazyplan", about = "Plan structuring and reordering engine")]
struct Cli {
    /// Plan database file (overrides LAZYPLAN_DB_PATH env var)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file (overrides LAZYPLAN_CONFIG env var)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the feasible layout range for a workload, or re-derive one axis
    Constraints {
        /// Breakable task duration in block units (repeatable)
        #[arg(long = "task")]
        tasks: Vec<u32>,
        /// Unbreakable task duration in block units (repeatable)
        #[arg(long = "unbreakable")]
        unbreakable: Vec<u32>,
        /// Routine duration per period in block units (repeatable)
        #[arg(long = "routine")]
        routines: Vec<u32>,
        #[arg(long, value_enum, default_value_t = CadenceArg::Daily)]
        cadence: CadenceArg,
        /// Pin blocks per period and print the implied period count
        #[arg(long, conflicts_with = "periods")]
        blocks: Option<u32>,
        /// Pin the period count and print the implied blocks per period
        #[arg(long)]
        periods: Option<u32>,
    },
    /// Export a stored plan as calendar-import CSV
    Export {
        /// Plan ID to export
        #[arg(long)]
        plan: Uuid,
        /// First calendar day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Start hour for daily plans (defaults to config value)
        #[arg(long)]
        hour: Option<u32>,
        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List active plans
    Plans,
    /// Print core version
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum CadenceArg {
    Daily,
    Weekly,
    Monthly,
}

impl From<CadenceArg> for Cadence {
    fn from(value: CadenceArg) -> Self {
        match value {
            CadenceArg::Daily => Cadence::Daily,
            CadenceArg::Weekly => Cadence::Weekly,
            CadenceArg::Monthly => Cadence::Monthly,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("lazyplan_core version={}", lazyplan_core::core_version());
        return Ok(());
    }

    let resolved = ResolvedConfig::resolve(cli.db.as_deref(), cli.config.as_deref())?;
    init_logging_from_config(&resolved.planner.logging).context("failed to start logging")?;

    match cli.command {
        Commands::Constraints {
            tasks,
            unbreakable,
            routines,
            cadence,
            blocks,
            periods,
        } => run_constraints(
            &resolved,
            &tasks,
            &unbreakable,
            &routines,
            cadence.into(),
            blocks,
            periods,
        ),
        Commands::Export {
            plan,
            start,
            hour,
            output,
        } => run_export(&resolved, plan, start, hour, output),
        Commands::Plans => run_plans(&resolved),
        Commands::Version => Ok(()),
    }
}

fn run_constraints(
    resolved: &ResolvedConfig,
    tasks: &[u32],
    unbreakable: &[u32],
    routines: &[u32],
    cadence: Cadence,
    blocks: Option<u32>,
    periods: Option<u32>,
) -> Result<()> {
    let task_loads = tasks
        .iter()
        .map(|required_time| (*required_time, true))
        .chain(unbreakable.iter().map(|required_time| (*required_time, false)))
        .map(|(required_time, breakable)| TaskLoad {
            required_time,
            priority: None,
            breakable,
        })
        .collect();
    let routine_loads = routines
        .iter()
        .map(|required_time| RoutineLoad {
            required_time: *required_time,
        })
        .collect();
    let solver = TimeConstraintSolver::new(&Workload::new(task_loads, routine_loads))?;

    if let Some(blocks) = blocks {
        println!("periods={}", solver.rederive_from_blocks(blocks)?);
        return Ok(());
    }
    if let Some(periods) = periods {
        println!("blocks_per_period={}", solver.rederive_from_periods(periods)?);
        return Ok(());
    }

    let range = solver.compute_range(resolved.planner.limits.max_blocks(cadence))?;
    println!(
        "cadence={} blocks_per_period={}..={} periods={}..={}",
        cadence.as_str(),
        range.least_blocks,
        range.max_blocks,
        range.least_periods,
        range.max_periods
    );
    Ok(())
}

fn run_export(
    resolved: &ResolvedConfig,
    plan_id: Uuid,
    start: NaiveDate,
    hour: Option<u32>,
    output: Option<PathBuf>,
) -> Result<()> {
    let conn = open_db_with_timeout(&resolved.db_path, resolved.planner.busy_timeout())
        .with_context(|| format!("cannot open plan database {}", resolved.db_path.display()))?;
    let repo = SqlitePlanRepository::try_new(&conn)?;
    let hour = hour.unwrap_or(resolved.planner.export.default_start_hour);
    let rows = ExportService::new(repo).export_plan(plan_id, start, hour)?;

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("cannot create output file: {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };
    write_csv(&rows, writer)?;

    if let Some(path) = output {
        println!("Exported {} events to {}", rows.len(), path.display());
    }
    Ok(())
}

fn run_plans(resolved: &ResolvedConfig) -> Result<()> {
    let conn = open_db_with_timeout(&resolved.db_path, resolved.planner.busy_timeout())
        .with_context(|| format!("cannot open plan database {}", resolved.db_path.display()))?;
    let plans = PlanService::new(SqlitePlanRepository::try_new(&conn)?).list_plans()?;
    if plans.is_empty() {
        println!("No active plans.");
        return Ok(());
    }
    for plan in plans {
        println!(
            "{}  {:<8}  rev={}  {}",
            plan.id,
            plan.cadence.as_str(),
            plan.revision,
            plan.title
        );
    }
    Ok(())
}
