use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::bail;
use skymaf::{FilePersister, JsonRenderer, Overrides, RunSummary, init_logging};
use skymaf_core::Driver;

#[derive(Parser, Debug)]
#[command(name = "skymaf")]
#[command(about = "Slice survey-simulation output and compute metrics per slice")]
struct Args {
    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute every bundle and write plot artifacts and a summary
    Run {
        /// YAML run configuration
        config: PathBuf,
        /// JSON observation table
        table: PathBuf,
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        #[arg(short, long)]
        run_name: Option<String>,
    },
    /// Print the bundles a configuration expands to
    Plan {
        config: PathBuf,
    },
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    match args.command {
        Command::Run {
            config,
            table,
            out_dir,
            run_name,
        } => {
            let config = Overrides { run_name, out_dir }.apply(skymaf::load_run_config(&config)?);
            let table = skymaf::load_table(&table)?;
            let out_dir = config.out_dir.clone();
            let run_name = config.run_name.clone();

            let report = Driver::new(config).run(&table, &JsonRenderer, &FilePersister);
            let summary_path = RunSummary::from_report(&run_name, &report).write(&out_dir)?;

            println!(
                "{} bundles, {} plots, {} failures; summary at {}",
                report.bundles.len(),
                report.artifacts.len(),
                report.failures.len(),
                summary_path.display()
            );
            for failure in &report.failures {
                eprintln!("failed: {} ({:?}): {}", failure.name, failure.stage, failure.error);
            }
            if !report.is_success() {
                bail!("{} of the run's bundles or plots failed", report.failures.len());
            }
        }
        Command::Plan { config } => {
            let driver = Driver::new(skymaf::load_run_config(&config)?);
            for plan in driver.plan() {
                println!("{}\t{}", plan.name, plan.constraint);
            }
        }
    }

    tracing::info!("skymaf finished");
    Ok(())
}
