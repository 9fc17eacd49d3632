use clap::{Args, Parser, Subcommand};
use log::info;
use ppe_plot::{
    env::Env,
    init_logging,
    tasks::{
        measurements::{self, Schema},
        plot::{self, PlotKind},
    },
};
use std::path::PathBuf;

#[derive(Parser)]
struct Cli {
    // The name of the task to execute
    #[clap(subcommand)]
    task: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Plot Shamir vs SSMS secret-sharing latency with a zoomed inset
    SsLatency(PlotArgs),
    /// Plot the latency of every encoding scheme on small payloads
    Compare(PlotArgs),
    /// Print per-algorithm row counts and value ranges of the benchmark CSV
    Summary {
        /// Path to the benchmark CSV [default: ./proc_time_randomizer.csv]
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct PlotArgs {
    /// Path to the benchmark CSV [default: ./proc_time_randomizer.csv]
    #[arg(long)]
    data: Option<PathBuf>,
    /// Where to write the figure (.png or .svg)
    #[arg(long)]
    output: Option<PathBuf>,
    /// YAML file overriding the plot defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

fn data_file_or_default(data: &Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match data {
        Some(path) => Ok(path.clone()),
        None => Env::default_data_file(),
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(false);

    let cli = Cli::parse();
    match &cli.task {
        Command::SsLatency(args) => {
            plot::plot(
                PlotKind::SsLatency,
                &data_file_or_default(&args.data)?,
                args.config.as_deref(),
                args.output.clone(),
            )?;
        }
        Command::Compare(args) => {
            plot::plot(
                PlotKind::Compare,
                &data_file_or_default(&args.data)?,
                args.config.as_deref(),
                args.output.clone(),
            )?;
        }
        Command::Summary { data } => {
            let data_file = data_file_or_default(data)?;
            let records = measurements::load(&data_file, Schema::Named)?;
            let groups = measurements::group_by_algorithm(records);
            for summary in measurements::summarize(&groups) {
                info!("{summary}");
            }
        }
    }

    Ok(())
}
