//! recojob - Main Entry Point
//!
//! `recojob reco` configures the standard reconstruction chain, runs it on
//! the requested number of worker threads and merges the shard partitions.
//! `recojob merge` re-runs only the merge over existing partition files.

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use recojob_rs::{
    config::{normalize_output_path, JobConfig, MergePolicy, OutputLevel, OutputMode},
    job::{build_reco_pipeline, partition_path, ComponentAccumulator, JobReport, RunOptions},
    output::{MergeResult, ShardMerger},
    pipeline::StageFactory,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "recojob", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the reconstruction job and merge its partitions
    Reco(RecoArgs),
    /// Merge existing partition files into one output
    Merge(MergeArgs),
}

#[derive(Args, Debug)]
struct RecoArgs {
    /// Job file (TOML or JSON); flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Event file produced by the generator (JSON lines)
    #[arg(short, long = "input-file")]
    input_file: Option<PathBuf>,

    /// Merged output file
    #[arg(short, long = "output-file")]
    output_file: Option<PathBuf>,

    /// Number of events to reconstruct (default: all)
    #[arg(long = "evt", alias = "number-of-events")]
    number_of_events: Option<u64>,

    /// Number of worker threads
    #[arg(short = 't', long = "threads", alias = "number-of-threads")]
    threads: Option<usize>,

    /// Ntuple schema
    #[arg(short, long, value_enum)]
    ntuple: Option<OutputMode>,

    /// Message level, 0 (verbose) to 5 (fatal)
    #[arg(long)]
    output_level: Option<i64>,

    /// Shorthand for --output-level 0
    #[arg(short, long)]
    debug: bool,

    /// What to do when some shards fail
    #[arg(long, value_enum)]
    merge_policy: Option<MergePolicy>,

    /// Keep the per-thread partitions after merging
    #[arg(long)]
    keep_partitions: bool,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Merged output file; also the base name of the partitions
    #[arg(short, long)]
    output_file: PathBuf,

    /// Derive partition names `<base>_<i>.<ext>` for this many threads
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Explicit partition files
    partitions: Vec<PathBuf>,

    /// Merge what is readable and report the rest
    #[arg(long)]
    best_effort: bool,

    /// Keep the partitions after merging
    #[arg(long)]
    keep_partitions: bool,
}

impl RecoArgs {
    fn job_config(&self) -> anyhow::Result<JobConfig> {
        let mut config = match &self.config {
            Some(path) => JobConfig::load(path)?,
            None => JobConfig::default(),
        };

        if let Some(input) = &self.input_file {
            config.input_file = Some(input.clone());
        }
        if let Some(output) = &self.output_file {
            config.output_file = output.clone();
        }
        if let Some(events) = self.number_of_events {
            config.number_of_events = Some(events);
        }
        if let Some(threads) = self.threads {
            config.number_of_threads = threads;
        }
        if let Some(ntuple) = self.ntuple {
            config.ntuple = ntuple;
        }
        if let Some(level) = self.output_level {
            config.output_level = OutputLevel::from_level(level)
                .ok_or_else(|| anyhow!("invalid output level {level}, expected 0 to 5"))?;
        }
        if self.debug {
            config.output_level = OutputLevel::Verbose;
        }
        if let Some(policy) = self.merge_policy {
            config.merge_policy = policy;
        }
        if self.keep_partitions {
            config.keep_partitions = true;
        }
        Ok(config)
    }
}

fn init_logging(level: OutputLevel, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));
    let registry = tracing_subscriber::registry().with(filter);

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Ok(Some(guard))
        }
        None => {
            registry.with(tracing_subscriber::fmt::layer()).init();
            Ok(None)
        }
    }
}

fn reco(args: RecoArgs, log_file: Option<&Path>) -> anyhow::Result<bool> {
    let config = args.job_config()?;
    let _guard = init_logging(config.output_level, log_file)?;
    config.validate()?;

    tracing::info!(
        "Reconstruction: {} ntuple, {} threads, output {}",
        config.ntuple,
        config.number_of_threads,
        config.output_path().display()
    );

    let pipeline = build_reco_pipeline(&config)?;
    let mut acc = ComponentAccumulator::new(
        "ComponentAccumulator",
        pipeline,
        StageFactory::with_files(),
        RunOptions::from_config(&config),
    )?;

    let report = acc.run(config.number_of_events)?;
    print_report(&report);
    Ok(report.is_success())
}

fn print_report(report: &JobReport) {
    for shard in &report.shards {
        match shard.error() {
            None => println!(
                "shard {}: events {}..{} ok ({:.2?})",
                shard.shard_index, shard.range.start, shard.range.end, shard.elapsed
            ),
            Some(e) => println!(
                "shard {}: events {}..{} FAILED after {} events: {}",
                shard.shard_index,
                shard.range.start,
                shard.range.end,
                shard.completed_events,
                e
            ),
        }
    }
    match &report.merge {
        Some(result) => print_merge(result),
        None => println!(
            "not merged; partitions of failed shards {:?} left on disk",
            report.failed_shards()
        ),
    }
}

fn print_merge(result: &MergeResult) {
    println!(
        "merged {} shards ({} events) into {}",
        result.merged_shards,
        result.events,
        result.output_path.display()
    );
    if result.is_partial() {
        println!("missing shards: {:?}", result.failed_shards);
    }
}

fn merge(args: MergeArgs, log_file: Option<&Path>) -> anyhow::Result<bool> {
    let _guard = init_logging(OutputLevel::Info, log_file)?;
    let output = normalize_output_path(&args.output_file);

    let partitions: Vec<PathBuf> = match (args.partitions.is_empty(), args.threads) {
        (false, _) => args.partitions,
        (true, Some(threads)) => (0..threads).map(|i| partition_path(&output, i)).collect(),
        (true, None) => bail!("give partition files or --threads"),
    };

    let merger = ShardMerger::new(&output).keep_partitions(args.keep_partitions);
    let result = if args.best_effort {
        merger.merge_available(&partitions, &[])?
    } else {
        merger.merge(&partitions)?
    };

    print_merge(&result);
    Ok(!result.is_partial())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_file = cli.log_file.as_deref();

    let outcome = match cli.command {
        Commands::Reco(args) => reco(args, log_file),
        Commands::Merge(args) => merge(args, log_file),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
