use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use stability_bench::harness::{BenchConfig, Profile};
use stability_bench::probe::CountingAllocator;
use stability_bench::report::{ReportSink, TextSink};
use stability_bench::schema::{CaseError, RunMeta, SuiteReport};
use stability_bench::{workloads, WorkloadKind};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator::new(std::alloc::System);

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum OutputFormat {
    /// One `name: value` line per statistic.
    #[default]
    Text,
    /// A single JSON document with run metadata.
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the built-in workloads.
    List,

    /// Benchmark built-in workloads.
    Run {
        /// Which workload(s) to run.
        #[arg(long, value_enum, default_value_t = WorkloadKind::All)]
        workload: WorkloadKind,

        /// Untimed warm-up calls (profile default if omitted). 0 measures cold starts.
        #[arg(long)]
        warmup: Option<usize>,

        /// Timed trials (profile default if omitted).
        #[arg(long)]
        trials: Option<usize>,

        /// Collect fingerprints of intermediate values reported by workloads.
        #[arg(long, default_value_t = false)]
        track_intermediate: bool,

        /// Skip argument fingerprinting.
        #[arg(long, default_value_t = false)]
        no_track_arguments: bool,

        /// Run independent workloads concurrently (trials within a workload stay sequential).
        #[arg(long, default_value_t = false)]
        parallel: bool,
    },
}

#[derive(Parser, Debug)]
#[command(name = "stability-bench")]
#[command(about = "Time, allocation and type-stability benchmarks for built-in workloads")]
struct Args {
    #[arg(long, value_enum, default_value_t = Profile::Quick, global = true)]
    profile: Profile,

    #[arg(long, default_value_t = 0, global = true)]
    seed: u64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Where to write the report. If omitted, prints to stdout.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

fn open_output(out: Option<&PathBuf>) -> io::Result<Box<dyn Write>> {
    Ok(match out {
        Some(path) => Box::new(io::BufWriter::new(fs::File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    })
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let (workload, warmup, trials, track_intermediate, no_track_arguments, parallel) = match args.cmd {
        Command::List => {
            let mut out = open_output(args.out.as_ref())?;
            for (name, _, description, _) in workloads::CATALOG {
                writeln!(out, "{name:<18} {description}")?;
            }
            return out.flush();
        }
        Command::Run {
            workload,
            warmup,
            trials,
            track_intermediate,
            no_track_arguments,
            parallel,
        } => (workload, warmup, trials, track_intermediate, no_track_arguments, parallel),
    };

    let profile = args.profile;
    let mut cfg = BenchConfig::new(profile, args.seed)
        .with_track_intermediate(track_intermediate)
        .with_track_arguments(!no_track_arguments);
    if let Some(n) = warmup {
        cfg = cfg.with_warmup(n);
    }
    if let Some(n) = trials {
        cfg = cfg.with_trials(n);
    }
    cfg.validate().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let suite = workloads::suite(workload);
    info!(
        "profile={} seed={} warmup={} trials={}",
        profile.as_str(),
        cfg.seed,
        cfg.warmup_count,
        cfg.trial_count
    );

    let mut reports = Vec::new();
    let mut failed = 0usize;
    let mut errors = Vec::new();
    for (name, result) in suite.run(&cfg, parallel) {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!("{name}: {e}");
                failed += 1;
                errors.push(CaseError {
                    name,
                    error: e.to_string(),
                });
            }
        }
    }

    let mut out = open_output(args.out.as_ref())?;
    match args.format {
        OutputFormat::Text => {
            let mut sink = TextSink::new(&mut out);
            for report in &reports {
                sink.emit(report)?;
            }
        }
        OutputFormat::Json => {
            let report = SuiteReport {
                run: RunMeta::capture(&cfg, parallel),
                reports,
                errors,
            };
            let json = serde_json::to_string_pretty(&report).map_err(io::Error::other)?;
            writeln!(out, "{json}")?;
        }
    }
    out.flush()?;

    if failed == 0 {
        Ok(())
    } else {
        Err(io::Error::other(format!("{failed} workload(s) failed")))
    }
}
