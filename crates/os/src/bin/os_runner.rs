use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use os::{Bootloader, demo_programs};
use types::{Config, EvictionKind, FileWriter, Level, Logger, ReportFormat, SchedulerKind, Tick};
use vm::{Devices, ProgramLoader, ProgramTable, RunOutcome};

/// Run programs on the simulated machine and report what the kernel did.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file. Flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of `.maq` program files (default: built-in demos)
    #[arg(short, long)]
    programs: Option<PathBuf>,

    #[arg(long, value_enum)]
    scheduler: Option<SchedulerArg>,

    #[arg(long, value_enum)]
    eviction: Option<EvictionArg>,

    /// Quantum, in timer interrupts
    #[arg(short, long)]
    quantum: Option<u32>,

    #[arg(long)]
    frame_size: Option<usize>,

    #[arg(long)]
    memory_size: Option<usize>,

    /// Clock ticks between timer interrupts
    #[arg(long)]
    timer_interval: Option<Tick>,

    /// Where to write process and system reports
    #[arg(short, long)]
    report_dir: Option<PathBuf>,

    /// Report format (text, json)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Seed for the random device and random eviction
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many clock ticks
    #[arg(long, default_value_t = 1_000_000)]
    max_ticks: Tick,

    /// Log kernel events
    #[arg(short, long)]
    verbose: bool,

    /// Log every executed instruction as well
    #[arg(long)]
    trace: bool,

    /// Send the log to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SchedulerArg {
    RoundRobin,
    Shortest,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EvictionArg {
    Fifo,
    Random,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    config.validate().context("invalid configuration")?;

    let level = if args.trace {
        Level::Trace
    } else if args.verbose {
        Level::Info
    } else {
        Level::Off
    };
    let log = match &args.log_file {
        Some(path) => {
            let file = FileWriter::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            Logger::new(Rc::new(RefCell::new(file)), level)
        }
        None => Logger::console(level),
    };

    let loader: Box<dyn ProgramLoader> = match &args.programs {
        Some(dir) => Box::new(
            ProgramTable::from_dir(dir)
                .with_context(|| format!("loading programs from {}", dir.display()))?,
        ),
        None => Box::new(demo_programs().context("assembling demo programs")?),
    };

    println!("{}", "Simulated machine".bold().blue());
    println!("{}", "=================".blue());
    println!(
        "  {} frames x {} words, {:?} scheduler, {:?} eviction, quantum {}",
        config.frame_count(),
        config.frame_size,
        config.scheduler,
        config.eviction,
        config.max_quantum
    );

    let devices = Devices::standard(config.rng_seed);
    let mut system = Bootloader::boot(config, loader, devices, log).context("boot failed")?;
    let outcome = system.run(Some(args.max_ticks));

    println!();
    match outcome {
        RunOutcome::Halted(tick) => {
            println!("{} at tick {}", "Halted".green().bold(), tick)
        }
        RunOutcome::TickLimit(tick) => println!(
            "{} after {} ticks, processes were shut down",
            "Tick limit".yellow().bold(),
            tick
        ),
    }
    print_summary(&system);
    Ok(())
}

/// Defaults, then the config file, then flags.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(scheduler) = args.scheduler {
        config.scheduler = match scheduler {
            SchedulerArg::RoundRobin => SchedulerKind::RoundRobin,
            SchedulerArg::Shortest => SchedulerKind::Shortest,
        };
    }
    if let Some(eviction) = args.eviction {
        config.eviction = match eviction {
            EvictionArg::Fifo => EvictionKind::Fifo,
            EvictionArg::Random => EvictionKind::Random,
        };
    }
    if let Some(format) = args.format {
        config.report_format = match format {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        };
    }
    if let Some(quantum) = args.quantum {
        config.max_quantum = quantum;
    }
    if let Some(frame_size) = args.frame_size {
        config.frame_size = frame_size;
    }
    if let Some(memory_size) = args.memory_size {
        config.memory_size = memory_size;
    }
    if let Some(interval) = args.timer_interval {
        config.timer_interval = interval;
    }
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    if args.report_dir.is_some() {
        config.report_dir = args.report_dir.clone();
    }
    Ok(config)
}

fn print_summary(system: &Bootloader) {
    if let Some(report) = system.kernel.system_report() {
        println!("{}", report);
    }

    println!("{}", "Processes".bold().blue());
    println!(
        "  {:>4} {:>8} {:>8} {:>8} {:>8} {:>7} {:>7}",
        "pid", "life", "cpu", "wait", "blocked", "faults", "preempt"
    );
    for p in system.kernel.process_reports() {
        println!(
            "  {:>4} {:>8} {:>8} {:>8} {:>8} {:>7} {:>7}",
            p.pid.to_string().yellow(),
            p.lifetime,
            p.cpu_time,
            p.wait_time,
            p.blocked_time,
            p.page_faults,
            p.preemptions
        );
    }

    let output = system.terminal_output();
    println!();
    println!("{} {:?}", "Terminal:".bold().blue(), output);
}
