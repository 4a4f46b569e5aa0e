//! ThunderBird Scenario Simulator CLI
//!
//! Play the demo scenario timeline headless and print the telemetry stream.

use clap::Parser;
use thunderbird_env::{EngineContext, TokioContext};
use thunderbird_sim::{
    format_clock, EngineConfig, EngineError, PlayMode, ScenarioCatalog, ScenarioEngine,
    TelemetryEvent,
};
use tracing::{debug, error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Largest subscriber buffer the CLI asks for; the stream is drained live.
const MAX_CHANNEL_CAPACITY: u64 = 4096;

/// ThunderBird scenario simulation CLI
#[derive(Parser, Debug)]
#[command(name = "thunderbird-sim")]
#[command(about = "Play ThunderBird demo scenarios and print synthesized telemetry", long_about = None)]
struct Args {
    /// What to play: "sequential" or a scenario id (normal, hacker_attempt, ...)
    #[arg(short, long, default_value = "sequential")]
    mode: String,

    /// Ticks to observe (default: whole timeline, or 30 for a single scenario)
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Run on a seeded virtual clock instead of wall-clock time
    #[arg(long)]
    virtual_time: bool,

    /// Seed for virtual-time runs (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Load the scenario catalog from a JSON file
    #[arg(short, long)]
    catalog: Option<String>,

    /// Print the scenario catalog and exit
    #[arg(long)]
    list: bool,

    /// One JSON object per event on stdout
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Outcome of a headless run.
struct RunSummary {
    events: u64,
    last_scenario: String,
    finished: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    // stdout carries the event stream in --json mode
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

fn load_catalog(path: Option<&str>) -> ScenarioCatalog {
    let Some(path) = path else {
        return ScenarioCatalog::default();
    };
    match ScenarioCatalog::from_json_file(path) {
        Ok(catalog) => {
            info!("Loaded {} scenarios from {}", catalog.len(), path);
            catalog
        }
        Err(e) => {
            error!("Invalid catalog {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn print_catalog(catalog: &ScenarioCatalog, json: bool) {
    if json {
        match serde_json::to_string_pretty(catalog.as_slice()) {
            Ok(out) => println!("{}", out),
            Err(e) => error!("Failed to serialize catalog: {}", e),
        }
        return;
    }

    let mut offset = 0u64;
    for (i, scenario) in catalog.iter().enumerate() {
        println!(
            "{:>2}. {:<18} {:<24} {:>5} @ {:>5}  link={:<18} {}",
            i + 1,
            scenario.id,
            scenario.name,
            format_clock(scenario.duration_secs as u64),
            format_clock(offset),
            scenario.kind().map(|k| k.link_status()).unwrap_or("active"),
            scenario.description
        );
        offset += scenario.duration_secs as u64;
    }
    println!("    total {}", format_clock(catalog.total_duration()));
}

fn report(event: &TelemetryEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Failed to serialize event: {}", e),
        }
        return;
    }

    match &event.snapshot {
        Some(m) => info!(
            "[{}] {:<24} +{:<3} net={:>6.1} sec={:>6.1} thr={:>6.1} perf={:>6.1} bw={:>6.1} key={:>6.1}",
            format_clock(event.elapsed_ticks),
            event.scenario_name,
            event.local_elapsed,
            m.network,
            m.security,
            m.threats,
            m.performance,
            m.bandwidth,
            m.key_generation
        ),
        None => info!("[idle] {}", event.scenario_name),
    }
}

async fn run<C: EngineContext>(
    engine: ScenarioEngine<C>,
    mode: PlayMode,
    budget: u64,
    json: bool,
) -> Result<RunSummary, EngineError> {
    let mut rx = engine.subscribe_default();
    engine.start(mode)?;

    let mut summary = RunSummary {
        events: 0,
        last_scenario: engine.active_scenario_name(),
        finished: false,
    };

    while summary.events < budget {
        let Some(event) = rx.recv().await else {
            break;
        };
        report(&event, json);
        summary.events += 1;
        summary.last_scenario = event.scenario_name.clone();
        if event.finished {
            summary.finished = true;
            break;
        }
    }

    engine.stop();
    if let Ok(idle) = rx.try_recv() {
        debug!("Engine returned to {}", idle.scenario_name);
        if json {
            report(&idle, json);
        }
    }
    Ok(summary)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let catalog = load_catalog(args.catalog.as_deref());
    if args.list {
        print_catalog(&catalog, args.json);
        return;
    }

    let mode: PlayMode = args.mode.parse().unwrap_or_else(|e| match e {});
    if let PlayMode::Single(id) = &mode {
        if !catalog.contains(id) {
            eprintln!("Error: {}", EngineError::unknown(id.as_str()));
            let ids: Vec<&str> = catalog.iter().map(|s| s.id.as_str()).collect();
            eprintln!("Available scenarios: sequential, {}", ids.join(", "));
            std::process::exit(1);
        }
    }

    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let defaults = EngineConfig::default();
    let budget = args.ticks.unwrap_or(match mode {
        PlayMode::Sequential => catalog.total_duration(),
        PlayMode::Single(_) => defaults.single_run_ticks,
    });
    let config = defaults
        .with_seed(seed)
        .with_sink_capacity(budget.saturating_add(2).min(MAX_CHANNEL_CAPACITY) as usize);

    if !args.json {
        info!("ThunderBird Scenario Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!(
            "Mode: {} | ticks: {} | clock: {}",
            mode,
            budget,
            if args.virtual_time { "virtual" } else { "wall" }
        );
    }

    let result = if args.virtual_time {
        let engine = ScenarioEngine::virtual_time(catalog, config);
        run(engine, mode, budget, args.json).await
    } else {
        let engine = ScenarioEngine::new(TokioContext::shared(), catalog, config);
        run(engine, mode, budget, args.json).await
    };

    match result {
        Ok(summary) if !args.json => {
            info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            if summary.finished {
                info!("Timeline complete: {} ticks, ended on {}", summary.events, summary.last_scenario);
            } else {
                info!("Observed {} ticks, last scenario {}", summary.events, summary.last_scenario);
            }
        }
        Ok(_) => {}
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
