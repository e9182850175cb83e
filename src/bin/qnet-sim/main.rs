//! qnet-sim CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, Command, Overrides};
use color_eyre::eyre::{WrapErr, eyre};
use qnet_sim::config::SimulationConfig;
use qnet_sim::errors::RelayError;
use qnet_sim::protocols::grover::{self, GroverResult};
use qnet_sim::{Progress, relay};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const HISTOGRAM_WIDTH: usize = 40;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("qnet-sim v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_path(path)
            .wrap_err_with(|| format!("loading {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    apply_overrides(&mut config, cli.overrides);

    match cli.command {
        Command::Relay {
            message,
            key_length,
            max_attempts,
        } => {
            if let Some(message) = message {
                config.relay.message = message;
            }
            if let Some(key_length) = key_length {
                config.qkd.key_length = key_length;
            }
            if let Some(max_attempts) = max_attempts {
                config.qkd.max_attempts = max_attempts;
            }
            config.validate()?;
            run_relay(&config)
        }
        Command::Grover { shots } => {
            if let Some(shots) = shots {
                config.grover.shots = shots;
            }
            config.validate()?;
            run_grover(&config)
        }
    }
}

fn apply_overrides(config: &mut SimulationConfig, overrides: Overrides) {
    if let Some(seed) = overrides.seed {
        config.seed = Some(seed);
    }
    if let Some(delay) = overrides.delay_secs {
        config.channel.delay_secs = delay;
    }
    if let Some(rate) = overrides.eavesdrop_rate {
        config.channel.eavesdrop_rate = rate;
    }
    if let Some(target) = overrides.target {
        config.grover.target = target;
    }
    if let Some(nodes) = overrides.nodes {
        config.network.nodes = Some(nodes);
    }
}

fn rng_for(config: &SimulationConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn run_relay(config: &SimulationConfig) -> color_eyre::Result<()> {
    let mut rng = rng_for(config);
    let mut nodes = config.build_nodes();
    let qchannel = config.quantum_channel()?;
    let cchannel = config.classical_channel()?;

    let print = |message: &str| println!("{message}");
    let progress = Progress::new(&print);
    progress.report(&format!(
        "Nodes and channels created. Delay={}s, Eaves={}",
        config.channel.delay_secs, config.channel.eavesdrop_rate
    ));

    let links = relay::establish_chain(
        &mut nodes,
        config.qkd.key_length,
        config.qkd.max_attempts,
        &qchannel,
        &cchannel,
        &mut rng,
        progress,
    )
    .map_err(|err| {
        let cause = match &err {
            RelayError::KeyExchangeAborted { reason, .. } => reason.likely_cause(),
            _ => "invalid relay chain",
        };
        eyre!(err).wrap_err(format!("QKD failed: {cause}"))
    })?;

    for link in &links {
        println!(
            "  {} -> {}: {} attempt(s), sifted {}/{}, sample {}, QBER {:.1}%, {:.3?}",
            link.from,
            link.to,
            link.attempts,
            link.result.sifted_length,
            link.result.raw_length,
            link.result.sample_size,
            link.result.qber,
            link.elapsed
        );
    }
    println!("Total QKD time: {:.3?}", relay::total_qkd_time(&links));

    let trace = relay::relay_message(&nodes, &config.relay.message, progress)?;
    info!(delivered = trace.delivered.as_str(), "relay finished");
    Ok(())
}

fn run_grover(config: &SimulationConfig) -> color_eyre::Result<()> {
    let mut rng = rng_for(config);
    let nodes = config.build_nodes();
    let qchannel = config.quantum_channel()?;

    let print = |message: &str| println!("{message}");
    println!("Running Grover...");
    let result = grover::distributed_search(
        &nodes,
        &config.grover.target,
        Some(&qchannel),
        config.grover.shots,
        &mut rng,
        Progress::new(&print),
    )?;

    print_histogram(&result);
    Ok(())
}

fn print_histogram(result: &GroverResult) {
    let mut outcomes: Vec<(&str, usize)> = result.counts.iter().collect();
    outcomes.sort_unstable_by(|a, b| a.0.cmp(b.0));
    let peak = outcomes.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1);

    println!(
        "{} iteration(s), {} shots, best {} ({:.1}%)",
        result.iterations,
        result.shots,
        result.best,
        result.probability(&result.best) * 100.0
    );
    for (outcome, n) in outcomes {
        let bar = "#".repeat(n * HISTOGRAM_WIDTH / peak);
        println!("  {outcome} {n:>6} {bar}");
    }
}
