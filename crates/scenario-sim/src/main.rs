use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use scenario_core::{HandshakeMode, ScenarioConfig};
use scenario_sim::{run_simulation, NetworkConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("run", args)) => {
            let network = network_config(args);
            let scenario = scenario_config(args)?;

            tracing::info!(
                motes = network.motes,
                seed = network.seed,
                horizon_ms = network.horizon_ms,
                "Running scenario"
            );
            let report = run_simulation(network, scenario).await;

            if let Some(path) = args.get_one::<PathBuf>("log-file") {
                let mut text = report.console.join("\n");
                text.push('\n');
                std::fs::write(path, text)
                    .with_context(|| format!("writing {}", path.display()))?;
            }

            if args.get_flag("json") {
                println!("{}", report.to_json()?);
            } else {
                println!("{}", report.generate_text());
            }

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("check-config", args)) => {
            let path = args
                .get_one::<PathBuf>("path")
                .context("missing configuration path")?;
            let config = ScenarioConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?;

            println!("Configuration OK");
            println!("  Ready Message: {:?}", config.ready_message);
            println!("  Success After: {}ms", config.success_after_ms);
            println!("  Handshake: {:?}", config.handshake);
            match config.handshake_timeout_ms {
                Some(ms) => println!("  Handshake Timeout: {ms}ms"),
                None => println!("  Handshake Timeout: none"),
            }
        }
        _ => {}
    }

    Ok(())
}

fn cli() -> Command {
    Command::new("scenario-sim")
        .version(scenario_sim::VERSION)
        .about("Run the mote positioning scenario against a simulated network")
        .subcommand_required(true)
        .subcommand(
            Command::new("run")
                .about("Run the scenario and print a report")
                .arg(
                    Arg::new("motes")
                        .long("motes")
                        .default_value("5")
                        .value_parser(value_parser!(usize))
                        .help("Number of motes"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for placement and timers"),
                )
                .arg(
                    Arg::new("in-order")
                        .long("in-order")
                        .action(ArgAction::SetTrue)
                        .help("Boot motes in id order instead of shuffled"),
                )
                .arg(
                    Arg::new("horizon-ms")
                        .long("horizon-ms")
                        .default_value("900000")
                        .value_parser(value_parser!(u64))
                        .help("Simulated time after which the host shuts down"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Scenario configuration (TOML)"),
                )
                .arg(
                    Arg::new("sequential")
                        .long("sequential")
                        .action(ArgAction::SetTrue)
                        .help("Match ready signals in arrival order"),
                )
                .arg(
                    Arg::new("log-file")
                        .long("log-file")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the simulation console to this file"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("check-config")
                .about("Validate a scenario configuration file")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}

fn network_config(args: &ArgMatches) -> NetworkConfig {
    let defaults = NetworkConfig::default();
    NetworkConfig::new()
        .with_motes(args.get_one::<usize>("motes").copied().unwrap_or(defaults.motes))
        .with_seed(args.get_one::<u64>("seed").copied().unwrap_or(defaults.seed))
        .with_shuffle_boot(!args.get_flag("in-order"))
        .with_horizon_ms(
            args.get_one::<u64>("horizon-ms")
                .copied()
                .unwrap_or(defaults.horizon_ms),
        )
}

fn scenario_config(args: &ArgMatches) -> anyhow::Result<ScenarioConfig> {
    let mut scenario = match args.get_one::<PathBuf>("config") {
        Some(path) => ScenarioConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ScenarioConfig::new(),
    };
    if args.get_flag("sequential") {
        scenario = scenario.with_handshake(HandshakeMode::Sequential);
    }
    Ok(scenario)
}
