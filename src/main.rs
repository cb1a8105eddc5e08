//! contagion-engine CLI
//!
//! Run an interbank default cascade from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Simulate a network described in a JSON file
//! contagion-engine run --input network.json
//!
//! # Override the shock and save the time series to a directory
//! contagion-engine run --input network.json --alpha 0.3 --output runs/stress
//!
//! # Generate a random network for testing
//! contagion-engine generate --banks 20 --links 4 --seed 7
//! ```

use contagion_engine::core::asset_matrix::AssetMatrix;
use contagion_engine::simulation::config::SimulationConfig;
use contagion_engine::simulation::shock::Shock;
use contagion_engine::simulation::simulator::Simulator;
use contagion_engine::simulation::sink::{DirectorySink, MemorySink, RecordSink};
use contagion_engine::simulation::stress_test::{generate_random_network, NetworkConfig};
use rust_decimal::Decimal;
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"contagion-engine — interbank default-cascade simulation

USAGE:
    contagion-engine <COMMAND> [OPTIONS]

COMMANDS:
    run         Apply a shock to a network and run the cascade to a fixed point
    generate    Generate a random interbank network (for testing)
    help        Show this message

OPTIONS (run):
    --input <FILE>       Path to JSON network file
    --alpha <A>          Uniform devaluation of external assets, 0..=1
    --recovery <R>       Recovery rate on defaulted obligations, 0..=1 (default: 0)
    --max-steps <N>      Round budget, shock round included
    --output <DIR>       Save time_series.jsonl and summary.json to DIR
    --format <FORMAT>    Output format: text (default) or json

OPTIONS (generate):
    --banks <N>          Number of banks (default: 10)
    --links <N>          Average obligations owed per bank (default: 3)
    --seed <S>           Seed for a reproducible network
    --output <FILE>      Write to file instead of stdout

Set RUST_LOG=debug to trace every round.

EXAMPLES:
    contagion-engine run --input network.json
    contagion-engine run --input network.json --alpha 0.25 --format json
    contagion-engine run --input network.json --output runs/baseline
    contagion-engine generate --banks 50 --links 5 --seed 1 --output network.json"#
    );
}

/// JSON schema for an input network.
#[derive(serde::Deserialize)]
struct NetworkFile {
    claims: Vec<Vec<Decimal>>,
    external_assets: Vec<Decimal>,
    external_liabilities: Vec<Decimal>,
    #[serde(default)]
    alpha: Option<Decimal>,
    #[serde(default)]
    shocks: Option<Vec<Decimal>>,
    #[serde(default)]
    config: SimulationConfig,
}

#[derive(serde::Serialize)]
struct GeneratedFile {
    claims: Vec<Vec<String>>,
    external_assets: Vec<String>,
    external_liabilities: Vec<String>,
    alpha: String,
}

fn load_network(path: &str) -> NetworkFile {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });

    serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "claims": [["0", "6"], ["0", "0"]],
  "external_assets": ["0", "0"],
  "external_liabilities": ["7", "1"],
  "alpha": "0.1"
}}"#
        );
        process::exit(1);
    })
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str, what: &str) -> T {
    args.get(i)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            eprintln!("{} requires {}", flag, what);
            process::exit(1);
        })
}

fn cmd_run(args: &[String]) {
    let mut input_path = None;
    let mut alpha: Option<Decimal> = None;
    let mut recovery: Option<Decimal> = None;
    let mut max_steps: Option<usize> = None;
    let mut output_dir: Option<String> = None;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(parse_value::<String>(args, i, "--input", "a file path"));
            }
            "--alpha" => {
                i += 1;
                alpha = Some(parse_value(args, i, "--alpha", "a number"));
            }
            "--recovery" => {
                i += 1;
                recovery = Some(parse_value(args, i, "--recovery", "a number"));
            }
            "--max-steps" => {
                i += 1;
                max_steps = Some(parse_value(args, i, "--max-steps", "a number"));
            }
            "--output" => {
                i += 1;
                output_dir = Some(parse_value::<String>(args, i, "--output", "a directory"));
            }
            "--format" => {
                i += 1;
                format = parse_value(args, i, "--format", "'text' or 'json'");
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    let network = load_network(&path);
    let mut config = network.config;
    if let Some(rate) = recovery {
        config.recovery_rate = rate;
    }
    if max_steps.is_some() {
        config.max_steps = max_steps;
    }

    let shock = match (alpha.or(network.alpha), network.shocks) {
        (Some(alpha), _) => Shock::Uniform(alpha),
        (None, Some(shocks)) => Shock::PerBank(shocks),
        (None, None) => Shock::Uniform(Decimal::ZERO),
    };

    let sink: Box<dyn RecordSink> = match &output_dir {
        Some(dir) => Box::new(DirectorySink::create(dir).unwrap_or_else(|e| {
            eprintln!("Error opening output directory '{}': {}", dir, e);
            process::exit(1);
        })),
        None => Box::new(MemorySink::new()),
    };

    let claims = AssetMatrix::from_rows(network.claims).unwrap_or_else(|e| {
        eprintln!("Invalid claims matrix: {}", e);
        process::exit(1);
    });

    let mut sim = Simulator::with_config(
        claims,
        network.external_assets,
        network.external_liabilities,
        shock,
        config,
        sink,
    )
    .unwrap_or_else(|e| {
        eprintln!("Invalid network: {}", e);
        process::exit(1);
    });

    let summary = sim.run().unwrap_or_else(|e| {
        eprintln!("Simulation failed: {}", e);
        process::exit(1);
    });

    if format == "json" {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing summary: {}", e);
                process::exit(1);
            }
        }
    } else {
        println!("{}", summary);
    }

    if let Some(dir) = output_dir {
        eprintln!("Saved time series and summary → {}", dir);
    }
}

fn to_strings(values: &[Decimal]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn cmd_generate(args: &[String]) {
    let mut banks = 10usize;
    let mut links = 3usize;
    let mut seed: Option<u64> = None;
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--banks" => {
                i += 1;
                banks = parse_value(args, i, "--banks", "a number");
            }
            "--links" => {
                i += 1;
                links = parse_value(args, i, "--links", "a number");
            }
            "--seed" => {
                i += 1;
                seed = Some(parse_value(args, i, "--seed", "a number"));
            }
            "--output" => {
                i += 1;
                output_path = Some(parse_value::<String>(args, i, "--output", "a file path"));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = NetworkConfig {
        bank_count: banks,
        avg_links_per_bank: links,
        seed,
        ..Default::default()
    };

    let network = generate_random_network(&config).unwrap_or_else(|e| {
        eprintln!("Error generating network: {}", e);
        process::exit(1);
    });

    let output = GeneratedFile {
        claims: network
            .claims
            .to_rows()
            .iter()
            .map(|row| to_strings(row))
            .collect(),
        external_assets: to_strings(&network.external_assets),
        external_liabilities: to_strings(&network.external_liabilities),
        alpha: Decimal::ZERO.to_string(),
    };

    let json = serde_json::to_string_pretty(&output).unwrap_or_else(|e| {
        eprintln!("Error serializing network: {}", e);
        process::exit(1);
    });

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!("Generated network of {} banks → {}", banks, path);
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "run" => cmd_run(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
